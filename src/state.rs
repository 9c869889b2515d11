use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INITIAL_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Per-card scheduling data. Produced fresh by every call to [`crate::sm2::advance`],
/// never mutated in place by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    /// Consecutive passing reviews since the last failure.
    pub repetitions: u32,
    pub ease_factor: f64,
    /// Days until the next review, as of the last computation.
    pub interval: u32,
    pub next_review_date: DateTime<Utc>,
    pub last_review_date: Option<DateTime<Utc>>,
}

impl ReviewState {
    /// State of a card entering the scheduler for the first time; due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        ReviewState {
            repetitions: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            interval: 0,
            next_review_date: now,
            last_review_date: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.last_review_date.is_none()
    }
}
