use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::grade::QualityGrade;
use crate::sm2;
use crate::state::ReviewState;
use crate::store::{CardRecord, ReviewStore, StoreError};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Hard,
    Medium,
    Easy,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DifficultySummary {
    pub hard: usize,
    pub medium: usize,
    pub easy: usize,
}

/// Coarse difficulty label derived from the ease factor.
pub fn classify(state: &ReviewState) -> Difficulty {
    let ease = state.ease_factor;
    if (1.3..1.8).contains(&ease) {
        Difficulty::Hard
    } else if (1.8..2.3).contains(&ease) {
        Difficulty::Medium
    } else if ease >= 2.3 {
        Difficulty::Easy
    } else {
        Difficulty::Medium
    }
}

/// How many cards one study session should hold, given how many are due.
/// Only the size; which cards go in is up to the caller.
pub fn recommend_session_size(total_due: usize) -> usize {
    match total_due {
        0..=10 => total_due,
        11..=30 => 15,
        31..=50 => 20,
        _ => 25,
    }
}

/// Indices of due records, most overdue first.
pub fn filter_due(records: &[CardRecord], now: DateTime<Utc>) -> Vec<usize> {
    let mut due: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| sm2::is_due(&r.state, now))
        .map(|(i, _)| i)
        .collect();
    due.sort_by_key(|&i| records[i].state.next_review_date);
    due
}

/// Due indices capped at the recommended session size.
pub fn build_session(records: &[CardRecord], now: DateTime<Utc>) -> Vec<usize> {
    let mut due = filter_due(records, now);
    due.truncate(recommend_session_size(due.len()));
    due
}

pub fn difficulty_summary(records: &[CardRecord]) -> DifficultySummary {
    let mut summary = DifficultySummary::default();
    for r in records {
        match classify(&r.state) {
            Difficulty::Hard => summary.hard += 1,
            Difficulty::Medium => summary.medium += 1,
            Difficulty::Easy => summary.easy += 1,
        }
    }
    summary
}

/// Load, advance and save one card's state. A card the store has never seen starts
/// from the default state.
///
/// The store must not be shared across this call: the read-modify-write is only
/// race-free because `store` is borrowed mutably for its whole duration.
pub fn grade_card<S: ReviewStore + ?Sized>(
    store: &mut S,
    card_id: &str,
    grade: QualityGrade,
    now: DateTime<Utc>,
) -> Result<ReviewState, StoreError> {
    let current = store
        .load(card_id)?
        .unwrap_or_else(|| ReviewState::new(now));
    let next = sm2::advance(&current, grade, now);
    store.save(card_id, next)?;
    tracing::debug!(
        card_id,
        %grade,
        interval = next.interval,
        ease_factor = next.ease_factor,
        "card graded"
    );
    Ok(next)
}
