// SM-2 (SuperMemo 2) review scheduling.
// Past the second review, intervals grow by truncating previous_interval * ease.

use chrono::{DateTime, Days, Utc};

use crate::grade::QualityGrade;
use crate::state::{MIN_EASE_FACTOR, ReviewState};

pub const FIRST_INTERVAL: u32 = 1;
pub const SECOND_INTERVAL: u32 = 6;
pub const RELEARN_INTERVAL: u32 = 1;

fn ease_delta(q: f64) -> f64 {
    0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)
}

fn next_ease(ease: f64, grade: QualityGrade) -> f64 {
    let q = f64::from(grade.value());
    f64::max(ease + ease_delta(q), MIN_EASE_FACTOR)
}

fn grown_interval(previous: u32, ease: f64) -> u32 {
    // `as` saturates, so runaway growth pins at u32::MAX instead of wrapping.
    (f64::from(previous) * ease).floor() as u32
}

fn due_after(now: DateTime<Utc>, interval: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(interval)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Compute the state following a graded review at `now`.
///
/// The caller persists the result; `current` is left untouched.
pub fn advance(current: &ReviewState, grade: QualityGrade, now: DateTime<Utc>) -> ReviewState {
    let ease_factor = next_ease(current.ease_factor, grade);

    let (repetitions, interval) = if grade.is_pass() {
        let repetitions = current.repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => FIRST_INTERVAL,
            2 => SECOND_INTERVAL,
            _ => grown_interval(current.interval, ease_factor).max(1),
        };
        (repetitions, interval)
    } else {
        (0, RELEARN_INTERVAL)
    };

    ReviewState {
        repetitions,
        ease_factor,
        interval,
        next_review_date: due_after(now, interval),
        last_review_date: Some(now),
    }
}

pub fn is_due(state: &ReviewState, now: DateTime<Utc>) -> bool {
    now >= state.next_review_date
}

/// Whole calendar days (UTC) from `now` until the card is due. Negative when overdue.
pub fn days_until_due(state: &ReviewState, now: DateTime<Utc>) -> i64 {
    (state.next_review_date.date_naive() - now.date_naive()).num_days()
}
