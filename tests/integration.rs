use std::io::Write;

use chrono::{DateTime, Duration, TimeZone, Utc};

use reprise::review;
use reprise::sm2;
use reprise::store::{CsvStore, ReviewStore};
use reprise::{QualityGrade, ReviewState};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[test]
fn three_review_scenario() {
    // Each review happens at a different instant, none of them on the scheduled date.
    let instants = [t0(), t0() + Duration::days(3), t0() + Duration::days(4)];
    let grades = [
        QualityGrade::Perfect,
        QualityGrade::Perfect,
        QualityGrade::Easy,
    ];

    let mut state = ReviewState::new(t0());
    let mut intervals = Vec::new();
    let mut eases = Vec::new();
    for (now, grade) in instants.into_iter().zip(grades) {
        state = sm2::advance(&state, grade, now);
        assert_eq!(state.last_review_date, Some(now));
        assert_eq!(
            state.next_review_date,
            now + Duration::days(i64::from(state.interval))
        );
        intervals.push(state.interval);
        eases.push(round2(state.ease_factor));
    }

    // Easy (q=4) leaves the ease unchanged under the recurrence, so the third step is floor(6 * 2.7).
    assert_eq!(intervals, vec![1, 6, 16]);
    assert_eq!(eases, vec![2.6, 2.7, 2.7]);
    assert_eq!(state.repetitions, 3);
}

#[test]
fn lapse_and_recovery() {
    let mut state = ReviewState::new(t0());
    let mut now = t0();
    for _ in 0..4 {
        state = sm2::advance(&state, QualityGrade::Easy, now);
        now = state.next_review_date;
    }
    assert_eq!(state.repetitions, 4);
    let ease_before = state.ease_factor;

    state = sm2::advance(&state, QualityGrade::Blackout, now);
    assert_eq!(state.repetitions, 0);
    assert_eq!(state.interval, 1);
    assert!((state.ease_factor - (ease_before - 0.8)).abs() < 1e-9);
    assert!(sm2::is_due(&state, now + Duration::days(1)));
    assert!(!sm2::is_due(&state, now + Duration::days(1) - Duration::seconds(1)));

    // Relearning restarts at 1 then 6 days.
    now = state.next_review_date;
    state = sm2::advance(&state, QualityGrade::Hesitant, now);
    assert_eq!((state.repetitions, state.interval), (1, 1));
    state = sm2::advance(&state, QualityGrade::Hesitant, state.next_review_date);
    assert_eq!((state.repetitions, state.interval), (2, 6));
    assert!((state.ease_factor - 1.42).abs() < 1e-9);
    assert_eq!(review::classify(&state), review::Difficulty::Hard);
}

#[test]
fn csv_store_review_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deck.csv");
    {
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "id,prompt,repetitions,ease_factor,interval,next_review,last_review"
        )
        .unwrap();
        writeln!(f, "a,What is 2+2?,0,2.5,0,2025-03-01T09:00:00Z,").unwrap();
        writeln!(
            f,
            "b,Capital of Peru?,2,2.36,6,2025-03-20T09:00:00Z,2025-03-14T09:00:00Z"
        )
        .unwrap();
        writeln!(f, ",Bonjour means?,0,2.5,0,2025-02-27T09:00:00Z,").unwrap();
    }

    let mut store = CsvStore::open(&path).unwrap();
    assert_eq!(store.records().len(), 3);

    let now = t0();
    let session = review::build_session(store.records(), now);
    // card without an id was due earliest
    assert_eq!(session, vec![2, 0]);

    let ids: Vec<String> = session
        .iter()
        .map(|&i| store.records()[i].id.clone())
        .collect();
    for id in &ids {
        review::grade_card(&mut store, id, QualityGrade::Perfect, now).unwrap();
    }
    assert!(review::filter_due(store.records(), now).is_empty());

    let reopened = CsvStore::open(&path).unwrap();
    for id in &ids {
        let state = reopened.load(id).unwrap().unwrap();
        assert_eq!(state.repetitions, 1);
        assert_eq!(sm2::days_until_due(&state, now), 1);
    }
    let untouched = reopened.load("b").unwrap().unwrap();
    assert_eq!(untouched.interval, 6);
    assert_eq!(sm2::days_until_due(&untouched, now), 19);
    assert_eq!(review::classify(&untouched), review::Difficulty::Easy);
}

#[test]
fn invalid_grades_fail_at_the_boundary() {
    assert!(QualityGrade::try_from(6u8).is_err());
    assert!("".parse::<QualityGrade>().is_err());
    assert!("3.5".parse::<QualityGrade>().is_err());
    assert_eq!("5".parse::<QualityGrade>(), Ok(QualityGrade::Perfect));
}
