use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::{MIN_EASE_FACTOR, ReviewState};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error in {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{}, record {record}: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        record: usize,
        reason: String,
    },
}

/// Persistence for one [`ReviewState`] per card.
///
/// Implementations need not be thread safe; callers that share a store must
/// serialize load/advance/save for a given card themselves.
pub trait ReviewStore {
    /// `None` means the card has never entered the scheduler.
    fn load(&self, card_id: &str) -> Result<Option<ReviewState>, StoreError>;
    fn save(&mut self, card_id: &str, state: ReviewState) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    states: HashMap<String, ReviewState>,
}

impl ReviewStore for MemoryStore {
    fn load(&self, card_id: &str) -> Result<Option<ReviewState>, StoreError> {
        Ok(self.states.get(card_id).copied())
    }

    fn save(&mut self, card_id: &str, state: ReviewState) -> Result<(), StoreError> {
        self.states.insert(card_id.to_string(), state);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardRecord {
    pub id: String,
    pub prompt: String,
    pub state: ReviewState,
}

const HEADER: [&str; 7] = [
    "id",
    "prompt",
    "repetitions",
    "ease_factor",
    "interval",
    "next_review",
    "last_review",
];

/// CSV-file backed store. The whole file is held in memory and rewritten on every save.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    records: Vec<CardRecord>,
}

impl CsvStore {
    /// Open `path`, treating a missing file as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = if path.exists() {
            load_csv(&path)?
        } else {
            Vec::new()
        };
        tracing::info!(path = %path.display(), cards = records.len(), "opened review store");
        Ok(CsvStore { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    /// Add a card with a fresh state and persist it. Returns the new card id.
    pub fn enroll(&mut self, prompt: &str, now: DateTime<Utc>) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut records = self.records.clone();
        records.push(CardRecord {
            id: id.clone(),
            prompt: prompt.to_string(),
            state: ReviewState::new(now),
        });
        self.commit(records)?;
        Ok(id)
    }

    // Memory only changes once the file has been written.
    fn commit(&mut self, records: Vec<CardRecord>) -> Result<(), StoreError> {
        save_csv(&self.path, &records)?;
        self.records = records;
        Ok(())
    }
}

impl ReviewStore for CsvStore {
    fn load(&self, card_id: &str) -> Result<Option<ReviewState>, StoreError> {
        Ok(self
            .records
            .iter()
            .find(|r| r.id == card_id)
            .map(|r| r.state))
    }

    fn save(&mut self, card_id: &str, state: ReviewState) -> Result<(), StoreError> {
        let mut records = self.records.clone();
        match records.iter_mut().find(|r| r.id == card_id) {
            Some(r) => r.state = state,
            None => records.push(CardRecord {
                id: card_id.to_string(),
                prompt: String::new(),
                state,
            }),
        }
        self.commit(records)
    }
}

fn get_field(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp {s:?}: {e}"))
}

fn parse_state(record: &csv::StringRecord) -> Result<ReviewState, String> {
    let repetitions: u32 = get_field(record, 2)
        .parse()
        .map_err(|e| format!("bad repetitions: {e}"))?;
    let ease_factor: f64 = get_field(record, 3)
        .parse()
        .map_err(|e| format!("bad ease_factor: {e}"))?;
    let interval: u32 = get_field(record, 4)
        .parse()
        .map_err(|e| format!("bad interval: {e}"))?;
    let next_review_date = parse_timestamp(get_field(record, 5))?;
    let last_review_date = match get_field(record, 6) {
        "" => None,
        s => Some(parse_timestamp(s)?),
    };

    if !(ease_factor >= MIN_EASE_FACTOR) {
        return Err(format!("ease_factor {ease_factor} below {MIN_EASE_FACTOR}"));
    }
    if repetitions >= 1 && interval == 0 {
        return Err("interval 0 with passing repetitions".to_string());
    }

    Ok(ReviewState {
        repetitions,
        ease_factor,
        interval,
        next_review_date,
        last_review_date,
    })
}

pub fn load_csv(path: &Path) -> Result<Vec<CardRecord>, StoreError> {
    let csv_err = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;

        let id = match get_field(&record, 0) {
            "" => uuid::Uuid::new_v4().to_string(),
            s => s.to_string(),
        };
        let state = parse_state(&record).map_err(|reason| StoreError::Malformed {
            path: path.to_path_buf(),
            record: i + 1,
            reason,
        })?;

        records.push(CardRecord {
            id,
            prompt: get_field(&record, 1).to_string(),
            state,
        });
    }
    Ok(records)
}

pub fn save_csv(path: &Path, records: &[CardRecord]) -> Result<(), StoreError> {
    let csv_err = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(HEADER).map_err(csv_err)?;

    for r in records {
        let s = &r.state;
        writer
            .write_record([
                r.id.clone(),
                r.prompt.clone(),
                s.repetitions.to_string(),
                s.ease_factor.to_string(),
                s.interval.to_string(),
                s.next_review_date.to_rfc3339(),
                s.last_review_date.map_or(String::new(), |d| d.to_rfc3339()),
            ])
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
