use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grades at or above this value count as a successful recall.
pub const PASS_THRESHOLD: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradeError {
    #[error("grade {0} is out of range (expected 0-5)")]
    OutOfRange(i64),
    #[error("grade {0:?} is not a number")]
    NotANumber(String),
}

/// Learner's self-assessed recall quality for one review, 0 (blackout) to 5 (perfect).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QualityGrade {
    Blackout = 0,
    Incorrect = 1,
    Difficult = 2,
    Hesitant = 3,
    Easy = 4,
    Perfect = 5,
}

impl QualityGrade {
    pub const ALL: [QualityGrade; 6] = [
        QualityGrade::Blackout,
        QualityGrade::Incorrect,
        QualityGrade::Difficult,
        QualityGrade::Hesitant,
        QualityGrade::Easy,
        QualityGrade::Perfect,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn is_pass(self) -> bool {
        self.value() >= PASS_THRESHOLD
    }
}

impl TryFrom<u8> for QualityGrade {
    type Error = GradeError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            0 => Ok(QualityGrade::Blackout),
            1 => Ok(QualityGrade::Incorrect),
            2 => Ok(QualityGrade::Difficult),
            3 => Ok(QualityGrade::Hesitant),
            4 => Ok(QualityGrade::Easy),
            5 => Ok(QualityGrade::Perfect),
            _ => Err(GradeError::OutOfRange(i64::from(n))),
        }
    }
}

impl TryFrom<i64> for QualityGrade {
    type Error = GradeError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        u8::try_from(n)
            .map_err(|_| GradeError::OutOfRange(n))
            .and_then(<QualityGrade as TryFrom<u8>>::try_from)
    }
}

impl From<QualityGrade> for u8 {
    fn from(g: QualityGrade) -> u8 {
        g.value()
    }
}

impl FromStr for QualityGrade {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let n: i64 = s
            .parse()
            .map_err(|_| GradeError::NotANumber(s.to_string()))?;
        QualityGrade::try_from(n)
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualityGrade::Blackout => "blackout",
            QualityGrade::Incorrect => "incorrect",
            QualityGrade::Difficult => "difficult",
            QualityGrade::Hesitant => "hesitant",
            QualityGrade::Easy => "easy",
            QualityGrade::Perfect => "perfect",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_threshold() {
        let passing: Vec<bool> = QualityGrade::ALL.iter().map(|g| g.is_pass()).collect();
        assert_eq!(passing, vec![false, false, false, true, true, true]);
    }

    #[test]
    fn try_from_accepts_zero_to_five() {
        for n in 0..=5u8 {
            assert_eq!(QualityGrade::try_from(n).unwrap().value(), n);
        }
    }

    #[test]
    fn try_from_rejects_out_of_range() {
        assert_eq!(QualityGrade::try_from(6u8), Err(GradeError::OutOfRange(6)));
        assert_eq!(
            QualityGrade::try_from(255u8),
            Err(GradeError::OutOfRange(255))
        );
    }

    #[test]
    fn parse_from_text() {
        assert_eq!(" 4\n".parse::<QualityGrade>(), Ok(QualityGrade::Easy));
        assert_eq!("0".parse::<QualityGrade>(), Ok(QualityGrade::Blackout));
        assert!(matches!(
            "7".parse::<QualityGrade>(),
            Err(GradeError::OutOfRange(7))
        ));
        assert!(matches!(
            "-1".parse::<QualityGrade>(),
            Err(GradeError::OutOfRange(-1))
        ));
        assert_eq!(
            "good".parse::<QualityGrade>(),
            Err(GradeError::NotANumber("good".to_string()))
        );
    }

    #[test]
    fn serde_uses_integer_and_validates() {
        assert_eq!(serde_json::to_string(&QualityGrade::Perfect).unwrap(), "5");
        let g: QualityGrade = serde_json::from_str("3").unwrap();
        assert_eq!(g, QualityGrade::Hesitant);
        assert!(serde_json::from_str::<QualityGrade>("9").is_err());
        assert_eq!(QualityGrade::try_from(-3i64), Err(GradeError::OutOfRange(-3)));
    }
}
