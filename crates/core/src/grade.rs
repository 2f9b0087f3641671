//! Letter grades and the grade-threshold ordering rule.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// A letter grade recorded on an enrollment.
///
/// Thresholds compare **raw letter strings** (`'A' < 'B' < 'C' < 'D' < 'F'`),
/// so a lexically smaller grade is the better one. This rule holds for the
/// single-letter scale used here; it would not survive `A+`/`A-` extensions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
    /// Withdrawn.
    W,
    /// Incomplete.
    I,
    /// In progress.
    #[serde(rename = "IP")]
    Ip,
}

impl Grade {
    pub fn letter(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::W => "W",
            Grade::I => "I",
            Grade::Ip => "IP",
        }
    }

    /// Whether this grade satisfies a minimum-grade threshold.
    ///
    /// Qualifies when `self ≤ minimum` by raw letter ordering.
    pub fn satisfies_minimum(&self, minimum: Grade) -> bool {
        self.letter() <= minimum.letter()
    }

    /// Whether this is a passing letter grade (A–D).
    pub fn is_passing(&self) -> bool {
        matches!(self, Grade::A | Grade::B | Grade::C | Grade::D)
    }
}

impl ValueObject for Grade {}

impl core::fmt::Display for Grade {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.letter())
    }
}

impl FromStr for Grade {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            "W" => Ok(Grade::W),
            "I" => Ok(Grade::I),
            "IP" => Ok(Grade::Ip),
            other => Err(DomainError::validation(format!("unknown grade: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn better_letter_satisfies_threshold() {
        assert!(Grade::A.satisfies_minimum(Grade::C));
        assert!(Grade::B.satisfies_minimum(Grade::C));
        assert!(Grade::C.satisfies_minimum(Grade::C));
        assert!(!Grade::D.satisfies_minimum(Grade::C));
        assert!(!Grade::F.satisfies_minimum(Grade::D));
    }

    #[test]
    fn non_letter_grades_never_satisfy_letter_thresholds() {
        assert!(!Grade::W.satisfies_minimum(Grade::F));
        assert!(!Grade::I.satisfies_minimum(Grade::F));
        assert!(!Grade::Ip.satisfies_minimum(Grade::F));
    }

    #[test]
    fn passing_grades() {
        assert!(Grade::D.is_passing());
        assert!(!Grade::F.is_passing());
        assert!(!Grade::W.is_passing());
    }

    #[test]
    fn grade_round_trips_through_letters() {
        for g in [
            Grade::A,
            Grade::B,
            Grade::C,
            Grade::D,
            Grade::F,
            Grade::W,
            Grade::I,
            Grade::Ip,
        ] {
            assert_eq!(g.letter().parse::<Grade>().unwrap(), g);
        }
    }
}
