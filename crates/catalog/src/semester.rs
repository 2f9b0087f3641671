use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use acadledger_core::{DomainError, DomainResult, Entity, SemesterId};

/// The date-gated configuration of a semester, threaded explicitly into every
/// date-sensitive operation (there is no global "current semester").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemesterWindow {
    pub registration_start: NaiveDate,
    pub registration_end: NaiveDate,
    pub add_drop_deadline: NaiveDate,
}

impl SemesterWindow {
    /// Whether a registration attempted on `date` falls inside the window.
    ///
    /// Registration stays open through the add/drop deadline, which may fall
    /// after `registration_end`.
    pub fn registration_open(&self, date: NaiveDate) -> bool {
        date >= self.registration_start && date <= self.add_drop_deadline
    }

    /// Whether a drop attempted on `date` is still allowed.
    pub fn drop_allowed(&self, date: NaiveDate) -> bool {
        date <= self.add_drop_deadline
    }
}

/// An academic semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    id: SemesterId,
    code: String, // e.g. "F2023"
    name: String, // e.g. "Fall 2023"
    start_date: NaiveDate,
    end_date: NaiveDate,
    window: SemesterWindow,
    current: bool,
}

impl Semester {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SemesterId,
        code: impl Into<String>,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        registration_start: NaiveDate,
        registration_end: NaiveDate,
        add_drop_deadline: NaiveDate,
    ) -> DomainResult<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(DomainError::validation("semester code cannot be empty"));
        }
        if end_date <= start_date {
            return Err(DomainError::validation("semester must end after it starts"));
        }
        if registration_end < registration_start {
            return Err(DomainError::validation(
                "registration window must end on or after it starts",
            ));
        }
        if add_drop_deadline < registration_start {
            return Err(DomainError::validation(
                "add/drop deadline cannot precede registration start",
            ));
        }

        Ok(Self {
            id,
            code,
            name: name.into(),
            start_date,
            end_date,
            window: SemesterWindow {
                registration_start,
                registration_end,
                add_drop_deadline,
            },
            current: false,
        })
    }

    pub fn id_typed(&self) -> SemesterId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn window(&self) -> SemesterWindow {
        self.window
    }

    pub fn is_current(&self) -> bool {
        self.current
    }

    pub fn set_current(&mut self, current: bool) {
        self.current = current;
    }
}

impl Entity for Semester {
    type Id = SemesterId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> SemesterWindow {
        SemesterWindow {
            registration_start: date(2024, 8, 1),
            registration_end: date(2024, 8, 20),
            add_drop_deadline: date(2024, 9, 10),
        }
    }

    #[test]
    fn registration_window_boundaries() {
        let w = window();
        assert!(!w.registration_open(date(2024, 7, 31)));
        assert!(w.registration_open(date(2024, 8, 1)));
        // Still open between registration_end and the add/drop deadline.
        assert!(w.registration_open(date(2024, 9, 1)));
        assert!(w.registration_open(date(2024, 9, 10)));
        assert!(!w.registration_open(date(2024, 9, 11)));
    }

    #[test]
    fn drop_deadline_boundaries() {
        let w = window();
        assert!(w.drop_allowed(date(2024, 9, 10)));
        assert!(!w.drop_allowed(date(2024, 9, 11)));
    }

    #[test]
    fn invalid_date_ordering_is_rejected() {
        let err = Semester::new(
            SemesterId::new(),
            "F2024",
            "Fall 2024",
            date(2024, 9, 1),
            date(2024, 9, 1),
            date(2024, 8, 1),
            date(2024, 8, 20),
            date(2024, 9, 10),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
