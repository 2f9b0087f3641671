use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use acadledger_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ProgramId, StudentId};
use acadledger_events::{Command, Event};

/// Program enrollment identifier (aggregate id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramEnrollmentId(pub AggregateId);

impl ProgramEnrollmentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProgramEnrollmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Program enrollment status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramEnrollmentStatus {
    Active,
    Completed,
    Suspended,
    Withdrawn,
}

/// Aggregate root: ProgramEnrollment (a student's membership in a program).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramEnrollment {
    id: ProgramEnrollmentId,
    student_id: Option<StudentId>,
    program_id: Option<ProgramId>,
    status: ProgramEnrollmentStatus,
    current_semester: u32,
    enrolled_on: Option<NaiveDate>,
    expected_graduation: Option<NaiveDate>,
    version: u64,
    created: bool,
}

impl ProgramEnrollment {
    /// Blank instance the dispatcher folds history into.
    pub fn empty(id: ProgramEnrollmentId) -> Self {
        Self {
            id,
            student_id: None,
            program_id: None,
            status: ProgramEnrollmentStatus::Active,
            current_semester: 1,
            enrolled_on: None,
            expected_graduation: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProgramEnrollmentId {
        self.id
    }

    pub fn student_id(&self) -> Option<StudentId> {
        self.student_id
    }

    pub fn program_id(&self) -> Option<ProgramId> {
        self.program_id
    }

    pub fn status(&self) -> ProgramEnrollmentStatus {
        self.status
    }

    pub fn current_semester(&self) -> u32 {
        self.current_semester
    }

    pub fn expected_graduation(&self) -> Option<NaiveDate> {
        self.expected_graduation
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ProgramEnrollmentStatus::Active)
    }
}

impl AggregateRoot for ProgramEnrollment {
    type Id = ProgramEnrollmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: EnrollInProgram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollInProgram {
    pub enrollment_id: ProgramEnrollmentId,
    pub student_id: StudentId,
    pub program_id: ProgramId,
    pub enrolled_on: NaiveDate,
    pub expected_graduation: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdvanceSemester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceSemester {
    pub enrollment_id: ProgramEnrollmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawFromProgram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawFromProgram {
    pub enrollment_id: ProgramEnrollmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteProgram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteProgram {
    pub enrollment_id: ProgramEnrollmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramEnrollmentCommand {
    EnrollInProgram(EnrollInProgram),
    AdvanceSemester(AdvanceSemester),
    WithdrawFromProgram(WithdrawFromProgram),
    CompleteProgram(CompleteProgram),
}

impl Command for ProgramEnrollmentCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            ProgramEnrollmentCommand::EnrollInProgram(c) => c.enrollment_id.0,
            ProgramEnrollmentCommand::AdvanceSemester(c) => c.enrollment_id.0,
            ProgramEnrollmentCommand::WithdrawFromProgram(c) => c.enrollment_id.0,
            ProgramEnrollmentCommand::CompleteProgram(c) => c.enrollment_id.0,
        }
    }
}

/// Event: ProgramEnrollmentOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEnrollmentOpened {
    pub enrollment_id: ProgramEnrollmentId,
    pub student_id: StudentId,
    pub program_id: ProgramId,
    pub enrolled_on: NaiveDate,
    pub expected_graduation: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SemesterAdvanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemesterAdvanced {
    pub enrollment_id: ProgramEnrollmentId,
    pub new_semester: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProgramWithdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramWithdrawn {
    pub enrollment_id: ProgramEnrollmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProgramCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramCompleted {
    pub enrollment_id: ProgramEnrollmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramEnrollmentEvent {
    ProgramEnrollmentOpened(ProgramEnrollmentOpened),
    SemesterAdvanced(SemesterAdvanced),
    ProgramWithdrawn(ProgramWithdrawn),
    ProgramCompleted(ProgramCompleted),
}

impl Event for ProgramEnrollmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProgramEnrollmentEvent::ProgramEnrollmentOpened(_) => "progress.enrollment.opened",
            ProgramEnrollmentEvent::SemesterAdvanced(_) => "progress.enrollment.semester_advanced",
            ProgramEnrollmentEvent::ProgramWithdrawn(_) => "progress.enrollment.withdrawn",
            ProgramEnrollmentEvent::ProgramCompleted(_) => "progress.enrollment.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProgramEnrollmentEvent::ProgramEnrollmentOpened(e) => e.occurred_at,
            ProgramEnrollmentEvent::SemesterAdvanced(e) => e.occurred_at,
            ProgramEnrollmentEvent::ProgramWithdrawn(e) => e.occurred_at,
            ProgramEnrollmentEvent::ProgramCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ProgramEnrollment {
    type Command = ProgramEnrollmentCommand;
    type Event = ProgramEnrollmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProgramEnrollmentEvent::ProgramEnrollmentOpened(e) => {
                self.id = e.enrollment_id;
                self.student_id = Some(e.student_id);
                self.program_id = Some(e.program_id);
                self.status = ProgramEnrollmentStatus::Active;
                self.current_semester = 1;
                self.enrolled_on = Some(e.enrolled_on);
                self.expected_graduation = Some(e.expected_graduation);
                self.created = true;
            }
            ProgramEnrollmentEvent::SemesterAdvanced(e) => {
                self.current_semester = e.new_semester;
            }
            ProgramEnrollmentEvent::ProgramWithdrawn(_) => {
                self.status = ProgramEnrollmentStatus::Withdrawn;
            }
            ProgramEnrollmentEvent::ProgramCompleted(_) => {
                self.status = ProgramEnrollmentStatus::Completed;
            }
        }

        // Every applied event advances the version by one.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProgramEnrollmentCommand::EnrollInProgram(cmd) => self.handle_enroll(cmd),
            ProgramEnrollmentCommand::AdvanceSemester(cmd) => self.handle_advance(cmd),
            ProgramEnrollmentCommand::WithdrawFromProgram(cmd) => self.handle_withdraw(cmd),
            ProgramEnrollmentCommand::CompleteProgram(cmd) => self.handle_complete(cmd),
        }
    }
}

impl ProgramEnrollment {
    fn ensure_enrollment_id(&self, enrollment_id: ProgramEnrollmentId) -> Result<(), DomainError> {
        if self.id != enrollment_id {
            return Err(DomainError::invariant("enrollment_id mismatch"));
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if !self.is_active() {
            return Err(DomainError::conflict("program enrollment is not active"));
        }
        Ok(())
    }

    fn handle_enroll(&self, cmd: &EnrollInProgram) -> Result<Vec<ProgramEnrollmentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("program enrollment already exists"));
        }
        if cmd.expected_graduation <= cmd.enrolled_on {
            return Err(DomainError::validation(
                "expected graduation must be after enrollment date",
            ));
        }

        Ok(vec![ProgramEnrollmentEvent::ProgramEnrollmentOpened(
            ProgramEnrollmentOpened {
                enrollment_id: cmd.enrollment_id,
                student_id: cmd.student_id,
                program_id: cmd.program_id,
                enrolled_on: cmd.enrolled_on,
                expected_graduation: cmd.expected_graduation,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_advance(&self, cmd: &AdvanceSemester) -> Result<Vec<ProgramEnrollmentEvent>, DomainError> {
        self.ensure_active()?;
        self.ensure_enrollment_id(cmd.enrollment_id)?;

        Ok(vec![ProgramEnrollmentEvent::SemesterAdvanced(SemesterAdvanced {
            enrollment_id: cmd.enrollment_id,
            new_semester: self.current_semester + 1,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(
        &self,
        cmd: &WithdrawFromProgram,
    ) -> Result<Vec<ProgramEnrollmentEvent>, DomainError> {
        self.ensure_active()?;
        self.ensure_enrollment_id(cmd.enrollment_id)?;

        Ok(vec![ProgramEnrollmentEvent::ProgramWithdrawn(ProgramWithdrawn {
            enrollment_id: cmd.enrollment_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(
        &self,
        cmd: &CompleteProgram,
    ) -> Result<Vec<ProgramEnrollmentEvent>, DomainError> {
        self.ensure_active()?;
        self.ensure_enrollment_id(cmd.enrollment_id)?;

        Ok(vec![ProgramEnrollmentEvent::ProgramCompleted(ProgramCompleted {
            enrollment_id: cmd.enrollment_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn enrolled() -> ProgramEnrollment {
        let id = ProgramEnrollmentId::new(AggregateId::new());
        let mut enrollment = ProgramEnrollment::empty(id);
        let events = enrollment
            .handle(&ProgramEnrollmentCommand::EnrollInProgram(EnrollInProgram {
                enrollment_id: id,
                student_id: StudentId::new(),
                program_id: ProgramId::new(),
                enrolled_on: date(2024, 9, 1),
                expected_graduation: date(2026, 9, 1),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            enrollment.apply(e);
        }
        enrollment
    }

    #[test]
    fn enrolling_opens_an_active_membership() {
        let enrollment = enrolled();
        assert_eq!(enrollment.status(), ProgramEnrollmentStatus::Active);
        assert_eq!(enrollment.current_semester(), 1);
        assert_eq!(enrollment.expected_graduation(), Some(date(2026, 9, 1)));
    }

    #[test]
    fn advancing_increments_the_semester() {
        let mut enrollment = enrolled();
        let events = enrollment
            .handle(&ProgramEnrollmentCommand::AdvanceSemester(AdvanceSemester {
                enrollment_id: enrollment.id_typed(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            enrollment.apply(e);
        }
        assert_eq!(enrollment.current_semester(), 2);
    }

    #[test]
    fn withdrawn_membership_rejects_further_transitions() {
        let mut enrollment = enrolled();
        let events = enrollment
            .handle(&ProgramEnrollmentCommand::WithdrawFromProgram(WithdrawFromProgram {
                enrollment_id: enrollment.id_typed(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            enrollment.apply(e);
        }
        assert_eq!(enrollment.status(), ProgramEnrollmentStatus::Withdrawn);

        let err = enrollment
            .handle(&ProgramEnrollmentCommand::CompleteProgram(CompleteProgram {
                enrollment_id: enrollment.id_typed(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn graduation_must_follow_enrollment() {
        let id = ProgramEnrollmentId::new(AggregateId::new());
        let enrollment = ProgramEnrollment::empty(id);
        let err = enrollment
            .handle(&ProgramEnrollmentCommand::EnrollInProgram(EnrollInProgram {
                enrollment_id: id,
                student_id: StudentId::new(),
                program_id: ProgramId::new(),
                enrolled_on: date(2024, 9, 1),
                expected_graduation: date(2024, 9, 1),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
