use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use acadledger_catalog::SemesterWindow;
use acadledger_core::{
    Aggregate, AggregateId, AggregateRoot, CourseId, DomainError, Grade, SemesterId, StudentId,
};
use acadledger_events::{Command, Event};

/// Course offering identifier (aggregate id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferingId(pub AggregateId);

impl OfferingId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OfferingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Enrollment status lifecycle. One-way: `Registered` moves to exactly one of
/// the terminal states; re-enrollment after a drop starts a fresh record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Registered,
    Completed,
    Withdrawn,
    Failed,
}

/// One student's enrollment row on this offering.
///
/// `active` mirrors the row-level flag the seat counter summarizes: it stays
/// set through completion or failure and clears only on withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub status: EnrollmentStatus,
    pub grade: Option<Grade>,
    pub credits_earned: Option<u32>,
    pub active: bool,
    pub enrolled_on: NaiveDate,
}

impl EnrollmentRecord {
    fn registered(on: NaiveDate) -> Self {
        Self {
            status: EnrollmentStatus::Registered,
            grade: None,
            credits_earned: None,
            active: true,
            enrolled_on: on,
        }
    }
}

/// Aggregate root: CourseOffering (a course section taught in one semester).
///
/// The `enrolled` counter and the enrollment rows evolve in the same `apply`,
/// which closes the read-then-increment race of a cached counter updated
/// beside the row insert: within a stream the counter always equals the
/// number of active rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOffering {
    id: OfferingId,
    course_id: Option<CourseId>,
    course_code: String,
    semester_id: Option<SemesterId>,
    section: String,
    capacity: u32,
    enrolled: u32,
    window: Option<SemesterWindow>,
    enrollments: BTreeMap<StudentId, EnrollmentRecord>,
    active: bool,
    version: u64,
    created: bool,
}

impl CourseOffering {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: OfferingId) -> Self {
        Self {
            id,
            course_id: None,
            course_code: String::new(),
            semester_id: None,
            section: String::new(),
            capacity: 0,
            enrolled: 0,
            window: None,
            enrollments: BTreeMap::new(),
            active: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OfferingId {
        self.id
    }

    pub fn course_id(&self) -> Option<CourseId> {
        self.course_id
    }

    pub fn course_code(&self) -> &str {
        &self.course_code
    }

    pub fn semester_id(&self) -> Option<SemesterId> {
        self.semester_id
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn enrolled(&self) -> u32 {
        self.enrolled
    }

    pub fn available_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }

    pub fn is_full(&self) -> bool {
        self.enrolled >= self.capacity
    }

    pub fn enrollment(&self, student_id: StudentId) -> Option<&EnrollmentRecord> {
        self.enrollments.get(&student_id)
    }

    /// Count of rows the seat counter summarizes (everything not withdrawn).
    pub fn active_enrollment_count(&self) -> u32 {
        self.enrollments.values().filter(|r| r.active).count() as u32
    }
}

impl AggregateRoot for CourseOffering {
    type Id = OfferingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenOffering.
///
/// The semester window travels with the command; date-gated decisions later
/// consult the captured window rather than any ambient "current semester".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOffering {
    pub offering_id: OfferingId,
    pub course_id: CourseId,
    pub course_code: String,
    pub semester_id: SemesterId,
    pub section: String,
    pub capacity: u32,
    pub window: SemesterWindow,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RegisterStudent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterStudent {
    pub offering_id: OfferingId,
    pub student_id: StudentId,
    /// Calendar date of the attempt, checked against the semester window.
    pub on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DropStudent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropStudent {
    pub offering_id: OfferingId,
    pub student_id: StudentId,
    pub on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordOutcome (grading at end of semester).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub offering_id: OfferingId,
    pub student_id: StudentId,
    pub grade: Grade,
    pub credits_earned: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferingCommand {
    OpenOffering(OpenOffering),
    RegisterStudent(RegisterStudent),
    DropStudent(DropStudent),
    RecordOutcome(RecordOutcome),
}

impl Command for OfferingCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            OfferingCommand::OpenOffering(c) => c.offering_id.0,
            OfferingCommand::RegisterStudent(c) => c.offering_id.0,
            OfferingCommand::DropStudent(c) => c.offering_id.0,
            OfferingCommand::RecordOutcome(c) => c.offering_id.0,
        }
    }
}

/// Event: OfferingOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingOpened {
    pub offering_id: OfferingId,
    pub course_id: CourseId,
    pub course_code: String,
    pub semester_id: SemesterId,
    pub section: String,
    pub capacity: u32,
    pub window: SemesterWindow,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StudentRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRegistered {
    pub offering_id: OfferingId,
    pub student_id: StudentId,
    pub on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StudentDropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDropped {
    pub offering_id: OfferingId,
    pub student_id: StudentId,
    pub on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: EnrollmentCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentCompleted {
    pub offering_id: OfferingId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub grade: Grade,
    pub credits_earned: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: EnrollmentFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentFailed {
    pub offering_id: OfferingId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub grade: Grade,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferingEvent {
    OfferingOpened(OfferingOpened),
    StudentRegistered(StudentRegistered),
    StudentDropped(StudentDropped),
    EnrollmentCompleted(EnrollmentCompleted),
    EnrollmentFailed(EnrollmentFailed),
}

impl Event for OfferingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OfferingEvent::OfferingOpened(_) => "registration.offering.opened",
            OfferingEvent::StudentRegistered(_) => "registration.offering.student_registered",
            OfferingEvent::StudentDropped(_) => "registration.offering.student_dropped",
            OfferingEvent::EnrollmentCompleted(_) => "registration.offering.enrollment_completed",
            OfferingEvent::EnrollmentFailed(_) => "registration.offering.enrollment_failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OfferingEvent::OfferingOpened(e) => e.occurred_at,
            OfferingEvent::StudentRegistered(e) => e.occurred_at,
            OfferingEvent::StudentDropped(e) => e.occurred_at,
            OfferingEvent::EnrollmentCompleted(e) => e.occurred_at,
            OfferingEvent::EnrollmentFailed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for CourseOffering {
    type Command = OfferingCommand;
    type Event = OfferingEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OfferingEvent::OfferingOpened(e) => {
                self.id = e.offering_id;
                self.course_id = Some(e.course_id);
                self.course_code = e.course_code.clone();
                self.semester_id = Some(e.semester_id);
                self.section = e.section.clone();
                self.capacity = e.capacity;
                self.enrolled = 0;
                self.window = Some(e.window);
                self.enrollments.clear();
                self.active = true;
                self.created = true;
            }
            OfferingEvent::StudentRegistered(e) => {
                // Counter and row change together; a fresh row replaces any
                // earlier withdrawn one.
                self.enrollments
                    .insert(e.student_id, EnrollmentRecord::registered(e.on));
                self.enrolled += 1;
            }
            OfferingEvent::StudentDropped(e) => {
                if let Some(record) = self.enrollments.get_mut(&e.student_id) {
                    record.status = EnrollmentStatus::Withdrawn;
                    record.grade = Some(Grade::W);
                    record.active = false;
                }
                self.enrolled = self.enrolled.saturating_sub(1);
            }
            OfferingEvent::EnrollmentCompleted(e) => {
                if let Some(record) = self.enrollments.get_mut(&e.student_id) {
                    record.status = EnrollmentStatus::Completed;
                    record.grade = Some(e.grade);
                    record.credits_earned = e.credits_earned;
                }
            }
            OfferingEvent::EnrollmentFailed(e) => {
                if let Some(record) = self.enrollments.get_mut(&e.student_id) {
                    record.status = EnrollmentStatus::Failed;
                    record.grade = Some(e.grade);
                    record.credits_earned = Some(0);
                }
            }
        }

        // Version moves one step per event, no matter which event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OfferingCommand::OpenOffering(cmd) => self.handle_open(cmd),
            OfferingCommand::RegisterStudent(cmd) => self.handle_register(cmd),
            OfferingCommand::DropStudent(cmd) => self.handle_drop(cmd),
            OfferingCommand::RecordOutcome(cmd) => self.handle_outcome(cmd),
        }
    }
}

impl CourseOffering {
    fn ensure_offering_id(&self, offering_id: OfferingId) -> Result<(), DomainError> {
        if self.id != offering_id {
            return Err(DomainError::invariant("offering_id mismatch"));
        }
        Ok(())
    }

    fn window(&self) -> Result<SemesterWindow, DomainError> {
        self.window
            .ok_or_else(|| DomainError::invariant("offering has no semester window"))
    }

    fn handle_open(&self, cmd: &OpenOffering) -> Result<Vec<OfferingEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("offering already opened"));
        }
        if cmd.section.trim().is_empty() {
            return Err(DomainError::validation("section cannot be empty"));
        }
        if cmd.capacity == 0 {
            return Err(DomainError::validation("capacity must be positive"));
        }

        Ok(vec![OfferingEvent::OfferingOpened(OfferingOpened {
            offering_id: cmd.offering_id,
            course_id: cmd.course_id,
            course_code: cmd.course_code.clone(),
            semester_id: cmd.semester_id,
            section: cmd.section.clone(),
            capacity: cmd.capacity,
            window: cmd.window,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Check order: window, capacity, duplicate. Prerequisites are decided
    /// upstream by the gate, which has the student's history.
    fn handle_register(&self, cmd: &RegisterStudent) -> Result<Vec<OfferingEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_offering_id(cmd.offering_id)?;
        if !self.active {
            return Err(DomainError::conflict("offering is not active"));
        }

        if !self.window()?.registration_open(cmd.on) {
            return Err(DomainError::RegistrationWindowClosed);
        }

        if self.is_full() {
            return Err(DomainError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        if self
            .enrollments
            .get(&cmd.student_id)
            .is_some_and(|r| r.active)
        {
            return Err(DomainError::DuplicateEnrollment);
        }

        Ok(vec![OfferingEvent::StudentRegistered(StudentRegistered {
            offering_id: cmd.offering_id,
            student_id: cmd.student_id,
            on: cmd.on,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_drop(&self, cmd: &DropStudent) -> Result<Vec<OfferingEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_offering_id(cmd.offering_id)?;

        if !self.window()?.drop_allowed(cmd.on) {
            return Err(DomainError::DeadlinePassed);
        }

        let record = self
            .enrollments
            .get(&cmd.student_id)
            .ok_or(DomainError::NotFound)?;
        if record.status != EnrollmentStatus::Registered {
            return Err(DomainError::conflict(
                "only a registered enrollment can be dropped",
            ));
        }

        Ok(vec![OfferingEvent::StudentDropped(StudentDropped {
            offering_id: cmd.offering_id,
            student_id: cmd.student_id,
            on: cmd.on,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_outcome(&self, cmd: &RecordOutcome) -> Result<Vec<OfferingEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_offering_id(cmd.offering_id)?;

        let record = self
            .enrollments
            .get(&cmd.student_id)
            .ok_or(DomainError::NotFound)?;
        if record.status != EnrollmentStatus::Registered {
            return Err(DomainError::conflict(
                "outcome already recorded for this enrollment",
            ));
        }

        let course_id = self
            .course_id
            .ok_or_else(|| DomainError::invariant("offering has no course"))?;

        let event = if cmd.grade.is_passing() {
            OfferingEvent::EnrollmentCompleted(EnrollmentCompleted {
                offering_id: cmd.offering_id,
                student_id: cmd.student_id,
                course_id,
                grade: cmd.grade,
                credits_earned: cmd.credits_earned,
                occurred_at: cmd.occurred_at,
            })
        } else {
            OfferingEvent::EnrollmentFailed(EnrollmentFailed {
                offering_id: cmd.offering_id,
                student_id: cmd.student_id,
                course_id,
                grade: cmd.grade,
                occurred_at: cmd.occurred_at,
            })
        };

        Ok(vec![event])
    }
}
