//! Registrar service: the application façade over the academic ledger.
//!
//! The registrar owns the catalog, the command dispatcher, and the read-model
//! projections. Every mutation goes through the event-sourcing pipeline;
//! committed envelopes are applied to the projections synchronously, so reads
//! issued right after a command observe its effect.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use acadledger_core::{
    AggregateId, CourseId, DomainError, Grade, Money, ProgramId, SemesterId, StudentId,
};
use acadledger_events::{Command, EventBus, EventEnvelope};
use acadledger_finance::{
    AppendTransaction, LedgerCommand, LedgerId, OpenLedger, StudentLedger, TransactionKind,
};
use acadledger_progress::{
    AdvanceSemester, CompleteProgram, CompletedEnrollment, EnrollInProgram, ProgramEnrollment,
    ProgramEnrollmentCommand, ProgramEnrollmentId, ProgramEnrollmentStatus, ProgressReport,
    WithdrawFromProgram, completed_credits,
};
use acadledger_registration::{
    CourseOffering, DropStudent, OfferingCommand, OfferingId, OpenOffering, PrerequisiteGate,
    RecordOutcome, RegisterStudent,
};

use crate::catalog_store::CatalogStore;
use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{EventStore, StoredEvent};
use crate::projections::{
    LedgerStatement, LedgerStatementProjection, OfferingSeats, OfferingSeatsProjection,
    ProjectionApplyError, StudentTranscriptProjection, TranscriptEntry,
};
use crate::read_model::InMemoryReadStore;

const AGG_OFFERING: &str = "registration.offering";
const AGG_LEDGER: &str = "finance.ledger";
const AGG_PROGRAM_ENROLLMENT: &str = "progress.enrollment";

/// Calendar days allotted to one semester when projecting graduation.
const DAYS_PER_SEMESTER: u64 = 180;

type SeatsProjection = OfferingSeatsProjection<Arc<InMemoryReadStore<OfferingId, OfferingSeats>>>;
type TranscriptProjection =
    StudentTranscriptProjection<Arc<InMemoryReadStore<StudentId, Vec<TranscriptEntry>>>>;
type StatementProjection =
    LedgerStatementProjection<Arc<InMemoryReadStore<LedgerId, LedgerStatement>>>;

#[derive(Debug, Error)]
pub enum RegistrarError {
    /// Deterministic business rejection; safe to show to the caller.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Store, bus, or projection failure.
    #[error("infrastructure failure: {0}")]
    Infra(String),
}

impl From<DispatchError> for RegistrarError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(err) => RegistrarError::Domain(err),
            other => RegistrarError::Infra(format!("{other:?}")),
        }
    }
}

impl From<ProjectionApplyError> for RegistrarError {
    fn from(value: ProjectionApplyError) -> Self {
        RegistrarError::Infra(value.to_string())
    }
}

/// A student's standing inside one program, tracked for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Membership {
    enrollment_id: ProgramEnrollmentId,
    ledger_id: LedgerId,
    status: ProgramEnrollmentStatus,
}

/// The registrar.
///
/// Generic over the event store and bus; tests compose the in-memory pair.
pub struct Registrar<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    catalog: CatalogStore,
    seats: SeatsProjection,
    transcripts: TranscriptProjection,
    statements: StatementProjection,
    /// offering → course, resolved when gating registrations.
    offering_courses: RwLock<HashMap<OfferingId, CourseId>>,
    memberships: RwLock<HashMap<(StudentId, ProgramId), Membership>>,
}

impl<S, B> Registrar<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            catalog: CatalogStore::new(),
            seats: OfferingSeatsProjection::new(Arc::new(InMemoryReadStore::new())),
            transcripts: StudentTranscriptProjection::new(Arc::new(InMemoryReadStore::new())),
            statements: LedgerStatementProjection::new(Arc::new(InMemoryReadStore::new())),
            offering_courses: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
        }
    }

    /// Academic reference data (courses, programs, semesters).
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    // ---- registration ----

    /// Open a course offering for a semester. The semester's window is
    /// captured on the offering; later date-gated decisions consult it.
    pub fn open_offering(
        &self,
        course_id: CourseId,
        semester_id: SemesterId,
        section: impl Into<String>,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<OfferingId, RegistrarError> {
        let course = self.catalog.course(course_id)?;
        let semester = self.catalog.semester(semester_id)?;

        let offering_id = OfferingId::new(AggregateId::new());
        let command = OfferingCommand::OpenOffering(OpenOffering {
            offering_id,
            course_id,
            course_code: course.code().to_string(),
            semester_id,
            section: section.into(),
            capacity,
            window: semester.window(),
            occurred_at: now,
        });
        let committed = self.dispatcher.dispatch::<CourseOffering>(
            command.target_aggregate_id(),
            AGG_OFFERING,
            command,
            |id| CourseOffering::empty(OfferingId::new(id)),
        )?;

        self.offering_courses
            .write()
            .map_err(|_| Self::registry_poisoned())?
            .insert(offering_id, course_id);
        self.apply_offering_envelopes(&committed)?;

        tracing::info!(%offering_id, course = course.code(), capacity, "offering opened");
        Ok(offering_id)
    }

    /// Register a student on an offering.
    ///
    /// The prerequisite gate runs first against the student's transcript;
    /// window, capacity, and duplicate checks then run inside the aggregate.
    pub fn register_student(
        &self,
        offering_id: OfferingId,
        student_id: StudentId,
        on: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), RegistrarError> {
        let course_id = self
            .offering_course(offering_id)?
            .ok_or(DomainError::NotFound)?;

        let prerequisites = self.catalog.prerequisites_for(course_id);
        let completed = self.transcripts.completed_courses(student_id);
        PrerequisiteGate::can_register(&prerequisites, &completed)?;

        let command = OfferingCommand::RegisterStudent(RegisterStudent {
            offering_id,
            student_id,
            on,
            occurred_at: now,
        });
        let committed = self.dispatcher.dispatch::<CourseOffering>(
            command.target_aggregate_id(),
            AGG_OFFERING,
            command,
            |id| CourseOffering::empty(OfferingId::new(id)),
        )?;
        self.apply_offering_envelopes(&committed)?;

        tracing::info!(%offering_id, %student_id, %on, "student registered");
        Ok(())
    }

    /// Drop a student from an offering before the add/drop deadline.
    pub fn drop_student(
        &self,
        offering_id: OfferingId,
        student_id: StudentId,
        on: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), RegistrarError> {
        let command = OfferingCommand::DropStudent(DropStudent {
            offering_id,
            student_id,
            on,
            occurred_at: now,
        });
        let committed = self.dispatcher.dispatch::<CourseOffering>(
            command.target_aggregate_id(),
            AGG_OFFERING,
            command,
            |id| CourseOffering::empty(OfferingId::new(id)),
        )?;
        self.apply_offering_envelopes(&committed)?;

        tracing::info!(%offering_id, %student_id, %on, "student dropped");
        Ok(())
    }

    /// Record the end-of-semester outcome for one enrollment.
    pub fn record_outcome(
        &self,
        offering_id: OfferingId,
        student_id: StudentId,
        grade: Grade,
        credits_earned: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(), RegistrarError> {
        let command = OfferingCommand::RecordOutcome(RecordOutcome {
            offering_id,
            student_id,
            grade,
            credits_earned,
            occurred_at: now,
        });
        let committed = self.dispatcher.dispatch::<CourseOffering>(
            command.target_aggregate_id(),
            AGG_OFFERING,
            command,
            |id| CourseOffering::empty(OfferingId::new(id)),
        )?;
        self.apply_offering_envelopes(&committed)?;

        tracing::info!(%offering_id, %student_id, %grade, "outcome recorded");
        Ok(())
    }

    pub fn seats(&self, offering_id: OfferingId) -> Option<OfferingSeats> {
        self.seats.get(offering_id)
    }

    pub fn transcript(&self, student_id: StudentId) -> Vec<TranscriptEntry> {
        self.transcripts.transcript(student_id)
    }

    // ---- program membership ----

    /// Enroll a student in a program.
    ///
    /// Opens the program enrollment and the finance ledger in one operation;
    /// the ledger captures the program's total fee at enrollment time, so a
    /// later fee-schedule change never rewrites an existing ledger.
    pub fn enroll_in_program(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
        enrolled_on: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ProgramEnrollmentId, RegistrarError> {
        let program = self.catalog.program(program_id)?;

        if self
            .membership(student_id, program_id)?
            .is_some_and(|m| m.status == ProgramEnrollmentStatus::Active)
        {
            return Err(DomainError::conflict("already enrolled in this program").into());
        }

        let expected_graduation = enrolled_on
            .checked_add_days(Days::new(
                DAYS_PER_SEMESTER * u64::from(program.duration_semesters()),
            ))
            .ok_or_else(|| DomainError::validation("expected graduation date out of range"))?;

        let enrollment_id = ProgramEnrollmentId::new(AggregateId::new());
        let command = ProgramEnrollmentCommand::EnrollInProgram(EnrollInProgram {
            enrollment_id,
            student_id,
            program_id,
            enrolled_on,
            expected_graduation,
            occurred_at: now,
        });
        self.dispatcher.dispatch::<ProgramEnrollment>(
            command.target_aggregate_id(),
            AGG_PROGRAM_ENROLLMENT,
            command,
            |id| ProgramEnrollment::empty(ProgramEnrollmentId::new(id)),
        )?;

        let ledger_id = LedgerId::new(AggregateId::new());
        let command = LedgerCommand::OpenLedger(OpenLedger {
            ledger_id,
            student_id,
            program_id,
            program_fee_total: program.total_program_fee(),
            occurred_at: now,
        });
        let committed = self.dispatcher.dispatch::<StudentLedger>(
            command.target_aggregate_id(),
            AGG_LEDGER,
            command,
            |id| StudentLedger::empty(LedgerId::new(id)),
        )?;
        self.apply_ledger_envelopes(&committed)?;

        self.memberships
            .write()
            .map_err(|_| Self::registry_poisoned())?
            .insert(
                (student_id, program_id),
                Membership {
                    enrollment_id,
                    ledger_id,
                    status: ProgramEnrollmentStatus::Active,
                },
            );

        tracing::info!(
            %student_id,
            program = program.code(),
            fee_total = %program.total_program_fee(),
            %expected_graduation,
            "student enrolled in program"
        );
        Ok(enrollment_id)
    }

    /// Advance the student to the next semester of their program.
    pub fn advance_semester(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<(), RegistrarError> {
        let membership = self.active_membership(student_id, program_id)?;

        let command = ProgramEnrollmentCommand::AdvanceSemester(AdvanceSemester {
            enrollment_id: membership.enrollment_id,
            occurred_at: now,
        });
        self.dispatcher.dispatch::<ProgramEnrollment>(
            command.target_aggregate_id(),
            AGG_PROGRAM_ENROLLMENT,
            command,
            |id| ProgramEnrollment::empty(ProgramEnrollmentId::new(id)),
        )?;
        Ok(())
    }

    /// Withdraw a student from their program.
    pub fn withdraw_from_program(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<(), RegistrarError> {
        let membership = self.active_membership(student_id, program_id)?;

        let command = ProgramEnrollmentCommand::WithdrawFromProgram(WithdrawFromProgram {
            enrollment_id: membership.enrollment_id,
            occurred_at: now,
        });
        self.dispatcher.dispatch::<ProgramEnrollment>(
            command.target_aggregate_id(),
            AGG_PROGRAM_ENROLLMENT,
            command,
            |id| ProgramEnrollment::empty(ProgramEnrollmentId::new(id)),
        )?;
        self.set_membership_status(student_id, program_id, ProgramEnrollmentStatus::Withdrawn)?;

        tracing::info!(%student_id, %program_id, "student withdrew from program");
        Ok(())
    }

    /// Mark a student's program as completed.
    pub fn complete_program(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<(), RegistrarError> {
        let membership = self.active_membership(student_id, program_id)?;

        let command = ProgramEnrollmentCommand::CompleteProgram(CompleteProgram {
            enrollment_id: membership.enrollment_id,
            occurred_at: now,
        });
        self.dispatcher.dispatch::<ProgramEnrollment>(
            command.target_aggregate_id(),
            AGG_PROGRAM_ENROLLMENT,
            command,
            |id| ProgramEnrollment::empty(ProgramEnrollmentId::new(id)),
        )?;
        self.set_membership_status(student_id, program_id, ProgramEnrollmentStatus::Completed)?;

        tracing::info!(%student_id, %program_id, "program completed");
        Ok(())
    }

    // ---- finance ----

    /// Append a transaction to the student's program ledger.
    pub fn append_transaction(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
        kind: TransactionKind,
        amount: Money,
        description: impl Into<String>,
        transaction_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), RegistrarError> {
        let membership = self
            .membership(student_id, program_id)?
            .ok_or(DomainError::NotEnrolledInProgram)?;

        let command = LedgerCommand::AppendTransaction(AppendTransaction {
            ledger_id: membership.ledger_id,
            kind,
            amount,
            description: description.into(),
            transaction_date,
            occurred_at: now,
        });
        let committed = self.dispatcher.dispatch::<StudentLedger>(
            command.target_aggregate_id(),
            AGG_LEDGER,
            command,
            |id| StudentLedger::empty(LedgerId::new(id)),
        )?;
        self.apply_ledger_envelopes(&committed)?;

        tracing::info!(%student_id, %program_id, ?kind, %amount, "transaction appended");
        Ok(())
    }

    /// Remaining balance the student owes for a program.
    pub fn balance(&self, student_id: StudentId, program_id: ProgramId) -> Result<Money, RegistrarError> {
        let statement = self.statement(student_id, program_id)?;
        Ok(statement.balance)
    }

    /// Full ledger statement for a (student, program) pair.
    pub fn statement(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
    ) -> Result<LedgerStatement, RegistrarError> {
        let membership = self
            .membership(student_id, program_id)?
            .ok_or(DomainError::NotEnrolledInProgram)?;
        self.statements
            .get(membership.ledger_id)
            .ok_or_else(|| RegistrarError::Infra("ledger statement missing".to_string()))
    }

    // ---- progress ----

    /// Derive the student's progress through a program's curriculum.
    ///
    /// Computed on read from the transcript and the catalog; there is no
    /// separate progress read model to drift out of date.
    pub fn progress_report(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
    ) -> Result<ProgressReport, RegistrarError> {
        self.membership(student_id, program_id)?
            .ok_or(DomainError::NotEnrolledInProgram)?;

        let program = self.catalog.program(program_id)?;
        let curriculum = self.catalog.curriculum(program_id)?;

        let completed: Vec<CompletedEnrollment> = self
            .transcripts
            .completed_entries(student_id)
            .into_iter()
            .map(|entry| CompletedEnrollment {
                course_id: entry.course_id,
                credits_earned: entry.credits_earned,
                course_credits: self
                    .catalog
                    .course(entry.course_id)
                    .map(|c| c.credits())
                    .unwrap_or(0),
            })
            .collect();

        let earned = completed_credits(&completed, &curriculum);
        Ok(ProgressReport::new(earned, program.total_credits()))
    }

    // ---- internals ----

    /// A poisoned registry lock means a writer panicked mid-update; the maps
    /// can no longer be trusted, so every routing call fails loudly instead
    /// of reporting students as unenrolled.
    fn registry_poisoned() -> RegistrarError {
        RegistrarError::Infra("registrar registry lock poisoned".to_string())
    }

    fn offering_course(
        &self,
        offering_id: OfferingId,
    ) -> Result<Option<CourseId>, RegistrarError> {
        let map = self
            .offering_courses
            .read()
            .map_err(|_| Self::registry_poisoned())?;
        Ok(map.get(&offering_id).copied())
    }

    fn membership(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
    ) -> Result<Option<Membership>, RegistrarError> {
        let map = self
            .memberships
            .read()
            .map_err(|_| Self::registry_poisoned())?;
        Ok(map.get(&(student_id, program_id)).copied())
    }

    fn active_membership(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
    ) -> Result<Membership, RegistrarError> {
        let membership = self
            .membership(student_id, program_id)?
            .ok_or(DomainError::NotEnrolledInProgram)?;
        if membership.status != ProgramEnrollmentStatus::Active {
            return Err(DomainError::NotEnrolledInProgram.into());
        }
        Ok(membership)
    }

    fn set_membership_status(
        &self,
        student_id: StudentId,
        program_id: ProgramId,
        status: ProgramEnrollmentStatus,
    ) -> Result<(), RegistrarError> {
        let mut map = self
            .memberships
            .write()
            .map_err(|_| Self::registry_poisoned())?;
        if let Some(m) = map.get_mut(&(student_id, program_id)) {
            m.status = status;
        }
        Ok(())
    }

    fn apply_offering_envelopes(&self, committed: &[StoredEvent]) -> Result<(), RegistrarError> {
        for stored in committed {
            let envelope = stored.to_envelope();
            self.seats.apply_envelope(&envelope)?;
            self.transcripts.apply_envelope(&envelope)?;
        }
        Ok(())
    }

    fn apply_ledger_envelopes(&self, committed: &[StoredEvent]) -> Result<(), RegistrarError> {
        for stored in committed {
            self.statements.apply_envelope(&stored.to_envelope())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::InMemoryEventStore;
    use acadledger_events::InMemoryEventBus;

    type TestRegistrar =
        Registrar<InMemoryEventStore, InMemoryEventBus<EventEnvelope<JsonValue>>>;

    #[test]
    fn poisoned_registry_fails_loudly_instead_of_unenrolling_students() {
        let registrar: TestRegistrar =
            Registrar::new(InMemoryEventStore::new(), InMemoryEventBus::new());

        let poisoner = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = registrar.memberships.write().unwrap();
            panic!("poisoning the membership registry");
        }));
        assert!(poisoner.is_err());

        // A lookup after the panic must not read as "not enrolled".
        let err = registrar
            .membership(StudentId::new(), ProgramId::new())
            .unwrap_err();
        assert!(matches!(err, RegistrarError::Infra(_)));

        let err = registrar
            .set_membership_status(
                StudentId::new(),
                ProgramId::new(),
                ProgramEnrollmentStatus::Withdrawn,
            )
            .unwrap_err();
        assert!(matches!(err, RegistrarError::Infra(_)));
    }
}
