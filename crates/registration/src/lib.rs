//! `acadledger-registration`
//!
//! **Responsibility:** seat bookkeeping and admission decisions.
//!
//! The `CourseOffering` aggregate owns the enrolled-seat counter: the counter
//! and the enrollment row change inside the same event application, so the
//! counter can never drift from the rows it summarizes. The prerequisite gate
//! is a pure decision over a student's completed-course history.

pub mod offering;
pub mod prerequisite;

pub use offering::{
    CourseOffering, DropStudent, EnrollmentCompleted, EnrollmentFailed, EnrollmentRecord,
    EnrollmentStatus, OfferingCommand, OfferingEvent, OfferingId, OfferingOpened, OpenOffering,
    RecordOutcome, RegisterStudent, StudentDropped, StudentRegistered,
};
pub use prerequisite::{CompletedCourse, PrerequisiteGate};
