//! `acadledger-progress`
//!
//! **Responsibility:** program membership and degree progress.
//!
//! `ProgramEnrollment` tracks a student's standing inside a program; the
//! `progress` module derives completed credits and percentage figures from
//! completed course enrollments intersected with the program's curriculum.

pub mod program_enrollment;
pub mod progress;

pub use program_enrollment::{
    AdvanceSemester, CompleteProgram, EnrollInProgram, ProgramEnrollment, ProgramEnrollmentCommand,
    ProgramEnrollmentEvent, ProgramEnrollmentId, ProgramEnrollmentOpened, ProgramEnrollmentStatus,
    ProgramCompleted, ProgramWithdrawn, SemesterAdvanced, WithdrawFromProgram,
};
pub use progress::{CompletedEnrollment, ProgressReport, completed_credits, progress_percentage};
