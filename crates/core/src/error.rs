//! Business rejections shared by every domain crate.

use thiserror::Error;

/// Shorthand for fallible domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic business rejection.
///
/// Retrying any of these without changing the input reproduces the same
/// refusal, and a refused operation leaves prior state untouched. Transient
/// infrastructure faults live in the infra layer instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// State reached a shape the domain forbids.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier string did not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The referenced entity does not exist.
    #[error("not found")]
    NotFound,

    /// The operation collides with existing state, such as a duplicate
    /// catalog code or a stale version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The offering has no seats left.
    #[error("offering is full (capacity {capacity})")]
    CapacityExceeded { capacity: u32 },

    /// The student already holds an active enrollment on this offering.
    #[error("already enrolled in this offering")]
    DuplicateEnrollment,

    /// The add/drop deadline for the semester has passed.
    #[error("add/drop period has ended")]
    DeadlinePassed,

    /// A mandatory prerequisite has no qualifying completed enrollment.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// The student has no active enrollment in the program.
    #[error("not enrolled in program")]
    NotEnrolledInProgram,

    /// The semester's registration window is not open on the given date.
    #[error("registration window is closed")]
    RegistrationWindowClosed,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn missing_prerequisite(course_code: impl Into<String>) -> Self {
        Self::MissingPrerequisite(course_code.into())
    }
}
