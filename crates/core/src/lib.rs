//! `acadledger-core` — shared domain primitives.
//!
//! Everything here is pure: identifiers, money, grades, errors, and the
//! aggregate contract. No IO, no storage, no clocks.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod grade;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use grade::Grade;
pub use id::{AggregateId, CourseId, ProgramId, SemesterId, StudentId};
pub use money::Money;
pub use value_object::ValueObject;
