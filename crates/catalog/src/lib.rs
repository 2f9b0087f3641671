//! `acadledger-catalog`
//!
//! **Responsibility:** academic reference data — courses, prerequisites,
//! programs with fee schedules and curricula, semesters.
//!
//! Catalog entries are plain entities, not event-sourced aggregates: they are
//! administrative configuration the bookkeeping core reads, never mutates.

pub mod course;
pub mod program;
pub mod semester;

pub use course::{Course, CourseLevel, CoursePrerequisite, CourseType};
pub use program::{CurriculumEntry, Program, ProgramCategory, ProgramCurriculum};
pub use semester::{Semester, SemesterWindow};
