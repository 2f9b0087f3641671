//! In-memory store for academic reference data.
//!
//! Catalog entries are administrative configuration, not event-sourced
//! aggregates. The registrar reads them when deciding registrations, opening
//! ledgers, and deriving progress.

use std::collections::HashMap;
use std::sync::RwLock;

use acadledger_catalog::{Course, CoursePrerequisite, Program, ProgramCurriculum, Semester};
use acadledger_core::{CourseId, DomainError, DomainResult, ProgramId, SemesterId};

#[derive(Debug, Default)]
pub struct CatalogStore {
    courses: RwLock<HashMap<CourseId, Course>>,
    prerequisites: RwLock<HashMap<CourseId, Vec<CoursePrerequisite>>>,
    programs: RwLock<HashMap<ProgramId, Program>>,
    curricula: RwLock<HashMap<ProgramId, ProgramCurriculum>>,
    semesters: RwLock<HashMap<SemesterId, Semester>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_course(&self, course: Course) -> DomainResult<()> {
        let mut courses = self
            .courses
            .write()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        if courses.contains_key(&course.id_typed()) {
            return Err(DomainError::conflict("course already in catalog"));
        }
        courses.insert(course.id_typed(), course);
        Ok(())
    }

    pub fn course(&self, id: CourseId) -> DomainResult<Course> {
        self.courses
            .read()
            .ok()
            .and_then(|m| m.get(&id).cloned())
            .ok_or(DomainError::NotFound)
    }

    /// Add a prerequisite edge. Both endpoints must already be in the catalog.
    pub fn add_prerequisite(&self, edge: CoursePrerequisite) -> DomainResult<()> {
        self.course(edge.course_id())?;
        self.course(edge.prerequisite_id())?;

        let mut prerequisites = self
            .prerequisites
            .write()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        prerequisites.entry(edge.course_id()).or_default().push(edge);
        Ok(())
    }

    /// Prerequisite edges for a course, in insertion order.
    pub fn prerequisites_for(&self, course_id: CourseId) -> Vec<CoursePrerequisite> {
        self.prerequisites
            .read()
            .ok()
            .and_then(|m| m.get(&course_id).cloned())
            .unwrap_or_default()
    }

    pub fn add_program(&self, program: Program) -> DomainResult<()> {
        let mut programs = self
            .programs
            .write()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        if programs.contains_key(&program.id_typed()) {
            return Err(DomainError::conflict("program already in catalog"));
        }
        programs.insert(program.id_typed(), program);
        Ok(())
    }

    pub fn program(&self, id: ProgramId) -> DomainResult<Program> {
        self.programs
            .read()
            .ok()
            .and_then(|m| m.get(&id).cloned())
            .ok_or(DomainError::NotFound)
    }

    pub fn set_curriculum(&self, curriculum: ProgramCurriculum) -> DomainResult<()> {
        self.program(curriculum.program_id())?;

        let mut curricula = self
            .curricula
            .write()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        curricula.insert(curriculum.program_id(), curriculum);
        Ok(())
    }

    pub fn curriculum(&self, program_id: ProgramId) -> DomainResult<ProgramCurriculum> {
        self.curricula
            .read()
            .ok()
            .and_then(|m| m.get(&program_id).cloned())
            .ok_or(DomainError::NotFound)
    }

    pub fn add_semester(&self, semester: Semester) -> DomainResult<()> {
        let mut semesters = self
            .semesters
            .write()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        if semesters.contains_key(&semester.id_typed()) {
            return Err(DomainError::conflict("semester already in catalog"));
        }
        semesters.insert(semester.id_typed(), semester);
        Ok(())
    }

    pub fn semester(&self, id: SemesterId) -> DomainResult<Semester> {
        self.semesters
            .read()
            .ok()
            .and_then(|m| m.get(&id).cloned())
            .ok_or(DomainError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acadledger_catalog::{CourseLevel, CourseType};

    fn course(code: &str) -> Course {
        Course::new(
            CourseId::new(),
            code,
            format!("{code} title"),
            3,
            CourseLevel::L100,
            CourseType::Core,
        )
        .unwrap()
    }

    #[test]
    fn duplicate_course_is_a_conflict() {
        let store = CatalogStore::new();
        let c = course("CS101");
        store.add_course(c.clone()).unwrap();
        assert!(matches!(store.add_course(c), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn prerequisite_endpoints_must_exist() {
        let store = CatalogStore::new();
        let cs101 = course("CS101");
        let cs201 = course("CS201");
        store.add_course(cs201.clone()).unwrap();

        let edge = CoursePrerequisite::new(
            cs201.id_typed(),
            cs101.id_typed(),
            "CS101",
            true,
            None,
        )
        .unwrap();

        assert_eq!(store.add_prerequisite(edge.clone()), Err(DomainError::NotFound));

        store.add_course(cs101).unwrap();
        store.add_prerequisite(edge).unwrap();
        assert_eq!(store.prerequisites_for(cs201.id_typed()).len(), 1);
    }
}
