use serde::{Deserialize, Serialize};

use acadledger_core::{CourseId, DomainError, DomainResult, Entity, Grade};

/// Academic level of a course (100 = introductory … 500 = graduate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    L100,
    L200,
    L300,
    L400,
    L500,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseType {
    Core,
    Elective,
    Lab,
    Project,
    Thesis,
}

/// A course in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    id: CourseId,
    code: String, // e.g. "CS101"
    name: String,
    credits: u32,
    level: CourseLevel,
    course_type: CourseType,
    active: bool,
}

impl Course {
    /// Credits are bounded to 1..=6 per catalog policy.
    pub fn new(
        id: CourseId,
        code: impl Into<String>,
        name: impl Into<String>,
        credits: u32,
        level: CourseLevel,
        course_type: CourseType,
    ) -> DomainResult<Self> {
        let code = code.into();
        let name = name.into();

        if code.trim().is_empty() {
            return Err(DomainError::validation("course code cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("course name cannot be empty"));
        }
        if !(1..=6).contains(&credits) {
            return Err(DomainError::validation(format!(
                "course credits must be within 1..=6 (got {credits})"
            )));
        }

        Ok(Self {
            id,
            code,
            name,
            credits,
            level,
            course_type,
            active: true,
        })
    }

    pub fn id_typed(&self) -> CourseId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credits(&self) -> u32 {
        self.credits
    }

    pub fn level(&self) -> CourseLevel {
        self.level
    }

    pub fn course_type(&self) -> CourseType {
        self.course_type
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

impl Entity for Course {
    type Id = CourseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Directed prerequisite edge: `course` requires `prerequisite`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePrerequisite {
    course_id: CourseId,
    prerequisite_id: CourseId,
    /// Code of the prerequisite course, surfaced in rejection messages.
    prerequisite_code: String,
    mandatory: bool,
    minimum_grade: Option<Grade>,
}

impl CoursePrerequisite {
    pub fn new(
        course_id: CourseId,
        prerequisite_id: CourseId,
        prerequisite_code: impl Into<String>,
        mandatory: bool,
        minimum_grade: Option<Grade>,
    ) -> DomainResult<Self> {
        if course_id == prerequisite_id {
            return Err(DomainError::validation(
                "a course cannot be its own prerequisite",
            ));
        }

        Ok(Self {
            course_id,
            prerequisite_id,
            prerequisite_code: prerequisite_code.into(),
            mandatory,
            minimum_grade,
        })
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn prerequisite_id(&self) -> CourseId {
        self.prerequisite_id
    }

    pub fn prerequisite_code(&self) -> &str {
        &self.prerequisite_code
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn minimum_grade(&self) -> Option<Grade> {
        self.minimum_grade
    }
}
