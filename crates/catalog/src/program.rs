use serde::{Deserialize, Serialize};

use acadledger_core::{CourseId, DomainError, DomainResult, Entity, Money, ProgramId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramCategory {
    Degree,
    Diploma,
    Certificate,
    Postgrad,
}

/// An academic program with its fee schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    id: ProgramId,
    code: String, // e.g. "BSC-CS"
    name: String,
    category: ProgramCategory,
    duration_semesters: u32,
    total_credits: u32,
    tuition_fee: Money,
    registration_fee: Money,
    exam_fee: Money,
    other_fees: Money,
    active: bool,
}

impl Program {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProgramId,
        code: impl Into<String>,
        name: impl Into<String>,
        category: ProgramCategory,
        duration_semesters: u32,
        total_credits: u32,
        tuition_fee: Money,
        registration_fee: Money,
        exam_fee: Money,
        other_fees: Money,
    ) -> DomainResult<Self> {
        let code = code.into();
        let name = name.into();

        if code.trim().is_empty() {
            return Err(DomainError::validation("program code cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("program name cannot be empty"));
        }
        if duration_semesters == 0 {
            return Err(DomainError::validation(
                "program duration must be at least one semester",
            ));
        }
        for (label, fee) in [
            ("tuition_fee", tuition_fee),
            ("registration_fee", registration_fee),
            ("exam_fee", exam_fee),
            ("other_fees", other_fees),
        ] {
            if fee.is_negative() {
                return Err(DomainError::validation(format!("{label} cannot be negative")));
            }
        }

        Ok(Self {
            id,
            code,
            name,
            category,
            duration_semesters,
            total_credits,
            tuition_fee,
            registration_fee,
            exam_fee,
            other_fees,
            active: true,
        })
    }

    pub fn id_typed(&self) -> ProgramId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ProgramCategory {
        self.category
    }

    pub fn duration_semesters(&self) -> u32 {
        self.duration_semesters
    }

    pub fn total_credits(&self) -> u32 {
        self.total_credits
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Recurring fees for one semester (tuition + exam + other).
    pub fn total_fee_per_semester(&self) -> Money {
        self.tuition_fee + self.exam_fee + self.other_fees
    }

    /// Fees for the entire program: per-semester fees over the duration,
    /// plus the one-time registration fee.
    pub fn total_program_fee(&self) -> Money {
        self.total_fee_per_semester().times(self.duration_semesters) + self.registration_fee
    }
}

impl Entity for Program {
    type Id = ProgramId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One curriculum row: a course and its contribution to a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumEntry {
    pub course_id: CourseId,
    /// Semester when this course is typically taken (1-based).
    pub semester: u32,
    pub required: bool,
    pub credits_contribution: u32,
}

/// The ordered set of courses a program requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramCurriculum {
    program_id: ProgramId,
    entries: Vec<CurriculumEntry>,
}

impl ProgramCurriculum {
    pub fn new(program_id: ProgramId) -> Self {
        Self {
            program_id,
            entries: Vec::new(),
        }
    }

    pub fn program_id(&self) -> ProgramId {
        self.program_id
    }

    pub fn entries(&self) -> &[CurriculumEntry] {
        &self.entries
    }

    /// Add a course to the curriculum. A course may appear at most once.
    pub fn add_entry(&mut self, entry: CurriculumEntry) -> DomainResult<()> {
        if !(1..=12).contains(&entry.semester) {
            return Err(DomainError::validation(format!(
                "curriculum semester must be within 1..=12 (got {})",
                entry.semester
            )));
        }
        if self.entries.iter().any(|e| e.course_id == entry.course_id) {
            return Err(DomainError::conflict(
                "course already present in this curriculum",
            ));
        }

        self.entries.push(entry);
        self.entries.sort_by_key(|e| (e.semester, e.course_id));
        Ok(())
    }

    pub fn contains_course(&self, course_id: CourseId) -> bool {
        self.entries.iter().any(|e| e.course_id == course_id)
    }
}
