//! Prerequisite admission gate.

use serde::{Deserialize, Serialize};

use acadledger_catalog::CoursePrerequisite;
use acadledger_core::{CourseId, DomainError, DomainResult, Grade};

/// A completed, active enrollment from a student's history, as the gate sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCourse {
    pub course_id: CourseId,
    /// May be absent: an ungraded completed row still exists in legacy data.
    pub grade: Option<Grade>,
}

/// Decides whether a student's completed-course history admits them to a
/// course, given that course's prerequisite edges.
///
/// Stateless; the caller supplies both sides of the decision.
pub struct PrerequisiteGate;

impl PrerequisiteGate {
    /// Returns `Ok(())` when every mandatory prerequisite has a qualifying
    /// completed enrollment, or `Err(MissingPrerequisite(code))` for the
    /// **first** unmet mandatory prerequisite in edge order (remaining edges
    /// are not inspected).
    ///
    /// A prerequisite with a `minimum_grade` qualifies by raw letter ordering
    /// (`grade ≤ minimum`); a completed row with no recorded grade has nothing
    /// to compare and never clears a threshold. Without a threshold, any
    /// completed enrollment counts, graded or not.
    pub fn can_register(
        prerequisites: &[CoursePrerequisite],
        completed: &[CompletedCourse],
    ) -> DomainResult<()> {
        for prereq in prerequisites {
            let satisfied = completed
                .iter()
                .filter(|c| c.course_id == prereq.prerequisite_id())
                .any(|c| Self::qualifies(c.grade, prereq.minimum_grade()));

            if !satisfied && prereq.is_mandatory() {
                return Err(DomainError::missing_prerequisite(prereq.prerequisite_code()));
            }
        }

        Ok(())
    }

    fn qualifies(grade: Option<Grade>, minimum: Option<Grade>) -> bool {
        match (grade, minimum) {
            (_, None) => true,
            // No grade on record, nothing to compare against the threshold.
            (None, Some(_)) => false,
            (Some(g), Some(min)) => g.satisfies_minimum(min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prereq(
        course: CourseId,
        prerequisite: CourseId,
        code: &str,
        mandatory: bool,
        minimum: Option<Grade>,
    ) -> CoursePrerequisite {
        CoursePrerequisite::new(course, prerequisite, code, mandatory, minimum).unwrap()
    }

    #[test]
    fn no_prerequisites_always_admits() {
        assert!(PrerequisiteGate::can_register(&[], &[]).is_ok());
    }

    #[test]
    fn missing_mandatory_prerequisite_blocks_with_its_code() {
        let course = CourseId::new();
        let required = CourseId::new();
        let edges = vec![prereq(course, required, "CS101", true, None)];

        let err = PrerequisiteGate::can_register(&edges, &[]).unwrap_err();
        assert_eq!(err, DomainError::MissingPrerequisite("CS101".to_string()));
    }

    #[test]
    fn missing_optional_prerequisite_does_not_block() {
        let course = CourseId::new();
        let recommended = CourseId::new();
        let edges = vec![prereq(course, recommended, "MATH110", false, None)];

        assert!(PrerequisiteGate::can_register(&edges, &[]).is_ok());
    }

    #[test]
    fn grade_threshold_is_raw_letter_ordering() {
        let course = CourseId::new();
        let required = CourseId::new();
        let edges = vec![prereq(course, required, "CS101", true, Some(Grade::C))];

        let too_low = [CompletedCourse {
            course_id: required,
            grade: Some(Grade::D),
        }];
        let err = PrerequisiteGate::can_register(&edges, &too_low).unwrap_err();
        assert_eq!(err, DomainError::MissingPrerequisite("CS101".to_string()));

        let exactly = [CompletedCourse {
            course_id: required,
            grade: Some(Grade::C),
        }];
        assert!(PrerequisiteGate::can_register(&edges, &exactly).is_ok());

        let better = [CompletedCourse {
            course_id: required,
            grade: Some(Grade::A),
        }];
        assert!(PrerequisiteGate::can_register(&edges, &better).is_ok());
    }

    #[test]
    fn ungraded_completed_row_never_clears_a_threshold() {
        let course = CourseId::new();
        let required = CourseId::new();
        let gated = vec![prereq(course, required, "CS101", true, Some(Grade::C))];

        let ungraded = [CompletedCourse {
            course_id: required,
            grade: None,
        }];
        let err = PrerequisiteGate::can_register(&gated, &ungraded).unwrap_err();
        assert_eq!(err, DomainError::MissingPrerequisite("CS101".to_string()));

        // Without a threshold the same ungraded completion is enough.
        let ungated = vec![prereq(course, required, "CS101", true, None)];
        assert!(PrerequisiteGate::can_register(&ungated, &ungraded).is_ok());
    }

    #[test]
    fn reports_first_unmet_mandatory_prerequisite_only() {
        let course = CourseId::new();
        let first = CourseId::new();
        let second = CourseId::new();
        let edges = vec![
            prereq(course, first, "CS101", true, None),
            prereq(course, second, "MATH201", true, None),
        ];

        let err = PrerequisiteGate::can_register(&edges, &[]).unwrap_err();
        assert_eq!(err, DomainError::MissingPrerequisite("CS101".to_string()));
    }

    #[test]
    fn completion_of_other_courses_is_ignored() {
        let course = CourseId::new();
        let required = CourseId::new();
        let unrelated = CourseId::new();
        let edges = vec![prereq(course, required, "CS101", true, None)];

        let history = [CompletedCourse {
            course_id: unrelated,
            grade: Some(Grade::A),
        }];
        let err = PrerequisiteGate::can_register(&edges, &history).unwrap_err();
        assert_eq!(err, DomainError::MissingPrerequisite("CS101".to_string()));
    }
}
