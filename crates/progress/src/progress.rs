//! Completed-credit and percentage derivation.

use serde::{Deserialize, Serialize};

use acadledger_catalog::ProgramCurriculum;
use acadledger_core::CourseId;

/// One completed course enrollment, as the progress derivation sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedEnrollment {
    pub course_id: CourseId,
    /// Credits recorded on the enrollment, when the grader filled them in.
    pub credits_earned: Option<u32>,
    /// The course's static credit value, the fallback.
    pub course_credits: u32,
}

impl CompletedEnrollment {
    fn credits(&self) -> u32 {
        self.credits_earned.unwrap_or(self.course_credits)
    }
}

/// Derived progress figures for one (student, program) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub completed_credits: u32,
    pub total_credits: u32,
    pub percentage: f64,
}

impl ProgressReport {
    pub fn new(completed: u32, total: u32) -> Self {
        Self {
            completed_credits: completed,
            total_credits: total,
            percentage: progress_percentage(completed, total),
        }
    }
}

/// Sum credits over completed enrollments whose course appears in the
/// program's curriculum. Uses `credits_earned` when present, otherwise the
/// course's static credits. Courses outside the curriculum contribute nothing.
pub fn completed_credits(completed: &[CompletedEnrollment], curriculum: &ProgramCurriculum) -> u32 {
    completed
        .iter()
        .filter(|e| curriculum.contains_course(e.course_id))
        .map(|e| e.credits())
        .sum()
}

/// `100 × completed / total`, or `0` when `total` is zero.
pub fn progress_percentage(completed_credits: u32, total_credits: u32) -> f64 {
    if total_credits == 0 {
        return 0.0;
    }
    f64::from(completed_credits) / f64::from(total_credits) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use acadledger_catalog::CurriculumEntry;
    use acadledger_core::ProgramId;
    use proptest::prelude::*;

    fn curriculum_with(courses: &[CourseId]) -> ProgramCurriculum {
        let mut curriculum = ProgramCurriculum::new(ProgramId::new());
        for (i, &course_id) in courses.iter().enumerate() {
            curriculum
                .add_entry(CurriculumEntry {
                    course_id,
                    semester: (i as u32) + 1,
                    required: true,
                    credits_contribution: 3,
                })
                .unwrap();
        }
        curriculum
    }

    #[test]
    fn sums_earned_credits_with_static_fallback() {
        let a = CourseId::new();
        let b = CourseId::new();
        let curriculum = curriculum_with(&[a, b]);

        let completed = [
            CompletedEnrollment {
                course_id: a,
                credits_earned: Some(4),
                course_credits: 3,
            },
            CompletedEnrollment {
                course_id: b,
                credits_earned: None,
                course_credits: 3,
            },
        ];

        assert_eq!(completed_credits(&completed, &curriculum), 7);
    }

    #[test]
    fn courses_outside_the_curriculum_are_ignored() {
        let in_program = CourseId::new();
        let elective_elsewhere = CourseId::new();
        let curriculum = curriculum_with(&[in_program]);

        let completed = [
            CompletedEnrollment {
                course_id: in_program,
                credits_earned: Some(3),
                course_credits: 3,
            },
            CompletedEnrollment {
                course_id: elective_elsewhere,
                credits_earned: Some(5),
                course_credits: 5,
            },
        ];

        assert_eq!(completed_credits(&completed, &curriculum), 3);
    }

    #[test]
    fn zero_total_credits_yields_zero_percent() {
        assert_eq!(progress_percentage(0, 0), 0.0);
        assert_eq!(progress_percentage(42, 0), 0.0);
    }

    #[test]
    fn percentage_spans_zero_to_full() {
        assert_eq!(progress_percentage(0, 120), 0.0);
        assert_eq!(progress_percentage(60, 120), 50.0);
        assert_eq!(progress_percentage(120, 120), 100.0);
    }

    #[test]
    fn report_bundles_the_figures() {
        let report = ProgressReport::new(30, 120);
        assert_eq!(report.completed_credits, 30);
        assert_eq!(report.percentage, 25.0);
    }

    proptest! {
        /// Property: percentage is non-negative, zero iff no completed
        /// credits or an empty target, and scales linearly.
        #[test]
        fn percentage_is_well_behaved(completed in 0u32..500, total in 0u32..500) {
            let pct = progress_percentage(completed, total);
            prop_assert!(pct >= 0.0);
            if total == 0 {
                prop_assert_eq!(pct, 0.0);
            } else {
                prop_assert!((pct - f64::from(completed) * 100.0 / f64::from(total)).abs() < 1e-9);
            }
        }
    }
}
