use super::catalog::SectionCode;
use super::completion::overall_completion;
use super::submission::{Submission, SubmissionError};

/// A field counts as filled when its trimmed value is non-empty.
pub fn is_field_filled(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Advisory only: decides whether a "view" affordance is offered for a value.
/// Never used to gate completion or submission.
pub fn is_well_formed_link(value: &str) -> bool {
    value.starts_with("http")
}

/// Eligibility rule applied before a submission may be locked.
///
/// The default accepts any completion level, matching the dashboard's
/// behavior of allowing partial submissions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubmissionPolicy {
    pub minimum_completion: f64,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            minimum_completion: 0.0,
        }
    }
}

impl SubmissionPolicy {
    pub fn with_minimum_completion(minimum_completion: f64) -> Self {
        Self { minimum_completion }
    }

    pub fn check(&self, submission: &Submission) -> Result<(), SubmissionError> {
        if submission.is_locked() {
            return Err(SubmissionError::AlreadySubmitted {
                faculty_id: submission.faculty_id().clone(),
                year: submission.academic_year(),
            });
        }

        let overall = overall_completion(&SectionCode::ordered(), submission);
        if overall.percentage < self.minimum_completion {
            return Err(SubmissionError::InvalidState(format!(
                "overall completion {:.1}% is below the required {:.1}%",
                overall.percentage, self.minimum_completion
            )));
        }

        Ok(())
    }

    pub fn can_submit(&self, submission: &Submission) -> bool {
        self.check(submission).is_ok()
    }
}
