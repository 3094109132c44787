use std::io::Write;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::accounts::{Account, AdminSignup, FacultySignup, SignupError};
use super::catalog::SectionCode;
use super::completion::overall_completion;
use super::domain::{AcademicYear, FacultyId, ReviewerId};
use super::export::{write_score_csv, ExportError};
use super::inflight::InFlightRegistry;
use super::repository::{
    AccountDirectory, AppraisalRepository, RepositoryError, ScoreRecord, ScoreSheetView,
    SubmissionOverview, SubmissionRecord,
};
use super::scoring::{ScoreError, ScoreSheet, ScoringPolicy};
use super::session::{Role, RoleClaim};
use super::submission::{Submission, SubmissionError};
use super::validation::SubmissionPolicy;

/// Rules the service enforces on faculty submissions and reviewer scores.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AppraisalPolicy {
    pub submission: SubmissionPolicy,
    pub scoring: ScoringPolicy,
}

type SubmissionSlot = (FacultyId, AcademicYear);
type ScoreSlot = (FacultyId, AcademicYear, ReviewerId);

/// Service composing the repositories with submission locking and scoring rules.
pub struct AppraisalService<R, D> {
    repository: Arc<R>,
    accounts: Arc<D>,
    policy: AppraisalPolicy,
    submissions_in_flight: InFlightRegistry<SubmissionSlot>,
    scores_in_flight: InFlightRegistry<ScoreSlot>,
}

impl<R, D> AppraisalService<R, D>
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    pub fn new(repository: Arc<R>, accounts: Arc<D>, policy: AppraisalPolicy) -> Self {
        Self {
            repository,
            accounts,
            policy,
            submissions_in_flight: InFlightRegistry::default(),
            scores_in_flight: InFlightRegistry::default(),
        }
    }

    pub fn policy(&self) -> &AppraisalPolicy {
        &self.policy
    }

    pub fn register_faculty(
        &self,
        signup: FacultySignup,
    ) -> Result<RoleClaim, AppraisalServiceError> {
        self.register(signup.into_account()?)
    }

    pub fn register_admin(&self, signup: AdminSignup) -> Result<RoleClaim, AppraisalServiceError> {
        self.register(signup.into_account()?)
    }

    fn register(&self, account: Account) -> Result<RoleClaim, AppraisalServiceError> {
        let claim = RoleClaim::new(account.role, account.id.clone())
            .ok_or(SignupError::MissingField("id"))?;
        self.accounts.register(account)?;
        info!(role = claim.role().label(), id = claim.id(), "account registered");
        Ok(claim)
    }

    /// Check credentials and issue the role claim the client stores.
    pub fn login(
        &self,
        role: Role,
        id: &str,
        password: &str,
    ) -> Result<RoleClaim, AppraisalServiceError> {
        let id = id.trim();
        match self.accounts.find(role, id)? {
            Some(account) if account.verify_password(password) => {
                info!(role = role.label(), id, "login succeeded");
                RoleClaim::new(role, id).ok_or(AppraisalServiceError::InvalidCredentials)
            }
            _ => {
                warn!(role = role.label(), id, "login rejected");
                Err(AppraisalServiceError::InvalidCredentials)
            }
        }
    }

    pub fn fetch_submission(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<SubmissionRecord, AppraisalServiceError> {
        self.repository
            .fetch_submission(faculty_id, year)?
            .ok_or_else(|| AppraisalServiceError::SubmissionNotFound {
                faculty_id: faculty_id.clone(),
                year,
            })
    }

    /// Lock and store a faculty member's submission for `year`.
    ///
    /// An existing record is never overwritten, and a second submit for the same
    /// faculty member and year is refused while the first is still running.
    pub fn submit(
        &self,
        faculty_id: FacultyId,
        year: AcademicYear,
        fields: &Map<String, Value>,
    ) -> Result<SubmissionRecord, AppraisalServiceError> {
        let slot = (faculty_id.clone(), year);
        let _guard = self.submissions_in_flight.try_acquire(slot).ok_or_else(|| {
            warn!(%faculty_id, %year, "submission already in flight");
            AppraisalServiceError::InFlight(format!("submission {faculty_id}/{year}"))
        })?;

        if self.repository.fetch_submission(&faculty_id, year)?.is_some() {
            warn!(%faculty_id, %year, "resubmission rejected");
            return Err(already_submitted(faculty_id, year));
        }

        let mut submission = match Submission::from_request(faculty_id.clone(), year, fields) {
            Ok(submission) => submission,
            Err(err) => {
                warn!(%faculty_id, %year, error = %err, "submission body rejected");
                return Err(err.into());
            }
        };
        if let Err(err) = submission.lock(&self.policy.submission) {
            warn!(%faculty_id, %year, error = %err, "submission not eligible");
            return Err(err.into());
        }

        let record = SubmissionRecord::from_submission(&submission, Utc::now());
        let stored = match self.repository.insert_submission(record) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(already_submitted(faculty_id, year)),
            Err(other) => return Err(other.into()),
        };

        let completion = overall_completion(&SectionCode::ordered(), &submission);
        info!(
            %faculty_id,
            %year,
            completed = completion.completed,
            total = completion.total,
            "performance submission locked"
        );
        Ok(stored)
    }

    pub fn list_submissions(
        &self,
        year: Option<AcademicYear>,
    ) -> Result<Vec<SubmissionOverview>, AppraisalServiceError> {
        let mut records = self.repository.list_submissions(year)?;
        records.sort_by(|a, b| {
            (&a.faculty_id, a.academic_year).cmp(&(&b.faculty_id, b.academic_year))
        });

        records
            .iter()
            .map(|record| -> Result<SubmissionOverview, AppraisalServiceError> {
                let sheets = self
                    .repository
                    .score_sheets(&record.faculty_id, record.academic_year)?;
                Ok(record.overview(sheets.len()))
            })
            .collect()
    }

    /// Submitted fields in the flat shape reviewers render.
    pub fn proofs(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<Map<String, Value>, AppraisalServiceError> {
        let record = self.fetch_submission(faculty_id, year)?;
        Ok(record.to_submission().to_record())
    }

    /// Record one reviewer's scores. A later sheet from the same reviewer
    /// replaces the earlier one.
    pub fn submit_scores(
        &self,
        faculty_id: FacultyId,
        year: AcademicYear,
        reviewer: ReviewerId,
        scores: &Map<String, Value>,
    ) -> Result<ScoreRecord, AppraisalServiceError> {
        if reviewer.0.trim().is_empty() {
            return Err(AppraisalServiceError::MissingReviewer);
        }
        self.fetch_submission(&faculty_id, year)?;

        let slot = (faculty_id.clone(), year, reviewer.clone());
        let _guard = self.scores_in_flight.try_acquire(slot).ok_or_else(|| {
            AppraisalServiceError::InFlight(format!("scores {faculty_id}/{year} by {reviewer}"))
        })?;

        let mut sheet = ScoreSheet::new(faculty_id.clone(), year, reviewer.clone());
        for (name, raw) in scores {
            sheet.apply_json(name, raw, &self.policy.scoring)?;
        }

        let record = ScoreRecord {
            sheet,
            recorded_at: Utc::now(),
        };
        let replaced = self.repository.upsert_score(record.clone())?;

        info!(
            %faculty_id,
            %year,
            %reviewer,
            total = record.sheet.total_score(),
            replaced = replaced.is_some(),
            "score sheet recorded"
        );
        Ok(record)
    }

    pub fn score_sheets(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<Vec<ScoreSheetView>, AppraisalServiceError> {
        let records = self.repository.score_sheets(faculty_id, year)?;
        Ok(records.iter().map(ScoreRecord::view).collect())
    }

    pub fn export_scores_csv<W: Write>(
        &self,
        year: AcademicYear,
        writer: W,
    ) -> Result<usize, AppraisalServiceError> {
        let mut records = self.repository.score_sheets_for_year(year)?;
        records.sort_by(|a, b| {
            (a.sheet.faculty_id(), a.sheet.reviewer())
                .cmp(&(b.sheet.faculty_id(), b.sheet.reviewer()))
        });
        Ok(write_score_csv(&records, writer)?)
    }
}

fn already_submitted(faculty_id: FacultyId, year: AcademicYear) -> AppraisalServiceError {
    SubmissionError::AlreadySubmitted { faculty_id, year }.into()
}

/// Error raised by the appraisal service.
#[derive(Debug, thiserror::Error)]
pub enum AppraisalServiceError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Signup(#[from] SignupError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("{0} is already being processed")]
    InFlight(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("no submission found for {faculty_id} in {year}")]
    SubmissionNotFound {
        faculty_id: FacultyId,
        year: AcademicYear,
    },
    #[error("scored_by must identify the reviewing administrator")]
    MissingReviewer,
}

impl AppraisalServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Submission(
                SubmissionError::InvalidState(_)
                | SubmissionError::UnknownField(_)
                | SubmissionError::InvalidFieldValue(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Submission(_) | Self::InFlight(_) => StatusCode::CONFLICT,
            Self::Score(_) | Self::Signup(_) | Self::MissingReviewer => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            Self::Repository(RepositoryError::NotFound) | Self::SubmissionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Repository(RepositoryError::Unavailable(_)) | Self::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
