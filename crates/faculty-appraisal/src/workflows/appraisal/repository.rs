use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::accounts::Account;
use super::catalog::{FieldKey, ScoreKey, SectionCode};
use super::completion::{overall_completion, CompletionStat};
use super::domain::{AcademicYear, FacultyId, ReviewerId};
use super::scoring::{max_possible, ScoreSheet};
use super::session::Role;
use super::submission::Submission;

/// Stored, locked submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub faculty_id: FacultyId,
    pub academic_year: AcademicYear,
    pub fields: BTreeMap<FieldKey, String>,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn from_submission(submission: &Submission, submitted_at: DateTime<Utc>) -> Self {
        Self {
            faculty_id: submission.faculty_id().clone(),
            academic_year: submission.academic_year(),
            fields: submission.values().clone(),
            submitted_at,
        }
    }

    pub fn to_submission(&self) -> Submission {
        Submission::from_parts(
            self.faculty_id.clone(),
            self.academic_year,
            self.fields.clone(),
            true,
        )
    }

    pub fn overview(&self, score_sheets: usize) -> SubmissionOverview {
        SubmissionOverview {
            faculty_id: self.faculty_id.clone(),
            year: self.academic_year,
            submitted_at: self.submitted_at,
            completion: overall_completion(&SectionCode::ordered(), &self.to_submission()),
            score_sheets,
        }
    }
}

/// Row in the reviewer's faculty list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOverview {
    pub faculty_id: FacultyId,
    pub year: AcademicYear,
    pub submitted_at: DateTime<Utc>,
    pub completion: CompletionStat,
    pub score_sheets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub sheet: ScoreSheet,
    pub recorded_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn view(&self) -> ScoreSheetView {
        ScoreSheetView {
            faculty_id: self.sheet.faculty_id().clone(),
            year: self.sheet.academic_year(),
            scored_by: self.sheet.reviewer().clone(),
            scores: self.sheet.scores().clone(),
            total_score: self.sheet.total_score(),
            max_possible: max_possible(&SectionCode::ordered()),
            recorded_at: self.recorded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSheetView {
    pub faculty_id: FacultyId,
    pub year: AcademicYear,
    pub scored_by: ReviewerId,
    pub scores: BTreeMap<ScoreKey, i64>,
    pub total_score: i64,
    pub max_possible: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait AppraisalRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the (faculty, year) pair exists.
    fn insert_submission(&self, record: SubmissionRecord)
        -> Result<SubmissionRecord, RepositoryError>;
    fn fetch_submission(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<Option<SubmissionRecord>, RepositoryError>;
    fn list_submissions(
        &self,
        year: Option<AcademicYear>,
    ) -> Result<Vec<SubmissionRecord>, RepositoryError>;
    /// Stores the sheet, returning the one it replaced for the same reviewer.
    fn upsert_score(&self, record: ScoreRecord) -> Result<Option<ScoreRecord>, RepositoryError>;
    fn score_sheets(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<Vec<ScoreRecord>, RepositoryError>;
    fn score_sheets_for_year(
        &self,
        year: AcademicYear,
    ) -> Result<Vec<ScoreRecord>, RepositoryError>;
}

/// Registered users, looked up by dashboard role and identifier.
pub trait AccountDirectory: Send + Sync {
    fn register(&self, account: Account) -> Result<(), RepositoryError>;
    fn find(&self, role: Role, id: &str) -> Result<Option<Account>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
