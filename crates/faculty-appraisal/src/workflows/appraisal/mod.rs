//! Faculty performance appraisal: documentation-link submissions, completion
//! tracking, reviewer scoring, and role-based dashboard gating.
//!
//! Field names are typed ([`FieldKey`], [`ScoreKey`]) and generated from the
//! fixed section catalog, so only criteria that exist can be stored or scored.

pub mod accounts;
pub mod catalog;
pub mod completion;
pub mod domain;
pub(crate) mod export;
pub(crate) mod inflight;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod submission;
pub mod validation;

#[cfg(test)]
mod tests;

pub use accounts::{Account, AccountProfile, AdminSignup, FacultySignup, SignupError};
pub use catalog::{
    catalog_view, describe_field, total_field_count, CatalogError, FieldKey, ScoreKey,
    SectionCode, SectionView,
};
pub use completion::{
    overall_completion, section_completion, CompletionReport, CompletionStat,
    SectionProgressEntry,
};
pub use domain::{AcademicYear, FacultyId, ReviewerId};
pub use export::ExportError;
pub use repository::{
    AccountDirectory, AppraisalRepository, RepositoryError, ScoreRecord, ScoreSheetView,
    SubmissionOverview, SubmissionRecord,
};
pub use router::appraisal_router;
pub use scoring::{
    max_possible, total_score, ScoreError, ScoreParsing, ScoreSheet, ScoringPolicy,
    MAX_CRITERION_SCORE,
};
pub use service::{AppraisalPolicy, AppraisalService, AppraisalServiceError};
pub use session::{
    guard, route, ClaimStore, DashboardTarget, MemoryClaimStore, Role, RoleClaim,
    SessionContext, Surface,
};
pub use submission::{Submission, SubmissionError};
pub use validation::{is_field_filled, is_well_formed_link, SubmissionPolicy};
