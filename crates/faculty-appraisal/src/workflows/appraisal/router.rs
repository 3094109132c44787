use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;

use super::accounts::{AdminSignup, FacultySignup};
use super::catalog::{catalog_view, SectionCode};
use super::completion::{overall_completion, CompletionStat};
use super::domain::{AcademicYear, FacultyId, ReviewerId};
use super::repository::{AccountDirectory, AppraisalRepository};
use super::service::{AppraisalService, AppraisalServiceError};
use super::session::{route, Role, RoleClaim};

#[derive(Debug, Deserialize)]
pub struct FacultyLoginRequest {
    pub login_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub admin_id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub role: Role,
    pub id: String,
    pub redirect: &'static str,
}

impl LoginResponse {
    fn from_claim(claim: &RoleClaim, message: String) -> Self {
        Self {
            message,
            role: claim.role(),
            id: claim.id().to_string(),
            redirect: route(claim.role()).path(),
        }
    }
}

/// `{ faculty_id, year, ...fields }` as posted by the faculty dashboard.
#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    pub faculty_id: String,
    #[serde(default)]
    pub year: Option<AcademicYear>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub message: &'static str,
    pub faculty_id: FacultyId,
    pub year: AcademicYear,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub completion: CompletionStat,
}

/// `{ faculty_id, year, scored_by, ...scores }` as posted by the admin dashboard.
#[derive(Debug, Deserialize)]
pub struct ScoreSubmissionRequest {
    pub faculty_id: String,
    #[serde(default)]
    pub year: Option<AcademicYear>,
    #[serde(default)]
    pub scored_by: Option<String>,
    #[serde(flatten)]
    pub scores: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    #[serde(default)]
    pub year: Option<AcademicYear>,
}

impl YearQuery {
    fn resolve(&self) -> AcademicYear {
        self.year.unwrap_or_else(AcademicYear::current)
    }
}

/// Router builder exposing the faculty and admin endpoints.
pub fn appraisal_router<R, D>(service: Arc<AppraisalService<R, D>>) -> Router
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    Router::new()
        .route("/api/catalog", get(catalog_handler))
        .route("/api/faculty/signup", post(faculty_signup_handler::<R, D>))
        .route("/api/admin/signup", post(admin_signup_handler::<R, D>))
        .route("/api/faculty/login", post(faculty_login_handler::<R, D>))
        .route("/api/admin/login", post(admin_login_handler::<R, D>))
        .route(
            "/api/faculty/proof/:faculty_id",
            get(faculty_proof_handler::<R, D>),
        )
        .route("/api/faculty/submit", post(submit_handler::<R, D>))
        .route(
            "/api/admin/faculty-submissions",
            get(list_submissions_handler::<R, D>),
        )
        .route(
            "/api/admin/proofs/:faculty_id",
            get(admin_proofs_handler::<R, D>),
        )
        .route("/api/admin/submit-score", post(submit_score_handler::<R, D>))
        .route(
            "/api/admin/scores/:faculty_id",
            get(score_sheets_handler::<R, D>),
        )
        .route("/api/admin/scores.csv", get(score_export_handler::<R, D>))
        .with_state(service)
}

fn error_response(err: AppraisalServiceError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "appraisal request failed");
    }
    let payload = json!({ "message": err.to_string() });
    (status, Json(payload)).into_response()
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

pub(crate) async fn catalog_handler() -> Response {
    (StatusCode::OK, Json(catalog_view())).into_response()
}

pub(crate) async fn faculty_signup_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Json(signup): Json<FacultySignup>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    match service.register_faculty(signup) {
        Ok(_) => message(StatusCode::CREATED, "Faculty account created successfully!"),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn admin_signup_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Json(signup): Json<AdminSignup>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    match service.register_admin(signup) {
        Ok(_) => message(StatusCode::CREATED, "Admin account created successfully!"),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn faculty_login_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Json(request): Json<FacultyLoginRequest>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    match service.login(Role::Faculty, &request.login_id, &request.password) {
        Ok(claim) => {
            let body = LoginResponse::from_claim(&claim, "Faculty login successful".to_string());
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn admin_login_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Json(request): Json<AdminLoginRequest>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    match service.login(Role::Admin, &request.admin_id, &request.password) {
        Ok(claim) => {
            let body = LoginResponse::from_claim(&claim, "Admin login successful".to_string());
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn faculty_proof_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Path(faculty_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    match service.proofs(&FacultyId(faculty_id), query.resolve()) {
        Ok(fields) => (StatusCode::OK, Json(fields)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Json(request): Json<SubmissionRequest>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    let SubmissionRequest {
        faculty_id,
        year,
        fields,
    } = request;

    if faculty_id.trim().is_empty() {
        return message(StatusCode::UNPROCESSABLE_ENTITY, "faculty_id is required");
    }

    let year = year.unwrap_or_else(AcademicYear::current);
    match service.submit(FacultyId(faculty_id), year, &fields) {
        Ok(record) => {
            let completion =
                overall_completion(&SectionCode::ordered(), &record.to_submission());
            let body = SubmissionResponse {
                message: "Submission successful!",
                faculty_id: record.faculty_id,
                year: record.academic_year,
                submitted_at: record.submitted_at,
                completion,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_submissions_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Query(query): Query<YearQuery>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    match service.list_submissions(query.year) {
        Ok(overviews) => (StatusCode::OK, Json(overviews)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn admin_proofs_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Path(faculty_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    match service.proofs(&FacultyId(faculty_id), query.resolve()) {
        Ok(fields) => (StatusCode::OK, Json(fields)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_score_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Json(request): Json<ScoreSubmissionRequest>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    let ScoreSubmissionRequest {
        faculty_id,
        year,
        scored_by,
        scores,
    } = request;

    let year = year.unwrap_or_else(AcademicYear::current);
    let reviewer = ReviewerId(scored_by.unwrap_or_default());
    match service.submit_scores(FacultyId(faculty_id), year, reviewer, &scores) {
        Ok(record) => {
            let view = record.view();
            let body = json!({
                "message": "Scores submitted successfully",
                "total_score": view.total_score,
                "max_possible": view.max_possible,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn score_sheets_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Path(faculty_id): Path<String>,
    Query(query): Query<YearQuery>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    match service.score_sheets(&FacultyId(faculty_id), query.resolve()) {
        Ok(sheets) => (StatusCode::OK, Json(sheets)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn score_export_handler<R, D>(
    State(service): State<Arc<AppraisalService<R, D>>>,
    Query(query): Query<YearQuery>,
) -> Response
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    let mut buffer = Vec::new();
    match service.export_scores_csv(query.resolve(), &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}
