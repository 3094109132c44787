use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use serde_json::{json, Map, Value};

use crate::workflows::appraisal::accounts::{Account, AdminSignup, FacultySignup};
use crate::workflows::appraisal::domain::{AcademicYear, FacultyId, ReviewerId};
use crate::workflows::appraisal::repository::{
    AccountDirectory, AppraisalRepository, RepositoryError, ScoreRecord, SubmissionRecord,
};
use crate::workflows::appraisal::service::{AppraisalPolicy, AppraisalService};
use crate::workflows::appraisal::session::Role;

pub(super) const YEAR: AcademicYear = AcademicYear(2025);

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) submissions: Arc<Mutex<HashMap<(FacultyId, AcademicYear), SubmissionRecord>>>,
    pub(super) scores: Arc<Mutex<Vec<ScoreRecord>>>,
}

impl AppraisalRepository for MemoryRepository {
    fn insert_submission(
        &self,
        record: SubmissionRecord,
    ) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.submissions.lock().expect("repository mutex poisoned");
        let key = (record.faculty_id.clone(), record.academic_year);
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, record.clone());
        Ok(record)
    }

    fn fetch_submission(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.submissions.lock().expect("repository mutex poisoned");
        Ok(guard.get(&(faculty_id.clone(), year)).cloned())
    }

    fn list_submissions(
        &self,
        year: Option<AcademicYear>,
    ) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let guard = self.submissions.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| year.map_or(true, |year| record.academic_year == year))
            .cloned()
            .collect())
    }

    fn upsert_score(&self, record: ScoreRecord) -> Result<Option<ScoreRecord>, RepositoryError> {
        let mut guard = self.scores.lock().expect("scores mutex poisoned");
        let position = guard.iter().position(|existing| {
            existing.sheet.faculty_id() == record.sheet.faculty_id()
                && existing.sheet.academic_year() == record.sheet.academic_year()
                && existing.sheet.reviewer() == record.sheet.reviewer()
        });
        match position {
            Some(index) => Ok(Some(std::mem::replace(&mut guard[index], record))),
            None => {
                guard.push(record);
                Ok(None)
            }
        }
    }

    fn score_sheets(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<Vec<ScoreRecord>, RepositoryError> {
        let guard = self.scores.lock().expect("scores mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| {
                record.sheet.faculty_id() == faculty_id && record.sheet.academic_year() == year
            })
            .cloned()
            .collect())
    }

    fn score_sheets_for_year(
        &self,
        year: AcademicYear,
    ) -> Result<Vec<ScoreRecord>, RepositoryError> {
        let guard = self.scores.lock().expect("scores mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| record.sheet.academic_year() == year)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    accounts: Arc<Mutex<HashMap<(Role, String), Account>>>,
}

impl AccountDirectory for MemoryDirectory {
    fn register(&self, account: Account) -> Result<(), RepositoryError> {
        let mut guard = self.accounts.lock().expect("directory mutex poisoned");
        let key = (account.role, account.id.clone());
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, account);
        Ok(())
    }

    fn find(&self, role: Role, id: &str) -> Result<Option<Account>, RepositoryError> {
        let guard = self.accounts.lock().expect("directory mutex poisoned");
        Ok(guard.get(&(role, id.to_string())).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl AppraisalRepository for UnavailableRepository {
    fn insert_submission(
        &self,
        _record: SubmissionRecord,
    ) -> Result<SubmissionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_submission(
        &self,
        _faculty_id: &FacultyId,
        _year: AcademicYear,
    ) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Ok(None)
    }

    fn list_submissions(
        &self,
        _year: Option<AcademicYear>,
    ) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn upsert_score(&self, _record: ScoreRecord) -> Result<Option<ScoreRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn score_sheets(
        &self,
        _faculty_id: &FacultyId,
        _year: AcademicYear,
    ) -> Result<Vec<ScoreRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn score_sheets_for_year(
        &self,
        _year: AcademicYear,
    ) -> Result<Vec<ScoreRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Holds the first armed writer inside the repository until the test releases it.
pub(super) struct Gate {
    armed: AtomicBool,
    entered: Barrier,
    released: Barrier,
}

impl Gate {
    fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            entered: Barrier::new(2),
            released: Barrier::new(2),
        }
    }

    pub(super) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Blocks until the armed writer is parked inside the repository.
    pub(super) fn wait_for_writer(&self) {
        self.entered.wait();
    }

    pub(super) fn release(&self) {
        self.released.wait();
    }

    fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.released.wait();
        }
    }
}

/// [`MemoryRepository`] whose writes stop at a [`Gate`] once it is armed.
#[derive(Clone)]
pub(super) struct GatedRepository {
    inner: MemoryRepository,
    gate: Arc<Gate>,
}

impl AppraisalRepository for GatedRepository {
    fn insert_submission(
        &self,
        record: SubmissionRecord,
    ) -> Result<SubmissionRecord, RepositoryError> {
        self.gate.pass();
        self.inner.insert_submission(record)
    }

    fn fetch_submission(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<Option<SubmissionRecord>, RepositoryError> {
        self.inner.fetch_submission(faculty_id, year)
    }

    fn list_submissions(
        &self,
        year: Option<AcademicYear>,
    ) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        self.inner.list_submissions(year)
    }

    fn upsert_score(&self, record: ScoreRecord) -> Result<Option<ScoreRecord>, RepositoryError> {
        self.gate.pass();
        self.inner.upsert_score(record)
    }

    fn score_sheets(
        &self,
        faculty_id: &FacultyId,
        year: AcademicYear,
    ) -> Result<Vec<ScoreRecord>, RepositoryError> {
        self.inner.score_sheets(faculty_id, year)
    }

    fn score_sheets_for_year(
        &self,
        year: AcademicYear,
    ) -> Result<Vec<ScoreRecord>, RepositoryError> {
        self.inner.score_sheets_for_year(year)
    }
}

pub(super) type MemoryService = AppraisalService<MemoryRepository, MemoryDirectory>;
pub(super) type GatedService = AppraisalService<GatedRepository, MemoryDirectory>;

pub(super) fn build_gated_service() -> (Arc<GatedService>, MemoryRepository, Arc<Gate>) {
    let repository = MemoryRepository::default();
    let gate = Arc::new(Gate::new());
    let service = AppraisalService::new(
        Arc::new(GatedRepository {
            inner: repository.clone(),
            gate: Arc::clone(&gate),
        }),
        Arc::new(MemoryDirectory::default()),
        AppraisalPolicy::default(),
    );
    (Arc::new(service), repository, gate)
}

pub(super) fn build_service_with(
    policy: AppraisalPolicy,
) -> (Arc<MemoryService>, MemoryRepository) {
    let repository = MemoryRepository::default();
    let service = AppraisalService::new(
        Arc::new(repository.clone()),
        Arc::new(MemoryDirectory::default()),
        policy,
    );
    (Arc::new(service), repository)
}

pub(super) fn build_service() -> (Arc<MemoryService>, MemoryRepository) {
    build_service_with(AppraisalPolicy::default())
}

pub(super) fn faculty() -> FacultyId {
    FacultyId::from("FAC-101")
}

pub(super) fn reviewer() -> ReviewerId {
    ReviewerId::from("ADM-7")
}

pub(super) fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("fixture is a JSON object")
}

pub(super) fn partial_fields() -> Map<String, Value> {
    object(json!({
        "l1_1": "https://drive.example/teaching/methods.pdf",
        "l1_2": "https://drive.example/teaching/syllabus.pdf",
        "l1_3": "   ",
        "l2_1": "https://scholar.example/pubs",
        "l5_2": "career-guidance-log.xlsx",
    }))
}

pub(super) fn faculty_signup() -> FacultySignup {
    FacultySignup {
        faculty_id: "FAC-101".to_string(),
        email: "m.rao@college.edu".to_string(),
        password: "portfolio1".to_string(),
        confirm_password: "portfolio1".to_string(),
        security_code: "4321".to_string(),
        department: "Information Technology".to_string(),
        designation: "Assistant Professor".to_string(),
        joining_date: "2021-06-01".to_string(),
    }
}

pub(super) fn admin_signup() -> AdminSignup {
    AdminSignup {
        admin_id: "ADM-7".to_string(),
        email: "hod.it@college.edu".to_string(),
        password: "reviewer7".to_string(),
        confirm_password: "reviewer7".to_string(),
        security_code: "7777".to_string(),
        role: "Department Head".to_string(),
        department: "Information Technology".to_string(),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
