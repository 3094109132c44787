use faculty_appraisal::workflows::appraisal::{
    AcademicYear, Account, AccountDirectory, AppraisalRepository, CompletionReport, FacultyId,
    RepositoryError, Role, ScoreRecord, Submission, SubmissionRecord,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

type SubmissionSlot = (FacultyId, AcademicYear);

#[derive(Default, Clone)]
pub(crate) struct InMemoryAppraisalRepository {
    submissions: Arc<Mutex<HashMap<SubmissionSlot, SubmissionRecord>>>,
    scores: Arc<Mutex<Vec<ScoreRecord>>>,
}

impl AppraisalRepository for InMemoryAppraisalRepository {
    fn insert_submission(
        &self,
        record: SubmissionRecord,
    ) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.submissions.lock().expect("repository mutex poisoned");
        let slot = (record.faculty_id.clone(), record.academic_year);
        if guard.contains_key(&slot) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(slot, record.clone());
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
        let existing = guard.iter_mut().find(|existing| {
            existing.sheet.faculty_id() == record.sheet.faculty_id()
                && existing.sheet.academic_year() == record.sheet.academic_year()
                && existing.sheet.reviewer() == record.sheet.reviewer()
        });
        match existing {
            Some(slot) => Ok(Some(std::mem::replace(slot, record))),
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
pub(crate) struct InMemoryAccountDirectory {
    accounts: Arc<Mutex<HashMap<(Role, String), Account>>>,
}

impl AccountDirectory for InMemoryAccountDirectory {
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

pub(crate) fn parse_year(raw: &str) -> Result<AcademicYear, String> {
    raw.trim()
        .parse::<i32>()
        .map(AcademicYear)
        .map_err(|err| format!("failed to parse '{raw}' as a calendar year ({err})"))
}

/// Completion summary for a flat submission record, as stored by the backend.
#[derive(Debug, Serialize)]
pub(crate) struct RecordReport {
    pub(crate) faculty_id: FacultyId,
    pub(crate) year: AcademicYear,
    #[serde(flatten)]
    pub(crate) completion: CompletionReport,
}

/// Explicit identifiers win over the record's own `faculty_id` and `year`.
pub(crate) fn record_report(
    record: &Map<String, Value>,
    faculty_id: Option<FacultyId>,
    year: Option<AcademicYear>,
) -> RecordReport {
    let faculty_id = faculty_id
        .or_else(|| {
            record
                .get("faculty_id")
                .and_then(Value::as_str)
                .map(FacultyId::from)
        })
        .unwrap_or_else(|| FacultyId::from("unknown"));
    let year = year
        .or_else(|| record.get("year").and_then(record_year))
        .unwrap_or_else(AcademicYear::current);

    let submission = Submission::hydrate(faculty_id.clone(), year, record, true);
    RecordReport {
        faculty_id,
        year,
        completion: CompletionReport::build(&submission),
    }
}

fn record_year(value: &Value) -> Option<AcademicYear> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .and_then(|year| i32::try_from(year).ok())
            .map(AcademicYear),
        Value::String(text) => parse_year(text).ok(),
        _ => None,
    }
}
