use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::catalog::FieldKey;
use super::domain::{AcademicYear, FacultyId};
use super::validation::SubmissionPolicy;

/// One faculty member's documentation links for one academic year.
///
/// Editable field by field until [`Submission::lock`] succeeds; after that every
/// mutation is rejected without touching the stored values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    faculty_id: FacultyId,
    academic_year: AcademicYear,
    values: BTreeMap<FieldKey, String>,
    locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("performance data for {faculty_id} ({year}) has already been submitted")]
    AlreadySubmitted {
        faculty_id: FacultyId,
        year: AcademicYear,
    },
    #[error("submission is locked and cannot be modified")]
    Locked,
    #[error("submission is not eligible: {0}")]
    InvalidState(String),
    #[error("'{0}' is not a field of the appraisal catalog")]
    UnknownField(String),
    #[error("value for {0} must be a string")]
    InvalidFieldValue(FieldKey),
}

impl Submission {
    pub fn new(faculty_id: FacultyId, academic_year: AcademicYear) -> Self {
        Self {
            faculty_id,
            academic_year,
            values: BTreeMap::new(),
            locked: false,
        }
    }

    /// Rebuild a submission from a flat backend record.
    ///
    /// Only recognised proof keys holding string values are kept; metadata such as
    /// `faculty_id`, `year` or `submitted_at` is ignored.
    pub fn hydrate(
        faculty_id: FacultyId,
        academic_year: AcademicYear,
        record: &Map<String, Value>,
        locked: bool,
    ) -> Self {
        let values = record
            .iter()
            .filter_map(|(name, value)| {
                let key = name.parse::<FieldKey>().ok()?;
                value.as_str().map(|text| (key, text.to_string()))
            })
            .collect();

        Self {
            faculty_id,
            academic_year,
            values,
            locked,
        }
    }

    /// Build a draft from a client request body, rejecting what `hydrate` skips.
    ///
    /// Any `l<digit>...` name must be a catalog field and must hold a string.
    /// Other names are client metadata and are ignored.
    pub fn from_request(
        faculty_id: FacultyId,
        academic_year: AcademicYear,
        body: &Map<String, Value>,
    ) -> Result<Self, SubmissionError> {
        let mut values = BTreeMap::new();
        for (name, value) in body {
            if !is_field_shaped(name) {
                continue;
            }
            let key = name
                .parse::<FieldKey>()
                .map_err(|_| SubmissionError::UnknownField(name.clone()))?;
            let text = value
                .as_str()
                .ok_or(SubmissionError::InvalidFieldValue(key))?;
            values.insert(key, text.to_string());
        }

        Ok(Self::from_parts(faculty_id, academic_year, values, false))
    }

    pub(crate) fn from_parts(
        faculty_id: FacultyId,
        academic_year: AcademicYear,
        values: BTreeMap<FieldKey, String>,
        locked: bool,
    ) -> Self {
        Self {
            faculty_id,
            academic_year,
            values,
            locked,
        }
    }

    pub fn faculty_id(&self) -> &FacultyId {
        &self.faculty_id
    }

    pub fn academic_year(&self) -> AcademicYear {
        self.academic_year
    }

    /// Current value for a field, empty when it was never set.
    pub fn get(&self, key: FieldKey) -> &str {
        self.values.get(&key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) -> Result<(), SubmissionError> {
        if self.locked {
            return Err(SubmissionError::Locked);
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Irreversibly mark the submission as submitted once the policy approves it.
    pub fn lock(&mut self, policy: &SubmissionPolicy) -> Result<(), SubmissionError> {
        policy.check(self)?;
        self.locked = true;
        Ok(())
    }

    pub fn values(&self) -> &BTreeMap<FieldKey, String> {
        &self.values
    }

    /// Flat `field -> link` object in the shape the browser client exchanges.
    pub fn to_record(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
            .collect()
    }
}

fn is_field_shaped(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('l') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::appraisal::catalog::SectionCode;
    use serde_json::json;

    fn key(raw: &str) -> FieldKey {
        raw.parse().expect("valid field key")
    }

    fn draft() -> Submission {
        Submission::new(FacultyId::from("FAC-101"), AcademicYear(2025))
    }

    #[test]
    fn get_defaults_to_empty_string() {
        let submission = draft();
        assert_eq!(submission.get(key("l1_1")), "");
        assert!(!submission.is_locked());
    }

    #[test]
    fn set_is_rejected_after_lock_and_leaves_value_untouched() {
        let mut submission = draft();
        submission
            .set(key("l2_3"), "https://drive.example/grant.pdf")
            .expect("draft accepts edits");
        submission
            .lock(&SubmissionPolicy::default())
            .expect("permissive policy locks");

        let before = submission.get(key("l2_3")).to_string();
        assert_eq!(
            submission.set(key("l2_3"), "https://drive.example/other.pdf"),
            Err(SubmissionError::Locked)
        );
        assert_eq!(submission.get(key("l2_3")), before);
        assert_eq!(submission.set(key("l5_1"), "new"), Err(SubmissionError::Locked));
        assert_eq!(submission.get(key("l5_1")), "");
    }

    #[test]
    fn second_lock_reports_already_submitted() {
        let mut submission = draft();
        submission
            .lock(&SubmissionPolicy::default())
            .expect("first lock succeeds");
        let snapshot = submission.clone();

        match submission.lock(&SubmissionPolicy::default()) {
            Err(SubmissionError::AlreadySubmitted { faculty_id, year }) => {
                assert_eq!(faculty_id.0, "FAC-101");
                assert_eq!(year, AcademicYear(2025));
            }
            other => panic!("expected already submitted, got {other:?}"),
        }
        assert_eq!(submission, snapshot);
    }

    #[test]
    fn lock_fails_with_invalid_state_below_required_completion() {
        let mut submission = draft();
        submission.set(key("l1_1"), "https://a").expect("editable");
        let strict = SubmissionPolicy::with_minimum_completion(100.0);

        assert!(matches!(
            submission.lock(&strict),
            Err(SubmissionError::InvalidState(_))
        ));
        assert!(!submission.is_locked());
    }

    #[test]
    fn hydrate_keeps_only_catalog_fields() {
        let record = json!({
            "faculty_id": "FAC-101",
            "year": 2025,
            "l1_1": "https://a",
            "l4_6": "https://b",
            "l1_9": "https://out-of-range",
            "a1_1": "90",
            "l2_2": 17,
        });
        let record = record.as_object().expect("object").clone();

        let submission =
            Submission::hydrate(FacultyId::from("FAC-101"), AcademicYear(2025), &record, true);

        assert_eq!(submission.values().len(), 2);
        assert_eq!(submission.get(key("l4_6")), "https://b");
        assert!(submission.is_locked());

        let round_trip = submission.to_record();
        assert_eq!(round_trip.len(), 2);
        assert_eq!(round_trip["l1_1"], json!("https://a"));
        assert!(FieldKey::new(SectionCode::L1, 9).is_err());
    }

    #[test]
    fn request_body_rejects_unknown_or_non_string_fields() {
        let faculty = FacultyId::from("FAC-101");
        let body = |value: serde_json::Value| value.as_object().expect("object").clone();

        let accepted = Submission::from_request(
            faculty.clone(),
            AcademicYear(2025),
            &body(json!({ "l1_1": "https://a", "notes": 5, "year": 2025 })),
        )
        .expect("metadata is ignored");
        assert_eq!(accepted.values().len(), 1);
        assert!(!accepted.is_locked());

        for name in ["l1_9", "l6_1", "l1_03", "l1_x"] {
            let err = Submission::from_request(
                faculty.clone(),
                AcademicYear(2025),
                &body(json!({ name: "https://nowhere" })),
            )
            .expect_err("field-shaped name outside the catalog");
            assert_eq!(err, SubmissionError::UnknownField(name.to_string()));
        }

        assert_eq!(
            Submission::from_request(faculty, AcademicYear(2025), &body(json!({ "l2_2": 17 }))),
            Err(SubmissionError::InvalidFieldValue(key("l2_2")))
        );
    }
}
