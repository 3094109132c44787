use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::{total_field_count, ScoreKey, SectionCode};
use super::domain::{AcademicYear, FacultyId, ReviewerId};

/// Upper bound presented to reviewers for each criterion.
pub const MAX_CRITERION_SCORE: i64 = 100;

/// How raw reviewer input is turned into an integer score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreParsing {
    /// Malformed input is rejected with [`ScoreError::InvalidScore`].
    Strict,
    /// Legacy dashboard behavior: leading integer or zero.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    pub parsing: ScoreParsing,
    pub enforce_bounds: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            parsing: ScoreParsing::Strict,
            enforce_bounds: true,
        }
    }
}

impl ScoringPolicy {
    /// Coerce-to-zero parsing with no range check.
    pub const fn legacy() -> Self {
        Self {
            parsing: ScoreParsing::Lenient,
            enforce_bounds: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("score for {key} must be a whole number, got '{raw}'")]
    InvalidScore { key: ScoreKey, raw: String },
    #[error("score for {key} must be between 0 and 100, got {value}")]
    OutOfRange { key: ScoreKey, value: i64 },
    #[error("unknown scoring criterion '{0}'")]
    UnknownCriterion(String),
    #[error("score {value} for {key} would overflow the sheet total")]
    TotalOverflow { key: ScoreKey, value: i64 },
}

/// One reviewer's scores for one faculty member's submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    faculty_id: FacultyId,
    academic_year: AcademicYear,
    reviewer: ReviewerId,
    scores: BTreeMap<ScoreKey, i64>,
}

impl ScoreSheet {
    pub fn new(faculty_id: FacultyId, academic_year: AcademicYear, reviewer: ReviewerId) -> Self {
        Self {
            faculty_id,
            academic_year,
            reviewer,
            scores: BTreeMap::new(),
        }
    }

    pub fn faculty_id(&self) -> &FacultyId {
        &self.faculty_id
    }

    pub fn academic_year(&self) -> AcademicYear {
        self.academic_year
    }

    pub fn reviewer(&self) -> &ReviewerId {
        &self.reviewer
    }

    /// Store a score using the dashboard's coerce-to-zero rule.
    ///
    /// Unparseable input, and input that would overflow the sheet total, is
    /// stored as `0`, which hides the reviewer's mistake; prefer
    /// [`ScoreSheet::apply`] with a strict policy for new callers.
    pub fn set_score(&mut self, key: ScoreKey, raw: &str) -> i64 {
        let value = parse_leading_integer(raw)
            .filter(|value| self.total_with(key, *value).is_some())
            .unwrap_or(0);
        self.scores.insert(key, value);
        value
    }

    pub fn set_score_strict(&mut self, key: ScoreKey, raw: &str) -> Result<i64, ScoreError> {
        self.apply(key, raw, &ScoringPolicy::default())
    }

    pub fn apply(
        &mut self,
        key: ScoreKey,
        raw: &str,
        policy: &ScoringPolicy,
    ) -> Result<i64, ScoreError> {
        let value = match policy.parsing {
            ScoreParsing::Lenient => parse_leading_integer(raw).unwrap_or(0),
            ScoreParsing::Strict => {
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| ScoreError::InvalidScore {
                        key,
                        raw: raw.to_string(),
                    })?
            }
        };

        if policy.enforce_bounds && !(0..=MAX_CRITERION_SCORE).contains(&value) {
            return Err(ScoreError::OutOfRange { key, value });
        }
        if self.total_with(key, value).is_none() {
            return Err(ScoreError::TotalOverflow { key, value });
        }

        self.scores.insert(key, value);
        Ok(value)
    }

    /// Apply a JSON-encoded score under a field name such as `a2_4`.
    pub fn apply_json(
        &mut self,
        name: &str,
        raw: &Value,
        policy: &ScoringPolicy,
    ) -> Result<i64, ScoreError> {
        let key = name
            .parse::<ScoreKey>()
            .map_err(|_| ScoreError::UnknownCriterion(name.to_string()))?;
        self.apply(key, &raw_score_text(raw), policy)
    }

    pub fn score(&self, key: ScoreKey) -> Option<i64> {
        self.scores.get(&key).copied()
    }

    pub fn scores(&self) -> &BTreeMap<ScoreKey, i64> {
        &self.scores
    }

    pub fn section_total(&self, section: SectionCode) -> i64 {
        self.scores
            .iter()
            .filter(|(key, _)| key.field().section() == section)
            .fold(0, |total, (_, value)| total.saturating_add(*value))
    }

    pub fn total_score(&self) -> i64 {
        total_score(self)
    }

    /// Sheet total if `key` held `value`, `None` on overflow.
    fn total_with(&self, key: ScoreKey, value: i64) -> Option<i64> {
        self.scores
            .iter()
            .filter(|(existing, _)| **existing != key)
            .try_fold(value, |total, (_, score)| total.checked_add(*score))
    }
}

/// Sum of every stored score. No clamp is applied here. Only a deserialized
/// sheet can exceed `i64`, and its total saturates.
pub fn total_score(sheet: &ScoreSheet) -> i64 {
    sheet
        .scores
        .values()
        .fold(0, |total: i64, value| total.saturating_add(*value))
}

/// Display context only: the ceiling if every criterion scored the maximum.
pub fn max_possible(sections: &[SectionCode]) -> i64 {
    MAX_CRITERION_SCORE * total_field_count(sections) as i64
}

/// Mirrors the browser's `parseInt`: optional whitespace and sign, then the
/// leading run of digits. `None` when no digit is present.
fn parse_leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = {
        let end = rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };

    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn raw_score_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sheet() -> ScoreSheet {
        ScoreSheet::new(
            FacultyId::from("FAC-9"),
            AcademicYear(2025),
            ReviewerId::from("ADM-1"),
        )
    }

    fn key(raw: &str) -> ScoreKey {
        raw.parse().expect("valid score key")
    }

    #[test]
    fn lenient_set_score_coerces_garbage_to_zero() {
        let mut sheet = sheet();
        assert_eq!(sheet.set_score(key("a1_1"), "abc"), 0);
        assert_eq!(sheet.score(key("a1_1")), Some(0));
        assert_eq!(sheet.set_score(key("a1_2"), "85"), 85);
        assert_eq!(sheet.total_score(), 85);
        assert_eq!(sheet.scores().len(), 2);
    }

    #[test]
    fn lenient_parsing_follows_leading_integer_rule() {
        let mut sheet = sheet();
        assert_eq!(sheet.set_score(key("a2_1"), " 42"), 42);
        assert_eq!(sheet.set_score(key("a2_2"), "12abc"), 12);
        assert_eq!(sheet.set_score(key("a2_3"), "7.9"), 7);
        assert_eq!(sheet.set_score(key("a2_4"), "-5"), -5);
        assert_eq!(sheet.set_score(key("a2_5"), ""), 0);
        assert_eq!(sheet.total_score(), 42 + 12 + 7 - 5);
    }

    #[test]
    fn strict_parsing_rejects_malformed_input_without_storing() {
        let mut sheet = sheet();
        assert_eq!(
            sheet.set_score_strict(key("a3_1"), "abc"),
            Err(ScoreError::InvalidScore {
                key: key("a3_1"),
                raw: "abc".to_string(),
            })
        );
        assert_eq!(sheet.score(key("a3_1")), None);
        assert_eq!(sheet.set_score_strict(key("a3_1"), " 64 "), Ok(64));
    }

    #[test]
    fn bounds_are_enforced_only_when_policy_asks() {
        let mut sheet = sheet();
        assert_eq!(
            sheet.set_score_strict(key("a4_1"), "101"),
            Err(ScoreError::OutOfRange {
                key: key("a4_1"),
                value: 101,
            })
        );

        let legacy = ScoringPolicy::legacy();
        assert_eq!(sheet.apply(key("a4_1"), "250", &legacy), Ok(250));
        assert_eq!(sheet.total_score(), 250);
    }

    #[test]
    fn total_includes_zero_and_coerced_entries() {
        let mut sheet = sheet();
        sheet.set_score(key("a1_1"), "abc");
        sheet.set_score(key("a1_2"), "0");
        sheet.set_score(key("a5_5"), "90");
        assert_eq!(total_score(&sheet), 90);
        assert_eq!(sheet.section_total(SectionCode::L1), 0);
        assert_eq!(sheet.section_total(SectionCode::L5), 90);
    }

    #[test]
    fn json_scores_accept_numbers_and_reject_unknown_criteria() {
        let mut sheet = sheet();
        let policy = ScoringPolicy::default();
        assert_eq!(sheet.apply_json("a2_9", &json!(77), &policy), Ok(77));
        assert_eq!(sheet.apply_json("a2_8", &json!("60"), &policy), Ok(60));
        assert!(matches!(
            sheet.apply_json("a2_7", &json!(7.5), &policy),
            Err(ScoreError::InvalidScore { .. })
        ));
        assert_eq!(
            sheet.apply_json("l2_1", &json!(10), &policy),
            Err(ScoreError::UnknownCriterion("l2_1".to_string()))
        );
        assert_eq!(
            sheet.apply_json("a2_7", &json!(7.5), &ScoringPolicy::legacy()),
            Ok(7)
        );
    }

    #[test]
    fn unbounded_scores_cannot_overflow_the_total() {
        let mut sheet = sheet();
        let legacy = ScoringPolicy::legacy();
        assert_eq!(
            sheet.apply(key("a1_1"), &i64::MAX.to_string(), &legacy),
            Ok(i64::MAX)
        );
        assert_eq!(
            sheet.apply(key("a1_2"), "1", &legacy),
            Err(ScoreError::TotalOverflow {
                key: key("a1_2"),
                value: 1,
            })
        );
        assert_eq!(sheet.score(key("a1_2")), None);
        assert_eq!(sheet.total_score(), i64::MAX);

        // replacing the large entry is still allowed
        assert_eq!(sheet.apply(key("a1_1"), "-5", &legacy), Ok(-5));
        assert_eq!(sheet.apply(key("a1_2"), "1", &legacy), Ok(1));
        assert_eq!(sheet.total_score(), -4);
    }

    #[test]
    fn lenient_set_score_coerces_overflowing_input_to_zero() {
        let mut sheet = sheet();
        sheet.set_score(key("a2_1"), &i64::MAX.to_string());
        assert_eq!(sheet.set_score(key("a2_2"), "1"), 0);
        assert_eq!(sheet.total_score(), i64::MAX);
        assert_eq!(sheet.section_total(SectionCode::L2), i64::MAX);
    }

    #[test]
    fn max_possible_scales_with_catalog() {
        assert_eq!(max_possible(&SectionCode::ordered()), 3500);
        assert_eq!(max_possible(&[SectionCode::L5]), 500);
    }
}
