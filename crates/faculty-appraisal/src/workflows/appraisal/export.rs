use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::SectionCode;
use super::repository::ScoreRecord;
use super::scoring::max_possible;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode score export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush score export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct ScoreExportRow<'a> {
    faculty_id: &'a str,
    year: i32,
    scored_by: &'a str,
    teaching_learning: i64,
    research_consultancy: i64,
    professional_development: i64,
    institute_contribution: i64,
    student_development: i64,
    total_score: i64,
    max_possible: i64,
    recorded_at: DateTime<Utc>,
}

/// Write one CSV row per score sheet, with per-section subtotals.
/// Returns the number of data rows written.
pub fn write_score_csv<W: Write>(records: &[ScoreRecord], writer: W) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let ceiling = max_possible(&SectionCode::ordered());

    for record in records {
        let sheet = &record.sheet;
        csv_writer.serialize(ScoreExportRow {
            faculty_id: &sheet.faculty_id().0,
            year: sheet.academic_year().0,
            scored_by: &sheet.reviewer().0,
            teaching_learning: sheet.section_total(SectionCode::L1),
            research_consultancy: sheet.section_total(SectionCode::L2),
            professional_development: sheet.section_total(SectionCode::L3),
            institute_contribution: sheet.section_total(SectionCode::L4),
            student_development: sheet.section_total(SectionCode::L5),
            total_score: sheet.total_score(),
            max_possible: ceiling,
            recorded_at: record.recorded_at,
        })?;
    }

    csv_writer.flush()?;
    Ok(records.len())
}
