use serde::{Deserialize, Serialize};

use super::catalog::SectionCode;
use super::submission::Submission;
use super::validation::is_field_filled;

/// Filled/total counts for a section or for a whole submission.
///
/// `percentage` is left unrounded; rounding is a presentation concern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionStat {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

impl CompletionStat {
    pub fn from_counts(completed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * completed as f64 / total as f64
        };

        Self {
            completed,
            total,
            percentage,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }

    pub fn rounded_percentage(&self) -> u32 {
        self.percentage.round() as u32
    }
}

pub fn section_completion(section: SectionCode, submission: &Submission) -> CompletionStat {
    let completed = section
        .field_keys()
        .filter(|key| is_field_filled(submission.get(*key)))
        .count();

    CompletionStat::from_counts(completed, section.field_count())
}

/// Sums completed and total counts across `sections`, in the order given.
pub fn overall_completion(sections: &[SectionCode], submission: &Submission) -> CompletionStat {
    let (completed, total) = sections
        .iter()
        .map(|section| section_completion(*section, submission))
        .fold((0, 0), |(completed, total), stat| {
            (completed + stat.completed, total + stat.total)
        });

    CompletionStat::from_counts(completed, total)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionProgressEntry {
    pub section: SectionCode,
    pub title: &'static str,
    #[serde(flatten)]
    pub stat: CompletionStat,
}

/// Dashboard-ready completion breakdown over the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub sections: Vec<SectionProgressEntry>,
    pub overall: CompletionStat,
    pub sections_completed: usize,
}

impl CompletionReport {
    pub fn build(submission: &Submission) -> Self {
        let ordered = SectionCode::ordered();
        let sections: Vec<SectionProgressEntry> = ordered
            .iter()
            .map(|section| SectionProgressEntry {
                section: *section,
                title: section.title(),
                stat: section_completion(*section, submission),
            })
            .collect();

        let sections_completed = sections
            .iter()
            .filter(|entry| entry.stat.is_complete())
            .count();

        Self {
            overall: overall_completion(&ordered, submission),
            sections,
            sections_completed,
        }
    }
}
