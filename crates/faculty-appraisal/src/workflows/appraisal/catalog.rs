use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The five fixed performance sections of an appraisal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionCode {
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl SectionCode {
    pub const fn ordered() -> [Self; 5] {
        [Self::L1, Self::L2, Self::L3, Self::L4, Self::L5]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4 => "L4",
            Self::L5 => "L5",
        }
    }

    /// Prefix used by documentation-link field names (`l1_3`).
    pub const fn proof_prefix(self) -> &'static str {
        match self {
            Self::L1 => "l1",
            Self::L2 => "l2",
            Self::L3 => "l3",
            Self::L4 => "l4",
            Self::L5 => "l5",
        }
    }

    /// Prefix used by reviewer score field names (`a1_3`).
    pub const fn score_prefix(self) -> &'static str {
        match self {
            Self::L1 => "a1",
            Self::L2 => "a2",
            Self::L3 => "a3",
            Self::L4 => "a4",
            Self::L5 => "a5",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::L1 => "Teaching & Learning",
            Self::L2 => "Research & Consultancy",
            Self::L3 => "Professional Development",
            Self::L4 => "Contribution to Institute",
            Self::L5 => "Student Development",
        }
    }

    pub const fn descriptions(self) -> &'static [&'static str] {
        match self {
            Self::L1 => &[
                "Teaching methodology and innovation",
                "Course content development",
                "Student assessment techniques",
                "Classroom management skills",
                "Use of educational technology",
                "Student feedback and improvement",
            ],
            Self::L2 => &[
                "Research publications",
                "Conference presentations",
                "Research grants received",
                "Patent applications",
                "Industry collaborations",
                "Research supervision",
                "Consultancy projects",
                "Research impact metrics",
                "International collaborations",
            ],
            Self::L3 => &[
                "Professional certifications",
                "Workshop attendance",
                "Skill development programs",
                "Industry training",
                "Academic conferences",
                "Professional memberships",
                "Continuing education",
                "Leadership development",
                "Technical skill enhancement",
            ],
            Self::L4 => &[
                "Committee participation",
                "Administrative responsibilities",
                "Institutional service",
                "Academic governance",
                "Policy development",
                "Strategic planning",
            ],
            Self::L5 => &[
                "Student mentoring",
                "Career guidance",
                "Extracurricular activities",
                "Student project supervision",
                "Student welfare initiatives",
            ],
        }
    }

    pub const fn field_count(self) -> usize {
        self.descriptions().len()
    }

    /// Looks up a section by its display code (`L1`..`L5`).
    pub fn from_code(raw: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|section| section.code() == raw)
    }

    pub fn field_keys(self) -> impl Iterator<Item = FieldKey> {
        (1..=self.field_count()).map(move |ordinal| FieldKey {
            section: self,
            ordinal: ordinal as u8,
        })
    }
}

impl fmt::Display for SectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Total number of criteria across the given sections.
pub fn total_field_count(sections: &[SectionCode]) -> usize {
    sections.iter().map(|section| section.field_count()).sum()
}

/// Human-readable description for a criterion.
///
/// Total over arbitrary input: unknown sections and ordinals past the curated
/// list fall back to `"<SECTION>.<ordinal> Documentation"`.
pub fn describe_field(section_code: &str, ordinal: usize) -> String {
    SectionCode::from_code(section_code)
        .and_then(|section| {
            ordinal
                .checked_sub(1)
                .and_then(|index| section.descriptions().get(index))
        })
        .map(|description| description.to_string())
        .unwrap_or_else(|| format!("{section_code}.{ordinal} Documentation"))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown section prefix '{0}'")]
    UnknownSection(String),
    #[error("criterion {ordinal} is outside {section} (1..={max})")]
    OrdinalOutOfRange {
        section: SectionCode,
        ordinal: usize,
        max: usize,
    },
    #[error("malformed field key '{0}'")]
    MalformedKey(String),
}

/// One criterion within one section. Only constructible for ordinals the
/// catalog defines, so every key maps to exactly one (section, ordinal) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldKey {
    section: SectionCode,
    ordinal: u8,
}

impl FieldKey {
    pub fn new(section: SectionCode, ordinal: usize) -> Result<Self, CatalogError> {
        let max = section.field_count();
        if ordinal == 0 || ordinal > max {
            return Err(CatalogError::OrdinalOutOfRange {
                section,
                ordinal,
                max,
            });
        }

        Ok(Self {
            section,
            ordinal: ordinal as u8,
        })
    }

    pub const fn section(self) -> SectionCode {
        self.section
    }

    pub const fn ordinal(self) -> usize {
        self.ordinal as usize
    }

    pub fn description(self) -> &'static str {
        self.section.descriptions()[self.ordinal() - 1]
    }

    /// Display label as shown on the dashboard, e.g. `L2.4 - Patent applications`.
    pub fn label(self) -> String {
        format!(
            "{}.{} - {}",
            self.section.code(),
            self.ordinal,
            self.description()
        )
    }

    pub const fn score_key(self) -> ScoreKey {
        ScoreKey(self)
    }

    /// Every key in catalog order.
    pub fn all() -> impl Iterator<Item = FieldKey> {
        SectionCode::ordered()
            .into_iter()
            .flat_map(SectionCode::field_keys)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.section.proof_prefix(), self.ordinal)
    }
}

impl FromStr for FieldKey {
    type Err = CatalogError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_key(raw, SectionCode::proof_prefix)
    }
}

/// Reviewer-facing name of a criterion (`a1_3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScoreKey(pub FieldKey);

impl ScoreKey {
    pub const fn field(self) -> FieldKey {
        self.0
    }

    pub fn all() -> impl Iterator<Item = ScoreKey> {
        FieldKey::all().map(ScoreKey)
    }
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.0.section.score_prefix(),
            self.0.ordinal
        )
    }
}

impl FromStr for ScoreKey {
    type Err = CatalogError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_key(raw, SectionCode::score_prefix).map(ScoreKey)
    }
}

fn parse_key(
    raw: &str,
    prefix_of: fn(SectionCode) -> &'static str,
) -> Result<FieldKey, CatalogError> {
    let malformed = || CatalogError::MalformedKey(raw.to_string());
    let (prefix, ordinal) = raw.split_once('_').ok_or_else(malformed)?;

    let section = SectionCode::ordered()
        .into_iter()
        .find(|section| prefix_of(*section) == prefix)
        .ok_or_else(|| CatalogError::UnknownSection(prefix.to_string()))?;

    // Only the rendered form is accepted: digits with no sign or leading zero.
    let canonical = !ordinal.is_empty()
        && !ordinal.starts_with('0')
        && ordinal.bytes().all(|byte| byte.is_ascii_digit());
    if !canonical {
        return Err(malformed());
    }
    let ordinal = ordinal.parse::<usize>().map_err(|_| malformed())?;

    FieldKey::new(section, ordinal)
}

macro_rules! string_keyed_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_keyed_serde!(FieldKey);
string_keyed_serde!(ScoreKey);

/// Serializable catalog entry for clients rendering the forms.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub code: SectionCode,
    pub score_prefix: &'static str,
    pub title: &'static str,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub key: FieldKey,
    pub score_key: ScoreKey,
    pub description: &'static str,
}

pub fn catalog_view() -> Vec<SectionView> {
    SectionCode::ordered()
        .into_iter()
        .map(|section| SectionView {
            code: section,
            score_prefix: section.score_prefix(),
            title: section.title(),
            fields: section
                .field_keys()
                .map(|key| FieldView {
                    key,
                    score_key: key.score_key(),
                    description: key.description(),
                })
                .collect(),
        })
        .collect()
}
