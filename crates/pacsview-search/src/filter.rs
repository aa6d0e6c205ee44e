//! The typed, optional search criteria for the study search, plus sort and
//! pagination specifications.
//!
//! Every field is optional; absence (or an empty/blank string) means "no
//! constraint". The compiler in [`crate::builder`] joins lazily based on
//! which fields are present.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::builder::QueryBuildError;

/// Comparison selector for the acquisition-date filter.
///
/// `Since` deliberately maps to the same operator as `After`; the two are
/// distinct in the UI vocabulary only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOp {
    Before,
    On,
    After,
    Since,
}

impl DateOp {
    /// The SQL comparison operator this selector compiles to.
    pub fn as_sql(self) -> &'static str {
        match self {
            DateOp::Before => "<",
            DateOp::On => "=",
            DateOp::After | DateOp::Since => ">",
        }
    }
}

impl std::str::FromStr for DateOp {
    type Err = QueryBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(DateOp::Before),
            "on" => Ok(DateOp::On),
            "after" => Ok(DateOp::After),
            "since" => Ok(DateOp::Since),
            other => Err(QueryBuildError::InvalidFilter(format!(
                "unknown date comparison: {other}"
            ))),
        }
    }
}

/// Search criteria; all fields optional, AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyFilter {
    /// Patient name substring, case-insensitive.
    pub name: Option<String>,
    /// Patient external id OR study accession substring, case-insensitive.
    pub id: Option<String>,
    /// Patient age in years at acquisition time, day-range approximated.
    pub age: Option<u16>,
    /// Patient sex code, exact.
    pub sex: Option<char>,
    /// Series protocol substring, case-insensitive. Joins the series table.
    pub protocol: Option<String>,
    /// Study description substring, case-insensitive.
    pub description: Option<String>,
    /// Acquisition-date comparison against the study date's date part.
    pub acquisition: Option<(DateOp, Date)>,
    /// Project id, exact. Joins the project association table.
    pub project: Option<i64>,
    /// Participation id, exact. Joins the project association table.
    pub participation_id: Option<String>,
}

impl StudyFilter {
    /// Treats `None` and blank strings alike, the way the form submits them.
    pub(crate) fn text(field: &Option<String>) -> Option<&str> {
        field.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        Self::text(&self.name)
    }

    pub fn id(&self) -> Option<&str> {
        Self::text(&self.id)
    }

    pub fn protocol(&self) -> Option<&str> {
        Self::text(&self.protocol)
    }

    pub fn description(&self) -> Option<&str> {
        Self::text(&self.description)
    }

    pub fn participation_id(&self) -> Option<&str> {
        Self::text(&self.participation_id)
    }

    /// Whether the project association table is needed at all.
    pub fn wants_association(&self) -> bool {
        self.project.is_some() || self.participation_id().is_some()
    }

    /// Whether the series table is needed at all.
    pub fn wants_series(&self) -> bool {
        self.protocol().is_some()
    }

    /// True when every field is absent and the search is unfiltered.
    pub fn is_unconstrained(&self) -> bool {
        self.name().is_none()
            && self.id().is_none()
            && self.age.is_none()
            && self.sex.is_none()
            && self.protocol().is_none()
            && self.description().is_none()
            && self.acquisition.is_none()
            && self.project.is_none()
            && self.participation_id().is_none()
    }
}

/// Sort direction; anything but `desc` is ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Closed allow-list of sortable fields. An unknown field name fails
/// compilation, never the repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Default sort key and the tie-breaking secondary key.
    #[default]
    PatientPk,
    PatientName,
    StudyDate,
    Description,
    Accession,
}

impl SortField {
    /// Fully qualified column this field sorts on.
    pub fn column(self) -> &'static str {
        match self {
            SortField::PatientPk => "patient.pk",
            SortField::PatientName => "patient.pat_name",
            SortField::StudyDate => "study.study_datetime",
            SortField::Description => "study.study_desc",
            SortField::Accession => "study.study_custom1",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = QueryBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "patient" => Ok(SortField::PatientPk),
            "name" => Ok(SortField::PatientName),
            "date" => Ok(SortField::StudyDate),
            "description" => Ok(SortField::Description),
            "accession" => Ok(SortField::Accession),
            other => Err(QueryBuildError::InvalidSortField(other.to_string())),
        }
    }
}

/// Sort specification: field plus direction, default `patient.pk asc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn asc(field: SortField) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: SortField) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Zero-indexed page number with a fixed page size from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        self.page * self.page_size
    }

    pub fn limit(&self) -> usize {
        self.page_size
    }
}
