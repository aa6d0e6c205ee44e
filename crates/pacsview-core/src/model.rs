//! Domain entities owned by the study repository.
//!
//! Field names follow the columns of the backing archive schema
//! (`pat_name`, `study_custom1`, ...) so the compiled SQL and the entity
//! structs stay obviously in sync.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::CoreError;

/// A person under examination. Owns zero or more studies by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub pk: i64,
    /// Display name (`pat_name`).
    pub name: String,
    /// External identifier issued by the ordering system (`pat_id`).
    pub external_id: String,
    pub birth_date: Option<Date>,
    /// Sex code, usually `M`/`F`/`O` (`pat_sex`).
    pub sex: Option<char>,
}

/// One imaging examination event for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub pk: i64,
    pub patient_fk: i64,
    pub description: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub study_datetime: Option<OffsetDateTime>,
    /// Free-text protocol/accession code (`study_custom1`).
    pub accession: String,
}

/// One acquisition run within a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub pk: i64,
    pub study_fk: i64,
    /// Free-text protocol code (`series_custom1`).
    pub protocol: String,
}

/// One discrete captured image/frame-set object within a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub pk: i64,
    pub series_fk: i64,
    /// Unique object identifier (`sop_iuid`).
    pub sop_iuid: String,
    /// Position of this instance within its series (`inst_no`).
    pub inst_no: u32,
    /// Frame count attribute of a multi-frame object.
    pub num_frames: u32,
    /// Opaque imaging metadata (`inst_attrs`); never interpreted here.
    #[serde(default)]
    pub attrs: serde_json::Value,
}

/// A named grouping of studies owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub pk: i64,
    pub name: String,
    /// Owning user.
    pub person_fk: i64,
}

/// Links exactly one study to exactly one project.
///
/// At most one association may exist per (study, project owner) pair; the
/// reconciler enforces this, not the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAssociation {
    pub pk: i64,
    pub project_fk: i64,
    pub study_fk: i64,
    /// Role/arm code for the study's inclusion in the project.
    pub participation_id: String,
}

/// An authenticated user of the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub pk: i64,
    pub username: String,
    /// Serialized [`crate::Clipboard`], reconstructed per operation.
    pub clipboard: String,
}

/// The entity kinds a clipboard entry may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Patient,
    Study,
    Series,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Patient => "patient",
            ItemKind::Study => "study",
            ItemKind::Series => "series",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(ItemKind::Patient),
            "study" => Ok(ItemKind::Study),
            "series" => Ok(ItemKind::Series),
            other => Err(CoreError::validation(format!(
                "unknown clipboard item kind: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_round_trip() {
        for kind in [ItemKind::Patient, ItemKind::Study, ItemKind::Series] {
            let parsed: ItemKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_item_kind_rejects_unknown() {
        assert!("frame".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_instance_attrs_default() {
        let json = r#"{"pk":1,"series_fk":2,"sop_iuid":"1.2.3","inst_no":1,"num_frames":30}"#;
        let instance: Instance = serde_json::from_str(json).unwrap();
        assert!(instance.attrs.is_null());
    }
}
