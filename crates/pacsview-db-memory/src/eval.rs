//! Filter evaluation with the same semantics as the compiled SQL.
//!
//! Inner-join semantics apply: a study whose patient row is missing never
//! matches, a protocol filter requires at least one matching series row,
//! and project/participation filters must hold on one and the same
//! association row.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use pacsview_core::{Patient, ProjectAssociation, Series, Study};
use pacsview_search::{SortDirection, SortField, SortSpec, StudyFilter};

const DAYS_PER_YEAR: i64 = 365;

pub(crate) struct EvalContext<'a> {
    pub patients: &'a BTreeMap<i64, Patient>,
    pub series: &'a BTreeMap<i64, Series>,
    pub associations: &'a BTreeMap<i64, ProjectAssociation>,
}

impl EvalContext<'_> {
    pub(crate) fn matches(&self, study: &Study, filter: &StudyFilter) -> bool {
        let Some(patient) = self.patients.get(&study.patient_fk) else {
            return false;
        };

        if let Some(name) = filter.name()
            && !contains_ci(&patient.name, name)
        {
            return false;
        }
        if let Some(id) = filter.id()
            && !contains_ci(&patient.external_id, id)
            && !contains_ci(&study.accession, id)
        {
            return false;
        }
        if let Some(age) = filter.age {
            let (Some(study_dt), Some(birth)) = (study.study_datetime, patient.birth_date)
            else {
                return false;
            };
            let days = i64::from(study_dt.date().to_julian_day()) - i64::from(birth.to_julian_day());
            let lower = DAYS_PER_YEAR * i64::from(age);
            let upper = DAYS_PER_YEAR * i64::from(age + 1);
            if days < lower || days >= upper {
                return false;
            }
        }
        if let Some(sex) = filter.sex
            && patient.sex != Some(sex)
        {
            return false;
        }
        if let Some(protocol) = filter.protocol() {
            let any = self
                .series
                .values()
                .any(|s| s.study_fk == study.pk && contains_ci(&s.protocol, protocol));
            if !any {
                return false;
            }
        }
        if let Some(description) = filter.description()
            && !contains_ci(&study.description, description)
        {
            return false;
        }
        if let Some((op, date)) = filter.acquisition {
            let Some(study_dt) = study.study_datetime else {
                return false;
            };
            let ordering = study_dt.date().cmp(&date);
            let ok = match op.as_sql() {
                "<" => ordering == Ordering::Less,
                "=" => ordering == Ordering::Equal,
                ">" => ordering == Ordering::Greater,
                _ => unreachable!("closed operator set"),
            };
            if !ok {
                return false;
            }
        }
        if filter.wants_association() {
            let any = self.associations.values().any(|a| {
                a.study_fk == study.pk
                    && filter.project.is_none_or(|p| a.project_fk == p)
                    && filter
                        .participation_id()
                        .is_none_or(|pid| a.participation_id == pid)
            });
            if !any {
                return false;
            }
        }

        true
    }

    /// Compare two studies per the compiled ordering: the chosen key in the
    /// chosen direction, then `patient.pk` ascending as tie-breaker.
    pub(crate) fn compare(&self, a: &Study, b: &Study, sort: SortSpec) -> Ordering {
        let primary = match sort.field {
            SortField::PatientPk => a.patient_fk.cmp(&b.patient_fk),
            SortField::PatientName => self.patient_name(a).cmp(&self.patient_name(b)),
            SortField::StudyDate => a.study_datetime.cmp(&b.study_datetime),
            SortField::Description => a.description.cmp(&b.description),
            SortField::Accession => a.accession.cmp(&b.accession),
        };
        let primary = match sort.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary
            .then(a.patient_fk.cmp(&b.patient_fk))
            .then(a.pk.cmp(&b.pk))
    }

    fn patient_name(&self, study: &Study) -> String {
        self.patients
            .get(&study.patient_fk)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_ci() {
        assert!(contains_ci("JOHN DOE", "john"));
        assert!(contains_ci("john smith", "John"));
        assert!(!contains_ci("Jane", "john"));
    }
}
