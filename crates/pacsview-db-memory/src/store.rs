//! The in-memory store and its repository trait implementations.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;

use pacsview_core::{Instance, Patient, Person, Project, ProjectAssociation, Series, Study};
use pacsview_search::StudyQuery;
use pacsview_storage::{
    AuditLog, PersonRepository, ProjectRepository, StorageError, StudyPage, StudyRepository,
};

use crate::eval::EvalContext;

/// One recorded audit entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: OffsetDateTime,
    pub actor: String,
    pub action: String,
}

#[derive(Default)]
struct Tables {
    patients: BTreeMap<i64, Patient>,
    studies: BTreeMap<i64, Study>,
    series: BTreeMap<i64, Series>,
    instances: BTreeMap<i64, Instance>,
    projects: BTreeMap<i64, Project>,
    associations: BTreeMap<i64, ProjectAssociation>,
    persons: BTreeMap<i64, Person>,
    instance_files: BTreeMap<i64, PathBuf>,
    audit: Vec<AuditEntry>,
    next_pk: i64,
}

impl Tables {
    fn allocate_pk(&mut self) -> i64 {
        self.next_pk += 1;
        self.next_pk
    }
}

/// In-memory backend implementing every pacsview repository trait.
///
/// Locks are held only for the duration of a synchronous table operation,
/// never across awaits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Fixture seeding ====================

    pub fn insert_patient(&self, patient: Patient) {
        let mut tables = self.inner.write().unwrap();
        tables.next_pk = tables.next_pk.max(patient.pk);
        tables.patients.insert(patient.pk, patient);
    }

    pub fn insert_study(&self, study: Study) {
        let mut tables = self.inner.write().unwrap();
        tables.next_pk = tables.next_pk.max(study.pk);
        tables.studies.insert(study.pk, study);
    }

    pub fn insert_series(&self, series: Series) {
        let mut tables = self.inner.write().unwrap();
        tables.next_pk = tables.next_pk.max(series.pk);
        tables.series.insert(series.pk, series);
    }

    pub fn insert_instance(&self, instance: Instance) {
        let mut tables = self.inner.write().unwrap();
        tables.next_pk = tables.next_pk.max(instance.pk);
        tables.instances.insert(instance.pk, instance);
    }

    pub fn insert_project(&self, project: Project) {
        let mut tables = self.inner.write().unwrap();
        tables.next_pk = tables.next_pk.max(project.pk);
        tables.projects.insert(project.pk, project);
    }

    pub fn insert_person(&self, person: Person) {
        let mut tables = self.inner.write().unwrap();
        tables.next_pk = tables.next_pk.max(person.pk);
        tables.persons.insert(person.pk, person);
    }

    /// Register the archive file backing an instance.
    pub fn set_instance_file(&self, instance_pk: i64, path: PathBuf) {
        self.inner
            .write()
            .unwrap()
            .instance_files
            .insert(instance_pk, path);
    }

    // ==================== Test inspection ====================

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.read().unwrap().audit.clone()
    }

    pub fn associations_for_study(&self, study_pk: i64) -> Vec<ProjectAssociation> {
        self.inner
            .read()
            .unwrap()
            .associations
            .values()
            .filter(|a| a.study_fk == study_pk)
            .cloned()
            .collect()
    }

    pub fn person(&self, pk: i64) -> Option<Person> {
        self.inner.read().unwrap().persons.get(&pk).cloned()
    }
}

#[async_trait]
impl StudyRepository for MemoryStore {
    async fn search_studies(&self, query: &StudyQuery) -> Result<StudyPage, StorageError> {
        let tables = self.inner.read().unwrap();
        let ctx = EvalContext {
            patients: &tables.patients,
            series: &tables.series,
            associations: &tables.associations,
        };

        let mut matches: Vec<&Study> = tables
            .studies
            .values()
            .filter(|study| ctx.matches(study, &query.filter))
            .collect();
        matches.sort_by(|a, b| ctx.compare(a, b, query.sort));

        let total = matches.len();
        let studies: Vec<Study> = matches
            .into_iter()
            .skip(query.page.offset())
            .take(query.page.limit())
            .cloned()
            .collect();
        debug!(total, returned = studies.len(), "study search evaluated");

        Ok(StudyPage::new(
            studies,
            total,
            query.page.page,
            query.page.page_size,
        ))
    }

    async fn patient(&self, pk: i64) -> Result<Option<Patient>, StorageError> {
        Ok(self.inner.read().unwrap().patients.get(&pk).cloned())
    }

    async fn study(&self, pk: i64) -> Result<Option<Study>, StorageError> {
        Ok(self.inner.read().unwrap().studies.get(&pk).cloned())
    }

    async fn series(&self, pk: i64) -> Result<Option<Series>, StorageError> {
        Ok(self.inner.read().unwrap().series.get(&pk).cloned())
    }

    async fn studies_of(&self, patient_pk: i64) -> Result<Vec<Study>, StorageError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .studies
            .values()
            .filter(|s| s.patient_fk == patient_pk)
            .cloned()
            .collect())
    }

    async fn series_of(&self, study_pk: i64) -> Result<Vec<Series>, StorageError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .series
            .values()
            .filter(|s| s.study_fk == study_pk)
            .cloned()
            .collect())
    }

    async fn instances_of(&self, series_pk: i64) -> Result<Vec<Instance>, StorageError> {
        let mut instances: Vec<Instance> = self
            .inner
            .read()
            .unwrap()
            .instances
            .values()
            .filter(|i| i.series_fk == series_pk)
            .cloned()
            .collect();
        instances.sort_by_key(|i| i.inst_no);
        Ok(instances)
    }

    async fn instance_file(&self, instance: &Instance) -> Result<PathBuf, StorageError> {
        self.inner
            .read()
            .unwrap()
            .instance_files
            .get(&instance.pk)
            .cloned()
            .ok_or_else(|| StorageError::not_found("InstanceFile", instance.pk))
    }
}

#[async_trait]
impl PersonRepository for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Person>, StorageError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .persons
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn save_clipboard(&self, username: &str, clipboard: &str) -> Result<(), StorageError> {
        let mut tables = self.inner.write().unwrap();
        let person = tables
            .persons
            .values_mut()
            .find(|p| p.username == username)
            .ok_or_else(|| StorageError::not_found("Person", username))?;
        person.clipboard = clipboard.to_string();
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn find_project(&self, pk: i64) -> Result<Option<Project>, StorageError> {
        Ok(self.inner.read().unwrap().projects.get(&pk).cloned())
    }

    async fn create_project(&self, name: &str, owner_pk: i64) -> Result<Project, StorageError> {
        let mut tables = self.inner.write().unwrap();
        let pk = tables.allocate_pk();
        let project = Project {
            pk,
            name: name.to_string(),
            person_fk: owner_pk,
        };
        tables.projects.insert(pk, project.clone());
        Ok(project)
    }

    async fn find_association(
        &self,
        study_pk: i64,
        owner_pk: i64,
    ) -> Result<Option<ProjectAssociation>, StorageError> {
        let tables = self.inner.read().unwrap();
        Ok(tables
            .associations
            .values()
            .find(|a| {
                a.study_fk == study_pk
                    && tables
                        .projects
                        .get(&a.project_fk)
                        .is_some_and(|p| p.person_fk == owner_pk)
            })
            .cloned())
    }

    async fn save_association(
        &self,
        mut association: ProjectAssociation,
    ) -> Result<ProjectAssociation, StorageError> {
        let mut tables = self.inner.write().unwrap();
        if association.pk == 0 {
            association.pk = tables.allocate_pk();
        }
        tables
            .associations
            .insert(association.pk, association.clone());
        Ok(association)
    }

    async fn delete_association(&self, pk: i64) -> Result<(), StorageError> {
        self.inner.write().unwrap().associations.remove(&pk);
        Ok(())
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn record(&self, actor: &str, action: &str) -> Result<(), StorageError> {
        self.inner.write().unwrap().audit.push(AuditEntry {
            timestamp: OffsetDateTime::now_utc(),
            actor: actor.to_string(),
            action: action.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacsview_search::{
        PageRequest, SortDirection, SortField, SortSpec, StudyFilter, compile,
    };
    use time::macros::{date, datetime};

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_patient(Patient {
            pk: 1,
            name: "john smith".into(),
            external_id: "P-001".into(),
            birth_date: Some(date!(1980 - 05 - 01)),
            sex: Some('M'),
        });
        store.insert_patient(Patient {
            pk: 2,
            name: "JOHN DOE".into(),
            external_id: "P-002".into(),
            birth_date: Some(date!(1975 - 01 - 15)),
            sex: Some('M'),
        });
        store.insert_patient(Patient {
            pk: 3,
            name: "Jane Roe".into(),
            external_id: "P-003".into(),
            birth_date: Some(date!(1990 - 09 - 09)),
            sex: Some('F'),
        });
        store.insert_study(Study {
            pk: 10,
            patient_fk: 1,
            description: "Brain MRI".into(),
            study_datetime: Some(datetime!(2020-06-01 10:30 UTC)),
            accession: "AC-10".into(),
        });
        store.insert_study(Study {
            pk: 11,
            patient_fk: 2,
            description: "Knee MRI".into(),
            study_datetime: Some(datetime!(2021-01-20 08:00 UTC)),
            accession: "AC-11".into(),
        });
        store.insert_study(Study {
            pk: 12,
            patient_fk: 3,
            description: "Brain CT".into(),
            study_datetime: Some(datetime!(2019-03-05 14:00 UTC)),
            accession: "AC-12".into(),
        });
        store.insert_series(Series {
            pk: 100,
            study_fk: 10,
            protocol: "T2 FLAIR".into(),
        });
        store.insert_series(Series {
            pk: 101,
            study_fk: 11,
            protocol: "pd_tse_sag".into(),
        });
        store
    }

    fn query(filter: StudyFilter) -> StudyQuery {
        compile(filter, PageRequest::new(0, 20), SortSpec::default()).unwrap()
    }

    #[tokio::test]
    async fn test_unconstrained_search_returns_all_in_default_order() {
        let store = seeded();
        let page = store
            .search_studies(&query(StudyFilter::default()))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let patient_order: Vec<i64> = page.studies.iter().map(|s| s.patient_fk).collect();
        assert_eq!(patient_order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_name_filter_case_insensitive_substring() {
        let store = seeded();
        let page = store
            .search_studies(&query(StudyFilter {
                name: Some("John".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.studies.iter().all(|s| s.patient_fk != 3));
    }

    #[tokio::test]
    async fn test_age_filter_day_range_boundaries() {
        let store = MemoryStore::new();
        store.insert_patient(Patient {
            pk: 1,
            name: "exact forty".into(),
            external_id: "P-1".into(),
            // 40*365 days before 2020-01-01.
            birth_date: Some(date!(1980 - 01 - 11)),
            sex: None,
        });
        store.insert_patient(Patient {
            pk: 2,
            name: "forty one".into(),
            external_id: "P-2".into(),
            // 41*365 days before 2020-01-01.
            birth_date: Some(date!(1979 - 01 - 11)),
            sex: None,
        });
        for (pk, patient_fk) in [(10, 1), (11, 2)] {
            store.insert_study(Study {
                pk,
                patient_fk,
                description: String::new(),
                study_datetime: Some(datetime!(2020-01-01 00:00 UTC)),
                accession: String::new(),
            });
        }

        let page = store
            .search_studies(&query(StudyFilter {
                age: Some(40),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.studies[0].patient_fk, 1);
    }

    #[tokio::test]
    async fn test_protocol_filter_requires_matching_series() {
        let store = seeded();
        let page = store
            .search_studies(&query(StudyFilter {
                protocol: Some("flair".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.studies[0].pk, 10);
    }

    #[tokio::test]
    async fn test_acquisition_date_comparison() {
        let store = seeded();
        let page = store
            .search_studies(&query(StudyFilter {
                acquisition: Some((pacsview_search::DateOp::Since, date!(2020 - 01 - 01))),
                ..Default::default()
            }))
            .await
            .unwrap();
        let pks: Vec<i64> = page.studies.iter().map(|s| s.pk).collect();
        assert_eq!(pks, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_project_and_participation_must_match_same_association() {
        let store = seeded();
        store.insert_project(Project {
            pk: 500,
            name: "Study Arm".into(),
            person_fk: 1,
        });
        store
            .save_association(ProjectAssociation {
                pk: 0,
                project_fk: 500,
                study_fk: 10,
                participation_id: "arm-A".into(),
            })
            .await
            .unwrap();

        let hit = store
            .search_studies(&query(StudyFilter {
                project: Some(500),
                participation_id: Some("arm-A".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(hit.total, 1);

        let miss = store
            .search_studies(&query(StudyFilter {
                project: Some(500),
                participation_id: Some("arm-B".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(miss.total, 0);
    }

    #[tokio::test]
    async fn test_sort_by_date_desc_with_stable_tiebreak() {
        let store = seeded();
        let q = compile(
            StudyFilter::default(),
            PageRequest::new(0, 20),
            SortSpec::new(SortField::StudyDate, SortDirection::Desc),
        )
        .unwrap();
        let page = store.search_studies(&q).await.unwrap();
        let pks: Vec<i64> = page.studies.iter().map(|s| s.pk).collect();
        assert_eq!(pks, vec![11, 10, 12]);
    }

    #[tokio::test]
    async fn test_pagination_is_deterministic() {
        let store = seeded();
        let first = compile(
            StudyFilter::default(),
            PageRequest::new(0, 2),
            SortSpec::default(),
        )
        .unwrap();
        let second = compile(
            StudyFilter::default(),
            PageRequest::new(1, 2),
            SortSpec::default(),
        )
        .unwrap();
        let page1 = store.search_studies(&first).await.unwrap();
        let page2 = store.search_studies(&second).await.unwrap();
        assert_eq!(page1.total, 3);
        assert!(page1.has_more());
        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 1);
        let mut all: Vec<i64> = page1.studies.iter().map(|s| s.pk).collect();
        all.extend(page2.studies.iter().map(|s| s.pk));
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_instances_sorted_by_inst_no() {
        let store = seeded();
        for (pk, inst_no) in [(1000, 3), (1001, 1), (1002, 2)] {
            store.insert_instance(Instance {
                pk,
                series_fk: 100,
                sop_iuid: format!("1.2.{pk}"),
                inst_no,
                num_frames: 1,
                attrs: serde_json::Value::Null,
            });
        }
        let instances = store.instances_of(100).await.unwrap();
        let order: Vec<u32> = instances.iter().map(|i| i.inst_no).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_clipboard_save_requires_person() {
        let store = seeded();
        assert!(store.save_clipboard("ghost", "series:1").await.is_err());
        store.insert_person(Person {
            pk: 900,
            username: "jdoe".into(),
            clipboard: String::new(),
        });
        store.save_clipboard("jdoe", "series:1").await.unwrap();
        assert_eq!(store.person(900).unwrap().clipboard, "series:1");
    }
}
