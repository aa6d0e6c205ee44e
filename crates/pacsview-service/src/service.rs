//! The service facade.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use pacsview_config::AppConfig;
use pacsview_core::events::EventBroadcaster;
use pacsview_core::{
    Clipboard, CoreError, ItemKind, Patient, Person, Project, ProjectAssociation, Result, Series,
};
use pacsview_jobs::{
    ConversionJob, ExportEntry, ExportJob, ExportManifest, ExportRegistry, Format, JobError,
    JobRunner, MedconTool, SourceInstance, preview_frame_index,
};
use pacsview_search::{PageRequest, SortSpec, StudyFilter, compile};
use pacsview_storage::{
    AuditLog, PersonRepository, ProjectRepository, StudyPage, StudyRepository,
};

use crate::notify::{OperatorNotifier, TracingNotifier, report_failure};
use crate::types::{AssociateRequest, ClipboardCommand, DownloadRequest, PreviewFrame};

/// Application facade: one method per logical endpoint.
pub struct PacsviewService {
    studies: Arc<dyn StudyRepository>,
    persons: Arc<dyn PersonRepository>,
    projects: Arc<dyn ProjectRepository>,
    audit: Arc<dyn AuditLog>,
    runner: JobRunner,
    exports: Arc<ExportRegistry>,
    events: Arc<EventBroadcaster>,
    notifier: Arc<dyn OperatorNotifier>,
    config: AppConfig,
}

impl PacsviewService {
    pub fn new(
        config: AppConfig,
        studies: Arc<dyn StudyRepository>,
        persons: Arc<dyn PersonRepository>,
        projects: Arc<dyn ProjectRepository>,
        audit: Arc<dyn AuditLog>,
        events: Arc<EventBroadcaster>,
    ) -> Self {
        let runner = JobRunner::new(config.downloads_dir.clone(), Arc::clone(&events));
        Self {
            studies,
            persons,
            projects,
            audit,
            runner,
            exports: Arc::new(ExportRegistry::new()),
            events,
            notifier: Arc::new(TracingNotifier),
            config,
        }
    }

    /// Replace the operator notification channel.
    pub fn with_notifier(mut self, notifier: Arc<dyn OperatorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn events(&self) -> &Arc<EventBroadcaster> {
        &self.events
    }

    // ==================== Search and fetch ====================

    /// Compile and execute one study search page.
    pub async fn search_studies(
        &self,
        filter: StudyFilter,
        page: usize,
        sort: SortSpec,
    ) -> Result<StudyPage> {
        let query = compile(filter, PageRequest::new(page, self.config.page_size), sort)?;
        Ok(self.studies.search_studies(&query).await?)
    }

    pub async fn get_patient(&self, pk: i64) -> Result<Patient> {
        self.studies
            .patient(pk)
            .await?
            .ok_or_else(|| CoreError::not_found("patient", pk))
    }

    pub async fn get_series(&self, pk: i64) -> Result<Series> {
        self.studies
            .series(pk)
            .await?
            .ok_or_else(|| CoreError::not_found("series", pk))
    }

    /// Select the representative preview frame of a series.
    ///
    /// Single-instance series show frame `num_frames/2 + echo + 1` of that
    /// instance; multi-instance series show frame 1 of the middle instance.
    pub async fn preview_frame(
        &self,
        series_pk: i64,
        echo: u32,
        columns: Option<u32>,
    ) -> Result<PreviewFrame> {
        self.get_series(series_pk).await?;
        let instances = self.studies.instances_of(series_pk).await?;
        match instances.as_slice() {
            [] => Err(CoreError::not_found("instance", series_pk)),
            [only] => Ok(PreviewFrame {
                sop_iuid: only.sop_iuid.clone(),
                frame: preview_frame_index(only.num_frames, echo),
                columns,
            }),
            all => {
                let middle_no = (all.len() / 2) as u32;
                let middle = all
                    .iter()
                    .find(|instance| instance.inst_no == middle_no)
                    .unwrap_or(&all[all.len() / 2]);
                Ok(PreviewFrame {
                    sop_iuid: middle.sop_iuid.clone(),
                    frame: 1,
                    columns,
                })
            }
        }
    }

    // ==================== Download ====================

    /// Convert one series and wait for the artifact. The calling flow
    /// suspends until its job reaches a terminal state.
    pub async fn download_series(
        &self,
        request: DownloadRequest,
        username: &str,
    ) -> Result<PathBuf> {
        let series = self.get_series(request.series_pk).await?;
        let sources = self.source_instances(request.series_pk).await?;
        self.audit
            .record(username, &format!("downloaded series {}", series.pk))
            .await?;

        let (job_id, work_dir) = self.runner.create_work_dir().map_err(CoreError::from)?;
        let job = ConversionJob::new(series, sources, request.format, work_dir, self.medcon_tool());
        let handle = self.runner.submit(job_id, job.run());
        Ok(handle.join().await?)
    }

    // ==================== Export ====================

    /// Package the user's clipboard into a password-protected archive.
    ///
    /// Fire-and-forget: the archive is built on the worker pool and
    /// registered under the session for later retrieval by the returned
    /// token. The clipboard itself is left untouched.
    pub async fn export_clipboard(
        &self,
        username: &str,
        password: &str,
        session: &str,
    ) -> Result<String> {
        let person = self.require_person(username).await?;
        let clipboard = Clipboard::parse(&person.clipboard)?;
        if clipboard.is_empty() {
            return Err(CoreError::validation("clipboard is empty"));
        }
        self.audit
            .record(username, &format!("exported clipboard {clipboard}"))
            .await?;

        let (job_id, work_dir) = self.runner.create_work_dir().map_err(CoreError::from)?;
        let token = format!("{username}-{job_id}.zip");
        self.exports.register_pending(session, &token);

        let studies = Arc::clone(&self.studies);
        let exports = Arc::clone(&self.exports);
        let medcon = self.medcon_tool();
        let owner = username.to_string();
        let password = password.to_string();
        let session = session.to_string();
        let registered_token = token.clone();
        let id_in_job = job_id.clone();
        let snapshot = clipboard.clone();
        let handle = self.runner.submit(job_id, async move {
            let result = build_export(
                studies, snapshot, work_dir, password, owner, id_in_job, medcon,
            )
            .await;
            match result {
                Ok(path) => {
                    exports.mark_ready(&session, &registered_token, path.clone());
                    Ok(path)
                }
                Err(err) => {
                    exports.mark_failed(&session, &registered_token, err.to_string());
                    Err(err)
                }
            }
        });
        // Export does not suspend the requesting flow.
        drop(handle);

        info!(username, token = %token, "export submitted");
        Ok(token)
    }

    /// Fetch a finished export artifact by token. Pending, failed and
    /// unknown tokens all read as not found.
    pub fn retrieve_export(&self, session: &str, token: &str) -> Result<PathBuf> {
        self.exports
            .get(session, token)
            .ok_or_else(|| CoreError::not_found("export", token))
    }

    // ==================== Clipboard ====================

    /// Apply one clipboard mutation, persist the new state, and notify
    /// session caches through the event bus.
    pub async fn clipboard(&self, username: &str, command: ClipboardCommand) -> Result<Clipboard> {
        let person = self.require_person(username).await?;
        let mut clipboard = Clipboard::parse(&person.clipboard)?;
        match command {
            ClipboardCommand::Add { kind, id } => {
                clipboard.add(kind, id);
            }
            ClipboardCommand::Remove { kind, id } => clipboard.remove(kind, id),
            ClipboardCommand::Clear => clipboard.clear(),
        }
        let serialized = clipboard.serialize();
        self.persons.save_clipboard(username, &serialized).await?;
        self.events.send_clipboard_changed(username, serialized);
        Ok(clipboard)
    }

    // ==================== Project association ====================

    /// Reconcile the single (study, acting user) project link.
    ///
    /// Rules, in order: no project given and an association exists, delete
    /// it; a new project name creates a project (precedence over an
    /// existing id); an existing id resolves that project; the association
    /// is then updated in place or created. At most one association per
    /// (study, user) holds afterwards.
    pub async fn associate(&self, request: AssociateRequest, username: &str) -> Result<()> {
        let person = self.require_person(username).await?;
        self.studies
            .study(request.study_pk)
            .await?
            .ok_or_else(|| CoreError::not_found("study", request.study_pk))?;

        let existing = self
            .projects
            .find_association(request.study_pk, person.pk)
            .await?;

        if !request.wants_project() {
            if let Some(association) = existing {
                debug!(study = request.study_pk, username, "removing association");
                self.projects.delete_association(association.pk).await?;
            }
            return Ok(());
        }

        let project = self.resolve_project(&request, &person).await?;
        let association = match existing {
            Some(mut association) => {
                association.project_fk = project.pk;
                association.participation_id = request.participation_id.clone();
                association
            }
            None => ProjectAssociation {
                pk: 0,
                project_fk: project.pk,
                study_fk: request.study_pk,
                participation_id: request.participation_id.clone(),
            },
        };
        self.projects.save_association(association).await?;
        Ok(())
    }

    // ==================== Boundary ====================

    /// Handle a failure nothing upstream consumed: log it and forward it
    /// to the operator channel when one is configured.
    pub fn report_failure(&self, context: &str, error: &CoreError) {
        report_failure(
            self.notifier.as_ref(),
            self.config.operator_notify.as_deref(),
            context,
            error,
        );
    }

    // ==================== Internals ====================

    async fn require_person(&self, username: &str) -> Result<Person> {
        self.persons
            .find_by_username(username)
            .await?
            .ok_or_else(|| CoreError::not_found("person", username))
    }

    async fn resolve_project(
        &self,
        request: &AssociateRequest,
        person: &Person,
    ) -> Result<Project> {
        if let Some(name) = request.new_project_name() {
            return Ok(self.projects.create_project(name, person.pk).await?);
        }
        // wants_project() already held, so the id must be present.
        let project_id = request
            .project_id
            .ok_or_else(|| CoreError::validation("no project id or name given"))?;
        self.projects
            .find_project(project_id)
            .await?
            .ok_or_else(|| CoreError::not_found("project", project_id))
    }

    async fn source_instances(&self, series_pk: i64) -> Result<Vec<SourceInstance>> {
        let instances = self.studies.instances_of(series_pk).await?;
        let mut sources = Vec::with_capacity(instances.len());
        for instance in instances {
            let path = self.studies.instance_file(&instance).await?;
            sources.push(SourceInstance { instance, path });
        }
        Ok(sources)
    }

    fn medcon_tool(&self) -> Option<MedconTool> {
        match (self.config.medcon_bin(), self.config.medcon_lib()) {
            (Some(bin), Some(lib_dir)) => Some(MedconTool { bin, lib_dir }),
            _ => None,
        }
    }
}

/// Expand the clipboard snapshot to its series set, in clipboard order,
/// without duplicates.
async fn resolve_series(
    studies: &Arc<dyn StudyRepository>,
    snapshot: &Clipboard,
) -> std::result::Result<Vec<i64>, JobError> {
    let mut series_pks: Vec<i64> = Vec::new();
    let push = |pk: i64, series_pks: &mut Vec<i64>| {
        if !series_pks.contains(&pk) {
            series_pks.push(pk);
        }
    };

    for (kind, ids) in snapshot.iter() {
        for &id in ids {
            match kind {
                ItemKind::Series => push(id, &mut series_pks),
                ItemKind::Study => {
                    for series in studies.series_of(id).await.map_err(storage_failure)? {
                        push(series.pk, &mut series_pks);
                    }
                }
                ItemKind::Patient => {
                    for study in studies.studies_of(id).await.map_err(storage_failure)? {
                        for series in
                            studies.series_of(study.pk).await.map_err(storage_failure)?
                        {
                            push(series.pk, &mut series_pks);
                        }
                    }
                }
            }
        }
    }
    Ok(series_pks)
}

/// The export job body: convert every referenced series into the working
/// directory, then bundle the artifacts into one encrypted archive.
async fn build_export(
    studies: Arc<dyn StudyRepository>,
    snapshot: Clipboard,
    work_dir: PathBuf,
    password: String,
    username: String,
    job_id: String,
    medcon: Option<MedconTool>,
) -> std::result::Result<PathBuf, JobError> {
    let mut entries = Vec::new();
    for series_pk in resolve_series(&studies, &snapshot).await? {
        let series = studies
            .series(series_pk)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| JobError::conversion_failed(format!("series {series_pk} vanished")))?;

        let instances = studies
            .instances_of(series_pk)
            .await
            .map_err(storage_failure)?;
        let mut sources = Vec::with_capacity(instances.len());
        for instance in instances {
            let path = studies
                .instance_file(&instance)
                .await
                .map_err(storage_failure)?;
            sources.push(SourceInstance { instance, path });
        }

        // Single-instance series export their raw capture; multi-instance
        // series export the interchange volume.
        let format = if sources.len() == 1 {
            Format::Dcm
        } else {
            Format::Nii
        };
        let artifact = ConversionJob::new(
            series,
            sources,
            format,
            work_dir.clone(),
            medcon.clone(),
        )
        .run()
        .await?;
        let archive_path = artifact
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("series_{series_pk}"));
        entries.push(ExportEntry {
            archive_path,
            source: artifact,
        });
    }

    let manifest = ExportManifest {
        entries,
        clipboard_text: snapshot.serialize(),
    };
    ExportJob::new(manifest, password).run(&work_dir, &username, &job_id)
}

fn storage_failure(err: pacsview_storage::StorageError) -> JobError {
    JobError::conversion_failed(err.to_string())
}
