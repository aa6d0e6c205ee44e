//! Job scheduling on the tokio worker pool.
//!
//! `submit` replaces the old "fire the job, then block on its single
//! result" idiom with an explicit handle: callers that need the result
//! await `JobHandle::join`, callers that do not simply drop the handle
//! (the job keeps running). Job lifecycle is published on the event bus.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use pacsview_core::events::{EventBroadcaster, JobEvent};

use crate::error::JobError;

/// Handle to a submitted job. `join` yields the job's terminal result.
pub struct JobHandle<T> {
    job_id: String,
    handle: JoinHandle<Result<T, JobError>>,
}

impl<T> JobHandle<T> {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Wait for the job's terminal result. No timeout is applied; a hung
    /// external converter blocks its caller (see the concurrency notes in
    /// the crate docs).
    pub async fn join(self) -> Result<T, JobError> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_err) => Err(JobError::conversion_failed(format!(
                "job {} aborted: {join_err}",
                self.job_id
            ))),
        }
    }
}

/// Spawns jobs and owns the downloads root under which every job gets its
/// private working directory.
#[derive(Clone)]
pub struct JobRunner {
    downloads_root: PathBuf,
    events: Arc<EventBroadcaster>,
}

impl JobRunner {
    pub fn new(downloads_root: PathBuf, events: Arc<EventBroadcaster>) -> Self {
        Self {
            downloads_root,
            events,
        }
    }

    /// Create a fresh, uniquely named working directory for one job.
    /// The directory is owned exclusively by that job for its lifetime.
    pub fn create_work_dir(&self) -> Result<(String, PathBuf), JobError> {
        let job_id = Uuid::new_v4().to_string();
        let work_dir = self.downloads_root.join(&job_id);
        std::fs::create_dir_all(&work_dir)?;
        Ok((job_id, work_dir))
    }

    /// Submit a job future to the worker pool.
    pub fn submit<T, F>(&self, job_id: String, job: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, JobError>> + Send + 'static,
    {
        let events = Arc::clone(&self.events);
        events.send_job(JobEvent::submitted(&job_id));
        info!(job_id = %job_id, "job submitted");

        let id_for_task = job_id.clone();
        let handle = tokio::spawn(async move {
            let result = job.await;
            match &result {
                Ok(_) => {
                    info!(job_id = %id_for_task, "job completed");
                    events.send_job(JobEvent::completed(&id_for_task));
                }
                Err(err) => {
                    error!(job_id = %id_for_task, error = %err, "job failed");
                    events.send_job(JobEvent::failed(&id_for_task, err.to_string()));
                }
            }
            result
        });

        JobHandle { job_id, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacsview_core::events::{JobEventType, SystemEvent};

    fn runner(root: &std::path::Path) -> (JobRunner, Arc<EventBroadcaster>) {
        let events = EventBroadcaster::new_shared();
        (JobRunner::new(root.to_path_buf(), Arc::clone(&events)), events)
    }

    #[tokio::test]
    async fn test_work_dirs_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let (runner, _) = runner(root.path());
        let (id_a, dir_a) = runner.create_work_dir().unwrap();
        let (id_b, dir_b) = runner.create_work_dir().unwrap();
        assert_ne!(id_a, id_b);
        assert_ne!(dir_a, dir_b);
        assert!(dir_a.is_dir());
        assert!(dir_b.is_dir());
    }

    #[tokio::test]
    async fn test_join_returns_job_result() {
        let root = tempfile::tempdir().unwrap();
        let (runner, _) = runner(root.path());
        let handle = runner.submit("job-1".into(), async { Ok(42usize) });
        assert_eq!(handle.join().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_failure_publishes_failed_event() {
        let root = tempfile::tempdir().unwrap();
        let (runner, events) = runner(root.path());
        let mut receiver = events.subscribe();

        let handle = runner.submit("job-2".into(), async {
            Err::<(), _>(JobError::conversion_failed("boom"))
        });
        assert!(handle.join().await.is_err());

        let mut seen = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let SystemEvent::Job(job) = event {
                seen.push(job.event_type);
            }
        }
        assert_eq!(seen, vec![JobEventType::Submitted, JobEventType::Failed]);
    }
}
