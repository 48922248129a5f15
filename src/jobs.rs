//! Report jobs: lifecycle, registry, runner and the worker pool draining the queue.
//!
//! Every accepted webhook becomes a [`Job`] pushed onto a bounded queue. A fixed
//! number of workers pop jobs and hand them to [`ReportRunner::run`], which walks
//! `Validated → Fetching → Aggregating → Building → Publishing → Done` (or
//! `Failed` from any state) and posts exactly one terminal comment to the
//! triggering project or task.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::{error, info, warn};
use megaplan_api::{EntityRef, MegaplanClient};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task;
use uuid::Uuid;

use crate::aggregator::{ReportRoot, TreeAggregator};
use crate::error::{ReportError, Result};
use crate::hierarchy::HierarchyRules;
use crate::report::ReportBuilder;

pub const FAILURE_COMMENT: &str =
    "[KUBIT — Отчет] Ошибка структуры данных. Проверьте соблюдение иерархии";

/// Finished jobs beyond this count are dropped from the registry.
const MAX_RETAINED_JOBS: usize = 1024;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    Task,
}

impl EntityKind {
    /// Case-insensitive parse of the webhook `entityType`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "project" => Some(EntityKind::Project),
            "task" => Some(EntityKind::Task),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Project => f.write_str("project"),
            EntityKind::Task => f.write_str("task"),
        }
    }
}

/// Validated webhook input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub kind: EntityKind,
    pub entity_id: String,
}

impl Trigger {
    pub fn new(kind: EntityKind, entity_id: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
        }
    }

    /// Entity whose comment thread receives the job's notification.
    pub fn subject(&self) -> EntityRef {
        match self.kind {
            EntityKind::Project => EntityRef::project(&self.entity_id),
            EntityKind::Task => EntityRef::task(&self.entity_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Validated,
    Fetching,
    Aggregating,
    Building,
    Publishing,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// Next state on the success path. `Failed` is reached through [`Job::fail`] only.
    pub fn successor(&self) -> Option<JobState> {
        match self {
            JobState::Validated => Some(JobState::Fetching),
            JobState::Fetching => Some(JobState::Aggregating),
            JobState::Aggregating => Some(JobState::Building),
            JobState::Building => Some(JobState::Publishing),
            JobState::Publishing => Some(JobState::Done),
            JobState::Done | JobState::Failed => None,
        }
    }
}

/// The single comment a job posted when it finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Report { file_id: String, rows: usize },
    Failure,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job {0} already posted its terminal notification")]
    AlreadyNotified(JobId),
    #[error("job {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition { id: JobId, from: JobState, to: JobState },
}

/// Read-only view of a job, as stored in the registry and served over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub state: JobState,
    pub notification: Option<Notification>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct Job {
    id: JobId,
    trigger: Trigger,
    state: JobState,
    notification: Option<Notification>,
    error: Option<String>,
}

impl Job {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            state: JobState::Validated,
            notification: None,
            error: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Moves one step forward through the pipeline. Terminal states are final.
    pub fn advance(&mut self, next: JobState) -> std::result::Result<(), JobError> {
        if self.state.successor() != Some(next) {
            return Err(JobError::InvalidTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = JobState::Failed;
        self.error = Some(reason.into());
    }

    /// Records the terminal comment. A second notification is rejected.
    pub fn record_notification(&mut self, notification: Notification) -> std::result::Result<(), JobError> {
        if self.notification.is_some() {
            return Err(JobError::AlreadyNotified(self.id));
        }
        self.notification = Some(notification);
        Ok(())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            entity_type: self.trigger.kind,
            entity_id: self.trigger.entity_id.clone(),
            state: self.state,
            notification: self.notification.clone(),
            error: self.error.clone(),
        }
    }
}

/// In-memory snapshots of recent jobs.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<JobId, JobSnapshot>>>,
}

impl JobRegistry {
    pub fn store(&self, snapshot: JobSnapshot) {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        if jobs.len() >= MAX_RETAINED_JOBS && !jobs.contains_key(&snapshot.id) {
            jobs.retain(|_, job| !job.state.is_terminal());
        }
        jobs.insert(snapshot.id, snapshot);
    }

    pub fn get(&self, id: &JobId) -> Option<JobSnapshot> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn remove(&self, id: &JobId) {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).remove(id);
    }
}

/// Runs one job end to end against Megaplan.
pub struct ReportRunner {
    client: MegaplanClient,
    rules: HierarchyRules,
    registry: JobRegistry,
}

impl ReportRunner {
    pub fn new(client: MegaplanClient, rules: HierarchyRules, registry: JobRegistry) -> Self {
        Self {
            client,
            rules,
            registry,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Executes the pipeline and posts exactly one terminal comment: the report
    /// on success, [`FAILURE_COMMENT`] otherwise.
    pub async fn run(&self, mut job: Job) -> JobSnapshot {
        let subject = job.trigger.subject();
        info!("Job {} started for {} {}", job.id, job.trigger.kind, job.trigger.entity_id);

        match self.execute(&mut job, &subject).await {
            Ok(notification) => {
                if let Err(err) = job.record_notification(notification) {
                    warn!("{}", err);
                }
                self.advance(&mut job, JobState::Done);
                info!("Job {} finished", job.id);
            }
            Err(err) => {
                error!("Job {} failed in state {:?}: {}", job.id, job.state, err);
                job.fail(err.to_string());
                self.notify_failure(&mut job, &subject).await;
            }
        }

        let snapshot = job.snapshot();
        self.registry.store(snapshot.clone());
        snapshot
    }

    async fn execute(&self, job: &mut Job, subject: &EntityRef) -> Result<Notification> {
        self.advance(job, JobState::Fetching);
        let root = self.fetch_root(&job.trigger).await?;

        self.advance(job, JobState::Aggregating);
        let rows = TreeAggregator::new(&self.client, &self.rules).collect(&root).await?;

        self.advance(job, JobState::Building);
        let row_count = rows.len();
        let artifact = task::spawn_blocking(move || ReportBuilder::build(&rows)).await??;

        self.advance(job, JobState::Publishing);
        let file = self.client.upload_file(artifact, &root.name).await?;
        let content = format!("Задачи проекта {}", root.name);
        self.client
            .post_comment(subject, &content, std::slice::from_ref(&file))
            .await?;

        Ok(Notification::Report {
            file_id: file.id,
            rows: row_count,
        })
    }

    async fn fetch_root(&self, trigger: &Trigger) -> Result<ReportRoot> {
        let id = trigger.entity_id.as_str();
        let (name, party, issues) = match trigger.kind {
            EntityKind::Project => {
                let issues = self.client.get_project_issues(id).await?;
                let project = self.client.get_project(id).await?;
                (project.name, project.responsible, issues)
            }
            EntityKind::Task => {
                let task = self.client.get_task(id).await?;
                let issues = self.client.get_task_subtasks(id).await?;
                let party = task.responsible_or_owner().cloned();
                (task.name, party, issues)
            }
        };

        let party = party.ok_or_else(|| ReportError::missing(format!("{} {}", trigger.kind, id), "responsible"))?;
        let responsible = self.client.responsible_name(&party).await?;
        Ok(ReportRoot {
            name,
            responsible,
            issues,
        })
    }

    async fn notify_failure(&self, job: &mut Job, subject: &EntityRef) {
        if job.notification().is_some() {
            warn!("Job {} already notified, skipping failure comment", job.id);
            return;
        }
        match self.client.post_comment(subject, FAILURE_COMMENT, &[]).await {
            Ok(()) => {
                if let Err(err) = job.record_notification(Notification::Failure) {
                    warn!("{}", err);
                }
                info!("Posted failure comment for job {}", job.id);
            }
            Err(err) => error!("Failed to post failure comment for job {}: {}", job.id, err),
        }
    }

    /// Terminal handling for a job whose runner panicked.
    async fn recover_panicked(&self, id: JobId, trigger: Trigger) {
        let already_notified = self
            .registry
            .get(&id)
            .is_some_and(|snapshot| snapshot.notification.is_some());
        let mut job = Job {
            id,
            trigger,
            state: JobState::Failed,
            notification: None,
            error: Some("job panicked".to_string()),
        };
        if !already_notified {
            let subject = job.trigger.subject();
            self.notify_failure(&mut job, &subject).await;
        }
        self.registry.store(job.snapshot());
    }

    fn advance(&self, job: &mut Job, next: JobState) {
        if let Err(err) = job.advance(next) {
            warn!("{}", err);
            return;
        }
        info!("Job {} -> {:?}", job.id, next);
        self.registry.store(job.snapshot());
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("report queue is full")]
    Full,
    #[error("report queue is closed")]
    Closed,
}

/// Handle used by the HTTP layer to enqueue jobs and look them up.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    registry: JobRegistry,
}

impl JobQueue {
    /// Spawns `workers` tasks draining a queue of at most `capacity` pending jobs.
    pub fn start(runner: Arc<ReportRunner>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(AsyncMutex::new(receiver));
        for worker in 0..workers.max(1) {
            tokio::spawn(worker_loop(worker, receiver.clone(), runner.clone()));
        }
        Self {
            sender,
            registry: runner.registry().clone(),
        }
    }

    pub fn submit(&self, trigger: Trigger) -> std::result::Result<JobSnapshot, QueueError> {
        let job = Job::new(trigger);
        let snapshot = job.snapshot();
        self.registry.store(snapshot.clone());
        match self.sender.try_send(job) {
            Ok(()) => Ok(snapshot),
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.registry.remove(&job.id);
                Err(QueueError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                self.registry.remove(&job.id);
                Err(QueueError::Closed)
            }
        }
    }

    pub fn status(&self, id: &JobId) -> Option<JobSnapshot> {
        self.registry.get(id)
    }
}

async fn worker_loop(worker: usize, receiver: Arc<AsyncMutex<mpsc::Receiver<Job>>>, runner: Arc<ReportRunner>) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(job) = next else {
            info!("Report worker {} stopped", worker);
            break;
        };

        let id = job.id;
        let trigger = job.trigger.clone();
        let job_runner = runner.clone();
        if let Err(err) = tokio::spawn(async move { job_runner.run(job).await }).await {
            error!("Job {} aborted on worker {}: {}", id, worker, err);
            runner.recover_panicked(id, trigger).await;
        }
    }
}
