//! Fetch orchestration service
//!
//! Runs one batch of fetch pipelines under a bounded concurrency limit,
//! publishing progress as jobs advance and collecting per-identifier
//! outcomes. A failed job never disturbs its siblings: each identifier
//! owns exactly one slot of the result map, and `run` only errors on
//! contract violations of its input.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cancel::CancellationToken;
use crate::config::FetchConfig;
use crate::domain::entities::{
    EntitySnapshot, FetchStage, JobStatus, ProjectSnapshot, RepoSlug, RepoSnapshot, SourceId,
    SourceKind,
};
use crate::domain::ports::{CodeHostApi, TrackerApi};
use crate::error::{ApiError, BatchError, JobError};
use crate::progress::{BatchId, ProgressBus, ProgressPayload};

/// Outcome of one orchestrator batch.
#[derive(Debug)]
pub struct BatchResult {
    pub batch_id: BatchId,
    pub outcomes: HashMap<SourceId, Result<EntitySnapshot, JobError>>,
}

impl BatchResult {
    pub fn snapshot(&self, id: &SourceId) -> Option<&EntitySnapshot> {
        self.outcomes.get(id).and_then(|r| r.as_ref().ok())
    }

    pub fn error(&self, id: &SourceId) -> Option<&JobError> {
        self.outcomes.get(id).and_then(|r| r.as_ref().err())
    }

    /// Terminal status of one job, if the identifier was part of the batch.
    pub fn status(&self, id: &SourceId) -> Option<JobStatus> {
        self.outcomes.get(id).map(|r| match r {
            Ok(_) => JobStatus::Succeeded,
            Err(_) => JobStatus::Failed,
        })
    }

    pub fn summary(&self) -> BatchSummary {
        let succeeded = self.outcomes.values().filter(|r| r.is_ok()).count();
        let snapshots = self.outcomes.values().filter_map(|r| r.as_ref().ok());
        let (mut commits, mut prs, mut issues) = (0, 0, 0);
        for snapshot in snapshots {
            commits += snapshot.commit_count();
            prs += snapshot.pull_request_count();
            issues += snapshot.issue_count();
        }
        BatchSummary {
            processed: self.outcomes.len(),
            succeeded,
            failed: self.outcomes.len() - succeeded,
            total_commits: commits,
            total_pull_requests: prs,
            total_issues: issues,
        }
    }
}

/// Aggregate counters reported when a batch completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_commits: usize,
    pub total_pull_requests: usize,
    pub total_issues: usize,
}

/// Orchestrator-side bookkeeping for one identifier. Lives only for the
/// duration of the batch; the terminal status is set exactly once.
#[derive(Debug)]
struct FetchJob {
    id: SourceId,
    kind: SourceKind,
    status: JobStatus,
    last_error: Option<String>,
}

impl FetchJob {
    fn new(id: SourceId, kind: SourceKind) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Pending,
            last_error: None,
        }
    }

    fn start(&mut self) {
        debug_assert_eq!(self.status, JobStatus::Pending);
        self.status = JobStatus::Running;
    }

    fn finish(&mut self, result: &Result<EntitySnapshot, JobError>) {
        debug_assert!(!self.status.is_terminal());
        match result {
            Ok(_) => self.status = JobStatus::Succeeded,
            Err(err) => {
                self.status = JobStatus::Failed;
                self.last_error = Some(err.to_string());
            }
        }
    }
}

/// Coordinates parallel fetch pipelines against the code host and tracker.
pub struct FetchOrchestrator<C, T> {
    code_host: Arc<C>,
    tracker: Arc<T>,
}

impl<C, T> FetchOrchestrator<C, T>
where
    C: CodeHostApi + 'static,
    T: TrackerApi + 'static,
{
    pub fn new(code_host: Arc<C>, tracker: Arc<T>) -> Self {
        Self { code_host, tracker }
    }

    /// Run one batch over `identifiers`.
    ///
    /// At most `config.concurrency` pipelines run at once; the rest queue
    /// in FIFO order. Individual job failures land in the result map;
    /// `run` itself fails only for an empty identifier set or a zero
    /// concurrency limit.
    pub async fn run(
        &self,
        identifiers: Vec<SourceId>,
        kind: SourceKind,
        config: &FetchConfig,
        bus: &ProgressBus,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, BatchError> {
        if identifiers.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        if config.concurrency == 0 {
            return Err(BatchError::InvalidConcurrency);
        }

        // Identifiers name their result slot, so duplicates collapse.
        let mut seen = HashSet::new();
        let identifiers: Vec<SourceId> = identifiers
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let total = identifiers.len();
        tracing::info!(batch = %bus.batch_id(), %kind, total, "fetch batch started");
        bus.publish(ProgressPayload::FetchStarted { total });

        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        let mut join_set = JoinSet::new();

        for id in identifiers {
            let semaphore = Arc::clone(&semaphore);
            let code_host = Arc::clone(&self.code_host);
            let tracker = Arc::clone(&self.tracker);
            let bus = bus.clone();
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (id, Err(JobError::Cancelled)),
                };

                let mut job = FetchJob::new(id.clone(), kind);
                let result = if cancel.is_cancelled() {
                    Err(JobError::Cancelled)
                } else {
                    job.start();
                    match kind {
                        SourceKind::CodeHost => {
                            run_code_host_job(code_host.as_ref(), &id, &bus, &cancel).await
                        }
                        SourceKind::Tracker => {
                            run_tracker_job(tracker.as_ref(), &id, &bus, &cancel).await
                        }
                    }
                };

                job.finish(&result);
                tracing::debug!(
                    job = %job.id,
                    kind = %job.kind,
                    status = %job.status,
                    error = job.last_error.as_deref().unwrap_or(""),
                    "job finished"
                );

                match &result {
                    Ok(_) => bus.publish(ProgressPayload::JobComplete {
                        id: id.clone(),
                        success: true,
                    }),
                    Err(err) => {
                        bus.publish(ProgressPayload::Error {
                            id: id.clone(),
                            message: err.to_string(),
                        });
                        bus.publish(ProgressPayload::JobComplete {
                            id: id.clone(),
                            success: false,
                        });
                    }
                }

                (id, result)
            });
        }

        let mut outcomes = HashMap::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((id, result)) => {
                    outcomes.insert(id, result);
                }
                Err(err) => tracing::error!(error = %err, "fetch job task aborted"),
            }
        }

        let succeeded = outcomes.values().filter(|r| r.is_ok()).count();
        let failed = outcomes.len() - succeeded;
        bus.publish(ProgressPayload::FetchComplete { succeeded, failed });
        tracing::info!(batch = %bus.batch_id(), succeeded, failed, "fetch batch complete");

        Ok(BatchResult {
            batch_id: bus.batch_id(),
            outcomes,
        })
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), JobError> {
    if cancel.is_cancelled() {
        Err(JobError::Cancelled)
    } else {
        Ok(())
    }
}

fn stage_done(bus: &ProgressBus, id: &SourceId, stage: FetchStage, position: usize, total: usize) {
    bus.publish(ProgressPayload::JobProgress {
        id: id.clone(),
        stage,
        position,
        total,
    });
}

/// Pipeline for one code-host repository:
/// metadata -> collaborators -> branches -> commits -> pull requests
/// (with nested reviews) -> issues (with nested comments).
async fn run_code_host_job<C: CodeHostApi + ?Sized>(
    api: &C,
    id: &SourceId,
    bus: &ProgressBus,
    cancel: &CancellationToken,
) -> Result<EntitySnapshot, JobError> {
    let slug =
        RepoSlug::parse(id.as_str()).ok_or_else(|| JobError::InvalidIdentifier(id.clone()))?;
    let total = FetchStage::pipeline(SourceKind::CodeHost).len();

    let repository = api
        .fetch_repository(&slug, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Metadata, e))?;
    stage_done(bus, id, FetchStage::Metadata, 1, total);
    checkpoint(cancel)?;

    let collaborators = api
        .fetch_collaborators(&slug, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Collaborators, e))?;
    stage_done(bus, id, FetchStage::Collaborators, 2, total);
    checkpoint(cancel)?;

    let mut branches = api
        .fetch_branches(&slug, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Branches, e))?;
    for branch in &mut branches {
        branch.is_default = branch.name == repository.default_branch;
    }
    stage_done(bus, id, FetchStage::Branches, 3, total);
    checkpoint(cancel)?;

    let commits = api
        .fetch_commits(&slug, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Commits, e))?;
    stage_done(bus, id, FetchStage::Commits, 4, total);
    checkpoint(cancel)?;

    let mut pull_requests = api
        .fetch_pull_requests(&slug, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::PullRequests, e))?;
    for pr in &mut pull_requests {
        match api.fetch_pr_reviews(&slug, pr.number, cancel).await {
            Ok(reviews) => pr.reviews = reviews,
            Err(ApiError::Cancelled) => return Err(JobError::Cancelled),
            Err(err) => {
                tracing::warn!(
                    repo = %slug,
                    pr = pr.number,
                    error = %err,
                    "failed to fetch reviews, continuing without"
                );
            }
        }
    }
    stage_done(bus, id, FetchStage::PullRequests, 5, total);
    checkpoint(cancel)?;

    let mut issues = api
        .fetch_issues(&slug, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Issues, e))?;
    for issue in &mut issues {
        match api.fetch_issue_comments(&slug, issue.number, cancel).await {
            Ok(comments) => issue.comments = comments,
            Err(ApiError::Cancelled) => return Err(JobError::Cancelled),
            Err(err) => {
                tracing::warn!(
                    repo = %slug,
                    issue = issue.number,
                    error = %err,
                    "failed to fetch comments, continuing without"
                );
            }
        }
    }
    stage_done(bus, id, FetchStage::Issues, 6, total);

    Ok(EntitySnapshot::CodeHost(RepoSnapshot {
        repository,
        collaborators,
        branches,
        commits,
        pull_requests,
        issues,
    }))
}

/// Pipeline for one tracker project:
/// metadata -> members -> sprints -> user stories -> tasks (with history).
async fn run_tracker_job<T: TrackerApi + ?Sized>(
    api: &T,
    id: &SourceId,
    bus: &ProgressBus,
    cancel: &CancellationToken,
) -> Result<EntitySnapshot, JobError> {
    let total = FetchStage::pipeline(SourceKind::Tracker).len();

    let project = api
        .fetch_project(id.as_str(), cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Metadata, e))?;
    stage_done(bus, id, FetchStage::Metadata, 1, total);
    checkpoint(cancel)?;

    let members = api
        .fetch_members(project.id, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Members, e))?;
    stage_done(bus, id, FetchStage::Members, 2, total);
    checkpoint(cancel)?;

    let sprints = api
        .fetch_sprints(project.id, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Sprints, e))?;
    stage_done(bus, id, FetchStage::Sprints, 3, total);
    checkpoint(cancel)?;

    let user_stories = api
        .fetch_user_stories(project.id, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::UserStories, e))?;
    stage_done(bus, id, FetchStage::UserStories, 4, total);
    checkpoint(cancel)?;

    let mut tasks = api
        .fetch_tasks(project.id, cancel)
        .await
        .map_err(|e| JobError::at_stage(FetchStage::Tasks, e))?;
    for task in &mut tasks {
        match api.fetch_task_history(task.id, cancel).await {
            Ok(history) => task.history = history,
            Err(ApiError::Cancelled) => return Err(JobError::Cancelled),
            Err(err) => {
                tracing::warn!(
                    project = %project.slug,
                    task = task.reference,
                    error = %err,
                    "failed to fetch task history, continuing without"
                );
            }
        }
    }
    stage_done(bus, id, FetchStage::Tasks, 5, total);

    Ok(EntitySnapshot::Tracker(ProjectSnapshot {
        project,
        members,
        sprints,
        user_stories,
        tasks,
    }))
}
