//! Mock implementations of port traits
//!
//! In-memory, scriptable implementations used by orchestrator and
//! integration tests. They serve data out of prebuilt snapshots, inject
//! failures per stage, track in-flight call counts, and can cancel a
//! batch token at a chosen stage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::cancel::CancellationToken;
use crate::domain::entities::{
    Branch, CodeReview, Collaborator, Comment, Commit, FetchStage, Issue, Member, Project,
    ProjectSnapshot, PullRequest, RepoSlug, RepoSnapshot, Repository, Sprint, TaskHistoryEntry,
    TaskRecord, UserStory,
};
use crate::domain::ports::{CodeHostApi, TrackerApi};
use crate::error::ApiError;

/// Shared plumbing for both mocks: call recording, concurrency gauging,
/// failure injection, and cancellation hooks.
#[derive(Default)]
struct MockCore {
    failures: Mutex<HashMap<(String, FetchStage), ApiError>>,
    fail_nested_only: bool,
    call_delay: Option<Duration>,
    cancel_hook: Mutex<Option<(String, FetchStage, CancellationToken)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<(String, FetchStage)>>,
}

impl MockCore {
    /// Record one remote call: gauge concurrency, optionally sleep, fire
    /// the cancellation hook, then apply any scripted failure.
    async fn stage_call(&self, key: &str, stage: FetchStage, nested: bool) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((key.to_string(), stage));

        let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(n, Ordering::SeqCst);
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let hook = self.cancel_hook.lock().unwrap().clone();
        if let Some((hook_key, hook_stage, token)) = hook {
            if hook_key == key && hook_stage == stage {
                token.cancel();
            }
        }

        if let Some(err) = self
            .failures
            .lock()
            .unwrap()
            .get(&(key.to_string(), stage))
        {
            if nested || !self.fail_nested_only {
                return Err(err.clone());
            }
        }

        Ok(())
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn calls(&self) -> Vec<(String, FetchStage)> {
        self.calls.lock().unwrap().clone()
    }
}

// ============================================================================
// Mock code-host API
// ============================================================================

#[derive(Default)]
pub struct MockCodeHostApi {
    snapshots: HashMap<String, RepoSnapshot>,
    core: MockCore,
}

impl MockCodeHostApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this snapshot for the given `owner/name` slug.
    pub fn with_snapshot(mut self, slug: &str, snapshot: RepoSnapshot) -> Self {
        self.snapshots.insert(slug.to_string(), snapshot);
        self
    }

    pub fn with_snapshots(
        mut self,
        snapshots: impl IntoIterator<Item = (String, RepoSnapshot)>,
    ) -> Self {
        self.snapshots.extend(snapshots);
        self
    }

    /// Fail every call for `slug` at `stage` with `error`.
    pub fn with_failure(self, slug: &str, stage: FetchStage, error: ApiError) -> Self {
        self.core
            .failures
            .lock()
            .unwrap()
            .insert((slug.to_string(), stage), error);
        self
    }

    /// Restrict scripted failures to nested calls (per-PR reviews,
    /// per-issue comments), leaving the stage listing itself healthy.
    pub fn fail_nested_only(mut self, value: bool) -> Self {
        self.core.fail_nested_only = value;
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.core.call_delay = Some(delay);
        self
    }

    /// Cancel `token` while serving the call for `slug` at `stage`.
    pub fn cancel_during(self, slug: &str, stage: FetchStage, token: CancellationToken) -> Self {
        *self.core.cancel_hook.lock().unwrap() = Some((slug.to_string(), stage, token));
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.core.max_in_flight()
    }

    pub fn calls(&self) -> Vec<(String, FetchStage)> {
        self.core.calls()
    }

    fn snapshot(&self, key: &str) -> Result<&RepoSnapshot, ApiError> {
        self.snapshots.get(key).ok_or_else(|| ApiError::Fatal {
            status: 404,
            message: format!("unknown repository {}", key),
        })
    }
}

#[async_trait]
impl CodeHostApi for MockCodeHostApi {
    async fn fetch_repository(
        &self,
        slug: &RepoSlug,
        _cancel: &CancellationToken,
    ) -> Result<Repository, ApiError> {
        let key = slug.to_string();
        self.core.stage_call(&key, FetchStage::Metadata, false).await?;
        Ok(self.snapshot(&key)?.repository.clone())
    }

    async fn fetch_collaborators(
        &self,
        slug: &RepoSlug,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Collaborator>, ApiError> {
        let key = slug.to_string();
        self.core
            .stage_call(&key, FetchStage::Collaborators, false)
            .await?;
        Ok(self.snapshot(&key)?.collaborators.clone())
    }

    async fn fetch_branches(
        &self,
        slug: &RepoSlug,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Branch>, ApiError> {
        let key = slug.to_string();
        self.core.stage_call(&key, FetchStage::Branches, false).await?;
        // Listings never carry the default-branch mark; the pipeline
        // derives it from repository metadata.
        Ok(self
            .snapshot(&key)?
            .branches
            .iter()
            .map(|b| Branch {
                is_default: false,
                ..b.clone()
            })
            .collect())
    }

    async fn fetch_commits(
        &self,
        slug: &RepoSlug,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Commit>, ApiError> {
        let key = slug.to_string();
        self.core.stage_call(&key, FetchStage::Commits, false).await?;
        Ok(self.snapshot(&key)?.commits.clone())
    }

    async fn fetch_pull_requests(
        &self,
        slug: &RepoSlug,
        _cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let key = slug.to_string();
        self.core
            .stage_call(&key, FetchStage::PullRequests, false)
            .await?;
        Ok(self
            .snapshot(&key)?
            .pull_requests
            .iter()
            .map(|pr| PullRequest {
                reviews: Vec::new(),
                ..pr.clone()
            })
            .collect())
    }

    async fn fetch_pr_reviews(
        &self,
        slug: &RepoSlug,
        number: i64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CodeReview>, ApiError> {
        let key = slug.to_string();
        self.core
            .stage_call(&key, FetchStage::PullRequests, true)
            .await?;
        Ok(self
            .snapshot(&key)?
            .pull_requests
            .iter()
            .find(|pr| pr.number == number)
            .map(|pr| pr.reviews.clone())
            .unwrap_or_default())
    }

    async fn fetch_issues(
        &self,
        slug: &RepoSlug,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Issue>, ApiError> {
        let key = slug.to_string();
        self.core.stage_call(&key, FetchStage::Issues, false).await?;
        Ok(self
            .snapshot(&key)?
            .issues
            .iter()
            .map(|issue| Issue {
                comments: Vec::new(),
                ..issue.clone()
            })
            .collect())
    }

    async fn fetch_issue_comments(
        &self,
        slug: &RepoSlug,
        number: i64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Comment>, ApiError> {
        let key = slug.to_string();
        self.core.stage_call(&key, FetchStage::Issues, true).await?;
        Ok(self
            .snapshot(&key)?
            .issues
            .iter()
            .find(|issue| issue.number == number)
            .map(|issue| issue.comments.clone())
            .unwrap_or_default())
    }
}

// ============================================================================
// Mock tracker API
// ============================================================================

#[derive(Default)]
pub struct MockTrackerApi {
    snapshots: HashMap<String, ProjectSnapshot>,
    core: MockCore,
}

impl MockTrackerApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this snapshot for the given project slug.
    pub fn with_snapshot(mut self, slug: &str, snapshot: ProjectSnapshot) -> Self {
        self.snapshots.insert(slug.to_string(), snapshot);
        self
    }

    pub fn with_failure(self, slug: &str, stage: FetchStage, error: ApiError) -> Self {
        self.core
            .failures
            .lock()
            .unwrap()
            .insert((slug.to_string(), stage), error);
        self
    }

    pub fn fail_nested_only(mut self, value: bool) -> Self {
        self.core.fail_nested_only = value;
        self
    }

    fn by_slug(&self, slug: &str) -> Result<&ProjectSnapshot, ApiError> {
        self.snapshots.get(slug).ok_or_else(|| ApiError::Fatal {
            status: 404,
            message: format!("unknown project {}", slug),
        })
    }

    fn by_project_id(&self, project_id: i64) -> Result<(&String, &ProjectSnapshot), ApiError> {
        self.snapshots
            .iter()
            .find(|(_, s)| s.project.id == project_id)
            .ok_or_else(|| ApiError::Fatal {
                status: 404,
                message: format!("unknown project id {}", project_id),
            })
    }
}

#[async_trait]
impl TrackerApi for MockTrackerApi {
    async fn fetch_project(
        &self,
        slug: &str,
        _cancel: &CancellationToken,
    ) -> Result<Project, ApiError> {
        self.core.stage_call(slug, FetchStage::Metadata, false).await?;
        Ok(self.by_slug(slug)?.project.clone())
    }

    async fn fetch_members(
        &self,
        project_id: i64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Member>, ApiError> {
        let (key, snapshot) = self.by_project_id(project_id)?;
        self.core
            .stage_call(&key.clone(), FetchStage::Members, false)
            .await?;
        Ok(snapshot.members.clone())
    }

    async fn fetch_sprints(
        &self,
        project_id: i64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Sprint>, ApiError> {
        let (key, snapshot) = self.by_project_id(project_id)?;
        self.core
            .stage_call(&key.clone(), FetchStage::Sprints, false)
            .await?;
        Ok(snapshot.sprints.clone())
    }

    async fn fetch_user_stories(
        &self,
        project_id: i64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<UserStory>, ApiError> {
        let (key, snapshot) = self.by_project_id(project_id)?;
        self.core
            .stage_call(&key.clone(), FetchStage::UserStories, false)
            .await?;
        Ok(snapshot.user_stories.clone())
    }

    async fn fetch_tasks(
        &self,
        project_id: i64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<TaskRecord>, ApiError> {
        let (key, snapshot) = self.by_project_id(project_id)?;
        self.core
            .stage_call(&key.clone(), FetchStage::Tasks, false)
            .await?;
        Ok(snapshot
            .tasks
            .iter()
            .map(|task| TaskRecord {
                history: Vec::new(),
                ..task.clone()
            })
            .collect())
    }

    async fn fetch_task_history(
        &self,
        task_id: i64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<TaskHistoryEntry>, ApiError> {
        let found = self.snapshots.iter().find_map(|(key, snapshot)| {
            snapshot
                .tasks
                .iter()
                .find(|t| t.id == task_id)
                .map(|task| (key.clone(), task.history.clone()))
        });

        match found {
            Some((key, history)) => {
                self.core.stage_call(&key, FetchStage::Tasks, true).await?;
                Ok(history)
            }
            None => Ok(Vec::new()),
        }
    }
}
