//! Tracker API port trait

use async_trait::async_trait;

use crate::cancel::CancellationToken;
use crate::domain::entities::{Member, Project, Sprint, TaskHistoryEntry, TaskRecord, UserStory};
use crate::error::ApiError;

#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// Resolve a project slug to its metadata.
    async fn fetch_project(
        &self,
        slug: &str,
        cancel: &CancellationToken,
    ) -> Result<Project, ApiError>;

    async fn fetch_members(
        &self,
        project_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Member>, ApiError>;

    async fn fetch_sprints(
        &self,
        project_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Sprint>, ApiError>;

    async fn fetch_user_stories(
        &self,
        project_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<UserStory>, ApiError>;

    /// Fetch tasks without their history; the pipeline nests history per
    /// task via [`TrackerApi::fetch_task_history`].
    async fn fetch_tasks(
        &self,
        project_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskRecord>, ApiError>;

    async fn fetch_task_history(
        &self,
        task_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskHistoryEntry>, ApiError>;
}
