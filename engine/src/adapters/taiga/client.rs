//! Taiga API client implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::cancel::CancellationToken;
use crate::client::{ApiRequest, RateLimitedClient, ReqwestTransport};
use crate::config::ClientConfig;
use crate::domain::entities::{Member, Project, Sprint, TaskHistoryEntry, TaskRecord, UserStory};
use crate::domain::ports::TrackerApi;
use crate::error::ApiError;

/// Implementation of the tracker port against the Taiga REST API.
pub struct TaigaClient {
    client: RateLimitedClient<ReqwestTransport>,
}

impl TaigaClient {
    /// `base_url` is the instance root (e.g. `https://tree.taiga.io`); the
    /// `/api/v1` prefix is appended here.
    pub fn new(base_url: &str, token: &str, config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let api_base = format!("{}/api/v1", base_url.trim_end_matches('/'));
        let transport = ReqwestTransport::new(http, api_base)
            .with_header("Authorization", format!("Bearer {}", token))
            // Listings are small enough per project to take whole.
            .with_header("x-disable-pagination", "True");

        Ok(Self {
            client: RateLimitedClient::new(transport, config.retry.clone(), config.quota.clone()),
        })
    }
}

// Response types from the Taiga API.

#[derive(Deserialize)]
struct ProjectResponse {
    id: i64,
    slug: String,
    name: String,
    description: Option<String>,
}

impl From<ProjectResponse> for Project {
    fn from(r: ProjectResponse) -> Self {
        Project {
            id: r.id,
            slug: r.slug,
            name: r.name,
            description: r.description.filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct MemberResponse {
    id: i64,
    username: String,
    full_name: Option<String>,
}

impl From<MemberResponse> for Member {
    fn from(r: MemberResponse) -> Self {
        Member {
            id: r.id,
            username: r.username,
            full_name: r.full_name.filter(|n| !n.is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct MilestoneResponse {
    id: i64,
    name: String,
    estimated_start: Option<NaiveDate>,
    estimated_finish: Option<NaiveDate>,
    #[serde(default)]
    closed: bool,
}

impl From<MilestoneResponse> for Sprint {
    fn from(r: MilestoneResponse) -> Self {
        Sprint {
            id: r.id,
            name: r.name,
            estimated_start: r.estimated_start,
            estimated_finish: r.estimated_finish,
            closed: r.closed,
        }
    }
}

#[derive(Deserialize, Default)]
struct StatusInfoResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_closed: bool,
}

#[derive(Deserialize)]
struct UserStoryResponse {
    id: i64,
    #[serde(rename = "ref")]
    reference: i64,
    subject: String,
    milestone: Option<i64>,
    status_extra_info: Option<StatusInfoResponse>,
    total_points: Option<f64>,
}

impl From<UserStoryResponse> for UserStory {
    fn from(r: UserStoryResponse) -> Self {
        let status = r.status_extra_info.unwrap_or_default();
        UserStory {
            id: r.id,
            reference: r.reference,
            subject: r.subject,
            sprint_id: r.milestone,
            status: status.name,
            is_closed: status.is_closed,
            points: r.total_points,
        }
    }
}

#[derive(Deserialize)]
struct TaskResponse {
    id: i64,
    #[serde(rename = "ref")]
    reference: i64,
    subject: String,
    user_story: Option<i64>,
    milestone: Option<i64>,
    status_extra_info: Option<StatusInfoResponse>,
    assigned_to: Option<i64>,
    total_points: Option<f64>,
    finished_date: Option<DateTime<Utc>>,
}

impl From<TaskResponse> for TaskRecord {
    fn from(r: TaskResponse) -> Self {
        let status = r.status_extra_info.unwrap_or_default();
        TaskRecord {
            id: r.id,
            reference: r.reference,
            subject: r.subject,
            user_story_id: r.user_story,
            sprint_id: r.milestone,
            status: status.name,
            is_closed: status.is_closed,
            assigned_to: r.assigned_to,
            points: r.total_points,
            finished_date: r.finished_date,
            history: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct HistoryResponse {
    created_at: DateTime<Utc>,
    /// Map of changed field to a `[from, to]` pair.
    values_diff: Option<serde_json::Map<String, serde_json::Value>>,
}

fn diff_side(value: &serde_json::Value, index: usize) -> Option<String> {
    let side = value.as_array()?.get(index)?;
    match side {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl HistoryResponse {
    fn into_entries(self) -> Vec<TaskHistoryEntry> {
        let changed_at = self.created_at;
        self.values_diff
            .unwrap_or_default()
            .into_iter()
            .map(|(field, change)| TaskHistoryEntry {
                changed_at,
                from_value: diff_side(&change, 0),
                to_value: diff_side(&change, 1),
                field,
            })
            .collect()
    }
}

#[async_trait]
impl TrackerApi for TaigaClient {
    async fn fetch_project(
        &self,
        slug: &str,
        cancel: &CancellationToken,
    ) -> Result<Project, ApiError> {
        let request = ApiRequest::get("/projects/by_slug").query("slug", slug);
        let project: ProjectResponse = self.client.call(&request, cancel).await?;
        Ok(project.into())
    }

    async fn fetch_members(
        &self,
        project_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Member>, ApiError> {
        let request = ApiRequest::get("/users").query("project", project_id);
        let members: Vec<MemberResponse> = self.client.call(&request, cancel).await?;
        Ok(members.into_iter().map(Into::into).collect())
    }

    async fn fetch_sprints(
        &self,
        project_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Sprint>, ApiError> {
        let request = ApiRequest::get("/milestones").query("project", project_id);
        let sprints: Vec<MilestoneResponse> = self.client.call(&request, cancel).await?;
        Ok(sprints.into_iter().map(Into::into).collect())
    }

    async fn fetch_user_stories(
        &self,
        project_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<UserStory>, ApiError> {
        let request = ApiRequest::get("/userstories").query("project", project_id);
        let stories: Vec<UserStoryResponse> = self.client.call(&request, cancel).await?;
        Ok(stories.into_iter().map(Into::into).collect())
    }

    async fn fetch_tasks(
        &self,
        project_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskRecord>, ApiError> {
        let request = ApiRequest::get("/tasks").query("project", project_id);
        let tasks: Vec<TaskResponse> = self.client.call(&request, cancel).await?;
        Ok(tasks.into_iter().map(Into::into).collect())
    }

    async fn fetch_task_history(
        &self,
        task_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskHistoryEntry>, ApiError> {
        let request = ApiRequest::get(format!("/history/task/{}", task_id));
        let entries: Vec<HistoryResponse> = self.client.call(&request, cancel).await?;
        Ok(entries
            .into_iter()
            .flat_map(HistoryResponse::into_entries)
            .collect())
    }
}
