//! GitHub REST API client implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use urlencoding::encode;

use crate::cancel::CancellationToken;
use crate::client::{ApiRequest, RateLimitedClient, ReqwestTransport};
use crate::config::ClientConfig;
use crate::domain::entities::{
    Branch, CodeReview, Collaborator, Comment, Commit, Issue, IssueState, PrState, PullRequest,
    RepoSlug, Repository,
};
use crate::domain::ports::CodeHostApi;
use crate::error::ApiError;

pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Implementation of the code-host port against the GitHub REST API.
pub struct GitHubClient {
    client: RateLimitedClient<ReqwestTransport>,
}

impl GitHubClient {
    pub fn new(token: &str, config: &ClientConfig) -> Result<Self, reqwest::Error> {
        Self::with_base_url(token, GITHUB_API_BASE, config)
    }

    /// Point the client at a different base URL (proxies, test servers).
    pub fn with_base_url(
        token: &str,
        base_url: &str,
        config: &ClientConfig,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let transport = ReqwestTransport::new(http, base_url)
            .with_header("Authorization", format!("Bearer {}", token))
            .with_header("Accept", "application/vnd.github.v3+json")
            .with_header("X-GitHub-Api-Version", "2022-11-28")
            .with_header("User-Agent", "devpulse-engine");

        Ok(Self {
            client: RateLimitedClient::new(transport, config.retry.clone(), config.quota.clone()),
        })
    }

    fn repo_path(slug: &RepoSlug, tail: &str) -> String {
        format!(
            "/repos/{}/{}{}",
            encode(&slug.owner),
            encode(&slug.name),
            tail
        )
    }
}

// Response types from the GitHub API.

#[derive(Deserialize)]
struct RepoResponse {
    full_name: String,
    description: Option<String>,
    default_branch: Option<String>,
    #[serde(default)]
    private: bool,
}

impl From<RepoResponse> for Repository {
    fn from(r: RepoResponse) -> Self {
        Repository {
            full_name: r.full_name,
            description: r.description,
            default_branch: r.default_branch.unwrap_or_else(|| "main".to_string()),
            is_private: r.private,
        }
    }
}

#[derive(Deserialize)]
struct UserResponse {
    id: i64,
    login: String,
    avatar_url: Option<String>,
    html_url: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

impl From<UserResponse> for Collaborator {
    fn from(r: UserResponse) -> Self {
        Collaborator {
            id: r.id,
            username: r.login,
            avatar_url: r.avatar_url,
            profile_url: r.html_url,
            name: r.name,
            email: r.email,
        }
    }
}

#[derive(Deserialize)]
struct BranchResponse {
    name: String,
    commit: BranchCommitResponse,
    #[serde(default)]
    protected: bool,
}

#[derive(Deserialize)]
struct BranchCommitResponse {
    sha: String,
}

impl From<BranchResponse> for Branch {
    fn from(r: BranchResponse) -> Self {
        Branch {
            name: r.name,
            sha: r.commit.sha,
            is_protected: r.protected,
            // Marked by the pipeline once repository metadata is known.
            is_default: false,
        }
    }
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetailResponse,
    stats: Option<CommitStatsResponse>,
    #[serde(default)]
    files: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct CommitDetailResponse {
    message: String,
    author: Option<CommitSignatureResponse>,
    committer: Option<CommitSignatureResponse>,
}

#[derive(Deserialize)]
struct CommitSignatureResponse {
    name: Option<String>,
    email: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
struct CommitStatsResponse {
    #[serde(default)]
    additions: i64,
    #[serde(default)]
    deletions: i64,
}

impl From<CommitResponse> for Commit {
    fn from(r: CommitResponse) -> Self {
        let author = r.commit.author;
        let committer = r.commit.committer;
        let stats = r.stats.unwrap_or_default();
        Commit {
            sha: r.sha,
            message: r.commit.message,
            author_name: author
                .as_ref()
                .and_then(|a| a.name.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            author_email: author.as_ref().and_then(|a| a.email.clone()),
            authored_at: author
                .as_ref()
                .and_then(|a| a.date)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            committed_at: committer.as_ref().and_then(|c| c.date),
            additions: stats.additions,
            deletions: stats.deletions,
            files_changed: r.files.map_or(0, |f| f.len() as i64),
        }
    }
}

#[derive(Deserialize)]
struct PrResponse {
    id: i64,
    number: i64,
    title: String,
    state: String,
    user: Option<PrUserResponse>,
    head: PrBranchResponse,
    base: PrBranchResponse,
    #[serde(default)]
    additions: i64,
    #[serde(default)]
    deletions: i64,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct PrUserResponse {
    login: String,
}

#[derive(Deserialize)]
struct PrBranchResponse {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<PrResponse> for PullRequest {
    fn from(r: PrResponse) -> Self {
        // Merged wins over the host's open/closed state.
        let state = if r.merged_at.is_some() {
            PrState::Merged
        } else if r.state == "open" {
            PrState::Open
        } else {
            PrState::Closed
        };
        PullRequest {
            id: r.id,
            number: r.number,
            title: r.title,
            state,
            creator: r.user.map(|u| u.login).unwrap_or_default(),
            head_ref: r.head.ref_name,
            base_ref: r.base.ref_name,
            additions: r.additions,
            deletions: r.deletions,
            created_at: r.created_at,
            merged_at: r.merged_at,
            closed_at: r.closed_at,
            reviews: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct ReviewResponse {
    id: i64,
    user: Option<PrUserResponse>,
    state: String,
    submitted_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct IssueResponse {
    id: i64,
    number: i64,
    title: String,
    state: String,
    user: Option<PrUserResponse>,
    #[serde(default)]
    labels: Vec<LabelResponse>,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    /// Present when the "issue" is actually a pull request.
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct LabelResponse {
    name: String,
}

impl From<IssueResponse> for Issue {
    fn from(r: IssueResponse) -> Self {
        let state = if r.state == "closed" {
            IssueState::Closed
        } else {
            IssueState::Open
        };
        Issue {
            id: r.id,
            number: r.number,
            title: r.title,
            state,
            creator: r.user.map(|u| u.login).unwrap_or_default(),
            labels: r.labels.into_iter().map(|l| l.name).collect(),
            created_at: r.created_at,
            closed_at: r.closed_at,
            comments: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct CommentResponse {
    id: i64,
    user: Option<PrUserResponse>,
    body: Option<String>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl CodeHostApi for GitHubClient {
    async fn fetch_repository(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Repository, ApiError> {
        let request = ApiRequest::get(Self::repo_path(slug, ""));
        let repo: RepoResponse = self.client.call(&request, cancel).await?;
        Ok(repo.into())
    }

    async fn fetch_collaborators(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<Collaborator>, ApiError> {
        // Collaborators need push access on the repo; the public
        // contributors listing is the documented fallback.
        let primary = ApiRequest::get(Self::repo_path(slug, "/collaborators"));
        let fallback = ApiRequest::get(Self::repo_path(slug, "/contributors"));
        let users: Vec<UserResponse> = self
            .client
            .call_paginated_with_fallback(&primary, &fallback, cancel)
            .await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    async fn fetch_branches(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<Branch>, ApiError> {
        let request = ApiRequest::get(Self::repo_path(slug, "/branches"));
        let branches: Vec<BranchResponse> = self.client.call_paginated(&request, cancel).await?;
        Ok(branches.into_iter().map(Into::into).collect())
    }

    async fn fetch_commits(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<Commit>, ApiError> {
        let request = ApiRequest::get(Self::repo_path(slug, "/commits"));
        let commits: Vec<CommitResponse> = self.client.call_paginated(&request, cancel).await?;
        Ok(commits.into_iter().map(Into::into).collect())
    }

    async fn fetch_pull_requests(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let request = ApiRequest::get(Self::repo_path(slug, "/pulls"))
            .query("state", "all")
            .query("sort", "created")
            .query("direction", "desc");
        let prs: Vec<PrResponse> = self.client.call_paginated(&request, cancel).await?;
        Ok(prs.into_iter().map(Into::into).collect())
    }

    async fn fetch_pr_reviews(
        &self,
        slug: &RepoSlug,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<CodeReview>, ApiError> {
        let request = ApiRequest::get(Self::repo_path(slug, &format!("/pulls/{}/reviews", number)));
        let reviews: Vec<ReviewResponse> = self.client.call_paginated(&request, cancel).await?;
        // Reviews from deleted accounts come back without a user.
        Ok(reviews
            .into_iter()
            .filter_map(|r| {
                let user = r.user?;
                Some(CodeReview {
                    id: r.id,
                    reviewer: user.login,
                    state: r.state,
                    submitted_at: r.submitted_at,
                })
            })
            .collect())
    }

    async fn fetch_issues(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<Issue>, ApiError> {
        let request = ApiRequest::get(Self::repo_path(slug, "/issues"))
            .query("state", "all")
            .query("sort", "created")
            .query("direction", "desc");
        let issues: Vec<IssueResponse> = self.client.call_paginated(&request, cancel).await?;
        // Pull requests appear in the issues listing; keep real issues only.
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(Into::into)
            .collect())
    }

    async fn fetch_issue_comments(
        &self,
        slug: &RepoSlug,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>, ApiError> {
        let request =
            ApiRequest::get(Self::repo_path(slug, &format!("/issues/{}/comments", number)));
        let comments: Vec<CommentResponse> = self.client.call_paginated(&request, cancel).await?;
        Ok(comments
            .into_iter()
            .filter_map(|c| {
                let user = c.user?;
                Some(Comment {
                    id: c.id,
                    author: user.login,
                    body: c.body.unwrap_or_default(),
                    created_at: c.created_at,
                })
            })
            .collect())
    }
}
