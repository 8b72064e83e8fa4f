//! Code-host API port trait
//!
//! One method per sub-fetch of the repository pipeline. Implementations
//! classify and retry their own calls; the orchestrator only sees the
//! final outcome of each sub-fetch.

use async_trait::async_trait;

use crate::cancel::CancellationToken;
use crate::domain::entities::{
    Branch, CodeReview, Collaborator, Comment, Commit, Issue, PullRequest, RepoSlug, Repository,
};
use crate::error::ApiError;

#[async_trait]
pub trait CodeHostApi: Send + Sync {
    /// Fetch repository metadata.
    async fn fetch_repository(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Repository, ApiError>;

    /// Fetch collaborators. Implementations fall back to the public
    /// contributors listing when collaborator access is forbidden.
    async fn fetch_collaborators(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<Collaborator>, ApiError>;

    async fn fetch_branches(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<Branch>, ApiError>;

    async fn fetch_commits(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<Commit>, ApiError>;

    /// Fetch pull requests without their reviews; the pipeline nests
    /// reviews per PR via [`CodeHostApi::fetch_pr_reviews`].
    async fn fetch_pull_requests(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>, ApiError>;

    async fn fetch_pr_reviews(
        &self,
        slug: &RepoSlug,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<CodeReview>, ApiError>;

    /// Fetch issues (excluding pull requests) without their comments.
    async fn fetch_issues(
        &self,
        slug: &RepoSlug,
        cancel: &CancellationToken,
    ) -> Result<Vec<Issue>, ApiError>;

    async fn fetch_issue_comments(
        &self,
        slug: &RepoSlug,
        number: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>, ApiError>;
}
