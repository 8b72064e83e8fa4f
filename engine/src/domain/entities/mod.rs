//! Domain entities
//!
//! Pure domain models for the two fetched graphs: a code-host repository
//! (commits, branches, pull requests, issues, people) and a tracker project
//! (members, sprints, user stories, tasks). Snapshots are immutable once a
//! fetch job completes.

pub mod code_host;
pub mod snapshot;
pub mod source;
pub mod tracker;

pub use code_host::{
    Branch, CodeReview, Collaborator, Comment, Commit, Issue, IssueState, PrState, PullRequest,
    Repository,
};
pub use snapshot::{EntitySnapshot, ProjectSnapshot, RepoSnapshot};
pub use source::{FetchStage, JobStatus, RepoSlug, SourceId, SourceKind};
pub use tracker::{Member, Project, Sprint, TaskHistoryEntry, TaskRecord, UserStory};
