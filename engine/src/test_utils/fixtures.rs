//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults. Each
//! fixture creates a valid entity that tests customize in place.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::entities::{
    Branch, CodeReview, Collaborator, Comment, Commit, Issue, IssueState, Member, PrState,
    Project, ProjectSnapshot, PullRequest, RepoSnapshot, Repository, Sprint, TaskHistoryEntry,
    TaskRecord, UserStory,
};

pub fn ts(value: &str) -> DateTime<Utc> {
    value.parse().expect("invalid test timestamp")
}

pub fn day(value: &str) -> NaiveDate {
    value.parse().expect("invalid test date")
}

pub fn test_repository() -> Repository {
    Repository {
        full_name: "octo/repo".to_string(),
        description: Some("Test repository".to_string()),
        default_branch: "main".to_string(),
        is_private: false,
    }
}

pub fn test_collaborator(id: i64, username: &str) -> Collaborator {
    Collaborator {
        id,
        username: username.to_string(),
        avatar_url: None,
        profile_url: None,
        name: None,
        email: Some(format!("{}@example.com", username)),
    }
}

pub fn test_commit(author: &str, authored_at: &str) -> Commit {
    commit_with_stats(author, authored_at, 10, 2)
}

pub fn commit_with_stats(
    author: &str,
    authored_at: &str,
    additions: i64,
    deletions: i64,
) -> Commit {
    let at = ts(authored_at);
    Commit {
        sha: format!("sha-{}-{}", author, at.timestamp()),
        message: format!("change by {}", author),
        author_name: author.to_string(),
        author_email: Some(format!("{}@example.com", author)),
        authored_at: at,
        committed_at: Some(at),
        additions,
        deletions,
        files_changed: 1,
    }
}

pub fn open_pr(number: i64, creator: &str, created_at: &str) -> PullRequest {
    PullRequest {
        id: number,
        number,
        title: format!("PR #{}", number),
        state: PrState::Open,
        creator: creator.to_string(),
        head_ref: format!("feature/{}", number),
        base_ref: "main".to_string(),
        additions: 20,
        deletions: 5,
        created_at: ts(created_at),
        merged_at: None,
        closed_at: None,
        reviews: Vec::new(),
    }
}

pub fn merged_pr(number: i64, creator: &str, created_at: &str, merged_at: &str) -> PullRequest {
    let mut pr = open_pr(number, creator, created_at);
    pr.state = PrState::Merged;
    pr.merged_at = Some(ts(merged_at));
    pr.closed_at = Some(ts(merged_at));
    pr
}

pub fn closed_pr(number: i64, creator: &str, created_at: &str, closed_at: &str) -> PullRequest {
    let mut pr = open_pr(number, creator, created_at);
    pr.state = PrState::Closed;
    pr.closed_at = Some(ts(closed_at));
    pr
}

pub fn test_review(id: i64, reviewer: &str, submitted_at: &str) -> CodeReview {
    CodeReview {
        id,
        reviewer: reviewer.to_string(),
        state: "APPROVED".to_string(),
        submitted_at: Some(ts(submitted_at)),
    }
}

pub fn test_issue(number: i64, creator: &str, created_at: &str) -> Issue {
    Issue {
        id: number,
        number,
        title: format!("Issue #{}", number),
        state: IssueState::Open,
        creator: creator.to_string(),
        labels: Vec::new(),
        created_at: ts(created_at),
        closed_at: None,
        comments: Vec::new(),
    }
}

pub fn test_comment(id: i64, author: &str, created_at: &str) -> Comment {
    Comment {
        id,
        author: author.to_string(),
        body: "Looks good to me".to_string(),
        created_at: ts(created_at),
    }
}

/// A small but fully-populated repository graph: two collaborators, commits
/// on two days, a reviewed merged PR, an open PR, and a commented issue.
pub fn test_repo_snapshot() -> RepoSnapshot {
    let mut merged = merged_pr(1, "alice", "2024-03-01T10:00:00Z", "2024-03-03T09:00:00Z");
    merged.reviews = vec![test_review(11, "bob", "2024-03-02T15:00:00Z")];

    let mut issue = test_issue(1, "bob", "2024-03-01T12:00:00Z");
    issue.comments = vec![test_comment(21, "alice", "2024-03-02T08:00:00Z")];

    RepoSnapshot {
        repository: test_repository(),
        collaborators: vec![test_collaborator(1, "alice"), test_collaborator(2, "bob")],
        branches: vec![Branch {
            name: "main".to_string(),
            sha: "abc123".to_string(),
            is_protected: true,
            is_default: false,
        }],
        commits: vec![
            test_commit("alice", "2024-03-01T10:00:00Z"),
            test_commit("bob", "2024-03-02T11:00:00Z"),
        ],
        pull_requests: vec![merged, open_pr(2, "bob", "2024-03-02T10:00:00Z")],
        issues: vec![issue],
    }
}

pub fn test_project() -> Project {
    Project {
        id: 900,
        slug: "team-alpha".to_string(),
        name: "Team Alpha".to_string(),
        description: None,
    }
}

pub fn test_member(id: i64, username: &str) -> Member {
    Member {
        id,
        username: username.to_string(),
        full_name: None,
    }
}

pub fn test_sprint(id: i64, name: &str, start: &str, finish: &str) -> Sprint {
    Sprint {
        id,
        name: name.to_string(),
        estimated_start: Some(day(start)),
        estimated_finish: Some(day(finish)),
        closed: false,
    }
}

pub fn test_story(id: i64, reference: i64, sprint_id: Option<i64>, points: Option<f64>) -> UserStory {
    UserStory {
        id,
        reference,
        subject: format!("Story #{}", reference),
        sprint_id,
        status: "In progress".to_string(),
        is_closed: false,
        points,
    }
}

pub fn test_task(
    id: i64,
    reference: i64,
    sprint_id: Option<i64>,
    assigned_to: Option<i64>,
    points: Option<f64>,
    finished: Option<&str>,
) -> TaskRecord {
    TaskRecord {
        id,
        reference,
        subject: format!("Task #{}", reference),
        user_story_id: None,
        sprint_id,
        status: if finished.is_some() {
            "Done".to_string()
        } else {
            "In progress".to_string()
        },
        is_closed: finished.is_some(),
        assigned_to,
        points,
        finished_date: finished.map(ts),
        history: vec![TaskHistoryEntry {
            changed_at: ts("2024-02-05T09:00:00Z"),
            field: "status".to_string(),
            from_value: Some("New".to_string()),
            to_value: Some("In progress".to_string()),
        }],
    }
}

/// A small but fully-populated project graph: two members, one sprint, one
/// story, a finished and an unfinished task.
pub fn test_project_snapshot() -> ProjectSnapshot {
    ProjectSnapshot {
        project: test_project(),
        members: vec![test_member(1, "alice"), test_member(2, "bob")],
        sprints: vec![test_sprint(55, "Sprint 1", "2024-02-05", "2024-02-19")],
        user_stories: vec![test_story(10, 1, Some(55), Some(5.0))],
        tasks: vec![
            test_task(100, 1, Some(55), Some(1), Some(3.0), Some("2024-02-10T12:00:00Z")),
            test_task(101, 2, Some(55), Some(2), Some(2.0), None),
        ],
    }
}
