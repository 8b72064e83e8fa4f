//! Analytics over completed snapshots
//!
//! Pure, deterministic functions: no network, no storage, no failure mode.
//! Missing or partially-fetched nested data (a PR without reviews, a task
//! without points) contributes zero instead of erroring.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Commit, ProjectSnapshot, PrState, PullRequest, RepoSnapshot, TaskRecord};

/// Bucketing granularity for frequency series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
}

/// Per-author commit totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorStats {
    pub author: String,
    pub commits: usize,
    pub additions: i64,
    pub deletions: i64,
}

/// One bucket of the commit frequency series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyPoint {
    /// Bucket start: the day itself, or the Monday of the ISO week.
    pub bucket: NaiveDate,
    pub commits: usize,
    pub additions: i64,
    pub deletions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitStats {
    /// Sorted by commit count, most active first.
    pub by_author: Vec<AuthorStats>,
    /// Chronological frequency series.
    pub frequency: Vec<FrequencyPoint>,
}

/// Group commits by author and bucket them into a frequency series.
pub fn commit_stats(commits: &[Commit], granularity: Granularity) -> CommitStats {
    let mut authors: BTreeMap<String, AuthorStats> = BTreeMap::new();
    let mut buckets: BTreeMap<NaiveDate, FrequencyPoint> = BTreeMap::new();

    for commit in commits {
        let author = authors
            .entry(commit.author_name.clone())
            .or_insert_with(|| AuthorStats {
                author: commit.author_name.clone(),
                commits: 0,
                additions: 0,
                deletions: 0,
            });
        author.commits += 1;
        author.additions += commit.additions;
        author.deletions += commit.deletions;

        let bucket = bucket_of(commit.authored_at.date_naive(), granularity);
        let point = buckets.entry(bucket).or_insert_with(|| FrequencyPoint {
            bucket,
            commits: 0,
            additions: 0,
            deletions: 0,
        });
        point.commits += 1;
        point.additions += commit.additions;
        point.deletions += commit.deletions;
    }

    let mut by_author: Vec<AuthorStats> = authors.into_values().collect();
    by_author.sort_by(|a, b| {
        b.commits
            .cmp(&a.commits)
            .then_with(|| a.author.cmp(&b.author))
    });

    CommitStats {
        by_author,
        frequency: buckets.into_values().collect(),
    }
}

fn bucket_of(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
    }
}

/// Lifecycle distribution for merged pull requests, in hours from creation
/// to merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleStats {
    pub min_hours: f64,
    pub median_hours: f64,
    pub max_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrStats {
    pub open: usize,
    pub merged: usize,
    /// Closed without being merged.
    pub closed: usize,
    /// merged / (merged + closed), as a percentage; 0 when nothing has
    /// been decided yet. Open PRs do not count against the rate.
    pub merge_rate: f64,
    /// `None` when no PR has both a creation and a merge timestamp.
    pub lifecycle: Option<LifecycleStats>,
}

/// Partition pull requests by state and compute merge rate and lifecycle.
pub fn pr_stats(prs: &[PullRequest]) -> PrStats {
    let (mut open, mut merged, mut closed) = (0, 0, 0);
    for pr in prs {
        match pr.state {
            PrState::Open => open += 1,
            PrState::Merged => merged += 1,
            PrState::Closed => closed += 1,
        }
    }

    let decided = merged + closed;
    let merge_rate = if decided == 0 {
        0.0
    } else {
        merged as f64 * 100.0 / decided as f64
    };

    let mut durations: Vec<i64> = prs
        .iter()
        .filter_map(|pr| {
            let merged_at = pr.merged_at?;
            let secs = (merged_at - pr.created_at).num_seconds();
            (secs >= 0).then_some(secs)
        })
        .collect();
    durations.sort_unstable();

    let lifecycle = match (durations.first(), durations.last()) {
        (Some(&min), Some(&max)) => Some(LifecycleStats {
            min_hours: hours(min as f64),
            median_hours: hours(median_of(&durations)),
            max_hours: hours(max as f64),
        }),
        _ => None,
    };

    PrStats {
        open,
        merged,
        closed,
        merge_rate,
        lifecycle,
    }
}

fn hours(secs: f64) -> f64 {
    secs / 3600.0
}

/// Median of a sorted, non-empty slice; an even count averages the two
/// middle values.
fn median_of(sorted: &[i64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    }
}

/// Relative weight of each contribution category.
#[derive(Debug, Clone)]
pub struct ContributionWeights {
    pub commits: f64,
    pub pull_requests: f64,
    pub reviews: f64,
    pub comments: f64,
}

impl Default for ContributionWeights {
    fn default() -> Self {
        Self {
            commits: 1.0,
            pull_requests: 1.0,
            reviews: 1.0,
            comments: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContributorShare {
    pub username: String,
    pub commits: usize,
    pub pull_requests: usize,
    pub reviews: usize,
    pub comments: usize,
    /// Weighted activity count across all categories.
    pub weighted: f64,
    /// Share of the total weighted activity, in percent. Sums to 100
    /// across all included contributors when any activity exists.
    pub percentage: f64,
}

/// Weighted contribution breakdown per person, excluding `excluded`
/// accounts (bots, service users) from both the counts and the total.
pub fn contribution_breakdown(
    snapshot: &RepoSnapshot,
    weights: &ContributionWeights,
    excluded: &[String],
) -> Vec<ContributorShare> {
    let is_excluded =
        |name: &str| excluded.iter().any(|e| e.eq_ignore_ascii_case(name));

    fn entry<'a>(
        shares: &'a mut BTreeMap<String, ContributorShare>,
        name: &str,
    ) -> &'a mut ContributorShare {
        shares
            .entry(name.to_string())
            .or_insert_with(|| ContributorShare {
                username: name.to_string(),
                ..ContributorShare::default()
            })
    }

    let mut shares: BTreeMap<String, ContributorShare> = BTreeMap::new();

    for commit in &snapshot.commits {
        if !is_excluded(&commit.author_name) {
            entry(&mut shares, &commit.author_name).commits += 1;
        }
    }
    for pr in &snapshot.pull_requests {
        if !pr.creator.is_empty() && !is_excluded(&pr.creator) {
            entry(&mut shares, &pr.creator).pull_requests += 1;
        }
        for review in &pr.reviews {
            if !is_excluded(&review.reviewer) {
                entry(&mut shares, &review.reviewer).reviews += 1;
            }
        }
    }
    for issue in &snapshot.issues {
        for comment in &issue.comments {
            if !is_excluded(&comment.author) {
                entry(&mut shares, &comment.author).comments += 1;
            }
        }
    }

    let mut shares: Vec<ContributorShare> = shares.into_values().collect();
    for share in &mut shares {
        share.weighted = share.commits as f64 * weights.commits
            + share.pull_requests as f64 * weights.pull_requests
            + share.reviews as f64 * weights.reviews
            + share.comments as f64 * weights.comments;
    }

    let total: f64 = shares.iter().map(|s| s.weighted).sum();
    if total > 0.0 {
        for share in &mut shares {
            share.percentage = share.weighted * 100.0 / total;
        }
    }

    shares.sort_by(|a, b| {
        b.weighted
            .total_cmp(&a.weighted)
            .then_with(|| a.username.cmp(&b.username))
    });
    shares
}

/// A period of inactivity longer than the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityGap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_days: f64,
}

/// Detect gaps longer than `threshold_days` between consecutive activity
/// timestamps. Zero or one timestamps yield no gaps.
pub fn activity_gaps(timestamps: &[DateTime<Utc>], threshold_days: i64) -> Vec<ActivityGap> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    let threshold = Duration::days(threshold_days.max(0));

    sorted
        .windows(2)
        .filter_map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            let span = end - start;
            (span > threshold).then(|| ActivityGap {
                start,
                end,
                duration_days: span.num_seconds() as f64 / 86_400.0,
            })
        })
        .collect()
}

/// Merge all activity timestamps of a repository into one sorted timeline:
/// commit authorship, PR creation/merge/close, review submission, and
/// comment creation. Feed this to [`activity_gaps`] to detect silences
/// across the combined streams rather than per stream.
pub fn activity_timeline(snapshot: &RepoSnapshot) -> Vec<DateTime<Utc>> {
    let mut timeline: Vec<DateTime<Utc>> = Vec::new();

    timeline.extend(snapshot.commits.iter().map(|c| c.authored_at));
    for pr in &snapshot.pull_requests {
        timeline.push(pr.created_at);
        timeline.extend(pr.merged_at);
        timeline.extend(pr.closed_at);
        timeline.extend(pr.reviews.iter().filter_map(|r| r.submitted_at));
    }
    for issue in &snapshot.issues {
        timeline.extend(issue.comments.iter().map(|c| c.created_at));
    }

    timeline.sort_unstable();
    timeline
}

/// One day of a sprint burndown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurndownPoint {
    pub date: NaiveDate,
    pub completed_points: f64,
    pub remaining_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintVelocity {
    pub sprint_id: i64,
    pub name: String,
    /// Points of every task scheduled into the sprint.
    pub total_points: f64,
    /// Points of tasks finished inside the sprint window.
    pub completed_points: f64,
    /// One point per calendar day from start to finish, inclusive. Empty
    /// when the sprint has no usable window.
    pub burndown: Vec<BurndownPoint>,
}

/// Velocity and burndown per sprint. Tasks finished outside the sprint
/// window count toward the sprint's total but never its burndown.
pub fn sprint_velocity(snapshot: &ProjectSnapshot) -> Vec<SprintVelocity> {
    snapshot
        .sprints
        .iter()
        .map(|sprint| {
            let tasks: Vec<&TaskRecord> = snapshot
                .tasks
                .iter()
                .filter(|t| t.sprint_id == Some(sprint.id))
                .collect();
            let total_points: f64 = tasks.iter().map(|t| t.points.unwrap_or(0.0)).sum();

            let window = match (sprint.estimated_start, sprint.estimated_finish) {
                (Some(start), Some(finish)) if start <= finish => Some((start, finish)),
                _ => None,
            };

            let finished_in_window = |task: &TaskRecord| -> Option<NaiveDate> {
                let (start, finish) = window?;
                let finished = task.finished_date?.date_naive();
                (finished >= start && finished <= finish).then_some(finished)
            };

            let completed_points: f64 = tasks
                .iter()
                .filter(|t| finished_in_window(t).is_some())
                .map(|t| t.points.unwrap_or(0.0))
                .sum();

            let mut burndown = Vec::new();
            if let Some((start, finish)) = window {
                let mut day = start;
                loop {
                    let completed_so_far: f64 = tasks
                        .iter()
                        .filter(|t| matches!(finished_in_window(t), Some(d) if d <= day))
                        .map(|t| t.points.unwrap_or(0.0))
                        .sum();
                    burndown.push(BurndownPoint {
                        date: day,
                        completed_points: completed_so_far,
                        remaining_points: total_points - completed_so_far,
                    });
                    match day.succ_opt() {
                        Some(next) if next <= finish => day = next,
                        _ => break,
                    }
                }
            }

            SprintVelocity {
                sprint_id: sprint.id,
                name: sprint.name.clone(),
                total_points,
                completed_points,
                burndown,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberWorkload {
    pub member_id: i64,
    pub username: String,
    pub total_tasks: usize,
    pub closed_tasks: usize,
    pub total_points: f64,
}

/// Per-member task totals across the whole project, regardless of sprint
/// windows.
pub fn member_workload(snapshot: &ProjectSnapshot) -> Vec<MemberWorkload> {
    snapshot
        .members
        .iter()
        .map(|member| {
            let (mut total, mut closed, mut points) = (0, 0, 0.0);
            for task in snapshot
                .tasks
                .iter()
                .filter(|t| t.assigned_to == Some(member.id))
            {
                total += 1;
                if task.is_closed || task.finished_date.is_some() {
                    closed += 1;
                }
                points += task.points.unwrap_or(0.0);
            }
            MemberWorkload {
                member_id: member.id,
                username: member.username.clone(),
                total_tasks: total,
                closed_tasks: closed,
                total_points: points,
            }
        })
        .collect()
}
