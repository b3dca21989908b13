//! Reference resolution: turns a symbolic ref into the `base...head` range
//! whose diff represents "what changed".
//!
//! Three situations are covered:
//!
//! - a push to the default branch compares the last tag (or the very first
//!   commit when nothing has been tagged yet) with the default branch;
//! - a push to any other branch compares the default branch with it;
//! - a pull request merge ref (`<number>/merge`) is first replaced by the
//!   pull request's head SHA and then treated like a feature branch.

use std::fmt;

use tracing::info;

use crate::error::{FilterError, Result};
use crate::provider::{CommitWithDate, RepositoryProvider};

/// A `base...head` comparison range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRange {
    base: String,
    head: String,
}

impl DiffRange {
    /// Creates a range, rejecting empty endpoints.
    pub fn new(base: impl Into<String>, head: impl Into<String>) -> Result<Self> {
        let base = base.into();
        let head = head.into();
        if base.is_empty() || head.is_empty() {
            return Err(FilterError::InvalidReference(format!(
                "cannot compare '{base}' with '{head}': both ends must be non-empty"
            )));
        }
        Ok(Self { base, head })
    }

    /// The older end of the range.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The newer end of the range.
    pub fn head(&self) -> &str {
        &self.head
    }
}

impl fmt::Display for DiffRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...{}", self.base, self.head)
    }
}

/// A pull request merge ref such as `42/merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestRef {
    /// Pull request number.
    pub number: u64,
}

impl PullRequestRef {
    /// Recognises `<number>/merge` (optionally followed by one more
    /// segment). Anything else is an ordinary branch or tag name.
    pub fn parse(reference: &str) -> Option<Self> {
        let segments: Vec<&str> = reference.split('/').collect();
        if !(2..=3).contains(&segments.len()) || segments[1] != "merge" {
            return None;
        }
        segments[0].parse().ok().map(|number| Self { number })
    }
}

/// Facts about the repository that drive range selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFacts {
    /// The repository's default branch.
    pub default_branch: String,
    /// The most recent tag, if any.
    pub last_tag: Option<String>,
}

/// Returns the SHA of the commit with the earliest author date.
///
/// Commits without a date sort after dated ones. Returns an empty string
/// for an empty history; callers must not use that as a range endpoint.
pub fn first_commit(commits: &[CommitWithDate]) -> String {
    let mut sorted: Vec<&CommitWithDate> = commits.iter().collect();
    sorted.sort_by_key(|c| (c.date.is_none(), c.date));
    sorted
        .first()
        .map(|c| c.sha.clone())
        .unwrap_or_default()
}

/// Replaces a pull request merge ref with the pull request's head SHA.
pub async fn normalize_reference<P>(provider: &P, requested: &str) -> Result<String>
where
    P: RepositoryProvider + ?Sized,
{
    match PullRequestRef::parse(requested) {
        Some(pr) => {
            let sha = provider.pull_request_head(pr.number).await?;
            if sha.is_empty() {
                return Err(FilterError::InvalidReference(format!(
                    "pull request #{} has no head commit",
                    pr.number
                )));
            }
            Ok(sha)
        }
        None => Ok(requested.to_string()),
    }
}

/// Resolves `requested` into the range to diff.
///
/// The default branch and last tag are fetched concurrently; the commit
/// history is only fetched when the default branch has never been tagged.
pub async fn resolve_range<P>(provider: &P, requested: &str) -> Result<DiffRange>
where
    P: RepositoryProvider + ?Sized,
{
    if requested.trim().is_empty() {
        return Err(FilterError::InvalidReference("no reference given".to_string()));
    }

    let (default_branch, last_tag) =
        futures::try_join!(provider.default_branch(), provider.last_tag())?;
    let facts = RepositoryFacts {
        default_branch,
        last_tag,
    };
    let reference = normalize_reference(provider, requested).await?;

    info!(
        default_branch = %facts.default_branch,
        last_tag = facts.last_tag.as_deref().unwrap_or(""),
        reference = %reference,
        "Resolved repository facts"
    );

    let range = if reference == facts.default_branch && facts.last_tag.is_none() {
        let commits = provider.list_commits().await?;
        let first = first_commit(&commits);
        if first.is_empty() {
            return Err(FilterError::InvalidReference(format!(
                "'{}' has neither tags nor commits to compare against",
                facts.default_branch
            )));
        }
        select_range(&reference, &facts, &first)?
    } else {
        select_range(&reference, &facts, "")?
    };

    info!(diff = %range, "Selected comparison range");
    Ok(range)
}

/// Picks the range for an already-normalized reference.
///
/// `first_commit` is only consulted when `reference` is the default
/// branch and no tag exists.
pub fn select_range(
    reference: &str,
    facts: &RepositoryFacts,
    first_commit: &str,
) -> Result<DiffRange> {
    if reference == facts.default_branch {
        match &facts.last_tag {
            Some(tag) => DiffRange::new(tag.as_str(), reference),
            None => DiffRange::new(first_commit, reference),
        }
    } else {
        DiffRange::new(facts.default_branch.as_str(), reference)
    }
}
