//! Repository metadata providers.
//!
//! A provider answers the handful of questions the reference resolver and
//! the diff step need: the default branch, the most recent tag, the commit
//! history, pull request heads, and the files changed between two refs.

pub mod github;
pub mod local;
#[cfg(test)]
pub(crate) mod test_utils;

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::changes::FileChange;
use crate::error::{FilterError, Result};
use crate::resolve::DiffRange;

pub use github::GitHubProvider;
pub use local::LocalGitProvider;

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A commit together with its author date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitWithDate {
    /// Full commit SHA.
    pub sha: String,
    /// Author date, when the provider reports one.
    pub date: Option<DateTime<Utc>>,
}

/// An `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    /// Account or organisation owning the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoSlug {
    /// Parses an `owner/name` pair.
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split('/').collect();
        match parts.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: (*owner).to_string(),
                name: (*name).to_string(),
            }),
            _ => Err(FilterError::InvalidRepository(value.to_string())),
        }
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Read-only access to repository metadata.
pub trait RepositoryProvider: Send + Sync {
    /// Returns the repository's default branch.
    fn default_branch(&self) -> ProviderFuture<'_, String>;

    /// Returns the most recent tag, or `None` when the repository has none.
    fn last_tag(&self) -> ProviderFuture<'_, Option<String>>;

    /// Returns commits in no particular order. The result always contains
    /// the root of the history but may omit newer commits.
    fn list_commits(&self) -> ProviderFuture<'_, Vec<CommitWithDate>>;

    /// Returns the head commit SHA of pull request `number`.
    fn pull_request_head(&self, number: u64) -> ProviderFuture<'_, String>;

    /// Returns the files changed in `range`.
    ///
    /// `None` means the provider reported no file list at all, which is
    /// different from an empty list.
    fn compare<'a>(&'a self, range: &'a DiffRange) -> ProviderFuture<'a, Option<Vec<FileChange>>>;
}
