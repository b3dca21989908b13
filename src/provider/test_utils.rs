//! Shared test utilities for provider consumers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::changes::FileChange;
use crate::error::{FilterError, Result};
use crate::provider::{CommitWithDate, ProviderFuture, RepositoryProvider};
use crate::resolve::DiffRange;

/// Mock provider answering from canned repository facts.
///
/// Every call is recorded by name so tests can assert which lookups a
/// resolution needed. Use [`call_handle`](Self::call_handle) to keep a
/// view of the log after the provider has been borrowed elsewhere.
pub(crate) struct MockProvider {
    default_branch: String,
    last_tag: Option<String>,
    commits: Vec<CommitWithDate>,
    pull_requests: HashMap<u64, String>,
    files: Option<Vec<FileChange>>,
    fail_with: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Creates a provider whose default branch is `default_branch` and
    /// which has no tags, commits, pull requests or changed files.
    pub(crate) fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            last_tag: None,
            commits: Vec::new(),
            pull_requests: HashMap::new(),
            files: Some(Vec::new()),
            fail_with: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the most recent tag.
    pub(crate) fn with_tag(mut self, tag: &str) -> Self {
        self.last_tag = Some(tag.to_string());
        self
    }

    /// Adds a commit with an RFC 3339 author date.
    pub(crate) fn with_commit(mut self, sha: &str, date: &str) -> Self {
        self.commits.push(CommitWithDate {
            sha: sha.to_string(),
            date: Some(date.parse().unwrap()),
        });
        self
    }

    /// Registers a pull request head.
    pub(crate) fn with_pull_request(mut self, number: u64, head_sha: &str) -> Self {
        self.pull_requests.insert(number, head_sha.to_string());
        self
    }

    /// Sets the files reported by `compare`; `None` means no file list.
    pub(crate) fn with_files(mut self, files: Option<&[&str]>) -> Self {
        self.files = files.map(|paths| paths.iter().map(|p| FileChange::new(*p)).collect());
        self
    }

    /// Makes every lookup fail with a provider error.
    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// Returns a handle for inspecting the recorded calls.
    pub(crate) fn call_handle(&self) -> CallLogHandle {
        CallLogHandle {
            calls: self.calls.clone(),
        }
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(message) => Err(FilterError::ProviderUnavailable(message.clone())),
            None => Ok(()),
        }
    }
}

/// Shared handle to a mock provider's call log.
pub(crate) struct CallLogHandle {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLogHandle {
    /// Returns every recorded call in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns true if a call with this exact name was recorded.
    pub(crate) fn called(&self, call: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == call)
    }
}

impl RepositoryProvider for MockProvider {
    fn default_branch(&self) -> ProviderFuture<'_, String> {
        Box::pin(async move {
            self.record("default_branch".to_string())?;
            Ok(self.default_branch.clone())
        })
    }

    fn last_tag(&self) -> ProviderFuture<'_, Option<String>> {
        Box::pin(async move {
            self.record("last_tag".to_string())?;
            Ok(self.last_tag.clone())
        })
    }

    fn list_commits(&self) -> ProviderFuture<'_, Vec<CommitWithDate>> {
        Box::pin(async move {
            self.record("list_commits".to_string())?;
            Ok(self.commits.clone())
        })
    }

    fn pull_request_head(&self, number: u64) -> ProviderFuture<'_, String> {
        Box::pin(async move {
            self.record(format!("pull_request_head:{number}"))?;
            self.pull_requests.get(&number).cloned().ok_or_else(|| {
                FilterError::InvalidReference(format!("pull request #{number} not found"))
            })
        })
    }

    fn compare<'a>(&'a self, range: &'a DiffRange) -> ProviderFuture<'a, Option<Vec<FileChange>>> {
        Box::pin(async move {
            self.record(format!("compare:{range}"))?;
            Ok(self.files.clone())
        })
    }
}
