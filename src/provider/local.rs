//! Provider answering from a local checkout with git2.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use git2::{BranchType, Commit, Oid, Repository, Sort};
use tracing::debug;

use crate::changes::FileChange;
use crate::error::{FilterError, Result};
use crate::provider::{CommitWithDate, ProviderFuture, RepositoryProvider};
use crate::resolve::DiffRange;

/// Branch names tried, in order, when `origin/HEAD` is not set.
const COMMON_DEFAULT_BRANCHES: [&str; 3] = ["main", "master", "develop"];

/// Provider reading a repository on disk.
///
/// The repository is reopened for each lookup so the provider stays
/// `Send + Sync`.
pub struct LocalGitProvider {
    path: PathBuf,
}

impl LocalGitProvider {
    /// Creates a provider for the repository at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        Repository::open(&path).map_err(|e| {
            FilterError::Configuration(format!(
                "{} is not a git repository: {}",
                path.display(),
                e.message()
            ))
        })?;
        Ok(Self { path })
    }

    fn repo(&self) -> Result<Repository> {
        Repository::open(&self.path).map_err(git_error)
    }

    fn detect_default_branch(&self) -> Result<String> {
        let repo = self.repo()?;

        if let Ok(head_ref) = repo.find_reference("refs/remotes/origin/HEAD") {
            if let Some(branch) = head_ref
                .symbolic_target()
                .and_then(|target| target.strip_prefix("refs/remotes/origin/"))
            {
                return Ok(branch.to_string());
            }
        }

        for name in COMMON_DEFAULT_BRANCHES {
            if repo.find_branch(name, BranchType::Local).is_ok()
                || repo
                    .find_branch(&format!("origin/{name}"), BranchType::Remote)
                    .is_ok()
            {
                return Ok(name.to_string());
            }
        }

        Err(FilterError::ProviderUnavailable(format!(
            "unable to determine the default branch of {}",
            self.path.display()
        )))
    }

    fn newest_tag(&self) -> Result<Option<String>> {
        let repo = self.repo()?;
        let names = repo.tag_names(None).map_err(git_error)?;

        let mut newest: Option<(i64, String)> = None;
        for name in names.iter().flatten() {
            let Ok(commit) = repo
                .revparse_single(&format!("refs/tags/{name}"))
                .and_then(|obj| obj.peel_to_commit())
            else {
                continue;
            };
            let time = commit.time().seconds();
            if newest.as_ref().map_or(true, |(best, _)| time > *best) {
                newest = Some((time, name.to_string()));
            }
        }

        Ok(newest.map(|(_, name)| name))
    }

    fn history(&self) -> Result<Vec<CommitWithDate>> {
        let default_branch = self.detect_default_branch()?;
        let repo = self.repo()?;
        let tip = resolve_commit(&repo, &default_branch)?.id();
        let mut walker = repo.revwalk().map_err(git_error)?;
        // Oldest first, so commits sharing an author second keep history order
        walker
            .set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
            .map_err(git_error)?;
        walker.push(tip).map_err(git_error)?;

        let mut commits = Vec::new();
        for oid in walker {
            let oid = oid.map_err(git_error)?;
            let commit = repo.find_commit(oid).map_err(git_error)?;
            commits.push(CommitWithDate {
                sha: oid.to_string(),
                date: DateTime::from_timestamp(commit.author().when().seconds(), 0),
            });
        }

        debug!(branch = %default_branch, count = commits.len(), "Walked local history");
        Ok(commits)
    }

    /// Finds the head commit of pull request `number`.
    ///
    /// Head refs are used directly. Merge refs, as fetched by
    /// `actions/checkout`, point at a merge whose second parent is the head.
    fn pull_request_commit(&self, number: u64) -> Result<String> {
        let repo = self.repo()?;

        let head = [
            format!("refs/pull/{number}/head"),
            format!("refs/remotes/origin/pull/{number}/head"),
        ]
        .iter()
        .find_map(|name| repo.refname_to_id(name).ok());
        if let Some(oid) = head {
            return Ok(oid.to_string());
        }

        let merge_head = [
            format!("refs/remotes/pull/{number}/merge"),
            format!("refs/pull/{number}/merge"),
            format!("refs/remotes/origin/pull/{number}/merge"),
        ]
        .iter()
        .filter_map(|name| repo.refname_to_id(name).ok())
        .find_map(|oid| repo.find_commit(oid).and_then(|c| c.parent_id(1)).ok());

        merge_head.map(|oid| oid.to_string()).ok_or_else(|| {
            FilterError::InvalidReference(format!(
                "pull request #{number} has no head or merge ref in {}",
                self.path.display()
            ))
        })
    }

    fn changed_files(&self, range: &DiffRange) -> Result<Vec<FileChange>> {
        let repo = self.repo()?;
        let base = resolve_commit(&repo, range.base())?;
        let head = resolve_commit(&repo, range.head())?;

        let merge_base = repo.merge_base(base.id(), head.id()).map_err(git_error)?;
        let base_tree = repo
            .find_commit(merge_base)
            .and_then(|c| c.tree())
            .map_err(git_error)?;
        let head_tree = head.tree().map_err(git_error)?;

        let diff = repo
            .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), None)
            .map_err(git_error)?;

        let files = diff
            .deltas()
            .filter_map(|delta| {
                let file = match delta.status() {
                    git2::Delta::Deleted => delta.old_file(),
                    _ => delta.new_file(),
                };
                file.path().and_then(Path::to_str).map(FileChange::new)
            })
            .collect();

        Ok(files)
    }
}

/// Resolves a branch, tag or SHA, falling back to the `origin/` remote
/// branch and then the tag namespace.
fn resolve_commit<'r>(repo: &'r Repository, name: &str) -> Result<Commit<'r>> {
    if let Ok(oid) = Oid::from_str(name) {
        if let Ok(commit) = repo.find_commit(oid) {
            return Ok(commit);
        }
    }

    for candidate in [
        name.to_string(),
        format!("origin/{name}"),
        format!("refs/tags/{name}"),
    ] {
        if let Ok(commit) = repo
            .revparse_single(&candidate)
            .and_then(|obj| obj.peel_to_commit())
        {
            return Ok(commit);
        }
    }

    Err(FilterError::InvalidReference(format!(
        "'{name}' does not name a commit"
    )))
}

fn git_error(e: git2::Error) -> FilterError {
    FilterError::ProviderUnavailable(e.message().to_string())
}

impl RepositoryProvider for LocalGitProvider {
    fn default_branch(&self) -> ProviderFuture<'_, String> {
        Box::pin(async move { self.detect_default_branch() })
    }

    fn last_tag(&self) -> ProviderFuture<'_, Option<String>> {
        Box::pin(async move { self.newest_tag() })
    }

    fn list_commits(&self) -> ProviderFuture<'_, Vec<CommitWithDate>> {
        Box::pin(async move { self.history() })
    }

    fn pull_request_head(&self, number: u64) -> ProviderFuture<'_, String> {
        Box::pin(async move { self.pull_request_commit(number) })
    }

    fn compare<'a>(&'a self, range: &'a DiffRange) -> ProviderFuture<'a, Option<Vec<FileChange>>> {
        Box::pin(async move { self.changed_files(range).map(Some) })
    }
}
