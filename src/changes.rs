//! Reduction of a diff's file list to the set of changed top-level directories.

use serde::{Deserialize, Serialize};

/// A single changed path reported by a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Repository-relative path of the changed file.
    pub filename: String,
}

impl FileChange {
    /// Creates a file change for the given path.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

/// Deduplicated top-level directory names in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedDirectorySet {
    dirs: Vec<String>,
}

impl ChangedDirectorySet {
    /// Builds the set from the files of a diff.
    ///
    /// Files at the repository root have no top-level directory and are
    /// dropped, as are paths starting with `/`.
    pub fn from_files(files: &[FileChange]) -> Self {
        let mut dirs: Vec<String> = Vec::new();

        for file in files {
            let Some((dir, _)) = file.filename.split_once('/') else {
                continue;
            };
            if dir.is_empty() || dirs.iter().any(|seen| seen == dir) {
                continue;
            }
            dirs.push(dir.to_string());
        }

        Self { dirs }
    }

    /// Returns true if `dir` changed.
    pub fn contains(&self, dir: &str) -> bool {
        self.dirs.iter().any(|d| d == dir)
    }

    /// Returns true if no directory changed.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Number of changed directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Iterates directory names in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.dirs.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ChangedDirectorySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut dirs: Vec<String> = Vec::new();
        for dir in iter {
            let dir = dir.into();
            if !dir.is_empty() && !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        Self { dirs }
    }
}

/// Returns the top-level directories touched by `files`.
pub fn changed_top_level_dirs(files: &[FileChange]) -> ChangedDirectorySet {
    ChangedDirectorySet::from_files(files)
}
