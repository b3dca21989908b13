//! Input resolution.
//!
//! Every input is resolved exactly once, before any provider call. A value
//! comes from the first of these that is set and non-blank:
//!
//! 1. the command-line flag;
//! 2. the GitHub Actions input variable, `INPUT_<NAME>`;
//! 3. a conventional fallback variable such as `GITHUB_TOKEN`.
//!
//! Commands then derive the narrower configuration they need from the
//! resulting [`Inputs`].

use std::path::PathBuf;

use url::Url;

use crate::error::{FilterError, Result};
use crate::matrix::MatrixMode;
use crate::provider::github::DEFAULT_API_URL;
use crate::provider::RepoSlug;

/// A named input and the fallback variable consulted last.
struct InputSpec {
    name: &'static str,
    fallback: &'static str,
}

const TOKEN: InputSpec = InputSpec {
    name: "token",
    fallback: "GITHUB_TOKEN",
};
const LIST: InputSpec = InputSpec {
    name: "list",
    fallback: "MATRIX_LIST",
};
const REF: InputSpec = InputSpec {
    name: "ref",
    fallback: "GITHUB_REF_NAME",
};
const REPOSITORY: InputSpec = InputSpec {
    name: "repository",
    fallback: "GITHUB_REPOSITORY",
};
const IS_SLICE: InputSpec = InputSpec {
    name: "is_slice",
    fallback: "IS_SLICE",
};
const FILTER_BY: InputSpec = InputSpec {
    name: "filter_by",
    fallback: "FILTER_BY",
};
const API_URL: InputSpec = InputSpec {
    name: "api_url",
    fallback: "GITHUB_API_URL",
};
const OUTPUT_FILE: InputSpec = InputSpec {
    name: "output_file",
    fallback: "GITHUB_OUTPUT",
};

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ExplicitInputs {
    /// Provider credential.
    pub token: Option<String>,
    /// Path of the matrix document.
    pub list: Option<String>,
    /// Reference to resolve.
    pub reference: Option<String>,
    /// `owner/name` of the repository.
    pub repository: Option<String>,
    /// `"true"` selects sliced mode.
    pub is_slice: Option<String>,
    /// Group to filter in sliced mode.
    pub filter_by: Option<String>,
    /// GitHub API root.
    pub api_url: Option<String>,
    /// File receiving `name=value` outputs.
    pub output_file: Option<String>,
    /// Local checkout to read instead of the GitHub API.
    pub local: Option<PathBuf>,
}

/// Fully resolved, immutable inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    token: Option<String>,
    list: Option<String>,
    reference: Option<String>,
    repository: Option<String>,
    is_slice: Option<String>,
    filter_by: Option<String>,
    api_url: Option<String>,
    output_file: Option<String>,
    local: Option<PathBuf>,
}

/// Where repository metadata comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// The GitHub REST API.
    GitHub {
        /// Bearer token.
        token: String,
        /// API root.
        api_url: Url,
        /// Repository to inspect.
        repository: RepoSlug,
    },
    /// A checkout on disk.
    Local {
        /// Repository root.
        path: PathBuf,
    },
}

/// Configuration for filtering a matrix document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixConfig {
    /// Path of the matrix document.
    pub list: PathBuf,
    /// Flat or sliced interpretation.
    pub mode: MatrixMode,
    /// File receiving the `filtered` output, if any.
    pub output_file: Option<PathBuf>,
}

impl Inputs {
    /// Resolves inputs from the process environment.
    pub fn from_env(explicit: ExplicitInputs) -> Self {
        Self::resolve(explicit, |key| std::env::var(key).ok())
    }

    /// Resolves inputs using `lookup` to read environment variables.
    pub fn resolve<F>(explicit: ExplicitInputs, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |value: Option<String>, spec: &InputSpec| {
            non_blank(value)
                .or_else(|| non_blank(lookup(&action_input_var(spec.name))))
                .or_else(|| non_blank(lookup(spec.fallback)))
        };

        Self {
            token: pick(explicit.token, &TOKEN),
            list: pick(explicit.list, &LIST),
            reference: pick(explicit.reference, &REF),
            repository: pick(explicit.repository, &REPOSITORY),
            is_slice: pick(explicit.is_slice, &IS_SLICE),
            filter_by: pick(explicit.filter_by, &FILTER_BY),
            api_url: pick(explicit.api_url, &API_URL),
            output_file: pick(explicit.output_file, &OUTPUT_FILE),
            local: explicit.local,
        }
    }

    /// Chooses the provider backend.
    ///
    /// The GitHub backend needs a token, a well-formed repository and a
    /// valid API URL; a local checkout needs none of them.
    pub fn backend(&self) -> Result<Backend> {
        if let Some(path) = &self.local {
            return Ok(Backend::Local { path: path.clone() });
        }

        let token = self
            .token
            .clone()
            .ok_or_else(|| FilterError::Configuration("No token provided".to_string()))?;
        let repository = self.repository()?;
        let raw_url = self.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        let api_url = Url::parse(raw_url).map_err(|e| {
            FilterError::Configuration(format!("Invalid API URL '{raw_url}': {e}"))
        })?;

        Ok(Backend::GitHub {
            token,
            api_url,
            repository,
        })
    }

    /// Parses the repository input.
    pub fn repository(&self) -> Result<RepoSlug> {
        let value = self
            .repository
            .as_deref()
            .ok_or_else(|| FilterError::Configuration("No repository provided".to_string()))?;
        RepoSlug::parse(value)
    }

    /// The reference to resolve.
    pub fn reference(&self) -> Result<&str> {
        self.reference
            .as_deref()
            .ok_or_else(|| FilterError::Configuration("No ref provided".to_string()))
    }

    /// Builds the matrix configuration.
    pub fn matrix(&self) -> Result<MatrixConfig> {
        let list = self
            .list
            .as_deref()
            .map(PathBuf::from)
            .ok_or_else(|| FilterError::Configuration("No list provided".to_string()))?;

        let mode = if self.is_slice() {
            let filter_by = self.filter_by.clone().ok_or_else(|| {
                FilterError::Configuration(
                    "No filter_by provided; it is required when is_slice is true".to_string(),
                )
            })?;
            MatrixMode::Sliced { filter_by }
        } else {
            MatrixMode::Flat
        };

        Ok(MatrixConfig {
            list,
            mode,
            output_file: self.output_file.as_deref().map(PathBuf::from),
        })
    }

    /// True when sliced mode was requested.
    pub fn is_slice(&self) -> bool {
        self.is_slice
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// Optional inputs, for logging. The token is never included.
    pub fn summary(&self) -> Vec<(&'static str, &str)> {
        vec![
            (LIST.name, self.list.as_deref().unwrap_or("")),
            (REF.name, self.reference.as_deref().unwrap_or("")),
            (REPOSITORY.name, self.repository.as_deref().unwrap_or("")),
            (FILTER_BY.name, self.filter_by.as_deref().unwrap_or("")),
        ]
    }
}

/// Name of the variable GitHub Actions uses for input `name`.
fn action_input_var(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
