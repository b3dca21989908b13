//! CLI interface for changed-matrix.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::{Backend, ExplicitInputs, Inputs};
use crate::provider::{GitHubProvider, LocalGitProvider, RepositoryProvider};

pub mod filter;
pub mod range;

/// changed-matrix: filters a CI build matrix down to the services a change touches.
#[derive(Parser)]
#[command(name = "changed-matrix")]
#[command(about = "Filters a CI build matrix down to the services a change touches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Main commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Filters the matrix list and emits the `filtered` output.
    Filter(filter::FilterCommand),
    /// Prints the `base...head` range a reference resolves to.
    Range(range::RangeCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Filter(filter_cmd) => filter_cmd.execute().await,
            Commands::Range(range_cmd) => range_cmd.execute().await,
        }
    }
}

/// Options locating the repository and the reference to resolve.
///
/// Every option falls back to the matching `INPUT_*` variable and then to
/// the conventional GitHub Actions variable.
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Provider token [fallback: INPUT_TOKEN, GITHUB_TOKEN].
    #[arg(long)]
    pub token: Option<String>,

    /// Reference to resolve: branch, tag or `<number>/merge`
    /// [fallback: INPUT_REF, GITHUB_REF_NAME].
    #[arg(long = "ref", value_name = "REF")]
    pub reference: Option<String>,

    /// Repository as owner/name [fallback: INPUT_REPOSITORY, GITHUB_REPOSITORY].
    #[arg(long)]
    pub repository: Option<String>,

    /// GitHub API root [fallback: INPUT_API_URL, GITHUB_API_URL].
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Reads repository metadata from this local checkout instead of the GitHub API.
    #[arg(long, value_name = "PATH")]
    pub local: Option<PathBuf>,
}

impl SourceArgs {
    fn into_explicit(self) -> ExplicitInputs {
        ExplicitInputs {
            token: self.token,
            reference: self.reference,
            repository: self.repository,
            api_url: self.api_url,
            local: self.local,
            ..Default::default()
        }
    }
}

/// Logs the resolved inputs.
pub(crate) fn log_inputs(inputs: &Inputs) {
    for (name, value) in inputs.summary() {
        info!("{name}: {value}");
    }
}

/// Builds the provider for the resolved backend.
pub(crate) fn build_provider(backend: Backend) -> Result<Box<dyn RepositoryProvider>> {
    match backend {
        Backend::GitHub {
            token,
            api_url,
            repository,
        } => {
            info!(repository = %repository, api_url = %api_url, "Using GitHub API");
            Ok(Box::new(GitHubProvider::new(token, api_url, repository)))
        }
        Backend::Local { path } => {
            info!(path = %path.display(), "Using local repository");
            let provider = LocalGitProvider::open(&path)
                .with_context(|| format!("Failed to open repository at {}", path.display()))?;
            Ok(Box::new(provider))
        }
    }
}
