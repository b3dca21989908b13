//! Filter command — emits the matrix entries affected by a change.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::cli::{build_provider, log_inputs, SourceArgs};
use crate::config::{ExplicitInputs, Inputs};
use crate::matrix::MatrixList;
use crate::output::ActionOutput;
use crate::pipeline::run_filter;

/// Name of the emitted output.
pub const OUTPUT_NAME: &str = "filtered";

/// Filter command options.
#[derive(Parser, Debug, Default)]
pub struct FilterCommand {
    /// Repository and reference options.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Path to the JSON matrix list [fallback: INPUT_LIST, MATRIX_LIST].
    #[arg(long, value_name = "PATH")]
    pub list: Option<String>,

    /// `true` to treat the list as named groups [fallback: INPUT_IS_SLICE, IS_SLICE].
    #[arg(long, value_name = "BOOL")]
    pub is_slice: Option<String>,

    /// Group of a sliced list to filter [fallback: INPUT_FILTER_BY, FILTER_BY].
    #[arg(long, value_name = "GROUP")]
    pub filter_by: Option<String>,

    /// File to append `filtered=<json>` to [fallback: INPUT_OUTPUT_FILE, GITHUB_OUTPUT].
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<String>,
}

impl FilterCommand {
    /// Executes the filter command.
    pub async fn execute(self) -> Result<()> {
        let explicit = ExplicitInputs {
            list: self.list,
            is_slice: self.is_slice,
            filter_by: self.filter_by,
            output_file: self.output_file,
            ..self.source.into_explicit()
        };
        let inputs = Inputs::from_env(explicit);
        log_inputs(&inputs);

        // Preflight: everything that can fail without the network fails first.
        let backend = inputs.backend()?;
        let matrix_config = inputs.matrix()?;
        let matrix = MatrixList::load(&matrix_config.list, &matrix_config.mode)?;
        matrix.check_mode(&matrix_config.mode)?;
        let reference = inputs.reference()?;

        let provider = build_provider(backend)?;
        let filtered = run_filter(provider.as_ref(), reference, &matrix, &matrix_config.mode)
            .await
            .with_context(|| format!("Failed to filter the matrix for '{reference}'"))?;

        info!(matches = filtered.len(), "Filtered matrix");

        ActionOutput::new(matrix_config.output_file).set_output(OUTPUT_NAME, &filtered.to_json()?)
    }
}
