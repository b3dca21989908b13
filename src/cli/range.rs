//! Range command — prints the comparison range a reference resolves to.

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::{build_provider, log_inputs, SourceArgs};
use crate::config::Inputs;
use crate::resolve::resolve_range;

/// Range command options.
#[derive(Parser, Debug, Default)]
pub struct RangeCommand {
    /// Repository and reference options.
    #[command(flatten)]
    pub source: SourceArgs,
}

impl RangeCommand {
    /// Executes the range command.
    pub async fn execute(self) -> Result<()> {
        let inputs = Inputs::from_env(self.source.into_explicit());
        log_inputs(&inputs);

        let backend = inputs.backend()?;
        let reference = inputs.reference()?;
        let provider = build_provider(backend)?;

        let range = resolve_range(provider.as_ref(), reference)
            .await
            .with_context(|| format!("Failed to resolve '{reference}'"))?;

        println!("{range}");
        Ok(())
    }
}
