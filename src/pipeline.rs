//! The filtering pipeline: resolve the range, diff it, reduce the diff to
//! changed directories and filter the matrix.

use tracing::info;

use crate::changes::changed_top_level_dirs;
use crate::error::Result;
use crate::matrix::{FilteredResult, MatrixList, MatrixMode};
use crate::provider::RepositoryProvider;
use crate::resolve::resolve_range;

/// Runs the pipeline for `reference` against an already-loaded matrix.
pub async fn run_filter<P>(
    provider: &P,
    reference: &str,
    matrix: &MatrixList,
    mode: &MatrixMode,
) -> Result<FilteredResult>
where
    P: RepositoryProvider + ?Sized,
{
    let range = resolve_range(provider, reference).await?;

    let Some(files) = provider.compare(&range).await? else {
        info!(diff = %range, "No files changed in the comparison");
        return Ok(FilteredResult::empty(mode));
    };

    let changed = changed_top_level_dirs(&files);
    info!(
        files = files.len(),
        directories = ?changed.iter().collect::<Vec<_>>(),
        "Collected changed directories"
    );

    let filtered = matrix.filter(mode, &changed)?;
    if filtered.is_empty() {
        info!("No services found in the list");
    }

    Ok(filtered)
}
