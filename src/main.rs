use std::process;

use changed_matrix::output::annotate_error;
use changed_matrix::Cli;
use clap::Parser;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout carries only the emitted output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e}");

        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {err}");
            source = err.source();
        }

        if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
            annotate_error(&format!("{e:#}"));
        }

        process::exit(1);
    }
}
