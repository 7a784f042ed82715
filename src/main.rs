use tracing_subscriber::{EnvFilter, filter::LevelFilter, prelude::*};
use trade_files::cli::run_cli;

fn main() -> anyhow::Result<()> {
    // logs go to stderr; stdout carries only trades
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(stderr_layer)
        .init();

    run_cli()
}
