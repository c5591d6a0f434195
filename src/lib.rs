mod commands;
pub mod config;
pub mod overlay;
pub mod pipeline;

use clap::Parser;
use commands::Cli;

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "aim_coach=info,aim_capture=info,aim_vision=info,aim_advisor=info,aim_telemetry=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    commands::dispatch(cli)
}
