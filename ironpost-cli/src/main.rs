//! Ironpost CLI -- 취약점 매칭 명령줄 도구
//!
//! ```text
//! ironpost vulns load <file.json>
//! ironpost vulns get <records.json> [--matcher NAME ...]
//! ironpost identify <layer-dir>... [--packages <file.json>]
//! ironpost config validate|show
//! ```

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use ironpost_core::config::IronpostConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // 설정을 읽지 못해도 로깅은 기본값으로 초기화 (config validate가 에러를 보고)
    let general = IronpostConfig::load(&cli.config)
        .await
        .map(|c| c.general)
        .unwrap_or_default();
    logging::init_tracing(&general, cli.log_level.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;

    tracing::debug!(config = %cli.config.display(), "ironpost starting");

    // Ctrl-C는 진행 중인 저장소/인덱서 작업을 취소
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            signal_cancel.cancel();
        }
    });

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Vulns(args) => commands::vulns::execute(args, &cli.config, &writer, &cancel).await,
        Commands::Identify(args) => {
            commands::identify::execute(args, &cli.config, &writer, &cancel).await
        }
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
