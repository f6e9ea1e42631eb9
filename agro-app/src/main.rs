use agro_app::cli::{Cli, Command, DiagnosticsCommand};
use agro_app::http::AppState;
use agro_app::{app, config, logging};
use anyhow::Context;
use clap::Parser;
use tracing::debug;

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_default_logging();
    if let Some(level) = &cli.log_level {
        logging::set_log_level(level)?;
    }
    if let Some(path) = &cli.log_file {
        logging::enable_file_logging(path)?;
    }

    let engine_config = config::load_engine_config(cli.config.as_deref())?;
    let repo = app::open_repository(&cli.db_config()).await?;

    match &cli.command {
        Command::Simulate(args) => {
            let input = args.to_input();
            debug!(?input, "simulate");
            let report =
                app::run_simulation(repo.as_ref(), &engine_config, &input, args.reference.as_deref())
                    .await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("cannot render report")?
            );
        }
        Command::Serve(args) => {
            app::serve(args.bind, AppState::new(repo, engine_config)).await?;
        }
        Command::Diagnostics {
            command: DiagnosticsCommand::List { limit },
        } => {
            let items = app::list_diagnostics(repo.as_ref(), *limit).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&items).context("cannot render diagnostics")?
            );
        }
    }

    Ok(())
}
