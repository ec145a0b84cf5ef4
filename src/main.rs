//! nefax-tier CLI: run the scheduler, preview a plan, or scan one share on demand.

use anyhow::{Context, Result};
use clap::Parser;
use nefax_tier::cli::{Cli, Commands};
use nefax_tier::config::Settings;
use nefax_tier::file_service::LocalFileService;
use nefax_tier::journal::Journal;
use nefax_tier::logging::setup_logging;
use nefax_tier::orchestrator::{install_ctrlc_handler, CancellationToken, Orchestrator};
use nefax_tier::telemetry::FixtureTelemetryProvider;
use nefax_tier::types::AdminFilters;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("load config at {}", cli.config.display()))?;

    // The remote file-service and telemetry-provider collaborators are out of scope (§1); this
    // binary wires up a local-mount file service and a fixture telemetry provider so the engine
    // is runnable standalone. A real deployment supplies its own implementations of both traits.
    let file_service = LocalFileService::new(".");
    let telemetry = FixtureTelemetryProvider::default();
    let journal_path = cli.journal_path();
    let journal = Journal::open(&journal_path)
        .with_context(|| format!("open journal at {}", journal_path.display()))?;

    let staging_dir = std::env::temp_dir().join("nefax-tier-staging");
    std::fs::create_dir_all(&staging_dir)
        .with_context(|| format!("create staging dir at {}", staging_dir.display()))?;

    let orchestrator = Orchestrator::new(&settings, &file_service, &telemetry, journal, staging_dir);
    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone());

    match cli.command {
        Commands::Run { once, workers, interval_hours } => loop {
            let outcomes = orchestrator.run_tick(workers, false, &cancel);
            for outcome in &outcomes {
                log::info!(
                    "{}: should_scan={} score={} archived={} restored={}",
                    outcome.evaluation.share,
                    outcome.evaluation.should_scan,
                    outcome.evaluation.score,
                    outcome.files_archived,
                    outcome.files_restored
                );
            }
            if once || cancel.is_cancelled() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_secs(interval_hours * 3600));
        },
        Commands::Preview { share, filters } => {
            let filters: AdminFilters = filters.into();
            let outcomes = orchestrator.run_tick_with(1, true, true, false, &filters, &cancel);
            for outcome in outcomes.into_iter().filter(|o| o.evaluation.share == share) {
                println!("{}", serde_json::to_string_pretty(&outcome.evaluation)?);
            }
        }
        Commands::Scan { share, force, filters } => {
            let filters: AdminFilters = filters.into();
            let outcomes = orchestrator.run_tick_with(1, true, false, force, &filters, &cancel);
            for outcome in outcomes.into_iter().filter(|o| o.evaluation.share == share) {
                println!("{}", serde_json::to_string_pretty(&outcome.evaluation)?);
            }
        }
    }

    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
