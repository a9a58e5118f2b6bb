//! Headless agent simulator.
//!
//! Spawns one archetype in a runtime world, walks a scripted target toward
//! it, applies a hit schedule, and prints every event followed by a summary.
//!
//! # Examples
//!
//! ```bash
//! agent-sim --preset slime_king --ticks 600 --distance 6 --hit 240@1.0 --hit 170@4.0
//! agent-sim --archetype data/archetypes/cave_slime.ron --config data/engine.toml
//! AGENT_SIM_LOG=game_core=debug agent-sim --preset reaper --log-file logs/reaper.log
//! ```

mod cli;
mod logging;
mod report;
mod scenario;

use anyhow::Result;
use clap::Parser;

use cli::{Args, OutputFormat, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let _guard = logging::setup_logging(args.log_file.as_deref())?;

    let settings = Settings::resolve(args)?;
    let format = settings.format;
    tracing::info!(
        archetype = %settings.archetype,
        tick_rate = settings.engine.tick_rate_hz,
        hits = settings.hits.len(),
        "Starting agent simulation"
    );

    let summary = scenario::run(settings, |event, seconds| match format {
        OutputFormat::Text => println!("{}", report::format_event(event, seconds)),
        OutputFormat::Json => match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::warn!(%error, "failed to encode event"),
        },
    })
    .await?;

    match format {
        OutputFormat::Text => println!("\n{summary}"),
        OutputFormat::Json => println!("{}", serde_json::to_string(&summary)?),
    }
    Ok(())
}
