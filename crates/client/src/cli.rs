//! Command line arguments and the settings resolved from them.
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::Parser;

use game_content::{ArchetypeLoader, ArchetypeRegistry, ConfigLoader};
use game_core::EngineConfig;

/// Overrides `tick_rate_hz` from the engine config.
pub const TICK_RATE_ENV: &str = "AGENT_SIM_TICK_RATE";
/// Log filter directives, used before `RUST_LOG`.
pub const LOG_ENV: &str = "AGENT_SIM_LOG";

/// Runs one agent against a target that walks toward it
#[derive(Parser, Debug)]
#[command(name = "agent-sim")]
#[command(about = "Headless enemy behavior simulator", long_about = None)]
#[command(version)]
pub struct Args {
    /// Built-in archetype to simulate
    #[arg(long, default_value = "slime_king", conflicts_with = "archetype")]
    pub preset: String,

    /// RON archetype file to simulate instead of a preset
    #[arg(long, value_name = "FILE")]
    pub archetype: Option<PathBuf>,

    /// Engine config (TOML); defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,

    /// Starting distance between the agent and the target
    #[arg(long, default_value_t = 6.0)]
    pub distance: f32,

    /// Target walking speed in units per second
    #[arg(long, default_value_t = 1.0)]
    pub walk_speed: f32,

    /// Scheduled hit on the agent, e.g. `240@1.0`; repeatable
    #[arg(long = "hit", value_name = "AMOUNT@SECS")]
    pub hits: Vec<Hit>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per event, then a summary
    Text,
    /// One JSON object per event, then the summary object
    Json,
}

/// Damage applied to the agent once simulated time reaches `at`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub amount: i32,
    pub at: f32,
}

impl FromStr for Hit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (amount, at) = s
            .split_once('@')
            .ok_or_else(|| format!("expected AMOUNT@SECS, got `{s}`"))?;
        let amount: i32 = amount
            .trim()
            .parse()
            .map_err(|_| format!("invalid hit amount `{amount}`"))?;
        let at: f32 = at
            .trim()
            .parse()
            .map_err(|_| format!("invalid hit time `{at}`"))?;
        if amount <= 0 {
            return Err(format!("hit amount must be positive, got {amount}"));
        }
        if !at.is_finite() || at < 0.0 {
            return Err(format!("hit time must be a non-negative number, got {at}"));
        }
        Ok(Self { amount, at })
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.amount, self.at)
    }
}

/// Everything a simulation run needs, after files and environment are read.
#[derive(Debug)]
pub struct Settings {
    pub engine: EngineConfig,
    pub registry: ArchetypeRegistry,
    pub archetype: String,
    pub ticks: u32,
    pub distance: f32,
    pub walk_speed: f32,
    pub hits: Vec<Hit>,
    pub format: OutputFormat,
}

impl Settings {
    pub fn resolve(args: Args) -> Result<Self> {
        let mut engine = match &args.config {
            Some(path) => ConfigLoader::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(rate) = read_env::<u32>(TICK_RATE_ENV) {
            if rate == 0 {
                bail!("{TICK_RATE_ENV} must be at least 1");
            }
            engine.tick_rate_hz = rate;
        }

        let mut registry =
            ArchetypeRegistry::with_presets().context("built-in presets failed to compile")?;
        let archetype = match &args.archetype {
            Some(path) => {
                let spec = ArchetypeLoader::load(path)?;
                registry.insert(spec)?.name().to_owned()
            }
            None => {
                if !registry.contains(&args.preset) {
                    let known: Vec<&str> = registry.names().collect();
                    bail!(
                        "unknown preset `{}` (known: {})",
                        args.preset,
                        known.join(", ")
                    );
                }
                args.preset.clone()
            }
        };

        if !(args.distance.is_finite() && args.distance >= 0.0) {
            bail!("--distance must be a non-negative number");
        }

        let mut hits = args.hits;
        hits.sort_by(|a, b| a.at.total_cmp(&b.at));

        Ok(Self {
            engine,
            registry,
            archetype,
            ticks: args.ticks,
            distance: args.distance,
            walk_speed: args.walk_speed.max(0.0),
            hits,
            format: args.format,
        })
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_parse_amount_and_time() {
        assert_eq!(
            "240@1.5".parse::<Hit>().unwrap(),
            Hit {
                amount: 240,
                at: 1.5
            }
        );
        assert!("240".parse::<Hit>().is_err());
        assert!("-5@1".parse::<Hit>().is_err());
        assert!("10@-1".parse::<Hit>().is_err());
        assert!("ten@1".parse::<Hit>().is_err());
    }

    #[test]
    fn arguments_parse_with_repeated_hits() {
        let args = Args::try_parse_from([
            "agent-sim",
            "--preset",
            "reaper",
            "--ticks",
            "120",
            "--hit",
            "100@2.0",
            "--hit",
            "60@0.5",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.preset, "reaper");
        assert_eq!(args.ticks, 120);
        assert_eq!(args.hits.len(), 2);
        assert_eq!(args.format, OutputFormat::Json);

        let settings = Settings::resolve(args).unwrap();
        assert_eq!(settings.archetype, "reaper");
        assert_eq!(settings.hits[0].at, 0.5);
    }

    #[test]
    fn preset_and_archetype_file_conflict() {
        let result = Args::try_parse_from([
            "agent-sim",
            "--preset",
            "slime",
            "--archetype",
            "boss.ron",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_preset_is_reported() {
        let args = Args::try_parse_from(["agent-sim", "--preset", "dragon"]).unwrap();
        let error = Settings::resolve(args).unwrap_err().to_string();
        assert!(error.contains("dragon"));
    }

    #[test]
    fn archetype_files_join_the_presets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cave_slime.ron");
        std::fs::write(
            &path,
            include_str!("../../game/content/data/archetypes/cave_slime.ron"),
        )
        .unwrap();

        let args = Args::try_parse_from([
            "agent-sim",
            "--archetype",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let settings = Settings::resolve(args).unwrap();
        assert_eq!(settings.archetype, "cave_slime");
        assert!(settings.registry.contains("slime_king"));
    }
}
