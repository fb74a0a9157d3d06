use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::engine::gate::DEFAULT_GATE_THRESHOLD;
use crate::engine::RolloutMode;

/// Betting recommendation engine with feedback-tuned confidence
#[derive(Parser, Debug, Clone)]
#[command(name = "edge-engine", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "edge_engine.db")]
    pub database_path: String,

    /// Minimum ATS win rate (percent) for the public performance gate
    #[arg(long, env = "GATE_THRESHOLD", default_value_t = DEFAULT_GATE_THRESHOLD)]
    pub gate_threshold: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// API listen address
        #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
        addr: String,
    },
    /// Generate recommendations for a request JSON file
    Recommend {
        #[arg(long)]
        input: PathBuf,
        /// Resolve the config for this caller (A-B rollouts)
        #[arg(long)]
        caller: Option<String>,
    },
    /// Load graded historical picks from a JSON array file
    ImportPicks {
        #[arg(long)]
        input: PathBuf,
    },
    /// Evaluate the performance gate over stored picks
    Gate,
    /// Regenerate and persist the tuning config
    Tune {
        /// Segmentation report JSON; built from stored picks when omitted
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long, value_enum)]
        rollout_mode: Option<RolloutArg>,
        #[arg(long)]
        experiment: Option<String>,
        #[arg(long)]
        variant: Option<String>,
    },
    /// Print the effective tuning config
    Config,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutArg {
    Live,
    Shadow,
    Ab,
}

impl From<RolloutArg> for RolloutMode {
    fn from(arg: RolloutArg) -> Self {
        match arg {
            RolloutArg::Live => RolloutMode::Live,
            RolloutArg::Shadow => RolloutMode::Shadow,
            RolloutArg::Ab => RolloutMode::AB,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=100.0).contains(&self.gate_threshold) {
            anyhow::bail!("gate_threshold must be between 0 and 100");
        }
        if let Command::Tune {
            rollout_mode: Some(RolloutArg::Ab),
            experiment,
            ..
        } = &self.command
        {
            if experiment.as_deref().map_or(true, |e| e.trim().is_empty()) {
                anyhow::bail!("--experiment is required with --rollout-mode ab");
            }
        }
        Ok(())
    }
}
