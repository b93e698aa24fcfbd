use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::JitterConfig;

#[derive(Parser, Debug)]
#[command(
    name = "scale-sim",
    about = "Watch simulated system metrics degrade as the user count grows"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the simulation and report every tick.
    Run(RunArgs),
    /// Print the effective configuration after file and flag layering.
    ShowConfig(SimArgs),
    /// Evaluate the load model once for a fixed user count.
    Compute(ComputeArgs),
    /// List the bottleneck catalog, lowest threshold first.
    Bottlenecks(BottleneckArgs),
    /// List the valid multiplier steps.
    Multipliers,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SimArgs {
    #[arg(long, help = "TOML or JSON settings file; flags override its values")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub multiplier: Option<u32>,
    #[arg(long)]
    pub base_users: Option<u32>,
    #[arg(long)]
    pub tick_rate_ms: Option<u64>,
    #[arg(long)]
    pub ticks: Option<u64>,
    #[arg(long, value_enum)]
    pub jitter: Option<JitterArg>,
    #[arg(
        long,
        help = "Seed the jitter source; implies --jitter seeded unless --jitter is given"
    )]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub sim: SimArgs,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
    #[arg(
        long,
        help = "Pace ticks on the wall clock and read commands from stdin (pause, reset, multiplier <n>, rate <ms>, +, -, quit)"
    )]
    pub realtime: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ComputeArgs {
    #[arg(long)]
    pub users: u32,
    #[arg(long, value_enum)]
    pub jitter: Option<JitterArg>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct BottleneckArgs {
    #[arg(long, help = "Mark entries active at this user count")]
    pub users: Option<u32>,
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum JitterArg {
    Entropy,
    Seeded,
    Zero,
}

impl From<JitterArg> for JitterConfig {
    fn from(value: JitterArg) -> Self {
        match value {
            JitterArg::Entropy => JitterConfig::Entropy,
            JitterArg::Seeded => JitterConfig::Seeded,
            JitterArg::Zero => JitterConfig::Zero,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
}

/// Resolves the jitter flag pair: a bare `--seed` selects the seeded source.
pub fn resolve_jitter(jitter: Option<JitterArg>, seed: Option<u64>) -> Option<JitterConfig> {
    match (jitter, seed) {
        (Some(jitter), _) => Some(jitter.into()),
        (None, Some(_)) => Some(JitterConfig::Seeded),
        (None, None) => None,
    }
}

pub fn parse_args() -> Result<Cli> {
    match Cli::try_parse() {
        Ok(cli) => Ok(cli),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => Err(Error::Cli(err.to_string())),
    }
}
