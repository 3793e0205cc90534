use std::time::Duration;

use clap::Args;

use super::SchedulerConfig;

const HEADING: &str = "Scheduler options";

/// Command line arguments for constructing a [`SchedulerConfig`].
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliSchedulerConfig {
    /// Seconds between two attempts to prove the next block.
    #[arg(
        long,
        help_heading = HEADING,
        env = "PROVER_TICK_INTERVAL_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub tick_interval_secs: u64,
}

impl From<CliSchedulerConfig> for SchedulerConfig {
    fn from(cli: CliSchedulerConfig) -> Self {
        Self {
            interval: Duration::from_secs(cli.tick_interval_secs),
        }
    }
}
