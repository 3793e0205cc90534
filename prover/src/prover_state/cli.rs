//! CLI arguments for locating the proving and verifying keys.

use std::path::PathBuf;

use clap::{Args, ValueHint};

use super::KeyPaths;

/// Help heading for the key file arguments.
const HEADING: &str = "Proving key options";

/// Command line arguments for constructing [`KeyPaths`].
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CliProverStateConfig {
    /// Path of the serialized proving key.
    #[arg(long, help_heading = HEADING, env = "PROVER_PROVING_KEY", value_hint = ValueHint::FilePath, default_value = "keys/block.pk")]
    pub proving_key: PathBuf,
    /// Path of the serialized verifying key.
    #[arg(long, help_heading = HEADING, env = "PROVER_VERIFYING_KEY", value_hint = ValueHint::FilePath, default_value = "keys/block.vk")]
    pub verifying_key: PathBuf,
}

impl CliProverStateConfig {
    pub fn into_key_paths(self) -> KeyPaths {
        self.into()
    }
}

impl From<CliProverStateConfig> for KeyPaths {
    fn from(cli: CliProverStateConfig) -> Self {
        Self {
            proving_key: cli.proving_key,
            verifying_key: cli.verifying_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[clap(flatten)]
        keys: CliProverStateConfig,
    }

    #[test]
    fn parses_key_paths() {
        let cli = TestCli::parse_from([
            "test",
            "--proving-key",
            "/k/a.pk",
            "--verifying-key",
            "/k/a.vk",
        ]);
        assert_eq!(
            cli.keys.into_key_paths(),
            KeyPaths {
                proving_key: "/k/a.pk".into(),
                verifying_key: "/k/a.vk".into(),
            }
        );
    }
}
