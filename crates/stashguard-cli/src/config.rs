//! CLI configuration

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stashguard_core::MoneyFormat;
use stashguard_policy::EngineConfig;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, Commands};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Policy engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// How amounts are rendered in explain output
    #[serde(default)]
    pub money_format: MoneyFormat,

    /// Record permitted actions into the stashes they touch
    #[serde(default = "default_true")]
    pub commit_permitted: bool,

    /// Where `check` writes the audit trail
    #[serde(default)]
    pub audit_path: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: impl AsRef<Path>, cli: &Cli) -> anyhow::Result<Self> {
        let config_path = config_path.as_ref();

        // Try to load from file, or use defaults
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("failed to read config {}", config_path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("invalid config {}", config_path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(cli);
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(format) = cli.money_format {
            self.money_format = format;
        }

        if let Some(max_depth) = cli.max_depth {
            self.engine.max_depth = max_depth;
        }

        if let Commands::Check {
            audit, no_commit, ..
        } = &cli.command
        {
            if let Some(audit) = audit {
                self.audit_path = Some(audit.clone());
            }
            if *no_commit {
                self.commit_permitted = false;
            }
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            money_format: MoneyFormat::default(),
            commit_permitted: true,
            audit_path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_missing_file_means_defaults() {
        let cli = Cli::parse_from(["stashguard", "kinds"]);
        let config = CliConfig::load("/nonexistent/stashguard.yaml", &cli).unwrap();

        assert_eq!(config.engine.max_depth, 64);
        assert_eq!(config.money_format, MoneyFormat::WithUnit);
        assert!(config.commit_permitted);
        assert!(config.audit_path.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "engine:\n  max_depth: 8\nmoney_format: plain\naudit_path: from-file.json"
        )
        .unwrap();

        let cli = Cli::parse_from([
            "stashguard",
            "--money-format",
            "symbolic",
            "check",
            "--scenario",
            "s.yaml",
            "--audit",
            "from-cli.json",
            "--no-commit",
        ]);
        let config = CliConfig::load(file.path(), &cli).unwrap();

        assert_eq!(config.engine.max_depth, 8);
        assert!(config.engine.check_target_stash);
        assert_eq!(config.money_format, MoneyFormat::Symbolic);
        assert_eq!(config.audit_path, Some(PathBuf::from("from-cli.json")));
        assert!(!config.commit_permitted);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "money_format: fancy").unwrap();

        let cli = Cli::parse_from(["stashguard", "kinds"]);
        assert!(CliConfig::load(file.path(), &cli).is_err());
    }
}
