use clap::{Parser, Subcommand};
use stashguard_core::MoneyFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stashguard")]
#[command(
    author,
    version,
    about = "Evaluate stash rule sets against proposed ledger actions"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "stashguard.yaml")]
    pub config: PathBuf,

    /// Money output format: plain, with_unit or symbolic
    #[arg(long, global = true, value_parser = parse_money_format)]
    pub money_format: Option<MoneyFormat>,

    /// Maximum condition tree depth
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Describe a rule set without evaluating it
    Explain {
        /// Rule set file (JSON or YAML)
        #[arg(short, long)]
        policy: PathBuf,

        /// Print the raw explain entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the proposed actions of a scenario file
    Check {
        /// Scenario file (JSON or YAML)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Write the audit trail to this path
        #[arg(short, long)]
        audit: Option<PathBuf>,

        /// Decide actions without recording the permitted ones
        #[arg(long)]
        no_commit: bool,

        /// Print the Prometheus exposition after the run
        #[arg(long)]
        print_metrics: bool,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the registered rule kinds
    Kinds,
}

fn parse_money_format(s: &str) -> Result<MoneyFormat, String> {
    s.parse().map_err(|e: stashguard_core::Error| e.to_string())
}
