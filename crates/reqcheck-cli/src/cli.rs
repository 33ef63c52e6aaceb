use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reqcheck")]
#[command(
    author,
    version,
    about = "Render, resolve and evaluate requirement compliance expressions"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render expressions of a document to display strings
    Render {
        /// Expression document (YAML)
        document: PathBuf,

        /// Render only this expression
        #[arg(short, long)]
        name: Option<String>,

        /// Render as if nested under another expression
        #[arg(long)]
        nested: bool,

        /// Render all free expressions as one AND-joined constraint
        #[arg(long, conflicts_with = "name")]
        combined: bool,
    },

    /// List the free (top-level) expressions of a document
    TopLevel {
        /// Expression document (YAML)
        document: PathBuf,
    },

    /// List the expressions a consumer editing an expression may pick from
    Scope {
        /// Expression document (YAML)
        document: PathBuf,

        /// Expression being edited
        #[arg(short, long)]
        name: String,
    },

    /// Evaluate expressions against leaf verdicts
    Evaluate {
        /// Expression document (YAML)
        document: PathBuf,

        /// Leaf verdicts (YAML map of leaf id to true/false)
        #[arg(short, long)]
        results: PathBuf,

        /// Evaluate only this expression; defaults to every free one
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Replay a timed raw compliance scenario through the engine
    Replay {
        /// Scenario file (YAML)
        scenario: PathBuf,

        /// Engine configuration file
        #[arg(short, long, default_value = "./reqcheck.yaml")]
        config: PathBuf,

        /// Override the settle delay
        #[arg(long)]
        settle_delay_ms: Option<u64>,

        /// Print state changes as JSON lines
        #[arg(long)]
        json: bool,
    },
}
