//! # CLI Module
//!
//! Command-line interface for Trialcast.
//!
//! Every subcommand is a plain `cmd_*` function so it can be driven from tests
//! without going through argument parsing.

mod commands;

pub use commands::{ServeConfig, cmd_check, cmd_pack, cmd_predict, cmd_serve};

use crate::AppError;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use trialcast_core::TrialForm;

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

#[derive(Debug, Parser)]
#[command(name = "trialcast", version, about = "Clinical trial outcome predictor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the prediction form and the JSON API
    Serve {
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: SocketAddr,
        /// Directory holding model/preprocessor and model/random_forest (.json, or .bin from `pack`)
        #[arg(long, default_value = ".")]
        artifacts: PathBuf,
        /// Requests per second across all routes (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        rate_limit: u32,
    },

    /// Predict the outcome of one trial
    Predict {
        #[command(flatten)]
        trial: TrialArgs,
        #[arg(long, default_value = ".")]
        artifacts: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Load and validate the artifacts
    Check {
        #[arg(long, default_value = ".")]
        artifacts: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Convert a JSON artifact to the binary format (write it as model/<name>.bin to load it)
    Pack {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

/// The seven trial fields, taken as text and validated like a form post.
#[derive(Debug, Clone, Args)]
pub struct TrialArgs {
    #[arg(long)]
    pub phase: String,
    #[arg(long)]
    pub sponsor_type: String,
    #[arg(long)]
    pub gender: String,
    #[arg(long)]
    pub condition: String,
    #[arg(long)]
    pub location: String,
    #[arg(long, default_value = "1")]
    pub enrollment: String,
    #[arg(long, default_value = "1")]
    pub duration: String,
}

impl From<TrialArgs> for TrialForm {
    fn from(args: TrialArgs) -> Self {
        Self {
            phase: args.phase,
            sponsor_type: args.sponsor_type,
            gender: args.gender,
            condition: args.condition,
            location: args.location,
            enrollment: args.enrollment,
            duration: args.duration,
        }
    }
}

impl Cli {
    /// Dispatch to the selected command.
    pub async fn run(self) -> Result<(), AppError> {
        match self.command {
            Commands::Serve {
                bind,
                artifacts,
                rate_limit,
            } => {
                cmd_serve(ServeConfig {
                    bind,
                    artifacts,
                    rate_limit,
                })
                .await
            }
            Commands::Predict {
                trial,
                artifacts,
                json,
            } => cmd_predict(&artifacts, &TrialForm::from(trial), json).map(|_| ()),
            Commands::Check { artifacts, json } => cmd_check(&artifacts, json).map(|_| ()),
            Commands::Pack { input, output } => cmd_pack(&input, &output).map(|_| ()),
        }
    }
}
