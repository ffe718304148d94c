//! clbprep CLI — assess French practice answers from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use clbprep_core::Skill;

mod commands;
mod submission;

#[derive(Parser)]
#[command(
    name = "clbprep",
    version,
    about = "AI feedback for TEF/TCF Canada French practice"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess one submission
    Assess {
        /// Skill: speaking, writing, reading or listening
        skill: Skill,

        /// Submission JSON file
        #[arg(long)]
        input: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Assess every `<skill>-*.json` submission in a directory
    Batch {
        /// Directory of submissions
        #[arg(long)]
        dir: PathBuf,

        /// Max concurrent assessments (defaults to the config value)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Write all results as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a submission without calling a model
    Validate {
        /// Skill: speaking, writing, reading or listening
        skill: Skill,

        /// Submission JSON file
        #[arg(long)]
        input: PathBuf,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and sample submissions
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "clbprep=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assess {
            skill,
            input,
            format,
            config,
        } => commands::assess::execute(skill, input, format, config).await,
        Commands::Batch {
            dir,
            parallelism,
            output,
            config,
        } => commands::batch::execute(dir, parallelism, output, config).await,
        Commands::Validate { skill, input } => commands::validate::execute(skill, input),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
