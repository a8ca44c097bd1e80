//! specplan CLI: the main entry point.
//!
//! Commands:
//! - `plan`            - Turn a specification into an execution plan
//! - `summarize-rule`  - Summarize a rule document into an index entry
//! - `build-index`     - Summarize rule documents into a rules index
//! - `summarize-code`  - Summarize a source file
//! - `config`          - Show, locate or validate configuration

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "specplan",
    about = "specplan: turn a specification into a validated execution plan",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.specplan/config.toml)
    #[arg(short, long, global = true, env = "SPECPLAN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce a plan from a specification and a rules index
    Plan {
        /// Specification JSON file
        #[arg(long)]
        spec: PathBuf,

        /// Rules index JSON file
        #[arg(long)]
        rules: PathBuf,

        /// Workspace root the model may read files from
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Summarize one rule document into a rules index entry
    SummarizeRule {
        /// The rule file
        file: PathBuf,
    },

    /// Summarize rule documents into a rules index
    BuildIndex {
        /// Rule files, in index order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the index here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Summarize a source file in a few sentences
    SummarizeCode {
        /// The source file
        file: PathBuf,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the default config file location
    Path,
    /// Validate the configuration and report problems
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Plan {
            spec,
            rules,
            root,
            out,
        } => {
            commands::plan::run(
                config_path,
                commands::plan::PlanArgs {
                    spec,
                    rules,
                    root,
                    out,
                },
            )
            .await
        }
        Commands::SummarizeRule { file } => commands::summarize::rule(config_path, &file).await,
        Commands::BuildIndex { files, out } => {
            commands::summarize::index(config_path, &files, out.as_deref()).await
        }
        Commands::SummarizeCode { file } => commands::summarize::code(config_path, &file).await,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config_cmd::show(config_path),
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Validate => commands::config_cmd::validate(config_path),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
