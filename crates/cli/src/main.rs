//! EDSum CLI — the main entry point.
//!
//! Commands:
//! - `onboard`   — Initialize config directory and default config
//! - `status`    — Show configuration and record store health
//! - `patients`  — List known patients from the record store
//! - `templates` — Show the instruction template catalog
//! - `summarize` — Fetch, compose and generate a summary in one go
//! - `session`   — Interactive fetch → edit → finalize workflow

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "edsum",
    about = "EDSum — emergency department record summarizer",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Show configuration and store status
    Status,

    /// List known patients with their record span
    Patients {
        /// Show at most this many patients
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List templates, styles and focus areas
    Templates {
        /// Print the composed instruction for this template
        #[arg(long, value_name = "TEMPLATE")]
        show: Option<String>,

        /// Style used with --show
        #[arg(long, default_value = "bulleted")]
        style: String,
    },

    /// Generate a summary for one patient without interaction
    Summarize(commands::summarize::SummarizeArgs),

    /// Interactive review session
    Session {
        /// Fetch this patient right away
        patient: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Patients { limit } => commands::patients::run(limit).await?,
        Commands::Templates { show, style } => commands::templates::run(show, style).await?,
        Commands::Summarize(args) => commands::summarize::run(args).await?,
        Commands::Session { patient } => commands::session::run(patient).await?,
    }

    Ok(())
}
