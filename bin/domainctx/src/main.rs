mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "domainctx")]
#[command(about = "Per-domain navigation knowledge for browsing agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List domains with stored context
    List,

    /// Print the stored context of a domain
    Show {
        /// Domain or URL
        target: String,
    },

    /// Run the get_domain_context tool as the agent would on a page
    Context {
        /// Current page URL
        url: String,
    },

    /// Reset the context store to an empty document
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Drive a tracker from recorded step events (one JSON object per line)
    Replay {
        /// JSONL file with step events
        events: PathBuf,

        /// Task description given to the summarizer
        #[arg(short, long)]
        task: Option<String>,

        /// Final verdict as JSON, e.g. '{"verdict": true}'
        #[arg(long)]
        verdict: Option<String>,
    },

    /// Show the effective domain context settings
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::List => {
            commands::contexts::list().await?;
        }
        Commands::Show { target } => {
            commands::contexts::show(&target).await?;
        }
        Commands::Context { url } => {
            commands::contexts::context(&url).await?;
        }
        Commands::Reset { force } => {
            commands::contexts::reset(force).await?;
        }
        Commands::Replay {
            events,
            task,
            verdict,
        } => {
            commands::replay::run(&events, task.as_deref(), verdict.as_deref()).await?;
        }
        Commands::Config => {
            commands::config_cmd::show().await?;
        }
    }

    Ok(())
}
