//! # Complaint Desk CLI (`desk`)
//!
//! The `desk` binary is the primary interface for Complaint Desk. It
//! provides commands for database initialization, running the HTTP API,
//! the console chat assistant, one-shot knowledge questions, and direct
//! complaint lookup.
//!
//! ## Usage
//!
//! ```bash
//! desk --config ./config/desk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `desk init` | Create the SQLite database and complaints table |
//! | `desk serve` | Start the HTTP API server |
//! | `desk chat` | Interactive console assistant |
//! | `desk ask "<question>"` | One-shot question against the knowledge base |
//! | `desk get <id>` | Print a stored complaint |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use complaint_desk::controller::render_complaint;
use complaint_desk::rag::KnowledgePipeline;
use complaint_desk::service::{ComplaintService, ServiceError};
use complaint_desk::store::SqliteComplaintStore;
use complaint_desk::{chat_cli, config, db, migrate, server};

/// Complaint Desk — a complaint filing and retrieval service with a
/// document-grounded support assistant.
#[derive(Parser)]
#[command(
    name = "desk",
    about = "Complaint Desk — file and retrieve complaints, ask the knowledge base",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/desk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the complaints table. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Start the HTTP API server.
    ///
    /// Serves the complaint endpoints and the sessioned chat endpoint on
    /// the address configured in `[server].bind`.
    Serve,

    /// Interactive console assistant.
    ///
    /// Recognizes `file`, `fetch <id>`, bare complaint ids, and `exit`;
    /// anything else is answered from the knowledge base.
    Chat,

    /// Ask the knowledge base a one-shot question.
    Ask {
        /// The question text.
        question: String,
    },

    /// Print a stored complaint by id.
    Get {
        /// Complaint id (case-insensitive).
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Chat => {
            chat_cli::run_chat(&cfg).await?;
        }
        Commands::Ask { question } => {
            let pipeline = KnowledgePipeline::build(&cfg).await?;
            let answer = pipeline.answer(&question).await?;
            println!("{}", answer);
        }
        Commands::Get { id } => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let service = ComplaintService::new(Arc::new(SqliteComplaintStore::new(pool)));
            match service.get(&id).await {
                Ok(complaint) => println!("{}", render_complaint(&complaint)),
                Err(ServiceError::NotFound(id)) => {
                    eprintln!("Error: complaint not found: {}", id);
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
