//! Operator CLI for the sanctions store.
//!
//! Prints one JSON object per invocation so scripts can parse the output.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sanctions::lifecycle;
use sanctions::{
    resolve, seed_pages, PostgresStore, Resolution, Sanction, SanctionEvent, SanctionStore,
    SanctionsConfig, SanctionStatus, Tally, TemplatePage,
};

#[derive(Parser)]
#[command(name = "sanctions_cli")]
#[command(about = "Inspect and maintain the sanctions store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tables and print the template pages to seed
    Migrate,

    /// Print the template pages to seed without touching the database
    Templates,

    /// Resolve a topic title to its sanction
    Resolve { title: String },

    /// List sanctions still taking votes
    Open,

    /// List open sanctions whose voting window has passed
    Due,

    /// Close a sanction with the given outcome
    Close {
        title: String,
        #[arg(value_enum)]
        outcome: Outcome,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Outcome {
    Expired,
    Enacted,
}

impl From<Outcome> for SanctionStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Expired => SanctionStatus::Expired,
            Outcome::Enacted => SanctionStatus::Enacted,
        }
    }
}

// ============================================================================
// JSON Response Types
// ============================================================================

#[derive(Serialize)]
struct Response {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sanctions: Option<Vec<SanctionSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    templates: Option<Vec<TemplatePage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<SanctionEvent>,
}

impl Response {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
            sanctions: None,
            templates: None,
            event: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::ok()
        }
    }
}

#[derive(Serialize)]
struct SanctionSummary {
    topic: String,
    #[serde(flatten)]
    sanction: Sanction,
    tally: Tally,
}

impl From<Sanction> for SanctionSummary {
    fn from(sanction: Sanction) -> Self {
        Self {
            topic: sanction.id.topic_title(),
            tally: sanction.tally(),
            sanction,
        }
    }
}

fn output(resp: Response) -> Result<()> {
    println!("{}", serde_json::to_string(&resp)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,sanctions=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = SanctionsConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Templates => cmd_templates(&config),
        Commands::Migrate => cmd_migrate(&config).await,
        Commands::Resolve { title } => cmd_resolve(&title).await,
        Commands::Open => cmd_open().await,
        Commands::Due => cmd_due().await,
        Commands::Close { title, outcome } => cmd_close(&title, outcome.into()).await,
    }
}

async fn get_store() -> Result<PostgresStore> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    PostgresStore::new(&database_url)
        .await
        .context("Failed to connect to database")
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_templates(config: &SanctionsConfig) -> Result<()> {
    output(Response {
        templates: Some(seed_pages(config)),
        ..Response::ok()
    })
}

async fn cmd_migrate(config: &SanctionsConfig) -> Result<()> {
    let store = get_store().await?;
    store.migrate().await.context("Failed to create sanctions schema")?;

    output(Response {
        message: Some("Sanctions schema ready".to_string()),
        templates: Some(seed_pages(config)),
        ..Response::ok()
    })
}

async fn cmd_resolve(title: &str) -> Result<()> {
    let store = get_store().await?;

    match resolve(&store, &title.to_lowercase()).await? {
        Resolution::Sanction(sanction) => output(Response {
            sanctions: Some(vec![sanction.into()]),
            ..Response::ok()
        }),
        Resolution::NotASanction => output(Response::failed(format!(
            "'{}' is not a sanction topic",
            title
        ))),
    }
}

async fn cmd_open() -> Result<()> {
    let store = get_store().await?;
    let open = store.list_open(Utc::now()).await?;

    output(Response {
        sanctions: Some(open.into_iter().map(Into::into).collect()),
        ..Response::ok()
    })
}

async fn cmd_due() -> Result<()> {
    let store = get_store().await?;
    let due = store.list_awaiting_closure(Utc::now()).await?;

    output(Response {
        sanctions: Some(due.into_iter().map(Into::into).collect()),
        ..Response::ok()
    })
}

async fn cmd_close(title: &str, status: SanctionStatus) -> Result<()> {
    let store = get_store().await?;

    let sanction = match resolve(&store, &title.to_lowercase()).await? {
        Resolution::Sanction(sanction) => sanction,
        Resolution::NotASanction => {
            return output(Response::failed(format!(
                "'{}' is not a sanction topic",
                title
            )))
        }
    };

    match lifecycle::close(&store, sanction.id, status, Utc::now()).await {
        Ok((closed, event)) => output(Response {
            message: Some(format!("Closed as {}", status)),
            sanctions: Some(vec![closed.into()]),
            event: Some(event),
            ..Response::ok()
        }),
        Err(e) => output(Response::failed(e.to_string())),
    }
}
