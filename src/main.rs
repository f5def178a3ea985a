use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod aggregate;
mod config;
mod controller;
mod db;
mod filter;
mod models;
mod report;
mod server;
mod store;
mod tokenize;
mod views;

use config::DashboardConfig;
use controller::Controller;
use store::ReviewStore;

#[derive(Parser)]
#[command(name = "review-dashboard")]
#[command(about = "Consumer review analysis dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small realistic review sample
    Seed,
    /// Import prepared reviews (and optionally a topic table) from CSV
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        topics: Option<PathBuf>,
    },
    /// Write the analysis page as a markdown report
    Report {
        #[arg(long)]
        reviews: Option<PathBuf>,
        #[arg(long)]
        topics: Option<PathBuf>,
        #[arg(long, default_value = "analysis.md")]
        out: PathBuf,
    },
    /// Serve the dashboard over HTTP
    Serve {
        #[arg(long)]
        reviews: Option<PathBuf>,
        #[arg(long)]
        topics: Option<PathBuf>,
        #[arg(long)]
        bind: Option<String>,
    },
}

async fn connect(config: &DashboardConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

/// Reads the store once, from CSV when a path is configured and Postgres otherwise.
async fn load_store(config: &DashboardConfig) -> anyhow::Result<ReviewStore> {
    let store = match &config.reviews_csv {
        Some(path) => {
            let store = ReviewStore::from_csv(path, config.topics_csv.as_deref())
                .with_context(|| format!("failed to load review store from {}", path.display()))?;
            info!(
                reviews = store.len(),
                topics = store.topics().len(),
                path = %path.display(),
                "loaded review store from CSV"
            );
            store
        }
        None => {
            let pool = connect(config).await?;
            db::load_store(&pool).await?
        }
    };

    if store.is_empty() {
        warn!("review store is empty; every view will render without data");
    }
    Ok(store)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("review_dashboard=info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = DashboardConfig::from_env()?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv, topics } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &csv, topics.as_deref()).await?;
            println!("Inserted {inserted} reviews from {}.", csv.display());
        }
        Commands::Report {
            reviews,
            topics,
            out,
        } => {
            let config = config.with_overrides(reviews, topics, None);
            let store = load_store(&config).await?;
            let view = views::analysis(&store);
            let report =
                report::build_report(&view, store.len(), store.vendor_options().len());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve {
            reviews,
            topics,
            bind,
        } => {
            let config = config.with_overrides(reviews, topics, bind);
            let addr = config.bind_addr()?;
            let store = Arc::new(load_store(&config).await?);
            let controller = Arc::new(Controller::new(
                store,
                config.max_table_rows,
                config.sessions,
            ));
            server::serve(addr, server::AppState::new(controller)).await?;
        }
    }

    Ok(())
}
