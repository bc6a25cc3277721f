//! Leadbook import CLI
//!
//! Imports one CSV file of leads:
//! 1. Reads and decodes the file
//! 2. Groups rows by category (or uses `--category`)
//! 3. Writes categories, leads, links and competitors
//! 4. Prints the summary and any per-category failures

use anyhow::Context;
use clap::Parser;
use leadbook_common::{config::AppConfig, db::models::LeadStatus, DbPool, Repository, VERSION};
use leadbook_importer::{
    ImportError, ImportOptions, ImportOptionsBuilder, ImportReport, Importer, LeadStore,
    MemoryStore,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Import a CSV file of leads
#[derive(Parser, Debug)]
#[command(name = "import", version, about, long_about = None)]
struct Cli {
    /// CSV file with a header row
    file: PathBuf,

    /// Put every row into this category instead of grouping by column
    #[arg(long)]
    category: Option<String>,

    /// Column holding the category key
    #[arg(long, conflicts_with = "category")]
    column: Option<String>,

    /// Status given to the imported leads
    #[arg(long)]
    status: Option<String>,

    /// Parse and group against an empty in-memory store; nothing is written
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) if cli.dry_run => {
            eprintln!("import: no usable configuration ({}), using defaults", e);
            AppConfig::default()
        }
        Err(e) => return Err(e).context("failed to load configuration"),
    };

    init_tracing(&config);
    info!(version = VERSION, file = %cli.file.display(), dry_run = cli.dry_run, "Starting import");

    let mut builder = ImportOptionsBuilder::from_config(&config.import)?;
    if let Some(column) = &cli.column {
        builder = builder.group_by_column(column);
    }
    if let Some(category) = &cli.category {
        builder = builder.category(category);
    }
    if let Some(status) = &cli.status {
        let status: LeadStatus = status.parse()?;
        builder = builder.default_status(status);
    }
    let options = builder.build()?;

    let content = tokio::fs::read(&cli.file)
        .await
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let result = if cli.dry_run {
        run(MemoryStore::new(), options, &content).await
    } else {
        let db = DbPool::new(&config.database).await?;
        if config.database.create_schema {
            db.create_schema().await?;
        }
        run(Repository::new(db), options, &content).await
    };

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, cli.dry_run);
    }

    if !report.is_complete() {
        warn!(failed_steps = report.errors.len(), "Import finished with failures");
        std::process::exit(2);
    }

    Ok(())
}

async fn run<S: LeadStore>(
    store: S,
    options: ImportOptions,
    content: &[u8],
) -> Result<ImportReport, ImportError> {
    // stdout carries only the report
    Importer::new(store, options)
        .with_progress(|line| eprintln!("{}", line))
        .import(content)
        .await
}

fn print_report(report: &ImportReport, dry_run: bool) {
    if dry_run {
        println!("Dry run, nothing was written.");
    }

    for group in &report.groups {
        println!(
            "  {:<40} {:>6} leads{}",
            group.category,
            group.leads_imported,
            if group.new_category { "  (new)" } else { "" }
        );
    }

    println!("{}", report.summary());

    for error in &report.errors {
        println!("  failed: {}", error);
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
