use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fleet_status::config::{load_config, load_or_default};
use fleet_status::{
    load_requests_csv, load_vehicles_csv, render_text, BatchProcessor, BatchReport,
    CanonicalStatus, DuplicateResolver, EventAuditLog, FleetConfig, InMemoryRegistry, NullAudit,
    SqliteRegistry, StatusUpdateRequest, VehicleRegistry, VehicleResolver,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fleet-status", version, about = "Match vehicle names and apply condition updates")]
struct Cli {
    /// Config file (default: ./fleet-status.toml if present)
    #[arg(long, global = true, env = "FLEET_STATUS_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database (overrides storage.database)
    #[arg(long, global = true, env = "FLEET_STATUS_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import vehicles from a CSV file (name,status[,last_maintenance])
    Import { csv: PathBuf },

    /// Apply status updates from a CSV file (vehicle_name,status)
    Update {
        requests: PathBuf,

        /// Label recorded in the audit log
        #[arg(long, default_value = "cli")]
        source: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve one vehicle name against the registry
    Resolve { name: String },

    /// Search the registry (keyword hits count as results)
    Search {
        query: String,

        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// List registry rows that share a normalized name
    Duplicates,

    /// Vehicle counts per status
    Stats,

    /// Run a built-in batch against an in-memory registry
    Demo {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_or_default(Path::new("."))?,
    };
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.storage.database.clone());

    match cli.cmd {
        Command::Import { csv } => cmd_import(&config, &db_path, &csv),
        Command::Update {
            requests,
            source,
            json,
        } => cmd_update(&config, &db_path, &requests, &source, json),
        Command::Resolve { name } => cmd_resolve(&config, &db_path, &name),
        Command::Search { query, limit } => cmd_search(&config, &db_path, &query, limit),
        Command::Duplicates => cmd_duplicates(&db_path),
        Command::Stats => cmd_stats(&db_path),
        Command::Demo { json } => cmd_demo(&config, json),
    }
}

fn cmd_import(config: &FleetConfig, db_path: &Path, csv: &Path) -> Result<()> {
    let vehicles = load_vehicles_csv(csv, &config.statuses.normalizer())?;
    let registry = SqliteRegistry::open(db_path)?;
    let inserted = registry.insert_vehicles(&vehicles)?;

    println!("Imported {} vehicles into {}", inserted, db_path.display());
    Ok(())
}

fn cmd_update(
    config: &FleetConfig,
    db_path: &Path,
    requests_path: &Path,
    source: &str,
    json: bool,
) -> Result<()> {
    let requests = load_requests_csv(requests_path)
        .with_context(|| format!("Failed to read requests from {}", requests_path.display()))?;
    if requests.is_empty() {
        bail!("no requests in {}", requests_path.display());
    }

    let registry = open_existing(db_path)?;
    let audit = EventAuditLog::new(registry.connection(), "cli");
    let processor = BatchProcessor::with_config(&registry, &audit, config);

    let report = processor.process_batch(&requests, source);
    print_report(&report, json)
}

fn cmd_resolve(config: &FleetConfig, db_path: &Path, name: &str) -> Result<()> {
    let registry = open_existing(db_path)?;
    let resolver = VehicleResolver::with_config(&registry, config.matching.clone());

    let result = resolver.resolve(name)?;
    println!("{}", result.summary());
    if result.has_duplicates() {
        println!("  {} registry rows share this name", result.duplicates.len());
    }
    for candidate in &result.alternatives {
        println!(
            "  alternative: {} (#{}, {}, {:.0}%)",
            candidate.record.name,
            candidate.record.id,
            candidate.match_type.as_str(),
            candidate.score * 100.0
        );
    }
    Ok(())
}

fn cmd_search(config: &FleetConfig, db_path: &Path, query: &str, limit: usize) -> Result<()> {
    let registry = open_existing(db_path)?;
    let resolver = VehicleResolver::with_config(&registry, config.matching.clone());

    let hits = resolver.search(query, limit)?;
    if hits.is_empty() {
        println!("No vehicles match '{}'", query);
    }
    for hit in hits {
        println!(
            "{} (#{}, {}) {} {:.0}%",
            hit.record.name,
            hit.record.id,
            hit.record.status,
            hit.match_type.as_str(),
            hit.score * 100.0
        );
    }
    Ok(())
}

fn cmd_duplicates(db_path: &Path) -> Result<()> {
    let registry = open_existing(db_path)?;
    let groups = DuplicateResolver::new(&registry).find_all_duplicate_groups()?;

    if groups.is_empty() {
        println!("No duplicate vehicle names");
    }
    for group in groups {
        println!("{}", group.summary());
    }
    Ok(())
}

fn cmd_stats(db_path: &Path) -> Result<()> {
    let registry = open_existing(db_path)?;
    println!("{}", registry.get_statistics()?.summary());
    Ok(())
}

fn cmd_demo(config: &FleetConfig, json: bool) -> Result<()> {
    let registry = InMemoryRegistry::from_vehicles(&[
        ("BMW 4-Series", CanonicalStatus::Good),
        ("Audi RS6", CanonicalStatus::Average),
        ("Mercedes G63AMG", CanonicalStatus::Poor),
        ("Porsche Cayenne", CanonicalStatus::Average),
    ]);

    let requests = vec![
        StatusUpdateRequest::new("bmw 4-series", "average"),
        StatusUpdateRequest::new("Mercedes G63", "excellent"),
        StatusUpdateRequest::new("Audi RS6", "ok"),
        StatusUpdateRequest::new("Porsche Panamera", "good"),
        StatusUpdateRequest::new("Toyota Supra", "poor"),
    ];

    let processor = BatchProcessor::with_config(&registry, &NullAudit, config);
    let report = processor.process_batch(&requests, "demo");
    print_report(&report, json)?;

    println!("\n{}", registry.get_statistics()?.summary());
    Ok(())
}

fn open_existing(db_path: &Path) -> Result<SqliteRegistry> {
    if !db_path.exists() {
        bail!(
            "database not found: {} (run `fleet-status import <csv>` first)",
            db_path.display()
        );
    }
    SqliteRegistry::open(db_path)
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}
