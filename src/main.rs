use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use geogallery::{
    filter_records, FileSystem, GalleryConfig, LocalFileSystem, MediaRecord, RecordStore,
    SqliteRecordStore,
};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gallery-db")]
#[command(about = "Inspect and maintain the geogallery record database")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "geogallery.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List records, optionally filtered by name
    List {
        #[arg(long, help = "Case-insensitive name filter")]
        query: Option<String>,
        #[arg(long, help = "Print records as JSON")]
        json: bool,
    },
    /// Show one record
    Show {
        id: i64,
        #[arg(long, help = "Print the record as JSON")]
        json: bool,
    },
    /// Rename a record
    Rename { id: i64, name: String },
    /// Permanently delete a record
    Delete { id: i64 },
    /// Delete every record
    Clear {
        #[arg(long, help = "Confirm deleting every record")]
        yes: bool,
    },
    /// Report records whose backing file is missing or empty
    CheckFiles,
    /// Print the effective configuration in TOML format
    PrintConfig,
    /// Validate configuration and exit
    ValidateConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = GalleryConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    match args.command {
        Command::PrintConfig => print!("{}", config.to_toml()?),
        Command::ValidateConfig => {
            if let Err(e) = config.validate() {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Configuration is valid");
        }
        Command::List { query, json } => {
            let store = open_store(&config).await?;
            let records = store.list_all().await?;
            let records = filter_records(&records, query.as_deref().unwrap_or(""));
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    print_record(record);
                }
                println!("{} record(s)", records.len());
            }
        }
        Command::Show { id, json } => {
            let store = open_store(&config).await?;
            match store.get_by_id(id).await? {
                Some(record) if json => println!("{}", serde_json::to_string_pretty(&record)?),
                Some(record) => print_record(&record),
                None => bail!("Record {} not found", id),
            }
        }
        Command::Rename { id, name } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("Name must not be empty");
            }
            let store = open_store(&config).await?;
            match store.update(id, name).await? {
                0 => bail!("Record {} not found, nothing renamed", id),
                _ => println!("Renamed record {} to {}", id, name),
            }
        }
        Command::Delete { id } => {
            let store = open_store(&config).await?;
            match store.delete(id).await? {
                0 => bail!("Record {} not found, nothing deleted", id),
                _ => println!("Deleted record {}", id),
            }
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("Refusing to delete every record without --yes");
            }
            let store = open_store(&config).await?;
            let removed = store.clear().await?;
            println!("Deleted {} record(s)", removed);
        }
        Command::CheckFiles => {
            let store = open_store(&config).await?;
            check_files(&store).await?;
        }
    }

    Ok(())
}

/// Validate the configuration, then open and initialize its record database
async fn open_store(config: &GalleryConfig) -> Result<SqliteRecordStore> {
    config.validate().context("Invalid configuration")?;

    let store = SqliteRecordStore::open(
        &config.storage.database_path,
        Duration::from_millis(config.storage.busy_timeout_ms),
    )?;
    store.initialize().await?;
    info!("Using record database {}", config.storage.database_path);

    Ok(store)
}

async fn check_files(store: &SqliteRecordStore) -> Result<()> {
    let fs = LocalFileSystem;
    let records = store.list_all().await?;
    let mut problems = 0;

    for record in &records {
        let status = match fs.get_info(&record.file_path).await {
            Ok(info) if !info.exists => Some("missing".to_string()),
            Ok(info) if info.size == 0 => Some("empty".to_string()),
            Ok(_) => None,
            Err(e) => Some(format!("unreadable ({})", e)),
        };

        if let Some(status) = status {
            problems += 1;
            warn!("Record {} file {}: {}", record.id, record.file_path, status);
            println!("{:>6}  {:<12}  {}", record.id, status, record.file_path);
        }
    }
    println!("{} of {} record(s) have file problems", problems, records.len());

    Ok(())
}

fn print_record(record: &MediaRecord) {
    println!(
        "{:>6}  {:<40}  {}  {:>10.5} {:>11.5}  {}",
        record.id,
        record.name,
        record.timestamp,
        record.latitude,
        record.longitude,
        record.file_path
    );
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("geogallery={},gallery_db={}", log_level, log_level))
    });

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .with_writer(std::io::stderr)
            .boxed(),
        Some("compact") | None => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}
