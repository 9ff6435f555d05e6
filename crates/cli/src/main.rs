mod config;
mod error;
mod import;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use engine::Engine;
use records::{Accessor, SqliteStore};
use serde_json::Value;
use tracing::{debug, info};

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "sift.toml";

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Serialize stored records for a given accessor", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Record database, overriding the configured path
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serialize one record (prints `null` when the accessor may not see it)
    Show {
        /// Record type
        type_tag: String,
        /// Record id (parsed as JSON when possible, otherwise a string)
        id: String,
        /// Accessor descriptor as a JSON object
        #[arg(short, long)]
        accessor: Option<String>,
    },
    /// Serialize every record of a type
    List {
        /// Record type
        type_tag: String,
        /// Accessor descriptor as a JSON object
        #[arg(short, long)]
        accessor: Option<String>,
    },
    /// Validate the configuration
    Check,
    /// Load records and relations from a JSON document
    Import {
        /// Path of the JSON document
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .map_err(|e| Error::Config(format!("invalid log filter '{level}': {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    debug!(config = %cli.config.display(), "loaded configuration");
    let database = cli.database.clone().unwrap_or_else(|| config.database.clone());

    match cli.command {
        Commands::Show {
            type_tag,
            id,
            accessor,
        } => cmd_show(&config, &database, &type_tag, &id, accessor.as_deref()).await,
        Commands::List { type_tag, accessor } => {
            cmd_list(&config, &database, &type_tag, accessor.as_deref()).await
        }
        Commands::Check => cmd_check(&config),
        Commands::Import { file } => cmd_import(&database, &file),
    }
}

async fn cmd_show(
    config: &Config,
    database: &Path,
    type_tag: &str,
    id: &str,
    accessor: Option<&str>,
) -> Result<()> {
    let store = open_store(database)?;
    let accessor = parse_accessor(accessor)?;
    let value = show(config, &store, type_tag, &parse_id(id), accessor).await?;
    print_json(&value)
}

async fn cmd_list(
    config: &Config,
    database: &Path,
    type_tag: &str,
    accessor: Option<&str>,
) -> Result<()> {
    let store = open_store(database)?;
    let accessor = parse_accessor(accessor)?;
    let value = list(config, &store, type_tag, accessor).await?;
    print_json(&value)
}

/// Serialize one stored record; `null` when the accessor may not see it.
async fn show(
    config: &Config,
    store: &SqliteStore,
    type_tag: &str,
    id: &Value,
    accessor: Accessor,
) -> Result<Value> {
    let engine = build_engine(config)?;
    let record = store.fetch(type_tag, id, accessor.clone())?;
    let value = engine
        .serialize(&record, &config.options(accessor), store)
        .await?;
    Ok(value.unwrap_or(Value::Null))
}

/// Serialize every stored record of a type, leaving out hidden ones.
async fn list(
    config: &Config,
    store: &SqliteStore,
    type_tag: &str,
    accessor: Accessor,
) -> Result<Value> {
    let engine = build_engine(config)?;
    let collection = store.fetch_all(type_tag, accessor.clone())?;
    let values = engine
        .serialize_collection(&collection, &config.options(accessor), store)
        .await?;
    Ok(Value::Array(values))
}

fn build_engine(config: &Config) -> Result<Engine> {
    Ok(Engine::builder(config.registry()?)
        .config(config.engine.clone())
        .build())
}

fn cmd_check(config: &Config) -> Result<()> {
    config.registry()?;
    println!("configuration ok");
    Ok(())
}

fn cmd_import(database: &Path, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let document: import::Document = serde_json::from_str(&content)?;
    let store = SqliteStore::open(database)?;
    let summary = document.apply(&store)?;
    info!(
        records = summary.records,
        links = summary.links,
        "imported into {}",
        database.display()
    );
    println!(
        "imported {} records and {} links into {}",
        summary.records,
        summary.links,
        database.display()
    );
    Ok(())
}

fn open_store(path: &Path) -> Result<SqliteStore> {
    if !path.exists() {
        return Err(Error::DatabaseNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(SqliteStore::open(path)?)
}

fn parse_accessor(arg: Option<&str>) -> Result<Accessor> {
    let Some(arg) = arg else {
        return Ok(Accessor::anonymous());
    };
    let descriptor: Value = serde_json::from_str(arg).map_err(|e| Error::InvalidArgument {
        name: "accessor",
        reason: e.to_string(),
    })?;
    if !descriptor.is_object() {
        return Err(Error::InvalidArgument {
            name: "accessor",
            reason: "expected a JSON object".to_string(),
        });
    }
    Ok(Accessor::new(descriptor))
}

/// `42` is a number, `"42"` and `alice` are strings.
fn parse_id(arg: &str) -> Value {
    match serde_json::from_str::<Value>(arg) {
        Ok(value @ (Value::Number(_) | Value::String(_))) => value,
        _ => Value::String(arg.to_string()),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
