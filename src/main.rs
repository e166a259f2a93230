//! poolweave - unit-of-work demo over an in-memory multi-model store
//!
//! This is the main entry point for the poolweave command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use serde_json::json;
use tracing::Level;

use poolweave::service::{PersistConfig, PersistService};
use poolweave::storage::{MemoryStorage, StorageError, StorageResult, TxType, MEMORY_SCHEME};
use poolweave::transaction::{kinds, Classify, ErrorKind, KindTable, TransactionError};

static REJECTED: ErrorKind = ErrorKind::child("rejected", &kinds::ANY);

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("order rejected: {0}")]
    Rejected(String),
}

impl Classify for DemoError {
    fn kind(&self) -> &'static ErrorKind {
        match self {
            DemoError::Transaction(e) => e.kind(),
            DemoError::Storage(e) => e.kind(),
            DemoError::Rejected(_) => &REJECTED,
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    // Parse simple command line args.
    let mut database = String::from("demo");
    let mut user = String::from("admin");
    let mut password = String::from("admin");
    let mut tx_type: Option<TxType> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--database" => {
                i += 1;
                if i < args.len() {
                    database = args[i].clone();
                }
            }
            "-u" | "--user" => {
                i += 1;
                if i < args.len() {
                    user = args[i].clone();
                }
            }
            "-p" | "--password" => {
                i += 1;
                if i < args.len() {
                    password = args[i].clone();
                }
            }
            "-t" | "--tx-type" => {
                i += 1;
                if i < args.len() {
                    match args[i].parse() {
                        Ok(parsed) => tx_type = Some(parsed),
                        Err(e) => {
                            eprintln!("Invalid transaction type: {}", e);
                            return ExitCode::FAILURE;
                        }
                    }
                }
            }
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "-v" | "--verbose" => {
                verbose = true;
            }
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            "--version" => {
                println!("poolweave v0.1.0");
                return ExitCode::SUCCESS;
            }
            arg => {
                eprintln!("Unknown option: {}", arg);
                return ExitCode::FAILURE;
            }
        }
        i += 1;
    }

    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let config = match config_path {
        Some(path) => {
            let table = KindTable::new().with(&REJECTED);
            match PersistConfig::from_json_file(&path, &table) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error reading {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => PersistConfig::new(format!("{}:{}", MEMORY_SCHEME, database), user, password),
    };

    let storage = match open_storage(&config) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let config = match tx_type {
        Some(tx_type) => config.tx_type(tx_type),
        None => config,
    };

    let service = PersistService::with_memory_pools(config, &storage);
    if let Err(e) = service.start() {
        eprintln!("Error starting persist service: {}", e);
        return ExitCode::FAILURE;
    }

    let result = run_demo(&service, &storage);
    let stopped = service.stop();

    match result.and(stopped.map_err(DemoError::from)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// In-memory store named after the database in the configured uri.
fn open_storage(config: &PersistConfig) -> StorageResult<MemoryStorage> {
    let (_, name) = config.credentials.split_uri()?;
    Ok(MemoryStorage::new(name))
}

fn print_help() {
    println!("poolweave - unit-of-work transactions across connection pools");
    println!();
    println!("Usage: poolweave [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --database NAME    In-memory database name (default: demo, ignored with -c)");
    println!("  -u, --user USER        Database user (default: admin)");
    println!("  -p, --password PASS    Database password (default: admin)");
    println!("  -t, --tx-type TYPE     optimistic, pessimistic or notx");
    println!("  -c, --config FILE      Load connection and transaction settings from JSON");
    println!("  -v, --verbose          Enable debug logging");
    println!("  -h, --help             Show this help message");
    println!("  --version              Show version");
    println!();
    println!("Examples:");
    println!("  poolweave                     Run the demo with default settings");
    println!("  poolweave -t notx -v          Run without transactions, log every pool step");
}

/// One committed unit of work touching every pool, then one that fails.
fn run_demo(service: &PersistService, storage: &MemoryStorage) -> Result<(), DemoError> {
    let template = service.template();

    template.run(|| place_order(service, "o1", 2))?;
    println!(
        "committed: {} order(s), {} audit record(s)",
        storage.count("Order"),
        storage.count("Audit")
    );

    match template.run(|| {
        place_order(service, "o2", 0)?;
        Err::<(), _>(DemoError::Rejected("quantity must be positive".into()))
    }) {
        Err(DemoError::Rejected(reason)) => println!("rejected unit of work: {}", reason),
        other => other?,
    }
    println!(
        "after rejection: {} order(s), {} audit record(s)",
        storage.count("Order"),
        storage.count("Audit")
    );

    Ok(())
}

fn place_order(service: &PersistService, id: &str, quantity: u32) -> Result<(), DemoError> {
    service
        .documents()?
        .get()?
        .save("Audit", id, json!({"event": "order placed", "quantity": quantity}))?;

    #[cfg(feature = "object")]
    {
        let orders = service.objects()?.get()?;
        orders.save("Order", id, &json!({"id": id, "quantity": quantity}))?;
    }

    #[cfg(feature = "graph")]
    {
        let graph = service.graphs()?.get()?;
        graph.add_vertex("customer", json!({"name": "demo"}))?;
        graph.add_vertex(id, json!({"quantity": quantity}))?;
        graph.add_edge("customer", "placed", id)?;
    }

    Ok(())
}
