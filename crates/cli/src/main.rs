mod config;
mod error;

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ledger::stix::StixLedger;
use ledger::{CtiMetadata, MetadataLedger};
use policy::StaticIdentity;
use serde::Serialize;
use sha2::{Digest, Sha256};
use storage::SqliteState;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "ctiledger.toml";
const CTI_NAMESPACE: &str = "cti";
const STIX_NAMESPACE: &str = "stix";

#[derive(Parser)]
#[command(name = "ctiledger")]
#[command(
    about = "Access-controlled ledger for cyber threat intelligence metadata",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Config file (default: ./ctiledger.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Act with this role instead of the configured one
    #[arg(short, long, global = true)]
    role: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Ledger(LedgerCommands),
    /// STIX 2.1 objects
    Stix {
        #[command(subcommand)]
        command: StixCommands,
    },
}

#[derive(Subcommand)]
enum LedgerCommands {
    /// Write the seed records (HeadOfOperations only)
    Init,
    /// Submit new CTI metadata
    Create(CreateArgs),
    /// Show one record
    Read {
        /// Record UUID
        uuid: String,
    },
    /// Replace a record with a full JSON document
    Update {
        /// CTIMetadata JSON
        json: String,
    },
    /// Remove a record (HeadOfOperations only)
    Delete {
        /// Record UUID
        uuid: String,
    },
    /// List records visible to the caller, one store page at a time
    List {
        /// Store entries per page; fewer may be shown after filtering
        #[arg(short = 'n', long, default_value = "10")]
        page_size: i32,
        /// Bookmark returned by the previous page
        #[arg(short, long, default_value = "")]
        bookmark: String,
        /// Follow bookmarks until the ledger is exhausted
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args)]
struct CreateArgs {
    /// Full CTIMetadata JSON; the other flags are ignored
    #[arg(long)]
    json: Option<String>,
    /// Record UUID (default: random v4)
    #[arg(long)]
    uuid: Option<String>,
    #[arg(short, long, default_value = "")]
    description: String,
    /// RFC3339 timestamp (default: now)
    #[arg(long)]
    timestamp: Option<String>,
    /// Submitting unit (default: the caller's role)
    #[arg(long)]
    sender: Option<String>,
    /// Content locator of the encrypted artifact
    #[arg(long, default_value = "")]
    cid: String,
    /// Key-vault reference of the artifact key
    #[arg(long, default_value = "")]
    vault_key: String,
    /// SHA-256 of the artifact, hex encoded
    #[arg(long, default_value = "", conflicts_with = "file")]
    sha256: String,
    /// Compute the SHA-256 from this file
    #[arg(long)]
    file: Option<PathBuf>,
    /// Role granted visibility (repeatable)
    #[arg(short, long)]
    access: Vec<String>,
}

#[derive(Subcommand)]
enum StixCommands {
    /// Store a STIX object from JSON
    Create { kind: StixKind, json: String },
    /// Show a STIX object by id
    Read { kind: StixKind, id: String },
    /// Dump every stored STIX object
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum StixKind {
    Indicator,
    Relationship,
    Sighting,
    Bundle,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let data_dir = dirs_data_dir().unwrap_or_else(|| ".ctiledger".into());
    let db_path = config.db_path(&data_dir);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    tracing::debug!(db = %db_path.display(), mode = ?config.ledger.mode, "opening ledger");

    match cli.command {
        Commands::Stix { command } => {
            let stix = StixLedger::new(SqliteState::open(&db_path, STIX_NAMESPACE)?);
            cmd_stix(stix, command)
        }
        Commands::Ledger(command) => {
            let caller_role = cli.role.as_deref().or(config.identity.role.as_deref());
            let state = SqliteState::open(&db_path, CTI_NAMESPACE)?;
            let mut ledger = MetadataLedger::new(state, config.identity(cli.role.as_deref()))
                .with_policy(config.ledger.clone());
            cmd_ledger(&mut ledger, command, caller_role)
        }
    }
}

fn cmd_ledger(
    ledger: &mut MetadataLedger<SqliteState, StaticIdentity>,
    command: LedgerCommands,
    caller_role: Option<&str>,
) -> Result<()> {
    match command {
        LedgerCommands::Init => {
            ledger.init_ledger()?;
            println!("Ledger initialized.");
        }
        LedgerCommands::Create(args) => {
            let record = build_record(args, caller_role)?;
            let uuid = record.uuid.clone();
            ledger.create(record)?;
            println!("CTI UUID: {uuid}");
        }
        LedgerCommands::Read { uuid } => print_json(&ledger.read_cti_metadata(&uuid)?)?,
        LedgerCommands::Update { json } => {
            ledger.update_cti_metadata(&json)?;
            println!("Updated.");
        }
        LedgerCommands::Delete { uuid } => {
            ledger.delete_cti_metadata(&uuid)?;
            println!("Deleted {uuid}.");
        }
        LedgerCommands::List {
            page_size,
            bookmark,
            all,
        } => cmd_list(ledger, page_size, bookmark, all)?,
    }

    Ok(())
}

fn cmd_list(
    ledger: &mut MetadataLedger<SqliteState, StaticIdentity>,
    page_size: i32,
    mut bookmark: String,
    all: bool,
) -> Result<()> {
    if !all {
        return print_json(&ledger.get_all_cti(page_size, &bookmark)?);
    }

    let mut records = Vec::new();
    loop {
        let page = ledger.get_all_cti(page_size, &bookmark)?;
        records.extend(page.metadata_list);
        if page.bookmark.is_empty() {
            break;
        }
        bookmark = page.bookmark;
    }
    print_json(&records)
}

fn cmd_stix(mut stix: StixLedger<SqliteState>, command: StixCommands) -> Result<()> {
    match command {
        StixCommands::Create { kind, json } => {
            let id = match kind {
                StixKind::Indicator => stix.indicators().create(&json)?.id,
                StixKind::Relationship => stix.relationships().create(&json)?.id,
                StixKind::Sighting => stix.sightings().create(&json)?.id,
                StixKind::Bundle => stix.bundles().create(&json)?.id,
            };
            println!("Stored {id}.");
            Ok(())
        }
        StixCommands::Read { kind, id } => match kind {
            StixKind::Indicator => print_json(&stix.indicators().read(&id)?),
            StixKind::Relationship => print_json(&stix.relationships().read(&id)?),
            StixKind::Sighting => print_json(&stix.sightings().read(&id)?),
            StixKind::Bundle => print_json(&stix.bundles().read(&id)?),
        },
        StixCommands::List => print_json(&stix.all_objects()?),
    }
}

fn build_record(args: CreateArgs, caller_role: Option<&str>) -> Result<CtiMetadata> {
    if let Some(json) = args.json {
        return Ok(CtiMetadata::from_json(&json)?);
    }

    let sha256_hash = match &args.file {
        Some(path) => sha256_file(path)?,
        None => args.sha256,
    };

    Ok(CtiMetadata {
        uuid: args
            .uuid
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        description: args.description,
        timestamp: args
            .timestamp
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        sender_identity: args
            .sender
            .or_else(|| caller_role.map(str::to_string))
            .unwrap_or_default(),
        cid: args.cid,
        vault_key: args.vault_key,
        sha256_hash,
        access_list: args.access,
    })
}

fn sha256_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Ok(Config::load(path)?);
    }

    let default_path = PathBuf::from(CONFIG_FILE);
    if default_path.exists() {
        Ok(Config::load(&default_path)?)
    } else {
        Ok(Config::default())
    }
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/ctiledger"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("ctiledger"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("ctiledger"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
