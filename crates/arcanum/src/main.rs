// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arcanum - secret lifecycle management service.
//!
//! Operator CLI over a local encrypted store: define secrets, set and
//! read values, list, describe, and undefine. The store passphrase comes
//! from `ARCANUM_STORE_KEY` or an interactive prompt.

use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;

use arcanum_config::model::ArcanumConfig;
use arcanum_core::{ArcanumError, DescribeOptions, SecretUuid, UsageType};
use arcanum_session::{SecretService, Session, SessionGrants};
use arcanum_store::{SqliteBackend, ValueStore};
use clap::{Parser, Subcommand};
use tracing::debug;

/// Arcanum - secret lifecycle management service.
#[derive(Parser, Debug)]
#[command(name = "arcanum", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new encrypted store.
    Init,
    /// Define a new secret in "defined, no value" state.
    Define {
        /// Usage type: volume, ceph, iscsi, or none.
        #[arg(long)]
        usage_type: UsageType,
        /// Usage identifier, unique within the usage type.
        #[arg(long)]
        usage_id: String,
        /// Keep the value in memory only; never persist it.
        #[arg(long)]
        ephemeral: bool,
        /// Withhold sensitive metadata from descriptor exports.
        #[arg(long)]
        private: bool,
    },
    /// Set a secret's value from --value or stdin.
    Set {
        uuid: SecretUuid,
        /// Value as a string; omit to read raw bytes from stdin.
        #[arg(long)]
        value: Option<String>,
    },
    /// Write a secret's value to stdout.
    Get { uuid: SecretUuid },
    /// List all secret UUIDs.
    List,
    /// Print a secret's XML descriptor.
    Describe {
        uuid: SecretUuid,
        /// Include metadata normally withheld for private secrets.
        #[arg(long)]
        include_private: bool,
    },
    /// Remove a secret and purge its stored value.
    Undefine { uuid: SecretUuid },
    /// Change the store passphrase.
    Passwd,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match arcanum_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            arcanum_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("arcanum: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("arcanum={log_level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, config: &ArcanumConfig) -> Result<(), ArcanumError> {
    let backend = Arc::new(
        SqliteBackend::open(&config.store.database_path, config.store.wal_mode).await?,
    );

    // Store-level commands that do not need a session.
    match &command {
        Commands::Init => {
            let passphrase = arcanum_store::get_store_passphrase_with_confirm()?;
            ValueStore::create(backend, &passphrase, &config.store).await?;
            println!("store created at {}", config.store.database_path);
            return Ok(());
        }
        Commands::Passwd => {
            let current = arcanum_store::get_store_passphrase()?;
            let store = ValueStore::unlock(backend, &current, &config.store).await?;
            let new = arcanum_store::get_store_passphrase_with_confirm()?;
            store.change_passphrase(&new, &config.store).await?;
            println!("passphrase changed");
            return Ok(());
        }
        _ => {}
    }

    let passphrase = arcanum_store::get_store_passphrase()?;
    let store = ValueStore::unlock(backend, &passphrase, &config.store).await?;
    let service = SecretService::open(store, config.service.max_sessions).await?;
    let session = service.open_session(session_grants(config)?)?;

    let result = dispatch(command, &session).await;
    session.close();
    result
}

async fn dispatch(command: Commands, session: &Session) -> Result<(), ArcanumError> {
    match command {
        Commands::Init | Commands::Passwd => unreachable!("handled before session open"),
        Commands::Define {
            usage_type,
            usage_id,
            ephemeral,
            private,
        } => {
            let handle = session
                .define(usage_type, &usage_id, ephemeral, private)
                .await?;
            println!("{}", handle.uuid());
        }
        Commands::Set { uuid, value } => {
            let bytes = match value {
                Some(s) => s.into_bytes(),
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin()
                        .read_to_end(&mut buf)
                        .map_err(|e| ArcanumError::Internal(format!("failed to read stdin: {e}")))?;
                    buf
                }
            };
            session.set_value(uuid, &bytes).await?;
            debug!(uuid = %uuid, "value set");
        }
        Commands::Get { uuid } => {
            let value = session.get_value(uuid).await?;
            use std::io::Write;
            std::io::stdout()
                .write_all(&value)
                .map_err(|e| ArcanumError::Internal(format!("failed to write stdout: {e}")))?;
        }
        Commands::List => {
            for uuid in session.list()? {
                println!("{uuid}");
            }
        }
        Commands::Describe {
            uuid,
            include_private,
        } => {
            let xml = session.get_xml_desc(uuid, DescribeOptions { include_private })?;
            println!("{xml}");
        }
        Commands::Undefine { uuid } => {
            session.undefine(uuid).await?;
            println!("{uuid} undefined");
        }
    }
    Ok(())
}

/// Build session grants from the `[access]` config section.
fn session_grants(config: &ArcanumConfig) -> Result<SessionGrants, ArcanumError> {
    let mut permitted = Vec::new();
    for entry in &config.access.granted_usage {
        let usage_type = UsageType::from_str(entry).map_err(|_| {
            ArcanumError::Config(format!("unrecognized usage type in access.granted_usage: {entry}"))
        })?;
        permitted.push(usage_type);
    }
    Ok(SessionGrants::new(permitted, config.access.read_only))
}
