//! ledger-core - maintenance tool for the ledger
//!
//! ```text
//! ledger-core [--env dev] <command>
//!
//!   migrate                      apply the PostgreSQL schema
//!   import                       copy the file store into PostgreSQL
//!   balance <identifier>         print a stored balance
//!   recalculate <account-id>     rebuild a balance from its entries
//!   freeze <identifier>          block an account from transfers
//!   unfreeze <identifier>
//!   entries [--account <id>]     list entries newest-first
//!   transfer <from> <to> <amt>   move funds between accounts
//!   deposit <account> <amt>      credit an external deposit
//!   deposit-locations            list retail deposit locations
//! ```

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::{StreamExt, TryStreamExt};
use tokio::task::JoinHandle;
use tracing::info;

use ledger_core::emitter::DispatchStats;
use ledger_core::ledger::DEFAULT_PAGE_SIZE;
use ledger_core::transfer::{deposit_location, parse_amount};
use ledger_core::{
    AccountService, AppConfig, DEPOSIT_LOCATIONS, Database, EntryLedger, EventSink,
    FileLedgerStore, LedgerStore, NoopSink, PgLedgerStore, RealtimeClient, StoreKind,
    TransferCoordinator, import_file_store, logging, open_store, spawn_dispatcher,
};

#[derive(Parser)]
#[command(name = "ledger-core", version, about = "Ledger maintenance tool")]
struct Cli {
    /// Configuration environment, reads config/<env>.yaml
    #[arg(long, default_value = "dev")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply the PostgreSQL schema
    Migrate,
    /// Copy accounts and entries from the file store into PostgreSQL
    Import,
    /// Print the stored balance of an account
    Balance { identifier: String },
    /// Rebuild a balance from the ledger
    Recalculate { account_id: String },
    Freeze {
        identifier: String,
        #[arg(long)]
        reason: Option<String>,
    },
    Unfreeze { identifier: String },
    /// List entries newest-first
    Entries {
        #[arg(long)]
        account: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Move funds between two accounts
    Transfer {
        from: String,
        to: String,
        amount: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Credit a deposit arriving from outside the ledger
    Deposit {
        account: String,
        amount: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    DepositLocations,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.env)
        .with_context(|| format!("Failed to load configuration for env '{}'", cli.env))?;
    let _guard = logging::init_logging(&config);

    info!(env = %cli.env, use_pg = config.storage.use_pg, "ledger-core starting");
    run(cli.command, &config).await
}

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    match command {
        Command::Migrate => {
            let db = connect_pg(config).await?;
            db.migrate().await.context("Migration failed")?;
            println!("Schema applied");
        }
        Command::Import => {
            let source = FileLedgerStore::open(&config.storage.store_path).await?;
            let db = connect_pg(config).await?;
            db.migrate().await?;
            let target = PgLedgerStore::new(db.pool().clone());
            let report = import_file_store(&source, &target).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Balance { identifier } => {
            let accounts = AccountService::new(open_configured(config).await?);
            match accounts.get_balance(&identifier).await? {
                Some(balance) => println!("{}", balance),
                None => bail!("Account '{}' not found", identifier),
            }
        }
        Command::Recalculate { account_id } => {
            let accounts = AccountService::new(open_configured(config).await?);
            let balance = accounts.recalculate_balance(&account_id).await?;
            println!("{}", balance);
        }
        Command::Freeze { identifier, reason } => {
            let accounts = AccountService::new(open_configured(config).await?);
            let account = accounts.freeze(&identifier, reason.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::Unfreeze { identifier } => {
            let accounts = AccountService::new(open_configured(config).await?);
            let account = accounts.unfreeze(&identifier).await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::Entries { account, limit } => {
            let ledger = EntryLedger::new(open_configured(config).await?);
            let entries: Vec<_> = ledger
                .stream(account, DEFAULT_PAGE_SIZE.min(limit.max(1)))
                .take(limit)
                .try_collect()
                .await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Command::Transfer {
            from,
            to,
            amount,
            description,
        } => {
            let amount = parse_amount(&amount)?;
            let (events, dispatcher) = event_sink(config)?;
            let coordinator = TransferCoordinator::new(open_configured(config).await?, events);
            let legs = coordinator
                .transfer(&from, &to, amount, description.as_deref())
                .await;
            drop(coordinator);
            drain(dispatcher).await?;
            println!("{}", serde_json::to_string_pretty(&legs?)?);
        }
        Command::Deposit {
            account,
            amount,
            source,
            location,
        } => {
            let amount = parse_amount(&amount)?;
            let location = match location.as_deref().filter(|l| !l.is_empty()) {
                Some(id) => match deposit_location(id) {
                    Some(known) => Some(known.id),
                    None => bail!("Unknown deposit location '{}'", id),
                },
                None => None,
            };
            let (events, dispatcher) = event_sink(config)?;
            let coordinator = TransferCoordinator::new(open_configured(config).await?, events);
            let entry = coordinator
                .direct_deposit(&account, amount, source.as_deref(), location)
                .await;
            drop(coordinator);
            drain(dispatcher).await?;
            println!("{}", serde_json::to_string_pretty(&entry?)?);
        }
        Command::DepositLocations => {
            println!("{}", serde_json::to_string_pretty(DEPOSIT_LOCATIONS)?);
        }
    }
    Ok(())
}

async fn connect_pg(config: &AppConfig) -> Result<Database> {
    let db = Database::connect(&config.storage.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.health_check()
        .await
        .context("PostgreSQL health check failed")?;
    Ok(db)
}

async fn open_configured(config: &AppConfig) -> Result<Arc<dyn LedgerStore>> {
    let kind = StoreKind::from_config(&config.storage);
    open_store(&kind).await.context("Failed to open ledger store")
}

/// Realtime sink per configuration, plus the worker to drain on exit
fn event_sink(
    config: &AppConfig,
) -> Result<(Arc<dyn EventSink>, Option<JoinHandle<DispatchStats>>)> {
    if !config.realtime.enabled {
        return Ok((Arc::new(NoopSink), None));
    }
    let client = RealtimeClient::new(&config.realtime)?;
    let (handle, join) = spawn_dispatcher(Arc::new(client), config.realtime.queue_capacity);
    Ok((Arc::new(handle), Some(join)))
}

async fn drain(dispatcher: Option<JoinHandle<DispatchStats>>) -> Result<()> {
    if let Some(join) = dispatcher {
        let stats = join.await.context("Realtime dispatcher panicked")?;
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            "Realtime events flushed"
        );
    }
    Ok(())
}
