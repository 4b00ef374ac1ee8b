//! Operator CLI for Roomy deployments.
//!
//! # Responsibility
//! - Run the one-time bootstrap functions and print the ids they produce.
//! - Persist produced ids into the deployment ids file.
//! - Create and inspect accounts against a local store.

use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use roomy_core::db::open_db;
use roomy_core::{
    create_all_accounts_list, create_all_spaces_list, create_space_migration_reference,
    ensure_deployment_ids, init_logging, AccountCreation, AccountService, CoId, DeploymentIds,
    DeploymentTarget, DirectoryService, LogLevel, MigratedAccount, SqliteCoStore,
    DEFAULT_IDS_FILE_NAME,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_DB_FILE_NAME: &str = "roomy.sqlite3";

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "roomy", version, about = "Roomy deployment and account tooling")]
struct Cli {
    /// SQLite database backing the local store.
    #[arg(long, global = true, default_value = DEFAULT_DB_FILE_NAME)]
    db: PathBuf,

    /// Deployment ids file.
    #[arg(long, global = true, default_value = DEFAULT_IDS_FILE_NAME)]
    ids: PathBuf,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create global singleton values and print their ids.
    Bootstrap {
        #[arg(value_enum)]
        target: BootstrapTarget,
    },
    /// Create or inspect accounts.
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Print the core version.
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BootstrapTarget {
    /// New all-spaces list (always creates).
    AllSpaces,
    /// New all-accounts list (always creates).
    AllAccounts,
    /// New space migration reference (always creates).
    MigrationReference,
    /// Create only what the ids file is missing, then save it.
    All,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create an account and register it in the all-accounts list when configured.
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    /// Load an account (running the migration hook) and print it.
    Show { id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_dir) = &cli.log_dir {
        let level = match cli.log_level.as_deref() {
            Some(value) => value.parse::<LogLevel>()?,
            None => LogLevel::default_for_build(),
        };
        init_logging(level, log_dir)?;
    }

    match cli.command {
        Commands::Version => {
            println!("roomy_core version={}", roomy_core::core_version());
            Ok(())
        }
        Commands::Bootstrap { target } => bootstrap(&cli.db, &cli.ids, target),
        Commands::Account { action } => account(&cli.db, &cli.ids, action),
    }
}

fn bootstrap(db: &Path, ids_path: &Path, target: BootstrapTarget) -> CliResult<()> {
    let conn = open_db(db)?;
    let store = SqliteCoStore::try_new(&conn)?;

    let (label, id) = match target {
        BootstrapTarget::AllSpaces => (
            DeploymentTarget::AllSpacesList,
            create_all_spaces_list(&store)?,
        ),
        BootstrapTarget::AllAccounts => (
            DeploymentTarget::AllAccountsList,
            create_all_accounts_list(&store)?,
        ),
        BootstrapTarget::MigrationReference => (
            DeploymentTarget::SpaceMigrationReference,
            create_space_migration_reference(&store)?,
        ),
        BootstrapTarget::All => {
            let mut ids = DeploymentIds::load(ids_path)?;
            let report = ensure_deployment_ids(&store, &mut ids)?;
            for (target, id) in &report.created {
                println!("{target} {id}");
            }
            for (target, id) in &report.reused {
                println!("{target} {id} (existing)");
            }
            if !report.created.is_empty() {
                ids.save(ids_path)?;
                println!("saved {}", ids_path.display());
            }
            return Ok(());
        }
    };

    println!("{label} {id}");
    Ok(())
}

fn account(db: &Path, ids_path: &Path, action: AccountAction) -> CliResult<()> {
    let conn = open_db(db)?;
    let service = AccountService::new(SqliteCoStore::try_new(&conn)?);

    let account = match action {
        AccountAction::Create { name } => {
            let ids = DeploymentIds::load(ids_path)?;
            let creation = name.map(AccountCreation::named);
            if ids.get(DeploymentTarget::AllAccountsList).is_some() {
                let directory = DirectoryService::new(SqliteCoStore::try_new(&conn)?, ids);
                directory.create_account(creation.as_ref())?
            } else {
                service.create_account(creation.as_ref())?
            }
        }
        AccountAction::Show { id } => service.load_account(&CoId::parse(&id)?, None)?,
    };

    print_account(&account);
    Ok(())
}

fn print_account(account: &MigratedAccount) {
    println!("account {}", account.id);
    println!("profile {}", account.profile.id);
    println!("name {}", account.profile.name);
    println!("joinedSpaces {}", account.profile.joined_spaces);
    println!("roomyInbox {}", account.profile.roomy_inbox);
    println!("root {}", account.root.id);
    println!("lastRead {}", account.root.last_read);
}
