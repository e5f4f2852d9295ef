//! `storefront` binary: serve the API, manage the schema, load demo data.

use clap::{Parser, Subcommand};
use std::process;
use storefront::migration::{MigrationError, Migrator};
use storefront::seed::{self, SeedAccounts};
use storefront::{connect, http, migrations, AppState, PgExecutor, StorefrontConfig};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront REST service")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations, then serve HTTP
    Serve,

    /// Apply pending migrations
    Migrate {
        /// Number of migrations to apply (default: all pending)
        #[arg(long)]
        steps: Option<usize>,
    },

    /// Revert the newest applied migrations
    Rollback {
        #[arg(long, default_value = "1")]
        steps: usize,
    },

    /// Show applied and pending migrations
    Status,

    /// Insert or refresh demo accounts, categories and products
    Seed,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match StorefrontConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid configuration: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => run_serve(config),
        Commands::Migrate { steps } => open(&config).and_then(|conn| migrate(&conn, steps)),
        Commands::Rollback { steps } => open(&config).and_then(|conn| rollback(&conn, steps)),
        Commands::Status => open(&config).and_then(|conn| status(&conn)),
        Commands::Seed => open(&config).and_then(|conn| run_seed(&conn)),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn open(config: &StorefrontConfig) -> Result<PgExecutor, String> {
    connect(&config.database.url)
        .map(PgExecutor::new)
        .map_err(|e| format!("cannot connect to database: {e}"))
}

fn migrator() -> Result<Migrator, MigrationError> {
    Migrator::new(migrations::all())
}

fn migrate(conn: &PgExecutor, steps: Option<usize>) -> Result<(), String> {
    let applied = migrator()
        .and_then(|m| m.up(conn, steps))
        .map_err(|e| e.to_string())?;
    if applied > 0 {
        println!("Applied {applied} migration(s)");
    } else {
        println!("No migrations to apply");
    }
    Ok(())
}

fn rollback(conn: &PgExecutor, steps: usize) -> Result<(), String> {
    let reverted = migrator()
        .and_then(|m| m.down(conn, Some(steps)))
        .map_err(|e| e.to_string())?;
    println!("Rolled back {reverted} migration(s)");
    Ok(())
}

fn status(conn: &PgExecutor) -> Result<(), String> {
    let status = migrator()
        .and_then(|m| m.status(conn))
        .map_err(|e| e.to_string())?;

    println!("Applied migrations ({}):", status.applied.len());
    for record in &status.applied {
        let time = record
            .execution_time_ms
            .map_or_else(|| "N/A".to_string(), |ms| format!("{ms}ms"));
        println!(
            "  m{}_{} ({}, {time})",
            record.version,
            record.name,
            record.applied_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("Pending migrations ({}):", status.pending.len());
    for pending in &status.pending {
        println!("  m{}_{}", pending.version, pending.name);
    }
    Ok(())
}

fn run_seed(conn: &PgExecutor) -> Result<(), String> {
    let accounts = SeedAccounts::from_env(|key| std::env::var(key).ok());
    let summary = seed::run(conn, &accounts).map_err(|e| e.to_string())?;
    println!(
        "Seeded {} users, {} categories, {} products",
        summary.users, summary.categories, summary.products
    );
    println!("  admin:    {} / {}", accounts.admin_email, accounts.admin_password);
    println!("  customer: {} / {}", accounts.customer_email, accounts.customer_password);
    Ok(())
}

fn run_serve(config: StorefrontConfig) -> Result<(), String> {
    may::config().set_workers(config.server.workers.max(1));

    let conn = open(&config)?;
    migrate(&conn, None)?;
    drop(conn);

    let state = AppState::from_config(&config).map_err(|e| e.to_string())?;
    state
        .pool
        .warm_up()
        .map_err(|e| format!("database unavailable: {e}"))?;

    http::serve(state, &config.server.bind_address()).map_err(|e| e.to_string())
}
