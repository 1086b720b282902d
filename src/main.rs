use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, CellAlignment, Table};
use configuration::{ServerOverrides, Settings};
use core_types::{NewAccount, NewAccountValue};
use database::{AccountStore, DbError, DbRepository};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rust_decimal::Decimal;
use std::path::PathBuf;

/// The main entry point for the Finboard net worth tracker.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = configuration::load_settings(cli.config.as_deref())?;
    let _guard = configuration::init_tracing(&settings.logging)?;

    match cli.command {
        Commands::Serve(overrides) => {
            settings.apply_overrides(&overrides);
            web_server::run_server(&settings).await
        }
        Commands::Migrate => handle_migrate(&settings).await,
        Commands::Seed(args) => handle_seed(args, &settings).await,
        Commands::Networth(args) => handle_networth(args, &settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Tracks account balances over time and reports net worth.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults to `finboard.toml` if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServerOverrides),
    /// Apply pending database migrations and exit.
    Migrate,
    /// Insert demo accounts with a back-dated daily value history.
    Seed(SeedArgs),
    /// Print the net worth time series.
    Networth(NetworthArgs),
}

#[derive(Parser)]
struct SeedArgs {
    /// Number of daily values to record per account, ending today.
    #[arg(long, default_value_t = 30)]
    days: u32,
}

#[derive(Parser)]
struct NetworthArgs {
    /// Bucket width (e.g. "1d", "6h"). Defaults to the configured interval.
    #[arg(long, value_parser = parse_interval)]
    interval: Option<Duration>,
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than 0".to_string());
    }
    Duration::from_std(interval).map_err(|e| e.to_string())
}

async fn open_store(settings: &Settings) -> anyhow::Result<DbRepository> {
    let pool = database::connect(
        &settings.database.connection_url(),
        settings.database.max_connections,
        settings.database.acquire_timeout(),
    )
    .await?;
    database::run_migrations(&pool).await?;
    Ok(DbRepository::new(pool))
}

// ==============================================================================
// Migrate Command Logic
// ==============================================================================

async fn handle_migrate(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    store.pool().close().await;
    println!("Database is up to date.");
    Ok(())
}

// ==============================================================================
// Seed Command Logic
// ==============================================================================

fn demo_account(name: &str, class: &str, category: &str, tax_bucket: &str) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        class: class.to_string(),
        category: category.to_string(),
        tax_bucket: tax_bucket.to_string(),
    }
}

/// A household's worth of accounts covering every class and category.
fn demo_accounts() -> Vec<NewAccount> {
    vec![
        demo_account("Our Savings Account", "asset", "cash", ""),
        demo_account("Our Checking Account", "asset", "cash", ""),
        demo_account("My 401k", "asset", "retirement", "tax-deferred"),
        demo_account("SO 401k", "asset", "retirement", "tax-deferred"),
        demo_account("My IRA", "asset", "retirement", "roth"),
        demo_account("SO IRA", "asset", "retirement", "roth"),
        demo_account("Health Savings", "asset", "hsa", ""),
        demo_account("House", "asset", "real-estate", ""),
        demo_account("Student Loan", "liability", "loan", ""),
        demo_account("Mortgage", "liability", "loan", ""),
        demo_account("Auto Loan", "liability", "loan", ""),
        demo_account("Credit Card", "liability", "credit-card", ""),
    ]
}

/// A random amount between $1.00 and $100,000.00.
fn random_amount(rng: &mut impl Rng) -> Decimal {
    Decimal::new(rng.gen_range(100..=10_000_000), 2)
}

/// Handles the orchestration of the seeding process.
async fn handle_seed(args: SeedArgs, settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    let accounts = demo_accounts()
        .iter()
        .map(NewAccount::parse)
        .collect::<Result<Vec<_>, _>>()?;

    println!(
        "Seeding {} accounts with {} daily values each",
        accounts.len(),
        args.days
    );

    // Set up the progress bar
    let progress_bar = ProgressBar::new(accounts.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let today = Utc::now();

    // One task per account; values within an account are written in order.
    let tasks: Vec<_> = accounts
        .into_iter()
        .map(|fields| {
            let store = store.clone();
            let pb = progress_bar.clone();
            let amounts: Vec<Decimal> = {
                let mut rng = rand::thread_rng();
                (0..args.days).map(|_| random_amount(&mut rng)).collect()
            };

            tokio::spawn(async move {
                if store.account_exists(&fields.name).await? {
                    pb.inc(1);
                    pb.set_message(format!("Skipped {}", fields.name));
                    return Ok::<bool, anyhow::Error>(false);
                }

                pb.set_message(format!("Seeding {}...", fields.name));
                match store.create_account(&fields).await {
                    Ok(_) => {}
                    // Held by a deleted account.
                    Err(DbError::Conflict(_)) => {
                        pb.inc(1);
                        return Ok(false);
                    }
                    Err(e) => return Err(e.into()),
                }
                for (days_ago, amount) in (0..amounts.len()).rev().zip(amounts) {
                    let observed_at = today - Duration::days(days_ago as i64);
                    let value = NewAccountValue::new(&fields.name, amount).observed_at(observed_at);
                    store.create_account_value(&value).await?;
                }

                pb.inc(1);
                Ok(true)
            })
        })
        .collect();

    // Wait for all concurrent tasks to complete
    let results = join_all(tasks).await;

    progress_bar.finish_with_message("Seeding complete!");

    let mut created = 0;
    let mut failed = 0;
    for result in results {
        match result {
            Ok(Ok(true)) => created += 1,
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                failed += 1;
                tracing::error!(error = %e, "Failed to seed account.");
            }
            Err(e) => {
                failed += 1;
                tracing::error!(error = %e, "Seeding task panicked.");
            }
        }
    }

    store.pool().close().await;
    println!("Created {created} accounts.");
    if failed > 0 {
        anyhow::bail!("{failed} accounts could not be seeded");
    }
    Ok(())
}

// ==============================================================================
// Networth Command Logic
// ==============================================================================

async fn handle_networth(args: NetworthArgs, settings: &Settings) -> anyhow::Result<()> {
    let interval = match args.interval {
        Some(interval) => interval,
        None => settings.rollup.chrono_interval()?,
    };

    let store = open_store(settings).await?;
    let accounts = store.load_all_accounts_with_values().await?;
    store.pool().close().await;

    let series = analytics::net_worth_series(&accounts, interval)?;
    if series.is_empty() {
        println!("No account values recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Net Worth"]);
    for point in &series {
        table.add_row(vec![
            Cell::new(point.date.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(point.value.round_dp(2)).set_alignment(CellAlignment::Right),
        ]);
    }

    let totals = analytics::current_totals(&accounts);
    println!("Net worth\n{table}");
    println!(
        "Assets {}  Liabilities {}  Net worth {}",
        totals.assets, totals.liabilities, totals.net_worth
    );
    Ok(())
}
