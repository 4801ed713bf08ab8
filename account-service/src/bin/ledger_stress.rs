use std::sync::Arc;
use std::thread;
use std::time::Instant;

use account_service::AccountService;
use clap::Parser;
use common::decimal::Amount;
use common::error::Error;
use common::model::account::{Account, AccountType};
use rand::Rng;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ledger stress test: hammers the account service from many threads and
/// checks that no money is created or destroyed
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Number of distinct account owners
    #[arg(long, default_value_t = 100)]
    users: u64,

    /// Accounts created per owner
    #[arg(long, default_value_t = 5)]
    accounts_per_user: u64,

    /// Worker threads
    #[arg(short, long, default_value_t = 64)]
    threads: usize,

    /// Operations performed by each worker
    #[arg(short, long, default_value_t = 1000)]
    operations: usize,

    /// Starting balance of every account
    #[arg(long, default_value = "1000.00")]
    initial_balance: Amount,
}

/// Per-worker tallies, merged after the workers finish
#[derive(Default)]
struct Tally {
    succeeded: u64,
    insufficient_funds: u64,
    contended: u64,
    other_failures: u64,
    deposited: Amount,
    withdrawn: Amount,
}

impl Tally {
    fn merge(&mut self, other: Tally) {
        self.succeeded += other.succeeded;
        self.insufficient_funds += other.insufficient_funds;
        self.contended += other.contended;
        self.other_failures += other.other_failures;
        self.deposited += other.deposited;
        self.withdrawn += other.withdrawn;
    }

    fn record_failure(&mut self, err: &Error) {
        match err {
            Error::InsufficientFunds(_) => self.insufficient_funds += 1,
            Error::LockContention(_) => self.contended += 1,
            _ => self.other_failures += 1,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "ledger_stress={0},account_service={0}",
            cli.log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let service = AccountService::new();

    info!(
        "Creating {} accounts for {} users",
        cli.users * cli.accounts_per_user,
        cli.users
    );
    let accounts = create_accounts(&service, &cli)?;
    if accounts.is_empty() {
        return Err("at least one user and one account per user are required".into());
    }
    let initial_total: Amount = accounts.iter().map(|account| account.balance()).sum();

    info!("Running {} threads x {} operations", cli.threads, cli.operations);
    let started = Instant::now();
    let mut tally = Tally::default();
    thread::scope(|s| {
        let workers: Vec<_> = (0..cli.threads)
            .map(|_| s.spawn(|| run_worker(&service, &accounts, cli.operations)))
            .collect();

        for worker in workers {
            match worker.join() {
                Ok(worker_tally) => tally.merge(worker_tally),
                Err(_) => error!("Worker thread panicked"),
            }
        }
    });
    let elapsed = started.elapsed();

    let total_operations = (cli.threads * cli.operations) as f64;
    info!(
        "Completed {} operations in {:.2?} ({:.0} ops/s)",
        total_operations,
        elapsed,
        total_operations / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    info!(
        "Succeeded: {}, insufficient funds: {}, lock contention: {}, other failures: {}",
        tally.succeeded, tally.insufficient_funds, tally.contended, tally.other_failures
    );

    let final_total: Amount = accounts.iter().map(|account| account.balance()).sum();
    let expected_total = initial_total + tally.deposited - tally.withdrawn;
    let negative = accounts
        .iter()
        .filter(|account| account.balance() < Amount::ZERO)
        .count();

    if final_total != expected_total || negative > 0 {
        error!(
            "Ledger inconsistent: total {} (expected {}), {} negative balances",
            final_total, expected_total, negative
        );
        return Err("ledger invariants violated".into());
    }

    info!("Ledger consistent: total {} across {} accounts", final_total, accounts.len());
    Ok(())
}

fn create_accounts(service: &AccountService, cli: &Cli) -> Result<Vec<Arc<Account>>, Error> {
    let mut accounts = Vec::with_capacity((cli.users * cli.accounts_per_user) as usize);
    for user_id in 1..=cli.users {
        for index in 0..cli.accounts_per_user {
            let account_type = if index % 2 == 0 {
                AccountType::Savings
            } else {
                AccountType::Checking
            };
            accounts.push(service.create_account(user_id, cli.initial_balance, account_type)?);
        }
    }
    Ok(accounts)
}

fn run_worker(service: &AccountService, accounts: &[Arc<Account>], operations: usize) -> Tally {
    let mut rng = rand::thread_rng();
    let mut tally = Tally::default();

    for _ in 0..operations {
        // Amounts between 0.01 and 100.00
        let amount = Amount::new(rng.gen_range(1..=10_000), 2);
        let Some(source) = accounts[rng.gen_range(0..accounts.len())].id() else {
            tally.other_failures += 1;
            continue;
        };

        let result = match rng.gen_range(0..3) {
            0 => service.deposit(source, amount).map(|_| tally.deposited += amount),
            1 => service.withdraw(source, amount).map(|_| tally.withdrawn += amount),
            _ => match accounts[rng.gen_range(0..accounts.len())].id() {
                Some(target) if target != source => service.transfer_amount(source, target, amount),
                _ => continue,
            },
        };

        match result {
            Ok(()) => tally.succeeded += 1,
            Err(err) => tally.record_failure(&err),
        }
    }

    tally
}
