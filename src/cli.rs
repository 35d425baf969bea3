//! CLI definition and dispatch.

use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::delimited_adapter::DelimitedFileAdapter;
use crate::adapters::file_config_adapter::{AppConfig, FileConfigAdapter};
use crate::adapters::memory_position_adapter::MemoryPositionStore;
use crate::domain::error::FolioError;
use crate::domain::portfolio::{BookScope, Portfolio};
use crate::domain::registry::{PortfolioRegistry, DEFAULT_FILE_KEY};

#[derive(Parser, Debug)]
#[command(name = "foliotrack", about = "Portfolio operation ledger and valuation")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a portfolio for a reference year
    Evaluate {
        /// Portfolio file key (defaults to the persisted selection)
        #[arg(short, long)]
        portfolio: Option<String>,
        /// Reference year for current-year figures (defaults to today's)
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// List registered portfolios
    List,
    /// Print a portfolio's operations in date order
    Operations {
        #[arg(short, long)]
        portfolio: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Evaluate { ref portfolio, year } => {
            run_evaluate(cli.config.as_deref(), portfolio.as_deref(), year)
        }
        Command::List => run_list(cli.config.as_deref()),
        Command::Operations { ref portfolio } => {
            run_operations(cli.config.as_deref(), portfolio.as_deref())
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

fn load_app_config(config: Option<&std::path::Path>) -> Result<AppConfig, FolioError> {
    match config {
        Some(path) => {
            let adapter = FileConfigAdapter::from_file(path)?;
            Ok(AppConfig::from_port(&adapter))
        }
        None => Ok(AppConfig::default()),
    }
}

fn load_registry(config: Option<&std::path::Path>) -> Result<PortfolioRegistry, FolioError> {
    let app = load_app_config(config)?;
    let mut registry = PortfolioRegistry::with_tax_rules(&app.user_data_dir, app.tax_rules);
    registry.load(&DelimitedFileAdapter::new())?;
    Ok(registry)
}

fn resolve_key(
    registry: &PortfolioRegistry,
    records: &DelimitedFileAdapter,
    requested: Option<&str>,
) -> Result<String, FolioError> {
    if let Some(key) = requested {
        return Ok(key.to_string());
    }
    Ok(registry
        .default_key(records)?
        .unwrap_or_else(|| DEFAULT_FILE_KEY.to_string()))
}

fn run_evaluate(
    config: Option<&std::path::Path>,
    portfolio: Option<&str>,
    year: Option<i32>,
) -> Result<(), FolioError> {
    let records = DelimitedFileAdapter::new();
    let mut registry = load_registry(config)?;
    let key = resolve_key(&registry, &records, portfolio)?;

    // No quote universe is wired on the CLI: labels stay unresolved, so
    // the report carries the ledger-derived figures.
    let resolver = MemoryPositionStore::new();
    let mut store = MemoryPositionStore::new();
    let portfolio = registry.load_portfolio(&key, &records, &resolver, &mut store)?;

    let year = year.unwrap_or_else(|| chrono::Local::now().date_naive().year());
    let snapshot = portfolio.evaluate(year, &store)?;
    print_report(portfolio, &snapshot, year);
    Ok(())
}

fn print_report(
    portfolio: &Portfolio,
    snapshot: &crate::domain::portfolio::ValuationSnapshot,
    year: i32,
) {
    println!(
        "--- {}:{}:{} ({}) ---",
        portfolio.file_key(),
        portfolio.display_name(),
        portfolio.account_ref(),
        year,
    );
    println!(" cumul. investment  : {:.2}", snapshot.totals.invest);
    println!();
    println!(" total buy          : {:.2}", snapshot.buy.scoped(BookScope::Cash));
    println!(
        " evaluation quotes  : {:.2} ({:.2}% of portfolio)",
        snapshot.value.scoped(BookScope::Cash),
        snapshot.percent_securities(BookScope::Cash),
    );
    println!(
        " evaluation cash    : {:.2} ({:.2}% of portfolio)",
        snapshot.totals.cash,
        snapshot.percent_cash(BookScope::Cash),
    );
    println!(
        " performance        : {:.2} ({:.2}%)",
        snapshot.performance(BookScope::Cash),
        snapshot.performance_percent(BookScope::Cash),
    );
    println!();
    println!(" total credit       : {:.2}", snapshot.totals.credit);
    println!(
        " evaluation margin  : {:.2} ({:.2}%)",
        snapshot.value.scoped(BookScope::Margin),
        snapshot.performance_percent(BookScope::Margin),
    );
    println!();
    println!(" expenses (VAT, ...): {:.2}", snapshot.totals.expenses);
    println!(" total of transfers : {:.2}", snapshot.totals.transfer);
    println!(" appreciation       : {:.2}", snapshot.totals.appreciation);
    println!(" taxable amount     : {:.2}", snapshot.totals.taxable());
    println!(
        " amount of taxes    : {:.2}",
        snapshot.totals.taxes(portfolio.tax_rules()),
    );
    println!();
    println!(" evaluation total   : {:.2}", snapshot.total_value());
    println!(
        " global performance : {:.2} ({:.2}%)",
        snapshot.total_performance(),
        snapshot.total_performance_percent(),
    );
}

fn run_list(config: Option<&std::path::Path>) -> Result<(), FolioError> {
    let registry = load_registry(config)?;
    if registry.is_empty() {
        println!("no portfolios registered");
        return Ok(());
    }
    for portfolio in registry.list() {
        println!(
            "{}  {} (account {}, {} on {})",
            portfolio.file_key(),
            portfolio.display_name(),
            portfolio.account_ref(),
            portfolio.currency(),
            portfolio.market(),
        );
    }
    Ok(())
}

fn run_operations(
    config: Option<&std::path::Path>,
    portfolio: Option<&str>,
) -> Result<(), FolioError> {
    let records = DelimitedFileAdapter::new();
    let mut registry = load_registry(config)?;
    let key = resolve_key(&registry, &records, portfolio)?;

    let resolver = MemoryPositionStore::new();
    let mut store = MemoryPositionStore::new();
    let portfolio = registry.load_portfolio(&key, &records, &resolver, &mut store)?;

    for op in portfolio.ledger().list() {
        println!(
            "{} {} {:<20} {:>10.2} {:>8.2} {:>6}",
            op.date().format("%Y-%m-%d"),
            op.sign().as_char(),
            op.kind().describe(),
            op.value(),
            op.expenses(),
            op.count(),
        );
    }
    Ok(())
}
