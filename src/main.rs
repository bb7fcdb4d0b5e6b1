use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use mercuriales_dashboard::{
    fetch_records, Dashboard, DashboardConfig, Phase, Response, RetainedBackend, TableRow, UiEvent,
    NOTHING_TO_EXPORT,
};

#[derive(Parser)]
#[command(name = "mercuriales", version, about = "Agricultural market price dashboard")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data service URL (overrides the config file)
    #[arg(long, global = true, env = "MERCURIALES_ENDPOINT")]
    endpoint: Option<String>,

    /// Directory receiving the exported CSV
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal dashboard (default)
    Ui,
    /// Fetch, filter and write the CSV without the UI
    Export(FilterArgs),
    /// Fetch, filter and print the table
    Table(FilterArgs),
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Case-insensitive product substring
    #[arg(long, default_value = "")]
    search: String,

    /// Exact year, or "all"
    #[arg(long, default_value = "all")]
    year: String,

    /// Exact market, or "all"
    #[arg(long, default_value = "all")]
    market: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(out_dir) = cli.out_dir {
        config.export_dir = out_dir;
    }

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => run_ui_mode(&config),
        Command::Export(args) => {
            init_logging(None)?;
            run_export(&config, &args)
        }
        Command::Table(args) => {
            init_logging(None)?;
            run_table(&config, &args)
        }
    }
}

/// Logs to `log_file` when given (the UI owns the terminal), stderr otherwise
fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Fetch once and apply the filter arguments, the way the UI would.
fn headless_dashboard(config: &DashboardConfig, args: &FilterArgs) -> Result<Dashboard<RetainedBackend>> {
    let rt = runtime()?;
    let client = reqwest::Client::new();

    let mut dashboard = Dashboard::new(RetainedBackend::default(), config.export_dir.clone());
    dashboard.on_fetch_complete(rt.block_on(fetch_records(&client, &config.endpoint)));

    if let Phase::Failed { reason } = dashboard.phase() {
        eprintln!("❌ {}", dashboard.title());
        for row in dashboard.rows() {
            eprintln!("   {}", row.cells().join(" "));
        }
        bail!("fetch from {} failed: {}", config.endpoint, reason);
    }

    dashboard.handle(UiEvent::SearchChanged(args.search.clone()))?;
    dashboard.handle(UiEvent::YearChanged(args.year.clone()))?;
    dashboard.handle(UiEvent::MarketChanged(args.market.clone()))?;

    Ok(dashboard)
}

fn run_export(config: &DashboardConfig, args: &FilterArgs) -> Result<()> {
    let dashboard = headless_dashboard(config, args)?;

    match dashboard.export()? {
        Response::Exported(path) => println!("✓ {} → {}", dashboard.title(), path.display()),
        _ => println!("{}", NOTHING_TO_EXPORT),
    }

    Ok(())
}

fn run_table(config: &DashboardConfig, args: &FilterArgs) -> Result<()> {
    let dashboard = headless_dashboard(config, args)?;

    println!("{}", dashboard.title());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for row in dashboard.rows() {
        match row {
            TableRow::Notice { text } => println!("{}", text),
            TableRow::Entry { date, product, price, market } => {
                println!("{:<12}{:<32}{:>16}  {}", date, product, price, market)
            }
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &DashboardConfig) -> Result<()> {
    use mercuriales_dashboard::ui;

    init_logging(Some(&config.log_file))?;

    // Fetches run on a worker so the event loop keeps reading keys
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let client = reqwest::Client::new();

    let mut app = ui::App::new(config.export_dir.clone());
    ui::run_ui(&mut app, || {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let client = client.clone();
        let endpoint = config.endpoint.clone();
        rt.spawn(async move {
            // Receiver is gone when a reload superseded this fetch
            let _ = tx.send(fetch_records(&client, &endpoint).await);
        });
        rx
    })?;

    // A fetch still hanging must not hold up exit
    rt.shutdown_background();

    println!("✅ Dashboard closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &DashboardConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: mercuriales export / mercuriales table");
    std::process::exit(1);
}
