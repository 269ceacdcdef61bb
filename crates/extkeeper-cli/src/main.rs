//! Command-line interface for extkeeper.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use extkeeper_core::command::reply_error;
use extkeeper_core::config::{env_vars, DEFAULT_CONFIG_FILE};
use extkeeper_core::{
    AdminGate, CommandDispatcher, Dispatch, InventoryProvider, ReplySink, Sender, UpdateCommand,
    UpdateOrchestrator, UpdateScheduler, UpdaterConfig,
};
use extkeeper_market::{MarketApplier, MarketClient, MarketInventory};

/// extkeeper - Keep installed chatbot extensions up to date.
#[derive(Parser, Debug)]
#[command(name = "extkeeper")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the install root from the configuration.
    #[arg(long, global = true)]
    install_root: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run one update cycle now and print the summary.
    Run,
    /// Run update cycles on the configured interval until Ctrl-C.
    Daemon,
    /// List installed extensions and their update status.
    List,
    /// Dispatch a chat command as the given sender.
    Command {
        /// Command text, e.g. "update all extensions".
        #[arg(required = true)]
        text: String,
        /// Sender id checked against the admin list.
        #[arg(short, long)]
        sender: String,
    },
}

/// Writes command replies to stdout.
struct StdoutSink;

#[async_trait]
impl ReplySink for StdoutSink {
    async fn send(&self, text: &str) -> extkeeper_core::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", text).map_err(reply_error)?;
        stdout.flush().map_err(reply_error)
    }
}

/// Marketplace collaborators wired from configuration.
struct Wiring {
    config: UpdaterConfig,
    inventory: Arc<MarketInventory>,
    orchestrator: Arc<UpdateOrchestrator>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let code = match args.command {
        Command::Run => run_once(&args.config, args.install_root).await?,
        Command::Daemon => run_daemon(&args.config, args.install_root).await?,
        Command::List => list_extensions(&args.config, args.install_root).await?,
        Command::Command { text, sender } => {
            run_command(&args.config, args.install_root, &text, &sender).await?
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    // JSON format for production/container environments
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("extkeeper={level}"))
            .add_directive(tracing::Level::WARN.into())
    });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load configuration: file, then environment, then command-line overrides.
fn load_config(path: &Path, install_root: Option<PathBuf>) -> Result<UpdaterConfig> {
    let mut config = UpdaterConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env_overrides()?;
    if let Some(root) = install_root {
        config.install_root = root;
    }
    config.validate()?;
    Ok(config)
}

fn wire(path: &Path, install_root: Option<PathBuf>) -> Result<Wiring> {
    let config = load_config(path, install_root)?;

    let client = MarketClient::new(&config.market, config.proxy())
        .context("Failed to create marketplace client")?;
    let inventory = Arc::new(MarketInventory::new(client));
    let applier = Arc::new(MarketApplier::new(
        config.install_root.clone(),
        config.market.clone(),
    )?);
    let orchestrator = Arc::new(UpdateOrchestrator::from_config(
        &config,
        inventory.clone(),
        applier,
    ));

    Ok(Wiring {
        config,
        inventory,
        orchestrator,
    })
}

async fn run_once(path: &Path, install_root: Option<PathBuf>) -> Result<i32> {
    let wiring = wire(path, install_root)?;
    let summary = wiring
        .orchestrator
        .run_update_cycle(&wiring.config.install_root)
        .await;

    println!("{}", summary.human_message);
    Ok(if summary.status.is_failure() { 1 } else { 0 })
}

async fn run_daemon(path: &Path, install_root: Option<PathBuf>) -> Result<i32> {
    let wiring = wire(path, install_root)?;
    let scheduler = UpdateScheduler::new(
        wiring.orchestrator.clone(),
        wiring.config.install_root.clone(),
        wiring.config.schedule_interval(),
    );
    if !scheduler.is_enabled() {
        anyhow::bail!(
            "Scheduling is disabled: set interval_hours in the config or {}",
            env_vars::INTERVAL_HOURS
        );
    }

    scheduler.start().await?;
    tracing::info!(
        root = %wiring.config.install_root.display(),
        "Update scheduler running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    scheduler.stop().await?;
    Ok(0)
}

async fn list_extensions(path: &Path, install_root: Option<PathBuf>) -> Result<i32> {
    let wiring = wire(path, install_root)?;
    let root = &wiring.config.install_root;
    let records = wiring
        .inventory
        .build_extension_list(root)
        .await
        .with_context(|| format!("Failed to list extensions in {}", root.display()))?;

    if records.is_empty() {
        println!("No extensions installed in {}", root.display());
        return Ok(0);
    }

    println!("{:<24} {:<12} {:<12} STATUS", "NAME", "INSTALLED", "LATEST");
    for record in &records {
        println!(
            "{:<24} {:<12} {:<12} {}",
            record.name().unwrap_or("<unnamed>"),
            record.installed_version.as_deref().unwrap_or("-"),
            record.latest_version.as_deref().unwrap_or("-"),
            record.status
        );
    }
    Ok(0)
}

async fn run_command(
    path: &Path,
    install_root: Option<PathBuf>,
    text: &str,
    sender: &str,
) -> Result<i32> {
    let wiring = wire(path, install_root)?;
    let command = UpdateCommand::new(
        wiring.orchestrator.clone(),
        wiring.config.install_root.clone(),
    );
    let gate = Arc::new(AdminGate::new(wiring.config.admins.iter().cloned()));
    let dispatcher = CommandDispatcher::new(command, gate);

    match dispatcher
        .dispatch(&Sender::new(sender), text, &StdoutSink)
        .await?
    {
        Dispatch::NotMatched => {
            eprintln!("Unknown command: {}", text);
            Ok(2)
        }
        Dispatch::Denied => Ok(1),
        Dispatch::Executed(summary) => Ok(if summary.status.is_failure() { 1 } else { 0 }),
    }
}
