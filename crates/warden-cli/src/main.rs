//! Warden CLI - keeps the mining wizard moving in a live browser
//!
//! Usage:
//!   warden run --ws-url <URL>   Supervise an existing Chrome tab
//!   warden run --launch         Launch Chrome and supervise it
//!   warden mine                 Run one mine agent on the current tab
//!   warden wallet               Run one wallet agent on the current tab
//!   warden probe                Print what the agents would observe
//!   warden config init|show     Manage .warden/config.toml

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_agent::{probe, Page, Runner, TokioClock};
use warden_browser::{BrowserConfig, BrowserSession, CdpPage};
use warden_core::{
    CountdownStatus, NavigationStatus, SessionStatus, Step, WalletAvailability, WardenConfig,
};

#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about = "Recovery agents for the mining wizard")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to .warden/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Supervise the wizard until interrupted
    Run {
        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Run a single mine agent instance on the current tab
    Mine {
        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Run a single wallet agent instance on the current tab
    Wallet {
        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Print every observed condition as JSON
    Probe {
        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default configuration to .warden/config.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Show the effective configuration
    Show,
}

#[derive(Args)]
struct BrowserArgs {
    /// DevTools websocket URL of a running Chrome
    #[arg(long, value_name = "URL", conflicts_with = "launch")]
    ws_url: Option<String>,

    /// Launch a new Chrome instead of connecting
    #[arg(long)]
    launch: bool,

    /// Run the launched Chrome headless
    #[arg(long, requires = "launch")]
    headless: bool,
}

#[derive(Serialize)]
struct ProbeReport {
    timestamp: String,
    navigation: Option<NavigationStatus>,
    countdown: CountdownStatus,
    session: SessionStatus,
    wallet: WalletAvailability,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run { browser } => cmd_run(config, browser).await,
        Commands::Mine { browser } => cmd_step(config, browser, Step::Mine).await,
        Commands::Wallet { browser } => cmd_step(config, browser, Step::Wallet).await,
        Commands::Probe { browser } => cmd_probe(config, browser).await,
        Commands::Config { action } => cmd_config(config, action),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<WardenConfig> {
    let config = match path {
        Some(path) => WardenConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            WardenConfig::load_or_default(&cwd).context("Failed to load .warden/config.toml")?
        }
    };
    Ok(config)
}

/// Attach to (or launch) the browser and return the page agents will drive
///
/// A launched browser starts blank, so it is pointed at `step`'s URL.
async fn open_page(config: &WardenConfig, args: &BrowserArgs, step: Step) -> Result<Arc<CdpPage>> {
    let browser_config = BrowserConfig {
        headless: args.headless,
        ..BrowserConfig::default()
    };

    let session = if let Some(ws_url) = &args.ws_url {
        BrowserSession::connect(ws_url, &config.site.base_url, &browser_config)
            .await
            .context("Failed to connect to browser")?
    } else if args.launch {
        let session = BrowserSession::launch_with_config(browser_config)
            .await
            .context("Failed to launch browser")?;
        session
            .navigate(&config.site.url_for(step))
            .await
            .context("Failed to open the wizard")?;
        session
    } else {
        bail!("Pass --ws-url <URL> to attach to a running Chrome, or --launch");
    };

    info!("Driving {}", session.url());
    Ok(Arc::new(CdpPage::new(Arc::new(session))))
}

async fn cmd_run(config: WardenConfig, args: BrowserArgs) -> Result<()> {
    let page = open_page(&config, &args, Step::Wallet).await?;
    let runner = Runner::new(page, Arc::new(TokioClock), config);

    tokio::select! {
        _ = runner.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, stopping");
        }
    }
    Ok(())
}

async fn cmd_step(config: WardenConfig, args: BrowserArgs, step: Step) -> Result<()> {
    let page = open_page(&config, &args, step).await?;
    let runner = Runner::new(page, Arc::new(TokioClock), config);

    tokio::select! {
        exit = runner.run_step(step) => {
            println!("{} agent {}", step, exit);
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, stopping");
        }
    }
    Ok(())
}

async fn cmd_probe(config: WardenConfig, args: BrowserArgs) -> Result<()> {
    let cdp = open_page(&config, &args, Step::Mine).await?;
    let page: &dyn Page = &*cdp;

    let report = ProbeReport {
        timestamp: chrono::Local::now().to_rfc3339(),
        navigation: probe::navigation_status(page).await,
        countdown: probe::countdown_status(page, &config.selectors).await,
        session: probe::session_status(page, &config.controls).await,
        wallet: probe::wallet_availability(page, &config.selectors).await,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_config(config: WardenConfig, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Init { path } => {
            let target = path.join(".warden/config.toml");
            if target.exists() {
                bail!("{} already exists", target.display());
            }
            WardenConfig::write_default(&path).context("Failed to write config")?;
            println!("Created {}", target.display());
        }
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
