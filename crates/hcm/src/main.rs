mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hcm_cloud::Kit;
use hcm_config::HcmConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hcm")]
#[command(about = "Drive TCloud load balancer changes through to completion", long_about = None)]
struct Cli {
    /// Config file (skips discovery)
    #[arg(long, global = true, env = "HCM_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Give up after this many seconds, whatever the poller settings say
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, update or delete listeners
    #[command(subcommand)]
    Listener(commands::listener::ListenerCommand),
    /// Create, update or delete layer-7 rules
    #[command(subcommand)]
    Rule(commands::rule::RuleCommand),
    /// Change domain attributes of a layer-7 listener
    #[command(subcommand)]
    Domain(commands::domain::DomainCommand),
    /// Poll vendor tasks
    #[command(subcommand)]
    Task(commands::task::TaskCommand),
    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Version needs no config
    if matches!(cli.command, Commands::Version) {
        println!("hcm {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => HcmConfig::load(path)?,
        None => HcmConfig::discover()?,
    };

    let mut kt = Kit::new();
    if let Some(secs) = cli.timeout {
        kt = kt.with_timeout(Duration::from_secs(secs));
    }
    tracing::debug!(rid = kt.rid(), "starting");

    let interrupt = kt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "interrupted, cancelling...".yellow());
            interrupt.cancel();
        }
    });

    let ctx = commands::Context::new(&config, kt)?;

    match cli.command {
        Commands::Listener(cmd) => commands::listener::handle(&ctx, cmd).await,
        Commands::Rule(cmd) => commands::rule::handle(&ctx, cmd).await,
        Commands::Domain(cmd) => commands::domain::handle(&ctx, cmd).await,
        Commands::Task(cmd) => commands::task::handle(&ctx, cmd).await,
        Commands::Version => Ok(()),
    }
}
