//! Binary entrypoint for the Driftline CLI.
//!
//! Default mode starts the SSH server on the configured port. `-l/--local`
//! runs a single session against the current terminal instead - handy for
//! sysop work and testing without a network round trip.
//!
//! Exit codes: 0 on clean shutdown, 1 on unrecoverable startup errors
//! (unreadable config, port bind failure, host key trouble).

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use driftline::bbs::BbsServer;
use driftline::config::Config;
use driftline::storage::{seed, Store};

#[derive(Parser)]
#[command(name = "driftline")]
#[command(about = "A classic bulletin board system served over SSH")]
#[command(version)]
struct Cli {
    /// Run in local terminal mode instead of starting the SSH server
    #[arg(short, long)]
    local: bool,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // A missing config file means "run with defaults"; a malformed one is
    // fatal before any session starts.
    let config = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config).await?
    } else {
        Config::default()
    };

    init_logging(&config, cli.verbose);
    info!("Starting Driftline v{}", env!("CARGO_PKG_VERSION"));

    let store = Store::open(&config.database.path)?;
    seed::seed_if_needed(&store)?;

    let mut server = BbsServer::new(config, store);
    if cli.local {
        println!("Starting local BBS session...");
        server.run_local().await?;
    } else {
        server.run().await?;
    }
    Ok(())
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;

    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => config
            .logging
            .level
            .parse()
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    if let Some(ref file) = config.logging.file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
        {
            let sink = std::sync::Arc::new(std::sync::Mutex::new(f));
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                writeln!(fmt, "{}", line)
            });
        } else {
            eprintln!("Warning: could not open log file {}", file);
            builder.format(default_format);
        }
    } else {
        builder.format(default_format);
    }

    let _ = builder.try_init();
}

fn default_format(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    use std::io::Write;
    writeln!(
        fmt,
        "{} [{}] {}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        record.level(),
        record.args()
    )
}
