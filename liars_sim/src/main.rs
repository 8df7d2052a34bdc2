//! Liars network CLI
//!
//! Reads one command per line from stdin and prints one reply per command.

use clap::Parser;
use liars_sim::{Mode, NetworkConfig, Reply, Session, SimError};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "liars-network")]
#[command(about = "Launch a network of honest and lying agents and query it", long_about = None)]
struct Args {
    /// Command set to accept
    #[arg(short, long, value_enum, default_value_t = Mode::Standard)]
    mode: Mode,

    /// Port ledger file
    #[arg(short, long, default_value = "agents.config")]
    ledger: PathBuf,

    /// Interface agents bind on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// Seed for liar values (0 = random from time)
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print replies as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = NetworkConfig::default()
        .with_mode(args.mode)
        .with_ledger_path(args.ledger)
        .with_bind_host(args.host)
        .with_seed(args.seed);

    if let Err(e) = run(config, args.json).await {
        error!("Session aborted: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: NetworkConfig, json: bool) -> Result<(), SimError> {
    if !json {
        println!(
            "Liars network in {} mode. Available commands: {}.",
            config.mode,
            config.mode.commands()
        );
    }

    let mut session = Session::new(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return abort(&mut session, SimError::Input(e)).await,
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match session.execute(&line).await {
            Ok(reply) => reply,
            Err(e) => return abort(&mut session, e).await,
        };
        print_reply(&reply, json);

        if reply.is_final() {
            return Ok(());
        }
    }

    info!("Input closed, stopping {} agents", session.network().len());
    session.shutdown().await
}

/// Tears the session down after a hard failure and hands the failure back.
async fn abort(session: &mut Session, cause: SimError) -> Result<(), SimError> {
    if let Err(e) = session.shutdown().await {
        warn!("Teardown after failure also failed: {}", e);
    }
    Err(cause)
}

fn print_reply(reply: &Reply, json: bool) {
    if !json {
        println!("{}", reply);
        return;
    }
    match serde_json::to_string(reply) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to encode reply: {}", e),
    }
}
