// sensorlink: ADS-B buyer node and feed tools
//
// Accepts sensor observation streams from sellers over libp2p, decodes them
// and prints every record. Also ships a seller-side simulator and key tools.

mod config;
mod output;

use anyhow::{Context, Result};
use chrono::Timelike;
use clap::{Parser, Subcommand};
use colored::*;
use libp2p::identity::Keypair;
use libp2p::{Multiaddr, PeerId};
use sensorlink_core::overrides::keypair_from_private_key;
use sensorlink_core::transport::{self, NodeEvent};
use sensorlink_core::wire::write_observation;
use sensorlink_core::{
    peer_id_from_public_key, LocationOverrides, PeerSession, SensorObservation, SessionConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A DF17 airborne position message used by the simulator.
const SAMPLE_MODES: [u8; 14] = [
    0x8D, 0x40, 0x62, 0x1D, 0x58, 0xC3, 0x82, 0xD6, 0x90, 0xC8, 0xAC, 0x28, 0x63, 0xA7,
];

#[derive(Parser)]
#[command(name = "sensorlink")]
#[command(about = "Sensorlink: ADS-B sensor feed ingest over libp2p", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the buyer node and print incoming observations
    Listen {
        #[arg(short, long)]
        port: Option<u16>,
        /// One JSON object per record
        #[arg(long)]
        json: bool,
        /// Extra seller multiaddrs to dial
        #[arg(long)]
        dial: Vec<String>,
    },
    /// Stream synthetic frames to a listening node (seller side)
    Simulate {
        /// Buyer multiaddr ending in /p2p/<peer id>
        addr: String,
        #[arg(short, long, default_value = "10")]
        count: u64,
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
        #[arg(long, default_value = "1")]
        sensor_id: i64,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        alt: f64,
    },
    /// Decode a captured frame stream from a file
    Decode {
        file: PathBuf,
        /// Public key of the seller that produced the capture (applies its override)
        #[arg(long)]
        public_key: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show the peer id a secp256k1 public key maps to
    PeerId { public_key: String },
    /// List the effective location overrides
    Overrides,
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    Seller {
        #[command(subcommand)]
        action: SellerAction,
    },
}

#[derive(Subcommand)]
enum SellerAction {
    Add { multiaddr: String },
    Remove { multiaddr: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "sensorlink=debug,sensorlink_core=debug"
    } else {
        "sensorlink=info,sensorlink_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Listen { port, json, dial } => cmd_listen(port, json, dial).await,
        Commands::Simulate {
            addr,
            count,
            interval_ms,
            sensor_id,
            lat,
            lon,
            alt,
        } => cmd_simulate(addr, count, interval_ms, sensor_id, (lat, lon, alt)).await,
        Commands::Decode {
            file,
            public_key,
            json,
        } => cmd_decode(file, public_key, json).await,
        Commands::PeerId { public_key } => cmd_peer_id(&public_key),
        Commands::Overrides => cmd_overrides(),
        Commands::Config { action } => cmd_config(action),
    }
}

/// Node identity: environment, then config, then a fresh random key.
fn resolve_keypair(config: &config::Config) -> Result<Keypair> {
    if let Ok(secret) = std::env::var(config::PRIVATE_KEY_ENV) {
        return keypair_from_private_key(&secret)
            .with_context(|| format!("Invalid key in {}", config::PRIVATE_KEY_ENV));
    }
    if let Some(secret) = &config.private_key_hex {
        return keypair_from_private_key(secret).context("Invalid private_key_hex in config");
    }

    tracing::warn!("No private key configured; using a random identity for this run");
    Ok(Keypair::generate_secp256k1())
}

async fn cmd_listen(port: Option<u16>, json: bool, dial: Vec<String>) -> Result<()> {
    let config = config::Config::load()?;
    let format = if json {
        config::OutputFormat::Json
    } else {
        config.output
    };

    let keypair = resolve_keypair(&config)?;
    let overrides = Arc::new(config.build_overrides());

    let port = port.unwrap_or(config.listen_port);
    let listen_addr: Multiaddr = format!("/ip4/0.0.0.0/tcp/{}", port)
        .parse()
        .context("Invalid listen address")?;

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let node = transport::start_node(keypair, Some(listen_addr), event_tx).await?;

    let (record_tx, mut record_rx) = mpsc::channel(1024);
    let session_config = SessionConfig {
        read_timeout: Duration::from_secs(config.read_timeout_secs.max(1)),
    };
    transport::spawn_ingest(&node, overrides, record_tx, session_config)?;

    eprintln!("{}", "Sensorlink buyer node".bold());
    eprintln!("  Peer ID:   {}", node.local_peer_id().to_string().bright_cyan());
    eprintln!("  Protocol:  {}", transport::ADSB_PROTOCOL);
    eprintln!();

    for addr in dial.iter().chain(config.sellers.iter()) {
        match addr.parse::<Multiaddr>() {
            Ok(ma) => {
                if let Err(e) = node.dial(ma).await {
                    tracing::warn!("Failed to dial seller {}: {}", addr, e);
                }
            }
            Err(e) => tracing::warn!("Skipping invalid seller address {}: {}", addr, e),
        }
    }

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => match event {
                NodeEvent::ListeningOn(addr) => {
                    eprintln!("  Listening: {}/p2p/{}", addr, node.local_peer_id());
                }
                NodeEvent::PeerConnected(peer_id) => {
                    tracing::info!("Peer connected: {}", peer_id);
                }
                NodeEvent::PeerDisconnected(peer_id) => {
                    tracing::info!("Peer disconnected: {}", peer_id);
                }
            },
            Some(record) = record_rx.recv() => {
                output::print_event(format, &record)?;
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                eprintln!("{}", "Shutting down...".dimmed());
                break;
            }
        }
    }

    node.shutdown().await.ok();
    Ok(())
}

async fn cmd_simulate(
    addr: String,
    count: u64,
    interval_ms: u64,
    sensor_id: i64,
    (lat, lon, alt): (f64, f64, f64),
) -> Result<()> {
    let config = config::Config::load()?;
    let keypair = resolve_keypair(&config)?;
    let addr: Multiaddr = addr.parse().context("Invalid multiaddr")?;

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let node = transport::start_node(keypair, None, event_tx).await?;
    tokio::spawn(async move { while event_rx.recv().await.is_some() {} });

    eprintln!("Seller peer id: {}", node.local_peer_id().to_string().bright_cyan());

    let mut stream = transport::open_feed(&node, addr).await?;
    eprintln!("{} Feed open, sending {} frames", "✓".green(), count);

    for i in 0..count {
        let now = chrono::Utc::now();
        let observation = SensorObservation {
            sensor_id,
            latitude: lat,
            longitude: lon,
            altitude: alt,
            seconds_since_midnight: u64::from(now.num_seconds_from_midnight()),
            nanoseconds: u64::from(now.nanosecond() % 1_000_000_000),
            raw_payload: SAMPLE_MODES.to_vec(),
        };

        write_observation(&mut stream, &observation)
            .await
            .with_context(|| format!("Failed to send frame {}", i + 1))?;
        tracing::debug!("Sent frame {}/{}", i + 1, count);

        if i + 1 < count {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }

    futures::AsyncWriteExt::close(&mut stream).await.ok();
    node.shutdown().await.ok();
    eprintln!("{} Sent {} frames", "✓".green(), count);
    Ok(())
}

async fn cmd_decode(file: PathBuf, public_key: Option<String>, json: bool) -> Result<()> {
    let config = config::Config::load()?;
    let format = if json {
        config::OutputFormat::Json
    } else {
        config.output
    };

    let bytes = std::fs::read(&file)
        .with_context(|| format!("Failed to read capture {}", file.display()))?;

    let peer_id = match &public_key {
        Some(key) => peer_id_from_public_key(key).context("Invalid public key")?,
        None => PeerId::random(),
    };
    let overrides = Arc::new(config.build_overrides());

    let (record_tx, mut record_rx) = mpsc::channel(256);
    let session = PeerSession::new(
        peer_id,
        futures::io::Cursor::new(bytes),
        overrides,
        record_tx,
        SessionConfig::default(),
    );
    let session_task = session.spawn();

    while let Some(record) = record_rx.recv().await {
        output::print_event(format, &record)?;
    }

    let report = session_task.await.context("Decode task failed")?;
    eprintln!(
        "{} frames, {} records, {} skipped",
        report.stats.frames, report.stats.emitted, report.stats.skipped
    );
    if let sensorlink_core::SessionOutcome::Failed(e) = report.outcome {
        anyhow::bail!("Capture could not be fully decoded: {}", e);
    }
    Ok(())
}

fn cmd_peer_id(public_key: &str) -> Result<()> {
    let peer_id = peer_id_from_public_key(public_key).context("Invalid public key")?;
    println!("{}", peer_id);
    Ok(())
}

fn cmd_overrides() -> Result<()> {
    let config = config::Config::load()?;
    let table: LocationOverrides = config.build_overrides();

    println!("{}", "Location overrides".bold());
    if table.is_empty() {
        println!("  {}", "(none)".dimmed());
        return Ok(());
    }

    let mut rows: Vec<_> = table.iter().collect();
    rows.sort_by_key(|(peer_id, _)| peer_id.to_string());
    for (peer_id, location) in rows {
        println!(
            "  {}  lat={:.6} lon={:.6} alt={:.1}",
            peer_id.to_string().bright_cyan(),
            location.lat,
            location.lon,
            location.alt
        );
    }
    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = config::Config::load()?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} Set {} = {}", "✓".green(), key.bright_cyan(), value);
        }

        ConfigAction::Get { key } => {
            if let Some(value) = config.get(&key) {
                println!("{} = {}", key.bright_cyan(), value);
            } else {
                anyhow::bail!("Unknown config key: {}", key);
            }
        }

        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            println!();

            for (key, value) in config.list() {
                println!("  {:<24} {}", key.bright_cyan(), value);
            }

            println!();
            println!("{}", "Sellers:".bold());
            if config.sellers.is_empty() {
                println!("  {}", "(none configured)".dimmed());
            } else {
                for (i, seller) in config.sellers.iter().enumerate() {
                    println!("  {}. {}", i + 1, seller);
                }
            }
        }

        ConfigAction::Seller { action } => match action {
            SellerAction::Add { multiaddr } => {
                multiaddr
                    .parse::<Multiaddr>()
                    .context("Invalid multiaddr")?;
                if config.add_seller(multiaddr.clone()) {
                    config.save()?;
                    println!("{} Added seller: {}", "✓".green(), multiaddr);
                } else {
                    println!("Seller already configured: {}", multiaddr);
                }
            }

            SellerAction::Remove { multiaddr } => {
                if config.remove_seller(&multiaddr) {
                    config.save()?;
                    println!("{} Removed seller", "✓".green());
                } else {
                    println!("Seller not configured: {}", multiaddr);
                }
            }

            SellerAction::List => {
                println!("{}", "Sellers".bold());
                if config.sellers.is_empty() {
                    println!("  {}", "(none configured)".dimmed());
                } else {
                    for (i, seller) in config.sellers.iter().enumerate() {
                        println!("  {}. {}", i + 1, seller);
                    }
                }
            }
        },
    }

    Ok(())
}
