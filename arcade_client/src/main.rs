//! Standalone sync client.
//!
//! Usage:
//!   cargo run -p arcade_client -- [--server 127.0.0.1:40000] [--lobby alpha]
//!
//! Connects to the server, joins the lobby, streams sampled input, and
//! logs entity lifecycle as snapshots arrive. Presentation here is a set
//! of logging presenters; a real frontend swaps in scene-backed ones.
//!
//! Console commands:
//!   status      - Show connection state and entity counts
//!   connect     - Reconnect after a close (no automatic retry exists)
//!   disconnect  - Close the connection
//!   fire        - Send the discrete shoot action
//!   quit        - Exit

use std::env;
use std::io::{BufRead, Write};
use std::time::Duration;

use arcade_client::kinds::asteroid::{AsteroidPresenter, AsteroidView};
use arcade_client::kinds::bullet::{BulletPresenter, BulletView};
use arcade_client::kinds::mineral::{MineralChunkPresenter, MineralChunkView};
use arcade_client::kinds::spaceship::{SpaceshipPresenter, SpaceshipView};
use arcade_client::kinds::standard_receiver;
use arcade_client::GameSession;
use arcade_shared::config::ClientConfig;
use arcade_shared::entity::{EntityId, EntityKind};
use tokio::sync::mpsc;
use tracing::info;

struct LogAsteroids;

impl AsteroidPresenter for LogAsteroids {
    type Handle = EntityId;

    fn create(&mut self, view: &AsteroidView) -> EntityId {
        info!(id = %view.id, size = view.size, "asteroid appeared");
        view.id
    }

    fn update(&mut self, _handle: &mut EntityId, _view: &AsteroidView) {}

    fn remove(&mut self, handle: EntityId) {
        info!(id = %handle, "asteroid gone");
    }
}

struct LogSpaceships;

impl SpaceshipPresenter for LogSpaceships {
    type Handle = EntityId;

    fn create(&mut self, view: &SpaceshipView) -> EntityId {
        info!(id = %view.id, client_id = ?view.client_id, "ship appeared");
        view.id
    }

    fn update(&mut self, _handle: &mut EntityId, _view: &SpaceshipView) {}

    fn remove(&mut self, handle: EntityId) {
        info!(id = %handle, "ship gone");
    }
}

struct LogMinerals;

impl MineralChunkPresenter for LogMinerals {
    type Handle = EntityId;

    fn create(&mut self, view: &MineralChunkView) -> EntityId {
        info!(id = %view.id, purity = view.purity, "mineral chunk appeared");
        view.id
    }

    fn update(&mut self, _handle: &mut EntityId, _view: &MineralChunkView) {}

    fn remove(&mut self, handle: EntityId) {
        info!(id = %handle, "mineral chunk gone");
    }
}

struct LogBullets;

impl BulletPresenter for LogBullets {
    type Handle = EntityId;

    fn create(&mut self, view: &BulletView) -> EntityId {
        info!(id = %view.id, "bullet appeared");
        view.id
    }

    fn update(&mut self, _handle: &mut EntityId, _view: &BulletView) {}

    fn remove(&mut self, handle: EntityId) {
        info!(id = %handle, "bullet gone");
    }
}

fn parse_args() -> ClientConfig {
    let mut cfg = ClientConfig::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--server" if i + 1 < args.len() => {
                cfg.server_url = args[i + 1].clone();
                i += 2;
            }
            "--lobby" if i + 1 < args.len() => {
                cfg.lobby = args[i + 1].clone();
                i += 2;
            }
            "--heartbeat-ms" if i + 1 < args.len() => {
                cfg.heartbeat_interval_ms = args[i + 1].parse().unwrap_or(3000);
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg
}

fn print_status(session: &GameSession) {
    println!("State: {}", session.state());
    let stats = session.stats();
    println!("Messages received: {}", stats.messages_received);
    if stats.parse_failures > 0 {
        println!("Parse failures: {}", stats.parse_failures);
    }
    if let (Some(rtt), Some(lat)) = (stats.rtt_ms, stats.latency_ms) {
        println!("RTT: {rtt}ms  latency: {lat:.1}ms");
    }
    for kind in EntityKind::ALL {
        if let Some(count) = session.receiver().store_count(kind) {
            println!("{kind}: {count}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args();
    info!(server = %cfg.server_url, lobby = %cfg.lobby, "starting sync client");

    let receiver = standard_receiver(LogAsteroids, LogSpaceships, LogMinerals, LogBullets);
    let mut session = GameSession::new(cfg, receiver);
    session.connect().await?;

    // Stdin console on its own thread; commands cross over a channel so
    // the session stays single-threaded.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Connected. Type 'status' for info, 'quit' to exit.");

    loop {
        while let Ok(line) = console_rx.try_recv() {
            match line.as_str() {
                "status" => print_status(&session),
                "connect" => {
                    if let Err(e) = session.connect().await {
                        println!("Connect failed: {e}");
                    }
                }
                "disconnect" => session.disconnect(),
                "fire" => {
                    if let Err(e) = session.fire().await {
                        println!("Fire failed: {e}");
                    }
                }
                "quit" | "exit" => return Ok(()),
                other => println!("Unknown command: {other}"),
            }
        }

        if let Err(e) = session.pump().await {
            println!("Pump error: {e}");
        }

        for notice in session.stats_mut().drain_notices() {
            println!("Server: {notice}");
        }

        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
