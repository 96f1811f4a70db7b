mod config;
mod console;
mod host;
mod menus;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::ConsoleConfig;
use console::Console;
use host::MemoryHost;
use mc_rs_gui::GuiContext;
use menus::Menus;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "console.toml";

#[tokio::main]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = if Path::new(&path).exists() {
        match ConsoleConfig::load(&path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load {path}: {e}");
                std::process::exit(1);
            }
        }
    } else {
        ConsoleConfig::default()
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("MC-RS GUI console v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Tick interval: {}ms, close delay: {} tick(s)",
        config.server.tick_interval_ms, config.gui.close_delay_ticks
    );

    let host = Arc::new(MemoryHost::new());
    for name in &config.server.players {
        host.join(name);
    }
    let ctx = GuiContext::new(host.clone(), config.gui);
    let registry = ctx.registry.clone();
    let console = Console::new(host.clone(), Menus::new(ctx, config.shop));

    // Console REPL: read lines from stdin
    let (console_tx, mut console_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    info!("Type 'help' for a list of commands");

    let mut tick_interval =
        tokio::time::interval(Duration::from_millis(config.server.tick_interval_ms.max(1)));
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                host.tick();
            }
            line = console_rx.recv() => {
                let Some(line) = line else {
                    info!("Console input closed");
                    break;
                };
                let result = console.execute_line(&line);
                for msg in &result.messages {
                    if result.success {
                        info!("{msg}");
                    } else {
                        warn!("{msg}");
                    }
                }
                if result.should_stop {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    registry.close_all();
    // Let pending close tasks run before exiting.
    host.tick();
    info!("Console stopped");
}
