//! Standalone entry point for the companion bridge
//!
//! Wires the real service implementations together with dependency
//! injection and drives the bridge from a small admin console on stdin:
//! `reload`, `version`, `stats`, `event <name> [args...]`, `quit`.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use bridge::services::{ConsoleHost, RealExecutableBuilder, RealHeapProbe, RealMessenger};
use bridge::{ExecutableBuilder, MemoryOptimizer, ObjectPool, ProcessBridge};
use shared::logging;

/// Bridges a game server to a compiled companion process
#[derive(Parser)]
#[command(name = "sidekick")]
#[command(about = "Runs the companion-process bridge against a console host")]
struct Args {
    /// Directory holding the companion C++ sources
    #[arg(long, default_value = "./companions")]
    companions_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init_tracing(Some(&args.log_level));
    logging::log_startup("sidekick bridge");

    // Wire real services with dependency injection
    let host = Arc::new(ConsoleHost::new());
    let messenger = Arc::new(RealMessenger::new(Arc::clone(&host)));
    messenger.initialize();

    let pool = Arc::new(ObjectPool::new());
    let optimizer = MemoryOptimizer::new(Arc::clone(&pool), Arc::new(RealHeapProbe::new()));
    optimizer.start();

    let builder = RealExecutableBuilder::new(args.companions_dir);
    info!(
        "Found {} companion source(s) in {}",
        builder.source_count(),
        builder.sources_dir().display()
    );

    let bridge = ProcessBridge::new(
        Arc::clone(&host),
        builder,
        Arc::clone(&messenger),
        Arc::clone(&pool),
    );
    bridge.start()?;

    // Admin console
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("reload") => {
                info!("Reloading companion process...");
                bridge.restart()?;
                info!("Reload complete");
            }
            Some("version") => println!("sidekick {}", env!("CARGO_PKG_VERSION")),
            Some("stats") => {
                let stats = bridge.stats();
                println!(
                    "running: {}, messages: {}, queue: {}, pool: {}",
                    stats.running,
                    stats.messages_processed,
                    stats.queue_depth,
                    stats.pool_entries
                );
            }
            Some("event") => match parts.next() {
                Some(name) => {
                    let event_args: Vec<String> = parts.map(str::to_string).collect();
                    if !bridge.send_event(name, event_args) {
                        println!("event dropped (bridge stopped or queue full)");
                    }
                }
                None => println!("usage: event <name> [args...]"),
            },
            Some("quit") | Some("stop") | Some("exit") => break,
            Some(other) => {
                println!("Unknown command: {other} (reload|version|stats|event|quit)")
            }
            None => {}
        }
    }

    logging::log_shutdown("console session ended");
    bridge.stop();
    optimizer.shutdown();
    messenger.cleanup();
    logging::log_success("Bridge stopped gracefully");

    Ok(())
}
