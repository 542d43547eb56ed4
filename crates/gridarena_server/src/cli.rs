//! Command-line interface for the match server.

use clap::Parser;

/// Gridarena - real-time tic-tac-toe match server
#[derive(Parser, Debug)]
#[command(name = "gridarena_server")]
#[command(about = "Real-time tic-tac-toe match coordinator", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to the sqlite database file (created if it doesn't exist)
    #[arg(long, default_value = "gridarena.db")]
    pub db_path: String,

    /// Delay before pushing match-start notifications, in milliseconds.
    /// Gives freshly paired clients time to finish registering their
    /// WebSocket sessions.
    #[arg(long, default_value = "500")]
    pub pairing_delay_ms: u64,
}
