//! Line-based TCP chat relay server.
//!
//! Registers every connection under the nickname it sends first, then
//! rebroadcasts each line it receives to all other participants.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;
use hiroba_server::{
    config::{
        DEFAULT_HOST, DEFAULT_MAX_LINE_LENGTH, DEFAULT_OUTBOUND_QUEUE_CAPACITY, DEFAULT_PORT,
        ServerConfig,
    },
    infrastructure::registry::InMemoryParticipantRegistry,
    ui::Server,
    usecase::{ConnectParticipantUseCase, DisconnectParticipantUseCase, SendMessageUseCase},
};
use hiroba_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Line-based TCP chat relay server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Longest inbound line (in bytes) before the connection is dropped
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Lines queued for a slow reader before it is disconnected
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_QUEUE_CAPACITY)]
    outbound_queue_capacity: usize,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        max_line_length: args.max_line_length,
        outbound_queue_capacity: args.outbound_queue_capacity,
        ..ServerConfig::default()
    };

    // 1. Registry (in-memory participant set)
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(InMemoryParticipantRegistry::new(clock.clone()));

    // 2. UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        registry.clone(),
        clock.clone(),
    ));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(registry.clone(), clock.clone()));
    let disconnect_participant_usecase =
        Arc::new(DisconnectParticipantUseCase::new(registry, clock));

    // 3. Server
    let server = Server::new(
        config,
        connect_participant_usecase,
        send_message_usecase,
        disconnect_participant_usecase,
    );
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
