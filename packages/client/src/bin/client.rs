//! Line-based TCP chat client.
//!
//! Type your nickname as the first line, then chat. Type `exit` to leave.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client
//! cargo run --bin hiroba-client -- --host 127.0.0.1 --port 12345
//! ```

use clap::Parser;
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Line-based TCP chat client", long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to connect to
    #[arg(short = 'p', long, default_value_t = 12345)]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Chat output goes to stdout, so only warnings are logged by default
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let args = Args::parse();

    if let Err(e) = hiroba_client::run_client_session(&args.host, args.port).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
