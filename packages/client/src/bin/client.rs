//! Terminal chat client for Kapichat servers.
//!
//! Connects to a chat server over TCP, prints everything the server sends, and
//! sends each line typed on stdin. Lines starting with "/" are commands; type
//! "/help" for the list.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kapichat-client
//! cargo run --bin kapichat-client -- 127.0.0.1 9000
//! cargo run --bin kapichat-client -- localhost 8080 --test
//! ```

use std::time::Duration;

use clap::Parser;

use kapichat_client::{
    ClientConfig, Console,
    config::{DEFAULT_HOST, DEFAULT_PORT},
};
use kapichat_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kapichat-client")]
#[command(about = "Terminal chat client for a line-oriented TCP chat server", long_about = None)]
struct Args {
    /// Server host name or address
    #[arg(default_value = DEFAULT_HOST)]
    host: String,

    /// Server port number
    #[arg(default_value_t = DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Run a scripted sequence of test commands instead of reading input
    #[arg(long)]
    test: bool,

    /// Delay between scripted test steps in milliseconds
    #[arg(long, default_value_t = 1000)]
    step_delay_ms: u64,
}

impl Args {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            step_delay: Duration::from_millis(self.step_delay_ms),
            ..ClientConfig::new(self.host.clone(), self.port)
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let args = Args::parse();
    let config = args.config();
    let console = Console::stdout();

    if args.test {
        kapichat_client::run_test_script(config, console).await;
        return;
    }

    if let Err(e) = kapichat_client::run_client(config, console).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
