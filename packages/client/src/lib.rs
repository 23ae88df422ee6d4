//! Terminal chat client for a line-oriented text chat protocol over raw TCP.
//!
//! The client keeps one connection to a chat server, prints inbound data as it
//! arrives, and interprets the user's input lines as chat messages or
//! slash-commands.

pub mod command;
pub mod config;
pub mod connection;
pub mod console;
pub mod decoder;
pub mod error;
pub mod runner;
pub mod session;

pub use config::ClientConfig;
pub use console::Console;
pub use error::ClientError;
pub use runner::{run_client, run_test_script};
pub use session::{ClientSession, Flow};
