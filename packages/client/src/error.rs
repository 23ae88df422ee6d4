//! Error types for the chat client.

use std::io;

use rustyline::error::ReadlineError;
use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The socket could not be established
    #[error("Error connecting to server {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Connect requested while a connection is live
    #[error("Already connected to server")]
    AlreadyConnected,

    /// Send attempted while disconnected
    #[error("Not connected to server")]
    NotConnected,

    /// Write failure mid-session
    #[error("Error sending message: {0}")]
    Send(#[source] io::Error),

    /// Read failure mid-session
    #[error("Error receiving message: {0}")]
    Receive(#[source] io::Error),

    /// Malformed bytes from the peer
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The line editor could not be started or failed while reading
    #[error("Line editor error: {0}")]
    LineEditor(#[from] ReadlineError),
}

/// Inbound bytes that were not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Received invalid data from server ({malformed} malformed sequence(s) replaced)")]
pub struct DecodeError {
    /// Number of invalid sequences replaced with U+FFFD
    pub malformed: usize,
}

/// Local command validation errors. These never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing room name. Usage: /createroom <room_name>")]
    MissingRoomName,

    #[error("Missing parameters. Usage: /whisper <user_id> <message>")]
    MissingWhisperParameters,

    #[error("Missing nickname. Usage: /nickname <new_nickname>")]
    MissingNickname,

    #[error("Invalid format. Use /server host:port")]
    InvalidServerFormat,

    #[error("Invalid port number format: {0}")]
    InvalidPortFormat(String),

    #[error("Invalid port number {0}. Must be between 1 and 65535.")]
    InvalidPortNumber(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}
