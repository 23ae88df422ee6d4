//! Command parsing and validation.
//!
//! This module contains pure functions that turn one line of user input into
//! an [`Action`] without side effects, making them easy to test.

use std::{fmt, num::IntErrorKind};

use crate::error::ValidationError;

/// A host/port pair the client connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Slash-command verbs known to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    ListRooms,
    CreateRoom,
    Whisper,
    Nickname,
    Server,
    Status,
    Connect,
    Disconnect,
    Help,
    Exit,
    UnknownForward,
}

impl Verb {
    /// Match a verb token case-sensitively.
    pub fn from_token(token: &str) -> Self {
        match token {
            "/listrooms" => Self::ListRooms,
            "/createroom" => Self::CreateRoom,
            "/whisper" => Self::Whisper,
            "/nickname" => Self::Nickname,
            "/server" => Self::Server,
            "/status" => Self::Status,
            "/connect" => Self::Connect,
            "/disconnect" => Self::Disconnect,
            "/help" => Self::Help,
            "/exit" | "/quit" => Self::Exit,
            _ => Self::UnknownForward,
        }
    }
}

/// A parsed slash-command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    /// Everything after the first space (empty if there is none)
    pub args: String,
    /// The line exactly as typed
    pub line: String,
}

impl Command {
    /// The verb token as typed, e.g. `/listrooms`.
    pub fn token(&self) -> &str {
        self.line
            .split_once(' ')
            .map_or(self.line.as_str(), |(token, _)| token)
    }

    /// Validate the arguments and decide what to do with this command.
    pub fn into_action(self) -> Result<Action, ValidationError> {
        match self.verb {
            Verb::ListRooms => Ok(Action::Forward(self.line)),
            Verb::CreateRoom if self.args.is_empty() => Err(ValidationError::MissingRoomName),
            Verb::CreateRoom => Ok(Action::Forward(self.line)),
            Verb::Whisper if !self.args.contains(' ') => {
                Err(ValidationError::MissingWhisperParameters)
            }
            Verb::Whisper => Ok(Action::Forward(self.line)),
            Verb::Nickname if self.args.is_empty() => Err(ValidationError::MissingNickname),
            Verb::Nickname => Ok(Action::Forward(self.line)),
            Verb::Server if self.args.is_empty() => Ok(Action::ShowServer),
            Verb::Server => parse_server_target(&self.args).map(Action::SetServer),
            Verb::Status => Ok(Action::ShowStatus),
            Verb::Connect => Ok(Action::Connect),
            Verb::Disconnect => Ok(Action::Disconnect),
            Verb::Help => Ok(Action::ShowHelp),
            Verb::Exit => Ok(Action::Exit),
            Verb::UnknownForward => Ok(Action::Passthrough {
                token: self.token().to_string(),
                line: self.line,
            }),
        }
    }
}

/// One classified line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Empty or whitespace-only line; dropped silently
    Blank,
    /// Free-text chat message
    Chat(String),
    Command(Command),
}

/// What the session should do for a validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send the line to the server
    Forward(String),
    /// Send the line if connected, otherwise report an unknown command
    Passthrough { token: String, line: String },
    ShowServer,
    SetServer(ServerAddr),
    ShowStatus,
    Connect,
    Disconnect,
    ShowHelp,
    Exit,
}

/// Classify one line of user input.
pub fn parse_input(line: &str) -> Input {
    if !line.starts_with('/') {
        if line.trim().is_empty() {
            return Input::Blank;
        }
        return Input::Chat(line.to_string());
    }

    let (token, args) = line.split_once(' ').unwrap_or((line, ""));
    Input::Command(Command {
        verb: Verb::from_token(token),
        args: args.to_string(),
        line: line.to_string(),
    })
}

/// Parse the `host:port` argument of `/server`.
///
/// The host is everything before the first `:` and must not be empty.
pub fn parse_server_target(args: &str) -> Result<ServerAddr, ValidationError> {
    let (host, port) = args
        .split_once(':')
        .ok_or(ValidationError::InvalidServerFormat)?;
    if host.is_empty() {
        return Err(ValidationError::InvalidServerFormat);
    }
    Ok(ServerAddr::new(host, parse_port(port)?))
}

/// Parse a port number, accepting only 1..=65535.
pub fn parse_port(text: &str) -> Result<u16, ValidationError> {
    let trimmed = text.trim();
    let number = match trimmed.parse::<i64>() {
        Ok(number) => number,
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            return Err(ValidationError::InvalidPortNumber(trimmed.to_string()));
        }
        Err(_) => return Err(ValidationError::InvalidPortFormat(trimmed.to_string())),
    };

    match u16::try_from(number) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ValidationError::InvalidPortNumber(trimmed.to_string())),
    }
}
