//! Client session: the current target plus the command interpreter.

use std::time::Duration;

use crate::{
    command::{Action, Input, ServerAddr, parse_input},
    config::ClientConfig,
    connection::{Connection, LinkStatus},
    console::Console,
    error::{ClientError, ValidationError},
};

/// Whether the input loop should keep going after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The client's view of one server target and its connection
pub struct ClientSession {
    target: ServerAddr,
    connection: Connection,
    console: Console,
    send_pause: Duration,
}

impl ClientSession {
    pub fn new(config: &ClientConfig, console: Console) -> Self {
        Self {
            target: config.target.clone(),
            connection: Connection::new(console.clone()),
            console,
            send_pause: config.send_pause,
        }
    }

    pub fn target(&self) -> &ServerAddr {
        &self.target
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<LinkStatus> {
        self.connection.subscribe()
    }

    /// Connect to the current target (errors are already reported)
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.connection.connect(&self.target).await
    }

    pub async fn disconnect(&self) -> bool {
        self.connection.disconnect().await
    }

    /// Send a line, pausing briefly afterwards
    pub async fn send(&self, line: &str) -> Result<(), ClientError> {
        self.connection.send_line(line).await?;
        if !self.send_pause.is_zero() {
            tokio::time::sleep(self.send_pause).await;
        }
        Ok(())
    }

    /// Interpret one line of user input.
    pub async fn execute(&mut self, line: &str) -> Flow {
        match parse_input(line) {
            Input::Blank => Flow::Continue,
            Input::Chat(text) => {
                self.forward(&text).await;
                Flow::Continue
            }
            Input::Command(command) => match command.into_action() {
                Ok(action) => self.perform(action).await,
                Err(e) => {
                    self.report(&e);
                    Flow::Continue
                }
            },
        }
    }

    async fn perform(&mut self, action: Action) -> Flow {
        match action {
            Action::Forward(line) => self.forward(&line).await,
            Action::Passthrough { token, line } => {
                if self.connection.is_running().await {
                    self.forward(&line).await;
                } else {
                    self.report(&ValidationError::UnknownCommand(token));
                }
            }
            Action::ShowServer => {
                self.console.system(format!("Current server: {}", self.target));
            }
            Action::SetServer(target) => self.set_server(target).await,
            Action::ShowStatus => {
                let connected = self.connection.is_running().await;
                self.console.status(connected, &self.target);
            }
            Action::Connect => {
                if self.connection.is_running().await {
                    self.console.system("Already connected to server.");
                } else if let Err(e) = self.connect().await {
                    tracing::debug!("Connect failed: {}", e);
                }
            }
            Action::Disconnect => {
                if !self.disconnect().await {
                    self.console.system("Not connected to server.");
                }
            }
            Action::ShowHelp => self.console.help(),
            Action::Exit => {
                self.console.system("Exiting client...");
                self.disconnect().await;
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    async fn forward(&self, line: &str) {
        if let Err(e) = self.send(line).await {
            tracing::debug!("Forwarding failed: {}", e);
        }
    }

    /// Switch to a new target; never reconnects on its own.
    async fn set_server(&mut self, target: ServerAddr) {
        if self.connection.is_running().await {
            self.disconnect().await;
        }
        self.target = target;
        self.console.system(format!("Server set to {}", self.target));
        self.console.status(false, &self.target);
    }

    fn report(&self, error: &ValidationError) {
        self.console.error(error.to_string());
        if matches!(error, ValidationError::UnknownCommand(_)) {
            self.console.system("Type /help for available commands.");
        }
    }
}
