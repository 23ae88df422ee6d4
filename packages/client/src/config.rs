//! Client configuration.

use std::time::Duration;

use crate::command::ServerAddr;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;

/// Pause after each locally initiated send
pub const DEFAULT_SEND_PAUSE: Duration = Duration::from_millis(100);

/// Delay between the steps of the scripted test run
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(1);

/// Runtime settings of the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub target: ServerAddr,
    pub send_pause: Duration,
    pub step_delay: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            target: ServerAddr::new(host, port),
            ..Self::default()
        }
    }

    /// Same settings without any pauses, for tests
    pub fn without_delays(mut self) -> Self {
        self.send_pause = Duration::ZERO;
        self.step_delay = Duration::ZERO;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target: ServerAddr::new(DEFAULT_HOST, DEFAULT_PORT),
            send_pause: DEFAULT_SEND_PAUSE,
            step_delay: DEFAULT_STEP_DELAY,
        }
    }
}
