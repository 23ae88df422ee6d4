//! Timestamped, categorized console output.
//!
//! Every output path of the client goes through one [`Console`], whose writer
//! sits behind a single mutex so concurrent writers never interleave partial
//! lines.

use std::{
    io::{self, IsTerminal, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crossterm::{
    cursor::MoveTo,
    style::{Color, Stylize},
    terminal::{Clear, ClearType},
};
use kapichat_shared::time::{Clock, SystemClock, format_clock_time};

use crate::command::ServerAddr;

pub const WELCOME_BANNER: &str = r"
  _  __          _ _ _       ___ _           _
 | |/ /__ _ _ __(_) ( )___  / __| |__   __ _| |_
 | ' // _` | '_ \ | |// __| \__ \ '_ \ / _` | __|
 | . \ (_| | |_) | |  \__ \ ___) | | | (_| | |_
 |_|\_\__,_| .__/|_|  |___/|____/|_|  \__,_|\__|
           |_|
                  TERMINAL CLIENT
";

pub const USAGE_HINT: &str =
    "Type messages to send to the server. Type /help for commands, /exit to quit.";

pub const HELP_TEXT: &str = "
Available commands:
/listrooms           - List available chat rooms
/createroom <name>   - Create a new chat room
/whisper <id> <msg>  - Send private message to user
/nickname <name>     - Change your nickname
/server [host:port]  - Show or change server address
/status              - Show connection status
/connect             - Connect to the current server
/disconnect          - Disconnect from the server
/help                - Show this help message
/exit or /quit       - Exit the client

Other server commands (forwarded when connected):
/join <room>         - Join a chat room
/leave <room>        - Leave a chat room
/listusers <room>    - List the users in a chat room
";

const RULE_WIDTH: usize = 80;

/// Category of a timestamped console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    System,
    Error,
    Sent,
    Recv,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::Error => "ERROR",
            Self::Sent => "SENT",
            Self::Recv => "RECV",
        }
    }

    fn color(self) -> Color {
        match self {
            Self::System => Color::Yellow,
            Self::Error => Color::Red,
            Self::Sent => Color::Magenta,
            Self::Recv => Color::Green,
        }
    }
}

/// Format a console line as `[HH:MM:SS] [CATEGORY] message`
pub fn format_line(category: Category, timestamp: &str, message: &str, colored: bool) -> String {
    let stamp = format!("[{}]", timestamp);
    let body = format!("[{}] {}", category.label(), message);
    if colored {
        format!("{} {}", stamp.with(Color::White), body.with(category.color()))
    } else {
        format!("{} {}", stamp, body)
    }
}

/// Format the connection status line
pub fn format_status(connected: bool, target: &ServerAddr, colored: bool) -> String {
    let (status, color) = if connected {
        ("Connected", Color::Green)
    } else {
        ("Disconnected", Color::Red)
    };
    let line = format!("[STATUS] {} - Server: {}", status, target);
    if colored {
        line.with(color).to_string()
    } else {
        line
    }
}

/// Serialized writer for all client output
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    out: Mutex<Box<dyn Write + Send>>,
    clock: Box<dyn Clock>,
    colored: bool,
}

impl Console {
    /// Console on stdout, colored when stdout is a terminal
    pub fn stdout() -> Self {
        let colored = io::stdout().is_terminal();
        Self::new(io::stdout(), SystemClock, colored)
    }

    pub fn new(out: impl Write + Send + 'static, clock: impl Clock + 'static, colored: bool) -> Self {
        Self {
            inner: Arc::new(ConsoleInner {
                out: Mutex::new(Box::new(out)),
                clock: Box::new(clock),
                colored,
            }),
        }
    }

    /// Uncolored console writing into an in-memory [`Transcript`]
    pub fn capture(clock: impl Clock + 'static) -> (Self, Transcript) {
        let transcript = Transcript::default();
        (Self::new(transcript.clone(), clock, false), transcript)
    }

    pub fn system(&self, message: impl AsRef<str>) {
        self.emit(Category::System, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.emit(Category::Error, message.as_ref());
    }

    pub fn sent(&self, message: impl AsRef<str>) {
        self.emit(Category::Sent, message.as_ref());
    }

    pub fn received(&self, message: impl AsRef<str>) {
        self.emit(Category::Recv, message.as_ref());
    }

    pub fn status(&self, connected: bool, target: &ServerAddr) {
        self.write_line(&format_status(connected, target, self.inner.colored));
    }

    /// Plain highlighted note, used for headings
    pub fn note(&self, text: &str) {
        self.write_line(&self.cyan(text));
    }

    pub fn help(&self) {
        self.write_line(&self.cyan(HELP_TEXT));
    }

    pub fn banner(&self, with_usage_hint: bool) {
        let mut text = self.cyan(WELCOME_BANNER);
        if with_usage_hint {
            let rule = "=".repeat(RULE_WIDTH);
            for line in [USAGE_HINT, rule.as_str()] {
                text.push('\n');
                text.push_str(&self.paint(line, Color::Yellow));
            }
        }
        self.write_line(&text);
    }

    /// Clear the screen when writing to a terminal
    pub fn clear_screen(&self) {
        if !self.inner.colored {
            return;
        }
        let mut out = self.lock();
        if let Err(e) = crossterm::execute!(out, Clear(ClearType::All), MoveTo(0, 0)) {
            tracing::debug!("Failed to clear screen: {}", e);
        }
    }

    fn emit(&self, category: Category, message: &str) {
        let timestamp = format_clock_time(&self.inner.clock.now());
        self.write_line(&format_line(category, &timestamp, message, self.inner.colored));
    }

    fn write_line(&self, text: &str) {
        let mut out = self.lock();
        writeln!(out, "{}", text).ok();
        out.flush().ok();
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(text, Color::Cyan)
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.inner.colored {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.inner.out.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory console sink, cloneable so tests can read what was written
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Transcript {
    /// Everything written so far
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Number of lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
