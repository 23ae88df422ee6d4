//! Client execution logic: the interactive loop and the scripted test run.

use std::time::Duration;

use kapichat_shared::time::{SystemClock, unix_timestamp_secs};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::{mpsc, oneshot};

use crate::{
    config::ClientConfig,
    connection::LinkStatus,
    console::Console,
    error::ClientError,
    session::{ClientSession, Flow},
};

/// Line sent to the server when the scripted run ends
const SCRIPT_QUIT_LINE: &str = "/quit";

/// Time given to the server to process the final quit line
const SCRIPT_QUIT_GRACE: Duration = Duration::from_millis(500);

/// Run the interactive client until `/exit`, end of input, or a lost connection
pub async fn run_client(config: ClientConfig, console: Console) -> Result<(), ClientError> {
    console.clear_screen();
    console.banner(true);

    let mut session = ClientSession::new(&config, console.clone());
    let mut status = session.subscribe();
    if let Err(e) = session.connect().await {
        tracing::warn!("Initial connection failed: {}", e);
    }

    let (ready_rx, mut input_rx) = spawn_line_reader();
    ready_rx.await.unwrap_or(Ok(()))?;

    loop {
        tokio::select! {
            biased;
            _ = status.wait_for(|status| *status == LinkStatus::Lost) => {
                tracing::info!("Connection lost, leaving input loop");
                break;
            }
            line = input_rx.recv() => match line {
                Some(line) => {
                    if session.execute(&line).await == Flow::Exit {
                        break;
                    }
                }
                None => {
                    tracing::info!("Input closed");
                    session.disconnect().await;
                    break;
                }
            },
        }
    }

    Ok(())
}

/// Read lines on a dedicated thread and forward them over a channel.
///
/// The first receiver reports whether the line editor could be created.
fn spawn_line_reader() -> (
    oneshot::Receiver<Result<(), ReadlineError>>,
    mpsc::UnboundedReceiver<String>,
) {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => {
                ready_tx.send(Ok(())).ok();
                rl
            }
            Err(e) => {
                ready_tx.send(Err(e)).ok();
                return;
            }
        };

        loop {
            match rl.readline("") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str()).ok();
                    }
                    if input_tx.send(line).is_err() {
                        // Channel closed, exit thread
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    (ready_rx, input_rx)
}

/// One step of the scripted test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    pub title: &'static str,
    pub line: String,
}

/// The lines the scripted run feeds through the interpreter after connecting
pub fn script_steps(room_suffix: i64) -> Vec<ScriptStep> {
    vec![
        ScriptStep {
            title: "Listing rooms...",
            line: "/listrooms".to_string(),
        },
        ScriptStep {
            title: "Creating a room...",
            line: format!("/createroom TestRoom_{}", room_suffix),
        },
        ScriptStep {
            title: "Changing nickname...",
            line: "/nickname TestUser".to_string(),
        },
        ScriptStep {
            title: "Sending a whisper...",
            line: "/whisper user_1 Hello there!".to_string(),
        },
        ScriptStep {
            title: "Showing help...",
            line: "/help".to_string(),
        },
    ]
}

/// Run the scripted command sequence non-interactively.
///
/// Every step runs even when an earlier one failed.
pub async fn run_test_script(config: ClientConfig, console: Console) {
    console.clear_screen();
    console.banner(false);
    console.note("\nRunning test cases...\n");

    let mut session = ClientSession::new(&config, console.clone());

    console.note("Test Case 1: Connecting to server...");
    if let Err(e) = session.connect().await {
        tracing::warn!("Scripted connect failed: {}", e);
    }
    tokio::time::sleep(config.step_delay).await;

    let steps = script_steps(unix_timestamp_secs(&SystemClock));
    for (index, step) in steps.iter().enumerate() {
        console.note(&format!("\nTest Case {}: {}", index + 2, step.title));
        session.execute(&step.line).await;
        tokio::time::sleep(config.step_delay).await;
    }

    console.note("\nTest cases completed.");
    tokio::time::sleep(config.step_delay).await;

    if session.connection().is_running().await {
        match session.connection().send_line(SCRIPT_QUIT_LINE).await {
            Ok(()) => tokio::time::sleep(SCRIPT_QUIT_GRACE).await,
            Err(e) => tracing::debug!("Failed to send quit line: {}", e),
        }
    }
    session.disconnect().await;
}
