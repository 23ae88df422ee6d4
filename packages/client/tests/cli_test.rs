//! Process-based tests of the client binary.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Helper struct to manage client process lifecycle
struct TestClient {
    process: Child,
    stdin: Option<ChildStdin>,
}

impl TestClient {
    /// Start the client binary with the given arguments
    fn start(args: &[&str]) -> Self {
        let mut process = Command::new(env!("CARGO_BIN_EXE_kapichat-client"))
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::piped())
            .spawn()
            .expect("Failed to start client");

        // Take stdin for sending input lines
        let stdin = process.stdin.take();

        TestClient { process, stdin }
    }

    /// Send a line to the client's stdin
    fn send_line(&mut self, line: &str) -> Result<(), std::io::Error> {
        if let Some(stdin) = &mut self.stdin {
            writeln!(stdin, "{}", line)?;
            stdin.flush()?;
        }
        Ok(())
    }

    /// Wait for the client process to exit with timeout
    fn wait_for_exit(&mut self, timeout: Duration) -> Result<std::process::ExitStatus, String> {
        let start = std::time::Instant::now();
        loop {
            if let Ok(Some(status)) = self.process.try_wait() {
                return Ok(status);
            }
            if start.elapsed() > timeout {
                return Err(format!(
                    "Timeout waiting for process to exit after {:?}",
                    timeout
                ));
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    /// Everything the client printed on stdout (after it exited)
    fn stdout(&mut self) -> String {
        let mut output = String::new();
        if let Some(stdout) = &mut self.process.stdout {
            stdout.read_to_string(&mut output).ok();
        }
        output
    }
}

impl Drop for TestClient {
    fn drop(&mut self) {
        // Kill the client process when done
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Bind a listener on an ephemeral port
fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().unwrap().port().to_string();
    (listener, port)
}

#[test]
fn test_client_exits_when_server_closes_connection() {
    // テスト項目: サーバーが接続直後に切断するとクライアントは通知を表示して終了する
    // given (前提条件):
    let (listener, port) = bind();
    let server = thread::spawn(move || {
        let (socket, _) = listener.accept().expect("Failed to accept");
        drop(socket);
    });

    // when (操作):
    let mut client = TestClient::start(&["127.0.0.1", &port]);
    let exit = client.wait_for_exit(Duration::from_secs(10));

    // then (期待する結果):
    server.join().unwrap();
    let status = exit.expect("Client should exit after the server closes");
    assert!(status.success(), "Client exited with {:?}", status);
    let stdout = client.stdout();
    assert!(stdout.contains("[SYSTEM] Server closed the connection"));
    assert!(stdout.contains("[SYSTEM] Disconnected from server"));
}

#[test]
fn test_client_survives_connect_failure_and_quits_on_command() {
    // テスト項目: 接続に失敗しても対話ループは続き、/help と /quit を処理して終了する
    // given (前提条件):
    let (listener, port) = bind();
    drop(listener);
    let mut client = TestClient::start(&["127.0.0.1", &port]);

    // when (操作):
    client.send_line("/help").unwrap();
    client.send_line("/quit").unwrap();
    let exit = client.wait_for_exit(Duration::from_secs(10));

    // then (期待する結果):
    let status = exit.expect("Client should exit after /quit");
    assert!(status.success(), "Client exited with {:?}", status);
    let stdout = client.stdout();
    assert!(stdout.contains("[ERROR] Error connecting to server"));
    assert!(stdout.contains("Available commands:"));
    assert!(stdout.contains("[SYSTEM] Exiting client..."));
}

#[test]
fn test_test_mode_sends_scripted_commands() {
    // テスト項目: --test モードでスクリプトのコマンドが順にサーバーへ送られる
    // given (前提条件):
    let (listener, port) = bind();
    let (received_tx, received_rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut socket, _) = listener.accept().expect("Failed to accept");
        let mut received = String::new();
        socket.read_to_string(&mut received).ok();
        received_tx.send(received).ok();
    });

    // when (操作):
    let mut client = TestClient::start(&["127.0.0.1", &port, "--test", "--step-delay-ms", "10"]);
    let exit = client.wait_for_exit(Duration::from_secs(15));

    // then (期待する結果):
    let status = exit.expect("Scripted run should finish on its own");
    assert!(status.success(), "Client exited with {:?}", status);
    let received = received_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("Server should have received the script");
    let order = [
        "/listrooms",
        "/createroom TestRoom_",
        "/nickname TestUser",
        "/whisper user_1 Hello there!",
        "/quit",
    ];
    let mut from = 0;
    for expected in order {
        let found = received[from..]
            .find(expected)
            .unwrap_or_else(|| panic!("{:?} missing from {:?}", expected, received));
        from += found + expected.len();
    }
    assert!(!received.contains("/help"));
    let stdout = client.stdout();
    assert!(stdout.contains("Test Case 6: Showing help..."));
    assert!(stdout.contains("Available commands:"));
}
