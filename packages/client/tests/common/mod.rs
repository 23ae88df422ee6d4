//! Helpers shared by the in-process integration tests.

#![allow(dead_code)]

use std::time::Duration;

use kapichat_client::{
    command::ServerAddr,
    connection::{Connection, LinkStatus},
    console::{Console, Transcript},
};
use kapichat_shared::time::FixedClock;
use tokio::{io::AsyncReadExt, net::TcpListener, net::TcpStream};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Fake chat server bound to an ephemeral local port
pub async fn fake_server() -> (TcpListener, ServerAddr) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake server");
    let port = listener.local_addr().expect("No local address").port();
    (listener, ServerAddr::new("127.0.0.1", port))
}

/// Address on which nothing is listening
pub async fn closed_addr() -> ServerAddr {
    let (listener, addr) = fake_server().await;
    drop(listener);
    addr
}

pub async fn accept(listener: &TcpListener) -> TcpStream {
    let (socket, _) = tokio::time::timeout(TIMEOUT, listener.accept())
        .await
        .expect("Timed out waiting for the client")
        .expect("Failed to accept");
    socket
}

/// Read everything the client sends until it closes its side
pub async fn read_all(socket: &mut TcpStream) -> String {
    let mut received = Vec::new();
    tokio::time::timeout(TIMEOUT, socket.read_to_end(&mut received))
        .await
        .expect("Timed out waiting for the client to close")
        .expect("Failed to read");
    String::from_utf8(received).expect("Client sent invalid UTF-8")
}

pub fn capture() -> (Console, Transcript) {
    Console::capture(FixedClock::at_hms(10, 0, 0))
}

pub async fn wait_for_status(connection: &Connection, expected: LinkStatus) {
    let mut status = connection.subscribe();
    tokio::time::timeout(TIMEOUT, status.wait_for(|status| *status == expected))
        .await
        .expect("Timed out waiting for link status")
        .expect("Status channel closed");
}

pub async fn wait_for_text(transcript: &Transcript, needle: &str) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !transcript.contents().contains(needle) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting for {:?}. Transcript:\n{}",
            needle,
            transcript.contents()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
