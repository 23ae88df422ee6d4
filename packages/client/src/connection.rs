//! TCP 接続のライフサイクル管理
//!
//! ## 責務
//!
//! - ソケットの接続・切断（書き込み側ハンドルの唯一の所有者）
//! - 行の送信（フレーミングなしの生バイト列）
//! - 受信ループの起動と停止
//!
//! ## 設計ノート
//!
//! `running` はフラグを別に持たず、書き込み側ハンドル（`Option<Writer>`）
//! の有無から導出します。切断は `Option::take` で行うため、入力側と受信側の
//! どちらから同時に呼ばれてもハンドルの解放はちょうど 1 回です。
//!
//! 接続ごとに epoch を進め、受信ループは自分の epoch に対してのみ切断を要求します。
//!
//! 送信中はロックを保持します。書き込みは `WRITE_TIMEOUT` で打ち切るため、
//! 受信側の切断が待たされるのは最大でもその時間です。

use std::{io, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpStream, tcp::OwnedReadHalf},
    sync::{Mutex, oneshot, watch},
};

use crate::{
    command::ServerAddr,
    console::Console,
    decoder::{ChunkDecoder, DecodedChunk},
    error::ClientError,
};

/// Maximum number of bytes read from the socket at once
pub const READ_BUFFER_SIZE: usize = 1024;

/// Upper bound on a single send
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Observable state of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Never connected, or disconnected locally
    Idle,
    Connected,
    /// Closed by the peer or failed mid-session
    Lost,
}

/// Why a connection is being torn down
#[derive(Debug)]
enum Teardown {
    Local,
    PeerClosed,
    ReadFailed(io::Error),
    WriteFailed,
}

impl Teardown {
    fn next_status(&self) -> LinkStatus {
        match self {
            Self::Local => LinkStatus::Idle,
            Self::PeerClosed | Self::ReadFailed(_) | Self::WriteFailed => LinkStatus::Lost,
        }
    }
}

#[derive(Default)]
struct Link {
    writer: Option<Writer>,
    stop: Option<oneshot::Sender<()>>,
    epoch: u64,
}

struct Inner {
    console: Console,
    link: Mutex<Link>,
    status: watch::Sender<LinkStatus>,
    write_timeout: Duration,
}

/// Owner of the chat socket
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    pub fn new(console: Console) -> Self {
        Self::with_write_timeout(console, WRITE_TIMEOUT)
    }

    fn with_write_timeout(console: Console, write_timeout: Duration) -> Self {
        let (status, _) = watch::channel(LinkStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                console,
                link: Mutex::new(Link::default()),
                status,
                write_timeout,
            }),
        }
    }

    /// Watch the link status
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.inner.status.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.link.lock().await.writer.is_some()
    }

    /// Open a stream to `target` and start the receive loop.
    ///
    /// A single attempt is made. On failure the error is reported and the
    /// connection is left disconnected.
    pub async fn connect(&self, target: &ServerAddr) -> Result<(), ClientError> {
        if self.is_running().await {
            return Err(ClientError::AlreadyConnected);
        }

        tracing::info!("Connecting to {}", target);
        let stream = match TcpStream::connect((target.host.as_str(), target.port)).await {
            Ok(stream) => stream,
            Err(source) => {
                let error = ClientError::Connect {
                    addr: target.to_string(),
                    source,
                };
                self.inner.console.error(error.to_string());
                self.disconnect().await;
                return Err(error);
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY: {}", e);
        }

        let (reader, writer) = stream.into_split();
        let (stop_tx, stop_rx) = oneshot::channel();
        let epoch = {
            let mut link = self.inner.link.lock().await;
            if link.writer.is_some() {
                // Another connect won the race; this stream is dropped.
                return Err(ClientError::AlreadyConnected);
            }
            link.epoch += 1;
            link.writer = Some(Box::new(writer));
            link.stop = Some(stop_tx);
            link.epoch
        };

        self.inner.console.system(format!("Connected to {}", target));
        self.inner.status.send_replace(LinkStatus::Connected);
        tracing::debug!("Connection epoch {} started", epoch);

        tokio::spawn(receive_loop(self.clone(), reader, stop_rx, epoch));
        Ok(())
    }

    /// Tear down the live connection, if any.
    ///
    /// Returns `true` if a connection was actually closed by this call.
    pub async fn disconnect(&self) -> bool {
        self.teardown(None, Teardown::Local).await
    }

    /// Write `text` to the socket as-is.
    ///
    /// A write that does not complete within the write timeout fails with
    /// `ErrorKind::TimedOut` and tears the connection down.
    pub async fn send_line(&self, text: &str) -> Result<(), ClientError> {
        let mut link = self.inner.link.lock().await;
        let epoch = link.epoch;
        let Some(writer) = link.writer.as_mut() else {
            drop(link);
            self.inner.console.error(ClientError::NotConnected.to_string());
            return Err(ClientError::NotConnected);
        };

        let write = writer.write_all(text.as_bytes());
        let written = tokio::time::timeout(self.inner.write_timeout, write)
            .await
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")));
        match written {
            Ok(()) => {
                drop(link);
                self.inner.console.sent(text);
                Ok(())
            }
            Err(source) => {
                drop(link);
                let error = ClientError::Send(source);
                self.inner.console.error(error.to_string());
                self.teardown(Some(epoch), Teardown::WriteFailed).await;
                Err(error)
            }
        }
    }

    /// Close the connection of `epoch` (or whichever is live when `None`).
    ///
    /// The decision is made under the lock; notices are printed only by the
    /// call that actually took the handle.
    async fn teardown(&self, epoch: Option<u64>, cause: Teardown) -> bool {
        let (writer, stop) = {
            let mut link = self.inner.link.lock().await;
            if epoch.is_some_and(|epoch| epoch != link.epoch) {
                return false;
            }
            let Some(writer) = link.writer.take() else {
                return false;
            };
            (writer, link.stop.take())
        };

        if let Some(stop) = stop {
            stop.send(()).ok();
        }
        release(writer).await;

        let next_status = cause.next_status();
        tracing::info!("Connection closed ({:?})", cause);
        let console = &self.inner.console;
        match cause {
            Teardown::Local | Teardown::WriteFailed => {}
            Teardown::PeerClosed => console.system("Server closed the connection"),
            Teardown::ReadFailed(e) => console.error(ClientError::Receive(e).to_string()),
        }
        console.system("Disconnected from server");
        self.inner.status.send_replace(next_status);
        true
    }
}

async fn release(mut writer: Writer) {
    if let Err(e) = writer.shutdown().await {
        tracing::debug!("Socket shutdown failed: {}", e);
    }
}

/// Read and display inbound data until stopped, closed, or failed.
async fn receive_loop(
    connection: Connection,
    mut reader: OwnedReadHalf,
    mut stop: oneshot::Receiver<()>,
    epoch: u64,
) {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut decoder = ChunkDecoder::new();

    loop {
        let read = tokio::select! {
            biased;
            _ = &mut stop => {
                tracing::debug!("Receive loop of epoch {} stopped", epoch);
                break;
            }
            read = reader.read(&mut buffer) => read,
        };

        match read {
            Ok(0) => {
                display(&connection, decoder.finish());
                connection.teardown(Some(epoch), Teardown::PeerClosed).await;
                break;
            }
            Ok(n) => display(&connection, decoder.decode(&buffer[..n])),
            Err(e) => {
                display(&connection, decoder.finish());
                connection.teardown(Some(epoch), Teardown::ReadFailed(e)).await;
                break;
            }
        }
    }
}

fn display(connection: &Connection, chunk: DecodedChunk) {
    if let Some(e) = chunk.malformed {
        tracing::warn!("{}", ClientError::Decode(e));
    }
    let message = chunk.text.trim_end();
    if !message.is_empty() {
        connection.inner.console.received(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kapichat_shared::time::FixedClock;
    use tokio::net::TcpListener;

    async fn install(connection: &Connection, writer: Writer) {
        let mut link = connection.inner.link.lock().await;
        link.epoch += 1;
        link.writer = Some(writer);
    }

    #[tokio::test]
    async fn test_write_failure_tears_down_as_lost() {
        // テスト項目: 書き込みに失敗すると Send エラーを返し、接続は Lost として切断され受信ループも止まる
        // given (前提条件):
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = ServerAddr::new("127.0.0.1", listener.local_addr().unwrap().port());
        let (console, transcript) = Console::capture(FixedClock::at_hms(10, 0, 0));
        let connection = Connection::new(console);
        connection.connect(&target).await.unwrap();
        let (_server, _) = listener.accept().await.unwrap();
        let (broken, peer) = tokio::io::duplex(64);
        drop(peer);
        let mut status = connection.subscribe();
        {
            let mut link = connection.inner.link.lock().await;
            link.writer = Some(Box::new(broken));
        }

        // when (操作):
        let result = connection.send_line("hello").await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::Send(_))));
        assert!(!connection.is_running().await);
        status.wait_for(|s| *s == LinkStatus::Lost).await.unwrap();
        assert_eq!(transcript.count("[ERROR] Error sending message"), 1);
        assert_eq!(transcript.count("Disconnected from server"), 1);
        assert_eq!(transcript.count("[SENT]"), 0);
        assert_eq!(transcript.count("Server closed the connection"), 0);
    }

    #[tokio::test]
    async fn test_stalled_write_times_out() {
        // テスト項目: 相手が読まずに書き込みが進まない場合、タイムアウトで切断される
        // given (前提条件):
        let (console, transcript) = Console::capture(FixedClock::at_hms(10, 0, 0));
        let connection = Connection::with_write_timeout(console, Duration::from_millis(50));
        let (stalled, _peer) = tokio::io::duplex(1);
        install(&connection, Box::new(stalled)).await;

        // when (操作):
        let result = connection.send_line("more than one byte").await;

        // then (期待する結果):
        match result {
            Err(ClientError::Send(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("expected a timed out send, got {:?}", other),
        }
        assert!(!connection.is_running().await);
        assert_eq!(*connection.subscribe().borrow(), LinkStatus::Lost);
        assert_eq!(transcript.count("Disconnected from server"), 1);
    }
}
