//! Per-connection line handling.
//!
//! Every TCP connection, accepted or dialed, runs the same way: a writer
//! task drains the connection's queue into the socket while the reader
//! parses one line at a time and dispatches it. Replies go through the
//! queue too, so they interleave cleanly with relayed AT lines.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::StreamExt;
use herd_protocol::{AtLine, Command, Frame, LineCodec, ParseError, HELP_TEXT, QUIT_TEXT};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::herd::{unix_now, Herd};
use crate::links::{LineReceiver, LineSender, LinkId, PendingDial};

/// Serve a connection accepted by the listener.
pub async fn serve(herd: Arc<Herd>, stream: TcpStream, addr: SocketAddr) -> Result<()> {
    let total = herd.connection_opened();
    info!("Connection opened from {}; {} open", addr, total);

    let (tx, rx) = mpsc::unbounded_channel();
    let result = run(Arc::clone(&herd), stream, tx, rx, None).await;

    let total = herd.connection_closed();
    info!("Connection closed from {}; {} open", addr, total);
    result
}

/// Connect an outbound link and run it until either side closes.
///
/// A failed or timed out connect drops the link so the next update dials
/// again.
pub async fn dial(herd: Arc<Herd>, dial: PendingDial) {
    let PendingDial {
        neighbor,
        id,
        tx,
        rx,
    } = dial;

    let Some(addr) = herd.topology().addr(&neighbor).cloned() else {
        herd.state().await.links.remove(&neighbor, id);
        warn!("No address for neighbor {}", neighbor);
        return;
    };

    let connect = TcpStream::connect((addr.host.as_str(), addr.port));
    let connected = tokio::time::timeout(herd.dial_timeout(), connect)
        .await
        .unwrap_or_else(|_| {
            Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no answer within {:?}", herd.dial_timeout()),
            ))
        });
    let stream = match connected {
        Ok(stream) => stream,
        Err(e) => {
            herd.state().await.links.remove(&neighbor, id);
            warn!(
                "Connection failed from {} to {} at {}: {}",
                herd.name(),
                neighbor,
                addr,
                e
            );
            return;
        }
    };

    if !herd.state().await.links.mark_established(&neighbor, id) {
        debug!("Link {} to {} was replaced while connecting", id, neighbor);
    }
    let total = herd.connection_opened();
    info!(
        "Connection made from {} to {}; {} open",
        herd.name(),
        neighbor,
        total
    );

    if let Err(e) = run(
        Arc::clone(&herd),
        stream,
        tx,
        rx,
        Some((neighbor.clone(), id)),
    )
    .await
    {
        warn!("Link from {} to {} failed: {}", herd.name(), neighbor, e);
    }

    let total = herd.connection_closed();
    info!(
        "Connection lost from {} to {}; {} open",
        herd.name(),
        neighbor,
        total
    );
}

async fn run(
    herd: Arc<Herd>,
    stream: TcpStream,
    tx: LineSender,
    rx: LineReceiver,
    link: Option<(String, LinkId)>,
) -> Result<()> {
    let (reader, writer) = stream.into_split();
    tokio::spawn(write_lines(writer, rx));

    let mut session = Session {
        herd,
        tx,
        link,
    };
    let mut frames = FramedRead::new(reader, LineCodec::new());

    let result = loop {
        let reply = match frames.next().await {
            Some(Ok(frame)) => session.handle_frame(frame).await,
            Some(Err(e)) => break Err(Error::Io(e)),
            None => break Ok(()),
        };
        if let Some(reply) = reply {
            if session.tx.send(reply).is_err() {
                break Ok(());
            }
        }
    };

    session.close().await;
    result
}

/// Write queued text until every sender is gone or the socket fails.
async fn write_lines(mut writer: OwnedWriteHalf, mut rx: LineReceiver) {
    while let Some(text) = rx.recv().await {
        if let Err(e) = writer.write_all(text.as_bytes()).await {
            debug!("Write failed: {}", e);
            return;
        }
    }
    let _ = writer.shutdown().await;
}

/// Dispatch state for one connection.
pub struct Session {
    herd: Arc<Herd>,
    tx: LineSender,
    /// The link this connection carries, if any
    link: Option<(String, LinkId)>,
}

impl Session {
    /// A session that queues its output on `tx`.
    pub fn new(herd: Arc<Herd>, tx: LineSender) -> Self {
        Self {
            herd,
            tx,
            link: None,
        }
    }

    /// The neighbor this connection is registered as a link for.
    pub fn link(&self) -> Option<&str> {
        self.link.as_ref().map(|(n, _)| n.as_str())
    }

    /// Handle one framed line. Undecodable and over-long lines are echoed
    /// back as unrecognized.
    pub async fn handle_frame(&mut self, frame: Frame) -> Option<String> {
        match frame {
            Frame::Line(line) => self.handle_line(&line).await,
            Frame::Malformed(line) => {
                warn!("Non-UTF-8 line at {}: {:?}", self.herd.name(), line);
                Some(format!("? {line}\n\n"))
            }
            Frame::TooLong(head) => {
                warn!("Over-long line at {} ({} bytes kept)", self.herd.name(), head.len());
                Some(format!("? {head}\n\n"))
            }
        }
    }

    /// Handle one received line; returns the text to write back, if any.
    pub async fn handle_line(&mut self, line: &str) -> Option<String> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(ParseError::Invalid { line, error }) => {
                warn!("Invalid command at {}: {}", self.herd.name(), error);
                return Some(format!("> {error}\n? {line}\n\n"));
            }
            Err(ParseError::Unrecognized { line }) => {
                warn!("Unrecognized command at {}: {:?}", self.herd.name(), line);
                return Some(format!("? {line}\n\n"));
            }
        };
        info!("{} RECEIVED at {}: {}", command.kind(), self.herd.name(), line);

        match command {
            Command::IAmAt(observation) => {
                let at = AtLine::stamp(self.herd.name(), observation, unix_now());
                let reply = format!("{at}\n\n");
                self.herd.propagate(at, None).await;
                Some(reply)
            }
            Command::WhatsAt {
                client_id,
                radius,
                bound,
            } => Some(self.whats_at(&client_id, radius, bound).await),
            Command::At {
                observation,
                sender,
                ..
            } => {
                self.bind_peer(&sender).await;
                let at = AtLine::stamp(self.herd.name(), observation, unix_now());
                self.herd.propagate(at, Some(&sender)).await;
                None
            }
            Command::Help => Some(HELP_TEXT.to_string()),
            Command::Quit => Some(QUIT_TEXT.to_string()),
        }
    }

    async fn whats_at(&self, client_id: &str, radius: u32, bound: usize) -> String {
        let answer = self.herd.whats_at(client_id, radius, bound).await;
        match answer.map(|a| a.to_response().map_err(Error::from)) {
            Ok(Ok(response)) => response,
            Err(Error::NotFound(_)) => format!(
                "> WHATSAT REQUEST: There is no location data at server {} for client {}\n\n",
                self.herd.name(),
                client_id
            ),
            Ok(Err(e)) | Err(e) => {
                error!("WHATSAT for {} at {} failed: {}", client_id, self.herd.name(), e);
                "> WHATSAT PROCESS: Error processing places request\n\n".to_string()
            }
        }
    }

    /// Register this connection as the link to `sender` if it is a neighbor
    /// we have no link to yet.
    async fn bind_peer(&mut self, sender: &str) {
        if self.link.is_some() || !self.herd.topology().is_neighbor(self.herd.name(), sender) {
            return;
        }
        let mut state = self.herd.state().await;
        let id = state.links.next_link_id();
        if state.links.bind_inbound(sender, id, self.tx.clone()) {
            info!("Connection made from {} to {}", sender, self.herd.name());
            self.link = Some((sender.to_string(), id));
        }
    }

    /// Unregister the link this connection carried.
    async fn close(&mut self) {
        if let Some((neighbor, id)) = self.link.take() {
            if self.herd.state().await.links.remove(&neighbor, id) {
                debug!("Removed link {} to {}", id, neighbor);
            }
        }
    }
}
