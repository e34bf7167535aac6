//! WebSocket link to the simulation.
//!
//! The link runs on its own thread with a single-threaded tokio runtime.
//! Inbound text frames are decoded there and handed to the tick through the
//! [`DispatchSender`]; outbound commands arrive over an unbounded channel
//! from the [`OutboundSender`] resource.

use bevy::prelude::*;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use sync_core::{CommandSink, ConnectionConfig, DispatchSender, LinkEvent, SinkClosed};
use sync_events::{decode_message, Command, Decoded};

/// Errors that end a connection attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to start link thread: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Work for the link thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Command(Command),
    /// Close the connection and stop the link thread.
    Close,
}

/// Handle used by the tick to send commands to the link thread.
#[derive(Resource, Debug, Clone)]
pub struct OutboundSender {
    tx: UnboundedSender<Outbound>,
}

impl OutboundSender {
    pub(crate) fn new(tx: UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    /// Asks the link thread to close the connection and exit.
    pub fn close(&self) -> bool {
        self.tx.send(Outbound::Close).is_ok()
    }
}

impl CommandSink for OutboundSender {
    fn submit(&self, command: Command) -> Result<(), SinkClosed> {
        self.tx
            .send(Outbound::Command(command))
            .map_err(|_| SinkClosed)
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The link was open and then dropped.
    Disconnected,
    /// Shutdown was requested, or the tick side is gone.
    Shutdown,
}

/// Starts the link thread and returns the command handle.
pub fn spawn_transport(
    config: ConnectionConfig,
    dispatch: DispatchSender,
) -> Result<OutboundSender, TransportError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("sim-link".into())
        .spawn(move || runtime.block_on(run_link(config, dispatch, rx)))?;

    Ok(OutboundSender::new(tx))
}

/// Doubles the reconnect delay up to `max`.
pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    let next = current + current;
    if next > max {
        max
    } else {
        next
    }
}

async fn run_link(
    config: ConnectionConfig,
    dispatch: DispatchSender,
    mut outbound: UnboundedReceiver<Outbound>,
) {
    let url = config.url();
    let initial = Duration::from_millis(config.backoff_initial_ms);
    let max = Duration::from_millis(config.backoff_max_ms);
    let mut backoff = initial;

    loop {
        tracing::info!("Connecting to {}", url);
        match run_session(&url, &dispatch, &mut outbound).await {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Disconnected) => backoff = initial,
            Err(err) => {
                if !dispatch.send_link(LinkEvent::Error(err.to_string()))
                    || !dispatch.send_link(LinkEvent::Closed)
                {
                    break;
                }
            }
        }

        if !config.reconnect {
            tracing::info!("Reconnect disabled, link thread exiting");
            break;
        }

        tracing::info!("Reconnecting in {:?}", backoff);
        if wait_for_retry(backoff, &mut outbound).await == SessionEnd::Shutdown {
            break;
        }
        backoff = next_backoff(backoff, max);
    }

    tracing::debug!("Link thread stopped");
}

/// Sleeps before a reconnect attempt. Commands queued while the link was
/// down are discarded.
async fn wait_for_retry(
    delay: Duration,
    outbound: &mut UnboundedReceiver<Outbound>,
) -> SessionEnd {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return SessionEnd::Disconnected,
            message = outbound.recv() => match message {
                Some(Outbound::Command(command)) => {
                    tracing::debug!("Discarding {:?} while disconnected", command);
                }
                Some(Outbound::Close) | None => return SessionEnd::Shutdown,
            },
        }
    }
}

async fn run_session(
    url: &str,
    dispatch: &DispatchSender,
    outbound: &mut UnboundedReceiver<Outbound>,
) -> Result<SessionEnd, TransportError> {
    let (stream, _) = connect_async(url).await?;
    let (mut write, mut read) = stream.split();

    if !dispatch.send_link(LinkEvent::Opened) {
        return Ok(SessionEnd::Shutdown);
    }

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if !forward_message(&text, dispatch) {
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let text = String::from_utf8_lossy(&bytes);
                    if !forward_message(&text, dispatch) {
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    dispatch.send_link(LinkEvent::Closed);
                    return Ok(SessionEnd::Disconnected);
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    dispatch.send_link(LinkEvent::Error(err.to_string()));
                    dispatch.send_link(LinkEvent::Closed);
                    return Ok(SessionEnd::Disconnected);
                }
            },
            message = outbound.recv() => match message {
                Some(Outbound::Command(command)) => {
                    let payload = command.to_json()?;
                    if let Err(err) = write.send(Message::Text(payload)).await {
                        dispatch.send_link(LinkEvent::Error(err.to_string()));
                        dispatch.send_link(LinkEvent::Closed);
                        return Ok(SessionEnd::Disconnected);
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(err) = write.send(Message::Close(None)).await {
                        tracing::debug!("Close frame not sent: {}", err);
                    }
                    dispatch.send_link(LinkEvent::Closed);
                    return Ok(SessionEnd::Shutdown);
                }
            },
        }
    }
}

/// Decodes one inbound message and enqueues the result.
///
/// Returns false once the tick side has gone away.
pub fn forward_message(raw: &str, dispatch: &DispatchSender) -> bool {
    match decode_message(raw) {
        Ok(Decoded::Update(records)) => dispatch.send_snapshot(records),
        Ok(Decoded::Ignored { message_type }) => {
            tracing::debug!("Ignoring '{}' message", message_type);
            true
        }
        Err(err) => {
            tracing::warn!("Dropping undecodable message: {}", err);
            dispatch.send_link(LinkEvent::DecodeFailed(err.to_string()))
        }
    }
}
