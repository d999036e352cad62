//! WebSocket server.
//!
//! One task per connection. Each connection gets its own session, which is
//! disconnected when the task ends for any reason. Frames of a connection
//! are processed in order: the next frame is read only after the reply to
//! the previous one has been sent.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::Instrument;

use super::codec::{decode, encode, Encoding};
use super::protocol::{Inbound, Outbound};
use crate::error::Result;
use crate::runtime::{Directive, SessionId, SessionManager};

/// Bind to the configured address and serve until the listener fails.
pub async fn run(manager: Arc<SessionManager>) -> Result<()> {
    let listener = TcpListener::bind(&manager.config().bind_addr).await?;
    serve(listener, manager).await
}

/// Accept connections on `listener`.
///
/// Also runs the idle-session sweeper for as long as this future lives.
pub async fn serve(listener: TcpListener, manager: Arc<SessionManager>) -> Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "websocket server listening");
    let _sweeper = Sweeper::spawn(Arc::clone(&manager));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                continue;
            }
        };

        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, manager).await {
                tracing::warn!(%peer, error = %err, "connection ended with error");
            }
        });
    }
}

/// Periodically expires idle sessions. Aborted on drop.
struct Sweeper(Option<JoinHandle<()>>);

impl Sweeper {
    fn spawn(manager: Arc<SessionManager>) -> Self {
        if manager.config().session_ttl().is_none() {
            return Self(None);
        }

        let period = manager.config().sweep_interval();
        Self(Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                manager.evict_idle();
            }
        })))
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Disconnects the session when the connection task ends.
struct SessionGuard {
    manager: Arc<SessionManager>,
    id: SessionId,
}

impl SessionGuard {
    fn connect(manager: Arc<SessionManager>) -> Self {
        let id = manager.connect();
        Self { manager, id }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.disconnect(&self.id);
    }
}

async fn handle_connection(stream: TcpStream, manager: Arc<SessionManager>) -> Result<()> {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(manager.config().max_frame_bytes);
    ws_config.max_frame_size = Some(manager.config().max_frame_bytes);

    let socket = tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await?;
    let (mut sink, mut source) = socket.split();

    let session = SessionGuard::connect(manager);
    let span = tracing::info_span!("session", id = %session.id);

    async move {
        let html = session.manager.render(&session.id)?;
        if !html.is_empty() {
            let initial = Outbound::Patch {
                payload: Directive::FullReplace { html }.into(),
            };
            sink.send(encode(&initial, Encoding::Json)?).await?;
        }

        while let Some(frame) = source.next().await {
            let frame = frame?;
            let Some(encoding) = Encoding::of(&frame) else {
                if frame.is_close() {
                    break;
                }
                continue;
            };

            let reply = respond(&session.manager, &session.id, decode(&frame));
            sink.send(encode(&reply, encoding)?).await?;

            if !session.manager.is_connected(&session.id) {
                tracing::info!("session expired, closing connection");
                break;
            }
        }

        tracing::debug!("connection closed");
        Ok(())
    }
    .instrument(span)
    .await
}

/// Build the reply to one decoded frame.
fn respond(manager: &SessionManager, session: &SessionId, inbound: Result<Inbound>) -> Outbound {
    match inbound {
        Ok(Inbound::Ping) => Outbound::Pong,
        Ok(Inbound::Event { payload }) => match manager.handle_payload(session, payload) {
            Ok(response) => Outbound::Patch { payload: response },
            Err(err) => Outbound::Error {
                message: err.to_string(),
            },
        },
        Err(err) => {
            tracing::warn!(error = %err, "malformed frame");
            Outbound::Error {
                message: err.to_string(),
            }
        }
    }
}
