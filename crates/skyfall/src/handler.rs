//! Per-connection handler: registration, framing, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the arena → get a `PlayerId` and an outbound queue
//!   2. Spawn a writer that drains the queue onto the socket
//!   3. Loop: receive envelopes → answer heartbeats, forward the rest
//!   4. On exit, the guard tells the arena the session is gone

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use skyfall_arena::{ArenaHandle, OutboundReceiver};
use skyfall_protocol::{Channel, ClientMessage, Codec, Envelope, ServerMessage};
use skyfall_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::SkyfallError;
use crate::server::ServerState;

/// Drop guard that releases the session when the handler exits.
///
/// This covers early returns and panics too. `Drop` is synchronous, so
/// the disconnect is sent from a fire-and-forget task.
struct SessionGuard {
    conn_id: ConnectionId,
    arena: ArenaHandle,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let arena = self.arena.clone();
        tokio::spawn(async move {
            let _ = arena.disconnect(conn_id).await;
        });
    }
}

/// Stamps outbound envelopes for one connection.
///
/// `seq` increases by one per frame; `timestamp` is milliseconds since
/// the connection was accepted.
struct Stamp {
    next_seq: AtomicU64,
    start: Instant,
}

impl Stamp {
    fn new() -> Self {
        Self {
            next_seq: AtomicU64::new(1),
            start: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn wrap(&self, payload: ServerMessage) -> Envelope<ServerMessage> {
        Envelope {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            timestamp: self.elapsed_ms(),
            channel: payload.channel(),
            payload,
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), SkyfallError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (player_id, outbound) = state.arena.connect(conn_id).await?;
    let _guard = SessionGuard {
        conn_id,
        arena: state.arena.clone(),
    };
    tracing::info!(%conn_id, %player_id, "player connected");

    let stamp = Arc::new(Stamp::new());
    let writer = tokio::spawn(write_outbound(
        Arc::clone(&conn),
        outbound,
        Arc::clone(&stamp),
        Arc::clone(&state),
    ));

    let result = read_inbound(&conn, &state, &stamp).await;

    writer.abort();
    // _guard drops here → arena disconnect fires.
    result
}

/// Reads frames until the client leaves, goes quiet, or the socket fails.
async fn read_inbound<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    stamp: &Stamp,
) -> Result<(), SkyfallError> {
    let conn_id = conn.id();

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Ok(());
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                return Ok(());
            }
        };

        let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                continue;
            }
        };

        match envelope.payload {
            ClientMessage::Heartbeat { client_time } => {
                let ack = stamp.wrap(ServerMessage::HeartbeatAck {
                    client_time,
                    server_time: stamp.elapsed_ms(),
                });
                let bytes = state.codec.encode(&ack)?;
                conn.send(&bytes).await?;
            }
            ClientMessage::Leave { reason } => {
                tracing::info!(%conn_id, %reason, "client left");
                let _ = conn.close().await;
                return Ok(());
            }
            msg => {
                state.arena.client_message(conn_id, msg).await?;
            }
        }
    }
}

/// Drains the session's outbound queue onto the socket.
///
/// Ends when the arena drops the session or the socket fails.
async fn write_outbound<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbound: OutboundReceiver,
    stamp: Arc<Stamp>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();

    while let Some(msg) = outbound.recv().await {
        let envelope = stamp.wrap(msg);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to encode envelope");
                continue;
            }
        };

        let sent = match envelope.channel {
            Channel::Unreliable => match conn.send_unreliable(&bytes).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    tracing::debug!(%conn_id, seq = envelope.seq, "dropped unreliable frame");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Channel::ReliableOrdered => conn.send(&bytes).await,
        };

        if let Err(e) = sent {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            return;
        }
    }
}
