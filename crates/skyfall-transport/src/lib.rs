//! Transport abstraction layer for Skyfall.
//!
//! Provides the [`Transport`], [`PendingConnection`] and [`Connection`]
//! traits that the server is written against, plus a WebSocket
//! implementation.
//!
//! Accepting is split in two. [`Transport::accept`] returns as soon as a
//! peer is connected at the socket level; the protocol handshake happens
//! in [`PendingConnection::upgrade`], which the caller is expected to
//! run off the accept loop and under a timeout.
//!
//! Connections expose two send paths. [`Connection::send`] is reliable:
//! it waits until the frame is handed to the socket. [`Connection::send_unreliable`]
//! is allowed to drop the frame instead of waiting, which is what
//! high-frequency position traffic wants.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a live connection.
///
/// The session registry keys sessions by this value, so it must be
/// unique among connections that are alive at the same time. The
/// WebSocket transport hands them out from a process-wide counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// A peer that is connected but has not finished the handshake.
    type Pending: PendingConnection<Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer and returns it before any handshake.
    ///
    /// Never waits on a peer that has already been accepted.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// An accepted peer waiting for its protocol handshake.
pub trait PendingConnection: Send + 'static {
    /// The connection type produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for the handshake.
    type Error: std::error::Error + Send + Sync;

    /// The identifier the finished connection will carry.
    fn id(&self) -> ConnectionId;

    /// The remote address of the peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Runs the handshake.
    ///
    /// A peer that never completes it keeps this future pending, so
    /// callers should bound it with a timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive frames.
///
/// Implementations must allow `send` and `recv` to be in flight at the
/// same time from different tasks: the server reads on one task and
/// writes on another.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame to the remote peer, waiting until it is written.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a frame that may be dropped.
    ///
    /// Defaults to a reliable send. Transports that can shed load
    /// should override this and return `Ok(false)` when the frame was
    /// dropped instead of written.
    async fn send_unreliable(&self, data: &[u8]) -> Result<bool, Self::Error> {
        self.send(data).await.map(|()| true)
    }

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "rex");
        map.insert(ConnectionId::new(2), "ivy");
        assert_eq!(map[&ConnectionId::new(2)], "ivy");
    }
}
