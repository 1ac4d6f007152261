//! Core protocol types for Skyfall's wire format.
//!
//! Every type in this module is serialized and sent over the network.
//! Field names are the JSON keys the game client reads, so renaming a
//! field here is a breaking protocol change.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Assigned by the server when a connection is registered and never
/// reused for the lifetime of the process, so a stale id held by a
/// pending timer can never resolve to a different player.
///
/// `#[serde(transparent)]` makes `PlayerId(42)` serialize as plain `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A 3-component vector, used for both positions and Euler rotations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

fn default_scale() -> f32 {
    1.0
}

/// Where an aircraft is, which way it points, and how big it is drawn.
///
/// `scale` defaults to 1 when a client leaves it out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

impl Transform {
    /// A transform at `position` with no rotation and unit scale.
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// A projectile as fired by a client.
///
/// The server does not simulate projectiles. It relays this payload to
/// everyone else so they can draw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
}

/// The full, publicly visible state of one named player.
///
/// Used in the initial roster and in the join announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub transform: Transform,
    pub health: f32,
    pub max_health: f32,
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a message?
// ---------------------------------------------------------------------------

/// The audience for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connected session.
    All,

    /// One specific session.
    Player(PlayerId),

    /// Every session except this one (usually the sender).
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Channel: delivery guarantees
// ---------------------------------------------------------------------------

/// The delivery guarantee for a message.
///
/// State transitions (join, damage, kill, respawn) must arrive. Position
/// updates are sent many times per second and a newer one supersedes an
/// older one, so losing some is fine. Both kinds share one ordered
/// stream per connection; an unreliable message is either dropped
/// outright or delivered in its place in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    /// Delivered in order, no loss. The default.
    #[default]
    ReliableOrdered,

    /// May be dropped under load.
    Unreliable,
}

impl Channel {
    /// Returns `true` for channels that may drop messages.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Unreliable)
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client can send.
///
/// Internally tagged: `{ "type": "SetName", "name": "Rex" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Pick (or change) a display name. The first one makes the player
    /// visible to everyone else.
    SetName { name: String },

    /// Latest transform of the sender's aircraft. Sent on the unreliable
    /// channel.
    PositionUpdate { transform: Transform },

    /// The sender fired something.
    ProjectileFired { projectile: Projectile },

    /// The sender hit `target_id`. `resulting_health` is the target's
    /// health as computed by the sender's client.
    DamageReport {
        target_id: PlayerId,
        damage: f32,
        resulting_health: f32,
    },

    /// The sender claims to have killed `target_id`.
    KillClaim {
        target_id: PlayerId,
        target_name: String,
    },

    /// Keep-alive. Answered with [`ServerMessage::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    /// The client is leaving; the server closes the connection.
    Leave { reason: String },
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First message on every connection: "this is you".
    IdentityAssigned { player_id: PlayerId },

    /// Every named player's state, sent once to a new connection when
    /// at least one named player exists.
    InitialRoster { players: Vec<PlayerSnapshot> },

    /// Current health bar value for one player.
    HealthSnapshot {
        player_id: PlayerId,
        health: f32,
        max_health: f32,
    },

    /// A player completed naming and is now visible.
    PlayerJoined { player: PlayerSnapshot },

    /// An already visible player changed name.
    NameChanged { player_id: PlayerId, name: String },

    /// Another player's latest transform. Unreliable.
    PositionBroadcast {
        player_id: PlayerId,
        transform: Transform,
    },

    /// Another player fired.
    ProjectileBroadcast {
        shooter_id: PlayerId,
        projectile: Projectile,
    },

    /// You were hit. Sent only to the target.
    DamageDelivered {
        source_id: PlayerId,
        source_name: String,
        target_id: PlayerId,
        damage: f32,
        resulting_health: f32,
    },

    /// Someone was shot down.
    KillAnnounced {
        killer_id: PlayerId,
        killer_name: String,
        target_id: PlayerId,
        target_name: String,
    },

    /// You are back in the air. Sent only to the respawned player.
    Respawned {
        health: f32,
        max_health: f32,
        transform: Transform,
    },

    /// A named player disconnected.
    PlayerLeft { player_id: PlayerId, name: String },

    /// Reply to [`ClientMessage::Heartbeat`].
    HeartbeatAck { client_time: u64, server_time: u64 },
}

impl ServerMessage {
    /// The channel this message is delivered on.
    ///
    /// Position broadcasts are the only lossy traffic.
    pub fn channel(&self) -> Channel {
        match self {
            Self::PositionBroadcast { .. } => Channel::Unreliable,
            _ => Channel::ReliableOrdered,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope: the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level wrapper around every frame.
///
/// `M` is [`ClientMessage`] inbound and [`ServerMessage`] outbound.
///
/// ```text
/// { "seq": 42, "timestamp": 15000, "channel": "Unreliable",
///   "payload": { "type": "PositionBroadcast", ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<M> {
    /// Per-sender, monotonically increasing sequence number.
    pub seq: u64,

    /// Milliseconds since the connection was accepted.
    pub timestamp: u64,

    /// Delivery guarantee. Defaults to `ReliableOrdered` when missing.
    #[serde(default)]
    pub channel: Channel,

    pub payload: M,
}

// =========================================================================
// Tests
// =========================================================================
