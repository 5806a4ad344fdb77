//! Session states for both node roles.

use std::fmt;

/// Lifecycle of a server node session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Bound,
    Listening,
    Connected,
    Exchanging,
    Closed,
}

/// Lifecycle of a client node session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connecting,
    Connected,
    Exchanging,
    Closed,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Bound => "bound",
            Self::Listening => "listening",
            Self::Connected => "connected",
            Self::Exchanging => "exchanging",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Exchanging => "exchanging",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Outcome of a single read on an established connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Bytes available on the connection, at most one buffer's worth
    Data(Vec<u8>),
    /// Zero-byte read: the peer closed its side
    PeerClosed,
}

/// How many messages a session exchanges before closing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeMode {
    /// One message from client to server, no reply
    #[default]
    Single,
    /// The server answers every message with its uppercase form until the
    /// client closes; the client waits for one reply
    Echo,
}
