//! Node session module.
//!
//! A node runs one connection lifecycle, selected by its role:
//!
//! - **Server**: `Idle -> Bound -> Listening -> Connected -> Exchanging -> Closed`
//! - **Client**: `Idle -> Connecting -> Connected -> Exchanging -> Closed`
//!
//! A server with a connection limit above one returns from `Exchanging` to
//! `Listening` until it has served that many clients.
//!
//! Reads return at most [`BUFFER_SIZE`] bytes and do not reassemble
//! messages. A zero-byte read means the peer closed its side and ends the
//! exchange. Every exit path, including errors, drops the socket.

pub mod client;
pub mod error;
pub mod memory;
pub mod node;
pub mod server;
pub mod state;
pub mod transport;

use std::io::{self, Read, Write};

use serde::Serialize;

pub use client::ClientSession;
pub use error::SessionError;
pub use memory::{ConnectionProbe, MemoryConnection, MemoryTransport};
pub use node::{run_client, run_server, ClientOptions, ServerOptions};
pub use server::ServerSession;
pub use state::{ClientState, ExchangeMode, Received, ServerState};
pub use transport::{Connection, Listener, TcpTransport, Transport};

/// Largest number of bytes returned by one read
pub const BUFFER_SIZE: usize = 1024;

/// Payload clients send when none is configured
pub const DEFAULT_PAYLOAD: &str = "Hello_world";

/// Messages seen by one side of an exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExchangeReport {
    pub received: Vec<String>,
    pub sent: Vec<String>,
}

/// Transform servers apply to received text
pub fn uppercase(payload: &[u8]) -> Vec<u8> {
    String::from_utf8_lossy(payload).to_uppercase().into_bytes()
}

fn read_chunk<C: Read>(connection: &mut C) -> io::Result<Received> {
    let mut buf = [0u8; BUFFER_SIZE];
    let count = connection.read(&mut buf)?;
    if count == 0 {
        Ok(Received::PeerClosed)
    } else {
        Ok(Received::Data(buf[..count].to_vec()))
    }
}

fn write_message<C: Write>(connection: &mut C, payload: &[u8]) -> io::Result<()> {
    connection.write_all(payload)?;
    connection.flush()
}
