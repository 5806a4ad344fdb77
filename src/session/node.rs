//! Role entry points.
//!
//! A node process knows only its role and its index. These helpers look up
//! the node's binding in the [`Topology`] and run one full session.

use std::time::Duration;

use log::info;

use super::client::ClientSession;
use super::error::SessionError;
use super::server::ServerSession;
use super::state::ExchangeMode;
use super::transport::Transport;
use super::{ExchangeReport, DEFAULT_PAYLOAD};
use crate::topology::Topology;

/// Settings for a server node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerOptions {
    /// Address to bind instead of the one in the topology
    pub bind_address: Option<String>,
    pub mode: ExchangeMode,
    /// Serve every client assigned to this server instead of the first one
    pub all_clients: bool,
}

/// Settings for a client node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub payload: String,
    pub mode: ExchangeMode,
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            payload: DEFAULT_PAYLOAD.to_string(),
            mode: ExchangeMode::Single,
            connect_timeout: None,
        }
    }
}

/// Run server `index` on the server's client port. Accepts one client, or
/// each assigned client in turn with [`ServerOptions::all_clients`].
pub fn run_server<T: Transport>(
    topology: &Topology,
    index: u32,
    transport: T,
    options: &ServerOptions,
) -> Result<ExchangeReport, SessionError> {
    let server = topology
        .server(index)
        .ok_or(SessionError::UnknownNode { role: "server", index })?;

    let address = options.bind_address.as_deref().unwrap_or(&server.address);
    let assigned = topology.clients_of(index).count();

    if !options.all_clients {
        info!(
            "Starting {} on {}:{} ({} client(s) assigned, accepting one)",
            server.name(),
            address,
            server.client_port,
            assigned
        );
        return ServerSession::new(transport).serve_once(address, server.client_port, options.mode);
    }

    // Client indices are u32, so the count always fits
    let limit = u32::try_from(assigned).unwrap_or(u32::MAX);
    if limit == 0 {
        info!("{} has no assigned clients, nothing to serve", server.name());
        return Ok(ExchangeReport::default());
    }

    info!(
        "Starting {} on {}:{} (serving {} assigned client(s))",
        server.name(),
        address,
        server.client_port,
        limit
    );
    ServerSession::new(transport)
        .with_connection_limit(limit)
        .serve(address, server.client_port, options.mode)
}

/// Run client `index`: dial the assigned server and send the payload.
pub fn run_client<T: Transport>(
    topology: &Topology,
    index: u32,
    transport: T,
    options: &ClientOptions,
) -> Result<ExchangeReport, SessionError> {
    let client = topology
        .client(index)
        .ok_or(SessionError::UnknownNode { role: "client", index })?;
    let server = topology.server_of(client).ok_or(SessionError::UnknownNode {
        role: "server",
        index: client.assigned_server,
    })?;

    info!(
        "Starting {} towards {} at {}:{}",
        client.name(),
        server.name(),
        server.address,
        client.server_port
    );

    let mut session = ClientSession::new(transport);
    if let Some(timeout) = options.connect_timeout {
        session = session.with_connect_timeout(timeout);
    }
    session.run_once(&server.address, client.server_port, options.payload.as_bytes(), options.mode)
}
