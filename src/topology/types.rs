//! Topology type definitions.
//!
//! This file contains the in-memory model of a deployment: the server
//! nodes, the client nodes, and the binding between each client and the
//! server it dials.

use serde::Serialize;

use super::TopologyError;

/// Port servers use between themselves
pub const DEFAULT_LISTEN_PORT: u16 = 12345;

/// Port clients dial on their assigned server
pub const DEFAULT_CLIENT_PORT: u16 = 12346;

/// A server node of the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerNode {
    /// Index of the server, unique within a topology
    pub index: u32,
    /// Hostname or IP address the server is reachable at
    pub address: String,
    /// Server-to-server port (`port_server` in the document)
    pub listen_port: u16,
    /// Port accepting client connections (`port_client` in the document)
    pub client_port: u16,
}

impl ServerNode {
    /// Node name used as document key and container name
    pub fn name(&self) -> String {
        server_name(self.index)
    }
}

/// A client node of the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientNode {
    /// Index of the client, unique within a topology
    pub index: u32,
    /// Index of the server this client connects to
    pub assigned_server: u32,
    /// Port to dial on the assigned server
    pub server_port: u16,
}

impl ClientNode {
    pub fn name(&self) -> String {
        client_name(self.index)
    }
}

/// Name of the server with the given index (`server{i}`)
pub fn server_name(index: u32) -> String {
    format!("server{}", index)
}

/// Name of the client with the given index (`client{i}`)
pub fn client_name(index: u32) -> String {
    format!("client{}", index)
}

/// Generated network topology.
///
/// A topology is built once per deployment run and never mutated
/// afterwards; node processes only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    servers: Vec<ServerNode>,
    clients: Vec<ClientNode>,
}

impl Topology {
    /// Build a topology, checking that node indices match their position
    /// and that every client references an existing server.
    pub fn new(servers: Vec<ServerNode>, clients: Vec<ClientNode>) -> Result<Self, TopologyError> {
        for (position, server) in servers.iter().enumerate() {
            if server.index as usize != position {
                return Err(TopologyError::IndexMismatch {
                    node: server.name(),
                    position,
                });
            }
        }

        for (position, client) in clients.iter().enumerate() {
            if client.index as usize != position {
                return Err(TopologyError::IndexMismatch {
                    node: client.name(),
                    position,
                });
            }
            if client.assigned_server as usize >= servers.len() {
                return Err(TopologyError::UnknownServer {
                    client: client.index,
                    server: client.assigned_server,
                    server_count: servers.len(),
                });
            }
        }

        Ok(Self { servers, clients })
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn servers(&self) -> &[ServerNode] {
        &self.servers
    }

    pub fn clients(&self) -> &[ClientNode] {
        &self.clients
    }

    pub fn server(&self, index: u32) -> Option<&ServerNode> {
        self.servers.get(index as usize)
    }

    pub fn client(&self, index: u32) -> Option<&ClientNode> {
        self.clients.get(index as usize)
    }

    /// Server a client is assigned to
    pub fn server_of(&self, client: &ClientNode) -> Option<&ServerNode> {
        self.server(client.assigned_server)
    }

    /// Clients assigned to the given server, in index order
    pub fn clients_of(&self, server_index: u32) -> impl Iterator<Item = &ClientNode> {
        self.clients
            .iter()
            .filter(move |client| client.assigned_server == server_index)
    }
}
