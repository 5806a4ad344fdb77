//! Network topology module.
//!
//! This module contains the topology model, the strategies assigning
//! clients to servers, and the generator building a topology from
//! server/client counts.

pub mod types;
pub mod distribution;
pub mod generator;

// Re-export key types and functions for easier access
pub use types::{ClientNode, ServerNode, Topology, DEFAULT_CLIENT_PORT, DEFAULT_LISTEN_PORT};
pub use distribution::{assign_clients, AssignmentStrategy};
pub use generator::{generate, TopologyGenerator};

/// Errors that can occur while building a topology
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Node {node} is at position {position}, indices must match positions")]
    IndexMismatch { node: String, position: usize },

    #[error("client{client} references server{server}, but only {server_count} servers exist")]
    UnknownServer {
        client: u32,
        server: u32,
        server_count: usize,
    },
}
