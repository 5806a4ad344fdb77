//! Client distribution across servers.
//!
//! This module decides which server each client dials. Two strategies
//! are supported:
//!
//! - **Random**: every client draws its server uniformly from the injected
//!   random source (seed the source for reproducible runs)
//! - **Sequential**: client `i` goes to server `i % server_count`, the fixed
//!   pairing used when a client simply dials the server sharing its index

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::TopologyError;

/// Strategy used to assign clients to servers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStrategy {
    /// Uniform random draw per client
    #[default]
    Random,
    /// Round-robin by client index
    Sequential,
}

/// Assigns each of `client_count` clients to one of `server_count` servers.
///
/// # Arguments
///
/// * `client_count` - Number of clients to distribute
/// * `server_count` - Number of servers available
/// * `strategy` - Distribution strategy to use
/// * `rng` - Random source, only consulted by [`AssignmentStrategy::Random`]
///
/// # Returns
///
/// * Server index for every client, in client order
pub fn assign_clients<R: Rng + ?Sized>(
    client_count: u32,
    server_count: u32,
    strategy: AssignmentStrategy,
    rng: &mut R,
) -> Result<Vec<u32>, TopologyError> {
    if client_count == 0 {
        return Ok(Vec::new());
    }
    if server_count == 0 {
        return Err(TopologyError::InvalidParameter(format!(
            "{} clients requested but there is no server to assign them to",
            client_count
        )));
    }

    let assignments: Vec<u32> = match strategy {
        AssignmentStrategy::Random => (0..client_count)
            .map(|_| rng.gen_range(0..server_count))
            .collect(),
        AssignmentStrategy::Sequential => (0..client_count)
            .map(|client| client % server_count)
            .collect(),
    };

    for (client, server) in assignments.iter().enumerate() {
        debug!("client{} -> server{}", client, server);
    }

    info!(
        "Assigned {} clients across {} servers using {:?} strategy",
        client_count, server_count, strategy
    );

    Ok(assignments)
}
