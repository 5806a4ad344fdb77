//! Topology generation.
//!
//! Builds a [`Topology`] from a server count and a client count. Every
//! server gets the same pair of ports; every client is assigned a server
//! through the configured [`AssignmentStrategy`].

use log::info;
use rand::Rng;

use super::distribution::{assign_clients, AssignmentStrategy};
use super::types::{ClientNode, ServerNode, Topology, DEFAULT_CLIENT_PORT, DEFAULT_LISTEN_PORT};
use super::TopologyError;

/// Placeholder replaced by the server index in address templates
const INDEX_PLACEHOLDER: &str = "{i}";

/// Generator settings shared by every node of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyGenerator {
    address_template: String,
    listen_port: u16,
    client_port: u16,
    strategy: AssignmentStrategy,
}

impl Default for TopologyGenerator {
    fn default() -> Self {
        Self {
            // Container names double as hostnames on the compose network
            address_template: format!("server{}", INDEX_PLACEHOLDER),
            listen_port: DEFAULT_LISTEN_PORT,
            client_port: DEFAULT_CLIENT_PORT,
            strategy: AssignmentStrategy::Random,
        }
    }
}

impl TopologyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address template for servers; `{i}` is replaced by the server index.
    /// A template without the placeholder gives every server the same address.
    pub fn address_template(mut self, template: impl Into<String>) -> Self {
        self.address_template = template.into();
        self
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    pub fn client_port(mut self, port: u16) -> Self {
        self.client_port = port;
        self
    }

    pub fn strategy(mut self, strategy: AssignmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Generate a topology with `server_count` servers and `client_count`
    /// clients, drawing random assignments from `rng`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        server_count: u32,
        client_count: u32,
        rng: &mut R,
    ) -> Result<Topology, TopologyError> {
        if client_count > 0 && server_count == 0 {
            return Err(TopologyError::InvalidParameter(format!(
                "{} clients requested with 0 servers, a client needs a server to connect to",
                client_count
            )));
        }
        if self.listen_port == 0 || self.client_port == 0 {
            return Err(TopologyError::InvalidParameter(
                "server ports must be non-zero".to_string(),
            ));
        }

        info!(
            "Generating topology with {} servers and {} clients",
            server_count, client_count
        );

        let servers: Vec<ServerNode> = (0..server_count)
            .map(|index| ServerNode {
                index,
                address: self.address_template.replace(INDEX_PLACEHOLDER, &index.to_string()),
                listen_port: self.listen_port,
                client_port: self.client_port,
            })
            .collect();

        let clients: Vec<ClientNode> = assign_clients(client_count, server_count, self.strategy, rng)?
            .into_iter()
            .zip(0..)
            .map(|(assigned_server, index)| ClientNode {
                index,
                assigned_server,
                server_port: self.client_port,
            })
            .collect();

        Topology::new(servers, clients)
    }
}

/// Generate a topology with default addresses and ports and random
/// client assignment.
pub fn generate<R: Rng + ?Sized>(
    server_count: u32,
    client_count: u32,
    rng: &mut R,
) -> Result<Topology, TopologyError> {
    TopologyGenerator::default().generate(server_count, client_count, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_every_client_has_a_valid_server() {
        for server_count in 1..6 {
            for client_count in 0..12 {
                let mut rng = StdRng::seed_from_u64(u64::from(server_count * 100 + client_count));
                let topology = generate(server_count, client_count, &mut rng).unwrap();
                assert_eq!(topology.server_count(), server_count as usize);
                assert_eq!(topology.client_count(), client_count as usize);
                for client in topology.clients() {
                    assert!(client.assigned_server < server_count);
                }
            }
        }
    }

    #[test]
    fn test_zero_servers_with_clients_is_invalid() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = generate(0, 3, &mut rng);
        assert!(matches!(result, Err(TopologyError::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_servers_without_clients_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let topology = generate(0, 0, &mut rng).unwrap();
        assert_eq!(topology.server_count(), 0);
        assert_eq!(topology.client_count(), 0);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let first = generate(2, 3, &mut StdRng::seed_from_u64(1)).unwrap();
        let second = generate(2, 3, &mut StdRng::seed_from_u64(1)).unwrap();

        let sequence = |t: &Topology| t.clients().iter().map(|c| c.assigned_server).collect::<Vec<_>>();
        assert_eq!(sequence(&first), sequence(&second));
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_addresses_and_ports() {
        let topology = generate(2, 1, &mut StdRng::seed_from_u64(3)).unwrap();
        let server = &topology.servers()[1];
        assert_eq!(server.address, "server1");
        assert_eq!(server.listen_port, 12345);
        assert_eq!(server.client_port, 12346);
        assert_eq!(topology.clients()[0].server_port, 12346);
    }

    #[test]
    fn test_custom_template_and_ports() {
        let generator = TopologyGenerator::new()
            .address_template("10.0.0.{i}")
            .listen_port(4000)
            .client_port(4001)
            .strategy(AssignmentStrategy::Sequential);
        let topology = generator.generate(3, 4, &mut StdRng::seed_from_u64(0)).unwrap();

        assert_eq!(topology.servers()[2].address, "10.0.0.2");
        assert_eq!(topology.servers()[0].listen_port, 4000);
        let assigned: Vec<u32> = topology.clients().iter().map(|c| c.assigned_server).collect();
        assert_eq!(assigned, vec![0, 1, 2, 0]);
        assert!(topology.clients().iter().all(|c| c.server_port == 4001));
    }

    #[test]
    fn test_zero_port_is_invalid() {
        let generator = TopologyGenerator::new().client_port(0);
        let result = generator.generate(1, 1, &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(TopologyError::InvalidParameter(_))));
    }
}
