//! Docker Compose deployment descriptor.
//!
//! Turns a [`Topology`] into a compose file with one service per node.
//! Every service receives its node index through the `NUM_NODE`
//! environment variable; clients start after the server they dial.

use log::info;
use serde::{Serialize, Serializer};

use crate::topology::Topology;

/// Compose file format version written at the top of the descriptor
pub const COMPOSE_VERSION: &str = "3.3";

/// Environment variable carrying the node index
pub const NODE_ENV_VAR: &str = "NUM_NODE";

/// Build contexts used for the generated services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Build context of server images
    pub server_context: String,
    /// Build context of client images
    pub client_context: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            server_context: "../server".to_string(),
            client_context: "../client".to_string(),
        }
    }
}

/// One compose service
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ComposeService {
    pub build: String,
    pub container_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub environment: Vec<String>,
}

/// Complete compose file, services kept in node order
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ComposeFile {
    pub version: String,
    #[serde(serialize_with = "serialize_services")]
    pub services: Vec<(String, ComposeService)>,
}

fn serialize_services<S: Serializer>(
    services: &[(String, ComposeService)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(services.iter().map(|(name, service)| (name, service)))
}

impl ComposeFile {
    /// Build the descriptor: servers first, then clients.
    pub fn from_topology(topology: &Topology, options: &ComposeOptions) -> Self {
        let mut services = Vec::with_capacity(topology.server_count() + topology.client_count());

        for server in topology.servers() {
            let name = server.name();
            services.push((
                name.clone(),
                ComposeService {
                    build: options.server_context.clone(),
                    container_name: name,
                    depends_on: Vec::new(),
                    environment: vec![format!("{}={}", NODE_ENV_VAR, server.index)],
                },
            ));
        }

        for client in topology.clients() {
            let name = client.name();
            let depends_on = topology
                .server_of(client)
                .map(|server| vec![server.name()])
                .unwrap_or_default();
            services.push((
                name.clone(),
                ComposeService {
                    build: options.client_context.clone(),
                    container_name: name,
                    depends_on,
                    environment: vec![format!("{}={}", NODE_ENV_VAR, client.index)],
                },
            ));
        }

        info!("Generated compose descriptor with {} services", services.len());

        Self {
            version: COMPOSE_VERSION.to_string(),
            services,
        }
    }

    pub fn service(&self, name: &str) -> Option<&ComposeService> {
        self.services
            .iter()
            .find(|(service_name, _)| service_name == name)
            .map(|(_, service)| service)
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{AssignmentStrategy, TopologyGenerator};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_topology() -> Topology {
        TopologyGenerator::new()
            .strategy(AssignmentStrategy::Sequential)
            .generate(2, 3, &mut StdRng::seed_from_u64(0))
            .unwrap()
    }

    #[test]
    fn test_one_service_per_node() {
        let compose = ComposeFile::from_topology(&sample_topology(), &ComposeOptions::default());
        let names: Vec<&str> = compose.services.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["server0", "server1", "client0", "client1", "client2"]);
        assert_eq!(compose.version, "3.3");
    }

    #[test]
    fn test_clients_depend_on_their_server() {
        let compose = ComposeFile::from_topology(&sample_topology(), &ComposeOptions::default());
        let client = compose.service("client2").unwrap();
        assert_eq!(client.depends_on, vec!["server0".to_string()]);
        assert_eq!(client.environment, vec!["NUM_NODE=2".to_string()]);
        assert_eq!(client.build, "../client");

        let server = compose.service("server1").unwrap();
        assert!(server.depends_on.is_empty());
        assert_eq!(server.container_name, "server1");
    }

    #[test]
    fn test_yaml_output() {
        let options = ComposeOptions {
            server_context: "../server/encoins".to_string(),
            client_context: "../client/encoins".to_string(),
        };
        let yaml = ComposeFile::from_topology(&sample_topology(), &options)
            .to_yaml_string()
            .unwrap();

        assert!(yaml.starts_with("version: "));
        assert!(yaml.lines().next().unwrap().contains("3.3"));
        assert!(yaml.contains("build: ../server/encoins"));
        assert!(yaml.contains("- NUM_NODE=1"));
        assert_eq!(yaml.matches("depends_on").count(), 3);

        let server0 = yaml.find("server0:").unwrap();
        let client0 = yaml.find("client0:").unwrap();
        assert!(server0 < client0);
    }

    #[test]
    fn test_output_is_deterministic() {
        let topology = sample_topology();
        let first = ComposeFile::from_topology(&topology, &ComposeOptions::default());
        let second = ComposeFile::from_topology(&topology, &ComposeOptions::default());
        assert_eq!(first.to_yaml_string().unwrap(), second.to_yaml_string().unwrap());
    }
}
