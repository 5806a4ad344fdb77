//! Persisted topology document.
//!
//! The topology is shared with deployment tooling and node processes as a
//! flat YAML mapping keyed by node name:
//!
//! ```yaml
//! parameters:
//!   nb_servers: 2
//!   nb_clients: 1
//! server0:
//!   address: server0
//!   port_server: 12345
//!   port_client: 12346
//! server1:
//!   address: server1
//!   port_server: 12345
//!   port_client: 12346
//! client0:
//!   address_server: server1
//!   port_server: 12346
//!   server_index: 1
//! ```
//!
//! `server_index` is optional on input. Without it the client's server is
//! found by address, then by `server{k}` name. The older layout with `S`/`C`
//! counters and `ip`/`port` entries is also accepted; there client `i`
//! dials server `i`.

use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::topology::types::{client_name, server_name};
use crate::topology::{ClientNode, ServerNode, Topology, TopologyError};

const PARAMETERS_KEY: &str = "parameters";
const LEGACY_SERVERS_KEY: &str = "S";
const LEGACY_CLIENTS_KEY: &str = "C";

static SERVER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^server(\d+)$").expect("Invalid server name regex"));

/// Errors raised when a document does not describe a valid topology
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Malformed topology document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Malformed topology document: top level is not a mapping")]
    NotAMapping,

    #[error("Malformed topology document: no `parameters` section (or `S`/`C` counters)")]
    MissingParameters,

    #[error("Malformed topology document: missing entry for {node}")]
    MissingNode { node: String },

    #[error("Malformed topology document: {node} has no `{field}` field")]
    MissingField { node: String, field: &'static str },

    #[error("Malformed topology document: {node}.{field} must be {expected}")]
    InvalidField {
        node: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("Malformed topology document: client{client} references server{server}, but nb_servers is {nb_servers}")]
    ServerOutOfRange {
        client: u32,
        server: u64,
        nb_servers: u32,
    },

    #[error("Malformed topology document: client{client} references unknown server address '{address}'")]
    UnknownServer { client: u32, address: String },

    #[error("Malformed topology document: {0}")]
    Topology(#[from] TopologyError),
}

/// Topology rendered as a YAML mapping, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyDocument {
    root: Mapping,
}

impl TopologyDocument {
    pub fn from_mapping(root: Mapping) -> Self {
        Self { root }
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn into_mapping(self) -> Mapping {
        self.root
    }

    /// Parse a document from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, DocumentError> {
        match serde_yaml::from_str::<Value>(content)? {
            Value::Mapping(root) => Ok(Self { root }),
            _ => Err(DocumentError::NotAMapping),
        }
    }

    /// Render the document as YAML text
    pub fn to_yaml_string(&self) -> Result<String, DocumentError> {
        Ok(serde_yaml::to_string(&self.root)?)
    }
}

fn entry(fields: Vec<(&str, Value)>) -> Value {
    let mut mapping = Mapping::new();
    for (key, value) in fields {
        mapping.insert(Value::from(key), value);
    }
    Value::Mapping(mapping)
}

/// Render a topology into its persisted document form
pub fn serialize(topology: &Topology) -> TopologyDocument {
    let mut root = Mapping::new();

    root.insert(
        Value::from(PARAMETERS_KEY),
        entry(vec![
            ("nb_servers", Value::from(topology.server_count() as u64)),
            ("nb_clients", Value::from(topology.client_count() as u64)),
        ]),
    );

    for server in topology.servers() {
        root.insert(
            Value::from(server.name()),
            entry(vec![
                ("address", Value::from(server.address.as_str())),
                ("port_server", Value::from(server.listen_port)),
                ("port_client", Value::from(server.client_port)),
            ]),
        );
    }

    for client in topology.clients() {
        let address_server = topology
            .server_of(client)
            .map(|server| server.address.clone())
            .unwrap_or_else(|| server_name(client.assigned_server));
        root.insert(
            Value::from(client.name()),
            entry(vec![
                ("address_server", Value::from(address_server)),
                ("port_server", Value::from(client.server_port)),
                ("server_index", Value::from(client.assigned_server)),
            ]),
        );
    }

    TopologyDocument { root }
}

/// Rebuild a topology from its persisted document form
pub fn deserialize(document: &TopologyDocument) -> Result<Topology, DocumentError> {
    let root = &document.root;

    if let Some(parameters) = root.get(PARAMETERS_KEY) {
        let parameters = parameters.as_mapping().ok_or(DocumentError::InvalidField {
            node: PARAMETERS_KEY.to_string(),
            field: "parameters",
            expected: "a mapping",
        })?;
        let nb_servers = read_count(parameters, PARAMETERS_KEY, "nb_servers")?;
        let nb_clients = read_count(parameters, PARAMETERS_KEY, "nb_clients")?;
        read_nodes(root, nb_servers, nb_clients)
    } else if root.contains_key(LEGACY_SERVERS_KEY) {
        let nb_servers = read_count(root, "document", LEGACY_SERVERS_KEY)?;
        let nb_clients = read_count(root, "document", LEGACY_CLIENTS_KEY)?;
        read_legacy_nodes(root, nb_servers, nb_clients)
    } else {
        Err(DocumentError::MissingParameters)
    }
}

fn read_nodes(root: &Mapping, nb_servers: u32, nb_clients: u32) -> Result<Topology, DocumentError> {
    let mut servers = Vec::new();
    for index in 0..nb_servers {
        let name = server_name(index);
        let node = node_entry(root, &name)?;
        servers.push(ServerNode {
            index,
            address: read_str(node, &name, "address")?,
            listen_port: read_port(node, &name, "port_server")?,
            client_port: read_port(node, &name, "port_client")?,
        });
    }

    let mut clients = Vec::new();
    for index in 0..nb_clients {
        let name = client_name(index);
        let node = node_entry(root, &name)?;
        let address_server = read_str(node, &name, "address_server")?;
        let server_port = read_port(node, &name, "port_server")?;

        let assigned_server = match read_optional_u64(node, &name, "server_index")? {
            Some(server) => {
                let server = check_server_index(index, server, nb_servers)?;
                if servers[server as usize].address != address_server {
                    warn!(
                        "{} names server{} but its address_server is '{}'",
                        name, server, address_server
                    );
                }
                server
            }
            None => resolve_server(index, &address_server, &servers, nb_servers)?,
        };

        let expected_port = servers[assigned_server as usize].client_port;
        if server_port != expected_port {
            warn!(
                "{} dials port {} but server{} accepts clients on port {}",
                name, server_port, assigned_server, expected_port
            );
        }

        clients.push(ClientNode {
            index,
            assigned_server,
            server_port,
        });
    }

    log_extra_keys(root, nb_servers, nb_clients);

    Ok(Topology::new(servers, clients)?)
}

fn read_legacy_nodes(root: &Mapping, nb_servers: u32, nb_clients: u32) -> Result<Topology, DocumentError> {
    let mut servers = Vec::new();
    for index in 0..nb_servers {
        let name = server_name(index);
        let node = node_entry(root, &name)?;
        let port = read_port(node, &name, "port")?;
        servers.push(ServerNode {
            index,
            address: read_str(node, &name, "ip")?,
            listen_port: port,
            client_port: port,
        });
    }

    let mut clients = Vec::new();
    for index in 0..nb_clients {
        node_entry(root, &client_name(index))?;
        let assigned_server = check_server_index(index, u64::from(index), nb_servers)?;
        clients.push(ClientNode {
            index,
            assigned_server,
            server_port: servers[assigned_server as usize].client_port,
        });
    }

    Ok(Topology::new(servers, clients)?)
}

/// Find the server a client without `server_index` refers to
fn resolve_server(
    client: u32,
    address: &str,
    servers: &[ServerNode],
    nb_servers: u32,
) -> Result<u32, DocumentError> {
    if let Some(server) = servers.iter().find(|server| server.address == address) {
        return Ok(server.index);
    }

    if let Some(captures) = SERVER_NAME.captures(address) {
        if let Ok(server) = captures[1].parse::<u64>() {
            return check_server_index(client, server, nb_servers);
        }
    }

    Err(DocumentError::UnknownServer {
        client,
        address: address.to_string(),
    })
}

fn check_server_index(client: u32, server: u64, nb_servers: u32) -> Result<u32, DocumentError> {
    if server < u64::from(nb_servers) {
        Ok(server as u32)
    } else {
        Err(DocumentError::ServerOutOfRange {
            client,
            server,
            nb_servers,
        })
    }
}

fn node_entry<'a>(root: &'a Mapping, node: &str) -> Result<&'a Mapping, DocumentError> {
    match root.get(node) {
        Some(Value::Mapping(mapping)) => Ok(mapping),
        Some(_) => Err(DocumentError::InvalidField {
            node: node.to_string(),
            field: "entry",
            expected: "a mapping",
        }),
        None => Err(DocumentError::MissingNode {
            node: node.to_string(),
        }),
    }
}

fn read_field<'a>(mapping: &'a Mapping, node: &str, field: &'static str) -> Result<&'a Value, DocumentError> {
    match mapping.get(field) {
        Some(Value::Null) | None => Err(DocumentError::MissingField {
            node: node.to_string(),
            field,
        }),
        Some(value) => Ok(value),
    }
}

fn read_str(mapping: &Mapping, node: &str, field: &'static str) -> Result<String, DocumentError> {
    read_field(mapping, node, field)?
        .as_str()
        .map(str::to_string)
        .ok_or(DocumentError::InvalidField {
            node: node.to_string(),
            field,
            expected: "a string",
        })
}

fn read_port(mapping: &Mapping, node: &str, field: &'static str) -> Result<u16, DocumentError> {
    read_field(mapping, node, field)?
        .as_u64()
        .and_then(|port| u16::try_from(port).ok())
        .ok_or(DocumentError::InvalidField {
            node: node.to_string(),
            field,
            expected: "a port number (0-65535)",
        })
}

fn read_count(mapping: &Mapping, node: &str, field: &'static str) -> Result<u32, DocumentError> {
    read_field(mapping, node, field)?
        .as_u64()
        .and_then(|count| u32::try_from(count).ok())
        .ok_or(DocumentError::InvalidField {
            node: node.to_string(),
            field,
            expected: "a non-negative integer",
        })
}

fn read_optional_u64(mapping: &Mapping, node: &str, field: &'static str) -> Result<Option<u64>, DocumentError> {
    match mapping.get(field) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or(DocumentError::InvalidField {
            node: node.to_string(),
            field,
            expected: "a non-negative integer",
        }),
    }
}

fn log_extra_keys(root: &Mapping, nb_servers: u32, nb_clients: u32) {
    for key in root.keys() {
        let Some(key) = key.as_str() else { continue };
        let known = key == PARAMETERS_KEY
            || parse_index(key, "server").is_some_and(|i| i < nb_servers)
            || parse_index(key, "client").is_some_and(|i| i < nb_clients);
        if !known {
            debug!("Ignoring unreferenced document key '{}'", key);
        }
    }
}

fn parse_index(key: &str, prefix: &str) -> Option<u32> {
    key.strip_prefix(prefix)?.parse().ok()
}
