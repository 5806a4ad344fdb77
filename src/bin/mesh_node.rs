//! Node process for nodemesh deployments.
//!
//! Runs inside each container: loads the topology document, finds its own
//! binding from its role and `NUM_NODE`, and performs one server or client
//! session over TCP.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use env_logger::Env;
use log::info;

use nodemesh::config_loader::{self, DEFAULT_DOCUMENT_NAME};
use nodemesh::session::{self, ClientOptions, ExchangeMode, ServerOptions, TcpTransport, DEFAULT_PAYLOAD};
use nodemesh::utils::parse_timeout;

#[derive(Parser)]
#[command(name = "mesh-node")]
#[command(about = "Run one server or client node of a nodemesh deployment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    role: Role,

    /// Path to the topology document
    #[arg(short, long, global = true, default_value = DEFAULT_DOCUMENT_NAME)]
    config: PathBuf,

    /// Index of this node within its role
    #[arg(short, long, global = true, env = "NUM_NODE")]
    node: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Role {
    /// Accept one client and print what it sends
    Server {
        /// Bind this address instead of the one in the topology
        #[arg(long)]
        bind: Option<String>,

        /// Serve every client assigned to this server, one after the other
        #[arg(long)]
        all_clients: bool,

        #[command(flatten)]
        exchange: ExchangeArgs,
    },

    /// Connect to the assigned server and send one message
    Client {
        /// Message to send
        #[arg(short, long, default_value = DEFAULT_PAYLOAD)]
        message: String,

        /// Give up connecting after this long (e.g. "500ms", "5s")
        #[arg(long, value_parser = parse_timeout)]
        connect_timeout: Option<Duration>,

        #[command(flatten)]
        exchange: ExchangeArgs,
    },
}

#[derive(ClapArgs)]
struct ExchangeArgs {
    /// Servers reply with the uppercase message, clients wait for the reply
    #[arg(long)]
    echo: bool,
}

impl ExchangeArgs {
    fn mode(&self) -> ExchangeMode {
        if self.echo {
            ExchangeMode::Echo
        } else {
            ExchangeMode::Single
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let node = cli
        .node
        .ok_or_else(|| eyre!("Node index missing: pass --node or set NUM_NODE"))?;

    // Each process holds its own read-only copy of the topology
    let topology = config_loader::load_topology(&cli.config)?;

    match cli.role {
        Role::Server {
            bind,
            all_clients,
            exchange,
        } => {
            let options = ServerOptions {
                bind_address: bind,
                mode: exchange.mode(),
                all_clients,
            };
            let report = session::run_server(&topology, node, TcpTransport, &options)
                .wrap_err_with(|| format!("server{} session failed", node))?;

            for message in &report.received {
                println!("{}", message);
            }
            info!("server{} done: {} message(s) received", node, report.received.len());
        }

        Role::Client {
            message,
            connect_timeout,
            exchange,
        } => {
            let options = ClientOptions {
                payload: message,
                mode: exchange.mode(),
                connect_timeout,
            };
            let report = session::run_client(&topology, node, TcpTransport, &options)
                .wrap_err_with(|| format!("client{} session failed", node))?;

            for reply in &report.received {
                println!("{}", reply);
            }
            info!("client{} done", node);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_parsing() {
        let cli = Cli::parse_from(["mesh-node", "server", "--node", "1", "--echo", "--bind", "0.0.0.0"]);
        assert_eq!(cli.node, Some(1));
        assert_eq!(cli.config, PathBuf::from("net_config.yml"));
        match cli.role {
            Role::Server {
                bind,
                all_clients,
                exchange,
            } => {
                assert_eq!(bind.as_deref(), Some("0.0.0.0"));
                assert!(!all_clients);
                assert_eq!(exchange.mode(), ExchangeMode::Echo);
            }
            Role::Client { .. } => panic!("expected server role"),
        }
    }

    #[test]
    fn test_client_parsing() {
        let cli = Cli::parse_from([
            "mesh-node", "client", "--node", "0", "--config", "cfg.yml", "--connect-timeout", "500ms",
        ]);
        assert_eq!(cli.config, PathBuf::from("cfg.yml"));
        match cli.role {
            Role::Client {
                message,
                connect_timeout,
                exchange,
            } => {
                assert_eq!(message, "Hello_world");
                assert_eq!(connect_timeout, Some(Duration::from_millis(500)));
                assert_eq!(exchange.mode(), ExchangeMode::Single);
            }
            Role::Server { .. } => panic!("expected client role"),
        }
    }

    #[test]
    fn test_all_clients_flag() {
        let cli = Cli::parse_from(["mesh-node", "server", "--node", "0", "--all-clients"]);
        match cli.role {
            Role::Server { all_clients, .. } => assert!(all_clients),
            Role::Client { .. } => panic!("expected server role"),
        }
    }

    #[test]
    fn test_zero_connect_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["mesh-node", "client", "--connect-timeout", "0"]).is_err());
        assert!(Cli::try_parse_from(["mesh-node", "client", "--connect-timeout", "0ms"]).is_err());
    }
}
