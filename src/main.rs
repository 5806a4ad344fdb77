use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;

use nodemesh::compose::{ComposeFile, ComposeOptions};
use nodemesh::config_loader::{self, DEFAULT_DOCUMENT_NAME};
use nodemesh::document;
use nodemesh::topology::{AssignmentStrategy, Topology, TopologyGenerator, DEFAULT_CLIENT_PORT, DEFAULT_LISTEN_PORT};

/// Topology generator and deployment tooling for server/client test networks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a topology document from server and client counts
    Generate {
        /// Number of servers
        servers: u32,

        /// Number of clients
        clients: u32,

        /// Number of byzantine servers (reserved, currently unused)
        byzantines: Option<u32>,

        /// Seed for reproducible client assignment
        #[arg(long)]
        seed: Option<u64>,

        /// How clients are assigned to servers
        #[arg(long, value_enum, default_value_t = AssignmentStrategy::Random)]
        strategy: AssignmentStrategy,

        /// Server address template, `{i}` is replaced by the server index
        #[arg(long, default_value = "server{i}")]
        address_template: String,

        /// Server-to-server port
        #[arg(long, default_value_t = DEFAULT_LISTEN_PORT)]
        listen_port: u16,

        /// Port clients dial
        #[arg(long, default_value_t = DEFAULT_CLIENT_PORT)]
        client_port: u16,

        /// Output path of the topology document
        #[arg(short, long, default_value = DEFAULT_DOCUMENT_NAME)]
        output: PathBuf,

        /// Directories (build contexts) receiving a copy of the document
        #[arg(long = "copy-to")]
        copy_to: Vec<PathBuf>,

        /// Also print the document on stdout
        #[arg(long)]
        print: bool,
    },

    /// Generate a docker-compose file from a topology document
    Compose {
        /// Path to the topology document
        net_config: PathBuf,

        /// Output path of the compose file
        #[arg(short, long, default_value = "docker-compose.yml")]
        output: PathBuf,

        /// Build context of server services
        #[arg(long, default_value = "../server")]
        server_context: String,

        /// Build context of client services
        #[arg(long, default_value = "../client")]
        client_context: String,
    },

    /// Print the topology described by a document
    Show {
        /// Path to the topology document
        net_config: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match args.command {
        Command::Generate {
            servers,
            clients,
            byzantines,
            seed,
            strategy,
            address_template,
            listen_port,
            client_port,
            output,
            copy_to,
            print,
        } => {
            if let Some(count) = byzantines.filter(|&count| count > 0) {
                warn!("Ignoring {} byzantine servers: byzantine nodes are not supported", count);
            }

            let mut rng = match seed {
                Some(seed) => {
                    info!("Using seed {} for client assignment", seed);
                    StdRng::seed_from_u64(seed)
                }
                None => StdRng::from_entropy(),
            };

            let topology = TopologyGenerator::new()
                .address_template(address_template)
                .listen_port(listen_port)
                .client_port(client_port)
                .strategy(strategy)
                .generate(servers, clients, &mut rng)
                .wrap_err("Failed to generate topology")?;

            config_loader::save_topology(&output, &topology)?;

            if print {
                print!("{}", document::serialize(&topology).to_yaml_string()?);
            }

            if !copy_to.is_empty() {
                config_loader::distribute_document(&output, &copy_to)?;
            }

            info!("Topology generation completed successfully");
        }

        Command::Compose {
            net_config,
            output,
            server_context,
            client_context,
        } => {
            let topology = config_loader::load_topology(&net_config)?;
            let options = ComposeOptions {
                server_context,
                client_context,
            };

            let content = ComposeFile::from_topology(&topology, &options).to_yaml_string()?;
            fs::write(&output, content)
                .wrap_err_with(|| format!("Failed to write compose file '{}'", output.display()))?;

            info!("Generated compose file: {:?}", output);
        }

        Command::Show { net_config, json } => {
            let topology = config_loader::load_topology(&net_config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&topology)?);
            } else {
                print_summary(&topology);
            }
        }
    }

    Ok(())
}

fn print_summary(topology: &Topology) {
    println!(
        "{} servers, {} clients",
        topology.server_count(),
        topology.client_count()
    );
    for server in topology.servers() {
        let clients: Vec<String> = topology.clients_of(server.index).map(|client| client.name()).collect();
        println!(
            "  {} at {} (peers :{}, clients :{}) <- [{}]",
            server.name(),
            server.address,
            server.listen_port,
            server.client_port,
            clients.join(", ")
        );
    }
}
