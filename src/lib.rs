//! # Nodemesh - Topology generator and handshake harness for server/client deployments
//!
//! This library generates the network topology of a small test deployment
//! (servers, clients, and which server each client dials) and runs the
//! single-connection handshake each node performs once deployed.
//!
//! ## Overview
//!
//! A deployment is described by two numbers: how many servers and how many
//! clients. The generator turns them into a [`topology::Topology`], the
//! document layer persists it as `net_config.yml`, every container loads its
//! own copy, and the session layer opens or accepts a TCP connection and
//! exchanges one message per client.
//!
//! ## Architecture
//!
//! - `topology`: Topology model, client assignment strategies and generator
//! - `document`: YAML document form of a topology (and the older `S`/`C` layout)
//! - `config_loader`: Loading, saving and distributing topology files
//! - `compose`: Docker Compose descriptor generation
//! - `session`: Server/client state machines over TCP or in-memory transports
//! - `utils`: Utility functions and helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use nodemesh::{config_loader, session, topology};
//! use rand::SeedableRng;
//! use std::path::Path;
//!
//! // Generate a reproducible topology and persist it
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let topology = topology::generate(2, 3, &mut rng)?;
//! config_loader::save_topology(Path::new("net_config.yml"), &topology)?;
//!
//! // Inside client container 0
//! let topology = config_loader::load_topology(Path::new("net_config.yml"))?;
//! session::run_client(&topology, 0, session::TcpTransport, &session::ClientOptions::default())?;
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Error Handling
//!
//! Library modules return typed errors (`TopologyError`, `DocumentError`,
//! `SessionError`). File handling and the binaries use `color_eyre` for
//! error reporting with context.

pub mod topology;
pub mod document;
pub mod config_loader;
pub mod compose;
pub mod session;
pub mod utils;
