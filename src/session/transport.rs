//! Transport abstraction for node sessions.
//!
//! Sessions talk to the network through [`Transport`], so the same state
//! machine runs over real TCP sockets or over the scripted in-memory
//! transport used by unit tests.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

/// An established, bidirectional byte stream
pub trait Connection: Read + Write {
    /// Human readable peer address
    fn peer(&self) -> String;
}

/// A bound socket waiting for inbound connections
pub trait Listener {
    type Conn: Connection;

    /// Start accepting connections
    fn listen(&mut self) -> io::Result<()>;

    /// Block until one inbound connection arrives
    fn accept(&mut self) -> io::Result<Self::Conn>;

    /// Port the listener is bound to
    fn local_port(&self) -> io::Result<u16>;
}

/// Factory for listeners and outbound connections
pub trait Transport {
    type Conn: Connection;
    type Listener: Listener<Conn = Self::Conn>;

    fn bind(&self, address: &str, port: u16) -> io::Result<Self::Listener>;

    fn connect(&self, address: &str, port: u16, timeout: Option<Duration>) -> io::Result<Self::Conn>;
}

/// Blocking TCP sockets from the standard library
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl Connection for TcpStream {
    fn peer(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

impl Listener for TcpListener {
    type Conn = TcpStream;

    fn listen(&mut self) -> io::Result<()> {
        // std binds and listens in one call
        Ok(())
    }

    fn accept(&mut self) -> io::Result<TcpStream> {
        let (stream, peer) = TcpListener::accept(self)?;
        debug!("Accepted connection from {}", peer);
        Ok(stream)
    }

    fn local_port(&self) -> io::Result<u16> {
        Ok(self.local_addr()?.port())
    }
}

impl Transport for TcpTransport {
    type Conn = TcpStream;
    type Listener = TcpListener;

    fn bind(&self, address: &str, port: u16) -> io::Result<TcpListener> {
        TcpListener::bind((address, port))
    }

    fn connect(&self, address: &str, port: u16, timeout: Option<Duration>) -> io::Result<TcpStream> {
        let candidates: Vec<_> = (address, port)
            .to_socket_addrs()
            .map_err(|err| io::Error::new(ErrorKind::HostUnreachable, err))?
            .collect();

        let mut last_error = io::Error::new(
            ErrorKind::HostUnreachable,
            format!("{} did not resolve to any address", address),
        );

        for candidate in candidates {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    debug!("Connection to {} failed: {}", candidate, err);
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }
}
