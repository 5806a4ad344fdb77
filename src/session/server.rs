//! Server side of a node session.
//!
//! A server binds its topology address, accepts one client, then reads
//! until the client closes (or after the first message in
//! [`ExchangeMode::Single`]). With a connection limit above one the session
//! goes back to `Listening` after each client until the limit is reached.

use log::{debug, info};

use super::error::SessionError;
use super::state::{ExchangeMode, Received, ServerState};
use super::transport::{Connection, Listener, Transport};
use super::{read_chunk, uppercase, write_message, ExchangeReport};

/// Single-shot server session
pub struct ServerSession<T: Transport> {
    transport: T,
    state: ServerState,
    address: String,
    listener: Option<T::Listener>,
    connection: Option<T::Conn>,
    connection_limit: u32,
    accepted: u32,
}

impl<T: Transport> ServerSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ServerState::Idle,
            address: String::new(),
            listener: None,
            connection: None,
            connection_limit: 1,
            accepted: 0,
        }
    }

    /// Accept up to `limit` clients, one after the other (at least one)
    pub fn with_connection_limit(mut self, limit: u32) -> Self {
        self.connection_limit = limit.max(1);
        self
    }

    /// Number of connections accepted so far
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Port of the bound listener, if still open
    pub fn local_port(&self) -> Option<u16> {
        self.listener.as_ref().and_then(|listener| listener.local_port().ok())
    }

    fn expect(&self, operation: &'static str, allowed: &[ServerState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    /// Release the socket(s) and surface `err`
    fn fail(&mut self, err: SessionError) -> SessionError {
        self.close();
        err
    }

    pub fn bind(&mut self, address: &str, port: u16) -> Result<(), SessionError> {
        self.expect("bind", &[ServerState::Idle])?;
        self.address = format!("{}:{}", address, port);

        match self.transport.bind(address, port) {
            Ok(listener) => {
                self.listener = Some(listener);
                self.state = ServerState::Bound;
                debug!("Bound {}", self.address);
                Ok(())
            }
            Err(err) => {
                let err = SessionError::bind(self.address.clone(), err);
                Err(self.fail(err))
            }
        }
    }

    pub fn listen(&mut self) -> Result<(), SessionError> {
        self.expect("listen", &[ServerState::Bound])?;

        let result = match self.listener.as_mut() {
            Some(listener) => listener.listen(),
            None => Ok(()),
        };
        match result {
            Ok(()) => {
                self.state = ServerState::Listening;
                info!("Listening on {}", self.address);
                Ok(())
            }
            Err(err) => {
                let err = SessionError::bind(self.address.clone(), err);
                Err(self.fail(err))
            }
        }
    }

    /// Block until one client connects. The listener is released once the
    /// connection limit is reached.
    pub fn accept(&mut self) -> Result<(), SessionError> {
        self.expect("accept", &[ServerState::Listening])?;

        let Some(mut listener) = self.listener.take() else {
            return Err(SessionError::InvalidState {
                operation: "accept",
                state: "listening without a socket".to_string(),
            });
        };

        match listener.accept() {
            Ok(connection) => {
                info!("Accepted connection from {}", connection.peer());
                self.accepted += 1;
                if self.accepted < self.connection_limit {
                    self.listener = Some(listener);
                }
                self.connection = Some(connection);
                self.state = ServerState::Connected;
                Ok(())
            }
            Err(err) => {
                let err = SessionError::transfer("accept", self.address.clone(), err);
                Err(self.fail(err))
            }
        }
    }

    /// Read whatever the client sent, up to one buffer. A zero-byte read
    /// closes the session.
    pub fn receive(&mut self) -> Result<Received, SessionError> {
        self.expect("receive", &[ServerState::Connected, ServerState::Exchanging])?;

        let Some(connection) = self.connection.as_mut() else {
            return Err(SessionError::InvalidState {
                operation: "receive",
                state: "connected without a socket".to_string(),
            });
        };

        match read_chunk(connection) {
            Ok(Received::PeerClosed) => {
                debug!("Peer closed connection on {}", self.address);
                self.end_connection();
                Ok(Received::PeerClosed)
            }
            Ok(received) => {
                self.state = ServerState::Exchanging;
                Ok(received)
            }
            Err(err) => {
                let err = SessionError::transfer("receive", self.address.clone(), err);
                Err(self.fail(err))
            }
        }
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<(), SessionError> {
        self.expect("send", &[ServerState::Connected, ServerState::Exchanging])?;

        let Some(connection) = self.connection.as_mut() else {
            return Err(SessionError::InvalidState {
                operation: "send",
                state: "connected without a socket".to_string(),
            });
        };

        match write_message(connection, payload) {
            Ok(()) => {
                self.state = ServerState::Exchanging;
                Ok(())
            }
            Err(err) => {
                let err = SessionError::transfer("send", self.address.clone(), err);
                Err(self.fail(err))
            }
        }
    }

    /// Drop the connection and listener. Safe to call in any state.
    pub fn close(&mut self) {
        if self.state != ServerState::Closed {
            debug!("Closing server session on {}", self.address);
        }
        self.connection = None;
        self.listener = None;
        self.state = ServerState::Closed;
    }

    /// Drop the current connection. Back to `Listening` while more clients
    /// may connect, `Closed` otherwise.
    fn end_connection(&mut self) {
        self.connection = None;
        if self.listener.is_some() {
            debug!("Waiting for next client on {}", self.address);
            self.state = ServerState::Listening;
        } else {
            self.close();
        }
    }

    /// Run the exchange on an accepted connection, then release it.
    pub fn exchange(&mut self, mode: ExchangeMode) -> Result<ExchangeReport, SessionError> {
        let mut report = ExchangeReport::default();

        loop {
            match self.receive()? {
                Received::PeerClosed => break,
                Received::Data(payload) => {
                    let text = String::from_utf8_lossy(&payload).into_owned();
                    info!("Received {} bytes: {}", payload.len(), text);
                    report.received.push(text);

                    match mode {
                        ExchangeMode::Single => break,
                        ExchangeMode::Echo => {
                            let reply = uppercase(&payload);
                            self.send(&reply)?;
                            report.sent.push(String::from_utf8_lossy(&reply).into_owned());
                        }
                    }
                }
            }
        }

        if self.connection.is_some() {
            self.end_connection();
        }
        Ok(report)
    }

    /// Bind, listen, accept one client, exchange and close.
    pub fn serve_once(&mut self, address: &str, port: u16, mode: ExchangeMode) -> Result<ExchangeReport, SessionError> {
        self.bind(address, port)?;
        self.listen()?;
        self.accept()?;
        self.exchange(mode)
    }

    /// Bind, listen, then accept and exchange with clients until the
    /// connection limit is reached. Messages of all clients are collected
    /// in arrival order.
    pub fn serve(&mut self, address: &str, port: u16, mode: ExchangeMode) -> Result<ExchangeReport, SessionError> {
        self.bind(address, port)?;
        self.listen()?;

        let mut report = ExchangeReport::default();
        while self.state == ServerState::Listening {
            self.accept()?;
            let exchanged = self.exchange(mode)?;
            report.received.extend(exchanged.received);
            report.sent.extend(exchanged.sent);
        }

        self.close();
        Ok(report)
    }
}
