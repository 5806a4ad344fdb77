//! Client side of a node session.

use std::time::Duration;

use log::{debug, info};

use super::error::SessionError;
use super::state::{ClientState, ExchangeMode, Received};
use super::transport::{Connection, Transport};
use super::{read_chunk, write_message, ExchangeReport};

/// Single-shot client session
pub struct ClientSession<T: Transport> {
    transport: T,
    state: ClientState,
    address: String,
    connect_timeout: Option<Duration>,
    connection: Option<T::Conn>,
}

impl<T: Transport> ClientSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ClientState::Idle,
            address: String::new(),
            connect_timeout: None,
            connection: None,
        }
    }

    /// Give up connecting after `timeout` instead of waiting on the OS
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    fn expect(&self, operation: &'static str, allowed: &[ClientState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.close();
        err
    }

    pub fn connect(&mut self, address: &str, port: u16) -> Result<(), SessionError> {
        self.expect("connect", &[ClientState::Idle])?;
        self.address = format!("{}:{}", address, port);
        self.state = ClientState::Connecting;
        debug!("Connecting to {}", self.address);

        match self.transport.connect(address, port, self.connect_timeout) {
            Ok(connection) => {
                info!("Connected to {}", connection.peer());
                self.connection = Some(connection);
                self.state = ClientState::Connected;
                Ok(())
            }
            Err(err) => {
                let err = SessionError::connect(self.address.clone(), err);
                Err(self.fail(err))
            }
        }
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<(), SessionError> {
        self.expect("send", &[ClientState::Connected, ClientState::Exchanging])?;

        let Some(connection) = self.connection.as_mut() else {
            return Err(SessionError::InvalidState {
                operation: "send",
                state: "connected without a socket".to_string(),
            });
        };

        match write_message(connection, payload) {
            Ok(()) => {
                self.state = ClientState::Exchanging;
                info!("Sent {} bytes to {}", payload.len(), self.address);
                Ok(())
            }
            Err(err) => {
                let err = SessionError::transfer("send", self.address.clone(), err);
                Err(self.fail(err))
            }
        }
    }

    /// Read the server's answer, up to one buffer. A zero-byte read closes
    /// the session.
    pub fn receive(&mut self) -> Result<Received, SessionError> {
        self.expect("receive", &[ClientState::Connected, ClientState::Exchanging])?;

        let Some(connection) = self.connection.as_mut() else {
            return Err(SessionError::InvalidState {
                operation: "receive",
                state: "connected without a socket".to_string(),
            });
        };

        match read_chunk(connection) {
            Ok(Received::PeerClosed) => {
                debug!("Server {} closed the connection", self.address);
                self.close();
                Ok(Received::PeerClosed)
            }
            Ok(received) => {
                self.state = ClientState::Exchanging;
                Ok(received)
            }
            Err(err) => {
                let err = SessionError::transfer("receive", self.address.clone(), err);
                Err(self.fail(err))
            }
        }
    }

    pub fn close(&mut self) {
        if self.state != ClientState::Closed {
            debug!("Closing client session to {}", self.address);
        }
        self.connection = None;
        self.state = ClientState::Closed;
    }

    /// Send `payload`, wait for one reply in echo mode, then close.
    pub fn exchange(&mut self, payload: &[u8], mode: ExchangeMode) -> Result<ExchangeReport, SessionError> {
        let mut report = ExchangeReport::default();

        self.send(payload)?;
        report.sent.push(String::from_utf8_lossy(payload).into_owned());

        if mode == ExchangeMode::Echo {
            if let Received::Data(reply) = self.receive()? {
                let text = String::from_utf8_lossy(&reply).into_owned();
                info!("Received reply: {}", text);
                report.received.push(text);
            }
        }

        self.close();
        Ok(report)
    }

    /// Connect, exchange and close.
    pub fn run_once(
        &mut self,
        address: &str,
        port: u16,
        payload: &[u8],
        mode: ExchangeMode,
    ) -> Result<ExchangeReport, SessionError> {
        self.connect(address, port)?;
        self.exchange(payload, mode)
    }
}
