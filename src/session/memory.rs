//! In-memory transport.
//!
//! Connections are scripted up front: each queued connection yields a fixed
//! sequence of reads and records everything written to it. A
//! [`ConnectionProbe`] keeps an eye on a connection after the session has
//! taken ownership of it.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::transport::{Connection, Listener, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted read
#[derive(Debug, Clone)]
enum Step {
    Data(Vec<u8>),
    Fail(ErrorKind),
}

/// Scripted connection; once the script runs out every read returns 0
#[derive(Debug)]
pub struct MemoryConnection {
    peer: String,
    script: VecDeque<Step>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    released: Arc<AtomicBool>,
}

/// Observer for a [`MemoryConnection`]
#[derive(Debug, Clone)]
pub struct ConnectionProbe {
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    released: Arc<AtomicBool>,
}

impl ConnectionProbe {
    /// Payloads written to the connection, one entry per write call
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.written).clone()
    }

    /// Whether the connection has been dropped
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl MemoryConnection {
    pub fn new(peer: impl Into<String>) -> (Self, ConnectionProbe) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let released = Arc::new(AtomicBool::new(false));
        let probe = ConnectionProbe {
            written: Arc::clone(&written),
            released: Arc::clone(&released),
        };
        let connection = Self {
            peer: peer.into(),
            script: VecDeque::new(),
            written,
            released,
        };
        (connection, probe)
    }

    /// Queue bytes returned by a future read
    pub fn then_read(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.script.push_back(Step::Data(data.into()));
        self
    }

    /// Queue a failing read
    pub fn then_fail(mut self, kind: ErrorKind) -> Self {
        self.script.push_back(Step::Fail(kind));
        self
    }
}

impl Read for MemoryConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.pop_front() {
            None => Ok(0),
            Some(Step::Fail(kind)) => Err(io::Error::from(kind)),
            Some(Step::Data(mut data)) => {
                let count = data.len().min(buf.len());
                buf[..count].copy_from_slice(&data[..count]);
                if count < data.len() {
                    self.script.push_front(Step::Data(data.split_off(count)));
                }
                Ok(count)
            }
        }
    }
}

impl Write for MemoryConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.written).push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

impl Connection for MemoryConnection {
    fn peer(&self) -> String {
        self.peer.clone()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    pending: VecDeque<MemoryConnection>,
    bind_error: Option<ErrorKind>,
    connect_error: Option<ErrorKind>,
    bound: Vec<(String, u16)>,
    dialed: Vec<(String, u16)>,
}

/// Transport handing out scripted connections.
///
/// Accepting and connecting both take the next queued connection.
/// Accepting with nothing queued fails instead of blocking; connecting
/// with nothing queued yields a connection whose peer closes immediately.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a connection for the next accept or connect
    pub fn push_connection(&self, connection: MemoryConnection) {
        lock(&self.state).pending.push_back(connection);
    }

    /// Make every bind fail with the given kind
    pub fn fail_bind(&self, kind: ErrorKind) {
        lock(&self.state).bind_error = Some(kind);
    }

    /// Make every connect fail with the given kind
    pub fn fail_connect(&self, kind: ErrorKind) {
        lock(&self.state).connect_error = Some(kind);
    }

    /// Addresses passed to bind, in call order
    pub fn bound(&self) -> Vec<(String, u16)> {
        lock(&self.state).bound.clone()
    }

    /// Addresses passed to connect, in call order
    pub fn dialed(&self) -> Vec<(String, u16)> {
        lock(&self.state).dialed.clone()
    }
}

/// Listener side of [`MemoryTransport`]
#[derive(Debug)]
pub struct MemoryListener {
    port: u16,
    listening: bool,
    state: Arc<Mutex<MemoryState>>,
}

impl Listener for MemoryListener {
    type Conn = MemoryConnection;

    fn listen(&mut self) -> io::Result<()> {
        self.listening = true;
        Ok(())
    }

    fn accept(&mut self) -> io::Result<MemoryConnection> {
        if !self.listening {
            return Err(io::Error::new(ErrorKind::InvalidInput, "listener is not listening"));
        }
        lock(&self.state)
            .pending
            .pop_front()
            .ok_or_else(|| io::Error::new(ErrorKind::WouldBlock, "no pending connection"))
    }

    fn local_port(&self) -> io::Result<u16> {
        Ok(self.port)
    }
}

impl Transport for MemoryTransport {
    type Conn = MemoryConnection;
    type Listener = MemoryListener;

    fn bind(&self, address: &str, port: u16) -> io::Result<MemoryListener> {
        let mut state = lock(&self.state);
        if let Some(kind) = state.bind_error {
            return Err(io::Error::from(kind));
        }
        state.bound.push((address.to_string(), port));
        Ok(MemoryListener {
            port,
            listening: false,
            state: Arc::clone(&self.state),
        })
    }

    fn connect(&self, address: &str, port: u16, _timeout: Option<Duration>) -> io::Result<MemoryConnection> {
        let mut state = lock(&self.state);
        if let Some(kind) = state.connect_error {
            return Err(io::Error::from(kind));
        }
        state.dialed.push((address.to_string(), port));
        let connection = state.pending.pop_front().unwrap_or_else(|| {
            let (connection, _probe) = MemoryConnection::new(format!("{}:{}", address, port));
            connection
        });
        Ok(connection)
    }
}
