//! Session error types.

use std::io::{self, ErrorKind};

/// Errors that can end a node session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Address already in use: {address}")]
    AddressInUse {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied binding {address}")]
    PermissionDenied {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Connection refused by {address}")]
    ConnectionRefused {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Timed out talking to {address}")]
    Timeout {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Host unreachable: {address}")]
    HostUnreachable {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("No {role} with index {index} in topology")]
    UnknownNode { role: &'static str, index: u32 },

    #[error("I/O error during {operation} with {address}")]
    Io {
        operation: &'static str,
        address: String,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    /// Classify a failure to bind a listening socket
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        let address = address.into();
        match source.kind() {
            ErrorKind::AddrInUse => Self::AddressInUse { address, source },
            ErrorKind::PermissionDenied => Self::PermissionDenied { address, source },
            _ => Self::Io {
                operation: "bind",
                address,
                source,
            },
        }
    }

    /// Classify a failure to connect to a peer
    pub fn connect(address: impl Into<String>, source: io::Error) -> Self {
        let address = address.into();
        match source.kind() {
            ErrorKind::ConnectionRefused => Self::ConnectionRefused { address, source },
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Self::Timeout { address, source },
            ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable | ErrorKind::AddrNotAvailable => {
                Self::HostUnreachable { address, source }
            }
            _ => Self::Io {
                operation: "connect",
                address,
                source,
            },
        }
    }

    /// Classify a failure on an established connection
    pub fn transfer(operation: &'static str, address: impl Into<String>, source: io::Error) -> Self {
        let address = address.into();
        match source.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Self::Timeout { address, source },
            _ => Self::Io {
                operation,
                address,
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_classification() {
        let err = SessionError::bind("0.0.0.0:80", io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(err, SessionError::PermissionDenied { .. }));

        let err = SessionError::bind("0.0.0.0:80", io::Error::from(ErrorKind::AddrInUse));
        assert!(matches!(err, SessionError::AddressInUse { .. }));
        assert_eq!(err.to_string(), "Address already in use: 0.0.0.0:80");

        let err = SessionError::bind("0.0.0.0:80", io::Error::from(ErrorKind::InvalidInput));
        assert!(matches!(err, SessionError::Io { operation: "bind", .. }));
    }

    #[test]
    fn test_connect_classification() {
        let refused = SessionError::connect("a:1", io::Error::from(ErrorKind::ConnectionRefused));
        assert!(matches!(refused, SessionError::ConnectionRefused { .. }));

        let timeout = SessionError::connect("a:1", io::Error::from(ErrorKind::TimedOut));
        assert!(matches!(timeout, SessionError::Timeout { .. }));

        let unreachable = SessionError::connect("a:1", io::Error::from(ErrorKind::HostUnreachable));
        assert!(matches!(unreachable, SessionError::HostUnreachable { .. }));
    }
}
