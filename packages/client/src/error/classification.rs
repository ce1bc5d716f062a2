use std::error::Error as StdError;
use std::io;

use super::helpers::TimedOut;
use super::types::{Error, Kind};

impl Error {
    /// Returns true if no usable destination address was found.
    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(self.inner.kind, Kind::Resolution)
    }

    /// Returns true if the local socket could not be created or bound.
    #[must_use]
    pub fn is_bind(&self) -> bool {
        matches!(self.inner.kind, Kind::Bind)
    }

    /// Returns true if the handshake failed while the caller was waiting on it.
    #[must_use]
    pub fn is_handshake(&self) -> bool {
        matches!(self.inner.kind, Kind::Handshake)
    }

    /// Returns true if the close sequence itself failed.
    #[must_use]
    pub fn is_teardown(&self) -> bool {
        matches!(self.inner.kind, Kind::Teardown)
    }

    /// Returns true if the configuration was rejected.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.inner.kind, Kind::Configuration)
    }

    /// Returns true if the connection object or adapter rejected a command.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self.inner.kind, Kind::Connection)
    }

    /// Returns true if the error is related to a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if err.is::<TimedOut>() {
                return true;
            }
            if let Some(io) = err.downcast_ref::<io::Error>()
                && io.kind() == io::ErrorKind::TimedOut
            {
                return true;
            }
            source = err.source();
        }

        false
    }
}
