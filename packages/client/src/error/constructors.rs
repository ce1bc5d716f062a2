use super::types::{BoxError, Error, Kind};

/// Creates an `Error` for a name resolution failure.
pub fn resolution<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Resolution).with(e.into())
}

/// Creates an `Error` for a local socket allocation or bind failure.
pub fn bind<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Bind).with(e.into())
}

/// Creates an `Error` for a handshake that failed or never completed.
pub fn handshake<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Handshake).with(e.into())
}

/// Creates an `Error` for a failed close sequence.
pub fn teardown<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Teardown).with(e.into())
}

/// Creates an `Error` for an invalid configuration.
pub fn configuration<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Configuration).with(e.into())
}

/// Creates an `Error` for a command rejected by the connection object or adapter.
pub fn connection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connection).with(e.into())
}

impl From<crate::config::ConfigurationError> for Error {
    fn from(e: crate::config::ConfigurationError) -> Self {
        configuration(e)
    }
}
