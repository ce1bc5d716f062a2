use std::fmt;

/// A marker type to indicate that an operation timed out.
#[derive(Debug)]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("timed out")
    }
}

impl std::error::Error for TimedOut {}

/// A marker type to indicate that the connection closed before the handshake completed.
#[derive(Debug)]
pub struct ConnectionClosed;

impl fmt::Display for ConnectionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection closed")
    }
}

impl std::error::Error for ConnectionClosed {}

/// A marker type to indicate that name resolution returned no candidates.
#[derive(Debug)]
pub struct NoAddresses;

impl fmt::Display for NoAddresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no addresses returned")
    }
}

impl std::error::Error for NoAddresses {}

/// Connection close reported by the QUIC state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTerminated {
    pub error_code: u64,
    pub reason: String,
}

impl fmt::Display for ConnectionTerminated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "connection terminated (error code {:#x})", self.error_code)
        } else {
            write!(
                f,
                "connection terminated (error code {:#x}): {}",
                self.error_code, self.reason
            )
        }
    }
}

impl std::error::Error for ConnectionTerminated {}
