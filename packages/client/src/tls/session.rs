//! TLS session resumption tickets

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Opaque resumption token issued by the server's TLS engine
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionTicket(Bytes);

impl SessionTicket {
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTicket")
            .field("len", &self.0.len())
            .finish()
    }
}

impl From<Vec<u8>> for SessionTicket {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

/// Callback invoked by the connection object whenever a new ticket is issued
pub type SessionTicketHandler = Arc<dyn Fn(SessionTicket) + Send + Sync + 'static>;
