//! TLS identity and resumption helpers

pub mod session;
pub mod sni;

pub use session::{SessionTicket, SessionTicketHandler};
pub use sni::{apply_server_name, server_name_for_host};
