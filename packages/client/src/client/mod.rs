//! Connection lifecycle management
//!
//! `QuicClient` drives one connection from resolution to teardown and hands
//! the caller a `ClientSession` in between.

pub mod core;
pub mod options;
pub mod session;
pub mod state;

pub use core::{QuicClient, connect};

pub use options::ConnectOptions;
pub use session::ClientSession;
pub use state::LifecycleState;
