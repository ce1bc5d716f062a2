pub mod classification;
pub mod constructors;
pub mod helpers;
pub mod types;

pub use constructors::*;
pub use helpers::{ConnectionClosed, ConnectionTerminated, NoAddresses, TimedOut};
pub use types::{BoxError, Error, Inner, Kind, Result};
