//! Fluent connect builder

pub mod core;

pub use core::*;
