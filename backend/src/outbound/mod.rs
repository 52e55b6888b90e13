//! Outbound adapters implementing the store ports.

pub mod document;
pub mod memory;
pub mod persistence;
