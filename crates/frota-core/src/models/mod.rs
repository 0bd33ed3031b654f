//! Data models shared across the crate.

pub mod config;
pub mod field_bag;
pub mod invoice;
pub mod tracking;
