//! Shared types for the now-playing display: configuration, bus events and
//! the metadata store written by the bus client and read by the render loop.

pub mod config;
pub mod platform;
pub mod protocol;
pub mod state;
