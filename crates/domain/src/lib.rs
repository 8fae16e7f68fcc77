//! Shared types for msgbridge: configuration, the common error type,
//! capability descriptors advertised by messaging clients, and structured
//! trace events.

pub mod capability;
pub mod config;
pub mod error;
pub mod trace;
