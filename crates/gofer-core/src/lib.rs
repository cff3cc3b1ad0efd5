//! Gofer Extension Core
//!
//! Core domain types, traits, and error handling shared by every Gofer
//! extension. This crate has minimal dependencies and defines the vocabulary
//! used across the host client, the subscription registry, the event sources
//! and the extension harness.

pub mod error;
pub mod events;
pub mod ids;
pub mod ports;
pub mod run;
pub mod subscription;

pub use error::{Error, Result};
pub use ids::*;
