//! Request handlers organized by resource.

pub mod events;
pub mod health;
pub mod subscriptions;
pub mod system;
