//! Port traits for external collaborators.

pub mod config_port;
pub mod position_port;
pub mod record_port;
pub mod resolver_port;
