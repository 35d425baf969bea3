//! Concrete port implementations.

pub mod delimited_adapter;
pub mod file_config_adapter;
pub mod memory_position_adapter;
