//! CLI command implementations.

pub mod board;
pub mod common;
pub mod generate;
pub mod profiles;
pub mod simulate;
