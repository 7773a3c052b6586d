//! Interfaces Layer - External Entry Points
//!
//! ## Modules
//! - `cli`: command-line replay harness (main.rs logic)
//! - `tools`: synthetic market data

pub mod cli;
pub mod tools;
