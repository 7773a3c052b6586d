//! Tools and Utilities Module
//!
//! ## Available Tools
//! - `data_generator`: seeded synthetic snapshot / update streams for the CLI replay and
//!   the criterion benchmarks

pub mod data_generator;

pub use data_generator::DataGenerator;
