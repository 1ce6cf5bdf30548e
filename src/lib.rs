//! SHARPLINE: sports betting decision engine.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod config;
pub mod engine;
pub mod model;
pub mod simulation;
pub mod strategy;
pub mod types;
