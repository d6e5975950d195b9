//! Retailscope CLI
//!
//! This crate provides the command-line interface for Retailscope including:
//! - run: Start the dashboard API server
//! - connectors: List registered connector types
//! - test: Check a single configured data source
//! - query: Run a dashboard query with fallback

pub mod commands;

pub use commands::{Cli, Commands};
