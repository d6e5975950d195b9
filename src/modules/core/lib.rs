//! Core domain logic for Retailscope
//!
//! This crate contains the data-source configuration model, connector
//! metadata and the error type shared by every Retailscope crate.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::{QueryFailure, Result, RetailscopeError};
