//! Shared domain types for the Rollcall attendance client.

pub mod api;
pub mod attendance;
pub mod config;
pub mod frame;
pub mod notice;
pub mod outcome;
pub mod registration;
pub mod validation;

mod errors;

pub use errors::{RollcallError, Result};
