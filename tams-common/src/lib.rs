//! # TAMS Common Library
//!
//! Shared code for the TA Management System client crates:
//! - Error type shared by configuration and I/O
//! - Configuration loading (CLI → ENV → TOML → defaults)
//! - Tracing initialization
//! - Session context, HTTP transport and wire envelope types

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
