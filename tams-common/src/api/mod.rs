//! API module for shared HTTP client functionality
//!
//! Provides the session context, the authenticated transport and the wire
//! types shared by every TAMS client crate.
//!
//! # Architecture
//!
//! - [`session::SessionContext`] holds the bearer credentials. It is an
//!   explicit object handed to the transport, never ambient global state.
//! - [`transport::ApiTransport`] is the single owner of the
//!   refresh-on-401-and-retry sequence.
//! - [`types`] defines the response envelope contract validated at the
//!   boundary.

pub mod session;
pub mod transport;
pub mod types;

pub use session::{SessionContext, SessionTokens};
pub use transport::{ApiTransport, TransportError};
pub use types::{ApiErrorBody, ListEnvelope, RefreshRequest, RefreshResponse};
