//! Mailspool HTTP API.
//!
//! Routes, handlers, authentication middleware, and configuration for
//! the inbound-mail webhook receiver.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::Config;
pub use server::{create_router, start_server};
pub use state::{AppState, CookieSettings};
