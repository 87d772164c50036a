//! Middleware components for the mailspool API.

pub mod auth;
