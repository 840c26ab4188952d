//! REST API client module for the NextFare backend.
//!
//! This module provides the `ApiClient` for fetching profile and event
//! data. The backend uses JWT bearer token authentication; the pipeline
//! in `client` attaches the current token to every request and refreshes
//! it transparently when the backend rejects one.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
