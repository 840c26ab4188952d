//! Data models for NextFare entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `User`, `LastLocation`: the backend profile
//! - `CreateUserRequest`, `UpdateLocationRequest`: profile mutations
//! - `Event`, `GeoSearchRequest`: map events and geographic queries

pub mod event;
pub mod user;

pub use event::{Event, GeoSearchRequest};
pub use user::{CreateUserRequest, LastLocation, UpdateLocationRequest, User};
