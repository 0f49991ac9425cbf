//! Astra Bridge Service
//!
//! This library provides a Rust client for the Ad Astra scheduling API
//! and a web service for querying room availability and reserving rooms.
//! It bridges between the Outlook add-in and the Astra backend.
//!
//! # Modules
//!
//! - `client`: AstraClient for backend API operations
//! - `query`: read-query construction for the entity-query API
//! - `services`: the availability and reservation pipelines
//! - `handlers`: HTTP endpoint handlers
//!
//! # Authentication
//!
//! The backend uses cookie sessions established through `logon.ashx`. The
//! client keeps the session cookie in its cookie store and re-establishes
//! the session whenever a call answers 401.

pub mod client;
pub mod error;
pub mod handlers;
pub mod models;
pub mod query;
pub mod routes;
pub mod services;


// Re-export the main API types for ease of use
pub use client::AstraClient;
pub use error::{BridgeError, BridgeResult};
pub use handlers::api::AppState;
pub use routes::create_router;
