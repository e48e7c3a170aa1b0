//! `tasklist` server library.
//!
//! Exposes the REST endpoint for use in tests and embedding. The server
//! keeps a single `tasks` collection and persists it to a flat JSON file.

pub mod api;
pub mod config;
pub mod store;
