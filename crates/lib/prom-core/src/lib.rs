//! Core types and services for the Prometheus MCP adapter.
//!
//! This crate owns the wire-level data model for query results and scrape
//! targets, the pagination/filter engine shared by every listing tool, the
//! opt-in compact encodings, and the HTTP client adapter plus the service
//! layer that the MCP tool handlers call into.

pub mod backend;
pub mod client;
pub mod compact;
pub mod model;
pub mod page;
pub mod service;
