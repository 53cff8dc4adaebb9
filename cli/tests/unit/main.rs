//! Unit tests for the droplet CLI
//!
//! These tests use in-memory collaborators or local mock HTTP servers and run
//! without a cluster.

mod architecture;
mod http_adapters;
mod mocks;
mod poll_service;
