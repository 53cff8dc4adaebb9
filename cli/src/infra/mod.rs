//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: droplet store backends,
//! the receptor client, archiving, and config file access.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod blob_store;
pub mod clock;
pub mod config;
pub mod proxyconf;
pub mod receptor;
pub mod verifier;
pub mod zipper;
