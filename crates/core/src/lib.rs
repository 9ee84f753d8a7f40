//! Délé Dzina Core - Shared domain types.
//!
//! This crate provides the common types used by the storefront server:
//! validated emails, URL slugs, prices, order identifiers and the order
//! status enum.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and allows it to be
//! used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
