//! Siddha Clinic Core - Shared domain types.
//!
//! This crate provides the types used across all Siddha Clinic components:
//! - `web` - Public website and admin back-office
//! - `cli` - Out-of-band administration (role grants, seeding)
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no knowledge of the hosted backend. Rows fetched from the backend
//! are decoded into these types by the `web` crate's repositories.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, passwords, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
