//! Siddha clinic website and admin back-office.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for server-side rendering
//! - A hosted Supabase project owns all data, identity and image storage
//! - Row-level policies on the backend decide what each caller may see
//! - Public pages hand bookings and inquiries off to WhatsApp deep links
//!
//! The binary in `main.rs` wires configuration, tracing and Sentry around
//! [`routes::app`]. The library is also used by the CLI and the
//! integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod components;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod supabase;
