//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Session-backed admin gate over the identity service
//! - `upload` - Image uploads to the public storage bucket
//! - `whatsapp` - Deep links for the booking, contact and medicine pages

pub mod auth;
pub mod upload;
pub mod whatsapp;

pub use auth::{AuthError, AuthGate, AuthSnapshot, GateOutcome, SignInOutcome, decide};
pub use upload::{ImageField, ImageUploader, UploadError, UploadFile, UploadOutcome};
pub use whatsapp::{BookingForm, ContactForm, clinic_number, deep_link};
