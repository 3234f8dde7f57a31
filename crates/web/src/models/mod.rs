//! Domain models for clinic records.
//!
//! Each record mirrors one backend table. Drafts carry raw form input and
//! validate into a JSON row or patch before anything is sent remotely.

pub mod consultation;
pub mod content;
pub mod inquiry;
pub mod medicine;
pub mod profile;
pub mod service;
pub mod session;
pub mod settings;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub use consultation::Consultation;
pub use content::{SEO_SECTION_KEY, SeoBlock, WebsiteContent};
pub use inquiry::Inquiry;
pub use medicine::{Medicine, MedicineDraft};
pub use profile::{DoctorProfile, ProfileForm};
pub use service::{Service, ServiceDraft};
pub use session::{SessionIdentity, keys as session_keys};
pub use settings::{AdminSettings, SettingsForm};

/// Input rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("{0} is required")]
    Required(&'static str),

    /// Price is zero.
    #[error("Price must be greater than zero")]
    NonPositivePrice,

    /// A field could not be parsed.
    #[error("Invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Trim a form field, mapping blank input to `None`.
pub(crate) fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trim a required form field.
pub(crate) fn required_text(value: &str, field: &'static str) -> Result<String, ValidationError> {
    optional_text(value).ok_or(ValidationError::Required(field))
}

/// Interpret an HTML checkbox value.
pub(crate) fn checkbox(value: Option<&str>) -> bool {
    matches!(value, Some("on" | "true" | "1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_text_blank_is_none() {
        assert_eq!(optional_text("   "), None);
        assert_eq!(optional_text(" Kabasura "), Some("Kabasura".to_string()));
    }

    #[test]
    fn test_required_text_reports_field() {
        assert_eq!(
            required_text("", "Name"),
            Err(ValidationError::Required("Name"))
        );
        assert_eq!(
            ValidationError::Required("Name").to_string(),
            "Name is required"
        );
    }

    #[test]
    fn test_checkbox_values() {
        assert!(checkbox(Some("on")));
        assert!(checkbox(Some("true")));
        assert!(!checkbox(Some("off")));
        assert!(!checkbox(None));
    }
}
