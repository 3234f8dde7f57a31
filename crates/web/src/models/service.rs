//! Services offered by the clinic.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use siddha_clinic_core::ServiceId;

use super::{ValidationError, checkbox, optional_text, required_text};
use crate::components::crud::Searchable;
use crate::db::Record;

/// Icon preselected for new services.
pub const DEFAULT_ICON: &str = "Stethoscope";

/// Icons offered by the admin form.
pub const ICONS: &[&str] = &["Stethoscope", "Leaf", "Heart", "Activity", "Pill", "Sun", "Sparkles"];

/// A service listed on the public site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub icon: String,
    pub is_enabled: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl Record for Service {
    const TABLE: &'static str = "services";

    fn row_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl Searchable for Service {
    fn haystack(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        if let Some(description) = &self.description {
            fields.push(description);
        }
        fields
    }
}

/// Service form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub sort_order: String,
    #[serde(default)]
    pub is_enabled: Option<String>,
}

impl Default for ServiceDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            icon: DEFAULT_ICON.to_string(),
            sort_order: "0".to_string(),
            is_enabled: Some("on".to_string()),
        }
    }
}

impl ServiceDraft {
    /// Validate and build the row sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the title is empty or the sort
    /// order is not an integer.
    pub fn validate(&self) -> Result<Value, ValidationError> {
        let title = required_text(&self.title, "Title")?;
        let sort_order = match optional_text(&self.sort_order) {
            Some(text) => text.parse::<i32>().map_err(|_| ValidationError::Invalid {
                field: "sort order",
                message: "must be a whole number".to_string(),
            })?,
            None => 0,
        };
        let icon = optional_text(&self.icon).unwrap_or_else(|| DEFAULT_ICON.to_string());

        Ok(json!({
            "title": title,
            "description": optional_text(&self.description),
            "icon": icon,
            "sort_order": sort_order,
            "is_enabled": checkbox(self.is_enabled.as_deref()),
        }))
    }
}
