//! Medicine catalog rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use siddha_clinic_core::{MedicineId, Price, PriceError, StockStatus};

use super::{ValidationError, checkbox, null_as_default, optional_text, required_text};
use crate::components::crud::Searchable;
use crate::db::Record;

/// Category preselected for new medicines.
pub const DEFAULT_CATEGORY: &str = "Tablet";

/// Categories offered by the admin form.
pub const CATEGORIES: &[&str] = &["Tablet", "Syrup", "Powder", "Oil", "Capsule", "Lehyam", "Other"];

/// A medicine in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub category: String,
    pub price: Price,
    #[serde(default)]
    pub stock_status: StockStatus,
    /// Ordered image URLs; the first is the cover.
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Comma-joined list of conditions.
    #[serde(default)]
    pub used_for: Option<String>,
    #[serde(default)]
    pub dosage_notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Medicine {
    /// Individual "used for" tags.
    #[must_use]
    pub fn used_for_tags(&self) -> Vec<&str> {
        self.used_for
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    }

    /// Cover image, if any.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

impl Record for Medicine {
    const TABLE: &'static str = "medicines";

    fn row_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl Searchable for Medicine {
    fn haystack(&self) -> Vec<&str> {
        vec![&self.name, &self.category]
    }
}

/// Medicine form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub stock_status: String,
    /// Newline-separated image URLs.
    #[serde(default)]
    pub images: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub used_for: String,
    #[serde(default)]
    pub dosage_notes: String,
    #[serde(default)]
    pub is_active: Option<String>,
    /// Gallery URL to drop from the form instead of saving.
    #[serde(default, skip_serializing)]
    pub remove_image: Option<String>,
}

impl Default for MedicineDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            price: String::new(),
            stock_status: StockStatus::Available.to_string(),
            images: String::new(),
            description: String::new(),
            used_for: String::new(),
            dosage_notes: String::new(),
            is_active: Some("on".to_string()),
            remove_image: None,
        }
    }
}

impl MedicineDraft {
    /// Prefill the form from an existing row.
    #[must_use]
    pub fn from_medicine(medicine: &Medicine) -> Self {
        Self {
            name: medicine.name.clone(),
            category: medicine.category.clone(),
            price: medicine.price.amount().to_string(),
            stock_status: medicine.stock_status.to_string(),
            images: medicine.images.join("\n"),
            description: medicine.description.clone().unwrap_or_default(),
            used_for: medicine.used_for.clone().unwrap_or_default(),
            dosage_notes: medicine.dosage_notes.clone().unwrap_or_default(),
            is_active: medicine.is_active.then(|| "on".to_string()),
            remove_image: None,
        }
    }

    /// Image URLs in form order.
    #[must_use]
    pub fn image_list(&self) -> Vec<String> {
        self.images
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }

    /// Validate and build the row sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the name is empty or the price is
    /// missing, malformed or not greater than zero.
    pub fn validate(&self) -> Result<Value, ValidationError> {
        let name = required_text(&self.name, "Name")?;
        let price_text = required_text(&self.price, "Price")?;
        let price = Price::parse(&price_text).map_err(|e| match e {
            PriceError::Negative => ValidationError::NonPositivePrice,
            other => ValidationError::Invalid {
                field: "price",
                message: other.to_string(),
            },
        })?;
        if !price.is_positive() {
            return Err(ValidationError::NonPositivePrice);
        }

        let category = optional_text(&self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let stock_status: StockStatus = optional_text(&self.stock_status)
            .map(StockStatus::from)
            .unwrap_or_default();

        Ok(json!({
            "name": name,
            "category": category,
            "price": price,
            "stock_status": stock_status,
            "images": self.image_list(),
            "description": optional_text(&self.description),
            "used_for": optional_text(&self.used_for),
            "dosage_notes": optional_text(&self.dosage_notes),
            "is_active": checkbox(self.is_active.as_deref()),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(name: &str, price: &str) -> MedicineDraft {
        MedicineDraft {
            name: name.to_string(),
            price: price.to_string(),
            ..MedicineDraft::default()
        }
    }

    #[test]
    fn test_validate_builds_row_with_defaults() {
        let row = draft("Nilavembu Kudineer", "120").validate().unwrap();
        assert_eq!(row["name"], "Nilavembu Kudineer");
        assert_eq!(row["category"], "Tablet");
        assert_eq!(row["stock_status"], "Available");
        assert_eq!(row["is_active"], true);
        assert_eq!(row["description"], Value::Null);
    }

    #[test]
    fn test_validate_requires_name() {
        assert_eq!(
            draft("  ", "120").validate(),
            Err(ValidationError::Required("Name"))
        );
    }

    #[test]
    fn test_validate_rejects_zero_and_negative_price() {
        assert_eq!(
            draft("Tonic", "0").validate(),
            Err(ValidationError::NonPositivePrice)
        );
        assert_eq!(
            draft("Tonic", "-5").validate(),
            Err(ValidationError::NonPositivePrice)
        );
        assert!(matches!(
            draft("Tonic", "abc").validate(),
            Err(ValidationError::Invalid { field: "price", .. })
        ));
    }

    #[test]
    fn test_image_list_skips_blank_lines() {
        let draft = MedicineDraft {
            images: "https://a/1.png\n\n  https://a/2.png  \n".to_string(),
            ..MedicineDraft::default()
        };
        assert_eq!(draft.image_list(), vec!["https://a/1.png", "https://a/2.png"]);
    }

    #[test]
    fn test_deserialize_backend_row() {
        let medicine: Medicine = serde_json::from_value(json!({
            "id": "6f1c2a9e-3b4d-4e5f-8a7b-1c2d3e4f5a6b",
            "name": "Pain Relief Tonic",
            "category": "Syrup",
            "price": 250,
            "stock_status": "Limited",
            "images": null,
            "description": null,
            "used_for": "joint pain, back pain ,",
            "dosage_notes": null,
            "is_active": true,
            "created_at": "2026-03-01T10:00:00.123456+00:00"
        }))
        .unwrap();
        assert!(medicine.images.is_empty());
        assert_eq!(medicine.stock_status, StockStatus::Limited);
        assert_eq!(medicine.used_for_tags(), vec!["joint pain", "back pain"]);
        assert_eq!(medicine.price.to_string(), "₹250");
    }
}
