//! Medicine inquiries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use siddha_clinic_core::{InquiryId, InquiryStatus, MedicineId};

use crate::components::crud::Searchable;
use crate::db::Record;

/// A customer's question about a catalog medicine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: InquiryId,
    #[serde(default)]
    pub medicine_id: Option<MedicineId>,
    pub medicine_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub inquiry_date: DateTime<Utc>,
    #[serde(default)]
    pub status: InquiryStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Inquiry {
    const TABLE: &'static str = "medicine_inquiries";

    fn row_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl Searchable for Inquiry {
    fn haystack(&self) -> Vec<&str> {
        let mut fields = vec![self.customer_phone.as_str(), self.medicine_name.as_str()];
        if let Some(name) = &self.customer_name {
            fields.push(name);
        }
        fields
    }

    fn status_text(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}
