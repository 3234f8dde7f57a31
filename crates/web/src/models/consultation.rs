//! Consultation requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use siddha_clinic_core::{ConsultationId, ConsultationStatus};

use crate::components::crud::Searchable;
use crate::db::Record;

/// A patient's request for a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: ConsultationId,
    pub patient_name: String,
    pub patient_phone: String,
    #[serde(default)]
    pub patient_age: Option<i32>,
    #[serde(default)]
    pub patient_gender: Option<String>,
    pub health_issue: String,
    #[serde(default)]
    pub consultation_type: Option<String>,
    #[serde(default)]
    pub status: ConsultationStatus,
    /// Private to the doctor; never shown publicly.
    #[serde(default)]
    pub doctor_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Consultation {
    /// Human label for the requested consultation type.
    #[must_use]
    pub fn type_label(&self) -> &str {
        match self.consultation_type.as_deref() {
            Some("online") => "Online Video Call",
            Some("phone") => "Phone Call",
            Some(other) => other,
            None => "-",
        }
    }
}

impl Record for Consultation {
    const TABLE: &'static str = "consultation_requests";

    fn row_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl Searchable for Consultation {
    fn haystack(&self) -> Vec<&str> {
        vec![&self.patient_name, &self.patient_phone, &self.health_issue]
    }

    fn status_text(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unknown_status_survives_roundtrip() {
        let row = json!({
            "id": "0b5f6c1e-2d3a-4b5c-9d8e-7f6a5b4c3d2e",
            "patient_name": "Meena",
            "patient_phone": "9876543210",
            "patient_age": 42,
            "health_issue": "Migraine",
            "status": "Rescheduled",
            "created_at": "2026-04-02T08:30:00Z"
        });
        let consultation: Consultation = serde_json::from_value(row).unwrap();
        assert_eq!(
            consultation.status,
            ConsultationStatus::Other("Rescheduled".to_string())
        );
        assert_eq!(serde_json::to_value(&consultation).unwrap()["status"], "Rescheduled");
        assert_eq!(consultation.type_label(), "-");
    }
}
