//! Site-wide admin settings singleton.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use siddha_clinic_core::SettingsId;

use super::{checkbox, optional_text};
use crate::components::singleton::SingletonRecord;
use crate::db::Record;

/// Default text for the general WhatsApp button.
pub const DEFAULT_CONSULTATION_TEMPLATE: &str = "Hello Doctor, I would like to consult you.";

/// Default closing line for medicine consult links.
pub const DEFAULT_INQUIRY_TEMPLATE: &str = "I want to consult before purchasing this medicine.";

/// Site-wide settings managed from the back-office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AdminSettings {
    pub id: SettingsId,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub consultation_message_template: Option<String>,
    #[serde(default)]
    pub medicine_inquiry_template: Option<String>,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default = "on")]
    pub medicine_selling_enabled: bool,
    #[serde(default = "on")]
    pub email_notifications: bool,
    #[serde(default)]
    pub sms_notifications: bool,
    #[serde(default = "on")]
    pub new_consultation_notification: bool,
    #[serde(default = "on")]
    pub new_inquiry_notification: bool,
}

const fn on() -> bool {
    true
}

impl AdminSettings {
    /// Message for the general WhatsApp button.
    #[must_use]
    pub fn consultation_template(&self) -> &str {
        self.consultation_message_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_CONSULTATION_TEMPLATE)
    }

    /// Closing line for medicine consult messages.
    #[must_use]
    pub fn inquiry_template(&self) -> &str {
        self.medicine_inquiry_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_INQUIRY_TEMPLATE)
    }
}

impl Record for AdminSettings {
    const TABLE: &'static str = "admin_settings";

    fn row_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl SingletonRecord for AdminSettings {
    fn defaults() -> Value {
        json!({
            "whatsapp_number": "",
            "consultation_message_template": DEFAULT_CONSULTATION_TEMPLATE,
            "medicine_inquiry_template": DEFAULT_INQUIRY_TEMPLATE,
            "maintenance_mode": false,
            "medicine_selling_enabled": true,
            "email_notifications": true,
            "sms_notifications": false,
            "new_consultation_notification": true,
            "new_inquiry_notification": true,
        })
    }
}

/// Settings form input. Unchecked boxes are absent from the form body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default)]
    pub consultation_message_template: String,
    #[serde(default)]
    pub medicine_inquiry_template: String,
    #[serde(default)]
    pub maintenance_mode: Option<String>,
    #[serde(default)]
    pub medicine_selling_enabled: Option<String>,
    #[serde(default)]
    pub email_notifications: Option<String>,
    #[serde(default)]
    pub sms_notifications: Option<String>,
    #[serde(default)]
    pub new_consultation_notification: Option<String>,
    #[serde(default)]
    pub new_inquiry_notification: Option<String>,
}

impl SettingsForm {
    /// Patch for the stored settings row.
    #[must_use]
    pub fn to_patch(&self) -> Value {
        json!({
            "whatsapp_number": optional_text(&self.whatsapp_number),
            "consultation_message_template": optional_text(&self.consultation_message_template),
            "medicine_inquiry_template": optional_text(&self.medicine_inquiry_template),
            "maintenance_mode": checkbox(self.maintenance_mode.as_deref()),
            "medicine_selling_enabled": checkbox(self.medicine_selling_enabled.as_deref()),
            "email_notifications": checkbox(self.email_notifications.as_deref()),
            "sms_notifications": checkbox(self.sms_notifications.as_deref()),
            "new_consultation_notification": checkbox(self.new_consultation_notification.as_deref()),
            "new_inquiry_notification": checkbox(self.new_inquiry_notification.as_deref()),
        })
    }
}
