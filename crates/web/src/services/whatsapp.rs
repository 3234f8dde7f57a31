//! WhatsApp deep links for the public booking, contact and medicine pages.
//!
//! Nothing is sent from the server. Each form composes a message and
//! redirects the visitor to `wa.me` with the text pre-filled.

use serde::Deserialize;

use crate::models::{AdminSettings, DoctorProfile, Medicine, ValidationError};

const WA_ME: &str = "https://wa.me";

/// Strip whitespace and a leading `+` so the number fits a `wa.me` path.
#[must_use]
pub fn normalize_number(number: &str) -> String {
    let compact: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    compact.strip_prefix('+').unwrap_or(&compact).to_string()
}

/// `https://wa.me/{number}?text={message}`
#[must_use]
pub fn deep_link(number: &str, message: &str) -> String {
    format!(
        "{WA_ME}/{}?text={}",
        normalize_number(number),
        urlencoding::encode(message)
    )
}

/// Pick the clinic's WhatsApp number: settings, then profile, then the fallback.
#[must_use]
pub fn clinic_number(
    settings: Option<&AdminSettings>,
    profile: Option<&DoctorProfile>,
    fallback: &str,
) -> String {
    let configured = |n: &Option<String>| {
        n.as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    };
    settings
        .and_then(|s| configured(&s.whatsapp_number))
        .or_else(|| profile.and_then(|p| configured(&p.whatsapp_number)))
        .unwrap_or_else(|| fallback.to_string())
}

/// Public booking form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub health_issue: String,
    #[serde(default)]
    pub consultation_type: String,
}

impl BookingForm {
    /// Every field except the consultation type is required.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] naming the first missing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("Name", &self.name),
            ("Age", &self.age),
            ("Gender", &self.gender),
            ("Phone", &self.phone),
            ("Health issue", &self.health_issue),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some(&(field, _)) => Err(ValidationError::Required(field)),
            None => Ok(()),
        }
    }

    fn consultation_label(&self) -> &'static str {
        if self.consultation_type == "phone" {
            "Phone Call"
        } else {
            "Online Video Call"
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "🏥 *New Consultation Request*\n\n\
             👤 *Patient Details:*\n\
             Name: {}\n\
             Age: {}\n\
             Gender: {}\n\
             Phone: {}\n\n\
             📋 *Health Issue:*\n\
             {}\n\n\
             📞 *Preferred Consultation:* {}\n\n\
             ---\n\
             Sent from Siddha Doctor Website",
            self.name.trim(),
            self.age.trim(),
            self.gender.trim(),
            self.phone.trim(),
            self.health_issue.trim(),
            self.consultation_label(),
        )
    }
}

/// Public contact form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    /// Name and message are required.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] naming the first missing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Required("Name"));
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::Required("Message"));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_message(&self) -> String {
        let or_missing = |s: &str| {
            let s = s.trim();
            if s.is_empty() {
                "Not provided".to_string()
            } else {
                s.to_string()
            }
        };
        format!(
            "📧 *Contact Form Message*\n\n\
             👤 *From:* {}\n\
             📧 *Email:* {}\n\
             📱 *Phone:* {}\n\n\
             💬 *Message:*\n\
             {}\n\n\
             ---\n\
             Sent from Contact Page",
            self.name.trim(),
            or_missing(&self.email),
            or_missing(&self.phone),
            self.message.trim(),
        )
    }
}

/// "Inquire" button on a medicine card.
#[must_use]
pub fn medicine_inquiry_message(medicine: &Medicine) -> String {
    format!(
        "Hello Doctor, I would like to know more about \"{}\" and its benefits.",
        medicine.name
    )
}

/// "Consult before buying" button on a medicine card.
#[must_use]
pub fn medicine_consult_message(medicine: &Medicine, settings: Option<&AdminSettings>) -> String {
    let closing = settings.map_or(
        crate::models::settings::DEFAULT_INQUIRY_TEMPLATE,
        AdminSettings::inquiry_template,
    );
    format!(
        "Hello Doctor, I am interested in \"{}\" (Price: {}). {closing}",
        medicine.name, medicine.price
    )
}
