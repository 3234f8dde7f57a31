//! The doctor profile singleton.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use siddha_clinic_core::{Email, ProfileId};

use super::{ValidationError, null_as_default, optional_text, required_text};
use crate::components::singleton::SingletonRecord;
use crate::db::Record;

/// Name used when provisioning the profile.
pub const DEFAULT_NAME: &str = "Dr. Siddha Specialist";

/// Qualification used when provisioning the profile.
pub const DEFAULT_QUALIFICATION: &str = "BBMS";

/// Weekdays in display order.
pub const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Clinic hours used when provisioning the profile.
#[must_use]
pub fn default_timings() -> BTreeMap<String, String> {
    WEEKDAYS
        .iter()
        .map(|day| {
            let hours = match *day {
                "saturday" => "9:00 AM - 1:00 PM",
                "sunday" => "Closed",
                _ => "9:00 AM - 6:00 PM",
            };
            ((*day).to_string(), hours.to_string())
        })
        .collect()
}

/// The doctor's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: ProfileId,
    pub name: String,
    pub qualification: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub years_of_experience: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub clinic_address: Option<String>,
    /// Weekday (lowercase) to hours text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub clinic_timings: BTreeMap<String, String>,
}

impl DoctorProfile {
    /// Clinic hours in weekday order, falling back to the default schedule
    /// when none are stored.
    #[must_use]
    pub fn timings(&self) -> Vec<(String, String)> {
        weekly_schedule(&self.clinic_timings)
    }
}

/// `(Weekday, hours)` pairs in weekday order; an empty map means the
/// default schedule.
#[must_use]
pub fn weekly_schedule(timings: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let defaults = default_timings();
    let source = if timings.is_empty() { &defaults } else { timings };
    WEEKDAYS
        .iter()
        .map(|day| {
            let hours = source.get(*day).cloned().unwrap_or_else(|| "Closed".to_string());
            (capitalize(day), hours)
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl Record for DoctorProfile {
    const TABLE: &'static str = "doctor_profile";

    fn row_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl SingletonRecord for DoctorProfile {
    fn defaults() -> Value {
        json!({
            "name": DEFAULT_NAME,
            "qualification": DEFAULT_QUALIFICATION,
            "clinic_timings": default_timings(),
        })
    }
}

/// Profile form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub qualification: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub years_of_experience: String,
    /// Comma-separated.
    #[serde(default)]
    pub specializations: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default)]
    pub clinic_address: String,
    #[serde(default)]
    pub monday: String,
    #[serde(default)]
    pub tuesday: String,
    #[serde(default)]
    pub wednesday: String,
    #[serde(default)]
    pub thursday: String,
    #[serde(default)]
    pub friday: String,
    #[serde(default)]
    pub saturday: String,
    #[serde(default)]
    pub sunday: String,
    /// Set when the admin removes the photo instead of saving.
    #[serde(default, skip_serializing)]
    pub remove_photo: Option<String>,
}

impl ProfileForm {
    /// Prefill the form from the stored profile.
    #[must_use]
    pub fn from_profile(profile: &DoctorProfile) -> Self {
        let hours = |day: &str| {
            profile
                .clinic_timings
                .get(day)
                .cloned()
                .or_else(|| default_timings().get(day).cloned())
                .unwrap_or_default()
        };
        Self {
            name: profile.name.clone(),
            qualification: profile.qualification.clone(),
            photo_url: profile.photo_url.clone().unwrap_or_default(),
            about: profile.about.clone().unwrap_or_default(),
            years_of_experience: profile
                .years_of_experience
                .map(|y| y.to_string())
                .unwrap_or_default(),
            specializations: profile.specializations.join(", "),
            contact_phone: profile.contact_phone.clone().unwrap_or_default(),
            contact_email: profile.contact_email.clone().unwrap_or_default(),
            whatsapp_number: profile.whatsapp_number.clone().unwrap_or_default(),
            clinic_address: profile.clinic_address.clone().unwrap_or_default(),
            monday: hours("monday"),
            tuesday: hours("tuesday"),
            wednesday: hours("wednesday"),
            thursday: hours("thursday"),
            friday: hours("friday"),
            saturday: hours("saturday"),
            sunday: hours("sunday"),
            remove_photo: None,
        }
    }

    fn timings(&self) -> BTreeMap<String, String> {
        [
            ("monday", &self.monday),
            ("tuesday", &self.tuesday),
            ("wednesday", &self.wednesday),
            ("thursday", &self.thursday),
            ("friday", &self.friday),
            ("saturday", &self.saturday),
            ("sunday", &self.sunday),
        ]
        .into_iter()
        .map(|(day, hours)| {
            let hours = optional_text(hours).unwrap_or_else(|| "Closed".to_string());
            (day.to_string(), hours)
        })
        .collect()
    }

    /// Validate and build the profile patch.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the name is empty, the years of
    /// experience are not a non-negative integer, or the email is malformed.
    pub fn validate(&self) -> Result<Value, ValidationError> {
        let name = required_text(&self.name, "Name")?;
        let years = match optional_text(&self.years_of_experience) {
            Some(text) => Some(
                text.parse::<u16>()
                    .map_err(|_| ValidationError::Invalid {
                        field: "years of experience",
                        message: "must be a whole number".to_string(),
                    })?,
            ),
            None => None,
        };
        let contact_email = match optional_text(&self.contact_email) {
            Some(text) => Some(
                Email::parse(&text)
                    .map_err(|e| ValidationError::Invalid {
                        field: "contact email",
                        message: e.to_string(),
                    })?
                    .into_inner(),
            ),
            None => None,
        };
        let specializations: Vec<String> = self
            .specializations
            .split(',')
            .filter_map(optional_text)
            .collect();

        Ok(json!({
            "name": name,
            "qualification": self.qualification.trim(),
            "photo_url": optional_text(&self.photo_url),
            "about": optional_text(&self.about),
            "years_of_experience": years,
            "specializations": specializations,
            "contact_phone": optional_text(&self.contact_phone),
            "contact_email": contact_email,
            "whatsapp_number": optional_text(&self.whatsapp_number),
            "clinic_address": optional_text(&self.clinic_address),
            "clinic_timings": self.timings(),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_weekly_schedule() {
        let defaults = DoctorProfile::defaults();
        assert_eq!(defaults["name"], "Dr. Siddha Specialist");
        assert_eq!(defaults["qualification"], "BBMS");
        assert_eq!(defaults["clinic_timings"]["friday"], "9:00 AM - 6:00 PM");
        assert_eq!(defaults["clinic_timings"]["saturday"], "9:00 AM - 1:00 PM");
        assert_eq!(defaults["clinic_timings"]["sunday"], "Closed");
    }

    #[test]
    fn test_timings_in_weekday_order() {
        let profile: DoctorProfile = serde_json::from_value(json!({
            "id": "a7b6c5d4-e3f2-4a1b-8c9d-0e1f2a3b4c5d",
            "name": "Dr. Kumar",
            "qualification": "BSMS",
            "clinic_timings": null,
            "specializations": null
        }))
        .unwrap();
        let timings = profile.timings();
        assert_eq!(timings[0], ("Monday".to_string(), "9:00 AM - 6:00 PM".to_string()));
        assert_eq!(timings[6], ("Sunday".to_string(), "Closed".to_string()));
    }

    #[test]
    fn test_form_splits_specializations() {
        let form = ProfileForm {
            name: "Dr. Kumar".to_string(),
            specializations: "Varmam, Naadi ,, Thokkanam".to_string(),
            years_of_experience: "12".to_string(),
            ..ProfileForm::default()
        };
        let patch = form.validate().unwrap();
        assert_eq!(patch["specializations"], json!(["Varmam", "Naadi", "Thokkanam"]));
        assert_eq!(patch["years_of_experience"], 12);
        assert_eq!(patch["clinic_timings"]["monday"], "Closed");
    }

    #[test]
    fn test_form_rejects_bad_email() {
        let form = ProfileForm {
            name: "Dr. Kumar".to_string(),
            contact_email: "not-an-email".to_string(),
            ..ProfileForm::default()
        };
        assert!(matches!(
            form.validate(),
            Err(ValidationError::Invalid { field: "contact email", .. })
        ));
    }
}
