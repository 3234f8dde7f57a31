//! Public website route handlers.
//!
//! Every read here is anonymous; row-level policies on the backend only
//! expose active medicines, enabled services and the singleton rows.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{CatalogRepository, ContentRepository, RepositoryError};
use crate::filters;
use crate::models::profile::{DEFAULT_NAME, weekly_schedule};
use crate::models::{AdminSettings, DoctorProfile, Medicine, SeoBlock, Service};
use crate::services::whatsapp::{medicine_consult_message, medicine_inquiry_message};
use crate::services::{BookingForm, ContactForm, clinic_number, deep_link};
use crate::state::AppState;
use crate::supabase::Caller;

/// Shown when the profile has no qualification.
const DEFAULT_QUALIFICATION: &str = "BSMS - Bachelor of Siddha Medicine & Surgery";
const DEFAULT_PHONE: &str = "+91 95007 69849";
const DEFAULT_EMAIL: &str = "ramsiddha95@gmail.com";
const DEFAULT_ADDRESS: &str = "135, Aariyur Street Road, opp. Murugan Hotel, Pethanaicken Palayam, Olaipadi, Salem, Tamil Nadu 636109";
const DEFAULT_YEARS: i32 = 6;

// =============================================================================
// Site Context
// =============================================================================

/// Clinic details every public page shows: header, footer and the floating
/// WhatsApp button.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub settings: Option<AdminSettings>,
    pub profile: Option<DoctorProfile>,
    /// WhatsApp number used for every deep link.
    pub number: String,
}

impl SiteContext {
    /// Read settings and profile. Failures fall back to the built-in details.
    pub async fn load(state: &AppState) -> Self {
        let caller = Caller::Anonymous;
        let catalog = CatalogRepository::new(state.tables(), &caller);
        let settings = catalog.settings().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read site settings");
            None
        });
        let profile = catalog.profile().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read doctor profile");
            None
        });
        let number = clinic_number(
            settings.as_ref(),
            profile.as_ref(),
            &state.config().default_whatsapp,
        );
        Self {
            settings,
            profile,
            number,
        }
    }

    /// General "chat with the doctor" link.
    #[must_use]
    pub fn whatsapp_url(&self) -> String {
        let message = self.settings.as_ref().map_or(
            crate::models::settings::DEFAULT_CONSULTATION_TEMPLATE,
            AdminSettings::consultation_template,
        );
        deep_link(&self.number, message)
    }

    #[must_use]
    pub fn doctor_name(&self) -> &str {
        self.profile
            .as_ref()
            .map_or(DEFAULT_NAME, |p| p.name.as_str())
    }

    #[must_use]
    pub fn qualification(&self) -> &str {
        self.profile
            .as_ref()
            .map(|p| p.qualification.as_str())
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(DEFAULT_QUALIFICATION)
    }

    #[must_use]
    pub fn years_of_experience(&self) -> i32 {
        self.profile
            .as_ref()
            .and_then(|p| p.years_of_experience)
            .unwrap_or(DEFAULT_YEARS)
    }

    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.photo_url.as_deref())
    }

    #[must_use]
    pub fn about(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.about.as_deref())
    }

    #[must_use]
    pub fn specializations(&self) -> &[String] {
        self.profile
            .as_ref()
            .map(|p| p.specializations.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn phone(&self) -> &str {
        self.profile_text(|p| p.contact_phone.as_deref())
            .unwrap_or(DEFAULT_PHONE)
    }

    #[must_use]
    pub fn email(&self) -> &str {
        self.profile_text(|p| p.contact_email.as_deref())
            .unwrap_or(DEFAULT_EMAIL)
    }

    #[must_use]
    pub fn address(&self) -> &str {
        self.profile_text(|p| p.clinic_address.as_deref())
            .unwrap_or(DEFAULT_ADDRESS)
    }

    /// `tel:` target for the phone number.
    #[must_use]
    pub fn phone_href(&self) -> String {
        self.phone().chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Clinic hours in weekday order.
    #[must_use]
    pub fn timings(&self) -> Vec<(String, String)> {
        self.profile
            .as_ref()
            .map_or_else(|| weekly_schedule(&BTreeMap::new()), DoctorProfile::timings)
    }

    /// Whether the medicine catalog is shown.
    #[must_use]
    pub fn selling_enabled(&self) -> bool {
        self.settings
            .as_ref()
            .is_none_or(|s| s.medicine_selling_enabled)
    }

    fn profile_text<'a>(
        &'a self,
        field: impl Fn(&'a DoctorProfile) -> Option<&'a str>,
    ) -> Option<&'a str> {
        self.profile
            .as_ref()
            .and_then(field)
            .filter(|text| !text.trim().is_empty())
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub site: SiteContext,
    pub services: Vec<Service>,
    pub seo: SeoBlock,
}

#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub site: SiteContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "services.html")]
pub struct ServicesTemplate {
    pub site: SiteContext,
    pub services: Vec<Service>,
    pub load_error: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "medicines.html")]
pub struct MedicinesTemplate {
    pub site: SiteContext,
    pub medicines: Vec<Medicine>,
    pub load_error: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "book.html")]
pub struct BookTemplate {
    pub site: SiteContext,
    pub form: BookingForm,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub site: SiteContext,
    pub form: ContactForm,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate;

// =============================================================================
// Handlers
// =============================================================================

/// Home page: doctor summary, services and SEO copy.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let site = SiteContext::load(&state).await;
    let services = CatalogRepository::new(state.tables(), &Caller::Anonymous)
        .enabled_services()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not load services");
            Vec::new()
        });
    let seo = ContentRepository::new(state.tables(), &Caller::Anonymous)
        .seo()
        .await
        .ok()
        .flatten()
        .filter(|content| content.is_enabled)
        .map(|content| SeoBlock::from_content(&content))
        .unwrap_or_default();

    HomeTemplate {
        site,
        services,
        seo,
    }
}

#[instrument(skip_all)]
pub async fn about(State(state): State<AppState>) -> impl IntoResponse {
    AboutTemplate {
        site: SiteContext::load(&state).await,
    }
}

#[instrument(skip_all)]
pub async fn services(State(state): State<AppState>) -> impl IntoResponse {
    let site = SiteContext::load(&state).await;
    let (services, load_error) = match CatalogRepository::new(state.tables(), &Caller::Anonymous)
        .enabled_services()
        .await
    {
        Ok(services) => (services, false),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load services");
            (Vec::new(), true)
        }
    };

    ServicesTemplate {
        site,
        services,
        load_error,
    }
}

/// Active medicines, newest first, unless selling is switched off.
#[instrument(skip_all)]
pub async fn medicines(State(state): State<AppState>) -> impl IntoResponse {
    let site = SiteContext::load(&state).await;
    if !site.selling_enabled() {
        return MedicinesTemplate {
            site,
            medicines: Vec::new(),
            load_error: false,
        };
    }

    let (medicines, load_error) = match CatalogRepository::new(state.tables(), &Caller::Anonymous)
        .active_medicines()
        .await
    {
        Ok(medicines) => (medicines, false),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load medicines");
            (Vec::new(), true)
        }
    };

    MedicinesTemplate {
        site,
        medicines,
        load_error,
    }
}

/// Which pre-filled message a medicine button sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MedicineAction {
    Inquire,
    Consult,
}

async fn medicine_redirect(state: &AppState, id: Uuid, action: MedicineAction) -> Response {
    let site = SiteContext::load(state).await;
    if !site.selling_enabled() {
        return Redirect::to("/medicines").into_response();
    }

    match CatalogRepository::new(state.tables(), &Caller::Anonymous)
        .active_medicine(id)
        .await
    {
        Ok(medicine) => {
            let message = match action {
                MedicineAction::Inquire => medicine_inquiry_message(&medicine),
                MedicineAction::Consult => {
                    medicine_consult_message(&medicine, site.settings.as_ref())
                }
            };
            Redirect::to(&deep_link(&site.number, &message)).into_response()
        }
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, NotFoundTemplate).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, %id, "Failed to load medicine");
            Redirect::to("/medicines").into_response()
        }
    }
}

/// "Inquire" button: WhatsApp with a question about the medicine.
#[instrument(skip_all, fields(%id))]
pub async fn inquire(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    medicine_redirect(&state, id, MedicineAction::Inquire).await
}

/// "Consult before buying" button: WhatsApp with price and the inquiry note.
#[instrument(skip_all, fields(%id))]
pub async fn consult(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    medicine_redirect(&state, id, MedicineAction::Consult).await
}

#[instrument(skip_all)]
pub async fn book_page(State(state): State<AppState>) -> impl IntoResponse {
    BookTemplate {
        site: SiteContext::load(&state).await,
        form: BookingForm {
            consultation_type: "online".to_string(),
            ..BookingForm::default()
        },
        error: None,
    }
}

/// Validate the booking and hand it to WhatsApp. Nothing is stored.
#[instrument(skip_all)]
pub async fn book(State(state): State<AppState>, Form(form): Form<BookingForm>) -> Response {
    let site = SiteContext::load(&state).await;
    match form.validate() {
        Ok(()) => Redirect::to(&deep_link(&site.number, &form.message())).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            BookTemplate {
                site,
                form,
                error: Some(e.to_string()),
            },
        )
            .into_response(),
    }
}

#[instrument(skip_all)]
pub async fn contact_page(State(state): State<AppState>) -> impl IntoResponse {
    ContactTemplate {
        site: SiteContext::load(&state).await,
        form: ContactForm::default(),
        error: None,
    }
}

#[instrument(skip_all)]
pub async fn contact(State(state): State<AppState>, Form(form): Form<ContactForm>) -> Response {
    let site = SiteContext::load(&state).await;
    match form.validate() {
        Ok(()) => Redirect::to(&deep_link(&site.number, &form.to_message())).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            ContactTemplate {
                site,
                form,
                error: Some(e.to_string()),
            },
        )
            .into_response(),
    }
}

/// Fallback for unknown paths.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn site(settings: Option<serde_json::Value>, profile: Option<serde_json::Value>) -> SiteContext {
        let settings: Option<AdminSettings> = settings.map(|v| serde_json::from_value(v).unwrap());
        let profile: Option<DoctorProfile> = profile.map(|v| serde_json::from_value(v).unwrap());
        let number = clinic_number(settings.as_ref(), profile.as_ref(), "919500769849");
        SiteContext {
            settings,
            profile,
            number,
        }
    }

    #[test]
    fn test_defaults_without_rows() {
        let site = site(None, None);
        assert_eq!(site.doctor_name(), DEFAULT_NAME);
        assert_eq!(site.email(), DEFAULT_EMAIL);
        assert_eq!(site.phone_href(), "+919500769849");
        assert!(site.selling_enabled());
        assert_eq!(site.timings().len(), 7);
        assert!(site.whatsapp_url().starts_with("https://wa.me/919500769849?text="));
    }

    #[test]
    fn test_blank_profile_fields_fall_back() {
        let site = site(
            None,
            Some(json!({
                "id": "a7b6c5d4-e3f2-4a1b-8c9d-0e1f2a3b4c5d",
                "name": "Dr. Kumar",
                "qualification": " ",
                "contact_email": "",
                "whatsapp_number": "+91 98400 12345"
            })),
        );
        assert_eq!(site.doctor_name(), "Dr. Kumar");
        assert_eq!(site.qualification(), DEFAULT_QUALIFICATION);
        assert_eq!(site.email(), DEFAULT_EMAIL);
        assert_eq!(site.number, "+91 98400 12345");
        assert!(site.whatsapp_url().starts_with("https://wa.me/919840012345?text="));
    }

    #[test]
    fn test_selling_switch() {
        let site = site(
            Some(json!({
                "id": "3c2b1a09-8f7e-4d6c-9b5a-4f3e2d1c0b9a",
                "medicine_selling_enabled": false
            })),
            None,
        );
        assert!(!site.selling_enabled());
    }
}
