//! Website content: the services list and the SEO block.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use super::{AdminPage, ConfirmForm, audit, back_to, failure_toast, loaded_screen, settle};
use crate::components::{Confirmation, CrudError, InsertAt, Toast, load_screen, push_flash, save_screen};
use crate::db::{ContentRepository, Table};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::service::ICONS;
use crate::models::{SeoBlock, Service, ServiceDraft, ValidationError};
use crate::state::AppState;
use crate::supabase;

const PATH: &str = "/admin/content";

/// Services and SEO template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/content.html")]
pub struct ContentTemplate {
    pub page: AdminPage,
    pub services: Vec<Service>,
    pub new_service: ServiceDraft,
    pub seo: SeoBlock,
    pub icons: &'static [&'static str],
    pub loaded: bool,
}

fn list_query() -> supabase::Query {
    supabase::Query::new()
        .order_asc("sort_order")
        .order_asc("created_at")
}

/// A missing title gets its own message; other problems use the generic one.
fn service_failure(err: &CrudError) -> Toast {
    match err {
        CrudError::Validation(ValidationError::Required("Title")) => {
            Toast::error("Please enter a service title.")
        }
        other => failure_toast(other, "Failed to save service."),
    }
}

/// Services in sort order plus the SEO form.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Service>::new(state.tables(), &caller);
    let mut screen = load_screen::<Service>(&session).await;

    let services_loaded = screen.mount(&table, &list_query()).await;
    save_screen(&session, &screen).await;

    let seo = ContentRepository::new(state.tables(), &caller).seo().await;

    let toast = match (&services_loaded, &seo) {
        (Ok(()), Ok(_)) => None,
        (Err(e), _) => {
            tracing::error!(error = %e, "Failed to load services");
            Some(Toast::error("Failed to load content."))
        }
        (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to load SEO block");
            Some(Toast::error("Failed to load content."))
        }
    };

    ContentTemplate {
        page: AdminPage::new(&admin, &session, PATH).await.with_toast(toast),
        services: screen.rows().to_vec(),
        new_service: ServiceDraft::default(),
        seo: seo
            .ok()
            .flatten()
            .map(|content| SeoBlock::from_content(&content))
            .unwrap_or_default(),
        icons: ICONS,
        loaded: screen.is_loaded(),
    }
    .into_response()
}

/// Save the SEO title and meta description.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn save_seo(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(block): Form<SeoBlock>,
) -> Response {
    let caller = admin.caller();
    match ContentRepository::new(state.tables(), &caller)
        .save_seo(&block)
        .await
    {
        Ok(saved) => {
            push_flash(
                &session,
                Toast::success("SEO Settings Saved", "Your SEO settings have been updated."),
            )
            .await;
            audit("SEO block saved", saved.id.as_uuid());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save SEO block");
            push_flash(&session, Toast::error("Failed to save SEO settings.")).await;
        }
    }
    back_to(PATH)
}

/// Append a service.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn create_service(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(draft): Form<ServiceDraft>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Service>::new(state.tables(), &caller);
    let mut screen = load_screen::<Service>(&session).await;

    let result = match draft.validate() {
        Ok(row) => screen.create(&table, &row, InsertAt::Back).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(created) => {
            if screen.is_loaded() {
                screen.mark_fresh();
            }
            save_screen(&session, &screen).await;
            push_flash(
                &session,
                Toast::success("Service Added", format!("{} has been added.", created.title)),
            )
            .await;
            audit("Service added", created.id.as_uuid());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to add service");
            push_flash(&session, service_failure(&e)).await;
        }
    }
    back_to(PATH)
}

/// Save changes to a service.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn update_service(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(draft): Form<ServiceDraft>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Service>::new(state.tables(), &caller);
    let mut screen = load_screen::<Service>(&session).await;

    let result = match draft.validate() {
        Ok(patch) => screen.update(&table, id, &patch).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => {
            if screen.is_loaded() {
                screen.mark_fresh();
            }
            save_screen(&session, &screen).await;
            push_flash(
                &session,
                Toast::success("Service Updated", format!("{} has been updated.", draft.title.trim())),
            )
            .await;
            audit("Service updated", id);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update service");
            push_flash(&session, service_failure(&e)).await;
        }
    }
    back_to(PATH)
}

/// Show or hide a service on the public site.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn toggle_service(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Service>::new(state.tables(), &caller);
    let mut screen = loaded_screen(&session, &table, &list_query()).await;

    let result = screen.toggle(&table, id, "is_enabled").await;

    if let Some(enabled) = settle(
        &session,
        &mut screen,
        result,
        |enabled| {
            if *enabled {
                Toast::success("Service Enabled", "The service is now shown on the website.")
            } else {
                Toast::success("Service Disabled", "The service is now hidden on the website.")
            }
        },
        "Failed to save service.",
    )
    .await
    {
        audit(if enabled { "Service enabled" } else { "Service disabled" }, id);
    }
    back_to(PATH)
}

/// Delete a service once confirmed.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn delete_service(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Service>::new(state.tables(), &caller);
    let mut screen = load_screen::<Service>(&session).await;

    let result = screen
        .delete(&table, id, Confirmation::from_form(form.confirm.as_deref()))
        .await;

    if settle(
        &session,
        &mut screen,
        result,
        |_| Toast::success("Service Deleted", "The service has been removed."),
        "Failed to delete service.",
    )
    .await
    .is_some()
    {
        audit("Service deleted", id);
    }
    back_to(PATH)
}
