//! View state for admin collection screens.
//!
//! A [`CrudScreen`] is the last known-good copy of one collection as an
//! admin sees it. It lives in the admin's session, so a mutation patches it
//! from the backend's response instead of refetching the collection, and a
//! failed call leaves it exactly as it was.
//!
//! The list page refetches when it is opened fresh ("mounted"); after a
//! mutation the handler marks the screen fresh and the redirected list
//! render uses the patched copy as is.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tower_sessions::Session;
use uuid::Uuid;

use crate::db::{Record, RepositoryError, Table, decode};
use crate::models::{ValidationError, session_keys};
use crate::supabase::Query;

/// Fields searched by the admin search box, plus an optional status.
pub trait Searchable {
    /// Text fields matched by the search box.
    fn haystack(&self) -> Vec<&str>;

    /// Status text matched exactly by the status filter.
    fn status_text(&self) -> Option<&str> {
        None
    }
}

/// Search box and status dropdown input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: String,
}

impl ListFilter {
    /// The exact status to match; blank and `all` mean any.
    #[must_use]
    pub fn status_filter(&self) -> Option<&str> {
        let status = self.status.trim();
        (!status.is_empty() && status != "all").then_some(status)
    }

    /// Case-insensitive substring match across the searchable fields, plus
    /// the exact status match.
    #[must_use]
    pub fn matches<T: Searchable>(&self, row: &T) -> bool {
        let needle = self.q.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || row
                .haystack()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
        let status_ok = self
            .status_filter()
            .is_none_or(|wanted| row.status_text() == Some(wanted));
        text_ok && status_ok
    }
}

/// Where a created row joins the local list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    /// Activity lists, newest first.
    Front,
    /// Sort-ordered lists.
    Back,
}

/// Explicit user confirmation for destructive actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

impl Confirmation {
    /// Read the confirmation checkbox or hidden field of a form.
    #[must_use]
    pub fn from_form(value: Option<&str>) -> Self {
        match value {
            Some("yes" | "on" | "true") => Self::Confirmed,
            _ => Self::Unconfirmed,
        }
    }
}

/// Why a screen mutation did not happen.
#[derive(Debug, Error)]
pub enum CrudError {
    /// Input was rejected locally; nothing was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A delete was attempted without confirmation; nothing was sent.
    #[error("confirmation required")]
    ConfirmationRequired,

    /// The addressed row is not in the local view.
    #[error("row not loaded")]
    NotInView,

    /// The backend call failed; local state is unchanged.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CrudError {
    /// Text for an error toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::ConfirmationRequired => "Please confirm before deleting.".to_string(),
            Self::NotInView => "That record is not loaded. Please reload the page.".to_string(),
            Self::Repository(e) => e.user_message(),
        }
    }
}

/// Last known-good copy of one admin collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrudScreen<T> {
    rows: Vec<T>,
    #[serde(default)]
    loaded: bool,
    #[serde(default)]
    fresh: bool,
}

impl<T> Default for CrudScreen<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            loaded: false,
            fresh: false,
        }
    }
}

impl<T: Record> CrudScreen<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in list order.
    #[must_use]
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// True once a load has succeeded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The row with the given id.
    #[must_use]
    pub fn find(&self, id: Uuid) -> Option<&T> {
        self.rows.iter().find(|row| row.row_id() == id)
    }

    /// Mark the local copy as current so the next mount skips the refetch.
    pub const fn mark_fresh(&mut self) {
        self.fresh = true;
    }

    /// Replace the rows with the backend's current list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the previous rows are kept.
    pub async fn load(&mut self, table: &Table<'_, T>, query: &Query) -> Result<(), RepositoryError> {
        let rows = table.list(query).await?;
        self.rows = rows;
        self.loaded = true;
        self.fresh = false;
        Ok(())
    }

    /// Load on mount unless a mutation just left the local copy current.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the previous rows are kept.
    pub async fn mount(&mut self, table: &Table<'_, T>, query: &Query) -> Result<(), RepositoryError> {
        if self.fresh && self.loaded {
            self.fresh = false;
            return Ok(());
        }
        self.load(table, query).await
    }

    /// Rows passing the filter, in list order.
    #[must_use]
    pub fn visible(&self, filter: &ListFilter) -> Vec<&T>
    where
        T: Searchable,
    {
        self.rows.iter().filter(|row| filter.matches(*row)).collect()
    }

    /// Insert a validated row and add the returned record locally.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local rows are unchanged.
    pub async fn create(
        &mut self,
        table: &Table<'_, T>,
        row: &Value,
        at: InsertAt,
    ) -> Result<T, CrudError> {
        let created = table.insert(row).await?;
        match at {
            InsertAt::Front => self.rows.insert(0, created.clone()),
            InsertAt::Back => self.rows.push(created.clone()),
        }
        Ok(created)
    }

    /// Send a partial update and merge only the patched fields locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update or the patched row
    /// would not decode; the local rows are unchanged either way.
    pub async fn update(
        &mut self,
        table: &Table<'_, T>,
        id: Uuid,
        patch: &Value,
    ) -> Result<(), CrudError> {
        let patched = self.find(id).map(|row| merge_patch(row, patch)).transpose()?;

        table.update(id, patch).await?;

        if let Some(patched) = patched
            && let Some(row) = self.rows.iter_mut().find(|row| row.row_id() == id)
        {
            *row = patched;
        }
        Ok(())
    }

    /// Flip a boolean flag with a single remote update.
    ///
    /// Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::NotInView`] when the row is not loaded, or the
    /// backend error; the local rows are unchanged either way.
    pub async fn toggle(
        &mut self,
        table: &Table<'_, T>,
        id: Uuid,
        field: &str,
    ) -> Result<bool, CrudError> {
        let current = self
            .find(id)
            .ok_or(CrudError::NotInView)
            .and_then(|row| {
                serde_json::to_value(row)
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()).into())
            })?
            .get(field)
            .and_then(Value::as_bool)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!("{field} is not a boolean"))
            })?;

        let next = !current;
        let mut patch = json!({});
        patch[field] = Value::Bool(next);
        self.update(table, id, &patch).await?;
        Ok(next)
    }

    /// Delete a row once confirmed and drop it locally.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::ConfirmationRequired`] without calling the
    /// backend when unconfirmed, or the backend error with the row kept.
    pub async fn delete(
        &mut self,
        table: &Table<'_, T>,
        id: Uuid,
        confirmation: Confirmation,
    ) -> Result<(), CrudError> {
        if confirmation != Confirmation::Confirmed {
            return Err(CrudError::ConfirmationRequired);
        }
        table.delete(id).await?;
        self.rows.retain(|row| row.row_id() != id);
        Ok(())
    }
}

/// Copy of `row` with the patch's fields applied.
fn merge_patch<T: Record>(row: &T, patch: &Value) -> Result<T, RepositoryError> {
    let mut value =
        serde_json::to_value(row).map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
    if let (Some(target), Some(fields)) = (value.as_object_mut(), patch.as_object()) {
        for (key, field) in fields {
            target.insert(key.clone(), field.clone());
        }
    }
    decode(value)
}

fn screen_key<T: Record>() -> String {
    format!("{}{}", session_keys::SCREEN_PREFIX, T::TABLE)
}

/// Restore a screen from the session, or start empty.
pub async fn load_screen<T>(session: &Session) -> CrudScreen<T>
where
    T: Record + DeserializeOwned,
{
    match session.get::<CrudScreen<T>>(&screen_key::<T>()).await {
        Ok(screen) => screen.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, table = T::TABLE, "Discarding unreadable screen state");
            CrudScreen::default()
        }
    }
}

/// Persist a screen into the session.
pub async fn save_screen<T: Record>(session: &Session, screen: &CrudScreen<T>) {
    if let Err(e) = session.insert(&screen_key::<T>(), screen).await {
        tracing::warn!(error = %e, table = T::TABLE, "Failed to store screen state");
    }
}
