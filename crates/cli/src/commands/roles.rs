//! Role grants in `user_roles`.
//!
//! The website only ever reads this table. Grants and revocations happen
//! here, out of band.

use serde_json::{Value, json};
use uuid::Uuid;

use siddha_clinic_core::{AppRole, UserId};
use siddha_clinic_web::supabase::{Caller, Query, TableStore};

use super::CliError;

const TABLE: &str = "user_roles";

fn grants_for(user_id: UserId, role: AppRole) -> Query {
    Query::new()
        .eq("user_id", user_id.to_string())
        .eq("role", role.to_string())
}

fn row_id(row: &Value) -> Result<Uuid, CliError> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| CliError::MalformedRow {
            table: TABLE,
            message: format!("missing id in {row}"),
        })
}

/// Grant `role` to `user_id`. Granting an existing role is a no-op.
///
/// # Errors
///
/// Returns an error if the backend rejects the read or insert.
pub async fn grant(store: &dyn TableStore, user_id: UserId, role: AppRole) -> Result<(), CliError> {
    let caller = Caller::Anonymous;
    let existing = store
        .select(&caller, TABLE, &grants_for(user_id, role))
        .await?;
    if !existing.is_empty() {
        tracing::info!(%user_id, %role, "Role already granted");
        return Ok(());
    }

    store
        .insert(
            &caller,
            TABLE,
            &json!({ "user_id": user_id.to_string(), "role": role }),
        )
        .await?;
    tracing::info!(%user_id, %role, "Role granted");
    Ok(())
}

/// Revoke `role` from `user_id`.
///
/// # Errors
///
/// Returns an error if the backend rejects the read or a delete.
pub async fn revoke(store: &dyn TableStore, user_id: UserId, role: AppRole) -> Result<(), CliError> {
    let caller = Caller::Anonymous;
    let rows = store
        .select(&caller, TABLE, &grants_for(user_id, role))
        .await?;
    if rows.is_empty() {
        tracing::warn!(%user_id, %role, "No such grant");
        return Ok(());
    }

    for row in &rows {
        store.delete(&caller, TABLE, row_id(row)?).await?;
    }
    tracing::info!(%user_id, %role, removed = rows.len(), "Role revoked");
    Ok(())
}

/// Log every grant.
///
/// # Errors
///
/// Returns an error if the backend rejects the read.
pub async fn list(store: &dyn TableStore) -> Result<(), CliError> {
    let rows = store
        .select(&Caller::Anonymous, TABLE, &Query::new().order_asc("role"))
        .await?;

    tracing::info!("{} role grant(s)", rows.len());
    for row in &rows {
        let user_id = row.get("user_id").and_then(Value::as_str).unwrap_or("?");
        let role = row.get("role").and_then(Value::as_str).unwrap_or("?");
        tracing::info!("  {user_id}  {role}");
    }
    Ok(())
}
