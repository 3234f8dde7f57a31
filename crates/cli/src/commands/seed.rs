//! Provision the singleton rows.
//!
//! The back-office creates these on first visit anyway; seeding lets the
//! public site show real details before anyone signs in.

use siddha_clinic_web::components::{Singleton, SingletonRecord};
use siddha_clinic_web::db::{Record, Table};
use siddha_clinic_web::models::{AdminSettings, DoctorProfile};
use siddha_clinic_web::supabase::{Caller, TableStore};

use super::CliError;

async fn ensure<T: SingletonRecord>(store: &dyn TableStore, caller: &Caller) -> Result<(), CliError> {
    let table = Table::<T>::new(store, caller);
    let mut singleton = Singleton::new();
    let row = singleton.ensure_exists(&table).await?;
    tracing::info!(table = T::TABLE, id = %row.row_id(), "Row present");
    Ok(())
}

/// Ensure the doctor profile and admin settings rows exist.
///
/// # Errors
///
/// Returns an error if either row cannot be read or inserted.
pub async fn singletons(store: &dyn TableStore) -> Result<(), CliError> {
    let caller = Caller::Anonymous;
    ensure::<DoctorProfile>(store, &caller).await?;
    ensure::<AdminSettings>(store, &caller).await?;
    tracing::info!("Seeding complete");
    Ok(())
}
