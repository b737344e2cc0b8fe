mod admission;
mod appointment;
mod lab;
mod ledger;
mod patient;
mod pharmacy;
mod prescription;

pub use admission::{AdmissionDetail, AdmissionFilter, AdmissionRepository};
pub use appointment::{AppointmentFilter, AppointmentRepository};
pub use lab::{LabFilter, LabRepository};
pub use ledger::{LedgerFilter, LedgerRepository};
pub use patient::{PatientFilter, PatientRepository};
pub use pharmacy::{MedicineFilter, PharmacyRepository};
pub use prescription::PrescriptionRepository;

use std::str::FromStr;

use deadpool_postgres::{Config, Pool, Runtime};
use hims_core::{DocumentKind, HimsError, TenantId};
use tokio_postgres::{NoTls, Row, Transaction};
use uuid::Uuid;

use crate::error::AppError;

/// Create a connection pool from a database URL
pub async fn create_pool(database_url: &str) -> Result<Pool, deadpool_postgres::CreatePoolError> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
}

/// Escape special characters for LIKE patterns
pub(crate) fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Read a text column holding one of the core enums
pub(crate) fn text_column<T>(row: &Row, column: &str) -> Result<T, AppError>
where
    T: FromStr<Err = HimsError>,
{
    let raw: &str = row.get(column);
    raw.parse()
        .map_err(|e: HimsError| AppError::Internal(format!("Corrupt column {column}: {e}")))
}

/// Read a nullable text column holding one of the core enums
pub(crate) fn opt_text_column<T>(row: &Row, column: &str) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = HimsError>,
{
    let raw: Option<&str> = row.get(column);
    raw.map(|r| {
        r.parse()
            .map_err(|e: HimsError| AppError::Internal(format!("Corrupt column {column}: {e}")))
    })
    .transpose()
}

/// Read a JSONB column into a typed value
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &Row,
    column: &str,
) -> Result<T, AppError> {
    let value: serde_json::Value = row.get(column);
    serde_json::from_value(value)
        .map_err(|e| AppError::Internal(format!("Corrupt column {column}: {e}")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("Serialization error: {e}")))
}

/// Assign the next document number of `kind` inside the transaction
pub(crate) async fn next_document_number(
    tx: &Transaction<'_>,
    tenant: &TenantId,
    kind: DocumentKind,
) -> Result<String, AppError> {
    let row = tx
        .query_one(
            "SELECT hims_next_document_number($1, $2)",
            &[&tenant.as_str(), &kind.code()],
        )
        .await?;
    Ok(row.get(0))
}

/// Fail with 404 unless the patient exists in the tenant
pub(crate) async fn ensure_patient(
    tx: &Transaction<'_>,
    tenant: &TenantId,
    patient_id: Uuid,
) -> Result<(), AppError> {
    let row = tx
        .query_opt(
            "SELECT 1 FROM patients WHERE id = $1 AND tenant_id = $2",
            &[&patient_id, &tenant.as_str()],
        )
        .await?;
    match row {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("Patient", patient_id)),
    }
}
