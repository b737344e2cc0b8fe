use deadpool_postgres::Pool;
use hims_core::{DocumentKind, NewPrescription, Prescription, TenantId};
use tokio_postgres::Row;
use uuid::Uuid;

use super::{ensure_patient, json_column, next_document_number, to_json};
use crate::error::AppError;

const COLUMNS: &str = "id, number, patient_id, appointment_id, doctor, diagnosis, items, created_at";

fn from_row(row: &Row) -> Result<Prescription, AppError> {
    Ok(Prescription {
        id: row.get("id"),
        number: row.get("number"),
        patient_id: row.get("patient_id"),
        appointment_id: row.get("appointment_id"),
        doctor: row.get("doctor"),
        diagnosis: row.get("diagnosis"),
        items: json_column(row, "items")?,
        created_at: row.get("created_at"),
    })
}

/// Repository for prescriptions written during consultations
#[derive(Clone)]
pub struct PrescriptionRepository {
    pool: Pool,
}

impl PrescriptionRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tenant: &TenantId,
        prescription: NewPrescription,
    ) -> Result<Prescription, AppError> {
        let rx = prescription.normalize()?;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        ensure_patient(&tx, tenant, rx.patient_id).await?;

        if let Some(appointment_id) = rx.appointment_id {
            let owner: Uuid = tx
                .query_opt(
                    "SELECT patient_id FROM appointments WHERE id = $1 AND tenant_id = $2",
                    &[&appointment_id, &tenant.as_str()],
                )
                .await?
                .ok_or_else(|| AppError::not_found("Appointment", appointment_id))?
                .get(0);
            if owner != rx.patient_id {
                return Err(AppError::BadRequest(format!(
                    "Appointment/{appointment_id} belongs to another patient"
                )));
            }
        }

        let number = next_document_number(&tx, tenant, DocumentKind::Prescription).await?;
        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO prescriptions
                       (id, tenant_id, number, patient_id, appointment_id, doctor, diagnosis, items)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     RETURNING {COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &tenant.as_str(),
                    &number,
                    &rx.patient_id,
                    &rx.appointment_id,
                    &rx.doctor,
                    &rx.diagnosis,
                    &to_json(&rx.items)?,
                ],
            )
            .await?;
        let created = from_row(&row)?;
        tx.commit().await?;

        tracing::info!(tenant = %tenant, prescription = %created.number, "Prescription written");
        Ok(created)
    }

    pub async fn get(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Prescription>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM prescriptions WHERE id = $1 AND tenant_id = $2"),
                &[&id, &tenant.as_str()],
            )
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// All prescriptions of a patient, newest first.
    ///
    /// Returns `None` when the patient does not exist in the tenant.
    pub async fn list_for_patient(
        &self,
        tenant: &TenantId,
        patient_id: Uuid,
    ) -> Result<Option<Vec<Prescription>>, AppError> {
        let client = self.pool.get().await?;
        let exists = client
            .query_opt(
                "SELECT 1 FROM patients WHERE id = $1 AND tenant_id = $2",
                &[&patient_id, &tenant.as_str()],
            )
            .await?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let rows = client
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM prescriptions
                      WHERE patient_id = $1 AND tenant_id = $2
                      ORDER BY created_at DESC"
                ),
                &[&patient_id, &tenant.as_str()],
            )
            .await?;
        rows.iter().map(from_row).collect::<Result<Vec<_>, _>>().map(Some)
    }
}
