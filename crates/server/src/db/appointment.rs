use chrono::{NaiveDate, Utc};
use deadpool_postgres::Pool;
use hims_core::ledger::category;
use hims_core::{
    Appointment, AppointmentStatus, NewAppointment, NewLedgerEntry, PageParams, StatusChange,
    TenantId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_postgres::Row;
use uuid::Uuid;

use super::{ensure_patient, ledger, text_column};
use crate::error::AppError;

const COLUMNS: &str =
    "id, patient_id, doctor, department, scheduled_at, reason, status, fee, notes, created_at";

fn from_row(row: &Row) -> Result<Appointment, AppError> {
    Ok(Appointment {
        id: row.get("id"),
        patient_id: row.get("patient_id"),
        doctor: row.get("doctor"),
        department: row.get("department"),
        scheduled_at: row.get("scheduled_at"),
        reason: row.get("reason"),
        status: text_column(row, "status")?,
        fee: row.get("fee"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
    })
}

/// Query parameters for the appointment list
#[derive(Debug, Deserialize, Default)]
pub struct AppointmentFilter {
    pub doctor: Option<String>,
    /// Calendar day of `scheduled_at`
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<Uuid>,
    #[serde(rename = "_count")]
    pub count: Option<i64>,
    #[serde(rename = "_offset")]
    pub offset: Option<i64>,
}

impl AppointmentFilter {
    pub fn page(&self) -> PageParams {
        PageParams::new(self.count, self.offset)
    }
}

/// Repository for outpatient appointments
#[derive(Clone)]
pub struct AppointmentRepository {
    pool: Pool,
}

impl AppointmentRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Book an appointment; a doctor's slot can only be taken once
    pub async fn create(
        &self,
        tenant: &TenantId,
        appointment: NewAppointment,
    ) -> Result<Appointment, AppError> {
        let a = appointment.normalize(Utc::now())?;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        ensure_patient(&tx, tenant, a.patient_id).await?;

        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO appointments
                       (id, tenant_id, patient_id, doctor, department, scheduled_at, reason, status)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     RETURNING {COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &tenant.as_str(),
                    &a.patient_id,
                    &a.doctor,
                    &a.department,
                    &a.scheduled_at,
                    &a.reason,
                    &AppointmentStatus::Scheduled.as_str(),
                ],
            )
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::Conflict(format!(
                    "{} already has an appointment at {}",
                    a.doctor, a.scheduled_at
                )),
                other => other,
            })?;
        let created = from_row(&row)?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn get(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM appointments WHERE id = $1 AND tenant_id = $2"),
                &[&id, &tenant.as_str()],
            )
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// List appointments in schedule order
    pub async fn search(
        &self,
        tenant: &TenantId,
        filter: &AppointmentFilter,
    ) -> Result<(i64, Vec<Appointment>), AppError> {
        let client = self.pool.get().await?;
        let status = filter.status.map(AppointmentStatus::as_str);
        let page = filter.page();
        let condition = "tenant_id = $1
            AND ($2::text IS NULL OR doctor = $2)
            AND ($3::date IS NULL OR scheduled_at::date = $3)
            AND ($4::text IS NULL OR status = $4)
            AND ($5::uuid IS NULL OR patient_id = $5)";

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM appointments WHERE {condition}"),
                &[&tenant.as_str(), &filter.doctor, &filter.date, &status, &filter.patient_id],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM appointments WHERE {condition}
                     ORDER BY scheduled_at, id
                     LIMIT $6 OFFSET $7"
                ),
                &[
                    &tenant.as_str(),
                    &filter.doctor,
                    &filter.date,
                    &status,
                    &filter.patient_id,
                    &page.limit(),
                    &page.offset(),
                ],
            )
            .await?;

        let appointments = rows.iter().map(from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((total, appointments))
    }

    /// Move an appointment through its lifecycle.
    ///
    /// Completing with a fee books consultation income in the same transaction.
    pub async fn change_status(
        &self,
        tenant: &TenantId,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Appointment, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                &format!(
                    "SELECT {COLUMNS} FROM appointments
                      WHERE id = $1 AND tenant_id = $2
                      FOR UPDATE"
                ),
                &[&id, &tenant.as_str()],
            )
            .await?
            .ok_or_else(|| AppError::not_found("Appointment", id))?;
        let current = from_row(&row)?;
        let fee = change.apply_to(current.status)?;
        let notes = change
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let row = tx
            .query_one(
                &format!(
                    "UPDATE appointments
                        SET status = $3, fee = COALESCE($4, fee), notes = COALESCE($5, notes)
                      WHERE id = $1 AND tenant_id = $2
                     RETURNING {COLUMNS}"
                ),
                &[&id, &tenant.as_str(), &change.status.as_str(), &fee, &notes],
            )
            .await?;
        let updated = from_row(&row)?;

        if let Some(fee) = fee.filter(|f| *f > Decimal::ZERO) {
            let entry = NewLedgerEntry::income(
                category::CONSULTATION,
                fee,
                "appointment",
                id,
                format!("Consultation with {}", updated.doctor),
            );
            ledger::append_entry(&tx, tenant, &entry).await?;
        }

        tx.commit().await?;
        tracing::info!(
            tenant = %tenant,
            appointment_id = %id,
            from = %current.status,
            to = %updated.status,
            "Appointment status changed"
        );
        Ok(updated)
    }
}
