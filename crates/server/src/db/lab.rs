use deadpool_postgres::Pool;
use hims_core::ledger::category;
use hims_core::{
    AdmissionStatus, ChargeCategory, DocumentKind, LabPriority, LabRequest, LabStatus,
    LabStatusChange, NewCharge, NewLabRequest, NewLedgerEntry, PageParams, TenantId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_postgres::Row;
use uuid::Uuid;

use super::{admission, ensure_patient, ledger, next_document_number, text_column};
use crate::error::AppError;

pub(super) const COLUMNS: &str = "id, number, patient_id, admission_id, test_name, price, \
                                  priority, status, result, requested_by, requested_at, updated_at";

pub(super) fn from_row(row: &Row) -> Result<LabRequest, AppError> {
    Ok(LabRequest {
        id: row.get("id"),
        number: row.get("number"),
        patient_id: row.get("patient_id"),
        admission_id: row.get("admission_id"),
        test_name: row.get("test_name"),
        price: row.get("price"),
        priority: text_column(row, "priority")?,
        status: text_column(row, "status")?,
        result: row.get("result"),
        requested_by: row.get("requested_by"),
        requested_at: row.get("requested_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Worklist query parameters
#[derive(Debug, Deserialize, Default)]
pub struct LabFilter {
    pub status: Option<LabStatus>,
    pub priority: Option<LabPriority>,
    pub patient_id: Option<Uuid>,
    #[serde(rename = "_count")]
    pub count: Option<i64>,
    #[serde(rename = "_offset")]
    pub offset: Option<i64>,
}

impl LabFilter {
    pub fn page(&self) -> PageParams {
        PageParams::new(self.count, self.offset)
    }
}

#[derive(Clone)]
pub struct LabRepository {
    pool: Pool,
}

impl LabRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tenant: &TenantId,
        request: NewLabRequest,
    ) -> Result<LabRequest, AppError> {
        let r = request.normalize()?;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        ensure_patient(&tx, tenant, r.patient_id).await?;

        if let Some(admission_id) = r.admission_id {
            let admission = admission::lock_admission(&tx, tenant, admission_id).await?;
            if admission.patient_id != r.patient_id {
                return Err(AppError::BadRequest(format!(
                    "Admission/{admission_id} belongs to another patient"
                )));
            }
            admission.ensure_open()?;
        }

        let number = next_document_number(&tx, tenant, DocumentKind::LabRequest).await?;
        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO lab_requests
                       (id, tenant_id, number, patient_id, admission_id, test_name, price,
                        priority, priority_rank, status, requested_by)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                     RETURNING {COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &tenant.as_str(),
                    &number,
                    &r.patient_id,
                    &r.admission_id,
                    &r.test_name,
                    &r.price,
                    &r.priority.as_str(),
                    &r.priority.rank(),
                    &LabStatus::Requested.as_str(),
                    &r.requested_by,
                ],
            )
            .await?;
        let created = from_row(&row)?;
        tx.commit().await?;

        tracing::info!(
            tenant = %tenant,
            number = %created.number,
            priority = %created.priority,
            "Lab request created"
        );
        Ok(created)
    }

    pub async fn get(&self, tenant: &TenantId, id: Uuid) -> Result<Option<LabRequest>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM lab_requests WHERE id = $1 AND tenant_id = $2"),
                &[&id, &tenant.as_str()],
            )
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// Worklist: stat before urgent before routine, oldest first within a priority
    pub async fn worklist(
        &self,
        tenant: &TenantId,
        filter: &LabFilter,
    ) -> Result<(i64, Vec<LabRequest>), AppError> {
        let client = self.pool.get().await?;
        let status = filter.status.map(LabStatus::as_str);
        let priority = filter.priority.map(LabPriority::as_str);
        let page = filter.page();
        let condition = "tenant_id = $1
            AND ($2::text IS NULL OR status = $2)
            AND ($3::text IS NULL OR priority = $3)
            AND ($4::uuid IS NULL OR patient_id = $4)";

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM lab_requests WHERE {condition}"),
                &[&tenant.as_str(), &status, &priority, &filter.patient_id],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM lab_requests WHERE {condition}
                     ORDER BY priority_rank, requested_at, id
                     LIMIT $5 OFFSET $6"
                ),
                &[
                    &tenant.as_str(),
                    &status,
                    &priority,
                    &filter.patient_id,
                    &page.limit(),
                    &page.offset(),
                ],
            )
            .await?;

        let requests = rows.iter().map(from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((total, requests))
    }

    /// Move a request along its status machine.
    ///
    /// Completing a request bills it: a `lab` charge while its admission is
    /// still open, otherwise `lab` income in the ledger.
    pub async fn change_status(
        &self,
        tenant: &TenantId,
        id: Uuid,
        change: LabStatusChange,
    ) -> Result<LabRequest, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                &format!(
                    "SELECT {COLUMNS} FROM lab_requests
                      WHERE id = $1 AND tenant_id = $2
                      FOR UPDATE"
                ),
                &[&id, &tenant.as_str()],
            )
            .await?
            .ok_or_else(|| AppError::not_found("LabRequest", id))?;
        let current = from_row(&row)?;
        let result = current.apply(&change)?;

        let row = tx
            .query_one(
                &format!(
                    "UPDATE lab_requests
                        SET status = $3, result = $4, updated_at = now()
                      WHERE id = $1 AND tenant_id = $2
                      RETURNING {COLUMNS}"
                ),
                &[&id, &tenant.as_str(), &change.status.as_str(), &result],
            )
            .await?;
        let updated = from_row(&row)?;

        if updated.status == LabStatus::Completed && updated.price > Decimal::ZERO {
            let open_admission = match updated.admission_id {
                Some(admission_id) => {
                    let admission = admission::lock_admission(&tx, tenant, admission_id).await?;
                    (admission.status == AdmissionStatus::Admitted).then_some(admission_id)
                }
                None => None,
            };
            match open_admission {
                Some(admission_id) => {
                    let charge = NewCharge {
                        category: ChargeCategory::Lab,
                        description: format!("{} ({})", updated.test_name, updated.number),
                        quantity: 1,
                        unit_price: updated.price,
                    };
                    admission::insert_charge(&tx, tenant, admission_id, &charge).await?;
                }
                None => {
                    let entry = NewLedgerEntry::income(
                        category::LAB,
                        updated.price,
                        "lab_request",
                        updated.id,
                        format!("{} ({})", updated.test_name, updated.number),
                    );
                    ledger::append_entry(&tx, tenant, &entry).await?;
                }
            }
        }

        tx.commit().await?;
        tracing::info!(
            tenant = %tenant,
            number = %updated.number,
            from = %current.status,
            to = %updated.status,
            "Lab request status changed"
        );
        Ok(updated)
    }
}
