use deadpool_postgres::Pool;
use hims_core::ledger::category;
use hims_core::{
    Admission, AdmissionStatus, Bill, CategoryAmount, Charge, ClinicalNote, DischargeInvoice,
    DischargeRequest, DocumentKind, LabRequest, NewAdmission, NewCharge, NewLedgerEntry, NewNote,
    NewSurgery, PageParams, Surgery, TenantId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use super::{ensure_patient, json_column, lab, ledger, next_document_number, text_column, to_json};
use crate::error::AppError;

const COLUMNS: &str = "id, patient_id, ward, bed, doctor, diagnosis, admitted_at, deposit, \
                       status, discharged_at, discharge_summary, invoice_id";
const CHARGE_COLUMNS: &str =
    "id, admission_id, category, description, quantity, unit_price, amount, created_at";
const NOTE_COLUMNS: &str = "id, admission_id, author, body, created_at";
const SURGERY_COLUMNS: &str = "id, admission_id, procedure, surgeon, performed_at, fee, notes";
const INVOICE_COLUMNS: &str = "id, number, admission_id, patient_id, by_category, subtotal, \
                               discount, total, deposit, balance_due, issued_at";

fn from_row(row: &Row) -> Result<Admission, AppError> {
    Ok(Admission {
        id: row.get("id"),
        patient_id: row.get("patient_id"),
        ward: row.get("ward"),
        bed: row.get("bed"),
        doctor: row.get("doctor"),
        diagnosis: row.get("diagnosis"),
        admitted_at: row.get("admitted_at"),
        deposit: row.get("deposit"),
        status: text_column(row, "status")?,
        discharged_at: row.get("discharged_at"),
        discharge_summary: row.get("discharge_summary"),
        invoice_id: row.get("invoice_id"),
    })
}

fn charge_from_row(row: &Row) -> Result<Charge, AppError> {
    Ok(Charge {
        id: row.get("id"),
        admission_id: row.get("admission_id"),
        category: text_column(row, "category")?,
        description: row.get("description"),
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        amount: row.get("amount"),
        created_at: row.get("created_at"),
    })
}

fn note_from_row(row: &Row) -> ClinicalNote {
    ClinicalNote {
        id: row.get("id"),
        admission_id: row.get("admission_id"),
        author: row.get("author"),
        body: row.get("body"),
        created_at: row.get("created_at"),
    }
}

fn surgery_from_row(row: &Row) -> Surgery {
    Surgery {
        id: row.get("id"),
        admission_id: row.get("admission_id"),
        procedure: row.get("procedure"),
        surgeon: row.get("surgeon"),
        performed_at: row.get("performed_at"),
        fee: row.get("fee"),
        notes: row.get("notes"),
    }
}

fn invoice_from_row(row: &Row) -> Result<DischargeInvoice, AppError> {
    let by_category: Vec<CategoryAmount> = json_column(row, "by_category")?;
    Ok(DischargeInvoice {
        id: row.get("id"),
        number: row.get("number"),
        admission_id: row.get("admission_id"),
        patient_id: row.get("patient_id"),
        bill: Bill {
            by_category,
            subtotal: row.get("subtotal"),
            discount: row.get("discount"),
            total: row.get("total"),
            deposit: row.get("deposit"),
            balance_due: row.get("balance_due"),
        },
        issued_at: row.get("issued_at"),
    })
}

/// Lock an admission row for the rest of the transaction
pub(super) async fn lock_admission(
    tx: &Transaction<'_>,
    tenant: &TenantId,
    id: Uuid,
) -> Result<Admission, AppError> {
    let row = tx
        .query_opt(
            &format!(
                "SELECT {COLUMNS} FROM admissions
                  WHERE id = $1 AND tenant_id = $2
                  FOR UPDATE"
            ),
            &[&id, &tenant.as_str()],
        )
        .await?
        .ok_or_else(|| AppError::not_found("Admission", id))?;
    from_row(&row)
}

/// Insert a charge; the caller must hold the admission lock
pub(super) async fn insert_charge(
    tx: &Transaction<'_>,
    tenant: &TenantId,
    admission_id: Uuid,
    charge: &NewCharge,
) -> Result<Charge, AppError> {
    let amount = charge.amount()?;
    let row = tx
        .query_one(
            &format!(
                "INSERT INTO admission_charges
                   (id, tenant_id, admission_id, category, description, quantity, unit_price, amount)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING {CHARGE_COLUMNS}"
            ),
            &[
                &Uuid::new_v4(),
                &tenant.as_str(),
                &admission_id,
                &charge.category.as_str(),
                &charge.description,
                &charge.quantity,
                &charge.unit_price,
                &amount,
            ],
        )
        .await?;
    charge_from_row(&row)
}

async fn charges_of(
    tx: &Transaction<'_>,
    tenant: &TenantId,
    admission_id: Uuid,
) -> Result<Vec<Charge>, AppError> {
    let rows = tx
        .query(
            &format!(
                "SELECT {CHARGE_COLUMNS} FROM admission_charges
                  WHERE admission_id = $1 AND tenant_id = $2
                  ORDER BY created_at, id"
            ),
            &[&admission_id, &tenant.as_str()],
        )
        .await?;
    rows.iter().map(charge_from_row).collect()
}

/// Admission with everything recorded against it
#[derive(Debug, Serialize)]
pub struct AdmissionDetail {
    #[serde(flatten)]
    pub admission: Admission,
    pub charges: Vec<Charge>,
    pub notes: Vec<ClinicalNote>,
    pub surgeries: Vec<Surgery>,
    pub lab_requests: Vec<LabRequest>,
    /// Running bill without discount
    pub bill: Bill,
}

/// Query parameters for the admission list
#[derive(Debug, Deserialize, Default)]
pub struct AdmissionFilter {
    pub status: Option<AdmissionStatus>,
    pub ward: Option<String>,
    pub patient_id: Option<Uuid>,
    #[serde(rename = "_count")]
    pub count: Option<i64>,
    #[serde(rename = "_offset")]
    pub offset: Option<i64>,
}

impl AdmissionFilter {
    pub fn page(&self) -> PageParams {
        PageParams::new(self.count, self.offset)
    }
}

/// Repository for the in-patient workflow
#[derive(Clone)]
pub struct AdmissionRepository {
    pool: Pool,
}

impl AdmissionRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Admit a patient. Fails with 409 when the patient already has an open
    /// admission or the bed is occupied.
    pub async fn admit(
        &self,
        tenant: &TenantId,
        admission: NewAdmission,
    ) -> Result<Admission, AppError> {
        let a = admission.normalize()?;
        let deposit = a.deposit.unwrap_or(Decimal::ZERO);
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        ensure_patient(&tx, tenant, a.patient_id).await?;

        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO admissions
                       (id, tenant_id, patient_id, ward, bed, doctor, diagnosis, deposit, status)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                     RETURNING {COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &tenant.as_str(),
                    &a.patient_id,
                    &a.ward,
                    &a.bed,
                    &a.doctor,
                    &a.diagnosis,
                    &deposit,
                    &AdmissionStatus::Admitted.as_str(),
                ],
            )
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(msg) if msg.contains("admissions_open_bed_idx") => {
                    AppError::Conflict(format!("Bed {} in {} is occupied", a.bed, a.ward))
                }
                AppError::Conflict(_) => AppError::Conflict(format!(
                    "Patient/{} already has an open admission",
                    a.patient_id
                )),
                other => other,
            })?;
        let created = from_row(&row)?;
        tx.commit().await?;

        tracing::info!(tenant = %tenant, admission_id = %created.id, ward = %created.ward, "Patient admitted");
        Ok(created)
    }

    /// Admission with charges, notes, surgeries, lab requests and a bill preview
    pub async fn detail(
        &self,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<AdmissionDetail>, AppError> {
        let mut client = self.pool.get().await?;
        // Read-only snapshot so the parts agree with each other
        let tx = client
            .build_transaction()
            .read_only(true)
            .isolation_level(tokio_postgres::IsolationLevel::RepeatableRead)
            .start()
            .await?;

        let Some(row) = tx
            .query_opt(
                &format!("SELECT {COLUMNS} FROM admissions WHERE id = $1 AND tenant_id = $2"),
                &[&id, &tenant.as_str()],
            )
            .await?
        else {
            return Ok(None);
        };
        let admission = from_row(&row)?;
        let charges = charges_of(&tx, tenant, id).await?;

        let notes = tx
            .query(
                &format!(
                    "SELECT {NOTE_COLUMNS} FROM clinical_notes
                      WHERE admission_id = $1 AND tenant_id = $2
                      ORDER BY created_at, id"
                ),
                &[&id, &tenant.as_str()],
            )
            .await?
            .iter()
            .map(note_from_row)
            .collect();

        let surgeries = tx
            .query(
                &format!(
                    "SELECT {SURGERY_COLUMNS} FROM surgeries
                      WHERE admission_id = $1 AND tenant_id = $2
                      ORDER BY performed_at, id"
                ),
                &[&id, &tenant.as_str()],
            )
            .await?
            .iter()
            .map(surgery_from_row)
            .collect();

        let lab_requests = tx
            .query(
                &format!(
                    "SELECT {} FROM lab_requests
                      WHERE admission_id = $1 AND tenant_id = $2
                      ORDER BY requested_at, id",
                    lab::COLUMNS
                ),
                &[&id, &tenant.as_str()],
            )
            .await?
            .iter()
            .map(lab::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit().await?;

        let bill = Bill::compute(&charges, admission.deposit, None)?;
        Ok(Some(AdmissionDetail {
            admission,
            charges,
            notes,
            surgeries,
            lab_requests,
            bill,
        }))
    }

    pub async fn search(
        &self,
        tenant: &TenantId,
        filter: &AdmissionFilter,
    ) -> Result<(i64, Vec<Admission>), AppError> {
        let client = self.pool.get().await?;
        let status = filter.status.map(AdmissionStatus::as_str);
        let page = filter.page();
        let condition = "tenant_id = $1
            AND ($2::text IS NULL OR status = $2)
            AND ($3::text IS NULL OR ward = $3)
            AND ($4::uuid IS NULL OR patient_id = $4)";

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM admissions WHERE {condition}"),
                &[&tenant.as_str(), &status, &filter.ward, &filter.patient_id],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM admissions WHERE {condition}
                     ORDER BY admitted_at DESC, id
                     LIMIT $5 OFFSET $6"
                ),
                &[
                    &tenant.as_str(),
                    &status,
                    &filter.ward,
                    &filter.patient_id,
                    &page.limit(),
                    &page.offset(),
                ],
            )
            .await?;

        let admissions = rows.iter().map(from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((total, admissions))
    }

    /// Post a charge to an open admission
    pub async fn add_charge(
        &self,
        tenant: &TenantId,
        id: Uuid,
        charge: NewCharge,
    ) -> Result<Charge, AppError> {
        let charge = charge.normalize()?;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        lock_admission(&tx, tenant, id).await?.ensure_open()?;
        let created = insert_charge(&tx, tenant, id, &charge).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Record a clinical note on an open admission
    pub async fn add_note(
        &self,
        tenant: &TenantId,
        id: Uuid,
        note: NewNote,
    ) -> Result<ClinicalNote, AppError> {
        let note = note.normalize()?;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        lock_admission(&tx, tenant, id).await?.ensure_open()?;

        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO clinical_notes (id, tenant_id, admission_id, author, body)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING {NOTE_COLUMNS}"
                ),
                &[&Uuid::new_v4(), &tenant.as_str(), &id, &note.author, &note.body],
            )
            .await?;
        tx.commit().await?;
        Ok(note_from_row(&row))
    }

    /// Record a surgery; a surgery with a fee also posts a `surgery` charge
    pub async fn add_surgery(
        &self,
        tenant: &TenantId,
        id: Uuid,
        surgery: NewSurgery,
    ) -> Result<Surgery, AppError> {
        let surgery = surgery.normalize()?;
        let fee = surgery.fee.unwrap_or(Decimal::ZERO);
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        lock_admission(&tx, tenant, id).await?.ensure_open()?;

        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO surgeries
                       (id, tenant_id, admission_id, procedure, surgeon, performed_at, fee, notes)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     RETURNING {SURGERY_COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &tenant.as_str(),
                    &id,
                    &surgery.procedure,
                    &surgery.surgeon,
                    &surgery.performed_at,
                    &fee,
                    &surgery.notes,
                ],
            )
            .await?;
        if let Some(charge) = surgery.charge() {
            insert_charge(&tx, tenant, id, &charge).await?;
        }
        tx.commit().await?;
        Ok(surgery_from_row(&row))
    }

    /// Discharge an admission and bill it.
    ///
    /// Locks the admission, sums its charges, applies the discount and the
    /// deposit, writes the invoice, closes the admission and books the total
    /// as `ipd` income. Everything happens in one transaction.
    pub async fn discharge(
        &self,
        tenant: &TenantId,
        id: Uuid,
        request: DischargeRequest,
    ) -> Result<DischargeInvoice, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let admission = lock_admission(&tx, tenant, id).await?;
        admission.ensure_open()?;

        let charges = charges_of(&tx, tenant, id).await?;
        let bill = Bill::compute(&charges, admission.deposit, request.discount.as_ref())?;
        let number = next_document_number(&tx, tenant, DocumentKind::IpdInvoice).await?;
        let invoice_id = Uuid::new_v4();

        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO ipd_invoices
                       (id, tenant_id, number, admission_id, patient_id, by_category,
                        subtotal, discount, total, deposit, balance_due)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                     RETURNING {INVOICE_COLUMNS}"
                ),
                &[
                    &invoice_id,
                    &tenant.as_str(),
                    &number,
                    &id,
                    &admission.patient_id,
                    &to_json(&bill.by_category)?,
                    &bill.subtotal,
                    &bill.discount,
                    &bill.total,
                    &bill.deposit,
                    &bill.balance_due,
                ],
            )
            .await?;
        let invoice = invoice_from_row(&row)?;

        let summary = request
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        tx.execute(
            "UPDATE admissions
                SET status = $3, discharged_at = now(), discharge_summary = $4, invoice_id = $5
              WHERE id = $1 AND tenant_id = $2",
            &[
                &id,
                &tenant.as_str(),
                &AdmissionStatus::Discharged.as_str(),
                &summary,
                &invoice_id,
            ],
        )
        .await?;

        if bill.total > Decimal::ZERO {
            let entry = NewLedgerEntry::income(
                category::IPD,
                bill.total,
                "ipd_invoice",
                invoice_id,
                format!("Discharge invoice {number}"),
            );
            ledger::append_entry(&tx, tenant, &entry).await?;
        }

        tx.commit().await?;
        tracing::info!(
            tenant = %tenant,
            admission_id = %id,
            invoice = %invoice.number,
            total = %invoice.bill.total,
            "Admission discharged"
        );
        Ok(invoice)
    }

    /// Discharge invoice of an admission, if it has been discharged
    pub async fn invoice(
        &self,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<DischargeInvoice>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {INVOICE_COLUMNS} FROM ipd_invoices
                      WHERE admission_id = $1 AND tenant_id = $2"
                ),
                &[&id, &tenant.as_str()],
            )
            .await?;
        row.as_ref().map(invoice_from_row).transpose()
    }
}
