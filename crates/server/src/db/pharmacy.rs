use chrono::Utc;
use deadpool_postgres::Pool;
use hims_core::ledger::category;
use hims_core::{
    DocumentKind, Medicine, NewLedgerEntry, NewMedicine, PageParams, PharmacyInvoice,
    PharmacyInvoiceLine, Restock, SalePlan, SaleRequest, StockSnapshot, TenantId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use super::{ensure_patient, escape_like, ledger, next_document_number, text_column};
use crate::error::AppError;

const COLUMNS: &str =
    "id, name, generic_name, batch, expiry_date, unit_price, stock, reorder_level, created_at";
const INVOICE_COLUMNS: &str = "id, number, patient_id, prescription_id, customer_name, \
                               subtotal, discount, total, payment_method, issued_at";
const LINE_COLUMNS: &str = "medicine_id, medicine_name, batch, quantity, unit_price, amount";

fn from_row(row: &Row) -> Medicine {
    Medicine {
        id: row.get("id"),
        name: row.get("name"),
        generic_name: row.get("generic_name"),
        batch: row.get("batch"),
        expiry_date: row.get("expiry_date"),
        unit_price: row.get("unit_price"),
        stock: row.get("stock"),
        reorder_level: row.get("reorder_level"),
        created_at: row.get("created_at"),
    }
}

fn line_from_row(row: &Row) -> PharmacyInvoiceLine {
    PharmacyInvoiceLine {
        medicine_id: row.get("medicine_id"),
        medicine_name: row.get("medicine_name"),
        batch: row.get("batch"),
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        amount: row.get("amount"),
    }
}

fn invoice_from_row(row: &Row, lines: Vec<PharmacyInvoiceLine>) -> Result<PharmacyInvoice, AppError> {
    Ok(PharmacyInvoice {
        id: row.get("id"),
        number: row.get("number"),
        patient_id: row.get("patient_id"),
        prescription_id: row.get("prescription_id"),
        customer_name: row.get("customer_name"),
        lines,
        subtotal: row.get("subtotal"),
        discount: row.get("discount"),
        total: row.get("total"),
        payment_method: text_column(row, "payment_method")?,
        issued_at: row.get("issued_at"),
    })
}

/// Query parameters for the medicine catalogue
#[derive(Debug, Deserialize, Default)]
pub struct MedicineFilter {
    /// Case-insensitive substring of the brand or generic name
    pub name: Option<String>,
    /// Only medicines at or below their reorder level
    pub low_stock: Option<bool>,
    #[serde(rename = "_count")]
    pub count: Option<i64>,
    #[serde(rename = "_offset")]
    pub offset: Option<i64>,
}

impl MedicineFilter {
    pub fn page(&self) -> PageParams {
        PageParams::new(self.count, self.offset)
    }
}

/// Repository for pharmacy stock and point-of-sale invoices
#[derive(Clone)]
pub struct PharmacyRepository {
    pool: Pool,
}

impl PharmacyRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn create_medicine(
        &self,
        tenant: &TenantId,
        medicine: NewMedicine,
    ) -> Result<Medicine, AppError> {
        let m = medicine.normalize()?;
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO medicines
                       (id, tenant_id, name, generic_name, batch, expiry_date, unit_price,
                        stock, reorder_level)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                     RETURNING {COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &tenant.as_str(),
                    &m.name,
                    &m.generic_name,
                    &m.batch,
                    &m.expiry_date,
                    &m.unit_price,
                    &m.stock,
                    &m.reorder_level,
                ],
            )
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::Conflict(format!(
                    "Medicine {} batch {} already exists",
                    m.name, m.batch
                )),
                other => other,
            })?;
        Ok(from_row(&row))
    }

    pub async fn get_medicine(
        &self,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<Medicine>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM medicines WHERE id = $1 AND tenant_id = $2"),
                &[&id, &tenant.as_str()],
            )
            .await?;
        Ok(row.as_ref().map(from_row))
    }

    pub async fn search_medicines(
        &self,
        tenant: &TenantId,
        filter: &MedicineFilter,
    ) -> Result<(i64, Vec<Medicine>), AppError> {
        let client = self.pool.get().await?;
        let pattern = filter
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", escape_like(n)));
        let low_stock = filter.low_stock.unwrap_or(false);
        let page = filter.page();
        let condition = "tenant_id = $1
            AND ($2::text IS NULL OR name ILIKE $2 OR generic_name ILIKE $2)
            AND (NOT $3 OR stock <= reorder_level)";

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM medicines WHERE {condition}"),
                &[&tenant.as_str(), &pattern, &low_stock],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM medicines WHERE {condition}
                     ORDER BY name, expiry_date, id
                     LIMIT $4 OFFSET $5"
                ),
                &[
                    &tenant.as_str(),
                    &pattern,
                    &low_stock,
                    &page.limit(),
                    &page.offset(),
                ],
            )
            .await?;

        Ok((total, rows.iter().map(from_row).collect()))
    }

    /// Add stock; a unit cost also books a `pharmacy_purchase` expense
    pub async fn restock(
        &self,
        tenant: &TenantId,
        id: Uuid,
        restock: Restock,
    ) -> Result<Medicine, AppError> {
        let cost = restock.purchase_cost()?;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                &format!(
                    "UPDATE medicines SET stock = stock + $3
                      WHERE id = $1 AND tenant_id = $2
                      RETURNING {COLUMNS}"
                ),
                &[&id, &tenant.as_str(), &restock.quantity],
            )
            .await?
            .ok_or_else(|| AppError::not_found("Medicine", id))?;
        let medicine = from_row(&row);

        if let Some(cost) = cost {
            let entry = NewLedgerEntry::expense(
                category::PHARMACY_PURCHASE,
                cost,
                "medicine",
                medicine.id,
                format!(
                    "Restock {} x {} batch {}",
                    restock.quantity, medicine.name, medicine.batch
                ),
            );
            ledger::append_entry(&tx, tenant, &entry).await?;
        }

        tx.commit().await?;
        tracing::info!(
            tenant = %tenant,
            medicine_id = %medicine.id,
            quantity = restock.quantity,
            stock = medicine.stock,
            "Medicine restocked"
        );
        Ok(medicine)
    }

    /// Point-of-sale checkout.
    ///
    /// Medicines are locked in id order so concurrent sales of overlapping
    /// baskets queue instead of deadlocking. Stock, invoice, lines and the
    /// ledger entry commit together.
    pub async fn checkout(
        &self,
        tenant: &TenantId,
        request: SaleRequest,
    ) -> Result<PharmacyInvoice, AppError> {
        let ids: Vec<Uuid> = request
            .merged_items()?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let customer_name = request
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        if let Some(patient_id) = request.patient_id {
            ensure_patient(&tx, tenant, patient_id).await?;
        }
        if let Some(prescription_id) = request.prescription_id {
            check_prescription(&tx, tenant, prescription_id, request.patient_id).await?;
        }

        let stock: Vec<StockSnapshot> = tx
            .query(
                "SELECT id, name, batch, expiry_date, unit_price, stock FROM medicines
                  WHERE tenant_id = $1 AND id = ANY($2)
                  ORDER BY id
                  FOR UPDATE",
                &[&tenant.as_str(), &ids],
            )
            .await?
            .iter()
            .map(|row| StockSnapshot {
                id: row.get("id"),
                name: row.get("name"),
                batch: row.get("batch"),
                expiry_date: row.get("expiry_date"),
                unit_price: row.get("unit_price"),
                stock: row.get("stock"),
            })
            .collect();

        let plan = SalePlan::build(&request, &stock, Utc::now().date_naive())?;

        for line in &plan.lines {
            tx.execute(
                "UPDATE medicines SET stock = stock - $3 WHERE id = $1 AND tenant_id = $2",
                &[&line.medicine_id, &tenant.as_str(), &line.quantity],
            )
            .await?;
        }

        let number = next_document_number(&tx, tenant, DocumentKind::PharmacyInvoice).await?;
        let invoice_id = Uuid::new_v4();
        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO pharmacy_invoices
                       (id, tenant_id, number, patient_id, prescription_id, customer_name,
                        subtotal, discount, total, payment_method)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                     RETURNING {INVOICE_COLUMNS}"
                ),
                &[
                    &invoice_id,
                    &tenant.as_str(),
                    &number,
                    &request.patient_id,
                    &request.prescription_id,
                    &customer_name,
                    &plan.subtotal,
                    &plan.discount,
                    &plan.total,
                    &request.payment_method.as_str(),
                ],
            )
            .await?;

        for (line_no, line) in (1i32..).zip(&plan.lines) {
            tx.execute(
                "INSERT INTO pharmacy_invoice_lines
                   (invoice_id, line_no, medicine_id, medicine_name, batch, quantity,
                    unit_price, amount)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &invoice_id,
                    &line_no,
                    &line.medicine_id,
                    &line.medicine_name,
                    &line.batch,
                    &line.quantity,
                    &line.unit_price,
                    &line.amount,
                ],
            )
            .await?;
        }

        if plan.total > Decimal::ZERO {
            let entry = NewLedgerEntry::income(
                category::PHARMACY,
                plan.total,
                "pharmacy_invoice",
                invoice_id,
                format!("Pharmacy invoice {number}"),
            );
            ledger::append_entry(&tx, tenant, &entry).await?;
        }

        let invoice = invoice_from_row(&row, plan.lines)?;
        tx.commit().await?;

        tracing::info!(
            tenant = %tenant,
            invoice = %invoice.number,
            lines = invoice.lines.len(),
            total = %invoice.total,
            "Pharmacy sale completed"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(
        &self,
        tenant: &TenantId,
        id: Uuid,
    ) -> Result<Option<PharmacyInvoice>, AppError> {
        let client = self.pool.get().await?;
        let Some(row) = client
            .query_opt(
                &format!(
                    "SELECT {INVOICE_COLUMNS} FROM pharmacy_invoices
                      WHERE id = $1 AND tenant_id = $2"
                ),
                &[&id, &tenant.as_str()],
            )
            .await?
        else {
            return Ok(None);
        };

        let lines = client
            .query(
                &format!(
                    "SELECT {LINE_COLUMNS} FROM pharmacy_invoice_lines
                      WHERE invoice_id = $1
                      ORDER BY line_no"
                ),
                &[&id],
            )
            .await?
            .iter()
            .map(line_from_row)
            .collect();

        invoice_from_row(&row, lines).map(Some)
    }
}

/// A referenced prescription must exist and, with a patient given, be theirs
async fn check_prescription(
    tx: &Transaction<'_>,
    tenant: &TenantId,
    prescription_id: Uuid,
    patient_id: Option<Uuid>,
) -> Result<(), AppError> {
    let owner: Uuid = tx
        .query_opt(
            "SELECT patient_id FROM prescriptions WHERE id = $1 AND tenant_id = $2",
            &[&prescription_id, &tenant.as_str()],
        )
        .await?
        .ok_or_else(|| AppError::not_found("Prescription", prescription_id))?
        .get(0);
    match patient_id {
        Some(patient_id) if patient_id != owner => Err(AppError::BadRequest(format!(
            "Prescription/{prescription_id} belongs to another patient"
        ))),
        _ => Ok(()),
    }
}
