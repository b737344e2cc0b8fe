use chrono::NaiveDate;
use deadpool_postgres::Pool;
use hims_core::{
    CategoryTotal, EntryKind, LedgerEntry, LedgerSummary, NewLedgerEntry, PageParams, TenantId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_postgres::{Row, Transaction};
use uuid::Uuid;

use super::text_column;
use crate::error::AppError;

const COLUMNS: &str =
    "id, kind, category, amount, description, reference_type, reference_id, recorded_at";

fn from_row(row: &Row) -> Result<LedgerEntry, AppError> {
    Ok(LedgerEntry {
        id: row.get("id"),
        kind: text_column(row, "kind")?,
        category: row.get("category"),
        amount: row.get("amount"),
        description: row.get("description"),
        reference_type: row.get("reference_type"),
        reference_id: row.get("reference_id"),
        recorded_at: row.get("recorded_at"),
    })
}

/// Append an entry inside the caller's transaction.
///
/// Billing workflows call this so that the ledger entry commits or rolls
/// back together with the invoice it records.
pub(crate) async fn append_entry(
    tx: &Transaction<'_>,
    tenant: &TenantId,
    entry: &NewLedgerEntry,
) -> Result<LedgerEntry, AppError> {
    let row = tx
        .query_one(
            &format!(
                "INSERT INTO ledger_entries
                   (id, tenant_id, kind, category, amount, description, reference_type, reference_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING {COLUMNS}"
            ),
            &[
                &Uuid::new_v4(),
                &tenant.as_str(),
                &entry.kind.as_str(),
                &entry.category,
                &entry.amount,
                &entry.description,
                &entry.reference_type,
                &entry.reference_id,
            ],
        )
        .await?;
    from_row(&row)
}

/// Query parameters for ledger search and summary
#[derive(Debug, Deserialize, Default)]
pub struct LedgerFilter {
    pub kind: Option<EntryKind>,
    pub category: Option<String>,
    /// Inclusive start day
    pub from: Option<NaiveDate>,
    /// Inclusive end day
    pub to: Option<NaiveDate>,
    #[serde(rename = "_count")]
    pub count: Option<i64>,
    #[serde(rename = "_offset")]
    pub offset: Option<i64>,
}

impl LedgerFilter {
    pub fn page(&self) -> PageParams {
        PageParams::new(self.count, self.offset)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(AppError::BadRequest(
                "'from' must not be after 'to'".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

const FILTER: &str = "tenant_id = $1
    AND ($2::text IS NULL OR kind = $2)
    AND ($3::text IS NULL OR category = $3)
    AND ($4::date IS NULL OR recorded_at >= $4::date)
    AND ($5::date IS NULL OR recorded_at < $5::date + 1)";

/// Repository for the append-only ledger
#[derive(Clone)]
pub struct LedgerRepository {
    pool: Pool,
}

impl LedgerRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Record a manual entry
    pub async fn append(
        &self,
        tenant: &TenantId,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, AppError> {
        let entry = entry.normalize()?;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let recorded = append_entry(&tx, tenant, &entry).await?;
        tx.commit().await?;
        Ok(recorded)
    }

    /// Search entries, newest first; returns the total match count and the page
    pub async fn search(
        &self,
        tenant: &TenantId,
        filter: &LedgerFilter,
    ) -> Result<(i64, Vec<LedgerEntry>), AppError> {
        let client = self.pool.get().await?;
        let kind = filter.kind.map(EntryKind::as_str);
        let page = filter.page();

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM ledger_entries WHERE {FILTER}"),
                &[&tenant.as_str(), &kind, &filter.category, &filter.from, &filter.to],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM ledger_entries WHERE {FILTER}
                     ORDER BY recorded_at DESC, id
                     LIMIT $6 OFFSET $7"
                ),
                &[
                    &tenant.as_str(),
                    &kind,
                    &filter.category,
                    &filter.from,
                    &filter.to,
                    &page.limit(),
                    &page.offset(),
                ],
            )
            .await?;

        let entries = rows.iter().map(from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((total, entries))
    }

    /// Income/expense totals per category over the filtered period
    pub async fn summary(
        &self,
        tenant: &TenantId,
        filter: &LedgerFilter,
    ) -> Result<LedgerSummary, AppError> {
        let client = self.pool.get().await?;
        let kind = filter.kind.map(EntryKind::as_str);

        let rows = client
            .query(
                &format!(
                    "SELECT kind, category, SUM(amount) AS total FROM ledger_entries
                     WHERE {FILTER}
                     GROUP BY kind, category"
                ),
                &[&tenant.as_str(), &kind, &filter.category, &filter.from, &filter.to],
            )
            .await?;

        let totals = rows
            .iter()
            .map(|row| {
                Ok(CategoryTotal {
                    kind: text_column(row, "kind")?,
                    category: row.get("category"),
                    total: row.get::<_, Option<Decimal>>("total").unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(LedgerSummary::from_totals(totals))
    }
}
