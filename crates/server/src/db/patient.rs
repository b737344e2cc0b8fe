use chrono::Utc;
use deadpool_postgres::Pool;
use hims_core::{NewPatient, PageParams, Patient, TenantId, Uhid};
use serde::Deserialize;
use tokio_postgres::Row;
use uuid::Uuid;

use super::{escape_like, opt_text_column, text_column};
use crate::error::AppError;

const COLUMNS: &str = "id, uhid, full_name, gender, birth_date, phone, email, address, \
                       blood_group, created_at, updated_at";

fn from_row(row: &Row) -> Result<Patient, AppError> {
    Ok(Patient {
        id: row.get("id"),
        uhid: row.get("uhid"),
        full_name: row.get("full_name"),
        gender: text_column(row, "gender")?,
        birth_date: row.get("birth_date"),
        phone: row.get("phone"),
        email: row.get("email"),
        address: row.get("address"),
        blood_group: opt_text_column(row, "blood_group")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Query parameters for patient search
#[derive(Debug, Deserialize, Default)]
pub struct PatientFilter {
    /// Case-insensitive substring of the full name
    pub name: Option<String>,
    /// Phone prefix; formatting characters are ignored
    pub phone: Option<String>,
    #[serde(rename = "_count")]
    pub count: Option<i64>,
    #[serde(rename = "_offset")]
    pub offset: Option<i64>,
}

impl PatientFilter {
    pub fn page(&self) -> PageParams {
        PageParams::new(self.count, self.offset)
    }

    fn name_pattern(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", escape_like(n)))
    }

    fn phone_pattern(&self) -> Option<String> {
        self.phone
            .as_deref()
            .map(|p| p.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|p| !p.is_empty())
            .map(|p| format!("{p}%"))
    }
}

/// Repository for patient registration and lookup
#[derive(Clone)]
pub struct PatientRepository {
    pool: Pool,
}

impl PatientRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Register a new patient, assigning the next UHID for the tenant
    pub async fn register(
        &self,
        tenant: &TenantId,
        uhid_prefix: &str,
        patient: NewPatient,
    ) -> Result<Patient, AppError> {
        let p = patient.normalize(Utc::now().date_naive())?;
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO patients
                       (id, tenant_id, uhid, full_name, gender, birth_date, phone, email,
                        address, blood_group)
                     VALUES ($1, $2, hims_next_uhid($2, $3), $4, $5, $6, $7, $8, $9, $10)
                     RETURNING {COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &tenant.as_str(),
                    &uhid_prefix,
                    &p.full_name,
                    &p.gender.as_str(),
                    &p.birth_date,
                    &p.phone,
                    &p.email,
                    &p.address,
                    &p.blood_group.map(|b| b.as_str()),
                ],
            )
            .await?;
        let created = from_row(&row)?;
        tx.commit().await?;

        tracing::info!(tenant = %tenant, patient_id = %created.id, uhid = %created.uhid, "Patient registered");
        Ok(created)
    }

    /// Get a patient by ID
    pub async fn get(&self, tenant: &TenantId, id: Uuid) -> Result<Option<Patient>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM patients WHERE id = $1 AND tenant_id = $2"),
                &[&id, &tenant.as_str()],
            )
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// Get a patient by UHID
    pub async fn get_by_uhid(
        &self,
        tenant: &TenantId,
        uhid: &Uhid,
    ) -> Result<Option<Patient>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {COLUMNS} FROM patients WHERE uhid = $1 AND tenant_id = $2"),
                &[&uhid.to_string(), &tenant.as_str()],
            )
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// Replace a patient's demographics; the UHID never changes
    pub async fn update(
        &self,
        tenant: &TenantId,
        id: Uuid,
        patient: NewPatient,
    ) -> Result<Option<Patient>, AppError> {
        let p = patient.normalize(Utc::now().date_naive())?;
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "UPDATE patients
                        SET full_name = $3, gender = $4, birth_date = $5, phone = $6,
                            email = $7, address = $8, blood_group = $9, updated_at = now()
                      WHERE id = $1 AND tenant_id = $2
                     RETURNING {COLUMNS}"
                ),
                &[
                    &id,
                    &tenant.as_str(),
                    &p.full_name,
                    &p.gender.as_str(),
                    &p.birth_date,
                    &p.phone,
                    &p.email,
                    &p.address,
                    &p.blood_group.map(|b| b.as_str()),
                ],
            )
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    /// Search patients; returns the total match count and the requested page
    pub async fn search(
        &self,
        tenant: &TenantId,
        filter: &PatientFilter,
    ) -> Result<(i64, Vec<Patient>), AppError> {
        let client = self.pool.get().await?;
        let name = filter.name_pattern();
        let phone = filter.phone_pattern();
        let page = filter.page();
        let condition = "tenant_id = $1
            AND ($2::text IS NULL OR full_name ILIKE $2)
            AND ($3::text IS NULL OR phone LIKE $3)";

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM patients WHERE {condition}"),
                &[&tenant.as_str(), &name, &phone],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM patients WHERE {condition}
                     ORDER BY full_name, created_at
                     LIMIT $4 OFFSET $5"
                ),
                &[&tenant.as_str(), &name, &phone, &page.limit(), &page.offset()],
            )
            .await?;

        let patients = rows.iter().map(from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((total, patients))
    }
}
