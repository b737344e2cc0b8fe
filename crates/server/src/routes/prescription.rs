//! Prescription handlers

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use deadpool_postgres::Pool;
use hims_core::{NewPrescription, TenantId};
use uuid::Uuid;

use super::created;
use crate::db::PrescriptionRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};

/// POST /api/prescriptions
pub async fn create(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiJson(body): ApiJson<NewPrescription>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PrescriptionRepository::new(pool);
    let prescription = repo.create(&tenant, body).await?;
    Ok(created(
        format!("/api/prescriptions/{}", prescription.id),
        prescription,
    ))
}

/// GET /api/prescriptions/{id}
pub async fn read(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PrescriptionRepository::new(pool);
    repo.get(&tenant, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Prescription", id))
}

/// GET /api/patients/{id}/prescriptions - Newest first
pub async fn for_patient(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(patient_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PrescriptionRepository::new(pool);
    repo.list_for_patient(&tenant, patient_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Patient", patient_id))
}
