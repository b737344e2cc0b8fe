//! Patient registration and lookup handlers

use axum::{
    Extension, Json,
    extract::{OriginalUri, State},
    response::IntoResponse,
};
use deadpool_postgres::Pool;
use hims_core::{NewPatient, Page, TenantId, Uhid};
use uuid::Uuid;

use super::{UhidPrefix, created, page_base};
use crate::db::{PatientFilter, PatientRepository};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

/// POST /api/patients - Register a patient and assign a UHID
pub async fn register(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    Extension(UhidPrefix(prefix)): Extension<UhidPrefix>,
    ApiJson(body): ApiJson<NewPatient>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PatientRepository::new(pool);
    let patient = repo.register(&tenant, &prefix, body).await?;
    Ok(created(format!("/api/patients/{}", patient.id), patient))
}

/// GET /api/patients/{id}
pub async fn read(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PatientRepository::new(pool);
    repo.get(&tenant, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Patient", id))
}

/// GET /api/patients/uhid/{uhid}
pub async fn read_by_uhid(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(raw): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let uhid: Uhid = raw.parse()?;
    let repo = PatientRepository::new(pool);
    repo.get_by_uhid(&tenant, &uhid)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Patient", &uhid))
}

/// PUT /api/patients/{id} - Replace demographics; the UHID never changes
pub async fn update(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<NewPatient>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PatientRepository::new(pool);
    repo.update(&tenant, id, body)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Patient", id))
}

/// GET /api/patients?name=&phone=
pub async fn search(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<PatientFilter>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PatientRepository::new(pool);
    let (total, patients) = repo.search(&tenant, &filter).await?;
    Ok(Json(Page::new(&page_base(&uri), filter.page(), total, patients)))
}
