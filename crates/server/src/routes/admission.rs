//! In-patient admission handlers

use axum::{
    Extension, Json,
    extract::{OriginalUri, State},
    response::IntoResponse,
};
use deadpool_postgres::Pool;
use hims_core::{DischargeRequest, NewAdmission, NewCharge, NewNote, NewSurgery, Page, TenantId};
use uuid::Uuid;

use super::{created, page_base};
use crate::db::{AdmissionFilter, AdmissionRepository};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

/// POST /api/admissions - Admit a patient to a ward bed
pub async fn admit(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiJson(body): ApiJson<NewAdmission>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AdmissionRepository::new(pool);
    let admission = repo.admit(&tenant, body).await?;
    Ok(created(format!("/api/admissions/{}", admission.id), admission))
}

/// GET /api/admissions/{id} - Admission with its records and a bill preview
pub async fn read(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AdmissionRepository::new(pool);
    repo.detail(&tenant, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Admission", id))
}

/// GET /api/admissions?status=&ward=
pub async fn search(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<AdmissionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AdmissionRepository::new(pool);
    let (total, admissions) = repo.search(&tenant, &filter).await?;
    Ok(Json(Page::new(
        &page_base(&uri),
        filter.page(),
        total,
        admissions,
    )))
}

/// POST /api/admissions/{id}/charges
pub async fn add_charge(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<NewCharge>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AdmissionRepository::new(pool);
    let charge = repo.add_charge(&tenant, id, body).await?;
    Ok(created(format!("/api/admissions/{id}"), charge))
}

/// POST /api/admissions/{id}/notes
pub async fn add_note(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<NewNote>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AdmissionRepository::new(pool);
    let note = repo.add_note(&tenant, id, body).await?;
    Ok(created(format!("/api/admissions/{id}"), note))
}

/// POST /api/admissions/{id}/surgeries
pub async fn add_surgery(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<NewSurgery>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AdmissionRepository::new(pool);
    let surgery = repo.add_surgery(&tenant, id, body).await?;
    Ok(created(format!("/api/admissions/{id}"), surgery))
}

/// POST /api/admissions/{id}/discharge - Close the stay and issue its invoice
pub async fn discharge(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<DischargeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AdmissionRepository::new(pool);
    let invoice = repo.discharge(&tenant, id, body).await?;
    Ok(created(format!("/api/admissions/{id}/invoice"), invoice))
}

/// GET /api/admissions/{id}/invoice
pub async fn invoice(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AdmissionRepository::new(pool);
    repo.invoice(&tenant, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Admission/{id} has no discharge invoice")))
}
