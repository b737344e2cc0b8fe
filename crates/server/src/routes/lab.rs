//! Laboratory request handlers

use axum::{
    Extension, Json,
    extract::{OriginalUri, State},
    response::IntoResponse,
};
use deadpool_postgres::Pool;
use hims_core::{LabStatusChange, NewLabRequest, Page, TenantId};
use uuid::Uuid;

use super::{created, page_base};
use crate::db::{LabFilter, LabRepository};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

/// POST /api/lab/requests
pub async fn create(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiJson(body): ApiJson<NewLabRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = LabRepository::new(pool);
    let request = repo.create(&tenant, body).await?;
    Ok(created(format!("/api/lab/requests/{}", request.id), request))
}

/// GET /api/lab/requests/{id}
pub async fn read(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = LabRepository::new(pool);
    repo.get(&tenant, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("LabRequest", id))
}

/// GET /api/lab/requests?status=&priority=
pub async fn worklist(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<LabFilter>,
) -> Result<impl IntoResponse, AppError> {
    let repo = LabRepository::new(pool);
    let (total, requests) = repo.worklist(&tenant, &filter).await?;
    Ok(Json(Page::new(&page_base(&uri), filter.page(), total, requests)))
}

/// POST /api/lab/requests/{id}/status
pub async fn change_status(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<LabStatusChange>,
) -> Result<impl IntoResponse, AppError> {
    let repo = LabRepository::new(pool);
    Ok(Json(repo.change_status(&tenant, id, body).await?))
}
