//! Ledger handlers. Entries are never updated or deleted.

use axum::{
    Extension, Json,
    extract::{OriginalUri, State},
    response::IntoResponse,
};
use deadpool_postgres::Pool;
use hims_core::{NewLedgerEntry, Page, TenantId};

use super::{created, page_base};
use crate::db::{LedgerFilter, LedgerRepository};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiQuery};

/// POST /api/ledger - Record a manual income or expense
pub async fn append(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiJson(body): ApiJson<NewLedgerEntry>,
) -> Result<impl IntoResponse, AppError> {
    let repo = LedgerRepository::new(pool);
    let entry = repo.append(&tenant, body).await?;
    Ok(created(format!("/api/ledger?category={}", entry.category), entry))
}

/// GET /api/ledger?kind=&category=&from=&to= - Newest first
pub async fn search(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<LedgerFilter>,
) -> Result<impl IntoResponse, AppError> {
    filter.validate()?;
    let repo = LedgerRepository::new(pool);
    let (total, entries) = repo.search(&tenant, &filter).await?;
    Ok(Json(Page::new(&page_base(&uri), filter.page(), total, entries)))
}

/// GET /api/ledger/summary?from=&to=
pub async fn summary(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiQuery(filter): ApiQuery<LedgerFilter>,
) -> Result<impl IntoResponse, AppError> {
    filter.validate()?;
    let repo = LedgerRepository::new(pool);
    Ok(Json(repo.summary(&tenant, &filter).await?))
}
