//! Pharmacy stock and checkout handlers

use axum::{
    Extension, Json,
    extract::{OriginalUri, State},
    response::IntoResponse,
};
use deadpool_postgres::Pool;
use hims_core::{NewMedicine, Page, Restock, SaleRequest, TenantId};
use uuid::Uuid;

use super::{created, page_base};
use crate::db::{MedicineFilter, PharmacyRepository};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

/// POST /api/medicines
pub async fn create(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiJson(body): ApiJson<NewMedicine>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PharmacyRepository::new(pool);
    let medicine = repo.create_medicine(&tenant, body).await?;
    Ok(created(format!("/api/medicines/{}", medicine.id), medicine))
}

/// GET /api/medicines/{id}
pub async fn read(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PharmacyRepository::new(pool);
    repo.get_medicine(&tenant, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Medicine", id))
}

/// GET /api/medicines?name=&low_stock=true
pub async fn search(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<MedicineFilter>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PharmacyRepository::new(pool);
    let (total, medicines) = repo.search_medicines(&tenant, &filter).await?;
    Ok(Json(Page::new(
        &page_base(&uri),
        filter.page(),
        total,
        medicines,
    )))
}

/// POST /api/medicines/{id}/restock
pub async fn restock(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Restock>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PharmacyRepository::new(pool);
    Ok(Json(repo.restock(&tenant, id, body).await?))
}

/// POST /api/pharmacy/invoices - Sell medicines and issue an invoice
pub async fn checkout(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiJson(body): ApiJson<SaleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PharmacyRepository::new(pool);
    let invoice = repo.checkout(&tenant, body).await?;
    Ok(created(
        format!("/api/pharmacy/invoices/{}", invoice.id),
        invoice,
    ))
}

/// GET /api/pharmacy/invoices/{id}
pub async fn read_invoice(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PharmacyRepository::new(pool);
    repo.get_invoice(&tenant, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("PharmacyInvoice", id))
}
