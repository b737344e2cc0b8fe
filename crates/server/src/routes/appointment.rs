//! Appointment handlers

use axum::{
    Extension, Json,
    extract::{OriginalUri, State},
    response::IntoResponse,
};
use deadpool_postgres::Pool;
use hims_core::{NewAppointment, Page, StatusChange, TenantId};
use uuid::Uuid;

use super::{created, page_base};
use crate::db::{AppointmentFilter, AppointmentRepository};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

/// POST /api/appointments - Book a slot with a doctor
pub async fn create(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiJson(body): ApiJson<NewAppointment>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AppointmentRepository::new(pool);
    let appointment = repo.create(&tenant, body).await?;
    Ok(created(
        format!("/api/appointments/{}", appointment.id),
        appointment,
    ))
}

/// GET /api/appointments/{id}
pub async fn read(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AppointmentRepository::new(pool);
    repo.get(&tenant, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Appointment", id))
}

/// GET /api/appointments?doctor=&date=&status=&patient_id=
pub async fn search(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AppointmentRepository::new(pool);
    let (total, appointments) = repo.search(&tenant, &filter).await?;
    Ok(Json(Page::new(
        &page_base(&uri),
        filter.page(),
        total,
        appointments,
    )))
}

/// POST /api/appointments/{id}/status
pub async fn change_status(
    State(pool): State<Pool>,
    Extension(tenant): Extension<TenantId>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusChange>,
) -> Result<impl IntoResponse, AppError> {
    let repo = AppointmentRepository::new(pool);
    Ok(Json(repo.change_status(&tenant, id, body).await?))
}
