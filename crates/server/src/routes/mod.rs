mod admission;
mod appointment;
pub mod health;
mod lab;
mod ledger;
pub mod metadata;
pub mod metrics;
mod patient;
mod pharmacy;
mod prescription;

use axum::{
    Json, Router,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use deadpool_postgres::Pool;
use serde::Serialize;

/// UHID prefix new registrations are numbered under
#[derive(Debug, Clone)]
pub struct UhidPrefix(pub String);

/// Build the tenant-scoped `/api` routes
pub fn api_routes() -> Router<Pool> {
    Router::new()
        .route("/patients", get(patient::search).post(patient::register))
        .route("/patients/{id}", get(patient::read).put(patient::update))
        .route("/patients/uhid/{uhid}", get(patient::read_by_uhid))
        .route("/patients/{id}/prescriptions", get(prescription::for_patient))
        .route(
            "/appointments",
            get(appointment::search).post(appointment::create),
        )
        .route("/appointments/{id}", get(appointment::read))
        .route("/appointments/{id}/status", post(appointment::change_status))
        .route("/prescriptions", post(prescription::create))
        .route("/prescriptions/{id}", get(prescription::read))
        .route("/admissions", get(admission::search).post(admission::admit))
        .route("/admissions/{id}", get(admission::read))
        .route("/admissions/{id}/charges", post(admission::add_charge))
        .route("/admissions/{id}/notes", post(admission::add_note))
        .route("/admissions/{id}/surgeries", post(admission::add_surgery))
        .route("/admissions/{id}/discharge", post(admission::discharge))
        .route("/admissions/{id}/invoice", get(admission::invoice))
        .route("/medicines", get(pharmacy::search).post(pharmacy::create))
        .route("/medicines/{id}", get(pharmacy::read))
        .route("/medicines/{id}/restock", post(pharmacy::restock))
        .route("/pharmacy/invoices", post(pharmacy::checkout))
        .route("/pharmacy/invoices/{id}", get(pharmacy::read_invoice))
        .route("/lab/requests", get(lab::worklist).post(lab::create))
        .route("/lab/requests/{id}", get(lab::read))
        .route("/lab/requests/{id}/status", post(lab::change_status))
        .route("/ledger", get(ledger::search).post(ledger::append))
        .route("/ledger/summary", get(ledger::summary))
}

/// `201 Created` with a `Location` header
fn created<T: Serialize>(location: String, body: T) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response()
}

/// Request path and filters without the paging parameters, for page links
fn page_base(uri: &Uri) -> String {
    let filters: Vec<&str> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| {
            !pair.is_empty() && !pair.starts_with("_count=") && !pair.starts_with("_offset=")
        })
        .collect();
    if filters.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), filters.join("&"))
    }
}
