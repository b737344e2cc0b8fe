//! Metadata endpoint handler

use axum::Json;
use hims_core::ServiceMetadata;

/// GET /metadata - Describe the service and its modules
pub async fn get() -> Json<ServiceMetadata> {
    Json(ServiceMetadata::new())
}
