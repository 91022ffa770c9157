/// Health check handlers
use actix_web::HttpResponse;
use serde_json::json;

/// GET /api/v1/health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses((status = 200, description = "Service is healthy"))
)]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "identity-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
