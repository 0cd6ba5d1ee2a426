use actix_web::{get, HttpResponse};

/// Liveness of the service itself, independent of the checks it runs.
#[get("")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
