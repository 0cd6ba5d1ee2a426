use crate::health::{EngineError, HealthEngine, RunOutcome, RunTrigger};
use crate::helpers::JsonResponse;
use actix_web::{delete, get, post, web, HttpResponse, Result};
use std::sync::Arc;

#[tracing::instrument(name = "Get health report", skip(engine))]
#[get("/report")]
pub async fn report_handler(
    engine: web::Data<Arc<HealthEngine>>,
) -> Result<HttpResponse, EngineError> {
    let report = engine.latest_report().await?;
    Ok(JsonResponse::build().set_item(report).ok())
}

#[tracing::instrument(name = "Trigger health run", skip(engine))]
#[post("/runs")]
pub async fn run_handler(engine: web::Data<Arc<HealthEngine>>) -> Result<HttpResponse, EngineError> {
    match engine.run_once(RunTrigger::Manual).await? {
        RunOutcome::Completed(report) => Ok(JsonResponse::build()
            .set_item(report)
            .set_msg("Health run completed")
            .ok()),
        RunOutcome::Coalesced => Ok(JsonResponse::<()>::build()
            .set_msg("A health run is already in progress")
            .conflict()),
    }
}

#[tracing::instrument(name = "Get engine status", skip(engine))]
#[get("/status")]
pub async fn status_handler(engine: web::Data<Arc<HealthEngine>>) -> HttpResponse {
    let status = engine.status().await;
    JsonResponse::build().set_item(status).ok()
}

#[tracing::instrument(name = "Get check history", skip(engine))]
#[get("/checks/{check_id}/history")]
pub async fn history_handler(
    path: web::Path<String>,
    engine: web::Data<Arc<HealthEngine>>,
) -> Result<HttpResponse, EngineError> {
    let history = engine.history(&path.into_inner()).await?;
    Ok(JsonResponse::build().set_item(history).ok())
}

#[tracing::instrument(name = "Request auto-fix", skip(engine))]
#[post("/checks/{check_id}/autofix")]
pub async fn autofix_handler(
    path: web::Path<String>,
    engine: web::Data<Arc<HealthEngine>>,
) -> Result<HttpResponse, EngineError> {
    let check_id = path.into_inner();
    let outcome = engine.request_auto_fix(&check_id).await?;
    Ok(JsonResponse::build()
        .set_msg(format!("Auto-fix for {} completed", check_id))
        .set_item(outcome)
        .ok())
}

#[tracing::instrument(name = "Cancel auto-fix", skip(engine))]
#[delete("/checks/{check_id}/autofix")]
pub async fn cancel_autofix_handler(
    path: web::Path<String>,
    engine: web::Data<Arc<HealthEngine>>,
) -> HttpResponse {
    let check_id = path.into_inner();
    if engine.cancel_auto_fix(&check_id) {
        JsonResponse::<()>::build()
            .set_msg(format!("Auto-fix for {} cancelled", check_id))
            .ok()
    } else {
        JsonResponse::<()>::build()
            .set_msg(format!("No auto-fix in progress for {}", check_id))
            .not_found()
    }
}

#[tracing::instrument(name = "List in-flight auto-fixes", skip(engine))]
#[get("/autofix")]
pub async fn autofix_list_handler(engine: web::Data<Arc<HealthEngine>>) -> HttpResponse {
    JsonResponse::build()
        .set_list(engine.auto_fixes_in_flight())
        .ok()
}
