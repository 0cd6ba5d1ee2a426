mod common;

use common::{build_engine, security_catalog, spawn_app, wait_until, GatedRemediator, ScriptedRunner, TestApp};
use platform_health::health::EngineOptions;
use serde_json::Value;
use std::sync::atomic::Ordering;

async fn spawn_security_app() -> TestApp {
    spawn_app(build_engine(
        security_catalog(),
        ScriptedRunner::with_scores(&[
            ("phi-encryption", 95.0),
            ("mfa-coverage", 78.0),
            ("audit-log", 60.0),
        ]),
        GatedRemediator::new(),
        EngineOptions::default(),
    ))
    .await
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_security_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/health_check", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn report_is_unavailable_until_first_run() {
    let app = spawn_security_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/health/report", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(503, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 503);

    let response = client
        .post(&format!("{}/health/runs", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["item"]["overall_score"], 78);
    assert_eq!(body["item"]["new_alert_ids"][0], "audit-log");

    let response = client
        .get(&format!("{}/health/report", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let checks = body["item"]["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 3);
    assert_eq!(checks[1]["status"], "warning");
    assert_eq!(body["item"]["categories"][0]["score"], 78);
}

#[tokio::test]
async fn history_endpoint_tracks_known_checks() {
    let app = spawn_security_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/health/checks/audit-log/history", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());

    for _ in 0..2 {
        client
            .post(&format!("{}/health/runs", &app.address))
            .send()
            .await
            .expect("Failed to execute request.");
    }

    let response = client
        .get(&format!("{}/health/checks/audit-log/history", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["item"]["scores"], serde_json::json!([60, 60]));
    assert_eq!(body["item"]["trend"], "stable");
}

#[tokio::test]
async fn autofix_endpoints_enforce_single_task() {
    let app = spawn_security_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/health/checks/mfa-coverage/autofix", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(422, response.status().as_u16());

    let first = {
        let client = client.clone();
        let url = format!("{}/health/checks/audit-log/autofix", &app.address);
        tokio::spawn(async move { client.post(&url).send().await })
    };
    let remediator = app.engine.remediator.clone();
    wait_until(|| remediator.calls.load(Ordering::SeqCst) == 1).await;

    let response = client
        .post(&format!("{}/health/checks/audit-log/autofix", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(409, response.status().as_u16());

    let response = client
        .get(&format!("{}/health/autofix", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["list"][0]["check_id"], "audit-log");

    app.engine.remediator.release.notify_one();
    let response = first.await.unwrap().expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let response = client
        .delete(&format!("{}/health/checks/audit-log/autofix", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn status_reports_last_run() {
    let app = spawn_security_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/health/status", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["item"]["phase"], "idle");
    assert!(body["item"]["last_run"].is_null());

    client
        .post(&format!("{}/health/runs", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    let response = client
        .get(&format!("{}/health/status", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["item"]["last_run"]["outcome"], "succeeded");
    assert_eq!(body["item"]["last_run"]["trigger"], "manual");
    assert_eq!(body["item"]["tracked_checks"], 3);
    assert_eq!(body["item"]["active_alerts"], 1);
}

#[tokio::test]
async fn manual_run_ignores_request_body() {
    let app = spawn_security_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/health/runs", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["item"]["overall_score"], 78);
}
