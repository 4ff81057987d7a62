//! HTTP-level integration tests for the `/diagnosis` endpoints.
//!
//! Requests go straight to the router via `tower::ServiceExt`. No
//! dispatcher runs here, so accepted uploads stay `processing`; terminal
//! states are produced through the repository layer.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, build_test_app_with, create_user, get, post_multipart,
    test_config, token_for, FakeImageHost, PNG_BYTES,
};
use serde_json::json;
use sikjipsa_core::diagnosis::{synthesize, DiseaseCandidate, HealthSignal, PlantCandidate};
use sikjipsa_db::models::diagnosis::CompleteDiagnosis;
use sikjipsa_db::repositories::{DiagnosisJobRepo, DiagnosisRepo};
use sqlx::PgPool;

const ANALYZE: &str = "/api/v1/diagnosis/analyze";
const HISTORY: &str = "/api/v1/diagnosis/history";

fn result_uri(id: i64) -> String {
    format!("/api/v1/diagnosis/result/{id}")
}

fn monstera_outcome() -> CompleteDiagnosis {
    let synthesized = synthesize(
        Some(&[PlantCandidate {
            name: "Monstera deliciosa".into(),
            probability: 0.92,
        }]),
        Some(&HealthSignal {
            is_healthy: false,
            probability: 0.15,
            diseases: vec![
                DiseaseCandidate {
                    name: "Leaf spot".into(),
                    probability: 0.45,
                },
                DiseaseCandidate {
                    name: "Root rot".into(),
                    probability: 0.05,
                },
            ],
        }),
    );
    CompleteDiagnosis::from_synthesis(&synthesized, json!({ "identification": null, "health": {} }))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_returns_processing_diagnosis(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, token) = create_user(&pool, "grower@test.com").await;

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[
            ("image", Some("leaf.PNG"), PNG_BYTES),
            ("latitude", None, "37.5665".as_bytes()),
            ("longitude", None, "not-a-number".as_bytes()),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Analysis started");
    assert_eq!(json["status"], "processing");
    let id = json["diagnosis_id"].as_i64().unwrap();

    let uploads = app.image_host.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].folder, "sikjipsa/diagnosis");
    assert_eq!(
        uploads[0].transformation.as_deref(),
        Some("c_limit,w_1500,h_1500,q_auto:good")
    );

    let job = DiagnosisJobRepo::find_by_diagnosis(&pool, id)
        .await
        .unwrap()
        .expect("upload enqueues a job");
    assert!(job.image_data_url.starts_with("data:image/png;base64,"));
    assert_eq!(job.latitude, Some(37.5665));
    assert_eq!(job.longitude, None);

    let response = get(&app.router, &result_uri(id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], id);
    assert_eq!(json["status"], "processing");
    assert_eq!(json["image_url"], "https://img.test/sikjipsa/diagnosis/1.jpg");
    assert!(json["plant_name"].is_null());
    assert!(json.get("diseases").is_none());
    assert!(json.get("suggestions").is_none());
    assert!(json.get("error_message").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_image_part_is_the_one_analyzed(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, token) = create_user(&pool, "grower@test.com").await;

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[
            ("image", Some("leaf.png"), PNG_BYTES),
            ("image", Some("notes.txt"), "not an image".as_bytes()),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let uploads = app.image_host.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name, "leaf.png");
    assert_eq!(uploads[0].bytes, PNG_BYTES);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_wakes_the_worker_pool(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, token) = create_user(&pool, "grower@test.com").await;

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[("image", Some("leaf.jpg"), PNG_BYTES)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // notify_one stores a permit when nobody is waiting yet.
    tokio::time::timeout(std::time::Duration::from_secs(1), app.queue.notified())
        .await
        .expect("upload should notify the dispatcher");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_without_token_is_401(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_multipart(
        &app.router,
        ANALYZE,
        None,
        &[("image", Some("leaf.jpg"), PNG_BYTES)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_with_garbage_token_is_401(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some("not-a-jwt"),
        &[("image", Some("leaf.jpg"), PNG_BYTES)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_for_unknown_user_is_401(pool: PgPool) {
    let app = build_test_app(pool);
    let token = token_for(424_242, "ghost@test.com");

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[("image", Some("leaf.jpg"), PNG_BYTES)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_without_image_is_400(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, token) = create_user(&pool, "grower@test.com").await;

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[("latitude", None, "37.5".as_bytes())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "No image file provided");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_with_unsupported_extension_is_400(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, token) = create_user(&pool, "grower@test.com").await;

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[("image", Some("notes.pdf"), "%PDF-1.7".as_bytes())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(app.image_host.uploads.lock().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn oversized_image_is_400(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, token) = create_user(&pool, "grower@test.com").await;
    let big = vec![0u8; 10 * 1024 * 1024 + 1];

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[("image", Some("huge.jpg"), big.as_slice())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_without_provider_key_is_503(pool: PgPool) {
    let mut config = test_config();
    config.plant_id.api_key = None;
    let app = build_test_app_with(pool.clone(), config, FakeImageHost::default());
    let (_, token) = create_user(&pool, "grower@test.com").await;

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[("image", Some("leaf.jpg"), PNG_BYTES)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "SERVICE_UNAVAILABLE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn image_host_failure_is_500_and_records_nothing(pool: PgPool) {
    let host = FakeImageHost {
        fail: true,
        ..FakeImageHost::default()
    };
    let app = build_test_app_with(pool.clone(), test_config(), host);
    let (user_id, token) = create_user(&pool, "grower@test.com").await;

    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(&token),
        &[("image", Some("leaf.jpg"), PNG_BYTES)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");

    assert!(DiagnosisRepo::list_by_user(&pool, user_id)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_quota_is_enforced(pool: PgPool) {
    let mut config = test_config();
    config.upload_rate_limit_per_hour = 1;
    let app = build_test_app_with(pool.clone(), config, FakeImageHost::default());
    let (_, token) = create_user(&pool, "grower@test.com").await;
    let parts = [("image", Some("leaf.jpg"), PNG_BYTES)];

    let first = post_multipart(&app.router, ANALYZE, Some(&token), &parts).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post_multipart(&app.router, ANALYZE, Some(&token), &parts).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(second).await["code"], "RATE_LIMITED");

    let (_, other) = create_user(&pool, "other@test.com").await;
    let third = post_multipart(&app.router, ANALYZE, Some(&other), &parts).await;
    assert_eq!(third.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Result polling
// ---------------------------------------------------------------------------

async fn upload(app: &common::TestApp, token: &str) -> i64 {
    let response = post_multipart(
        &app.router,
        ANALYZE,
        Some(token),
        &[("image", Some("leaf.jpg"), PNG_BYTES)],
    )
    .await;
    body_json(response).await["diagnosis_id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_result_is_404(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app.router, &result_uri(999_999), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completed_result_is_stable_across_polls(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, token) = create_user(&pool, "grower@test.com").await;
    let id = upload(&app, &token).await;

    assert!(DiagnosisRepo::complete(&pool, id, &monstera_outcome())
        .await
        .unwrap());

    let first = body_json(get(&app.router, &result_uri(id), None).await).await;
    let second = body_json(get(&app.router, &result_uri(id), None).await).await;
    assert_eq!(first, second);

    assert_eq!(first["status"], "completed");
    assert_eq!(first["plant_name"], "Monstera deliciosa");
    assert_eq!(first["scientific_name"], "Monstera deliciosa");
    assert_eq!(first["confidence"], 92.0);
    assert_eq!(first["is_healthy"], false);
    assert_eq!(first["health_confidence"], 15.0);

    let diseases = first["diseases"].as_array().unwrap();
    assert_eq!(diseases.len(), 1);
    assert_eq!(diseases[0]["disease_name"], "Leaf spot");
    assert_eq!(diseases[0]["confidence"], 45.0);

    let suggestions = first["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["category"], "disease_treatment");

    assert!(first.get("error_message").is_none());
    assert!(first.get("api_response").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_result_exposes_only_the_error(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, token) = create_user(&pool, "grower@test.com").await;
    let id = upload(&app, &token).await;

    DiagnosisRepo::fail(&pool, id, "Health assessment failed: API error 500: boom")
        .await
        .unwrap();

    let json = body_json(get(&app.router, &result_uri(id), None).await).await;
    assert_eq!(json["status"], "failed");
    assert_eq!(
        json["error_message"],
        "Health assessment failed: API error 500: boom"
    );
    assert!(json.get("diseases").is_none());
    assert!(json.get("suggestions").is_none());
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn history_requires_auth(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(&app.router, HISTORY, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn history_lists_only_the_callers_records_newest_first(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, alice) = create_user(&pool, "alice@test.com").await;
    let (_, bob) = create_user(&pool, "bob@test.com").await;

    let first = upload(&app, &alice).await;
    let second = upload(&app, &alice).await;
    let bobs = upload(&app, &bob).await;
    DiagnosisRepo::complete(&pool, first, &monstera_outcome())
        .await
        .unwrap();

    let response = get(&app.router, HISTORY, Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let entries = json.as_array().unwrap();

    let ids: Vec<i64> = entries.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, [second, first]);
    assert!(!ids.contains(&bobs));

    assert_eq!(entries[0]["status"], "processing");
    assert_eq!(entries[1]["status"], "completed");
    assert_eq!(entries[1]["plant_name"], "Monstera deliciosa");
    assert!(entries[1].get("api_response").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_endpoint_reports_database(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app.router, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["plant_id_configured"], true);
    assert_eq!(json["image_host_configured"], true);
}
