use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use arena_combat_server::app::AppState;
use arena_combat_server::combat::{ArenaRules, CombatManager, SequentialIds};
use arena_combat_server::config::Config;
use arena_combat_server::http::build_router;
use arena_combat_server::http::signature::{signature_header, SIGNATURE_HEADER};
use arena_combat_server::strategy::LoggingStrategyLayer;

const SECRET: &str = "test-secret";

fn config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".parse().expect("expected address"),
        log_level: "info".into(),
        client_origin: "http://localhost:3000".into(),
        internal_shared_secret: SECRET.into(),
        strategy_callback_url: None,
        tick_rate_hz: 20,
        time_limit_secs: 0,
        proximity_tap_enabled: true,
        input_rate_limit: 30,
    }
}

fn build_test_app() -> (Router, Arc<CombatManager>) {
    let manager = Arc::new(CombatManager::new(
        ArenaRules::default(),
        Arc::new(SequentialIds::new()),
        Arc::new(LoggingStrategyLayer),
    ));
    let state = AppState::with_manager(config(), manager.clone());
    (build_router(state), manager)
}

fn combat_request(match_id: &str, defender: &str) -> Value {
    json!({
        "match_id": match_id,
        "attacker_unit_id": "a",
        "defender_unit_id": defender,
        "game": {
            "players": ["p1", "p2"],
            "units": [
                { "id": "a", "owner": "p1", "type_id": "knight", "current_hp": 80.0 },
                { "id": "b", "owner": "p2", "type_id": "archer", "current_hp": 60.0 }
            ],
            "unit_definitions": {
                "knight": {
                    "id": "knight",
                    "max_hp": 100.0,
                    "combat_abilities": [
                        { "id": "slash", "category": "attack", "attack_type": "melee", "damage": 15.0 }
                    ]
                },
                "archer": {
                    "id": "archer",
                    "max_hp": 60.0,
                    "combat_abilities": [
                        { "id": "arrow", "category": "attack", "attack_type": "direct_projectile" }
                    ]
                }
            }
        }
    })
}

fn signed_post(uri: &str, body: &Value) -> Request<Body> {
    let bytes = serde_json::to_vec(body).expect("expected json");
    let header = signature_header(SECRET, chrono::Utc::now().timestamp(), &bytes);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, header)
        .body(Body::from(bytes))
        .expect("expected request to build")
}

fn signed_get(uri: &str) -> Request<Body> {
    let header = signature_header(SECRET, chrono::Utc::now().timestamp(), b"");
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(SIGNATURE_HEADER, header)
        .body(Body::empty())
        .expect("expected request to build")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("expected response body");
    serde_json::from_slice(&body).expect("expected json body")
}

#[tokio::test]
async fn health_reports_active_combats() {
    let (app, manager) = build_test_app();

    let response = app
        .clone()
        .oneshot(signed_post("/internal/combats", &combat_request("m1", "b")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(manager.active_combats(), 1);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("expected request to build");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["active_combats"], 1);
}

#[tokio::test]
async fn signed_create_returns_initial_snapshot() {
    let (app, _) = build_test_app();

    let response = app
        .oneshot(signed_post("/internal/combats", &combat_request("m1", "b")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = json_body(response).await;
    assert_eq!(payload["match_id"], "m1");
    assert_eq!(payload["clock_ms"], 0);
    assert_eq!(payload["status"], "active");
    assert_eq!(payload["units"][0]["id"], "a");
    assert_eq!(payload["units"][0]["current_hp"], 80.0);
    assert_eq!(payload["units"][1]["max_hp"], 60.0);
}

#[tokio::test]
async fn duplicate_create_returns_409() {
    let (app, _) = build_test_app();

    let first = app
        .clone()
        .oneshot(signed_post("/internal/combats", &combat_request("m1", "b")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(signed_post("/internal/combats", &combat_request("m1", "b")))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let payload = json_body(second).await;
    assert!(payload["error"].as_str().unwrap().contains("m1"));
}

#[tokio::test]
async fn unbuildable_combat_returns_422() {
    let (app, manager) = build_test_app();

    let response = app
        .oneshot(signed_post("/internal/combats", &combat_request("m1", "ghost")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(manager.active_combats(), 0);
}

#[tokio::test]
async fn bad_or_missing_signature_returns_401() {
    let (app, manager) = build_test_app();

    let body = serde_json::to_vec(&combat_request("m1", "b")).unwrap();
    let forged = signature_header("wrong-secret", chrono::Utc::now().timestamp(), &body);
    let request = Request::builder()
        .method("POST")
        .uri("/internal/combats")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, forged)
        .body(Body::from(body.clone()))
        .expect("expected request to build");
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let unsigned = Request::builder()
        .method("POST")
        .uri("/internal/combats")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("expected request to build");
    let response = app.oneshot(unsigned).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(manager.active_combats(), 0);
}

#[tokio::test]
async fn snapshot_lookup_finds_active_combat_only() {
    let (app, _) = build_test_app();

    let missing = app.clone().oneshot(signed_get("/internal/combats/m1")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let payload = json_body(missing).await;
    assert_eq!(payload["error"], "No active combat for match m1");

    app.clone()
        .oneshot(signed_post("/internal/combats", &combat_request("m1", "b")))
        .await
        .unwrap();

    let found = app.oneshot(signed_get("/internal/combats/m1")).await.unwrap();
    assert_eq!(found.status(), StatusCode::OK);
    let payload = json_body(found).await;
    assert_eq!(payload["match_id"], "m1");
    assert_eq!(payload["units"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn ws_with_bad_ticket_returns_401() {
    let (app, _) = build_test_app();

    for uri in [
        "/ws?match_id=m1&player_id=p1&ticket=00",
        "/ws?match_id=m1&player_id=p1&ticket=",
    ] {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("expected request to build");
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}
