use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

use salon_booking::config::AppConfig;
use salon_booking::handlers;
use salon_booking::models::Catalog;
use salon_booking::services::crm::{CrmSink, LeadRecord};
use salon_booking::services::wizard::SUBMIT_ERROR_MESSAGE;
use salon_booking::state::AppState;

// ── Mock CRM sinks ──

struct CapturingCrm {
    leads: Arc<Mutex<Vec<LeadRecord>>>,
}

#[async_trait]
impl CrmSink for CapturingCrm {
    async fn create_lead(&self, lead: &LeadRecord) -> anyhow::Result<()> {
        self.leads.lock().unwrap().push(lead.clone());
        Ok(())
    }
}

struct FailingCrm;

#[async_trait]
impl CrmSink for FailingCrm {
    async fn create_lead(&self, _lead: &LeadRecord) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

/// Parks inside `create_lead` until released, so a test can observe the
/// in-flight state.
struct GatedCrm {
    entered: Arc<AtomicBool>,
    release: Arc<Notify>,
    leads: Arc<Mutex<Vec<LeadRecord>>>,
}

#[async_trait]
impl CrmSink for GatedCrm {
    async fn create_lead(&self, lead: &LeadRecord) -> anyhow::Result<()> {
        self.entered.store(true, Ordering::SeqCst);
        self.release.notified().await;
        self.leads.lock().unwrap().push(lead.clone());
        Ok(())
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        crm_webhook_url: String::new(),
        catalog_path: None,
    }
}

fn test_state(crm: Option<Box<dyn CrmSink>>) -> Arc<AppState> {
    Arc::new(AppState {
        config: test_config(),
        catalog: Catalog::salon_natali(),
        crm,
        sessions: Mutex::new(HashMap::new()),
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/catalog", get(handlers::catalog::get_catalog))
        .route(
            "/api/catalog/services/:service_id/staff",
            get(handlers::catalog::get_eligible_staff),
        )
        .route(
            "/api/availability",
            get(handlers::availability::get_blocked_slots),
        )
        .route("/api/wizard", post(handlers::wizard::create_session))
        .route("/api/wizard/:id", get(handlers::wizard::get_session))
        .route("/api/wizard/:id/service", post(handlers::wizard::select_service))
        .route("/api/wizard/:id/staff", post(handlers::wizard::select_staff))
        .route("/api/wizard/:id/schedule", post(handlers::wizard::set_schedule))
        .route("/api/wizard/:id/contact", post(handlers::wizard::set_contact))
        .route("/api/wizard/:id/advance", post(handlers::wizard::advance))
        .route("/api/wizard/:id/retreat", post(handlers::wizard::retreat))
        .route("/api/wizard/:id/submit", post(handlers::wizard::submit))
        .with_state(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn post_empty(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Create a session and fill the draft to completeness; returns the id.
async fn fill_session(app: &Router) -> String {
    let (status, body) = post_empty(app, "/api/wizard").await;
    assert_eq!(status, StatusCode::OK);
    let id = body["session_id"].as_str().unwrap().to_string();

    post_json(
        app,
        &format!("/api/wizard/{id}/service"),
        json!({"service_id": "haircut"}),
    )
    .await;
    post_json(
        app,
        &format!("/api/wizard/{id}/staff"),
        json!({"staff_id": "nino"}),
    )
    .await;
    post_json(
        app,
        &format!("/api/wizard/{id}/schedule"),
        json!({"date": "2025-09-16", "time": "11:00"}),
    )
    .await;
    post_json(
        app,
        &format!("/api/wizard/{id}/contact"),
        json!({"name": "Ana", "phone": "55512345"}),
    )
    .await;

    id
}

// ── Tests ──

#[tokio::test]
async fn test_health_reports_demo_mode() {
    let app = test_app(test_state(None));
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["demo_mode"], true);
}

#[tokio::test]
async fn test_catalog_endpoint() {
    let app = test_app(test_state(None));
    let (status, body) = get_json(&app, "/api/catalog").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"].as_array().unwrap().len(), 4);
    assert_eq!(body["staff"].as_array().unwrap().len(), 3);
    assert_eq!(body["time_slots"][0], "10:00");
    assert_eq!(body["time_slots"][17], "18:30");
}

#[tokio::test]
async fn test_eligible_staff_endpoint() {
    let app = test_app(test_state(None));

    let (status, body) = get_json(&app, "/api/catalog/services/manicure/staff").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "mariam");

    // unknown service falls back to the full catalog
    let (_, body) = get_json(&app, "/api/catalog/services/massage/staff").await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_availability_endpoint() {
    let app = test_app(test_state(None));
    let (status, body) = get_json(&app, "/api/availability?staff_id=nino&date=2025-09-14").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blocked_slots"], json!(["12:00", "12:30", "15:30"]));

    let (_, body) = get_json(&app, "/api/availability?staff_id=nobody&date=2025-09-14").await;
    assert_eq!(body["blocked_slots"], json!([]));
}

#[tokio::test]
async fn test_full_wizard_walk_demo_mode() {
    let app = test_app(test_state(None));

    let (_, body) = post_empty(&app, "/api/wizard").await;
    let id = body["session_id"].as_str().unwrap().to_string();
    assert_eq!(body["view"]["step"], 0);
    assert_eq!(body["view"]["can_advance"], false);

    // selecting a service on the first step jumps to the master step
    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/service"),
        json!({"service_id": "haircut"}),
    )
    .await;
    assert_eq!(view["step"], 1);
    assert_eq!(view["eligible_staff"].as_array().unwrap().len(), 2);

    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/staff"),
        json!({"staff_id": "nino"}),
    )
    .await;
    assert_eq!(view["can_advance"], true);

    let (_, view) = post_empty(&app, &format!("/api/wizard/{id}/advance")).await;
    assert_eq!(view["step"], 2);

    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/schedule"),
        json!({"date": "2025-09-16", "time": "11:00"}),
    )
    .await;
    assert_eq!(view["draft"]["time"], "11:00");
    assert_eq!(view["can_advance"], true);

    let (_, _) = post_empty(&app, &format!("/api/wizard/{id}/advance")).await;
    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/contact"),
        json!({"name": "Ana", "phone": "55512345", "note": "no perfume please"}),
    )
    .await;
    assert_eq!(view["can_advance"], true);

    let (_, view) = post_empty(&app, &format!("/api/wizard/{id}/advance")).await;
    assert_eq!(view["step"], 4);
    assert_eq!(view["step_label"], "Confirm");

    let (status, view) = post_empty(&app, &format!("/api/wizard/{id}/submit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["sent"], true);
    assert_eq!(view["sending"], false);
    assert_eq!(view["step"], 4);
    assert!(view["error"].is_null());
}

#[tokio::test]
async fn test_gate_blocks_advance_without_service() {
    let app = test_app(test_state(None));
    let (_, body) = post_empty(&app, "/api/wizard").await;
    let id = body["session_id"].as_str().unwrap();

    let (status, view) = post_empty(&app, &format!("/api/wizard/{id}/advance")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], 0);
    assert_eq!(view["can_advance"], false);
}

#[tokio::test]
async fn test_service_change_clears_ineligible_staff_via_api() {
    let app = test_app(test_state(None));
    let (_, body) = post_empty(&app, "/api/wizard").await;
    let id = body["session_id"].as_str().unwrap().to_string();

    post_json(
        &app,
        &format!("/api/wizard/{id}/service"),
        json!({"service_id": "haircut"}),
    )
    .await;
    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/staff"),
        json!({"staff_id": "nino"}),
    )
    .await;
    assert_eq!(view["draft"]["staff_id"], "nino");

    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/service"),
        json!({"service_id": "manicure"}),
    )
    .await;
    assert!(view["draft"]["staff_id"].is_null());
    assert_eq!(view["eligible_staff"][0]["id"], "mariam");
}

#[tokio::test]
async fn test_blocked_time_is_rejected_and_cleared_via_api() {
    let app = test_app(test_state(None));
    let (_, body) = post_empty(&app, "/api/wizard").await;
    let id = body["session_id"].as_str().unwrap().to_string();

    post_json(
        &app,
        &format!("/api/wizard/{id}/service"),
        json!({"service_id": "haircut"}),
    )
    .await;
    post_json(
        &app,
        &format!("/api/wizard/{id}/staff"),
        json!({"staff_id": "nino"}),
    )
    .await;

    // 12:00 is blocked for nino on 2025-09-14, so it is never set
    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/schedule"),
        json!({"date": "2025-09-14", "time": "12:00"}),
    )
    .await;
    assert!(view["draft"]["time"].is_null());
    assert_eq!(view["blocked_slots"], json!(["12:00", "12:30", "15:30"]));

    // pick a free slot, then move to a date where it is blocked
    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/schedule"),
        json!({"date": "2025-09-16", "time": "10:00"}),
    )
    .await;
    assert_eq!(view["draft"]["time"], "10:00");

    // Monday blocks 10:00 for nino
    let (_, view) = post_json(
        &app,
        &format!("/api/wizard/{id}/schedule"),
        json!({"date": "2025-09-15"}),
    )
    .await;
    assert!(view["draft"]["time"].is_null());
}

#[tokio::test]
async fn test_live_submit_success_posts_one_lead() {
    let leads = Arc::new(Mutex::new(vec![]));
    let crm = CapturingCrm {
        leads: Arc::clone(&leads),
    };
    let app = test_app(test_state(Some(Box::new(crm))));

    let id = fill_session(&app).await;
    let (status, view) = post_empty(&app, &format!("/api/wizard/{id}/submit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["sent"], true);

    let leads = leads.lock().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(
        leads[0].fields.title,
        "Online Booking: Haircut — 2025-09-16 11:00"
    );
    assert_eq!(leads[0].fields.booking_master, "Nino");
}

#[tokio::test]
async fn test_live_submit_failure_keeps_step_and_surfaces_generic_error() {
    let app = test_app(test_state(Some(Box::new(FailingCrm))));

    let id = fill_session(&app).await;
    for _ in 0..3 {
        post_empty(&app, &format!("/api/wizard/{id}/advance")).await;
    }
    let (_, view) = get_json(&app, &format!("/api/wizard/{id}")).await;
    assert_eq!(view["step"], 4);

    let (status, view) = post_empty(&app, &format!("/api/wizard/{id}/submit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["sent"], false);
    assert_eq!(view["sending"], false);
    assert_eq!(view["step"], 4);
    assert_eq!(view["error"], SUBMIT_ERROR_MESSAGE);

    // retry is manual and allowed
    let (status, _) = post_empty(&app, &format!("/api/wizard/{id}/submit")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_submit_incomplete_draft_is_rejected() {
    let app = test_app(test_state(None));
    let (_, body) = post_empty(&app, "/api/wizard").await;
    let id = body["session_id"].as_str().unwrap();

    let (status, body) = post_empty(&app, &format!("/api/wizard/{id}/submit")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("incomplete"));
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let app = test_app(test_state(None));
    let id = uuid::Uuid::new_v4();

    let (status, _) = get_json(&app, &format!("/api/wizard/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_empty(&app, &format!("/api/wizard/{id}/advance")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_outcome_recorded_after_client_disconnect() {
    let entered = Arc::new(AtomicBool::new(false));
    let release = Arc::new(Notify::new());
    let leads = Arc::new(Mutex::new(vec![]));
    let crm = GatedCrm {
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
        leads: Arc::clone(&leads),
    };
    let app = test_app(test_state(Some(Box::new(crm))));

    let id = fill_session(&app).await;
    let submit_uri = format!("/api/wizard/{id}/submit");

    let request = {
        let app = app.clone();
        let uri = submit_uri.clone();
        tokio::spawn(async move { post_empty(&app, &uri).await })
    };

    while !entered.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }

    // the client goes away while the send is parked inside the CRM call
    request.abort();
    let _ = request.await;

    // the send still completes and the outcome lands on the session
    release.notify_one();
    let mut sent = false;
    for _ in 0..200 {
        let (_, view) = get_json(&app, &format!("/api/wizard/{id}")).await;
        if view["sent"] == true {
            assert_eq!(view["sending"], false);
            assert!(view["error"].is_null());
            sent = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(sent, "outcome was never recorded after the request was dropped");
    assert_eq!(leads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_submit_is_single_flight() {
    let entered = Arc::new(AtomicBool::new(false));
    let release = Arc::new(Notify::new());
    let leads = Arc::new(Mutex::new(vec![]));
    let crm = GatedCrm {
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
        leads: Arc::clone(&leads),
    };
    let app = test_app(test_state(Some(Box::new(crm))));

    let id = fill_session(&app).await;
    let submit_uri = format!("/api/wizard/{id}/submit");

    let first = {
        let app = app.clone();
        let uri = submit_uri.clone();
        tokio::spawn(async move { post_empty(&app, &uri).await })
    };

    // wait until the first submit is parked inside the CRM call
    while !entered.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }

    // the duplicate is a no-op: it reports the in-flight state immediately
    let (status, view) = post_empty(&app, &submit_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["sending"], true);
    assert_eq!(view["sent"], false);

    release.notify_one();
    let (status, view) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["sent"], true);

    // exactly one lead reached the CRM
    assert_eq!(leads.lock().unwrap().len(), 1);

    // and a submit after success is also a no-op
    let (status, view) = post_empty(&app, &submit_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["sent"], true);
    assert_eq!(leads.lock().unwrap().len(), 1);
}
