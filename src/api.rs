//! HTTP surface: ingestion plus read-only projections.
//!
//! Every read handler takes a fresh snapshot from the store and hands it to
//! the projections; nothing is cached here except the published dashboard.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{Local, Utc};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::dashboard::DashboardSnapshot;
use crate::error::ApiError;
use crate::models::{ApiResponse, EventInput, StoredEvent};
use crate::projections::{compute_table_report, reconstruct_sessions, PerTableSessionSummary};
use crate::store::EventStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EventStore>,
    pub dashboard: watch::Receiver<DashboardSnapshot>,
}

impl AppState {
    pub fn new(store: Arc<EventStore>, dashboard: watch::Receiver<DashboardSnapshot>) -> Self {
        Self { store, dashboard }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/log", get(log_event).post(log_event))
        .route("/events", get(list_events))
        .route("/data", get(get_data))
        .route("/dashboard", get(get_dashboard))
        .route("/table/:table_id/data", get(get_table_data))
        .route("/sessions/:table_id", get(get_sessions))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

async fn root() -> &'static str {
    "SmartOps Server is Running!"
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Append one event. Accepts a JSON body, falling back to query parameters.
async fn log_event(
    State(state): State<AppState>,
    Query(query): Query<EventInput>,
    body: Option<Json<EventInput>>,
) -> Result<Json<ApiResponse>, ApiError> {
    let input = body.map(|Json(b)| b).unwrap_or(query);
    let new = input.validate()?;
    state.store.append(new)?;

    Ok(Json(ApiResponse::success("Data logged")))
}

/// List all events (read-only)
async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<StoredEvent>>, ApiError> {
    Ok(Json(state.store.records()?))
}

/// Analytics and live status computed on demand.
///
/// A failing store degrades to the empty result instead of an error.
async fn get_data(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    let events = state.store.all_events().unwrap_or_else(|e| {
        error!(error = %e, "failed to read call log for /data");
        Vec::new()
    });
    Json(DashboardSnapshot::build(&events, Local::now().naive_local()))
}

async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.dashboard.borrow().clone())
}

async fn get_table_data(
    State(state): State<AppState>,
    Path(table_id): Path<u32>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.table_events(table_id) {
        Ok(events) => {
            let stats = compute_table_report(&events, table_id);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "status": "success", "stats": stats })),
            )
        }
        Err(e) => {
            error!(table_id, error = %e, "failed to read table data");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "status": "error", "stats": {} })),
            )
        }
    }
}

async fn get_sessions(
    State(state): State<AppState>,
    Path(table_id): Path<u32>,
) -> Result<Json<PerTableSessionSummary>, ApiError> {
    let events = state.store.table_events(table_id)?;
    Ok(Json(reconstruct_sessions(&events, table_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<EventStore>) {
        let store = Arc::new(EventStore::open_in_memory().unwrap());
        let (_tx, rx) = watch::channel(DashboardSnapshot::empty(Local::now().naive_local()));
        let app = create_router(AppState::new(store.clone(), rx));
        (app, store)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = test_app();
        let (status, json) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_log_via_json_body() {
        let (app, store) = test_app();
        let (status, json) = send(
            &app,
            post_json("/log", serde_json::json!({"tableId": 2, "event": "Customer_Called"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Data logged");

        let events = store.all_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].table_id(), 2);
    }

    #[tokio::test]
    async fn test_log_via_query_string() {
        let (app, store) = test_app();
        let (status, _) = send(&app, get("/log?table=5&event=Waiter_Responded&time=12:00")).await;
        assert_eq!(status, StatusCode::OK);

        let records = store.records().unwrap();
        assert_eq!(records[0].event.event_type(), "Waiter_Responded");
        assert_eq!(records[0].client_time.as_deref(), Some("12:00"));
    }

    #[tokio::test]
    async fn test_log_rejects_missing_and_bad_table() {
        let (app, store) = test_app();

        let (status, json) = send(&app, get("/log?event=Customer_Called")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Missing table or event");

        let (status, _) = send(&app, get("/log?table=abc&event=Customer_Called")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/log?table=-4&event=Customer_Called")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(store.all_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_rejects_line_break_in_event() {
        let (app, store) = test_app();
        let (status, json) = send(
            &app,
            post_json("/log", serde_json::json!({"tableId": 2, "event": "Customer_Called\n3"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
        assert!(store.all_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_data_payload() {
        let (app, _) = test_app();
        send(&app, get("/log?table=1&event=Customer_Called")).await;

        let (status, json) = send(&app, get("/data")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["analytics"]["total"], "1");
        assert_eq!(json["analytics"]["open"], "1");
        assert_eq!(json["analytics"]["closed"], 0);
        assert_eq!(json["live_status"][0]["table_id"], 1);
        assert_eq!(json["live_status"][0]["status"], "Customer_Called");
        assert_eq!(json["live_status"][0]["minutes_ago"], 0);
    }

    #[tokio::test]
    async fn test_table_data_for_unseen_table() {
        let (app, _) = test_app();
        let (status, json) = send(&app, get("/table/3/data")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(
            json["stats"],
            serde_json::json!({
                "available": "Yes",
                "orders_received": "0",
                "orders_responded": "0",
                "orders_delivered": "0"
            })
        );
    }

    #[tokio::test]
    async fn test_sessions_and_events_listing() {
        let (app, _) = test_app();
        send(&app, get("/log?table=4&event=Customer_Called")).await;
        send(&app, get("/log?table=4&event=Food_Delivered")).await;

        let (status, json) = send(&app, get("/sessions/4")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["calls"], 1);
        assert_eq!(json["closed"], 1);
        assert_eq!(json["sessions"][0]["kind"], "closed");

        let (_, json) = send(&app, get("/events")).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[1]["event_type"], "Food_Delivered");
        assert_eq!(json[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_dashboard_serves_published_snapshot() {
        let (app, _) = test_app();
        let (status, json) = send(&app, get("/dashboard")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["analytics"]["total"], "0");
        assert_eq!(json["live_status"], serde_json::json!([]));
    }
}
