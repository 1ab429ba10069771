//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);
    Router::new()
        .route("/health", get(api::health))
        .route("/nodes", get(api::list_nodes).post(api::register_node))
        .route("/tasks", get(api::list_tasks))
        .route("/dispatch", post(api::dispatch))
        .route("/ledger/clear", post(api::clear_ledger))
        .route("/scheduler/state", get(api::scheduler_state))
        .route("/scheduler/metrics", get(api::scheduler_metrics))
        .route("/config", get(api::config_summary))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!("Invalid CORS_ORIGIN {:?}, falling back to permissive CORS", origin);
            CorsLayer::permissive()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use cobra_core::Config;
    use cobra_ledger::MemoryLedger;
    use cobra_scheduler::{Scheduler, SchedulerConfig};

    fn test_app() -> Router {
        let scheduler = Scheduler::new(SchedulerConfig::instant(7), Arc::new(MemoryLedger::new()));
        let state = AppState::new(Arc::new(scheduler), Config::for_profile("router_test"));
        build_router(Arc::new(state))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn edge(id: &str) -> Value {
        json!({
            "nodeId": id,
            "class": "Edge",
            "batteryLife": 50.0,
            "initialBattery": 50.0,
            "computeResources": 100.0,
            "initialResources": 100.0,
            "reputation": 1.0
        })
    }

    fn uav(id: &str, battery: f64) -> Value {
        json!({
            "nodeId": id,
            "class": "UAV",
            "batteryLife": battery,
            "initialBattery": 50.0,
            "computeResources": 10.0,
            "initialResources": 10.0
        })
    }

    fn ids(list: &Value) -> Vec<&str> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|n| n["nodeId"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["default_policy"], "cobra");
    }

    #[tokio::test]
    async fn register_then_dispatch_then_list() {
        let app = test_app();

        let (status, node) = send(&app, "POST", "/nodes", Some(edge("1"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(node["nodeId"], "0001");
        assert_eq!(node["status"], "Available");

        let request = json!({
            "payload": "frame-1",
            "taskType": "UC",
            "energyCost": 0.5,
            "computeCost": 0.9,
            "policy": "first-available"
        });
        let (status, outcome) = send(&app, "POST", "/dispatch", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["node"]["nodeId"], "0001");
        assert_eq!(outcome["task"]["payload"], "frame-1");
        assert_eq!(outcome["policy"], "first-available");

        let (_, nodes) = send(&app, "GET", "/nodes", None).await;
        assert_eq!(nodes.as_array().unwrap().len(), 1);
        assert!((nodes[0]["computeResources"].as_f64().unwrap() - 99.1).abs() < 1e-9);

        let (_, tasks) = send(&app, "GET", "/tasks", None).await;
        assert_eq!(tasks.as_array().unwrap().len(), 1);
        assert_eq!(tasks[0]["status"], "Completed");

        let (_, metrics) = send(&app, "GET", "/scheduler/metrics", None).await;
        assert_eq!(metrics["dispatches_by_policy"]["first-available"], 1);
    }

    #[tokio::test]
    async fn dispatch_without_nodes_is_conflict() {
        let app = test_app();
        let request = json!({ "taskType": "IC", "energyCost": 2.2, "computeCost": 2.7 });
        let (status, body) = send(&app, "POST", "/dispatch", Some(request)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "no_eligible_node");
    }

    #[tokio::test]
    async fn unknown_task_type_is_bad_request() {
        let app = test_app();
        send(&app, "POST", "/nodes", Some(edge("1"))).await;
        let request = json!({ "taskType": "URLLC", "energyCost": 1.0, "computeCost": 1.0 });
        let (status, body) = send(&app, "POST", "/dispatch", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "unknown_task_type");

        let (_, tasks) = send(&app, "GET", "/tasks", None).await;
        assert!(tasks.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_registration_is_bad_request() {
        let app = test_app();
        let mut bad = edge("12345");
        let (status, _) = send(&app, "POST", "/nodes", Some(bad.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        bad["nodeId"] = json!("1");
        bad["class"] = json!("Drone");
        let (status, body) = send(&app, "POST", "/nodes", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
    }

    #[tokio::test]
    async fn clear_scopes() {
        let app = test_app();
        send(&app, "POST", "/nodes", Some(edge("1"))).await;
        send(&app, "POST", "/nodes", Some(edge("2"))).await;

        let (status, _) = send(&app, "POST", "/ledger/clear", Some(json!({ "scope": "everything" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "POST", "/ledger/clear", Some(json!({ "scope": "tasks" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 0);

        let (_, body) = send(&app, "POST", "/ledger/clear", Some(json!({ "scope": "devices" }))).await;
        assert_eq!(body["scope"], "nodes");
        assert_eq!(body["removed"], 2);

        let (_, nodes) = send(&app, "GET", "/nodes", None).await;
        assert!(nodes.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scheduler_state_starts_in_edge_phase() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/scheduler/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "EdgePhase");
        assert_eq!(body["uavBurstRemaining"], 0);
    }

    #[tokio::test]
    async fn node_listing_filters() {
        let app = test_app();
        send(&app, "POST", "/nodes", Some(edge("1"))).await;
        send(&app, "POST", "/nodes", Some(uav("2", 50.0))).await;
        send(&app, "POST", "/nodes", Some(uav("3", 10.0))).await;
        send(&app, "POST", "/nodes", Some(uav("4", 2.0))).await;

        let (status, nodes) = send(&app, "GET", "/nodes?class=UAV&status=Available", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&nodes), ["0002", "0003"]);

        let (_, nodes) = send(&app, "GET", "/nodes?class=UAV&batteryAbove=11", None).await;
        assert_eq!(ids(&nodes), ["0002"]);

        let (_, nodes) = send(&app, "GET", "/nodes?status=Unavailable", None).await;
        assert_eq!(ids(&nodes), ["0004"]);

        let (_, nodes) = send(&app, "GET", "/nodes?nodeId=1", None).await;
        assert_eq!(ids(&nodes), ["0001"]);

        let (status, body) = send(&app, "GET", "/nodes?status=Sleeping", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
    }

    #[tokio::test]
    async fn task_listing_filters() {
        let app = test_app();
        send(&app, "POST", "/nodes", Some(edge("1"))).await;
        send(&app, "POST", "/nodes", Some(uav("2", 50.0))).await;
        for (t, e, c) in [("UC", 0.5, 0.9), ("UC", 0.5, 0.9), ("IC", 2.2, 2.7)] {
            let request = json!({
                "taskType": t,
                "energyCost": e,
                "computeCost": c,
                "policy": "first-available"
            });
            let (status, _) = send(&app, "POST", "/dispatch", Some(request)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, tasks) = send(&app, "GET", "/tasks?taskType=UC", None).await;
        assert_eq!(tasks.as_array().unwrap().len(), 2);

        let (_, tasks) = send(&app, "GET", "/tasks?nodeId=1&taskType=IC", None).await;
        assert_eq!(tasks.as_array().unwrap().len(), 1);
        assert_eq!(tasks[0]["nodeId"], "0001");

        let (_, tasks) = send(&app, "GET", "/tasks?nodeId=0002", None).await;
        assert!(tasks.as_array().unwrap().is_empty());

        let (_, tasks) = send(&app, "GET", "/tasks?status=Completed", None).await;
        assert_eq!(tasks.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn config_route_returns_redacted_summary() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"], "ROUTER_TEST");
        assert!(body["server"]["port"].is_number());
        assert!(body["scheduler"]["seeded"].is_boolean());
    }
}
