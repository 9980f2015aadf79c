// HTTP API - Query routes and the SSE stream over the pipeline view
// axum router with CORS and request tracing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
    routing::get,
    Router,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::layer2::pipeline::{PipelineView, QueryError};
use crate::layer3::advisory::{advisory_for, document_store};
use crate::layer4::delivery::subscriber_stream;

const DEFAULT_LOG_LIMIT: usize = 50;

/// Shared state for every handler
#[derive(Clone)]
pub struct ApiState {
    pub view: Arc<PipelineView>,
    pub heartbeat: Duration,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            QueryError::NotReady(_) => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/stream", get(stream_events))
        .route("/status", get(status))
        .route("/entities", get(list_entities))
        .route("/entities/:id", get(get_entity))
        .route("/alerts", get(list_alerts))
        .route("/alerts/:id", get(get_entity_alert))
        .route("/logs", get(recent_logs))
        .route("/advisory/:id", get(get_advisory))
        .route("/docstore", get(docstore))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the listener fails
pub async fn serve(router: Router, bind_addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, router).await
}

// ============================================================================
// Handlers
// ============================================================================

async fn stream_events(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = subscriber_stream(&state.view, state.heartbeat)
        .map(|msg| Event::default().json_data(&msg));
    Sse::new(stream)
}

async fn status(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let view = &state.view;
    let store = document_store();
    Json(json!({
        "status": "running",
        "stats": view.stats(),
        "entities": view.entities().len(),
        "active_alerts": view.active_alerts().len(),
        "subscribers": view.hub().subscriber_count(),
        "hub": view.hub().stats(),
        "events_logged": view.total_logged(),
        "docstore": {
            "who_guidelines": store.who_guidelines.len(),
            "govt_rules": store.govt_rules.len(),
        },
    }))
}

async fn list_entities(State(state): State<ApiState>) -> impl IntoResponse {
    let results = state
        .view
        .snapshot()
        .map(|event| event.entities.clone())
        .unwrap_or_default();
    Json(results)
}

async fn get_entity(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.view.entity(&id)?))
}

async fn list_alerts(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.view.active_alerts())
}

async fn get_entity_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = state.view.entity_alert(&id)?;
    Ok(Json(json!({ "entity_id": id, "alert_state": alert })))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn recent_logs(
    State(state): State<ApiState>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    Json(state.view.recent_events(query.limit.unwrap_or(DEFAULT_LOG_LIMIT)))
}

async fn get_advisory(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.view.entity(&id)?;
    let value = result.reading.value;
    Ok(Json(json!({
        "entity_id": result.entity_id,
        "entity_name": result.entity_name,
        "value": value,
        "level": result.level,
        "rolling_average": result.rolling_average,
        "advisory": advisory_for(value),
    })))
}

async fn docstore() -> impl IntoResponse {
    Json(document_store())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PipelineConfig;
    use crate::core::types::{Entity, EntityCategory};
    use crate::layer1::source::ReplaySource;
    use crate::layer2::pipeline::Pipeline;
    use crate::layer4::hub::BroadcastHub;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn setup(values: &[i32]) -> (Pipeline, Router) {
        let entities = vec![Entity::new("ward_1", "Ward 1", EntityCategory::Traffic, 156)];
        let source = ReplaySource::new().with_values("ward_1", values);
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            entities,
            Box::new(source),
            BroadcastHub::new(10),
        );
        let router = create_router(ApiState {
            view: pipeline.view(),
            heartbeat: Duration::from_secs(3),
        });
        (pipeline, router)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unknown_entity_is_404() {
        let (_pipeline, router) = setup(&[100]);
        let (status, body) = get_json(router, "/entities/ward_99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ward_99"));
    }

    #[tokio::test]
    async fn test_entity_before_first_tick_is_unavailable() {
        let (_pipeline, router) = setup(&[100]);
        let (status, _) = get_json(router, "/entities/ward_1").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_entity_and_advisory_after_tick() {
        let (mut pipeline, router) = setup(&[220]);
        pipeline.run_tick();

        let (status, body) = get_json(router.clone(), "/entities/ward_1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reading"]["value"], 220);
        assert_eq!(body["level"], "Poor");

        let (status, body) = get_json(router, "/advisory/ward_1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["advisory"]["govt_rules"].as_array().unwrap().len(), 2);
        assert!(body["advisory"]["heatwave"].is_string());
    }

    #[tokio::test]
    async fn test_alert_routes() {
        let (mut pipeline, router) = setup(&[220]);

        let (status, body) = get_json(router.clone(), "/alerts/ward_1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["alert_state"]["severity"].is_null());

        pipeline.run_tick();
        let (_, body) = get_json(router.clone(), "/alerts").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["severity"], "CRITICAL");

        let (status, _) = get_json(router, "/alerts/ward_9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logs_limit() {
        let (mut pipeline, router) = setup(&[60, 61, 62]);
        for _ in 0..3 {
            pipeline.run_tick();
        }

        let (_, body) = get_json(router.clone(), "/logs?limit=2").await;
        let logs = body.as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["type"], "PIPELINE_TICK");
        assert_eq!(logs[0]["data"]["tick"], 2);

        let (_, body) = get_json(router, "/logs").await;
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_status_and_docstore() {
        let (mut pipeline, router) = setup(&[60]);
        pipeline.run_tick();

        let (status, body) = get_json(router.clone(), "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["ticks_completed"], 1);
        assert_eq!(body["entities"], 1);
        assert_eq!(body["docstore"]["govt_rules"], 5);

        let (_, body) = get_json(router, "/docstore").await;
        assert_eq!(body["who_guidelines"]["severe"]["range"], "401-500");
    }

    #[tokio::test]
    async fn test_entities_list() {
        let (mut pipeline, router) = setup(&[60]);
        let (_, body) = get_json(router.clone(), "/entities").await;
        assert!(body.as_array().unwrap().is_empty());

        pipeline.run_tick();
        let (_, body) = get_json(router, "/entities").await;
        assert_eq!(body[0]["entity_id"], "ward_1");
    }
}
