//! HTTP surface of the churn service

use crate::error::ChurnError;
use crate::metrics::ServiceMetrics;
use crate::pipeline::ChurnPipeline;
use crate::types::{RawRecord, Threshold};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info_span, warn, Instrument};

/// Message returned by the health endpoint
pub const READY_MESSAGE: &str = "Churn prediction API is up";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChurnPipeline>,
    pub metrics: Arc<ServiceMetrics>,
    pub default_threshold: Threshold,
}

impl AppState {
    pub fn new(pipeline: Arc<ChurnPipeline>, default_threshold: Threshold) -> Self {
        Self {
            pipeline,
            metrics: Arc::new(ServiceMetrics::new()),
            default_threshold,
        }
    }
}

impl IntoResponse for ChurnError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChurnError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ChurnError::InvalidThreshold(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ChurnError::UnknownEncoder(_) => StatusCode::NOT_FOUND,
            ChurnError::ArtifactLoad(_) | ChurnError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Build the router for the churn endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/encoders", get(list_encoders))
        .route("/encoders/{col}", get(encoder_classes))
        .route("/metrics", get(metrics_snapshot))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": READY_MESSAGE }))
}

#[derive(Debug, Deserialize)]
struct PredictParams {
    threshold: Option<f64>,
}

async fn predict(
    State(state): State<AppState>,
    params: Result<Query<PredictParams>, QueryRejection>,
    body: Result<Json<RawRecord>, JsonRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("predict", request_id = %request_id);

    async move {
        let start = Instant::now();

        let threshold = match params {
            Ok(Query(p)) => match p.threshold {
                Some(t) => Threshold::new(t),
                None => Ok(state.default_threshold),
            },
            Err(e) => Err(ChurnError::invalid_input(format!("invalid query: {}", e.body_text()))),
        };
        let threshold = match threshold {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "Rejected threshold");
                state.metrics.record_rejected();
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": e.to_string() })))
                    .into_response();
            }
        };

        let record = match body {
            Ok(Json(record)) => record,
            Err(e) => {
                warn!(error = %e.body_text(), "Rejected body");
                state.metrics.record_rejected();
                return ChurnError::invalid_input(format!(
                    "request body must be a JSON object: {}",
                    e.body_text()
                ))
                .into_response();
            }
        };

        match state.pipeline.predict(&record, threshold) {
            Ok(result) => {
                let latency = start.elapsed();
                state
                    .metrics
                    .record_prediction(latency, result.prediction, result.prob_churn);
                debug!(
                    prediction = %result.prediction,
                    prob_churn = result.prob_churn,
                    latency_us = latency.as_micros() as u64,
                    "Prediction served"
                );
                Json(result).into_response()
            }
            Err(e) if e.is_client_error() => {
                warn!(error = %e, "Rejected record");
                state.metrics.record_rejected();
                e.into_response()
            }
            Err(e) => {
                error!(error = %e, "Prediction failed");
                state.metrics.record_internal_error();
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn list_encoders(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "encoders": state.pipeline.encoder_keys() }))
}

async fn encoder_classes(
    State(state): State<AppState>,
    Path(col): Path<String>,
) -> Result<Json<serde_json::Value>, ChurnError> {
    let table = state
        .pipeline
        .encoder(&col)
        .ok_or_else(|| ChurnError::UnknownEncoder(col.clone()))?;
    Ok(Json(json!({ "column": col, "classes": table.classes() })))
}

async fn metrics_snapshot(State(state): State<AppState>) -> Json<crate::metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
