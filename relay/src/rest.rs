use crate::classify::{Assessment, ThresholdTable};
use crate::model::TelemetryRecord;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct AppState {
    thresholds: Arc<ThresholdTable>,
}

pub fn create_router(thresholds: Arc<ThresholdTable>) -> Router {
    let state = AppState { thresholds };

    Router::new()
        .route("/api/v1/thresholds", get(get_thresholds))
        .route("/api/v1/classify", post(classify_record))
        .with_state(state)
}

/// The limits viewers should color readings by.
async fn get_thresholds(State(state): State<AppState>) -> Json<ThresholdTable> {
    Json(state.thresholds.as_ref().clone())
}

async fn classify_record(
    State(state): State<AppState>,
    Json(record): Json<TelemetryRecord>,
) -> Json<Assessment> {
    Json(state.thresholds.assess(&record))
}
