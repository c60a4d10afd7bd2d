use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{debug, error};

use super::{AppState, ErrorResponse, HealthResponse};
use crate::error::QueryError;
use crate::query::{run_query, QueryParams, QueryResult};

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueryError::InvalidTime { .. } | QueryError::InvalidLimit(_) => StatusCode::BAD_REQUEST,
            QueryError::NoDataAvailable => StatusCode::NOT_FOUND,
            QueryError::Storage(err) => {
                error!("snapshot query failed, {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self.to_string())
    }
}

/// Snapshot history query.
pub async fn metrics(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResult>, QueryError> {
    debug!("metrics query {:?}", params);
    run_query(state.store.as_ref(), &params).await.map(Json)
}

pub async fn health(State(state): State<AppState>) -> Response {
    match state.store.len().await {
        Ok(snapshots) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_secs: state.uptime_secs(),
                snapshots,
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}
