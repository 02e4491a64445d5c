use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::db::Cell;
use crate::error::PipelineError;
use crate::pipeline::chart::ChartSpec;
use crate::pipeline::{self, Answer};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub result: Vec<Vec<Cell>>,
    pub response: String,
    pub chart_data: ChartSpec,
}

impl From<Answer> for QueryResponse {
    fn from(answer: Answer) -> Self {
        Self {
            sql: answer.sql,
            result: answer.result.rows,
            response: answer.response,
            chart_data: answer.chart_data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub backend: String,
    pub model: String,
}

/// Error payload: `{"error": "<message>"}` and nothing more.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn no_query() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "No query provided".to_string(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

/// Reads the question from a `{"query": "..."}` body. Anything else,
/// including malformed JSON, counts as no query.
fn parse_question(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<QueryRequest>(body).ok()?.query
}

pub async fn handle_query(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<QueryResponse>, ApiError> {
    let question = parse_question(&body).ok_or_else(ApiError::no_query)?;

    if let Some(answer) = pipeline::canned_answer(&question) {
        info!("Returning canned answer for known question");
        return Ok(Json(answer.into()));
    }

    let answer = state.pipeline.answer(&question).await.map_err(|e| {
        error!("Error processing query: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(answer.into()))
}

pub async fn get_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<String>, ApiError> {
    let schema = state.pipeline.describe_schema().await.map_err(|e| {
        error!("Failed to describe schema: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(schema.as_str().to_string()))
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        backend: state.pipeline.llm().backend().to_string(),
        model: state.pipeline.llm().model().to_string(),
    })
}
