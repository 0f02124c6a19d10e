//! HTTP API for the shared status table
//!
//! Routes:
//! - `GET  /health`
//! - `GET  /v1/sheets/:sheet/range?from=b5&to=f24`
//! - `PUT  /v1/sheets/:sheet/range`   body `{from, to, values}`
//! - `PUT  /v1/sheets/:sheet/cells/:cell`   body `{value}`

use super::{CellRef, StatusTable};
use crate::common::{Error, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the table handlers
#[derive(Clone)]
pub struct TableState {
    pub table: Arc<dyn StatusTable>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RangeQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RangeResponse {
    pub values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteRangeRequest {
    pub from: String,
    pub to: String,
    pub values: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteCellRequest {
    pub value: String,
}

/// Create the table router
pub fn create_router(state: TableState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/sheets/:sheet/range", get(read_range).put(write_range))
        .route("/v1/sheets/:sheet/cells/:cell", put(write_cell))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(e: Error) -> Response {
    tracing::warn!("table request failed: {}", e);
    (e.to_http_status(), Json(json!({ "error": e.to_string() }))).into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn read_range(
    State(state): State<TableState>,
    Path(sheet): Path<String>,
    Query(q): Query<RangeQuery>,
) -> Response {
    let result: Result<Vec<Vec<String>>> = async {
        let from: CellRef = q.from.parse()?;
        let to: CellRef = q.to.parse()?;
        state
            .table
            .read_range(&sheet, from.col, from.row, to.col, to.row)
            .await
    }
    .await;

    match result {
        Ok(values) => Json(RangeResponse { values }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn write_range(
    State(state): State<TableState>,
    Path(sheet): Path<String>,
    Json(req): Json<WriteRangeRequest>,
) -> Response {
    let result: Result<()> = async {
        let from: CellRef = req.from.parse()?;
        let to: CellRef = req.to.parse()?;
        if from.row != to.row {
            return Err(Error::InvalidCell(format!(
                "{}:{} spans more than one row",
                from, to
            )));
        }
        state
            .table
            .write_range(&sheet, from.col, from.row, to.col, req.values)
            .await
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn write_cell(
    State(state): State<TableState>,
    Path((sheet, cell)): Path<(String, String)>,
    Json(req): Json<WriteCellRequest>,
) -> Response {
    let result: Result<()> = async {
        let cell: CellRef = cell.parse()?;
        state
            .table
            .write_cell(&sheet, cell.col, cell.row, &req.value)
            .await
    }
    .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Serve the table API until the listener fails
pub async fn serve(listener: tokio::net::TcpListener, table: Arc<dyn StatusTable>) -> Result<()> {
    let router = create_router(TableState { table });
    axum::serve(listener, router).await?;
    Ok(())
}
