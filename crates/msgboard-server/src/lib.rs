//! HTTP front end for the message board.
//!
//! Each route parses its inputs, runs the matching `MessageService` call on
//! the blocking pool, and answers with the resulting JSON.

pub mod config;
pub mod error;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use msgboard_service::{BoardResult, Message, MessagePatch, MessageService, NewMessage};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared handle to the service.
pub type Board = Arc<MessageService>;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(board: Board) -> Router {
    Router::new()
        .route("/messages", get(list_messages).post(create_message))
        .route("/messages/search", get(search_messages))
        .route(
            "/messages/:id",
            get(get_message).patch(update_message).put(update_message).delete(delete_message),
        )
        .with_state(board)
        .layer(TraceLayer::new_for_http())
}

/// Run `op` on the blocking pool; store calls may fsync.
async fn run<T, F>(board: &Board, missing: StatusCode, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&MessageService) -> BoardResult<T> + Send + 'static,
{
    let board = Arc::clone(board);
    tokio::task::spawn_blocking(move || op(&board))
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {e}")))?
        .map(Json)
        .map_err(|e| ApiError::from_board(e, missing))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn create_message(
    State(board): State<Board>,
    payload: Result<Json<NewMessage>, JsonRejection>,
) -> ApiResult<Message> {
    let fields = body(payload)?;
    run(&board, StatusCode::BAD_REQUEST, move |svc| svc.create(fields)).await
}

async fn list_messages(State(board): State<Board>) -> ApiResult<Vec<Message>> {
    run(&board, StatusCode::NOT_FOUND, |svc| svc.list()).await
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
}

async fn search_messages(
    State(board): State<Board>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<Message>> {
    let query = params.query.unwrap_or_default();
    run(&board, StatusCode::BAD_REQUEST, move |svc| svc.search(&query)).await
}

async fn get_message(State(board): State<Board>, Path(id): Path<String>) -> ApiResult<Message> {
    run(&board, StatusCode::NOT_FOUND, move |svc| svc.get(&id)).await
}

async fn update_message(
    State(board): State<Board>,
    Path(id): Path<String>,
    payload: Result<Json<MessagePatch>, JsonRejection>,
) -> ApiResult<Message> {
    let patch = body(payload)?;
    run(&board, StatusCode::BAD_REQUEST, move |svc| svc.update(&id, patch)).await
}

async fn delete_message(State(board): State<Board>, Path(id): Path<String>) -> ApiResult<Message> {
    run(&board, StatusCode::BAD_REQUEST, move |svc| svc.delete(&id)).await
}
