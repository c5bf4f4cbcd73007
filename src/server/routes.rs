use axum::{
    extract::{Path, State},
    Json,
    http::StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use crate::response::{CapturedEmitter, RequestContext};
use crate::server::AppState;
use crate::Error;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<ErrorResponse>)>;

pub fn status_for(error: &Error) -> StatusCode {
    if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if error.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(error: &Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(error);
    if status.is_server_error() {
        tracing::error!(kind = error.kind(), "{}", error);
    } else {
        tracing::warn!(kind = error.kind(), "{}", error);
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            kind: error.kind().to_string(),
        }),
    )
}

fn internal(message: String) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!("{}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: message, kind: "internal".to_string() }),
    )
}

async fn run_command(state: Arc<AppState>, raw: String) -> ApiResult {
    let outcome = tokio::task::spawn_blocking(move || {
        let router = state.router.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut emitter = CapturedEmitter::new();
        let mut ctx = RequestContext::new(&mut emitter);
        router.handle(&mut ctx, &raw)?;
        drop(ctx);
        Ok::<_, Error>(emitter.take())
    })
    .await
    .map_err(|e| internal(format!("Annotation task failed: {}", e)))?;

    match outcome {
        Ok(Some(document)) => Ok(Json(document)),
        Ok(None) => Err(internal("Annotation command produced no response".to_string())),
        Err(e) => Err(error_response(&e)),
    }
}

/// `GET /annotation/<verb>/<payload>`
pub async fn get_command(
    State(state): State<Arc<AppState>>,
    Path(command): Path<String>,
) -> ApiResult {
    run_command(state, command).await
}

/// `POST /annotation` with the raw command as the body
pub async fn post_command(State(state): State<Arc<AppState>>, body: String) -> ApiResult {
    run_command(state, body.trim_end().to_string()).await
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult {
    let stats = tokio::task::spawn_blocking(move || {
        let router = state.router.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        router.store().metadata().stats()
    })
    .await
    .map_err(|e| internal(format!("Stats task failed: {}", e)))?
    .map_err(|e| error_response(&e))?;

    let value = serde_json::to_value(&stats).map_err(|e| error_response(&e.into()))?;
    Ok(Json(value))
}
