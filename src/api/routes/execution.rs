use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use crate::api::models::{StartExecutionRequest, UploadQuery};
use crate::api::AppState;
use crate::errors::FlowscopeError;
use crate::workflow::ExecutionView;

pub async fn start_execution(
    State(state): State<AppState>,
    Json(req): Json<StartExecutionRequest>,
) -> Result<(StatusCode, Json<Value>), FlowscopeError> {
    let model = match req.task_id.as_deref() {
        Some(task_id) => Some(state.catalog.require(task_id)?),
        None => None,
    };
    let mut controller = state.controller.lock().await;
    let session_id = controller.start(model).await;
    let view = controller.view().await;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "sessionId": session_id,
            "taskId": req.task_id,
            "status": view.status,
        })),
    ))
}

pub async fn get_execution(State(state): State<AppState>) -> Json<ExecutionView> {
    let controller = state.controller.lock().await;
    Json(controller.view().await)
}

pub async fn trigger_start(State(state): State<AppState>) -> Result<Json<Value>, FlowscopeError> {
    let mut controller = state.controller.lock().await;
    let started = controller.trigger_start().await?;
    Ok(Json(json!({ "started": started })))
}

/// Raw request body is the document; `?name=` carries the file name.
pub async fn upload_document(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<Value>, FlowscopeError> {
    let pending = state.controller.lock().await.prepare_upload(&query.name).await?;
    // The backend call runs unlocked so the view and stop stay responsive.
    let finished = pending.send(body.to_vec()).await;
    let uploaded = state.controller.lock().await.finish_upload(finished).await;
    Ok(Json(json!({ "uploaded": uploaded })))
}

pub async fn stop_execution(State(state): State<AppState>) -> Json<Value> {
    let mut controller = state.controller.lock().await;
    controller.stop().await;
    Json(json!({ "stopped": true, "sessionId": controller.session_id() }))
}
