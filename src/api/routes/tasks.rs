use axum::{extract::State, Json};
use serde_json::{json, Value};
use crate::api::AppState;

pub async fn list_tasks(State(state): State<AppState>) -> Json<Value> {
    let tasks: Vec<Value> = state
        .catalog
        .tasks()
        .iter()
        .map(|t| {
            json!({
                "taskId": t.task_id,
                "title": t.title,
                "isLiveExecution": t.is_live_execution,
                "isFileUploadGated": t.is_file_upload_gated,
                "steps": t.steps(),
                "totalNominalDurationMs": t.total_nominal_duration_ms(),
            })
        })
        .collect();
    Json(json!({ "tasks": tasks, "total": tasks.len() }))
}
