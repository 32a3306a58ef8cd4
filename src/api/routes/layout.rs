use axum::{extract::{Query, State}, Json};
use serde_json::{json, Value};
use crate::api::models::LayoutQuery;
use crate::api::AppState;
use crate::workflow::{layout, positions};

/// Node positions for `n` agents, or for the selected task's steps when `n` is absent.
pub async fn get_layout(
    State(state): State<AppState>,
    Query(query): Query<LayoutQuery>,
) -> Json<Value> {
    if let Some(n) = query.n {
        let points: Vec<Value> = positions(n)
            .into_iter()
            .map(|(x, y)| json!({ "x": x, "y": y }))
            .collect();
        return Json(json!({ "positions": points }));
    }

    let model = state.controller.lock().await.model();
    let agent_ids: Vec<&str> = model
        .as_deref()
        .map(|m| m.steps().iter().map(|s| s.agent_id.as_str()).collect())
        .unwrap_or_default();
    Json(json!({ "positions": layout(&agent_ids) }))
}
