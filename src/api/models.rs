use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExecutionRequest {
    /// Omit to clear the selection.
    pub task_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LayoutQuery {
    pub n: Option<usize>,
}

#[derive(Deserialize)]
pub struct UploadQuery {
    pub name: String,
}
