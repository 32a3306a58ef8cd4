use std::time::Duration;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use crate::errors::FlowscopeError;
use super::types::{ExecuteRequest, ExecuteResponse, InitializeResponse, UploadResponse};
use super::ControlPlane;

pub struct HttpControlPlane {
    client: Client,
    base_url: String,
}

impl HttpControlPlane {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, FlowscopeError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| FlowscopeError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn request_error(what: &str, e: reqwest::Error) -> FlowscopeError {
    if e.is_timeout() {
        FlowscopeError::Timeout(format!("{} timed out: {}", what, e))
    } else {
        FlowscopeError::Network(format!("{} failed: {}", what, e))
    }
}

/// Decode a backend reply. Non-2xx bodies that still carry the response
/// shape are returned as-is so their `success: false` reaches the caller.
async fn decode<T: DeserializeOwned>(what: &str, resp: Response) -> Result<T, FlowscopeError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| request_error(what, e))?;
    match serde_json::from_str::<T>(&body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !status.is_success() => Err(FlowscopeError::Backend(format!(
            "{} returned HTTP {}",
            what,
            status.as_u16()
        ))),
        Err(e) => Err(FlowscopeError::Backend(format!("{} returned an unreadable body: {}", what, e))),
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn upload_document(
        &self,
        session_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, FlowscopeError> {
        debug!(session_id = %session_id, file = %file_name, size = bytes.len(), "Uploading document");
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("sessionId", session_id.to_string());

        let resp = self.client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error("Upload", e))?;
        decode("Upload", resp).await
    }

    async fn initialize_workflow(&self, scenario_id: &str) -> Result<InitializeResponse, FlowscopeError> {
        debug!(scenario = %scenario_id, "Initializing workflow");
        let resp = self.client
            .post(self.url("/api/workflow/initialize"))
            .json(&json!({ "scenarioId": scenario_id }))
            .send()
            .await
            .map_err(|e| request_error("Initialize", e))?;
        decode("Initialize", resp).await
    }

    async fn execute_workflow(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, FlowscopeError> {
        debug!(session_id = %request.session_id, orchestration = %request.orchestration_id, "Executing workflow");
        let resp = self.client
            .post(self.url("/api/workflow/execute"))
            .json(request)
            .send()
            .await
            .map_err(|e| request_error("Execute", e))?;
        decode("Execute", resp).await
    }
}
