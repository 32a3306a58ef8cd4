pub mod types;
pub mod client;

use async_trait::async_trait;
use crate::errors::FlowscopeError;

pub use client::HttpControlPlane;
pub use types::{ExecuteRequest, ExecuteResponse, InitializeResponse, Orchestration, UploadResponse};

/// Remote backend that owns document intake and workflow orchestration.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn upload_document(
        &self,
        session_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, FlowscopeError>;

    /// Ask the backend to build an orchestration for a scenario.
    async fn initialize_workflow(&self, scenario_id: &str) -> Result<InitializeResponse, FlowscopeError>;

    /// Run an initialized orchestration; progress arrives on the event stream.
    async fn execute_workflow(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, FlowscopeError>;
}
