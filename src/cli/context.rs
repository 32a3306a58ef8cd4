use std::path::Path;
use std::sync::Arc;
use crate::config::{parse_config, FlowscopeConfig};
use crate::control_plane::HttpControlPlane;
use crate::controller::{ControllerSettings, ExecutionController};
use crate::errors::FlowscopeError;
use crate::stream::WsTransport;

/// Load the config file when one is given, defaults otherwise.
pub async fn load_config(path: Option<&str>) -> Result<FlowscopeConfig, FlowscopeError> {
    match path {
        Some(p) => parse_config(Path::new(p)).await,
        None => Ok(FlowscopeConfig::default()),
    }
}

/// Controller wired to the HTTP control plane and WebSocket stream.
pub fn build_controller(
    config: &FlowscopeConfig,
    settings: ControllerSettings,
    base_url: Option<&str>,
) -> Result<ExecutionController, FlowscopeError> {
    let base_url = base_url.map(str::to_string).unwrap_or_else(|| config.base_url());
    let control_plane = HttpControlPlane::new(&base_url, config.request_timeout())?;
    Ok(ExecutionController::new(
        settings,
        Arc::new(control_plane),
        Arc::new(WsTransport::default()),
    ))
}
