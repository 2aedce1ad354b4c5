// Application state for HTTP handlers
use crate::application::engine::EngineHandle;
use crate::application::workspace_service::WorkspaceService;
use crate::domain::chart::TagNode;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub workspaces: WorkspaceService,
    /// Period of `GET /charts/:id/stream` frames
    pub stream_interval: Duration,
    /// Nodes the attached source can offer for browsing
    pub nodes: Vec<TagNode>,
}
