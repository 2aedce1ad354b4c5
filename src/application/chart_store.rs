// Repository trait for persisted charts and workspace records
use crate::domain::chart::Chart;
use crate::domain::workspace::Workspace;
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
pub trait ChartStore: Send + Sync {
    /// Replace the charts saved for a workspace
    async fn save_charts(&self, workspace_id: &str, charts: &[Chart]) -> anyhow::Result<()>;

    /// Charts saved for a workspace, empty when none were saved
    async fn load_charts(&self, workspace_id: &str) -> anyhow::Result<Vec<Chart>>;

    /// Every saved chart list keyed by workspace id
    async fn load_all_charts(&self) -> anyhow::Result<BTreeMap<String, Vec<Chart>>>;

    async fn list_workspaces(&self) -> anyhow::Result<Vec<Workspace>>;

    /// Insert or replace by id; returns the updated list
    async fn upsert_workspace(&self, workspace: Workspace) -> anyhow::Result<Vec<Workspace>>;

    /// Remove by id; returns the updated list
    async fn remove_workspace(&self, id: &str) -> anyhow::Result<Vec<Workspace>>;
}
