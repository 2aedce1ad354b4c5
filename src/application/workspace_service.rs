// Workspace service - workspace records, activation and export bundles
use crate::application::chart_store::ChartStore;
use crate::application::engine::{EngineError, EngineHandle};
use crate::domain::chart::Chart;
use crate::domain::workspace::{ExportBundle, Workspace, BUNDLE_VERSION};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("unsupported bundle version {0}")]
    UnsupportedBundle(u32),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct WorkspaceService {
    store: Arc<dyn ChartStore>,
    engine: EngineHandle,
}

impl WorkspaceService {
    pub fn new(store: Arc<dyn ChartStore>, engine: EngineHandle) -> Self {
        Self { store, engine }
    }

    pub async fn list(&self) -> Result<Vec<Workspace>, WorkspaceError> {
        Ok(self.store.list_workspaces().await?)
    }

    pub async fn save(&self, workspace: Workspace) -> Result<Vec<Workspace>, WorkspaceError> {
        Ok(self.store.upsert_workspace(workspace.for_storage()).await?)
    }

    pub async fn remove(&self, id: &str) -> Result<Vec<Workspace>, WorkspaceError> {
        Ok(self.store.remove_workspace(id).await?)
    }

    /// Make `workspace_id` the active chart set. A store that cannot be read
    /// leaves the current charts in place.
    pub async fn activate(&self, workspace_id: &str) -> Result<Vec<Chart>, WorkspaceError> {
        let saved = match self.store.load_charts(workspace_id).await {
            Ok(charts) => charts,
            Err(e) => {
                tracing::warn!(workspace = workspace_id, "Failed to load saved charts: {:#}", e);
                Vec::new()
            }
        };
        self.engine
            .activate_workspace(workspace_id.to_string(), saved)
            .await?;
        Ok(self.engine.charts().await?)
    }

    pub async fn export(
        &self,
        include_charts: bool,
        exported_at: DateTime<Utc>,
    ) -> Result<ExportBundle, WorkspaceError> {
        let workspaces = self.store.list_workspaces().await?;
        let charts = if include_charts {
            Some(self.store.load_all_charts().await?)
        } else {
            None
        };
        Ok(ExportBundle::new(workspaces, charts, exported_at))
    }

    /// Upsert every bundled workspace and save any bundled charts. Returns the
    /// number of workspaces imported.
    pub async fn import(&self, bundle: ExportBundle) -> Result<usize, WorkspaceError> {
        if bundle.version != BUNDLE_VERSION {
            return Err(WorkspaceError::UnsupportedBundle(bundle.version));
        }

        let count = bundle.workspaces.len();
        for workspace in bundle.workspaces {
            self.store.upsert_workspace(workspace.for_storage()).await?;
        }
        for (workspace_id, charts) in bundle.charts_by_workspace.unwrap_or_default() {
            self.store.save_charts(&workspace_id, &charts).await?;
        }

        tracing::info!(workspaces = count, "Imported workspace bundle");
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::engine::tests::{spawn_engine, ManualClock};
    use crate::domain::workspace::Interface;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        charts: Mutex<BTreeMap<String, Vec<Chart>>>,
        workspaces: Mutex<Vec<Workspace>>,
    }

    #[async_trait]
    impl ChartStore for MemoryStore {
        async fn save_charts(&self, workspace_id: &str, charts: &[Chart]) -> anyhow::Result<()> {
            self.charts
                .lock()
                .await
                .insert(workspace_id.to_string(), charts.to_vec());
            Ok(())
        }

        async fn load_charts(&self, workspace_id: &str) -> anyhow::Result<Vec<Chart>> {
            Ok(self
                .charts
                .lock()
                .await
                .get(workspace_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn load_all_charts(&self) -> anyhow::Result<BTreeMap<String, Vec<Chart>>> {
            Ok(self.charts.lock().await.clone())
        }

        async fn list_workspaces(&self) -> anyhow::Result<Vec<Workspace>> {
            Ok(self.workspaces.lock().await.clone())
        }

        async fn upsert_workspace(&self, workspace: Workspace) -> anyhow::Result<Vec<Workspace>> {
            let mut workspaces = self.workspaces.lock().await;
            workspaces.retain(|w| w.id != workspace.id);
            workspaces.push(workspace);
            Ok(workspaces.clone())
        }

        async fn remove_workspace(&self, id: &str) -> anyhow::Result<Vec<Workspace>> {
            let mut workspaces = self.workspaces.lock().await;
            workspaces.retain(|w| w.id != id);
            Ok(workspaces.clone())
        }
    }

    pub(crate) fn workspace(id: &str) -> Workspace {
        Workspace {
            id: id.into(),
            name: format!("Workspace {}", id),
            interface: Interface::Opcua,
            endpoint_url: "opc.tcp://localhost:4840".into(),
            auth_mode: None,
            username: None,
            password: Some("pw".into()),
            remember_password: false,
            security_mode: None,
            security_policy: None,
        }
    }

    fn fixture() -> (WorkspaceService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let engine = spawn_engine(ManualClock::at(0));
        (WorkspaceService::new(store.clone(), engine), store)
    }

    #[tokio::test]
    async fn test_save_strips_unremembered_password() {
        let (service, _store) = fixture();
        let list = service.save(workspace("a")).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].password, None);

        let list = service.save(workspace("a")).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(service.remove("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_loads_saved_charts() {
        let (service, store) = fixture();
        let saved = vec![Chart::new("saved".into(), "Saved".into(), 5)];
        store.save_charts("ws-1", &saved).await.unwrap();

        let charts = service.activate("ws-1").await.unwrap();
        assert_eq!(charts, saved);

        let charts = service.activate("empty").await.unwrap();
        assert_eq!(charts, saved);
    }

    #[tokio::test]
    async fn test_export_then_import() {
        let (source, store) = fixture();
        source.save(workspace("a")).await.unwrap();
        store.save_charts("a", &[Chart::initial()]).await.unwrap();

        let bundle = source.export(true, Utc::now()).await.unwrap();
        assert_eq!(bundle.workspaces.len(), 1);
        assert_eq!(bundle.charts_by_workspace.as_ref().map(|c| c.len()), Some(1));

        let (other, other_store) = fixture();
        assert_eq!(other.import(bundle).await.unwrap(), 1);
        assert_eq!(other_store.load_charts("a").await.unwrap(), vec![Chart::initial()]);
    }

    #[tokio::test]
    async fn test_import_rejects_unknown_version() {
        let (service, _store) = fixture();
        let mut bundle = ExportBundle::new(Vec::new(), None, Utc::now());
        bundle.version = 2;
        assert!(matches!(
            service.import(bundle).await,
            Err(WorkspaceError::UnsupportedBundle(2))
        ));
    }
}
