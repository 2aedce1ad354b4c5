// JSON file store - charts per workspace and workspace records on disk
use crate::application::chart_store::ChartStore;
use crate::domain::chart::Chart;
use crate::domain::workspace::Workspace;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt store file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    workspaces: Vec<Workspace>,
    #[serde(default)]
    charts_by_workspace: BTreeMap<String, Vec<Chart>>,
}

/// Whole-document read-modify-write, serialized by a lock and committed
/// with a rename so a crash never leaves half a file behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_document(&self) -> Result<StoreDocument, StoreError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreDocument::default()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(StoreDocument::default());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_document(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(document)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(write_err)?;
        fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        Ok(())
    }

    async fn modify<R>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> R,
    ) -> Result<R, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let result = f(&mut document);
        self.write_document(&document).await?;
        Ok(result)
    }
}

#[async_trait]
impl ChartStore for JsonFileStore {
    async fn save_charts(&self, workspace_id: &str, charts: &[Chart]) -> anyhow::Result<()> {
        self.modify(|doc| {
            doc.charts_by_workspace
                .insert(workspace_id.to_string(), charts.to_vec());
        })
        .await?;
        tracing::trace!(workspace = workspace_id, charts = charts.len(), "Saved charts");
        Ok(())
    }

    async fn load_charts(&self, workspace_id: &str) -> anyhow::Result<Vec<Chart>> {
        let _guard = self.lock.lock().await;
        let document = self.read_document().await?;
        Ok(document
            .charts_by_workspace
            .get(workspace_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_all_charts(&self) -> anyhow::Result<BTreeMap<String, Vec<Chart>>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.charts_by_workspace)
    }

    async fn list_workspaces(&self) -> anyhow::Result<Vec<Workspace>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.workspaces)
    }

    async fn upsert_workspace(&self, workspace: Workspace) -> anyhow::Result<Vec<Workspace>> {
        let stored = workspace.for_storage();
        Ok(self
            .modify(|doc| {
                doc.workspaces.retain(|w| w.id != stored.id);
                doc.workspaces.push(stored);
                doc.workspaces.clone()
            })
            .await?)
    }

    async fn remove_workspace(&self, id: &str) -> anyhow::Result<Vec<Workspace>> {
        Ok(self
            .modify(|doc| {
                doc.workspaces.retain(|w| w.id != id);
                doc.workspaces.clone()
            })
            .await?)
    }
}
