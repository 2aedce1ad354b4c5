// Workspace domain model - connection records and export bundles
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::chart::Chart;

/// Persistence key used when no workspace is selected.
pub const DEFAULT_WORKSPACE_ID: &str = "__default__";
pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    #[default]
    Opcua,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Anonymous,
    Username,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityMode {
    None,
    Sign,
    SignAndEncrypt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityPolicy {
    None,
    Basic128Rsa15,
    Basic256,
    Basic256Sha256,
    #[serde(rename = "Aes128_Sha256_RsaOaep")]
    Aes128Sha256RsaOaep,
    #[serde(rename = "Aes256_Sha256_RsaPss")]
    Aes256Sha256RsaPss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub interface: Interface,
    pub endpoint_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_mode: Option<AuthMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub remember_password: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_mode: Option<SecurityMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_policy: Option<SecurityPolicy>,
}

impl Workspace {
    /// Copy safe to write to disk: the password only survives when the user
    /// asked for it to be remembered, and the auth mode is made explicit.
    pub fn for_storage(&self) -> Self {
        let mut stored = self.clone();
        stored.auth_mode = Some(self.effective_auth_mode());
        if !stored.remember_password {
            stored.password = None;
        }
        stored
    }

    /// Username auth is implied when a username is set and no mode is given.
    fn effective_auth_mode(&self) -> AuthMode {
        self.auth_mode.unwrap_or(match self.username.as_deref() {
            Some(u) if !u.is_empty() => AuthMode::Username,
            _ => AuthMode::Anonymous,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub workspaces: Vec<Workspace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charts_by_workspace: Option<BTreeMap<String, Vec<Chart>>>,
}

impl ExportBundle {
    pub fn new(
        workspaces: Vec<Workspace>,
        charts_by_workspace: Option<BTreeMap<String, Vec<Chart>>>,
        exported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version: BUNDLE_VERSION,
            exported_at,
            workspaces: workspaces.iter().map(Workspace::for_storage).collect(),
            charts_by_workspace,
        }
    }
}
