use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// A role alias entry from the deprecated `~/.aws/roles` file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyRole {
    pub role: String,
    #[serde(default)]
    pub mfa: Option<String>,
}

impl LegacyRole {
    /// MFA serial number, treating an empty value as absent
    pub fn mfa_serial(&self) -> Option<&str> {
        self.mfa.as_deref().filter(|serial| !serial.is_empty())
    }
}

/// Alias to role mapping loaded from the deprecated role file
#[derive(Debug, Clone)]
pub struct RoleStore {
    path: PathBuf,
    roles: HashMap<String, LegacyRole>,
}

impl RoleStore {
    /// Load the role file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read role file: {}", path.display()))?;
        let store = Self::parse(path, &raw)?;
        debug!("Loaded {} role aliases from {}", store.roles.len(), path.display());
        Ok(store)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self> {
        // An empty document deserializes to unit, not a mapping
        let roles = if raw.trim().is_empty() {
            HashMap::new()
        } else {
            serde_yaml::from_str(raw)
                .with_context(|| format!("Failed to parse role file: {}", path.display()))?
        };

        Ok(Self {
            path: path.to_path_buf(),
            roles,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, alias: &str) -> Option<&LegacyRole> {
        self.roles.get(alias)
    }
}
