use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{AppState, OrphanPolicy, TagPolicy};

/// On-disk shape of the durable state slot. Field names are pinned to what
/// earlier revisions of the tool wrote, so old state files keep loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, rename = "seleccionGeneral")]
    pub seleccion_general: Vec<i64>,
    #[serde(default, rename = "elementoGrupos")]
    pub elemento_grupos: BTreeMap<String, Vec<String>>,
    #[serde(default, rename = "grupoActivo")]
    pub grupo_activo: String,
}

impl PersistedState {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            groups: state.groups.clone(),
            seleccion_general: state.selection.clone(),
            elemento_grupos: state
                .membership
                .iter()
                .map(|(id, tags)| (id.to_string(), tags.clone()))
                .collect(),
            grupo_activo: state.active_group.clone(),
        }
    }

    pub fn into_state(self, tag_policy: TagPolicy, orphan_policy: OrphanPolicy) -> AppState {
        let membership: BTreeMap<i64, Vec<String>> = self
            .elemento_grupos
            .into_iter()
            .filter_map(|(id, tags)| id.trim().parse::<i64>().ok().map(|id| (id, tags)))
            .collect();
        AppState::from_parts(
            self.groups,
            self.seleccion_general,
            membership,
            self.grupo_activo,
            tag_policy,
            orphan_policy,
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write state file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

/// The durable local slot: one JSON document at a fixed path, rewritten
/// after every mutation.
#[derive(Clone, Debug)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the state. Best-effort: a failure is reported on stderr and
    /// swallowed, the in-memory state stays authoritative for the session.
    pub fn save(&self, state: &AppState) {
        if let Err(e) = self.try_save(state) {
            eprintln!("{} {}", "[WRN]".bold().yellow(), e);
        }
    }

    pub fn try_save(&self, state: &AppState) -> Result<(), StoreError> {
        let persisted = PersistedState::from_state(state);
        let json = serde_json::to_string_pretty(&persisted)
            .map_err(|source| StoreError::Serialize { source })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.path.display().to_string(),
                source,
            })?;
        }
        std::fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Load the slot, falling back to defaults when the file is absent or
    /// unparsable. A stored active group that is no longer in the group list
    /// is replaced by the first group.
    pub fn load(&self, tag_policy: TagPolicy, orphan_policy: OrphanPolicy) -> AppState {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<PersistedState>(&contents) {
                Ok(persisted) => persisted.into_state(tag_policy, orphan_policy),
                Err(e) => {
                    eprintln!(
                        "{} state file '{}' is malformed ({e}), using defaults",
                        "[WRN]".bold().yellow(),
                        self.path.display()
                    );
                    AppState::new(tag_policy, orphan_policy)
                }
            },
            Err(_) => AppState::new(tag_policy, orphan_policy),
        }
    }
}
