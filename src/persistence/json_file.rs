use super::{Roadmap, SnapshotProfile, SnapshotStore, sort_profiles};
use crate::error::SnapshotError;
use crate::state::snapshot::{Snapshot, SnapshotDocument};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const SNAPSHOTS: &str = "snapshots";
const ROADMAPS: &str = "roadmaps";

/// One pretty-printed JSON document per snapshot and roadmap:
///
/// ```text
/// <root>/snapshots/<id>.json
/// <root>/roadmaps/<id>.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, kind: &str, id: &str) -> Result<PathBuf, SnapshotError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(SnapshotError::Store(format!("invalid id {id:?}")));
        }
        Ok(self.root.join(kind).join(format!("{id}.json")))
    }

    async fn write<T: Serialize>(&self, kind: &str, id: &str, value: &T) -> Result<(), SnapshotError> {
        let path = self.path(kind, id)?;
        let json = serde_json::to_vec_pretty(value).map_err(store_error)?;
        fs::create_dir_all(self.root.join(kind))
            .await
            .map_err(store_error)?;
        fs::write(&path, json).await.map_err(store_error)?;
        debug!(path = %path.display(), "document written");
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Result<Option<T>, SnapshotError> {
        let path = self.path(kind, id)?;
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| SnapshotError::Decode {
                    field: "document",
                    value: e.to_string(),
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(store_error(e)),
        }
    }
}

fn store_error(e: impl std::fmt::Display) -> SnapshotError {
    SnapshotError::Store(e.to_string())
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn persist_snapshot(&self, snapshot: &Snapshot) -> Result<String, SnapshotError> {
        let document = snapshot.to_document();
        self.write(SNAPSHOTS, &document.id, &document).await?;
        Ok(document.id)
    }

    async fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>, SnapshotError> {
        match self.read::<SnapshotDocument>(SNAPSHOTS, id).await? {
            Some(document) => Snapshot::from_document(&document).map(Some),
            None => Ok(None),
        }
    }

    async fn get_snapshot_profiles(&self) -> Result<Vec<SnapshotProfile>, SnapshotError> {
        let dir = self.root.join(SNAPSHOTS);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_error(e)),
        };

        let mut profiles = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(store_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await.map_err(store_error)?;
            let document: SnapshotDocument =
                serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Decode {
                    field: "document",
                    value: e.to_string(),
                })?;
            profiles.push(SnapshotProfile::from(&document));
        }
        sort_profiles(&mut profiles);
        Ok(profiles)
    }

    async fn persist_roadmap(&self, roadmap: &Roadmap) -> Result<String, SnapshotError> {
        self.write(ROADMAPS, &roadmap.id, roadmap).await?;
        Ok(roadmap.id.clone())
    }

    async fn get_roadmap(&self, id: &str) -> Result<Option<Roadmap>, SnapshotError> {
        self.read(ROADMAPS, id).await
    }
}
