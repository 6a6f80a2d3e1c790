//! Snapshot persistence.
//!
//! The engine only talks to [`SnapshotStore`]; [`MemoryStore`] and
//! [`JsonFileStore`] are the bundled implementations.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::SnapshotError;
use crate::state::snapshot::{Snapshot, SnapshotDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Listing entry for a stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotProfile {
    pub id: String,
    pub description: String,
    pub pool_key: String,
    pub timestamp: u64,
}

impl From<&SnapshotDocument> for SnapshotProfile {
    fn from(document: &SnapshotDocument) -> Self {
        Self {
            id: document.id.clone(),
            description: document.description.clone(),
            pool_key: document.pool_key.clone(),
            timestamp: document.timestamp,
        }
    }
}

/// Named, ordered list of snapshot ids. Kept for auditing only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub id: String,
    pub description: String,
    pub snapshots: Vec<String>,
    pub timestamp: u64,
}

/// Storage port for snapshots and roadmaps.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores `snapshot` and returns the id it can be fetched with.
    async fn persist_snapshot(&self, snapshot: &Snapshot) -> Result<String, SnapshotError>;

    async fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>, SnapshotError>;

    /// Profiles ordered by timestamp, then id.
    async fn get_snapshot_profiles(&self) -> Result<Vec<SnapshotProfile>, SnapshotError>;

    async fn persist_roadmap(&self, roadmap: &Roadmap) -> Result<String, SnapshotError>;

    async fn get_roadmap(&self, id: &str) -> Result<Option<Roadmap>, SnapshotError>;
}

pub(crate) fn sort_profiles(profiles: &mut [SnapshotProfile]) {
    profiles.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}
