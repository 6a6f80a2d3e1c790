use super::{Roadmap, SnapshotProfile, SnapshotStore, sort_profiles};
use crate::error::SnapshotError;
use crate::hash::FastMap;
use crate::state::snapshot::{Snapshot, SnapshotDocument};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-process store. Snapshots are kept in their encoded form so a round
/// trip through it exercises the same codec as a durable store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: RwLock<FastMap<String, SnapshotDocument>>,
    roadmaps: RwLock<FastMap<String, Roadmap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn persist_snapshot(&self, snapshot: &Snapshot) -> Result<String, SnapshotError> {
        let document = snapshot.to_document();
        let id = document.id.clone();
        self.snapshots.write().await.insert(id.clone(), document);
        Ok(id)
    }

    async fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>, SnapshotError> {
        match self.snapshots.read().await.get(id) {
            Some(document) => Snapshot::from_document(document).map(Some),
            None => Ok(None),
        }
    }

    async fn get_snapshot_profiles(&self) -> Result<Vec<SnapshotProfile>, SnapshotError> {
        let mut profiles: Vec<SnapshotProfile> = self
            .snapshots
            .read()
            .await
            .values()
            .map(SnapshotProfile::from)
            .collect();
        sort_profiles(&mut profiles);
        Ok(profiles)
    }

    async fn persist_roadmap(&self, roadmap: &Roadmap) -> Result<String, SnapshotError> {
        self.roadmaps
            .write()
            .await
            .insert(roadmap.id.clone(), roadmap.clone());
        Ok(roadmap.id.clone())
    }

    async fn get_roadmap(&self, id: &str) -> Result<Option<Roadmap>, SnapshotError> {
        Ok(self.roadmaps.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::core_pool::tests::{initialized_pool, owner};

    #[tokio::test]
    async fn persists_and_lists_snapshots() {
        let store = MemoryStore::new();
        let mut pool = initialized_pool();
        pool.mint(owner(), -60, 60, 10_000).unwrap();

        let late = Snapshot::new("b", "late", 20, pool.clone());
        let early = Snapshot::new("a", "early", 10, initialized_pool());
        assert_eq!(store.persist_snapshot(&late).await.unwrap(), "b");
        assert_eq!(store.persist_snapshot(&early).await.unwrap(), "a");

        assert_eq!(store.get_snapshot("b").await.unwrap(), Some(late));
        assert_eq!(store.get_snapshot("missing").await.unwrap(), None);

        let profiles = store.get_snapshot_profiles().await.unwrap();
        let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(profiles[1].description, "late");
    }

    #[tokio::test]
    async fn persists_roadmaps() {
        let store = MemoryStore::new();
        let roadmap = Roadmap {
            id: "route".into(),
            description: "exploit replay".into(),
            snapshots: vec!["a".into(), "b".into()],
            timestamp: 3,
        };
        store.persist_roadmap(&roadmap).await.unwrap();
        assert_eq!(store.get_roadmap("route").await.unwrap(), Some(roadmap));
        assert_eq!(store.get_roadmap("other").await.unwrap(), None);
    }
}
