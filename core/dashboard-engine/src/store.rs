//! FILENAME: core/dashboard-engine/src/store.rs
//! PURPOSE: In-memory registry of contracts datasets.
//! CONTEXT: Same snapshot discipline as `model::DatasetStore`: readers
//! clone `Arc`s, replacements are built before publication, deletion is
//! idempotent. The newest dataset doubles as the default for queries that
//! do not name one.

use crate::dataset::{ContractsDataset, ContractsSummary};
use crate::error::DashboardError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ContractsStore {
    datasets: RwLock<HashMap<String, Arc<ContractsDataset>>>,
    next_id: AtomicU64,
}

impl ContractsStore {
    pub fn new() -> Self {
        ContractsStore::default()
    }

    pub fn allocate_id(&self) -> String {
        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = Uuid::new_v4().simple().to_string();
        format!("cd-{}-{}", sequence, &token[..12])
    }

    pub fn insert(&self, dataset: ContractsDataset) -> Arc<ContractsDataset> {
        let shared = Arc::new(dataset);
        self.datasets
            .write()
            .insert(shared.id.clone(), Arc::clone(&shared));
        shared
    }

    pub fn get(&self, id: &str) -> Result<Arc<ContractsDataset>, DashboardError> {
        self.datasets
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DashboardError::UnknownDataset(id.to_string()))
    }

    /// The named dataset, or the most recent one when no id is given.
    pub fn get_or_latest(&self, id: Option<&str>) -> Result<Arc<ContractsDataset>, DashboardError> {
        match id {
            Some(id) if !id.is_empty() => self.get(id),
            _ => {
                let guard = self.datasets.read();
                guard
                    .values()
                    .max_by_key(|d| d.created_at)
                    .cloned()
                    .ok_or(DashboardError::NoDatasets)
            }
        }
    }

    pub fn list(&self) -> Vec<ContractsSummary> {
        let guard = self.datasets.read();
        let mut entries: Vec<&Arc<ContractsDataset>> = guard.values().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        entries.iter().map(|d| d.summary()).collect()
    }

    pub fn delete(&self, id: &str) -> bool {
        self.datasets.write().remove(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ContractRow;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn dataset(store: &ContractsStore, name: &str) -> ContractsDataset {
        ContractsDataset {
            id: store.allocate_id(),
            name: name.into(),
            created_at: Utc::now(),
            rows: vec![ContractRow::default()],
            months: Vec::new(),
            warnings: Vec::new(),
            column_map: BTreeMap::new(),
            raw_rows: Vec::new(),
            raw_columns: Vec::new(),
        }
    }

    #[test]
    fn latest_dataset_is_the_default() {
        let store = ContractsStore::new();
        assert!(matches!(
            store.get_or_latest(None),
            Err(DashboardError::NoDatasets)
        ));
        let _first = store.insert(dataset(&store, "a.xlsx"));
        let mut newer = dataset(&store, "b.xlsx");
        newer.created_at = Utc::now() + chrono::Duration::seconds(1);
        let second = store.insert(newer);
        let chosen = store.get_or_latest(None).unwrap();
        assert_eq!(chosen.id, second.id);
    }

    #[test]
    fn delete_is_idempotent() {
        let store = ContractsStore::new();
        let ds = store.insert(dataset(&store, "a.xlsx"));
        assert!(store.delete(&ds.id));
        assert!(!store.delete(&ds.id));
    }
}
