// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::function_id::FunctionIdentifier;
use funcmeta_api::record::FunctionRecord;

/// Function metadata kept in memory, shared by all the clones.
#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    records: std::sync::Arc<tokio::sync::Mutex<std::collections::BTreeMap<FunctionIdentifier, FunctionRecord>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: Vec<FunctionRecord>) -> Self {
        Self {
            records: std::sync::Arc::new(tokio::sync::Mutex::new(
                records.into_iter().map(|r| (r.id().clone(), r)).collect(),
            )),
        }
    }

    pub(crate) async fn snapshot(&self) -> Vec<FunctionRecord> {
        self.records.lock().await.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl funcmeta_api::metadata_store::MetadataStore for InMemoryMetadataStore {
    async fn get(&self, id: &FunctionIdentifier) -> anyhow::Result<Option<FunctionRecord>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn list(&self, tenant: &str, namespace: &str) -> anyhow::Result<Vec<FunctionRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.id().tenant == tenant && r.id().namespace == namespace)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl funcmeta_api::metadata_store::MetadataWriter for InMemoryMetadataStore {
    async fn put(&self, record: FunctionRecord) -> anyhow::Result<()> {
        self.records.lock().await.insert(record.id().clone(), record);
        Ok(())
    }

    async fn remove(&self, id: &FunctionIdentifier) -> anyhow::Result<Option<FunctionRecord>> {
        Ok(self.records.lock().await.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funcmeta_api::metadata_store::{MetadataStore, MetadataWriter};

    #[tokio::test]
    async fn test_memory_store_list_by_namespace() {
        let store = InMemoryMetadataStore::new();
        for (ns, name) in [("n", "b"), ("n", "a"), ("other", "c")] {
            store.put(crate::test_utils::record("t", ns, name)).await.unwrap();
        }
        let names: Vec<String> = store.list("t", "n").await.unwrap().iter().map(|r| r.id().name.clone()).collect();
        assert_eq!(vec!["a", "b"], names);
        assert!(store.exists(&FunctionIdentifier::new("t", "other", "c")).await.unwrap());

        assert!(store.remove(&FunctionIdentifier::new("t", "other", "c")).await.unwrap().is_some());
        assert!(store.remove(&FunctionIdentifier::new("t", "other", "c")).await.unwrap().is_none());
        assert!(!store.exists(&FunctionIdentifier::new("t", "other", "c")).await.unwrap());
    }
}
