// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::function_id::FunctionIdentifier;
use funcmeta_api::record::FunctionRecord;

/// Function metadata kept in memory and saved as a JSON snapshot after
/// every write, so that it survives restarts.
#[derive(Clone)]
pub struct FileMetadataStore {
    path: std::path::PathBuf,
    inner: super::memory::InMemoryMetadataStore,
}

impl FileMetadataStore {
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let path = std::path::PathBuf::from(path);
        let records: Vec<FunctionRecord> = match path.exists() {
            true => serde_json::from_str(&std::fs::read_to_string(&path)?)?,
            false => vec![],
        };
        log::info!("loaded {} function records from {}", records.len(), path.display());
        Ok(Self {
            path,
            inner: super::memory::InMemoryMetadataStore::from_records(records),
        })
    }

    async fn save(&self) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.inner.snapshot().await)?;
        tokio::fs::write(&self.path, serialized).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl funcmeta_api::metadata_store::MetadataStore for FileMetadataStore {
    async fn get(&self, id: &FunctionIdentifier) -> anyhow::Result<Option<FunctionRecord>> {
        self.inner.get(id).await
    }

    async fn list(&self, tenant: &str, namespace: &str) -> anyhow::Result<Vec<FunctionRecord>> {
        self.inner.list(tenant, namespace).await
    }
}

#[async_trait::async_trait]
impl funcmeta_api::metadata_store::MetadataWriter for FileMetadataStore {
    async fn put(&self, record: FunctionRecord) -> anyhow::Result<()> {
        self.inner.put(record).await?;
        self.save().await
    }

    async fn remove(&self, id: &FunctionIdentifier) -> anyhow::Result<Option<FunctionRecord>> {
        let removed = self.inner.remove(id).await?;
        if removed.is_some() {
            self.save().await?;
        }
        Ok(removed)
    }
}
