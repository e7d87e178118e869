// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::function_id::FunctionIdentifier;
use crate::record::FunctionRecord;

/// Read access to the function metadata, available on every worker.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, id: &FunctionIdentifier) -> anyhow::Result<Option<FunctionRecord>>;

    /// Records of a namespace, ordered by function name.
    async fn list(&self, tenant: &str, namespace: &str) -> anyhow::Result<Vec<FunctionRecord>>;

    async fn exists(&self, id: &FunctionIdentifier) -> anyhow::Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

/// Write access to the function metadata. Only the leader holds one.
#[async_trait::async_trait]
pub trait MetadataWriter: MetadataStore {
    async fn put(&self, record: FunctionRecord) -> anyhow::Result<()>;

    /// Return the removed record, if any.
    async fn remove(&self, id: &FunctionIdentifier) -> anyhow::Result<Option<FunctionRecord>>;
}
