// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::function_id::FunctionIdentifier;
use crate::package::PackageStream;

/// Shared package storage, reachable from every worker.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the content of `file` as the package of `id` and return its locator.
    async fn put(&self, id: &FunctionIdentifier, file: &std::path::Path, file_name: &str) -> anyhow::Result<String>;

    async fn get(&self, locator: &str) -> anyhow::Result<PackageStream>;
}
