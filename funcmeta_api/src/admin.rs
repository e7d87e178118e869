// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Admin-side view of the tenants and namespaces of the cluster.
#[async_trait::async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn tenant_exists(&self, tenant: &str) -> anyhow::Result<bool>;
    async fn namespace_list(&self, tenant: &str) -> anyhow::Result<std::collections::BTreeSet<String>>;
}
