// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

type Tenants = std::collections::BTreeMap<String, std::collections::BTreeSet<String>>;

/// Tenants and namespaces loaded from the configuration.
#[derive(Clone, Default)]
pub struct StaticAdminDirectory {
    tenants: std::sync::Arc<tokio::sync::RwLock<Tenants>>,
}

impl StaticAdminDirectory {
    pub fn new(tenants: &[crate::TenantSettings]) -> Self {
        let tenants = tenants
            .iter()
            .map(|t| (t.name.clone(), t.namespaces.iter().cloned().collect()))
            .collect::<Tenants>();
        Self {
            tenants: std::sync::Arc::new(tokio::sync::RwLock::new(tenants)),
        }
    }

    pub async fn add_namespace(&self, tenant: &str, namespace: &str) {
        self.tenants
            .write()
            .await
            .entry(tenant.to_string())
            .or_default()
            .insert(namespace.to_string());
    }

    pub async fn remove_namespace(&self, tenant: &str, namespace: &str) {
        if let Some(namespaces) = self.tenants.write().await.get_mut(tenant) {
            namespaces.remove(namespace);
        }
    }

    pub async fn remove_tenant(&self, tenant: &str) {
        self.tenants.write().await.remove(tenant);
    }
}

#[async_trait::async_trait]
impl funcmeta_api::admin::AdminDirectory for StaticAdminDirectory {
    async fn tenant_exists(&self, tenant: &str) -> anyhow::Result<bool> {
        Ok(self.tenants.read().await.contains_key(tenant))
    }

    async fn namespace_list(&self, tenant: &str) -> anyhow::Result<std::collections::BTreeSet<String>> {
        Ok(self.tenants.read().await.get(tenant).cloned().unwrap_or_default())
    }
}
