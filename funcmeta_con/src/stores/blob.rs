// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::function_id::FunctionIdentifier;
use funcmeta_api::package::PackageStream;

/// Package store on a directory shared by all the workers, e.g., a network
/// file system mount.
///
/// Packages are placed under ROOT/TENANT/NAMESPACE/NAME/UUID-FILENAME and the
/// locator is the path relative to ROOT.
#[derive(Clone)]
pub struct FsBlobStore {
    root: std::path::PathBuf,
}

impl FsBlobStore {
    pub fn new(root: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: std::path::PathBuf::from(root),
        })
    }

    fn resolve(&self, locator: &str) -> anyhow::Result<std::path::PathBuf> {
        let relative = std::path::Path::new(locator);
        if locator.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            anyhow::bail!("invalid package locator: {}", locator);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl funcmeta_api::blob_store::BlobStore for FsBlobStore {
    async fn put(&self, id: &FunctionIdentifier, file: &std::path::Path, file_name: &str) -> anyhow::Result<String> {
        let file_name = std::path::Path::new(file_name)
            .file_name()
            .and_then(|f| f.to_str())
            .filter(|f| !f.is_empty())
            .unwrap_or("package");
        let locator = format!("{}/{}/{}/{}-{}", id.tenant, id.namespace, id.name, uuid::Uuid::new_v4(), file_name);
        let dest = self.resolve(&locator)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = tokio::fs::copy(file, &dest).await?;
        log::info!("stored package of {} at {} ({} bytes)", id, locator, size);
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> anyhow::Result<PackageStream> {
        let file = tokio::fs::File::open(self.resolve(locator)?).await?;
        Ok(Box::pin(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funcmeta_api::blob_store::BlobStore;

    #[tokio::test]
    async fn test_blob_store_put_get() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(root.path().to_str().unwrap()).unwrap();

        let src = root.path().join("source.bin");
        std::fs::write(&src, b"package content").unwrap();
        let locator = store.put(&FunctionIdentifier::new("t", "n", "f"), &src, "/some/dir/pkg.wasm").await.unwrap();
        assert!(locator.starts_with("t/n/f/"));
        assert!(locator.ends_with("-pkg.wasm"));

        let content = crate::test_utils::read_all(store.get(&locator).await.unwrap()).await;
        assert_eq!(b"package content".to_vec(), content);

        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store.get("/etc/passwd").await.is_err());
        assert!(store.get("t/n/f/missing").await.is_err());
    }
}
