// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT
pub mod control_plane;
pub mod leader;
pub mod metadata_gateway;
pub mod package_inspector;
pub mod package_resolver;
pub mod stores;
pub mod update_planner;
pub mod validator;

#[cfg(test)]
pub mod test_utils;

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct TenantSettings {
    pub name: String,
    #[serde(default)]
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataStoreSettings {
    Memory,
    File { path: String },
    Redis { url: String },
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FuncMetaSettings {
    pub metadata_store: MetadataStoreSettings,
    pub blob_store_dir: String,
    pub connectors_dir: String,
    pub functions_dir: String,
    /// Empty means the temporary directory of the OS.
    #[serde(default)]
    pub download_dir: String,
    #[serde(default)]
    pub upload_builtins: bool,
    #[serde(default)]
    pub externally_managed_runtime: bool,
    pub leader_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub resources_count_as_change: bool,
    #[serde(default)]
    pub tenants: Vec<TenantSettings>,
}

fn default_true() -> bool {
    true
}

fn split_store<S>(store: S) -> (
    std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataStore>,
    std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataWriter>,
)
where
    S: funcmeta_api::metadata_store::MetadataStore + funcmeta_api::metadata_store::MetadataWriter + 'static,
{
    let store = std::sync::Arc::new(store);
    (store.clone(), store)
}

/// Build the control plane and its collaborators from the settings.
///
/// The leader task must be spawned by the caller, else every write hangs
/// until the leader timeout expires.
pub fn funcmeta_con_build(
    settings: &FuncMetaSettings,
) -> anyhow::Result<(control_plane::ControlPlane, leader::MetadataLeader, leader::Task)> {
    log::debug!("Settings: {:?}", settings);

    let (metadata_store, metadata_writer) = match &settings.metadata_store {
        MetadataStoreSettings::Memory => split_store(stores::memory::InMemoryMetadataStore::new()),
        MetadataStoreSettings::File { path } => split_store(stores::file::FileMetadataStore::new(path)?),
        MetadataStoreSettings::Redis { url } => split_store(stores::redis::RedisMetadataStore::new(url)?),
    };

    let (mut leader, leader_task) = leader::MetadataLeader::new(metadata_writer);

    let control_plane = control_plane::ControlPlane::new(
        control_plane::Collaborators {
            admin: std::sync::Arc::new(stores::admin::StaticAdminDirectory::new(&settings.tenants)),
            metadata_store,
            leader: leader.get_leader_link(),
            blob_store: std::sync::Arc::new(stores::blob::FsBlobStore::new(&settings.blob_store_dir)?),
            connectors: std::sync::Arc::new(stores::registry::DirectoryRegistry::new(&settings.connectors_dir)),
            functions: std::sync::Arc::new(stores::registry::DirectoryRegistry::new(&settings.functions_dir)),
        },
        control_plane::ControlPlaneConfig {
            policy: package_resolver::WorkerPolicy {
                upload_builtins: settings.upload_builtins,
                externally_managed_runtime: settings.externally_managed_runtime,
            },
            planner: update_planner::PlannerConfig {
                resources_count_as_change: settings.resources_count_as_change,
            },
            leader_timeout: std::time::Duration::from_millis(settings.leader_timeout_ms),
            download_dir: match settings.download_dir.is_empty() {
                true => None,
                false => Some(std::path::PathBuf::from(&settings.download_dir)),
            },
        },
    );

    Ok((control_plane, leader, leader_task))
}

pub fn funcmeta_default_conf() -> String {
    String::from(
        r##"blob_store_dir = "blobs"
connectors_dir = "connectors"
functions_dir = "functions"
download_dir = ""
upload_builtins = false
externally_managed_runtime = false
leader_timeout_ms = 30000
resources_count_as_change = true
metadata_store = { type = "file", path = "functions.json" }
tenants = [
    { name = "public", namespaces = ["default"] }
]
"##,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_conf() {
        let settings: FuncMetaSettings = toml::from_str(&funcmeta_default_conf()).unwrap();
        assert_eq!(
            MetadataStoreSettings::File {
                path: "functions.json".to_string()
            },
            settings.metadata_store
        );
        assert_eq!(30000, settings.leader_timeout_ms);
        assert!(settings.resources_count_as_change);
        assert_eq!(vec!["default".to_string()], settings.tenants[0].namespaces);
    }

    #[test]
    fn test_store_variants() {
        let settings: FuncMetaSettings = toml::from_str(
            r##"blob_store_dir = "b"
connectors_dir = "c"
functions_dir = "f"
leader_timeout_ms = 10
metadata_store = { type = "redis", url = "redis://localhost:6379" }
"##,
        )
        .unwrap();
        assert_eq!(
            MetadataStoreSettings::Redis {
                url: "redis://localhost:6379".to_string()
            },
            settings.metadata_store
        );
        assert!(settings.download_dir.is_empty());
        assert!(settings.tenants.is_empty());
        assert!(settings.resources_count_as_change);
        assert!(toml::from_str::<MetadataStoreSettings>(r#"type = "memory""#).is_ok());
    }

    #[tokio::test]
    async fn test_build_and_register() {
        crate::test_utils::init_logger();

        let root = tempfile::tempdir().unwrap();
        let dir = |name: &str| root.path().join(name).to_str().unwrap().to_string();
        std::fs::create_dir_all(dir("functions")).unwrap();
        crate::test_utils::write_package(&root.path().join("functions"), "exclamation.tar.gz", Some(crate::test_utils::EXCLAMATION_MANIFEST));

        let settings = FuncMetaSettings {
            metadata_store: MetadataStoreSettings::File { path: dir("functions.json") },
            blob_store_dir: dir("blobs"),
            connectors_dir: dir("connectors"),
            functions_dir: dir("functions"),
            download_dir: String::new(),
            upload_builtins: true,
            externally_managed_runtime: false,
            leader_timeout_ms: 5000,
            resources_count_as_change: true,
            tenants: vec![TenantSettings {
                name: "t".to_string(),
                namespaces: vec!["n".to_string()],
            }],
        };

        let (control_plane, _leader, leader_task) = funcmeta_con_build(&settings).unwrap();
        tokio::spawn(leader_task);
        let mut api = control_plane.get_functions_api();
        let details = crate::test_utils::details("t", "n", "f");
        api.register_function(
            details.id.clone(),
            Some(funcmeta_api::deployment::DeploymentSpec::from(&details)),
            Some(funcmeta_api::package::PackageDescriptor::BuiltinReference {
                name: "exclamation".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(vec!["f".to_string()], api.list_functions("t", "n").await.unwrap());

        // the file store outlives the control plane
        let reopened = stores::file::FileMetadataStore::new(&dir("functions.json")).unwrap();
        let record = funcmeta_api::metadata_store::MetadataStore::get(&reopened, &details.id).await.unwrap().unwrap();
        assert!(matches!(record.package_location, funcmeta_api::package::PackageLocation::Blob(_)));
    }
}
