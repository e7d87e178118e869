// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::metadata_gateway::MetadataGateway;
use crate::package_resolver::{PackageResolver, WorkerPolicy};
use crate::update_planner::{PlannerConfig, UpdatePlanner};
use crate::validator::{ValidationMode, Validator};
use funcmeta_api::deployment::{ComponentType, DeploymentSpec, UpdateOptions};
use funcmeta_api::error::ControlPlaneError;
use funcmeta_api::function_id::FunctionIdentifier;
use funcmeta_api::package::{PackageDescriptor, PackageStream};
use funcmeta_api::record::FunctionRecord;


/// External services used by the control plane.
#[derive(Clone)]
pub struct Collaborators {
    pub admin: std::sync::Arc<dyn funcmeta_api::admin::AdminDirectory>,
    pub metadata_store: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataStore>,
    pub leader: std::sync::Arc<dyn funcmeta_api::leader::LeaderLink>,
    pub blob_store: std::sync::Arc<dyn funcmeta_api::blob_store::BlobStore>,
    pub connectors: std::sync::Arc<dyn funcmeta_api::registry::ArchiveRegistry>,
    pub functions: std::sync::Arc<dyn funcmeta_api::registry::ArchiveRegistry>,
}

#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub policy: WorkerPolicy,
    pub planner: PlannerConfig,
    pub leader_timeout: std::time::Duration,
    pub download_dir: Option<std::path::PathBuf>,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            policy: WorkerPolicy::default(),
            planner: PlannerConfig::default(),
            leader_timeout: std::time::Duration::from_secs(30),
            download_dir: None,
        }
    }
}

/// Entry point of every request: validate, resolve the package, plan the
/// update, hand the write to the leader.
///
/// Each request is handled on its own: nothing is shared between requests
/// except the collaborators.
#[derive(Clone)]
pub struct ControlPlane {
    metadata_store: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataStore>,
    validator: Validator,
    resolver: PackageResolver,
    planner: UpdatePlanner,
    gateway: MetadataGateway,
}

fn internal_error(err: anyhow::Error) -> ControlPlaneError {
    ControlPlaneError::InternalError(err.to_string())
}

fn not_found(id: &FunctionIdentifier) -> ControlPlaneError {
    ControlPlaneError::NotFound(format!("Function {} doesn't exist", id.name))
}

impl ControlPlane {
    pub fn new(collaborators: Collaborators, config: ControlPlaneConfig) -> Self {
        let resolver = PackageResolver::new(
            collaborators.metadata_store.clone(),
            collaborators.connectors,
            collaborators.functions,
            collaborators.blob_store,
            config.download_dir,
        );
        Self {
            validator: Validator::new(collaborators.admin, collaborators.metadata_store.clone(), resolver.clone(), config.policy),
            metadata_store: collaborators.metadata_store,
            resolver,
            planner: UpdatePlanner::new(config.planner),
            gateway: MetadataGateway::new(collaborators.leader, config.leader_timeout),
        }
    }

    pub fn get_functions_api(&self) -> Box<dyn funcmeta_api::functions::FunctionsAPI> {
        Box::new(self.clone())
    }

    async fn stored(&self, id: &FunctionIdentifier) -> Result<Option<FunctionRecord>, ControlPlaneError> {
        self.metadata_store.get(id).await.map_err(internal_error)
    }
}

#[async_trait::async_trait]
impl funcmeta_api::functions::FunctionsAPI for ControlPlane {
    async fn register_function(
        &mut self,
        id: FunctionIdentifier,
        spec: Option<DeploymentSpec>,
        artifact: Option<PackageDescriptor>,
    ) -> Result<(), ControlPlaneError> {
        let validated = self.validator.validate(&id, spec, artifact, ValidationMode::Register).await?;

        let package_location = self.resolver.persist(&id, &validated.package).await?;
        let transform_function_package_location = match &validated.transform_package {
            Some(package) => Some(self.resolver.persist(&id, package).await?),
            None => None,
        };

        let record = FunctionRecord {
            details: validated.details,
            package_location,
            transform_function_package_location,
            create_time: chrono::Utc::now().timestamp_millis(),
            version: 0,
        };
        self.gateway.apply(record, false).await?;
        log::info!("function {} registered", id);
        Ok(())
    }

    async fn update_function(
        &mut self,
        id: FunctionIdentifier,
        spec: Option<DeploymentSpec>,
        artifact: Option<PackageDescriptor>,
        options: UpdateOptions,
    ) -> Result<(), ControlPlaneError> {
        id.check()?;
        let existing = self.stored(&id).await?;
        let validated = self
            .validator
            .validate(&id, spec, artifact, ValidationMode::Update { existing: existing.as_ref() })
            .await?;
        let existing = existing.ok_or_else(|| ControlPlaneError::BadRequest(format!("Function {} doesn't exist", id.name)))?;

        let package_changed = validated.package_changed || validated.transform_package.is_some();
        let mut record = self.planner.plan(&existing, &validated.details, package_changed, &options).into_result()?;

        if validated.package_changed {
            record.package_location = self.resolver.persist(&id, &validated.package).await?;
        }
        if let Some(package) = &validated.transform_package {
            record.transform_function_package_location = Some(self.resolver.persist(&id, package).await?);
        }

        let version = record.version;
        self.gateway.apply(record, true).await?;
        log::info!("function {} updated to version {}", id, version);
        Ok(())
    }

    async fn deregister_function(&mut self, id: FunctionIdentifier) -> Result<(), ControlPlaneError> {
        id.check()?;
        let record = self.stored(&id).await?.ok_or_else(|| not_found(&id))?;
        self.gateway.remove(record).await?;
        log::info!("function {} deregistered", id);
        Ok(())
    }

    async fn get_function_info(&mut self, id: FunctionIdentifier) -> Result<DeploymentSpec, ControlPlaneError> {
        id.check()?;
        let record = self.stored(&id).await?.ok_or_else(|| not_found(&id))?;
        let mut spec = DeploymentSpec::from(&record.details);
        spec.package = Some(record.package_location.to_string());
        spec.transform_function = record.transform_function_package_location.map(|l| l.to_string());
        Ok(spec)
    }

    async fn list_functions(&mut self, tenant: &str, namespace: &str) -> Result<Vec<String>, ControlPlaneError> {
        funcmeta_api::function_id::check_tenant_namespace(tenant, namespace)?;
        Ok(self
            .metadata_store
            .list(tenant, namespace)
            .await
            .map_err(internal_error)?
            .into_iter()
            .filter(|r| r.details.component_type == ComponentType::Function)
            .map(|r| r.details.id.name)
            .collect())
    }

    async fn download_package(&mut self, path: &str) -> Result<PackageStream, ControlPlaneError> {
        if path.trim().is_empty() {
            return Err(ControlPlaneError::BadRequest("Function package path is not provided".to_string()));
        }
        log::debug!("download of {}", path);
        Ok(self.resolver.download_path(path).await?)
    }

    async fn download_function_package(&mut self, id: FunctionIdentifier, transform: bool) -> Result<PackageStream, ControlPlaneError> {
        id.check()?;
        let record = self.stored(&id).await?.ok_or_else(|| not_found(&id))?;
        let (location, component_type) = match transform {
            true => (
                record
                    .transform_function_package_location
                    .ok_or_else(|| ControlPlaneError::NotFound(format!("Function {} has no transform function", id.name)))?,
                ComponentType::Function,
            ),
            false => (record.package_location, record.details.component_type),
        };
        log::debug!("download of the package of {} from {}", id, location);
        Ok(self.resolver.download(&location, component_type).await?)
    }
}
