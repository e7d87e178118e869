// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::package_inspector::{InspectionError, InspectionScope};
use crate::package_resolver::{PackageResolver, PendingLocation, ResolvedPackage, WorkerPolicy};
use funcmeta_api::deployment::{DeploymentSpec, FunctionDetails, RuntimeKind};
use funcmeta_api::error::ControlPlaneError;
use funcmeta_api::function_id::FunctionIdentifier;
use funcmeta_api::package::{PackageDescriptor, PackageLocation, BUILTIN_PREFIX};
use funcmeta_api::record::FunctionRecord;

#[derive(Debug, Clone, Copy)]
pub enum ValidationMode<'a> {
    Register,
    /// `existing` is the record currently stored, if any.
    Update { existing: Option<&'a FunctionRecord> },
}

/// Outcome of a successful validation.
#[derive(Debug)]
pub struct Validated {
    pub details: FunctionDetails,
    pub package: ResolvedPackage,
    /// False if an update keeps the package of the stored record.
    pub package_changed: bool,
    /// New transform function package, if one was given.
    pub transform_package: Option<ResolvedPackage>,
}

fn bad_request(msg: impl Into<String>) -> ControlPlaneError {
    ControlPlaneError::BadRequest(msg.into())
}

fn internal_error(err: anyhow::Error) -> ControlPlaneError {
    ControlPlaneError::InternalError(err.to_string())
}

fn not_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// True if `embedded` is the string form of the stored location, as
/// returned by a get of the function.
fn same_location(embedded: &Option<String>, stored: Option<&PackageLocation>) -> bool {
    match (not_blank(embedded), stored) {
        (Some(raw), Some(stored)) => PackageLocation::from_string(raw.trim()) == *stored,
        _ => false,
    }
}

/// Package descriptor used for a request, by decreasing precedence: a
/// builtin reference embedded in the deployment, the artifact of the request, a
/// URL embedded in the deployment.
pub fn effective_descriptor(spec: &DeploymentSpec, artifact: Option<PackageDescriptor>) -> Option<PackageDescriptor> {
    let embedded = not_blank(&spec.package);
    if let Some(package) = embedded.filter(|p| p.starts_with(BUILTIN_PREFIX)) {
        return Some(PackageDescriptor::from_uri(package));
    }
    let artifact = artifact.filter(|a| match a {
        PackageDescriptor::UploadedStream { bytes, .. } => !bytes.is_empty(),
        PackageDescriptor::ExternalLocation { uri } => !uri.trim().is_empty(),
        PackageDescriptor::BuiltinReference { name } => !name.trim().is_empty(),
    });
    artifact.or_else(|| embedded.map(PackageDescriptor::from_uri))
}

/// Ordered semantic checks of a deployment request. The first failing check
/// determines the error reported.
#[derive(Clone)]
pub struct Validator {
    admin: std::sync::Arc<dyn funcmeta_api::admin::AdminDirectory>,
    metadata_store: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataStore>,
    resolver: PackageResolver,
    policy: WorkerPolicy,
}

impl Validator {
    pub fn new(
        admin: std::sync::Arc<dyn funcmeta_api::admin::AdminDirectory>,
        metadata_store: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataStore>,
        resolver: PackageResolver,
        policy: WorkerPolicy,
    ) -> Self {
        Self {
            admin,
            metadata_store,
            resolver,
            policy,
        }
    }

    pub async fn validate(
        &self,
        path_id: &FunctionIdentifier,
        spec: Option<DeploymentSpec>,
        artifact: Option<PackageDescriptor>,
        mode: ValidationMode<'_>,
    ) -> Result<Validated, ControlPlaneError> {
        let res = self.validate_inner(path_id, spec, artifact, mode).await;
        if let Err(err) = &res {
            log::debug!("function {} rejected: {}", path_id, err);
        }
        res
    }

    async fn validate_inner(
        &self,
        path_id: &FunctionIdentifier,
        spec: Option<DeploymentSpec>,
        artifact: Option<PackageDescriptor>,
        mode: ValidationMode<'_>,
    ) -> Result<Validated, ControlPlaneError> {
        path_id.check()?;

        let mut spec = spec.ok_or_else(|| bad_request("Function config is not provided"))?;
        let embedded_id = spec.identifier();
        if embedded_id != *path_id && embedded_id != FunctionIdentifier::new("", "", "") {
            log::warn!("request for {} carries the identifier {} in its deployment, ignored", path_id, embedded_id);
        }
        spec.tenant.clone_from(&path_id.tenant);
        spec.namespace.clone_from(&path_id.namespace);
        spec.name.clone_from(&path_id.name);

        let existing = match mode {
            ValidationMode::Register => None,
            ValidationMode::Update { existing } => existing,
        };
        if let Some(existing) = existing {
            spec = spec.merged_over(&existing.details);
            // An unchanged location is not a new package.
            if same_location(&spec.package, Some(&existing.package_location)) {
                spec.package = None;
            }
            if same_location(&spec.transform_function, existing.transform_function_package_location.as_ref()) {
                spec.transform_function = None;
            }
        }
        let component_type = spec.component_type();

        let descriptor = effective_descriptor(&spec, artifact);
        if descriptor.is_none() && existing.is_none() {
            return Err(bad_request("Function package is not provided"));
        }

        if component_type.has_input() && spec.inputs.is_empty() {
            return Err(bad_request("No input topic(s) specified for the function"));
        }
        let output = not_blank(&spec.output).map(|o| o.to_string());
        if let Some(output) = &output {
            if spec.inputs.contains_key(output) {
                return Err(bad_request(format!(
                    "Output topic {} is also being used as an input topic (topics must be one or the other)",
                    output
                )));
            }
            if !funcmeta_api::util::is_valid_topic(output) {
                return Err(bad_request(format!("Output topic {} is invalid", output)));
            }
        }
        if let Some(input) = spec.inputs.keys().find(|t| !funcmeta_api::util::is_valid_topic(t)) {
            return Err(bad_request(format!("Input topic {} is invalid", input)));
        }

        let (package, package_changed) = match (descriptor, existing) {
            (Some(descriptor), _) => (self.resolver.resolve(&descriptor, component_type, &self.policy).await?, true),
            (None, Some(existing)) => {
                let mut package = self
                    .resolver
                    .materialize(&existing.package_location, component_type, &self.policy)
                    .await?;
                package.location = PendingLocation::Durable(existing.package_location.clone());
                (package, false)
            }
            (None, None) => return Err(bad_request("Function package is not provided")),
        };

        // The scope, and the unpacked package with it, is released when
        // leaving this function.
        let needs_inspection = spec.runtime.map_or(true, |r| r.is_inspectable());
        let scope = match needs_inspection {
            true => Some(crate::package_inspector::inspect(package.file.path().to_path_buf(), self.resolver.scratch_dir().map(|d| d.to_path_buf())).await),
            false => None,
        };

        let inferred_runtime = match &scope {
            Some(Ok(scope)) => scope.runtime(),
            Some(Err(err)) => {
                log::debug!("cannot inspect the package of {}: {}", path_id, err);
                None
            }
            None => None,
        };
        let runtime: RuntimeKind = spec
            .runtime
            .or(inferred_runtime)
            .ok_or_else(|| bad_request("Function language runtime is either not set or cannot be determined"))?;

        let class_name = match scope.as_ref().filter(|_| runtime.is_inspectable()) {
            None => not_blank(&spec.class_name).unwrap_or_default().to_string(),
            Some(scope) => check_class(not_blank(&spec.class_name), scope, component_type.expected_capability())?,
        };

        let parallelism = spec.parallelism.unwrap_or(1);
        if parallelism <= 0 {
            return Err(bad_request("Function parallelism must be a positive number"));
        }

        if !self.admin.tenant_exists(&path_id.tenant).await.map_err(internal_error)? {
            return Err(bad_request("Tenant does not exist"));
        }
        if !self
            .admin
            .namespace_list(&path_id.tenant)
            .await
            .map_err(internal_error)?
            .contains(&path_id.namespace)
        {
            return Err(bad_request("Namespace does not exist"));
        }

        match mode {
            ValidationMode::Register => {
                if self.metadata_store.exists(path_id).await.map_err(internal_error)? {
                    return Err(bad_request(format!("Function {} already exists", path_id.name)));
                }
            }
            ValidationMode::Update { existing: None } => {
                return Err(bad_request(format!("Function {} doesn't exist", path_id.name)));
            }
            ValidationMode::Update { existing: Some(_) } => {}
        }

        let transform_package = match not_blank(&spec.transform_function) {
            Some(uri) => Some(
                self.resolver
                    .resolve(&PackageDescriptor::from_uri(uri), funcmeta_api::deployment::ComponentType::Function, &self.policy)
                    .await?,
            ),
            None => None,
        };

        Ok(Validated {
            details: FunctionDetails {
                id: path_id.clone(),
                component_type,
                runtime,
                class_name,
                parallelism: parallelism as u32,
                inputs: spec.inputs,
                output,
                output_serde: not_blank(&spec.output_serde).map(|s| s.to_string()),
                processing_guarantee: spec.processing_guarantee.unwrap_or_default(),
                resources: spec.resources.unwrap_or_default(),
            },
            package,
            package_changed,
            transform_package,
        })
    }
}

/// Check the entry class against the class index of the package, inferring
/// it from the manifest if not given.
fn check_class(class_name: Option<&str>, scope: &Result<InspectionScope, InspectionError>, expected: &str) -> Result<String, ControlPlaneError> {
    let class_name = match (class_name, scope) {
        (Some(class_name), _) => class_name.to_string(),
        (None, Err(err)) => {
            return Err(bad_request(format!(
                "Function package does not have the correct format. Function class is not provided and inspecting the package produced the following error: {}",
                err
            )))
        }
        (None, Ok(scope)) => scope
            .entry_class()
            .ok_or_else(|| bad_request("Function class is not provided and the package does not declare an entry class"))?
            .to_string(),
    };
    let entry = scope
        .as_ref()
        .ok()
        .and_then(|scope| scope.find_class(&class_name))
        .ok_or_else(|| bad_request(format!("Function class {} must be in class path", class_name)))?;
    if entry.implements != expected {
        return Err(bad_request(format!("Function class {} does not implement the correct interface", class_name)));
    }
    Ok(class_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_location() {
        let blob = PackageLocation::Blob("t/n/f/1234-exclamation.tar.gz".to_string());
        assert!(same_location(&Some("t/n/f/1234-exclamation.tar.gz".to_string()), Some(&blob)));
        assert!(same_location(
            &Some("builtin://exclamation".to_string()),
            Some(&PackageLocation::Builtin("exclamation".to_string()))
        ));
        assert!(!same_location(&Some("builtin://exclamation".to_string()), Some(&blob)));
        assert!(!same_location(&Some(" ".to_string()), Some(&blob)));
        assert!(!same_location(&None, Some(&blob)));
        assert!(!same_location(&Some("builtin://exclamation".to_string()), None));
    }

    #[test]
    fn test_effective_descriptor_precedence() {
        let uploaded = PackageDescriptor::UploadedStream {
            bytes: b"x".to_vec(),
            declared_file_name: "f.wasm".to_string(),
        };
        let mut spec = DeploymentSpec {
            package: Some("builtin://exclamation".to_string()),
            ..Default::default()
        };
        assert_eq!(
            Some(PackageDescriptor::BuiltinReference {
                name: "exclamation".to_string()
            }),
            effective_descriptor(&spec, Some(uploaded.clone()))
        );

        spec.package = Some("http://localhost/f.wasm".to_string());
        assert_eq!(Some(uploaded.clone()), effective_descriptor(&spec, Some(uploaded)));
        assert_eq!(
            Some(PackageDescriptor::ExternalLocation {
                uri: "http://localhost/f.wasm".to_string()
            }),
            effective_descriptor(
                &spec,
                Some(PackageDescriptor::UploadedStream {
                    bytes: vec![],
                    declared_file_name: "".to_string()
                })
            )
        );

        spec.package = None;
        assert_eq!(None, effective_descriptor(&spec, None));
    }
}
