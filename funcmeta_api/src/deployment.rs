// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::function_id::FunctionIdentifier;

/// Mapping from input topic name to its deserialization scheme.
pub type InputTopics = std::collections::BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    #[default]
    Function,
    Source,
    Sink,
}

impl ComponentType {
    /// Capability that the entry class of a component of this type must
    /// implement.
    pub fn expected_capability(&self) -> &'static str {
        match self {
            ComponentType::Function => "Function",
            ComponentType::Source => "Source",
            ComponentType::Sink => "Sink",
        }
    }

    /// Sources produce data without consuming any topic.
    pub fn has_input(&self) -> bool {
        !matches!(self, ComponentType::Source)
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ComponentType::Function => write!(f, "function"),
            ComponentType::Source => write!(f, "source"),
            ComponentType::Sink => write!(f, "sink"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum RuntimeKind {
    #[serde(rename = "RUST_WASM")]
    RustWasm,
    #[serde(rename = "RUST_X86")]
    RustX86,
    #[serde(rename = "RUST_ARM")]
    RustArm,
    #[serde(rename = "CONTAINER")]
    Container,
}

impl RuntimeKind {
    pub fn from_string(runtime: &str) -> Option<Self> {
        match runtime {
            "RUST_WASM" => Some(Self::RustWasm),
            "RUST_X86" => Some(Self::RustX86),
            "RUST_ARM" => Some(Self::RustArm),
            "CONTAINER" => Some(Self::Container),
            _ => None,
        }
    }

    /// Packages of these runtimes carry a class index that can be inspected.
    /// Container packages are opaque.
    pub fn is_inspectable(&self) -> bool {
        !matches!(self, RuntimeKind::Container)
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RuntimeKind::RustWasm => write!(f, "RUST_WASM"),
            RuntimeKind::RustX86 => write!(f, "RUST_X86"),
            RuntimeKind::RustArm => write!(f, "RUST_ARM"),
            RuntimeKind::Container => write!(f, "CONTAINER"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingGuarantee {
    #[default]
    AtLeastOnce,
    AtMostOnce,
    EffectivelyOnce,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Resources {
    pub cpu: f64,
    pub ram_bytes: u64,
    pub disk_bytes: u64,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            cpu: 1.0,
            ram_bytes: 1 << 30,
            disk_bytes: 10 << 30,
        }
    }
}

/// Desired state of a function as submitted by a client.
///
/// Every field may be left unset: registration fills the gaps with
/// defaults or by inspecting the package, update inherits them from the
/// stored record (see [`DeploymentSpec::merged_over`]).
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct DeploymentSpec {
    pub tenant: String,
    pub namespace: String,
    pub name: String,
    pub component_type: Option<ComponentType>,
    pub runtime: Option<RuntimeKind>,
    pub class_name: Option<String>,
    pub parallelism: Option<i32>,
    pub inputs: InputTopics,
    pub output: Option<String>,
    pub output_serde: Option<String>,
    pub processing_guarantee: Option<ProcessingGuarantee>,
    pub resources: Option<Resources>,
    /// Package URL or `builtin://` reference embedded in the deployment.
    pub package: Option<String>,
    /// Package of the transform function attached to a sink.
    pub transform_function: Option<String>,
}

/// Normalized spec: the form persisted inside a function record.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FunctionDetails {
    pub id: FunctionIdentifier,
    pub component_type: ComponentType,
    pub runtime: RuntimeKind,
    pub class_name: String,
    pub parallelism: u32,
    pub inputs: InputTopics,
    pub output: Option<String>,
    pub output_serde: Option<String>,
    pub processing_guarantee: ProcessingGuarantee,
    pub resources: Resources,
}

/// Options attached to an update request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct UpdateOptions {
    /// Write the record even if the functional spec did not change, to
    /// refresh the credentials attached to it.
    pub update_auth_data: bool,
}

impl DeploymentSpec {
    pub fn identifier(&self) -> FunctionIdentifier {
        FunctionIdentifier::new(&self.tenant, &self.namespace, &self.name)
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type.unwrap_or_default()
    }

    /// Fill every unset field with the value found in `base`.
    pub fn merged_over(&self, base: &FunctionDetails) -> DeploymentSpec {
        let not_blank = |value: &Option<String>| value.as_ref().filter(|v| !v.trim().is_empty()).cloned();
        DeploymentSpec {
            tenant: self.tenant.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            component_type: self.component_type.or(Some(base.component_type)),
            runtime: self.runtime.or(Some(base.runtime)),
            class_name: not_blank(&self.class_name).or_else(|| Some(base.class_name.clone()).filter(|c| !c.is_empty())),
            parallelism: self.parallelism.or(Some(base.parallelism as i32)),
            inputs: match self.inputs.is_empty() {
                true => base.inputs.clone(),
                false => self.inputs.clone(),
            },
            output: not_blank(&self.output).or_else(|| base.output.clone()),
            output_serde: not_blank(&self.output_serde).or_else(|| base.output_serde.clone()),
            processing_guarantee: self.processing_guarantee.or(Some(base.processing_guarantee)),
            resources: self.resources.clone().or_else(|| Some(base.resources.clone())),
            package: self.package.clone(),
            transform_function: self.transform_function.clone(),
        }
    }
}

impl FunctionDetails {
    pub fn input_topic_names(&self) -> std::collections::BTreeSet<&str> {
        self.inputs.keys().map(|topic| topic.as_str()).collect()
    }
}

impl From<&FunctionDetails> for DeploymentSpec {
    fn from(details: &FunctionDetails) -> Self {
        DeploymentSpec {
            tenant: details.id.tenant.clone(),
            namespace: details.id.namespace.clone(),
            name: details.id.name.clone(),
            component_type: Some(details.component_type),
            runtime: Some(details.runtime),
            class_name: Some(details.class_name.clone()).filter(|c| !c.is_empty()),
            parallelism: Some(details.parallelism as i32),
            inputs: details.inputs.clone(),
            output: details.output.clone(),
            output_serde: details.output_serde.clone(),
            processing_guarantee: Some(details.processing_guarantee),
            resources: Some(details.resources.clone()),
            package: None,
            transform_function: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> FunctionDetails {
        FunctionDetails {
            id: FunctionIdentifier::new("t", "n", "f"),
            component_type: ComponentType::Function,
            runtime: RuntimeKind::RustWasm,
            class_name: "exclamation".to_string(),
            parallelism: 2,
            inputs: InputTopics::from([("persistent://public/default/in".to_string(), "json".to_string())]),
            output: Some("out".to_string()),
            output_serde: None,
            processing_guarantee: ProcessingGuarantee::AtMostOnce,
            resources: Resources::default(),
        }
    }

    #[test]
    fn test_merge_inherits_unset_fields() {
        let incoming = DeploymentSpec {
            tenant: "t".to_string(),
            namespace: "n".to_string(),
            name: "f".to_string(),
            parallelism: Some(4),
            ..Default::default()
        };
        let merged = incoming.merged_over(&stored());
        assert_eq!(Some(4), merged.parallelism);
        assert_eq!(Some("exclamation".to_string()), merged.class_name);
        assert_eq!(stored().inputs, merged.inputs);
        assert_eq!(Some("out".to_string()), merged.output);
        assert_eq!(Some(RuntimeKind::RustWasm), merged.runtime);
        assert_eq!(Some(ProcessingGuarantee::AtMostOnce), merged.processing_guarantee);
    }

    #[test]
    fn test_merge_keeps_explicit_inputs() {
        let incoming = DeploymentSpec {
            inputs: InputTopics::from([("other".to_string(), "json".to_string())]),
            ..Default::default()
        };
        let merged = incoming.merged_over(&stored());
        assert_eq!(vec!["other"], merged.inputs.keys().map(|k| k.as_str()).collect::<Vec<&str>>());
    }

    #[test]
    fn test_spec_from_details_roundtrip_fields() {
        let spec = DeploymentSpec::from(&stored());
        assert_eq!(FunctionIdentifier::new("t", "n", "f"), spec.identifier());
        assert_eq!(Some(2), spec.parallelism);
        assert_eq!(ComponentType::Function, spec.component_type());
    }

    #[test]
    fn test_spec_deserialize_partial_json() {
        let spec: DeploymentSpec = serde_json::from_str(
            r#"{"tenant": "t", "namespace": "n", "name": "f", "runtime": "RUST_WASM", "inputs": {"in": "json"}}"#,
        )
        .unwrap();
        assert_eq!(Some(RuntimeKind::RustWasm), spec.runtime);
        assert_eq!(None, spec.parallelism);
        assert_eq!(ComponentType::Function, spec.component_type());
        assert_eq!(Some(RuntimeKind::Container), RuntimeKind::from_string("CONTAINER"));
        assert!(!RuntimeKind::Container.is_inspectable());
    }
}
