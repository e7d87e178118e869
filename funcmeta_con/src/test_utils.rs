// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Manifest of a package with a single function class named `exclamation`.
pub const EXCLAMATION_MANIFEST: &str = r#"
runtime = "RUST_WASM"
entry_class = "exclamation"

[[classes]]
name = "exclamation"
implements = "Function"

[[classes]]
name = "not_a_function"
implements = "Codec"
"#;

/// Manifest of a connector package providing a source and a sink.
pub const CONNECTOR_MANIFEST: &str = r#"
runtime = "RUST_X86"

[[classes]]
name = "cassandra_sink"
implements = "Sink"

[[classes]]
name = "kafka_source"
implements = "Source"
"#;

fn append(tar: &mut tar::Builder<flate2::write::GzEncoder<std::fs::File>>, name: &str, content: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    tar.append_data(&mut header, name, content).unwrap();
}

/// Write a gzip'd tar package in `dir`, with the given manifest (if any)
/// and a dummy `function.wasm`.
pub fn write_package(dir: &std::path::Path, file_name: &str, manifest: Option<&str>) -> std::path::PathBuf {
    let path = dir.join(file_name);
    let tgz_file = std::fs::File::create(&path).unwrap();
    let enc = flate2::write::GzEncoder::new(tgz_file, flate2::Compression::default());
    let mut tar = tar::Builder::new(enc);
    if let Some(manifest) = manifest {
        append(&mut tar, crate::package_inspector::MANIFEST_FILE, manifest.as_bytes());
    }
    append(&mut tar, "function.wasm", b"\0asm\x01\0\0\0");
    tar.into_inner().unwrap().finish().unwrap();
    path
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub async fn read_all(mut stream: funcmeta_api::package::PackageStream) -> Vec<u8> {
    use tokio::io::AsyncReadExt;
    let mut buf = vec![];
    stream.read_to_end(&mut buf).await.unwrap();
    buf
}

pub fn details(tenant: &str, namespace: &str, name: &str) -> funcmeta_api::deployment::FunctionDetails {
    funcmeta_api::deployment::FunctionDetails {
        id: funcmeta_api::function_id::FunctionIdentifier::new(tenant, namespace, name),
        component_type: funcmeta_api::deployment::ComponentType::Function,
        runtime: funcmeta_api::deployment::RuntimeKind::RustWasm,
        class_name: "exclamation".to_string(),
        parallelism: 1,
        inputs: funcmeta_api::deployment::InputTopics::from([("persistent://public/default/test_src".to_string(), "json".to_string())]),
        output: Some("test-output-topic".to_string()),
        output_serde: None,
        processing_guarantee: funcmeta_api::deployment::ProcessingGuarantee::AtLeastOnce,
        resources: funcmeta_api::deployment::Resources::default(),
    }
}

pub fn record(tenant: &str, namespace: &str, name: &str) -> funcmeta_api::record::FunctionRecord {
    funcmeta_api::record::FunctionRecord {
        details: details(tenant, namespace, name),
        package_location: funcmeta_api::package::PackageLocation::Builtin("exclamation".to_string()),
        transform_function_package_location: None,
        create_time: 0,
        version: 0,
    }
}
