// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::deployment::RuntimeKind;

pub const MANIFEST_FILE: &str = "manifest.toml";
const WASM_MAGIC: &[u8] = b"\0asm";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ClassEntry {
    pub name: String,
    /// Capability implemented by the class, e.g., `Function`, `Source`, `Sink`.
    pub implements: String,
}

/// Content of the `manifest.toml` at the root of a package archive.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub runtime: Option<RuntimeKind>,
    #[serde(default)]
    pub entry_class: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum InspectionError {
    #[error("package is neither a gzip'd tar archive nor a WebAssembly module")]
    UnknownFormat,
    #[error("package does not contain {}", MANIFEST_FILE)]
    MissingManifest,
    #[error("invalid {}: {0}", MANIFEST_FILE)]
    InvalidManifest(String),
    #[error("cannot unpack package: {0}")]
    Io(#[from] std::io::Error),
}

/// Isolated, disposable view of the content of a package.
///
/// Archives are unpacked into a private scratch directory that is removed
/// when the scope is dropped, whatever the outcome of the inspection.
pub struct InspectionScope {
    dir: tempfile::TempDir,
    runtime: Option<RuntimeKind>,
    manifest: Option<PackageManifest>,
}

impl InspectionScope {
    /// Unpack `package` under `scratch_dir` (or the OS temp dir) and load its manifest.
    pub fn open(package: &std::path::Path, scratch_dir: Option<&std::path::Path>) -> Result<Self, InspectionError> {
        let dir = match scratch_dir {
            Some(parent) => tempfile::Builder::new().prefix("funcmeta-inspect-").tempdir_in(parent)?,
            None => tempfile::Builder::new().prefix("funcmeta-inspect-").tempdir()?,
        };

        let mut header = [0_u8; 4];
        let read = {
            use std::io::Read;
            let mut file = std::fs::File::open(package)?;
            file.read(&mut header)?
        };
        let header = &header[..read];

        if header.starts_with(WASM_MAGIC) {
            log::debug!("package {} is a WebAssembly module", package.display());
            return Ok(Self {
                dir,
                runtime: Some(RuntimeKind::RustWasm),
                manifest: None,
            });
        }
        if !header.starts_with(GZIP_MAGIC) {
            return Err(InspectionError::UnknownFormat);
        }

        let dec = flate2::read::GzDecoder::new(std::fs::File::open(package)?);
        let mut archive = tar::Archive::new(dec);
        archive.unpack(dir.path())?;

        let manifest_path = dir.path().join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(InspectionError::MissingManifest);
        }
        let manifest: PackageManifest =
            toml::from_str(&std::fs::read_to_string(&manifest_path)?).map_err(|e| InspectionError::InvalidManifest(e.to_string()))?;
        log::debug!(
            "package {} unpacked in {}: {} classes",
            package.display(),
            dir.path().display(),
            manifest.classes.len()
        );

        Ok(Self {
            dir,
            runtime: manifest.runtime,
            manifest: Some(manifest),
        })
    }

    pub fn runtime(&self) -> Option<RuntimeKind> {
        self.runtime
    }

    pub fn entry_class(&self) -> Option<&str> {
        self.manifest.as_ref().and_then(|m| m.entry_class.as_deref()).filter(|c| !c.is_empty())
    }

    /// `None` if the class is not listed, or the package has no class index.
    pub fn find_class(&self, name: &str) -> Option<&ClassEntry> {
        self.manifest.as_ref().and_then(|m| m.classes.iter().find(|c| c.name == name))
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

/// Inspect a package off the async executor.
pub async fn inspect(package: std::path::PathBuf, scratch_dir: Option<std::path::PathBuf>) -> Result<InspectionScope, InspectionError> {
    match tokio::task::spawn_blocking(move || InspectionScope::open(&package, scratch_dir.as_deref())).await {
        Ok(res) => res,
        Err(err) => Err(InspectionError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))),
    }
}
