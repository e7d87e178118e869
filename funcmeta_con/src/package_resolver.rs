// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::deployment::ComponentType;
use funcmeta_api::error::PackageError;
use funcmeta_api::function_id::FunctionIdentifier;
use funcmeta_api::package::{PackageDescriptor, PackageLocation, PackageStream, FUNCTION_PREFIX};

const MAX_REFERENCE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerPolicy {
    /// Store builtin packages in the shared blob store, instead of
    /// referencing them by name.
    pub upload_builtins: bool,
    /// Functions run outside of the worker, which means they cannot read
    /// the worker's local file system.
    pub externally_managed_runtime: bool,
}

/// Local copy of a package, readable for inspection.
#[derive(Debug)]
pub enum ArtifactFile {
    /// Scratch copy, deleted on drop.
    Temp(tempfile::TempPath),
    /// File owned by someone else, e.g., a registry archive.
    Borrowed(std::path::PathBuf),
}

impl ArtifactFile {
    pub fn path(&self) -> &std::path::Path {
        match self {
            ArtifactFile::Temp(path) => &**path,
            ArtifactFile::Borrowed(path) => path.as_path(),
        }
    }
}

/// Durable location that a resolved package will have in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingLocation {
    /// The package is already reachable by every worker at this location.
    Durable(PackageLocation),
    /// The package must be stored in the blob store first.
    Upload,
}

#[derive(Debug)]
pub struct ResolvedPackage {
    pub file: ArtifactFile,
    pub file_name: String,
    pub location: PendingLocation,
}

/// Turns package descriptors into local artifacts, and stored package
/// locations into byte streams.
#[derive(Clone)]
pub struct PackageResolver {
    metadata_store: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataStore>,
    connectors: std::sync::Arc<dyn funcmeta_api::registry::ArchiveRegistry>,
    functions: std::sync::Arc<dyn funcmeta_api::registry::ArchiveRegistry>,
    blob_store: std::sync::Arc<dyn funcmeta_api::blob_store::BlobStore>,
    http_client: reqwest::Client,
    download_dir: Option<std::path::PathBuf>,
}

fn fetch_error(url: &str, reason: impl std::fmt::Display) -> PackageError {
    PackageError::Fetch {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn last_segment(raw: &str) -> String {
    raw.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("package").to_string()
}

/// Parse `function://tenant/namespace/name[@version]`.
pub fn parse_function_reference(uri: &str) -> Result<(FunctionIdentifier, Option<String>), PackageError> {
    let invalid = || PackageError::InvalidUrl(format!("Invalid function package url {}", uri));
    let rest = uri.strip_prefix(FUNCTION_PREFIX).ok_or_else(invalid)?;
    let (path, version) = match rest.rsplit_once('@') {
        Some((path, version)) if !version.is_empty() => (path, Some(version.to_string())),
        Some(_) => return Err(invalid()),
        None => (rest, None),
    };
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.trim().is_empty()) {
        return Err(invalid());
    }
    Ok((FunctionIdentifier::new(parts[0], parts[1], parts[2]), version))
}

async fn download_to(client: reqwest::Client, url: String, dest: tempfile::TempPath) -> Result<tempfile::TempPath, String> {
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client.get(&url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP status {}", response.status()));
    }
    let mut file = tokio::fs::File::create(&dest).await.map_err(|e| e.to_string())?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        file.write_all(&chunk).await.map_err(|e| e.to_string())?;
    }
    file.flush().await.map_err(|e| e.to_string())?;
    Ok(dest)
}

impl PackageResolver {
    pub fn new(
        metadata_store: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataStore>,
        connectors: std::sync::Arc<dyn funcmeta_api::registry::ArchiveRegistry>,
        functions: std::sync::Arc<dyn funcmeta_api::registry::ArchiveRegistry>,
        blob_store: std::sync::Arc<dyn funcmeta_api::blob_store::BlobStore>,
        download_dir: Option<std::path::PathBuf>,
    ) -> Self {
        Self {
            metadata_store,
            connectors,
            functions,
            blob_store,
            http_client: reqwest::Client::new(),
            download_dir,
        }
    }

    pub fn scratch_dir(&self) -> Option<&std::path::Path> {
        self.download_dir.as_deref()
    }

    fn registry(&self, component_type: ComponentType) -> &dyn funcmeta_api::registry::ArchiveRegistry {
        match component_type {
            ComponentType::Function => self.functions.as_ref(),
            ComponentType::Source | ComponentType::Sink => self.connectors.as_ref(),
        }
    }

    fn temp_file(&self) -> Result<tempfile::TempPath, PackageError> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("funcmeta-pkg-");
            builder
        };
        let res = match &self.download_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        res.map(|f| f.into_temp_path()).map_err(|source| PackageError::LocalIo {
            path: self
                .download_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir)
                .display()
                .to_string(),
            source,
        })
    }

    /// Produce a local artifact for `descriptor`.
    pub async fn resolve(
        &self,
        descriptor: &PackageDescriptor,
        component_type: ComponentType,
        policy: &WorkerPolicy,
    ) -> Result<ResolvedPackage, PackageError> {
        log::debug!("resolving {:?} for a {}", descriptor, component_type);
        match descriptor {
            PackageDescriptor::UploadedStream { bytes, declared_file_name } => {
                let temp = self.temp_file()?;
                tokio::fs::write(&temp, bytes).await.map_err(|source| PackageError::LocalIo {
                    path: temp.display().to_string(),
                    source,
                })?;
                Ok(ResolvedPackage {
                    file: ArtifactFile::Temp(temp),
                    file_name: last_segment(declared_file_name),
                    location: PendingLocation::Upload,
                })
            }
            PackageDescriptor::ExternalLocation { uri } => self.materialize(&PackageLocation::Url(uri.clone()), component_type, policy).await,
            PackageDescriptor::BuiltinReference { name } => self.resolve_builtin(name, component_type, policy),
        }
    }

    /// Produce a local artifact for a location already stored in a record.
    pub async fn materialize(
        &self,
        location: &PackageLocation,
        component_type: ComponentType,
        policy: &WorkerPolicy,
    ) -> Result<ResolvedPackage, PackageError> {
        match self.follow_references(location).await? {
            PackageLocation::Builtin(name) => self.resolve_builtin(&name, component_type, policy),
            PackageLocation::Url(uri) => self.fetch_url(&uri).await,
            PackageLocation::Blob(locator) => {
                let mut stream = self.blob_store.get(&locator).await.map_err(|e| PackageError::Storage(e.to_string()))?;
                let temp = self.temp_file()?;
                let local_io = |source| PackageError::LocalIo {
                    path: temp.display().to_string(),
                    source,
                };
                let mut file = tokio::fs::File::create(&temp).await.map_err(local_io)?;
                tokio::io::copy(&mut stream, &mut file).await.map_err(local_io)?;
                tokio::io::AsyncWriteExt::flush(&mut file).await.map_err(local_io)?;
                drop(file);
                Ok(ResolvedPackage {
                    file: ArtifactFile::Temp(temp),
                    file_name: last_segment(&locator),
                    location: PendingLocation::Durable(PackageLocation::Blob(locator)),
                })
            }
        }
    }

    /// Replace `function://` references with the package location of the
    /// referenced function.
    async fn follow_references(&self, location: &PackageLocation) -> Result<PackageLocation, PackageError> {
        let mut current = location.clone();
        for _ in 0..MAX_REFERENCE_DEPTH {
            let uri = match &current {
                PackageLocation::Url(uri) if uri.starts_with(FUNCTION_PREFIX) => uri.clone(),
                _ => return Ok(current),
            };
            let (id, version) = parse_function_reference(&uri)?;
            if let Some(version) = version {
                log::debug!("package of function {} requested at version {}, using the current one", id, version);
            }
            current = self
                .metadata_store
                .get(&id)
                .await
                .map_err(|e| PackageError::Storage(e.to_string()))?
                .ok_or_else(|| PackageError::ReferenceNotFound(uri.clone()))?
                .package_location;
        }
        Err(PackageError::InvalidUrl(format!("Too many nested function references from {}", location)))
    }

    fn resolve_builtin(&self, name: &str, component_type: ComponentType, policy: &WorkerPolicy) -> Result<ResolvedPackage, PackageError> {
        let path = self.registry(component_type).lookup(name).ok_or_else(|| PackageError::NotInRegistry {
            component_type,
            name: name.to_string(),
        })?;
        let location = match policy.externally_managed_runtime || policy.upload_builtins {
            true => PendingLocation::Upload,
            false => PendingLocation::Durable(PackageLocation::Builtin(name.to_string())),
        };
        log::debug!("builtin {} {} found at {}, {:?}", component_type, name, path.display(), location);
        Ok(ResolvedPackage {
            file_name: last_segment(&path.display().to_string()),
            file: ArtifactFile::Borrowed(path),
            location,
        })
    }

    async fn fetch_url(&self, uri: &str) -> Result<ResolvedPackage, PackageError> {
        let url = reqwest::Url::parse(uri).map_err(|e| PackageError::InvalidUrl(format!("Invalid package url {}: {}", uri, e)))?;
        let file_name = last_segment(url.path());
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| PackageError::InvalidUrl(format!("Invalid package url {}", uri)))?;
                let temp = self.temp_file()?;
                tokio::fs::copy(&path, &temp).await.map_err(|source| PackageError::LocalIo {
                    path: path.display().to_string(),
                    source,
                })?;
                Ok(ResolvedPackage {
                    file: ArtifactFile::Temp(temp),
                    file_name,
                    location: PendingLocation::Durable(PackageLocation::Url(uri.to_string())),
                })
            }
            "http" | "https" => {
                let temp = self.temp_file()?;
                // The transfer goes on even if the caller gives up: the
                // scratch file is then dropped by the task itself.
                let handle = tokio::spawn(download_to(self.http_client.clone(), uri.to_string(), temp));
                let temp = match handle.await {
                    Ok(Ok(temp)) => temp,
                    Ok(Err(reason)) => return Err(fetch_error(uri, reason)),
                    Err(err) => return Err(fetch_error(uri, err)),
                };
                log::info!("downloaded package from {}", uri);
                Ok(ResolvedPackage {
                    file: ArtifactFile::Temp(temp),
                    file_name,
                    location: PendingLocation::Durable(PackageLocation::Url(uri.to_string())),
                })
            }
            scheme => Err(PackageError::InvalidUrl(format!("Unsupported package url scheme {} in {}", scheme, uri))),
        }
    }

    /// Make the package durable, returning the location to be stored in the record.
    pub async fn persist(&self, id: &FunctionIdentifier, resolved: &ResolvedPackage) -> Result<PackageLocation, PackageError> {
        match &resolved.location {
            PendingLocation::Durable(location) => Ok(location.clone()),
            PendingLocation::Upload => {
                let locator = self
                    .blob_store
                    .put(id, resolved.file.path(), &resolved.file_name)
                    .await
                    .map_err(|e| PackageError::Storage(e.to_string()))?;
                Ok(PackageLocation::Blob(locator))
            }
        }
    }

    async fn open_file(path: &std::path::Path) -> Result<PackageStream, PackageError> {
        let file = tokio::fs::File::open(path).await.map_err(|source| PackageError::LocalIo {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Box::pin(file))
    }

    async fn stream_url(&self, uri: &str) -> Result<PackageStream, PackageError> {
        use futures::TryStreamExt;

        let url = reqwest::Url::parse(uri).map_err(|e| PackageError::InvalidUrl(format!("Invalid package url {}: {}", uri, e)))?;
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| PackageError::InvalidUrl(format!("Invalid package url {}", uri)))?;
                Self::open_file(&path).await
            }
            "http" | "https" => {
                let response = self.http_client.get(url).send().await.map_err(|e| fetch_error(uri, e))?;
                if !response.status().is_success() {
                    return Err(fetch_error(uri, format!("HTTP status {}", response.status())));
                }
                let stream = response
                    .bytes_stream()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
                Ok(Box::pin(tokio_util::io::StreamReader::new(stream)))
            }
            scheme => Err(PackageError::InvalidUrl(format!("Unsupported package url scheme {} in {}", scheme, uri))),
        }
    }

    /// Stream the package at `location`.
    ///
    /// Builtin locations are looked up again in the current registry of
    /// `component_type`, not the one found upon registration.
    pub async fn download(&self, location: &PackageLocation, component_type: ComponentType) -> Result<PackageStream, PackageError> {
        match self.follow_references(location).await? {
            PackageLocation::Builtin(name) => {
                let path = self
                    .registry(component_type)
                    .lookup(&name)
                    .ok_or(PackageError::NotInRegistry { component_type, name })?;
                Self::open_file(&path).await
            }
            PackageLocation::Url(uri) => self.stream_url(&uri).await,
            PackageLocation::Blob(locator) => self.blob_store.get(&locator).await.map_err(|e| PackageError::Storage(e.to_string())),
        }
    }

    /// Stream the package at the given path, without knowing which kind of
    /// component it belongs to: builtin names are searched among the
    /// connectors first, then among the functions.
    pub async fn download_path(&self, path: &str) -> Result<PackageStream, PackageError> {
        match PackageLocation::from_string(path) {
            PackageLocation::Builtin(name) => {
                let archive = self
                    .connectors
                    .lookup(&name)
                    .or_else(|| self.functions.lookup(&name))
                    .ok_or_else(|| PackageError::ReferenceNotFound(path.to_string()))?;
                Self::open_file(&archive).await
            }
            location => self.download(&location, ComponentType::Function).await,
        }
    }
}
