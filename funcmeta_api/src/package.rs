// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

pub const BUILTIN_PREFIX: &str = "builtin://";
pub const FUNCTION_PREFIX: &str = "function://";

/// Byte stream returned when downloading a package.
pub type PackageStream = std::pin::Pin<Box<dyn tokio::io::AsyncRead + Send>>;

/// Where the artifact of a request comes from. Exactly one source at a time.
#[derive(Clone, PartialEq, Eq)]
pub enum PackageDescriptor {
    /// Binary uploaded inline with the request.
    UploadedStream { bytes: Vec<u8>, declared_file_name: String },
    /// `file://`, `http(s)://` or `function://tenant/namespace/name[@version]`.
    ExternalLocation { uri: String },
    /// Connector or function shipped with the worker distribution.
    BuiltinReference { name: String },
}

impl PackageDescriptor {
    /// Build a descriptor from a URL-like string, recognizing `builtin://`.
    pub fn from_uri(uri: &str) -> Self {
        match uri.strip_prefix(BUILTIN_PREFIX) {
            Some(name) => PackageDescriptor::BuiltinReference { name: name.to_string() },
            None => PackageDescriptor::ExternalLocation { uri: uri.to_string() },
        }
    }
}

impl std::fmt::Debug for PackageDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PackageDescriptor::UploadedStream { bytes, declared_file_name } => {
                write!(f, "UploadedStream({}, {} bytes)", declared_file_name, bytes.len())
            }
            PackageDescriptor::ExternalLocation { uri } => write!(f, "ExternalLocation({})", uri),
            PackageDescriptor::BuiltinReference { name } => write!(f, "BuiltinReference({})", name),
        }
    }
}

/// Durable pointer to a package, dereferenceable by every worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum PackageLocation {
    Builtin(String),
    Url(String),
    Blob(String),
}

impl PackageLocation {
    /// Parse the string form of a location: `builtin://name`, any
    /// `scheme://` URL, anything else is a blob locator.
    pub fn from_string(raw: &str) -> Self {
        if let Some(name) = raw.strip_prefix(BUILTIN_PREFIX) {
            PackageLocation::Builtin(name.to_string())
        } else if raw.contains("://") {
            PackageLocation::Url(raw.to_string())
        } else {
            PackageLocation::Blob(raw.to_string())
        }
    }
}

impl std::fmt::Display for PackageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PackageLocation::Builtin(name) => write!(f, "{}{}", BUILTIN_PREFIX, name),
            PackageLocation::Url(uri) => write!(f, "{}", uri),
            PackageLocation::Blob(locator) => write!(f, "{}", locator),
        }
    }
}
