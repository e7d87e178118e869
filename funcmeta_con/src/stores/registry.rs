// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

const ARCHIVE_EXTENSIONS: [&str; 3] = ["tar.gz", "pkg", "wasm"];

/// Registry with a fixed set of archives.
#[derive(Clone, Default)]
pub struct StaticRegistry {
    archives: std::collections::HashMap<String, std::path::PathBuf>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, path: &std::path::Path) -> Self {
        self.archives.insert(name.to_string(), path.to_path_buf());
        self
    }
}

impl funcmeta_api::registry::ArchiveRegistry for StaticRegistry {
    fn lookup(&self, name: &str) -> Option<std::path::PathBuf> {
        self.archives.get(name).cloned()
    }
}

/// Registry backed by a directory containing NAME.tar.gz, NAME.pkg or
/// NAME.wasm archives.
///
/// The directory is scanned upon every lookup, thus archives added or
/// replaced after start-up are found.
#[derive(Clone)]
pub struct DirectoryRegistry {
    dir: std::path::PathBuf,
}

impl DirectoryRegistry {
    pub fn new(dir: &str) -> Self {
        if !std::path::Path::new(dir).is_dir() {
            log::warn!("archive registry directory {} does not exist", dir);
        }
        Self {
            dir: std::path::PathBuf::from(dir),
        }
    }
}

impl funcmeta_api::registry::ArchiveRegistry for DirectoryRegistry {
    fn lookup(&self, name: &str) -> Option<std::path::PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return None;
        }
        ARCHIVE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funcmeta_api::registry::ArchiveRegistry;

    #[test]
    fn test_directory_registry_sees_new_archives() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DirectoryRegistry::new(dir.path().to_str().unwrap());
        assert!(registry.lookup("cassandra").is_none());

        std::fs::write(dir.path().join("cassandra.tar.gz"), b"x").unwrap();
        std::fs::write(dir.path().join("exclamation.wasm"), b"y").unwrap();
        assert_eq!(Some(dir.path().join("cassandra.tar.gz")), registry.lookup("cassandra"));
        assert_eq!(Some(dir.path().join("exclamation.wasm")), registry.lookup("exclamation"));
        assert!(registry.lookup("../cassandra").is_none());
    }

    #[test]
    fn test_static_registry() {
        let registry = StaticRegistry::new().with("kafka", std::path::Path::new("/opt/connectors/kafka.pkg"));
        assert_eq!(Some(std::path::PathBuf::from("/opt/connectors/kafka.pkg")), registry.lookup("kafka"));
        assert!(registry.lookup("cassandra").is_none());
    }
}
