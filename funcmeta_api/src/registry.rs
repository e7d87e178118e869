// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Registry of archives shipped with the worker distribution: connectors
/// (sources and sinks) or builtin functions.
pub trait ArchiveRegistry: Send + Sync {
    /// Path of the archive registered under `name`, if any.
    fn lookup(&self, name: &str) -> Option<std::path::PathBuf>;
}
