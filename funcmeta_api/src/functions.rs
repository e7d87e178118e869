// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::deployment::{DeploymentSpec, UpdateOptions};
use crate::error::ControlPlaneError;
use crate::function_id::FunctionIdentifier;
use crate::package::{PackageDescriptor, PackageStream};

/// Operations exposed to the API binding layer.
///
/// `id` is always the identifier found in the request path, whose fields
/// may be empty. When a spec carries a different embedded identifier, the
/// one in the path is the target.
#[async_trait::async_trait]
pub trait FunctionsAPI: Send {
    async fn register_function(
        &mut self,
        id: FunctionIdentifier,
        spec: Option<DeploymentSpec>,
        artifact: Option<PackageDescriptor>,
    ) -> Result<(), ControlPlaneError>;

    async fn update_function(
        &mut self,
        id: FunctionIdentifier,
        spec: Option<DeploymentSpec>,
        artifact: Option<PackageDescriptor>,
        options: UpdateOptions,
    ) -> Result<(), ControlPlaneError>;

    async fn deregister_function(&mut self, id: FunctionIdentifier) -> Result<(), ControlPlaneError>;

    async fn get_function_info(&mut self, id: FunctionIdentifier) -> Result<DeploymentSpec, ControlPlaneError>;

    /// Names of the functions (not sources nor sinks) of a namespace.
    async fn list_functions(&mut self, tenant: &str, namespace: &str) -> Result<Vec<String>, ControlPlaneError>;

    /// Stream the package found at `path`: a `builtin://` reference, a URL
    /// or a blob locator.
    async fn download_package(&mut self, path: &str) -> Result<PackageStream, ControlPlaneError>;

    /// Stream the package of a registered function, or the one of its
    /// transform function if `transform` is set.
    async fn download_function_package(&mut self, id: FunctionIdentifier, transform: bool) -> Result<PackageStream, ControlPlaneError>;
}
