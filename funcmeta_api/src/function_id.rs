// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Unique key of a function record: `(tenant, namespace, name)`.
///
/// The fields are plain strings because identifiers arrive from request
/// paths where any of them may be missing; use [`FunctionIdentifier::check`]
/// before touching any collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
pub struct FunctionIdentifier {
    pub tenant: String,
    pub namespace: String,
    pub name: String,
}

impl FunctionIdentifier {
    pub fn new(tenant: &str, namespace: &str, name: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Report the first missing field, in the order tenant, namespace, name.
    pub fn check(&self) -> Result<(), crate::error::ControlPlaneError> {
        check_tenant_namespace(&self.tenant, &self.namespace)?;
        if self.name.trim().is_empty() {
            return Err(crate::error::ControlPlaneError::BadRequest("Function name is not provided".to_string()));
        }
        Ok(())
    }
}

/// Checks used by the operations that only address a namespace (list).
pub fn check_tenant_namespace(tenant: &str, namespace: &str) -> Result<(), crate::error::ControlPlaneError> {
    if tenant.trim().is_empty() {
        return Err(crate::error::ControlPlaneError::BadRequest("Tenant is not provided".to_string()));
    }
    if namespace.trim().is_empty() {
        return Err(crate::error::ControlPlaneError::BadRequest("Namespace is not provided".to_string()));
    }
    Ok(())
}

impl std::fmt::Display for FunctionIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_reported_in_order() {
        let err = FunctionIdentifier::new("", "", "").check().unwrap_err();
        assert_eq!(err.to_string(), "Tenant is not provided");

        let err = FunctionIdentifier::new("t", " ", "").check().unwrap_err();
        assert_eq!(err.to_string(), "Namespace is not provided");

        let err = FunctionIdentifier::new("t", "n", "").check().unwrap_err();
        assert_eq!(err.to_string(), "Function name is not provided");

        assert!(FunctionIdentifier::new("t", "n", "f").check().is_ok());
        assert_eq!("t/n/f", FunctionIdentifier::new("t", "n", "f").to_string());
    }
}
