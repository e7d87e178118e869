// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::deployment::FunctionDetails;
use crate::function_id::FunctionIdentifier;
use crate::package::PackageLocation;

/// Persisted metadata of a function. Replaced wholesale on every accepted
/// update.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FunctionRecord {
    pub details: FunctionDetails,
    pub package_location: PackageLocation,
    pub transform_function_package_location: Option<PackageLocation>,
    /// Milliseconds since the epoch.
    pub create_time: i64,
    /// Starts at 0, increased by exactly 1 per accepted write.
    pub version: u64,
}

impl FunctionRecord {
    pub fn id(&self) -> &FunctionIdentifier {
        &self.details.id
    }
}

/// Field that cannot be changed once a function is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmutableField {
    InputTopics,
}

impl std::fmt::Display for ImmutableField {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ImmutableField::InputTopics => write!(f, "Input Topics"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDecision {
    Apply(FunctionRecord),
    RejectNoChange,
    RejectImmutableFieldChanged(ImmutableField),
}

impl UpdateDecision {
    /// Record to be written, or the error reported to the user for a
    /// rejected update.
    pub fn into_result(self) -> Result<FunctionRecord, crate::error::ControlPlaneError> {
        match self {
            UpdateDecision::Apply(record) => Ok(record),
            UpdateDecision::RejectNoChange => Err(crate::error::ControlPlaneError::BadRequest("Update contains no change".to_string())),
            UpdateDecision::RejectImmutableFieldChanged(field) => {
                Err(crate::error::ControlPlaneError::BadRequest(format!("{} cannot be altered", field)))
            }
        }
    }
}

/// Write forwarded to the leader.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Upsert { record: FunctionRecord, is_update: bool },
    Tombstone { record: FunctionRecord },
}

impl WriteRequest {
    pub fn id(&self) -> &FunctionIdentifier {
        match self {
            WriteRequest::Upsert { record, .. } | WriteRequest::Tombstone { record } => record.id(),
        }
    }
}
