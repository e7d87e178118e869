// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::error::LeaderError;
use crate::record::WriteRequest;

/// Link towards the single node allowed to write function metadata.
#[async_trait::async_trait]
pub trait LeaderLink: Send + Sync {
    async fn is_leader(&self) -> bool;

    /// Hand a write over to the leader and wait for its outcome.
    async fn forward_write(&self, request: WriteRequest) -> Result<(), LeaderError>;
}
