// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::error::{GatewayError, LeaderError};
use funcmeta_api::record::{FunctionRecord, WriteRequest};

/// Forwards the writes to the leader and classifies its outcome.
///
/// Nothing is retried here: a failed write is reported to the caller.
#[derive(Clone)]
pub struct MetadataGateway {
    leader: std::sync::Arc<dyn funcmeta_api::leader::LeaderLink>,
    timeout: std::time::Duration,
}

impl MetadataGateway {
    pub fn new(leader: std::sync::Arc<dyn funcmeta_api::leader::LeaderLink>, timeout: std::time::Duration) -> Self {
        Self { leader, timeout }
    }

    pub async fn apply(&self, record: FunctionRecord, is_update: bool) -> Result<(), GatewayError> {
        self.forward(WriteRequest::Upsert { record, is_update }).await
    }

    pub async fn remove(&self, record: FunctionRecord) -> Result<(), GatewayError> {
        self.forward(WriteRequest::Tombstone { record }).await
    }

    async fn forward(&self, request: WriteRequest) -> Result<(), GatewayError> {
        let id = request.id().clone();
        match tokio::time::timeout(self.timeout, self.leader.forward_write(request)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(LeaderError::InvalidArgument(msg))) => Err(GatewayError::Rejected(msg)),
            Ok(Err(err)) => {
                log::error!("write of {} failed: {}", id, err);
                Err(GatewayError::Failed(err.to_string()))
            }
            Err(_) => {
                log::error!("write of {} timed out after {} ms", id, self.timeout.as_millis());
                Err(GatewayError::Failed(format!(
                    "Timeout while waiting for the leader to write function {}",
                    id
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};

    struct MockLeader {
        sender: futures::channel::mpsc::UnboundedSender<WriteRequest>,
        outcome: Result<(), LeaderError>,
        delay: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl funcmeta_api::leader::LeaderLink for MockLeader {
        async fn is_leader(&self) -> bool {
            false
        }
        async fn forward_write(&self, request: WriteRequest) -> Result<(), LeaderError> {
            self.sender.clone().send(request).await.unwrap();
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }
    }

    fn setup_gateway(
        outcome: Result<(), LeaderError>,
        delay: std::time::Duration,
    ) -> (MetadataGateway, futures::channel::mpsc::UnboundedReceiver<WriteRequest>) {
        let (sender, receiver) = futures::channel::mpsc::unbounded();
        let leader = MockLeader { sender, outcome, delay };
        (
            MetadataGateway::new(std::sync::Arc::new(leader), std::time::Duration::from_millis(200)),
            receiver,
        )
    }

    #[tokio::test]
    async fn test_gateway_forwards_to_leader() {
        let (gateway, mut receiver) = setup_gateway(Ok(()), std::time::Duration::ZERO);
        let record = crate::test_utils::record("t", "n", "f");
        gateway.apply(record.clone(), true).await.unwrap();
        assert_eq!(
            WriteRequest::Upsert {
                record: record.clone(),
                is_update: true
            },
            receiver.next().await.unwrap()
        );
        gateway.remove(record.clone()).await.unwrap();
        assert_eq!(WriteRequest::Tombstone { record }, receiver.next().await.unwrap());
    }

    #[tokio::test]
    async fn test_gateway_failure_classification() {
        let record = crate::test_utils::record("t", "n", "f");
        for (outcome, expected) in [
            (
                LeaderError::InvalidArgument("function failed to register".to_string()),
                GatewayError::Rejected("function failed to register".to_string()),
            ),
            (
                LeaderError::Interrupted("Function registration interrupted".to_string()),
                GatewayError::Failed("Function registration interrupted".to_string()),
            ),
            (
                LeaderError::Unavailable("store down".to_string()),
                GatewayError::Failed("store down".to_string()),
            ),
            (
                LeaderError::Conflict("stale version".to_string()),
                GatewayError::Failed("stale version".to_string()),
            ),
        ] {
            let (gateway, _receiver) = setup_gateway(Err(outcome), std::time::Duration::ZERO);
            assert_eq!(Err(expected), gateway.apply(record.clone(), false).await);
        }
    }

    #[tokio::test]
    async fn test_gateway_timeout() {
        let (gateway, _receiver) = setup_gateway(Ok(()), std::time::Duration::from_secs(10));
        match gateway.apply(crate::test_utils::record("t", "n", "f"), false).await {
            Err(GatewayError::Failed(msg)) => assert!(msg.starts_with("Timeout")),
            res => panic!("unexpected result {:?}", res),
        }
    }
}
