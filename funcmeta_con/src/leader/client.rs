// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::error::LeaderError;
use futures::SinkExt;

#[derive(Clone)]
pub struct LeaderClient {
    sender: futures::channel::mpsc::UnboundedSender<super::LeaderRequest>,
}

#[allow(clippy::new_ret_no_self)]
impl LeaderClient {
    pub fn new(sender: futures::channel::mpsc::UnboundedSender<super::LeaderRequest>) -> std::sync::Arc<dyn funcmeta_api::leader::LeaderLink> {
        std::sync::Arc::new(LeaderClient { sender })
    }
}

#[async_trait::async_trait]
impl funcmeta_api::leader::LeaderLink for LeaderClient {
    async fn is_leader(&self) -> bool {
        let (reply_sender, reply_receiver) = tokio::sync::oneshot::channel::<bool>();
        if self.sender.clone().send(super::LeaderRequest::IsLeader(reply_sender)).await.is_err() {
            return false;
        }
        reply_receiver.await.unwrap_or(false)
    }

    async fn forward_write(&self, request: funcmeta_api::record::WriteRequest) -> Result<(), LeaderError> {
        let (reply_sender, reply_receiver) = tokio::sync::oneshot::channel::<Result<(), LeaderError>>();
        match self.sender.clone().send(super::LeaderRequest::Write(request, reply_sender)).await {
            Ok(_) => {}
            Err(_) => return Err(LeaderError::Unavailable("Leader Channel Error".to_string())),
        }
        let reply = reply_receiver.await;
        match reply {
            Ok(ret) => ret,
            Err(_) => Err(LeaderError::Interrupted("Leader Channel Error".to_string())),
        }
    }
}
