// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use futures::SinkExt;

pub mod client;
pub mod leader_task;

/// Single writer of the function metadata.
///
/// All the writes are received on one channel and applied in order by the
/// leader task, which gives a total order of the writes per function.
pub struct MetadataLeader {
    sender: futures::channel::mpsc::UnboundedSender<LeaderRequest>,
}

pub enum LeaderRequest {
    Write(
        funcmeta_api::record::WriteRequest,
        // Reply Channel
        tokio::sync::oneshot::Sender<Result<(), funcmeta_api::error::LeaderError>>,
    ),
    IsLeader(
        // Reply Channel
        tokio::sync::oneshot::Sender<bool>,
    ),
    Resign,
}

pub type Task = std::pin::Pin<Box<dyn futures::Future<Output = ()> + Send>>;

impl MetadataLeader {
    pub fn new(writer: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataWriter>) -> (Self, Task) {
        let (sender, receiver) = futures::channel::mpsc::unbounded();

        let main_task = Box::pin(async move {
            let mut leader_task = leader_task::LeaderTask::new(writer, receiver);
            leader_task.run().await;
        });

        (MetadataLeader { sender }, main_task)
    }

    pub fn get_leader_link(&mut self) -> std::sync::Arc<dyn funcmeta_api::leader::LeaderLink> {
        client::LeaderClient::new(self.sender.clone())
    }

    /// Give up the leadership: all the writes received from now on fail.
    pub async fn resign(&mut self) {
        if self.sender.send(LeaderRequest::Resign).await.is_err() {
            log::warn!("leader task already stopped");
        }
    }
}
