// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::error::LeaderError;
use funcmeta_api::record::WriteRequest;
use futures::StreamExt;

pub struct LeaderTask {
    writer: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataWriter>,
    receiver: futures::channel::mpsc::UnboundedReceiver<super::LeaderRequest>,
    is_leader: bool,
}

impl LeaderTask {
    pub fn new(
        writer: std::sync::Arc<dyn funcmeta_api::metadata_store::MetadataWriter>,
        receiver: futures::channel::mpsc::UnboundedReceiver<super::LeaderRequest>,
    ) -> Self {
        Self {
            writer,
            receiver,
            is_leader: true,
        }
    }

    /// Main loop of the leader task, serving one request at a time.
    pub async fn run(&mut self) {
        while let Some(req) = self.receiver.next().await {
            match req {
                super::LeaderRequest::Write(request, reply_sender) => {
                    let reply = self.apply(&request).await;
                    match &reply {
                        Ok(_) => log::info!("{} written", request.id()),
                        Err(err) => log::warn!("write of {} refused: {}", request.id(), err),
                    }
                    if let Err(err) = reply_sender.send(reply) {
                        log::error!("Unhandled: {:?}", err);
                    }
                }
                super::LeaderRequest::IsLeader(reply_sender) => {
                    let _ = reply_sender.send(self.is_leader);
                }
                super::LeaderRequest::Resign => {
                    log::info!("leader resigned");
                    self.is_leader = false;
                }
            }
        }
        log::info!("leader task stopped");
    }

    async fn apply(&mut self, request: &WriteRequest) -> Result<(), LeaderError> {
        if !self.is_leader {
            return Err(LeaderError::Interrupted(format!("Not the leader anymore, write of {} aborted", request.id())));
        }
        let name = &request.id().name;
        let stored = self
            .writer
            .get(request.id())
            .await
            .map_err(|e| LeaderError::Unavailable(e.to_string()))?;

        match (request, stored) {
            (WriteRequest::Upsert { is_update: false, .. }, Some(_)) => {
                return Err(LeaderError::InvalidArgument(format!("Function {} already exists", name)));
            }
            (WriteRequest::Upsert { is_update: true, .. }, None) | (WriteRequest::Tombstone { .. }, None) => {
                return Err(LeaderError::InvalidArgument(format!("Function {} doesn't exist", name)));
            }
            (WriteRequest::Upsert { record, .. }, stored) => {
                let expected = stored.map_or(0, |s| s.version + 1);
                if record.version != expected {
                    return Err(LeaderError::Conflict(format!(
                        "Function {} has version {}, expected {}",
                        name, record.version, expected
                    )));
                }
            }
            (WriteRequest::Tombstone { .. }, Some(_)) => {}
        }

        let res = match request {
            WriteRequest::Upsert { record, .. } => self.writer.put(record.clone()).await,
            WriteRequest::Tombstone { record } => self.writer.remove(record.id()).await.map(|_| ()),
        };
        res.map_err(|e| LeaderError::Unavailable(e.to_string()))
    }
}
