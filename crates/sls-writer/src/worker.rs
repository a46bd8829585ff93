// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One background task per topic.
//!
//! A [`TopicWorker`] owns a [`Batcher`] and with it the transport client and compression
//! buffers of its topic. Producers talk to it through a cloneable [`TopicWorkerHandle`];
//! batches are processed strictly one after another, in the order they were sent.

use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::batcher::Batcher;
use crate::constants::IDLE_SWEEP_INTERVAL;
use crate::entity::Item;
use crate::putter::LogSink;

#[derive(Debug)]
pub enum WorkerCommand {
    /// Items of one delivered batch, and who to tell once they are shipped.
    ProcessBatch(Vec<Item>, Option<oneshot::Sender<()>>),
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct TopicWorkerHandle {
    tx: mpsc::UnboundedSender<WorkerCommand>,
}

impl TopicWorkerHandle {
    /// Queues a batch without waiting for it.
    pub fn submit(&self, items: Vec<Item>) -> Result<(), mpsc::error::SendError<WorkerCommand>> {
        self.tx.send(WorkerCommand::ProcessBatch(items, None))
    }

    /// Queues a batch and waits until every group made from it went through the sink.
    pub async fn process(&self, items: Vec<Item>) -> Result<(), String> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(WorkerCommand::ProcessBatch(items, Some(done_tx)))
            .map_err(|e| format!("Failed to send batch: {}", e))?;

        done_rx
            .await
            .map_err(|e| format!("Failed to receive batch completion: {}", e))
    }

    pub fn shutdown(&self) -> Result<(), mpsc::error::SendError<WorkerCommand>> {
        self.tx.send(WorkerCommand::Shutdown)
    }
}

pub struct TopicWorker<S: LogSink> {
    batcher: Batcher<S>,
    rx: mpsc::UnboundedReceiver<WorkerCommand>,
    cancel_token: CancellationToken,
}

impl<S: LogSink> TopicWorker<S> {
    pub fn new(batcher: Batcher<S>, cancel_token: CancellationToken) -> (Self, TopicWorkerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            batcher,
            rx,
            cancel_token,
        };
        (worker, TopicWorkerHandle { tx })
    }

    /// Runs until `Shutdown`, until every handle is dropped, or until cancelled.
    ///
    /// Batches accepted before the stop are still shipped; later sends fail.
    pub async fn run(mut self) {
        debug!("SLS | Topic worker started");
        let mut sweep = tokio::time::interval(IDLE_SWEEP_INTERVAL);

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    debug!("SLS | Topic worker cancelled");
                    self.drain().await;
                    break;
                }
                command = self.rx.recv() => match command {
                    Some(WorkerCommand::ProcessBatch(items, done)) => {
                        self.process_batch(items, done).await;
                    }
                    Some(WorkerCommand::Shutdown) => {
                        debug!("SLS | Topic worker shutting down");
                        self.drain().await;
                        break;
                    }
                    None => {
                        debug!("SLS | All topic worker handles dropped");
                        break;
                    }
                },
                _ = sweep.tick() => self.batcher.release_idle(Instant::now()),
            }
        }

        debug!("SLS | Topic worker stopped");
    }

    async fn process_batch(&mut self, items: Vec<Item>, done: Option<oneshot::Sender<()>>) {
        self.batcher.process(items).await;
        if let Some(done) = done {
            if done.send(()).is_err() {
                error!("SLS | Failed to signal batch completion - receiver dropped");
            }
        }
    }

    /// Closes the channel and ships every batch that was already queued.
    async fn drain(&mut self) {
        self.rx.close();
        let mut drained: usize = 0;
        while let Some(command) = self.rx.recv().await {
            if let WorkerCommand::ProcessBatch(items, done) = command {
                self.process_batch(items, done).await;
                drained += 1;
            }
        }
        if drained > 0 {
            debug!("SLS | Shipped {drained} queued batches before stopping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::BatcherConfig;
    use crate::entity::Group;
    use async_trait::async_trait;

    struct ChannelSink {
        tx: mpsc::UnboundedSender<Group>,
    }

    #[async_trait]
    impl LogSink for ChannelSink {
        async fn put_logs(&mut self, _project: &str, _logstore: &str, group: Group) {
            self.tx.send(group).expect("receiver dropped");
        }
    }

    fn create_worker() -> (
        TopicWorker<ChannelSink>,
        TopicWorkerHandle,
        mpsc::UnboundedReceiver<Group>,
        CancellationToken,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let batcher = Batcher::new(
            ChannelSink { tx },
            BatcherConfig {
                project: "proj".to_string(),
                logstore: "store".to_string(),
                topic: Some("topic".to_string()),
                source: None,
                tags: Vec::new(),
            },
        );
        let cancel_token = CancellationToken::new();
        let (worker, handle) = TopicWorker::new(batcher, cancel_token.clone());
        (worker, handle, rx, cancel_token)
    }

    fn create_items(n: u32) -> Vec<Item> {
        (0..n).map(|i| Item::new(i).content("n", i.to_string())).collect()
    }

    #[tokio::test]
    async fn test_process_waits_for_shipping() {
        let (worker, handle, mut groups, _) = create_worker();
        let worker_task = tokio::spawn(worker.run());

        handle
            .process(create_items(3))
            .await
            .expect("Failed to process batch");

        let group = groups.try_recv().expect("group not shipped before completion");
        assert_eq!(group.len(), 3);

        handle.shutdown().expect("Failed to shutdown");
        worker_task.await.expect("Worker task failed");
    }

    #[tokio::test]
    async fn test_batches_are_processed_in_order() {
        let (worker, handle, mut groups, _) = create_worker();
        let worker_task = tokio::spawn(worker.run());

        handle.submit(create_items(1)).expect("Failed to submit");
        handle.submit(create_items(2)).expect("Failed to submit");
        handle
            .process(create_items(3))
            .await
            .expect("Failed to process batch");

        let sizes: Vec<usize> = (0..3)
            .map(|_| groups.try_recv().expect("missing group").len())
            .collect();
        assert_eq!(sizes, vec![1, 2, 3]);

        handle.shutdown().expect("Failed to shutdown");
        worker_task.await.expect("Worker task failed");
    }

    #[tokio::test]
    async fn test_stops_when_handles_are_dropped() {
        let (worker, handle, _groups, _) = create_worker();
        let worker_task = tokio::spawn(worker.run());

        drop(handle);

        worker_task.await.expect("Worker task failed");
    }

    #[tokio::test]
    async fn test_cancel_ships_queued_batches() {
        let (worker, handle, mut groups, cancel_token) = create_worker();

        for n in 1..=3 {
            handle.submit(create_items(n)).expect("Failed to submit");
        }
        cancel_token.cancel();
        tokio::spawn(worker.run()).await.expect("Worker task failed");

        let sizes: Vec<usize> = (0..3)
            .map(|_| groups.try_recv().expect("queued batch was dropped").len())
            .collect();
        assert_eq!(sizes, vec![1, 2, 3]);
        assert!(handle.submit(create_items(1)).is_err());
    }

    #[tokio::test]
    async fn test_shutdown_ships_batches_queued_behind_it() {
        let (worker, handle, mut groups, _) = create_worker();

        handle.submit(create_items(1)).expect("Failed to submit");
        handle.shutdown().expect("Failed to shutdown");
        handle.submit(create_items(2)).expect("Failed to submit");
        tokio::spawn(worker.run()).await.expect("Worker task failed");

        assert_eq!(groups.try_recv().expect("missing group").len(), 1);
        assert_eq!(groups.try_recv().expect("missing group").len(), 2);
        assert!(groups.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stops_when_cancelled() {
        let (worker, handle, _groups, cancel_token) = create_worker();
        let worker_task = tokio::spawn(worker.run());

        cancel_token.cancel();
        worker_task.await.expect("Worker task failed");

        assert!(handle.process(create_items(1)).await.is_err());
    }
}
