// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Entry point: validated configuration plus one worker per topic.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::batcher::{Batcher, BatcherConfig};
use crate::config::{SlsConfig, ValidatedConfig};
use crate::error::SlsError;
use crate::putter::{LogPutter, LogPutterConfig};
use crate::worker::{TopicWorker, TopicWorkerHandle};

pub struct SlsWriter {
    config: ValidatedConfig,
    cancel_token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl SlsWriter {
    /// Validates `config` once; this is the only place the writer can fail.
    ///
    /// # Errors
    ///
    /// `SlsError::Disabled` when the configuration is missing, disabled or incomplete.
    /// Callers are expected to fall back to local output in that case.
    pub fn new(config: SlsConfig) -> Result<Self, SlsError> {
        let config = config.validate()?;
        debug!(
            "SLS | Writer enabled for {}/{} via {}",
            config.project, config.logstore, config.endpoint
        );
        Ok(SlsWriter {
            config,
            cancel_token: CancellationToken::new(),
            workers: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Spawns the worker for `topic` on the current tokio runtime.
    ///
    /// Each topic gets its own transport client and compression buffers.
    pub fn spawn_topic(&mut self, topic: &str) -> TopicWorkerHandle {
        let putter = LogPutter::new(LogPutterConfig {
            access_key_id: self.config.access_key_id.clone(),
            access_key_secret: self.config.access_key_secret.clone(),
            endpoint: self.config.endpoint.clone(),
            intake_url_override: self.config.intake_url_override.clone(),
            timeout: self.config.flush_timeout,
            https_proxy: self.config.https_proxy.clone(),
        });
        let batcher = Batcher::new(
            putter,
            BatcherConfig {
                project: self.config.project.clone(),
                logstore: self.config.logstore.clone(),
                topic: Some(topic.to_string()),
                source: self.config.source.clone(),
                tags: self.config.tags.clone(),
            },
        );
        let (worker, handle) = TopicWorker::new(batcher, self.cancel_token.child_token());
        self.workers.push(tokio::spawn(worker.run()));
        debug!("SLS | Spawned worker for topic {topic:?}");
        handle
    }

    /// Stops every worker and waits for them; batches already submitted are shipped first.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("SLS | Topic worker failed: {e}");
            }
        }
    }
}
