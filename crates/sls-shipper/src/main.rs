// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, mem, process::ExitCode};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use sls_writer::{
    constants::DEFAULT_BATCH_BUFFER_SIZE, Item, Level, LogRecord, SlsConfig, SlsWriter,
};

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("SLS_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let mut writer = match SlsWriter::new(SlsConfig::from_env()) {
        Ok(writer) => writer,
        Err(e) => {
            error!("SLS | {e}");
            return ExitCode::FAILURE;
        }
    };

    let topic = env::var("SLS_TOPIC").unwrap_or_default();
    let handle = writer.spawn_topic(&topic);
    info!("SLS | Shipping stdin to topic {topic:?}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut batch: Vec<Item> = Vec::with_capacity(DEFAULT_BATCH_BUFFER_SIZE);
    let mut n_lines: usize = 0;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                n_lines += 1;
                batch.push(LogRecord::now(Level::Info, line).into_item());
                if batch.len() >= DEFAULT_BATCH_BUFFER_SIZE {
                    let full = mem::replace(&mut batch, Vec::with_capacity(DEFAULT_BATCH_BUFFER_SIZE));
                    if let Err(e) = handle.submit(full) {
                        error!("SLS | Failed to submit batch: {e}");
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("SLS | Failed to read stdin: {e}");
                break;
            }
        }
    }

    // batches are processed in order, so this returns once everything before it is shipped
    if let Err(e) = handle.process(batch).await {
        error!("SLS | {e}");
    }
    writer.shutdown().await;
    info!("SLS | Done after {n_lines} lines");

    ExitCode::SUCCESS
}
