// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transport client for the SLS `PutLogs` API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::compressor::Lz4Compressor;
use crate::constants::{
    API_VERSION, COMPRESS_TYPE, CONTENT_TYPE, HEADER_API_VERSION, HEADER_AUTHORIZATION,
    HEADER_BODY_RAW_SIZE, HEADER_COMPRESS_TYPE, HEADER_CONTENT_LENGTH, HEADER_CONTENT_MD5,
    HEADER_CONTENT_TYPE, HEADER_DATE, HEADER_HOST, HEADER_SIGNATURE_METHOD, SIGNATURE_METHOD,
};
use crate::encoder::Encoder;
use crate::entity::Group;
use crate::error::PutLogsError;
use crate::http::get_client;
use crate::signer::{authorization, content_md5, gmt_date, SigningRequest};

/// Destination of flushed groups.
///
/// `put_logs` never fails from the caller's point of view: a shipping error is logged
/// by the implementation and the group is dropped.
#[async_trait]
pub trait LogSink: Send {
    async fn put_logs(&mut self, project: &str, logstore: &str, group: Group);

    /// Gives the sink a chance to free pooled memory that went unused.
    fn release_idle(&mut self, _now: Instant) {}
}

pub struct LogPutterConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    /// Regional endpoint, e.g. `cn-hangzhou.log.aliyuncs.com`.
    pub endpoint: String,
    /// Replaces `https://{project}.{endpoint}` as the request origin.
    pub intake_url_override: Option<String>,
    pub timeout: Duration,
    pub https_proxy: Option<String>,
}

pub struct LogPutter {
    client: reqwest::Client,
    access_key_id: String,
    access_key_secret: String,
    endpoint: String,
    intake_url_override: Option<String>,
    encoder: Encoder,
    compressor: Lz4Compressor,
}

impl LogPutter {
    #[must_use]
    pub fn new(config: LogPutterConfig) -> Self {
        LogPutter {
            client: get_client(config.timeout, config.https_proxy.as_deref()),
            access_key_id: config.access_key_id,
            access_key_secret: config.access_key_secret,
            endpoint: config.endpoint,
            intake_url_override: config.intake_url_override,
            encoder: Encoder::default(),
            compressor: Lz4Compressor::new(),
        }
    }

    /// Encodes, compresses and signs `group` into a ready-to-send request.
    ///
    /// # Errors
    ///
    /// If compression fails or the resulting URL or headers are invalid.
    pub fn build_request(
        &mut self,
        project: &str,
        logstore: &str,
        group: &Group,
    ) -> Result<reqwest::Request, PutLogsError> {
        let uri = format!("/logstores/{logstore}/shards/lb");
        let host = format!("{project}.{}", self.endpoint);
        let url = match &self.intake_url_override {
            Some(origin) => format!("{}{uri}", origin.trim_end_matches('/')),
            None => format!("https://{host}{uri}"),
        };

        let raw = self.encoder.encode(group);
        let body = self.compressor.compress(&raw)?;

        let date = gmt_date();
        let raw_size = raw.len().to_string();
        let content_length = body.len().to_string();
        let md5 = content_md5(&body);
        let headers = [
            (HEADER_DATE, date.as_str()),
            (HEADER_CONTENT_TYPE, CONTENT_TYPE),
            (HEADER_API_VERSION, API_VERSION),
            (HEADER_SIGNATURE_METHOD, SIGNATURE_METHOD),
            (HEADER_COMPRESS_TYPE, COMPRESS_TYPE),
            (HEADER_HOST, host.as_str()),
            (HEADER_BODY_RAW_SIZE, raw_size.as_str()),
            (HEADER_CONTENT_LENGTH, content_length.as_str()),
            (HEADER_CONTENT_MD5, md5.as_str()),
        ];

        let signature = SigningRequest {
            method: "POST",
            body: Some(&body),
            content_type: Some(CONTENT_TYPE),
            date: &date,
            headers: &headers,
            uri: &uri,
            query: None,
        }
        .sign(&self.access_key_secret);

        let mut builder = self.client.post(url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        Ok(builder
            .header(
                HEADER_AUTHORIZATION,
                authorization(&self.access_key_id, &signature),
            )
            .body(body)
            .build()?)
    }

    async fn try_put_logs(
        &mut self,
        project: &str,
        logstore: &str,
        group: &Group,
    ) -> Result<(), PutLogsError> {
        let request = self.build_request(project, logstore, group)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(PutLogsError::Status { status, body })
    }
}

#[async_trait]
impl LogSink for LogPutter {
    async fn put_logs(&mut self, project: &str, logstore: &str, group: Group) {
        let n_items = group.len();
        match self.try_put_logs(project, logstore, &group).await {
            Ok(()) => debug!("SLS | Put {n_items} logs to {project}/{logstore}"),
            Err(e) => error!("SLS | {e}"),
        }
    }

    fn release_idle(&mut self, now: Instant) {
        self.compressor.release_idle(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::decompress;
    use crate::entity::{Item, Tag};
    use mockito::{Matcher, Server};
    use tracing_test::traced_test;

    const SECRET: &str = "test-secret";

    fn create_putter(intake_url_override: Option<String>) -> LogPutter {
        LogPutter::new(LogPutterConfig {
            access_key_id: "test-id".to_string(),
            access_key_secret: SECRET.to_string(),
            endpoint: "cn-hangzhou.log.aliyuncs.com".to_string(),
            intake_url_override,
            timeout: Duration::from_secs(5),
            https_proxy: None,
        })
    }

    fn create_group() -> Group {
        let mut group = Group::new(Some("app".to_string()), Some("10.0.0.1".to_string()));
        group.push_tag(Tag::new("env", "test"));
        group.push(Item::new(1_700_000_000).content("message", "hello"));
        group.push(Item::new(1_700_000_001).content("message", "world"));
        group
    }

    fn header<'a>(request: &'a reqwest::Request, name: &str) -> &'a str {
        request.headers()[name].to_str().unwrap()
    }

    #[test]
    fn test_build_request_url_and_headers() {
        let mut putter = create_putter(None);
        let group = create_group();

        let request = putter.build_request("proj", "store", &group).unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://proj.cn-hangzhou.log.aliyuncs.com/logstores/store/shards/lb"
        );
        assert_eq!(header(&request, "host"), "proj.cn-hangzhou.log.aliyuncs.com");
        assert_eq!(header(&request, "content-type"), "application/x-protobuf");
        assert_eq!(header(&request, "x-log-apiversion"), "0.6.0");
        assert_eq!(header(&request, "x-log-signaturemethod"), "hmac-sha1");
        assert_eq!(header(&request, "x-log-compresstype"), "lz4");
        assert!(header(&request, "date").ends_with(" GMT"));
        assert!(header(&request, "authorization").starts_with("LOG test-id:"));
    }

    #[test]
    fn test_build_request_body() {
        let mut putter = create_putter(None);
        let group = create_group();

        let request = putter.build_request("proj", "store", &group).unwrap();
        let body = request.body().and_then(reqwest::Body::as_bytes).unwrap();

        let raw_size: usize = header(&request, "x-log-bodyrawsize").parse().unwrap();
        assert_eq!(header(&request, "content-length"), body.len().to_string());
        assert_eq!(header(&request, "content-md5"), content_md5(body));
        assert_eq!(
            decompress(body, raw_size).unwrap(),
            Encoder::default().encode(&group)
        );
    }

    #[test]
    fn test_build_request_signature_verifies() {
        let mut putter = create_putter(None);
        let request = putter
            .build_request("proj", "store", &create_group())
            .unwrap();

        let headers: Vec<(&str, &str)> = request
            .headers()
            .iter()
            .filter(|(name, _)| *name != "authorization")
            .map(|(name, value)| (name.as_str(), value.to_str().unwrap()))
            .collect();
        let expected = SigningRequest {
            method: "POST",
            body: request.body().and_then(reqwest::Body::as_bytes),
            content_type: Some(CONTENT_TYPE),
            date: header(&request, "date"),
            headers: &headers,
            uri: request.url().path(),
            query: None,
        }
        .sign(SECRET);

        assert_eq!(
            header(&request, "authorization"),
            format!("LOG test-id:{expected}")
        );
    }

    #[test]
    fn test_intake_url_override_keeps_host() {
        let mut putter = create_putter(Some("http://127.0.0.1:9999/".to_string()));

        let request = putter
            .build_request("proj", "store", &create_group())
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:9999/logstores/store/shards/lb"
        );
        assert_eq!(header(&request, "host"), "proj.cn-hangzhou.log.aliyuncs.com");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_put_logs_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logstores/store/shards/lb")
            .match_header("content-type", "application/x-protobuf")
            .match_header("x-log-compresstype", "lz4")
            .match_header("x-log-bodyrawsize", Matcher::Regex(r"^\d+$".to_string()))
            .match_header("authorization", Matcher::Regex("^LOG test-id:".to_string()))
            .with_status(200)
            .create_async()
            .await;

        let mut putter = create_putter(Some(server.url()));
        putter.put_logs("proj", "store", create_group()).await;

        mock.assert_async().await;
        assert!(logs_contain("SLS | Put 2 logs to proj/store"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_put_logs_error_status_is_logged() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/logstores/store/shards/lb")
            .with_status(403)
            .with_body(r#"{"errorCode":"SignatureNotMatch"}"#)
            .create_async()
            .await;

        let mut putter = create_putter(Some(server.url()));
        putter.put_logs("proj", "store", create_group()).await;

        mock.assert_async().await;
        assert!(logs_contain("put logs failed [403 Forbidden]"));
        assert!(logs_contain("SignatureNotMatch"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_put_logs_transport_error_is_logged() {
        // nothing listens on the discard port
        let mut putter = create_putter(Some("http://127.0.0.1:9".to_string()));

        putter.put_logs("proj", "store", create_group()).await;

        assert!(logs_contain("put logs failed [X]"));
    }
}
