// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! SLS request signing (`LOG` scheme, HMAC-SHA1).
//!
//! The canonical string is, newline separated:
//!
//! ```text
//! METHOD
//! hex(md5(body))        or empty
//! Content-Type          or empty
//! Date
//! x-log-*/x-acs-* headers, lower-cased, sorted, `name:value`, one per line
//! URI[?query]
//! ```
//!
//! The server recomputes this string independently, so every line must be present even
//! when empty.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const SIGNED_HEADER_PREFIXES: [&str; 2] = ["x-log-", "x-acs-"];

/// Everything of a request that goes into its signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub body: Option<&'a [u8]>,
    pub content_type: Option<&'a str>,
    pub date: &'a str,
    /// All request headers; only the `x-log-`/`x-acs-` ones are signed.
    pub headers: &'a [(&'a str, &'a str)],
    pub uri: &'a str,
    pub query: Option<&'a str>,
}

impl SigningRequest<'_> {
    #[must_use]
    pub fn canonical_string(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(5 + self.headers.len());
        lines.push(self.method.to_uppercase());
        lines.push(self.body.map(|b| hex::encode(Md5::digest(b))).unwrap_or_default());
        lines.push(self.content_type.unwrap_or_default().to_string());
        lines.push(self.date.to_string());

        let mut signed: Vec<(String, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), *value))
            .filter(|(name, _)| SIGNED_HEADER_PREFIXES.iter().any(|p| name.starts_with(p)))
            .collect();
        signed.sort_by(|a, b| a.0.cmp(&b.0));
        lines.extend(signed.into_iter().map(|(name, value)| format!("{name}:{value}")));

        match self.query {
            Some(query) if !query.trim().is_empty() => lines.push(format!("{}?{query}", self.uri)),
            _ => lines.push(self.uri.to_string()),
        }
        lines.join("\n")
    }

    /// Base64 HMAC-SHA1 of the canonical string, keyed with the access key secret.
    #[must_use]
    pub fn sign(&self, access_key_secret: &str) -> String {
        sign_string(&self.canonical_string(), access_key_secret)
    }
}

/// Base64 HMAC-SHA1 of an already canonicalised string.
#[must_use]
pub fn sign_string(canonical: &str, access_key_secret: &str) -> String {
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha1::new_from_slice(access_key_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(canonical.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Value of the `Authorization` header.
#[must_use]
pub fn authorization(access_key_id: &str, signature: &str) -> String {
    format!("LOG {access_key_id}:{signature}")
}

/// Base64 MD5 of the body, for `Content-MD5`.
#[must_use]
pub fn content_md5(body: &[u8]) -> String {
    STANDARD.encode(Md5::digest(body))
}

/// Current time in RFC 1123 form, e.g. `Mon, 09 Nov 2015 06:03:03 GMT`.
#[must_use]
pub fn gmt_date() -> String {
    format_gmt_date(Utc::now())
}

#[must_use]
pub fn format_gmt_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
