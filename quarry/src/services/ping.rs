//! Ping a node and read its version

use crate::client::Client;
use crate::error::{Error, Result};
use crate::services::ParamsBuilder;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Node banner returned by `GET /`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingResult {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_uuid: String,
    #[serde(default)]
    pub version: VersionInfo,
    #[serde(default)]
    pub tagline: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub build_hash: String,
    #[serde(default)]
    pub build_date: String,
    #[serde(default)]
    pub build_snapshot: bool,
    #[serde(default)]
    pub lucene_version: String,
}

/// Checks that a node answers, bypassing the pool
///
/// Unlike other services this talks to one URL directly, so it works before
/// the client has any live connections.
pub struct PingService {
    client: Client,
    url: String,
    timeout: Option<Duration>,
    http_head_only: bool,
    pretty: bool,
}

impl PingService {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: None,
            http_head_only: false,
            pretty: false,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send `HEAD /` and return an empty result with the status only
    pub fn http_head_only(mut self, head_only: bool) -> Self {
        self.http_head_only = head_only;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> String {
        let params = ParamsBuilder::new().pretty(self.pretty).build();
        crate::uritemplates::with_params(&format!("{}/", self.url.trim_end_matches('/')), &params)
    }

    /// Returns the banner and the HTTP status
    pub async fn do_request(self) -> Result<(PingResult, u16)> {
        let method = if self.http_head_only {
            Method::HEAD
        } else {
            Method::GET
        };
        let (status, body) = self
            .client
            .request_url(method, &self.build_url(), self.timeout)
            .await?;

        if self.http_head_only || body.is_empty() {
            return Ok((PingResult::default(), status));
        }
        if !(200..300).contains(&status) {
            return Err(Error::Api(crate::error::ApiError::from_body(status, &body)));
        }
        Ok((serde_json::from_slice(&body)?, status))
    }
}

impl Client {
    /// Ping the node at `url`
    pub fn ping(&self, url: impl Into<String>) -> PingService {
        PingService::new(self.clone(), url)
    }

    /// Version number reported by the node at `url`
    pub async fn elasticsearch_version(&self, url: impl Into<String>) -> Result<String> {
        let (res, _) = self.ping(url).do_request().await?;
        Ok(res.version.number)
    }

    /// Send a one-off request to an absolute URL outside the pool
    pub(crate) async fn request_url(
        &self,
        method: Method,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<(u16, bytes::Bytes)> {
        let mut request = self.http().request(method, url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let res = self.apply_auth(request).send().await?;
        let status = res.status().as_u16();
        Ok((status, res.bytes().await?))
    }
}
