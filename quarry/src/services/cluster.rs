//! Cluster health, state and stats

use crate::client::{Client, PerformRequestOptions};
use crate::error::{Error, Result};
use crate::services::ParamsBuilder;
use crate::uritemplates::{expand, join_list, Params};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Response of `GET /_cluster/health`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterHealthResponse {
    #[serde(default)]
    pub cluster_name: String,
    /// `green`, `yellow` or `red`
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub number_of_nodes: u32,
    #[serde(default)]
    pub number_of_data_nodes: u32,
    #[serde(default)]
    pub active_primary_shards: u32,
    #[serde(default)]
    pub active_shards: u32,
    #[serde(default)]
    pub relocating_shards: u32,
    #[serde(default)]
    pub initializing_shards: u32,
    #[serde(default)]
    pub unassigned_shards: u32,
    #[serde(default)]
    pub delayed_unassigned_shards: u32,
    #[serde(default)]
    pub number_of_pending_tasks: u32,
    #[serde(default)]
    pub number_of_in_flight_fetch: u32,
    #[serde(default)]
    pub task_max_waiting_in_queue_millis: u64,
    #[serde(default)]
    pub active_shards_percent_as_number: f64,
    /// Present with `level=indices` or `level=shards`
    #[serde(default)]
    pub indices: HashMap<String, ClusterIndexHealth>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterIndexHealth {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub number_of_shards: u32,
    #[serde(default)]
    pub number_of_replicas: u32,
    #[serde(default)]
    pub active_primary_shards: u32,
    #[serde(default)]
    pub active_shards: u32,
    #[serde(default)]
    pub relocating_shards: u32,
    #[serde(default)]
    pub initializing_shards: u32,
    #[serde(default)]
    pub unassigned_shards: u32,
    #[serde(default)]
    pub shards: HashMap<String, Value>,
}

/// Builder for `GET /_cluster/health/{indices}`
pub struct ClusterHealthService {
    client: Client,
    indices: Vec<String>,
    level: Option<String>,
    local: Option<bool>,
    master_timeout: Option<String>,
    timeout: Option<String>,
    wait_for_active_shards: Option<String>,
    wait_for_nodes: Option<String>,
    wait_for_no_relocating_shards: Option<bool>,
    wait_for_status: Option<String>,
    pretty: bool,
}

impl ClusterHealthService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            level: None,
            local: None,
            master_timeout: None,
            timeout: None,
            wait_for_active_shards: None,
            wait_for_nodes: None,
            wait_for_no_relocating_shards: None,
            wait_for_status: None,
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    /// `cluster`, `indices` or `shards`
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn master_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.master_timeout = Some(timeout.into());
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn wait_for_active_shards(mut self, shards: impl ToString) -> Self {
        self.wait_for_active_shards = Some(shards.to_string());
        self
    }

    /// e.g. `>=3` or `5`
    pub fn wait_for_nodes(mut self, nodes: impl Into<String>) -> Self {
        self.wait_for_nodes = Some(nodes.into());
        self
    }

    pub fn wait_for_no_relocating_shards(mut self, wait: bool) -> Self {
        self.wait_for_no_relocating_shards = Some(wait);
        self
    }

    pub fn wait_for_status(mut self, status: impl Into<String>) -> Self {
        self.wait_for_status = Some(status.into());
        self
    }

    pub fn wait_for_green_status(self) -> Self {
        self.wait_for_status("green")
    }

    pub fn wait_for_yellow_status(self) -> Self {
        self.wait_for_status("yellow")
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.indices.is_empty() {
            "/_cluster/health".to_string()
        } else {
            expand(
                "/_cluster/health/{index}",
                &[("index", &join_list(&self.indices))],
            )?
        };
        let params = ParamsBuilder::new()
            .opt("level", self.level.as_ref())
            .opt("local", self.local)
            .opt("master_timeout", self.master_timeout.as_ref())
            .opt("timeout", self.timeout.as_ref())
            .opt("wait_for_active_shards", self.wait_for_active_shards.as_ref())
            .opt("wait_for_nodes", self.wait_for_nodes.as_ref())
            .opt(
                "wait_for_no_relocating_shards",
                self.wait_for_no_relocating_shards,
            )
            .opt("wait_for_status", self.wait_for_status.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    /// A wait that times out answers 408 with `timed_out: true`; that is
    /// returned as a response, not an error.
    pub async fn do_request(self) -> Result<ClusterHealthResponse> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(
                PerformRequestOptions::new(Method::GET, path)
                    .params(params)
                    .ignore_errors(&[408]),
            )
            .await
    }
}

/// Response of `GET /_cluster/state`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStateResponse {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_uuid: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub state_uuid: String,
    #[serde(default)]
    pub master_node: String,
    pub blocks: Option<Value>,
    #[serde(default)]
    pub nodes: HashMap<String, Value>,
    pub metadata: Option<Value>,
    pub routing_table: Option<Value>,
    pub routing_nodes: Option<Value>,
}

/// Builder for `GET /_cluster/state/{metrics}/{indices}`
pub struct ClusterStateService {
    client: Client,
    metrics: Vec<String>,
    indices: Vec<String>,
    allow_no_indices: Option<bool>,
    expand_wildcards: Option<String>,
    flat_settings: Option<bool>,
    ignore_unavailable: Option<bool>,
    local: Option<bool>,
    master_timeout: Option<String>,
    pretty: bool,
}

impl ClusterStateService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            metrics: Vec::new(),
            indices: Vec::new(),
            allow_no_indices: None,
            expand_wildcards: None,
            flat_settings: None,
            ignore_unavailable: None,
            local: None,
            master_timeout: None,
            pretty: false,
        }
    }

    /// e.g. `metadata`, `nodes`, `routing_table`
    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metrics.push(metric.into());
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    pub fn allow_no_indices(mut self, allow: bool) -> Self {
        self.allow_no_indices = Some(allow);
        self
    }

    pub fn expand_wildcards(mut self, expand: impl Into<String>) -> Self {
        self.expand_wildcards = Some(expand.into());
        self
    }

    pub fn flat_settings(mut self, flat: bool) -> Self {
        self.flat_settings = Some(flat);
        self
    }

    pub fn ignore_unavailable(mut self, ignore: bool) -> Self {
        self.ignore_unavailable = Some(ignore);
        self
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn master_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.master_timeout = Some(timeout.into());
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let metrics = if self.metrics.is_empty() {
            "_all".to_string()
        } else {
            join_list(&self.metrics)
        };
        let path = if self.indices.is_empty() {
            expand("/_cluster/state/{metrics}", &[("metrics", &metrics)])?
        } else {
            expand(
                "/_cluster/state/{metrics}/{indices}",
                &[("metrics", &metrics), ("indices", &join_list(&self.indices))],
            )?
        };
        let params = ParamsBuilder::new()
            .opt("allow_no_indices", self.allow_no_indices)
            .opt("expand_wildcards", self.expand_wildcards.as_ref())
            .opt("flat_settings", self.flat_settings)
            .opt("ignore_unavailable", self.ignore_unavailable)
            .opt("local", self.local)
            .opt("master_timeout", self.master_timeout.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<ClusterStateResponse> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::GET, path).params(params))
            .await
    }
}

/// Response of `GET /_cluster/stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStatsResponse {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_uuid: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub status: String,
    pub indices: Option<Value>,
    pub nodes: Option<Value>,
}

/// Builder for `GET /_cluster/stats[/nodes/{node_id}]`
pub struct ClusterStatsService {
    client: Client,
    node_id: Vec<String>,
    flat_settings: Option<bool>,
    human: Option<bool>,
    pretty: bool,
}

impl ClusterStatsService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            node_id: Vec::new(),
            flat_settings: None,
            human: None,
            pretty: false,
        }
    }

    pub fn node_id<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.node_id = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn flat_settings(mut self, flat: bool) -> Self {
        self.flat_settings = Some(flat);
        self
    }

    pub fn human(mut self, human: bool) -> Self {
        self.human = Some(human);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.node_id.is_empty() {
            "/_cluster/stats".to_string()
        } else {
            expand(
                "/_cluster/stats/nodes/{node_id}",
                &[("node_id", &join_list(&self.node_id))],
            )?
        };
        let params = ParamsBuilder::new()
            .opt("flat_settings", self.flat_settings)
            .opt("human", self.human)
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<ClusterStatsResponse> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::GET, path).params(params))
            .await
    }
}

impl Client {
    pub fn cluster_health(&self) -> ClusterHealthService {
        ClusterHealthService::new(self.clone())
    }

    pub fn cluster_state(&self) -> ClusterStateService {
        ClusterStateService::new(self.clone())
    }

    pub fn cluster_stats(&self) -> ClusterStatsService {
        ClusterStatsService::new(self.clone())
    }

    /// Wait until the cluster reaches `status` or `timeout` (e.g. `"10s"`) passes
    pub async fn wait_for_status(&self, status: &str, timeout: &str) -> Result<()> {
        let health = self
            .cluster_health()
            .wait_for_status(status)
            .timeout(timeout)
            .do_request()
            .await?;
        if health.timed_out {
            return Err(Error::Timeout(format!(
                "cluster status is {} after waiting {} for {}",
                health.status, timeout, status
            )));
        }
        Ok(())
    }

    pub async fn wait_for_green_status(&self, timeout: &str) -> Result<()> {
        self.wait_for_status("green", timeout).await
    }

    pub async fn wait_for_yellow_status(&self, timeout: &str) -> Result<()> {
        self.wait_for_status("yellow", timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;

    #[test]
    fn test_health_url() {
        let (path, params) = test_client()
            .cluster_health()
            .index("logs")
            .index("metrics")
            .level("indices")
            .wait_for_yellow_status()
            .timeout("5s")
            .build_url()
            .unwrap();
        assert_eq!(path, "/_cluster/health/logs,metrics");
        assert_eq!(params["level"], "indices");
        assert_eq!(params["wait_for_status"], "yellow");
        assert_eq!(params["timeout"], "5s");
    }

    #[test]
    fn test_state_url() {
        let client = test_client();
        let (path, _) = client.cluster_state().build_url().unwrap();
        assert_eq!(path, "/_cluster/state/_all");

        let (path, params) = client
            .cluster_state()
            .metric("metadata")
            .index("twitter")
            .local(true)
            .build_url()
            .unwrap();
        assert_eq!(path, "/_cluster/state/metadata/twitter");
        assert_eq!(params["local"], "true");
    }

    #[test]
    fn test_stats_url() {
        let client = test_client();
        assert_eq!(client.cluster_stats().build_url().unwrap().0, "/_cluster/stats");
        let (path, _) = client.cluster_stats().node_id(["n1", "n2"]).build_url().unwrap();
        assert_eq!(path, "/_cluster/stats/nodes/n1,n2");
    }

    #[test]
    fn test_decode_health() {
        let res: ClusterHealthResponse = serde_json::from_str(
            r#"{
                "cluster_name": "es", "status": "yellow", "timed_out": false,
                "number_of_nodes": 1, "number_of_data_nodes": 1,
                "active_primary_shards": 5, "active_shards": 5,
                "unassigned_shards": 5, "active_shards_percent_as_number": 50.0
            }"#,
        )
        .unwrap();
        assert_eq!(res.status, "yellow");
        assert_eq!(res.unassigned_shards, 5);
        assert!(res.indices.is_empty());
    }
}
