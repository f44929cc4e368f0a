//! Nodes info API

use crate::client::{Client, PerformRequestOptions};
use crate::error::Result;
use crate::services::ParamsBuilder;
use crate::uritemplates::{expand, join_list, Params};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Response of `GET /_nodes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesInfoResponse {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub nodes: HashMap<String, NodesInfoNode>,
}

/// One node as reported by the nodes info API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesInfoNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub transport_address: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build_hash: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub settings: Option<Value>,
    pub os: Option<Value>,
    pub process: Option<Value>,
    pub jvm: Option<Value>,
    pub thread_pool: Option<Value>,
    pub transport: Option<Value>,
    pub http: Option<NodesInfoNodeHttp>,
    #[serde(default)]
    pub plugins: Vec<NodesInfoNodePlugin>,
    #[serde(default)]
    pub modules: Vec<NodesInfoNodePlugin>,
    pub ingest: Option<Value>,
}

impl NodesInfoNode {
    pub fn is_master(&self) -> bool {
        self.has_role("master")
    }

    pub fn is_data(&self) -> bool {
        self.has_role("data")
    }

    pub fn is_ingest(&self) -> bool {
        self.has_role("ingest")
    }

    fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesInfoNodeHttp {
    #[serde(default)]
    pub bound_address: Vec<String>,
    #[serde(default)]
    pub publish_address: String,
    #[serde(default)]
    pub max_content_length_in_bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesInfoNodePlugin {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub classname: String,
    #[serde(default)]
    pub has_native_controller: bool,
}

/// Builder for `GET /_nodes/{node_id}/{metric}`
pub struct NodesInfoService {
    client: Client,
    node_id: Vec<String>,
    metric: Vec<String>,
    flat_settings: Option<bool>,
    human: Option<bool>,
    pretty: bool,
}

impl NodesInfoService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            node_id: vec!["_all".to_string()],
            metric: vec!["_all".to_string()],
            flat_settings: None,
            human: None,
            pretty: false,
        }
    }

    /// Restrict to these nodes, e.g. `_local` or node ids
    pub fn node_id<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.node_id = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to these sections, e.g. `http`, `plugins`, `jvm`
    pub fn metric<S: Into<String>>(mut self, metrics: impl IntoIterator<Item = S>) -> Self {
        self.metric = metrics.into_iter().map(Into::into).collect();
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
        let node_id = if self.node_id.is_empty() {
            "_all".to_string()
        } else {
            join_list(&self.node_id)
        };
        let metric = if self.metric.is_empty() {
            "_all".to_string()
        } else {
            join_list(&self.metric)
        };
        let path = expand(
            "/_nodes/{node_id}/{metric}",
            &[("node_id", &node_id), ("metric", &metric)],
        )?;
        let params = ParamsBuilder::new()
            .opt("flat_settings", self.flat_settings)
            .opt("human", self.human)
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<NodesInfoResponse> {
        let (path, params) = self.build_url()?;
        self.client
            .send_json(PerformRequestOptions::new(Method::GET, path).params(params))
            .await
    }
}

impl Client {
    pub fn nodes_info(&self) -> NodesInfoService {
        NodesInfoService::new(self.clone())
    }

    /// Whether any node in the cluster has the plugin installed
    pub async fn has_plugin(&self, name: &str) -> Result<bool> {
        let info = self.nodes_info().metric(["plugins"]).do_request().await?;
        Ok(info
            .nodes
            .values()
            .any(|node| node.plugins.iter().any(|p| p.name == name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;

    #[test]
    fn test_build_url_defaults() {
        let (path, params) = test_client().nodes_info().build_url().unwrap();
        assert_eq!(path, "/_nodes/_all/_all");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_url_filtered() {
        let (path, params) = test_client()
            .nodes_info()
            .node_id(["_local"])
            .metric(["http", "plugins"])
            .flat_settings(true)
            .build_url()
            .unwrap();
        assert_eq!(path, "/_nodes/_local/http,plugins");
        assert_eq!(params["flat_settings"], "true");
    }

    #[test]
    fn test_decode_nodes_info() {
        let res: NodesInfoResponse = serde_json::from_str(
            r#"{
                "cluster_name": "elasticsearch",
                "nodes": {
                    "aBcD": {
                        "name": "node-1",
                        "transport_address": "127.0.0.1:9300",
                        "host": "127.0.0.1",
                        "ip": "127.0.0.1",
                        "version": "5.6.3",
                        "roles": ["master", "data", "ingest"],
                        "http": {
                            "bound_address": ["127.0.0.1:9200"],
                            "publish_address": "127.0.0.1:9200",
                            "max_content_length_in_bytes": 104857600
                        },
                        "plugins": [{"name": "analysis-icu", "version": "5.6.3"}]
                    }
                }
            }"#,
        )
        .unwrap();
        let node = &res.nodes["aBcD"];
        assert!(node.is_master() && node.is_data() && node.is_ingest());
        assert_eq!(
            node.http.as_ref().map(|h| h.publish_address.as_str()),
            Some("127.0.0.1:9200")
        );
        assert_eq!(node.plugins[0].name, "analysis-icu");
    }
}
