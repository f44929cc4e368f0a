//! `_reindex` and `_delete_by_query`

use crate::client::{Client, PerformRequestOptions};
use crate::dsl::{Query, Script, Sorter};
use crate::error::Result;
use crate::services::ParamsBuilder;
use crate::uritemplates::{expand, join_list, Params};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Where `_reindex` reads from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReindexSource {
    indices: Vec<String>,
    types: Vec<String>,
    query: Option<Value>,
    size: Option<u32>,
    sorts: Vec<Value>,
    source_fields: Vec<String>,
}

impl ReindexSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index<S: Into<String>>(mut self, indices: impl IntoIterator<Item = S>) -> Self {
        self.indices.extend(indices.into_iter().map(Into::into));
        self
    }

    pub fn typ<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn query(mut self, query: impl Query) -> Self {
        self.query = Some(query.source());
        self
    }

    /// Scroll batch size
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn sort_by(mut self, sorter: impl Sorter) -> Self {
        self.sorts.push(sorter.source());
        self
    }

    /// Copy only these `_source` fields
    pub fn source_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.source_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn source(&self) -> Value {
        let mut src = Map::new();
        match self.indices.as_slice() {
            [single] => {
                src.insert("index".into(), json!(single));
            }
            many => {
                src.insert("index".into(), json!(many));
            }
        }
        match self.types.as_slice() {
            [] => {}
            [single] => {
                src.insert("type".into(), json!(single));
            }
            many => {
                src.insert("type".into(), json!(many));
            }
        }
        if let Some(query) = &self.query {
            src.insert("query".into(), query.clone());
        }
        if let Some(size) = self.size {
            src.insert("size".into(), json!(size));
        }
        if !self.sorts.is_empty() {
            src.insert("sort".into(), Value::Array(self.sorts.clone()));
        }
        if !self.source_fields.is_empty() {
            src.insert("_source".into(), json!(self.source_fields));
        }
        Value::Object(src)
    }
}

/// Where `_reindex` writes to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReindexDestination {
    index: String,
    typ: Option<String>,
    op_type: Option<String>,
    version_type: Option<String>,
    routing: Option<String>,
    pipeline: Option<String>,
}

impl ReindexDestination {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..Default::default()
        }
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = Some(typ.into());
        self
    }

    /// `create` only writes missing documents
    pub fn op_type(mut self, op_type: impl Into<String>) -> Self {
        self.op_type = Some(op_type.into());
        self
    }

    /// `internal` or `external`
    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
        self
    }

    /// `keep`, `discard`, or `=value`
    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    pub fn source(&self) -> Value {
        let mut dst = Map::new();
        dst.insert("index".into(), json!(self.index));
        for (key, value) in [
            ("type", &self.typ),
            ("op_type", &self.op_type),
            ("version_type", &self.version_type),
            ("routing", &self.routing),
            ("pipeline", &self.pipeline),
        ] {
            if let Some(value) = value {
                dst.insert(key.into(), json!(value));
            }
        }
        Value::Object(dst)
    }
}

/// Builder for `POST /_reindex`
pub struct ReindexService {
    client: Client,
    source: Option<ReindexSource>,
    destination: Option<ReindexDestination>,
    conflicts: Option<String>,
    size: Option<u64>,
    script: Option<Script>,
    refresh: Option<String>,
    timeout: Option<String>,
    wait_for_active_shards: Option<String>,
    wait_for_completion: Option<bool>,
    requests_per_second: Option<f64>,
    slices: Option<u32>,
    pretty: bool,
}

impl ReindexService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            source: None,
            destination: None,
            conflicts: None,
            size: None,
            script: None,
            refresh: None,
            timeout: None,
            wait_for_active_shards: None,
            wait_for_completion: None,
            requests_per_second: None,
            slices: None,
            pretty: false,
        }
    }

    pub fn source(mut self, source: ReindexSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Shortcut for a source with only an index
    pub fn source_index(self, index: impl Into<String>) -> Self {
        self.source(ReindexSource::new().index([index.into()]))
    }

    pub fn destination(mut self, destination: ReindexDestination) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn destination_index(self, index: impl Into<String>) -> Self {
        self.destination(ReindexDestination::new(index))
    }

    /// `proceed` keeps going on version conflicts, `abort` stops
    pub fn conflicts(mut self, conflicts: impl Into<String>) -> Self {
        self.conflicts = Some(conflicts.into());
        self
    }

    pub fn abort_on_version_conflict(self) -> Self {
        self.conflicts("abort")
    }

    pub fn proceed_on_version_conflict(self) -> Self {
        self.conflicts("proceed")
    }

    /// Maximum number of documents to copy
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    pub fn refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
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

    /// With `false` the response carries only a task id
    pub fn wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = Some(wait);
        self
    }

    pub fn requests_per_second(mut self, rps: f64) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    pub fn slices(mut self, slices: u32) -> Self {
        self.slices = Some(slices);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let no_source = self.source.as_ref().map_or(true, |s| s.indices.is_empty());
        let no_dest = self
            .destination
            .as_ref()
            .map_or(true, |d| d.index.is_empty());
        super::require(&[("Source", no_source), ("Destination", no_dest)])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let params = ParamsBuilder::new()
            .opt("refresh", self.refresh.as_ref())
            .opt("timeout", self.timeout.as_ref())
            .opt("wait_for_active_shards", self.wait_for_active_shards.as_ref())
            .opt("wait_for_completion", self.wait_for_completion)
            .opt("requests_per_second", self.requests_per_second)
            .opt("slices", self.slices)
            .pretty(self.pretty)
            .build();
        Ok(("/_reindex".to_string(), params))
    }

    pub fn body(&self) -> Value {
        let mut body = Map::new();
        if let Some(conflicts) = &self.conflicts {
            body.insert("conflicts".into(), json!(conflicts));
        }
        if let Some(size) = self.size {
            body.insert("size".into(), json!(size));
        }
        if let Some(source) = &self.source {
            body.insert("source".into(), source.source());
        }
        if let Some(dest) = &self.destination {
            body.insert("dest".into(), dest.source());
        }
        if let Some(script) = &self.script {
            body.insert("script".into(), script.source());
        }
        Value::Object(body)
    }

    pub async fn do_request(self) -> Result<BulkIndexByScrollResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        self.client
            .send_json(
                PerformRequestOptions::new(Method::POST, path)
                    .params(params)
                    .body(self.body()),
            )
            .await
    }
}

/// Builder for `POST /{indices}/{types}/_delete_by_query`
pub struct DeleteByQueryService {
    client: Client,
    indices: Vec<String>,
    types: Vec<String>,
    query: Option<Value>,
    q: Option<String>,
    conflicts: Option<String>,
    refresh: Option<String>,
    routing: Option<String>,
    scroll_size: Option<u32>,
    timeout: Option<String>,
    wait_for_completion: Option<bool>,
    requests_per_second: Option<f64>,
    slices: Option<u32>,
    pretty: bool,
}

impl DeleteByQueryService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            types: Vec::new(),
            query: None,
            q: None,
            conflicts: None,
            refresh: None,
            routing: None,
            scroll_size: None,
            timeout: None,
            wait_for_completion: None,
            requests_per_second: None,
            slices: None,
            pretty: false,
        }
    }

    pub fn index<S: Into<String>>(mut self, indices: impl IntoIterator<Item = S>) -> Self {
        self.indices.extend(indices.into_iter().map(Into::into));
        self
    }

    pub fn typ<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn query(mut self, query: impl Query) -> Self {
        self.query = Some(query.source());
        self
    }

    /// Lucene query string instead of a body query
    pub fn q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn conflicts(mut self, conflicts: impl Into<String>) -> Self {
        self.conflicts = Some(conflicts.into());
        self
    }

    pub fn proceed_on_version_conflict(self) -> Self {
        self.conflicts("proceed")
    }

    pub fn refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn scroll_size(mut self, size: u32) -> Self {
        self.scroll_size = Some(size);
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = Some(wait);
        self
    }

    pub fn requests_per_second(mut self, rps: f64) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    pub fn slices(mut self, slices: u32) -> Self {
        self.slices = Some(slices);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        super::require(&[
            ("Index", self.indices.is_empty()),
            ("Query", self.query.is_none() && self.q.is_none()),
        ])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.types.is_empty() {
            expand(
                "/{index}/_delete_by_query",
                &[("index", &join_list(&self.indices))],
            )?
        } else {
            expand(
                "/{index}/{type}/_delete_by_query",
                &[
                    ("index", &join_list(&self.indices)),
                    ("type", &join_list(&self.types)),
                ],
            )?
        };
        let params = ParamsBuilder::new()
            .opt("q", self.q.as_ref())
            .opt("conflicts", self.conflicts.as_ref())
            .opt("refresh", self.refresh.as_ref())
            .opt("routing", self.routing.as_ref())
            .opt("scroll_size", self.scroll_size)
            .opt("timeout", self.timeout.as_ref())
            .opt("wait_for_completion", self.wait_for_completion)
            .opt("requests_per_second", self.requests_per_second)
            .opt("slices", self.slices)
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub fn body(&self) -> Option<Value> {
        self.query.as_ref().map(|query| json!({ "query": query }))
    }

    pub async fn do_request(self) -> Result<BulkIndexByScrollResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let mut opts = PerformRequestOptions::new(Method::POST, path).params(params);
        if let Some(body) = self.body() {
            opts = opts.body(body);
        }
        self.client.send_json(opts).await
    }
}

/// Outcome of `_reindex`, `_delete_by_query` and `_update_by_query`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkIndexByScrollResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub batches: u64,
    #[serde(default)]
    pub version_conflicts: u64,
    #[serde(default)]
    pub noops: u64,
    #[serde(default)]
    pub retries: ScrollRetries,
    #[serde(default)]
    pub throttled_millis: u64,
    #[serde(default)]
    pub requests_per_second: f64,
    #[serde(default)]
    pub throttled_until_millis: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Value>,
    /// Set instead of the counters when `wait_for_completion=false`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollRetries {
    #[serde(default)]
    pub bulk: u64,
    #[serde(default)]
    pub search: u64,
}

impl Client {
    pub fn reindex(&self) -> ReindexService {
        ReindexService::new(self.clone())
    }

    pub fn delete_by_query<S: Into<String>>(
        &self,
        indices: impl IntoIterator<Item = S>,
    ) -> DeleteByQueryService {
        DeleteByQueryService::new(self.clone()).index(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use crate::dsl::{SortInfo, TermQuery};

    #[test]
    fn test_reindex_body() {
        let svc = test_client()
            .reindex()
            .source(
                ReindexSource::new()
                    .index(["twitter"])
                    .typ(["tweet"])
                    .query(TermQuery::new("user", "olivere"))
                    .size(100)
                    .sort_by(SortInfo::new("date").desc()),
            )
            .destination(
                ReindexDestination::new("new_twitter")
                    .op_type("create")
                    .version_type("external"),
            )
            .proceed_on_version_conflict()
            .size(10_000);
        assert_eq!(
            svc.body(),
            json!({
                "conflicts": "proceed",
                "size": 10000,
                "source": {
                    "index": "twitter",
                    "type": "tweet",
                    "query": {"term": {"user": "olivere"}},
                    "size": 100,
                    "sort": [{"date": {"order": "desc"}}]
                },
                "dest": {"index": "new_twitter", "op_type": "create", "version_type": "external"}
            })
        );
    }

    #[test]
    fn test_reindex_validate_and_params() {
        let err = test_client().reindex().validate().unwrap_err();
        assert!(err.to_string().contains("[Source, Destination]"));

        let svc = test_client()
            .reindex()
            .source_index("a")
            .destination_index("b")
            .wait_for_completion(false)
            .slices(4);
        assert!(svc.validate().is_ok());
        let (path, params) = svc.build_url().unwrap();
        assert_eq!(path, "/_reindex");
        assert_eq!(params["wait_for_completion"], "false");
        assert_eq!(params["slices"], "4");
    }

    #[test]
    fn test_delete_by_query() {
        let svc = test_client()
            .delete_by_query(["twitter", "logs"])
            .query(TermQuery::new("user", "olivere"))
            .proceed_on_version_conflict();
        let (path, params) = svc.build_url().unwrap();
        assert_eq!(path, "/twitter,logs/_delete_by_query");
        assert_eq!(params["conflicts"], "proceed");
        assert_eq!(
            svc.body(),
            Some(json!({"query": {"term": {"user": "olivere"}}}))
        );
        let err = test_client()
            .delete_by_query(["twitter"])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("[Query]"));
    }

    #[test]
    fn test_decode_response() {
        let raw = json!({
            "took": 147, "timed_out": false, "total": 120, "deleted": 120,
            "batches": 1, "version_conflicts": 0, "noops": 0,
            "retries": {"bulk": 0, "search": 0},
            "throttled_millis": 0, "requests_per_second": -1.0,
            "throttled_until_millis": 0, "failures": []
        });
        let res: BulkIndexByScrollResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(res.deleted, 120);
        assert_eq!(res.requests_per_second, -1.0);
        let task: BulkIndexByScrollResponse =
            serde_json::from_value(json!({"task": "r1A2WoRbTwKZ516z6NEs5A:36619"})).unwrap();
        assert_eq!(task.task.as_deref(), Some("r1A2WoRbTwKZ516z6NEs5A:36619"));
    }
}
