//! Bulk API
//!
//! Requests are serialized as newline-delimited JSON: one action line per
//! request, followed by a source line for index, create and update.
//!
//! ```text
//! {"index":{"_index":"twitter","_type":"tweet","_id":"1"}}
//! {"user":"olivere","message":"Welcome"}
//! {"delete":{"_index":"twitter","_type":"tweet","_id":"2"}}
//! ```

use crate::client::{Client, PerformRequestOptions};
use crate::dsl::Script;
use crate::error::{ErrorDetails, Result};
use crate::services::{require, ParamsBuilder, ShardsInfo};
use crate::uritemplates::{expand, Params};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Action-line metadata shared by all bulk request kinds
#[derive(Debug, Clone, Default, PartialEq)]
struct BulkMeta {
    index: Option<String>,
    typ: Option<String>,
    id: Option<String>,
    routing: Option<String>,
    parent: Option<String>,
    version: Option<i64>,
    version_type: Option<String>,
}

impl BulkMeta {
    fn to_map(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        let pairs = [
            ("_index", &self.index),
            ("_type", &self.typ),
            ("_id", &self.id),
            ("_routing", &self.routing),
            ("_parent", &self.parent),
            ("_version_type", &self.version_type),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                meta.insert(key.to_string(), json!(value));
            }
        }
        if let Some(version) = self.version {
            meta.insert("_version".to_string(), json!(version));
        }
        meta
    }
}

macro_rules! bulk_meta_setters {
    () => {
        pub fn index(mut self, index: impl Into<String>) -> Self {
            self.meta.index = Some(index.into());
            self
        }

        pub fn typ(mut self, typ: impl Into<String>) -> Self {
            self.meta.typ = Some(typ.into());
            self
        }

        pub fn id(mut self, id: impl Into<String>) -> Self {
            self.meta.id = Some(id.into());
            self
        }

        pub fn routing(mut self, routing: impl Into<String>) -> Self {
            self.meta.routing = Some(routing.into());
            self
        }

        pub fn parent(mut self, parent: impl Into<String>) -> Self {
            self.meta.parent = Some(parent.into());
            self
        }

        pub fn version(mut self, version: i64) -> Self {
            self.meta.version = Some(version);
            self
        }

        pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
            self.meta.version_type = Some(version_type.into());
            self
        }
    };
}

/// Index or create a document
#[derive(Debug, Clone, PartialEq)]
pub struct BulkIndexRequest {
    op_type: &'static str,
    meta: BulkMeta,
    pipeline: Option<String>,
    doc: Value,
}

impl BulkIndexRequest {
    pub fn new(doc: Value) -> Self {
        Self {
            op_type: "index",
            meta: BulkMeta::default(),
            pipeline: None,
            doc,
        }
    }

    /// Fail if the document already exists
    pub fn create(doc: Value) -> Self {
        Self {
            op_type: "create",
            ..Self::new(doc)
        }
    }

    bulk_meta_setters!();

    pub fn pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    fn source(&self) -> Result<Vec<String>> {
        let mut meta = self.meta.to_map();
        if let Some(pipeline) = &self.pipeline {
            meta.insert("pipeline".to_string(), json!(pipeline));
        }
        let mut action = Map::new();
        action.insert(self.op_type.to_string(), Value::Object(meta));
        Ok(vec![
            serde_json::to_string(&action)?,
            serde_json::to_string(&self.doc)?,
        ])
    }
}

/// Partially update a document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkUpdateRequest {
    meta: BulkMeta,
    retry_on_conflict: Option<u32>,
    doc: Option<Value>,
    doc_as_upsert: Option<bool>,
    script: Option<Script>,
    scripted_upsert: Option<bool>,
    upsert: Option<Value>,
    detect_noop: Option<bool>,
}

impl BulkUpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    bulk_meta_setters!();

    pub fn retry_on_conflict(mut self, retries: u32) -> Self {
        self.retry_on_conflict = Some(retries);
        self
    }

    pub fn doc(mut self, doc: Value) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn doc_as_upsert(mut self, enabled: bool) -> Self {
        self.doc_as_upsert = Some(enabled);
        self
    }

    pub fn script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    pub fn scripted_upsert(mut self, enabled: bool) -> Self {
        self.scripted_upsert = Some(enabled);
        self
    }

    pub fn upsert(mut self, doc: Value) -> Self {
        self.upsert = Some(doc);
        self
    }

    pub fn detect_noop(mut self, enabled: bool) -> Self {
        self.detect_noop = Some(enabled);
        self
    }

    fn source(&self) -> Result<Vec<String>> {
        let mut meta = self.meta.to_map();
        if let Some(retries) = self.retry_on_conflict {
            meta.insert("_retry_on_conflict".to_string(), json!(retries));
        }

        let mut body = Map::new();
        if let Some(doc) = &self.doc {
            body.insert("doc".into(), doc.clone());
        }
        if let Some(enabled) = self.doc_as_upsert {
            body.insert("doc_as_upsert".into(), json!(enabled));
        }
        if let Some(script) = &self.script {
            body.insert("script".into(), script.source());
        }
        if let Some(enabled) = self.scripted_upsert {
            body.insert("scripted_upsert".into(), json!(enabled));
        }
        if let Some(upsert) = &self.upsert {
            body.insert("upsert".into(), upsert.clone());
        }
        if let Some(enabled) = self.detect_noop {
            body.insert("detect_noop".into(), json!(enabled));
        }

        Ok(vec![
            serde_json::to_string(&json!({ "update": meta }))?,
            serde_json::to_string(&body)?,
        ])
    }
}

/// Delete a document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkDeleteRequest {
    meta: BulkMeta,
}

impl BulkDeleteRequest {
    pub fn new() -> Self {
        Self::default()
    }

    bulk_meta_setters!();

    fn source(&self) -> Result<Vec<String>> {
        Ok(vec![serde_json::to_string(
            &json!({ "delete": self.meta.to_map() }),
        )?])
    }
}

/// Any request that can be part of a bulk call
#[derive(Debug, Clone, PartialEq)]
pub enum BulkableRequest {
    Index(BulkIndexRequest),
    Update(BulkUpdateRequest),
    Delete(BulkDeleteRequest),
}

impl BulkableRequest {
    /// NDJSON lines without trailing newlines
    pub fn source(&self) -> Result<Vec<String>> {
        match self {
            BulkableRequest::Index(r) => r.source(),
            BulkableRequest::Update(r) => r.source(),
            BulkableRequest::Delete(r) => r.source(),
        }
    }

    /// Bytes this request adds to the bulk body, newlines included
    pub fn estimated_size_in_bytes(&self) -> Result<u64> {
        Ok(self
            .source()?
            .iter()
            .map(|line| line.len() as u64 + 1)
            .sum())
    }
}

impl From<BulkIndexRequest> for BulkableRequest {
    fn from(r: BulkIndexRequest) -> Self {
        BulkableRequest::Index(r)
    }
}

impl From<BulkUpdateRequest> for BulkableRequest {
    fn from(r: BulkUpdateRequest) -> Self {
        BulkableRequest::Update(r)
    }
}

impl From<BulkDeleteRequest> for BulkableRequest {
    fn from(r: BulkDeleteRequest) -> Self {
        BulkableRequest::Delete(r)
    }
}

/// Outcome of one bulk item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkResponseItem {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub typ: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: i64,
    #[serde(default)]
    pub result: String,
    #[serde(rename = "_shards", default)]
    pub shards: ShardsInfo,
    #[serde(rename = "_seq_no", default)]
    pub seq_no: i64,
    #[serde(rename = "_primary_term", default)]
    pub primary_term: i64,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub forced_refresh: bool,
    #[serde(default)]
    pub found: bool,
    pub error: Option<ErrorDetails>,
}

impl BulkResponseItem {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response of `POST /_bulk`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    /// One map per request, keyed by action (`index`, `create`, ...)
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkResponseItem>>,
}

impl BulkResponse {
    pub fn by_action(&self, action: &str) -> Vec<&BulkResponseItem> {
        self.items.iter().filter_map(|item| item.get(action)).collect()
    }

    pub fn indexed(&self) -> Vec<&BulkResponseItem> {
        self.by_action("index")
    }

    pub fn created(&self) -> Vec<&BulkResponseItem> {
        self.by_action("create")
    }

    pub fn updated(&self) -> Vec<&BulkResponseItem> {
        self.by_action("update")
    }

    pub fn deleted(&self) -> Vec<&BulkResponseItem> {
        self.by_action("delete")
    }

    pub fn failed(&self) -> Vec<&BulkResponseItem> {
        self.all_items().filter(|item| !item.is_success()).collect()
    }

    pub fn succeeded(&self) -> Vec<&BulkResponseItem> {
        self.all_items().filter(|item| item.is_success()).collect()
    }

    pub fn by_id(&self, id: &str) -> Vec<&BulkResponseItem> {
        self.all_items().filter(|item| item.id == id).collect()
    }

    fn all_items(&self) -> impl Iterator<Item = &BulkResponseItem> {
        self.items.iter().flat_map(|item| item.values())
    }
}

/// Builder for `POST /{index}/{type}/_bulk`
pub struct BulkService {
    client: Client,
    index: Option<String>,
    typ: Option<String>,
    requests: Vec<BulkableRequest>,
    size_in_bytes: u64,
    refresh: Option<String>,
    routing: Option<String>,
    pipeline: Option<String>,
    timeout: Option<String>,
    wait_for_active_shards: Option<String>,
    pretty: bool,
}

impl BulkService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            index: None,
            typ: None,
            requests: Vec::new(),
            size_in_bytes: 0,
            refresh: None,
            routing: None,
            pipeline: None,
            timeout: None,
            wait_for_active_shards: None,
            pretty: false,
        }
    }

    /// Default index for requests without one
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Default type for requests without one
    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = Some(typ.into());
        self
    }

    pub fn add(mut self, request: impl Into<BulkableRequest>) -> Result<Self> {
        self.push(request.into())?;
        Ok(self)
    }

    pub(crate) fn push(&mut self, request: BulkableRequest) -> Result<()> {
        self.size_in_bytes += request.estimated_size_in_bytes()?;
        self.requests.push(request);
        Ok(())
    }

    pub fn refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
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

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn number_of_actions(&self) -> usize {
        self.requests.len()
    }

    pub fn estimated_size_in_bytes(&self) -> u64 {
        self.size_in_bytes
    }

    pub fn requests(&self) -> &[BulkableRequest] {
        &self.requests
    }

    /// Drop all queued requests
    pub fn reset(&mut self) {
        self.requests.clear();
        self.size_in_bytes = 0;
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("Actions", self.requests.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = match (&self.index, &self.typ) {
            (Some(index), Some(typ)) => expand(
                "/{index}/{type}/_bulk",
                &[("index", index), ("type", typ)],
            )?,
            (Some(index), None) => expand("/{index}/_bulk", &[("index", index)])?,
            _ => "/_bulk".to_string(),
        };
        let params = ParamsBuilder::new()
            .opt("refresh", self.refresh.as_ref())
            .opt("routing", self.routing.as_ref())
            .opt("pipeline", self.pipeline.as_ref())
            .opt("timeout", self.timeout.as_ref())
            .opt("wait_for_active_shards", self.wait_for_active_shards.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    /// The NDJSON request body, ending with a newline
    pub fn body_as_string(&self) -> Result<String> {
        let mut body = String::with_capacity(self.size_in_bytes as usize);
        for request in &self.requests {
            for line in request.source()? {
                body.push_str(&line);
                body.push('\n');
            }
        }
        Ok(body)
    }

    /// Send the queued requests; the queue is cleared on success only
    pub async fn do_request(&mut self) -> Result<BulkResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let body = self.body_as_string()?;
        let res: BulkResponse = self
            .client
            .send_json(
                PerformRequestOptions::new(Method::POST, path)
                    .params(params)
                    .body(body)
                    .content_type(NDJSON_CONTENT_TYPE),
            )
            .await?;
        self.reset();
        Ok(res)
    }
}

impl Client {
    pub fn bulk(&self) -> BulkService {
        BulkService::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;

    fn lines(body: &str) -> Vec<Value> {
        body.lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_index_request_source() {
        let req = BulkIndexRequest::new(json!({"user": "olivere"}))
            .index("twitter")
            .typ("tweet")
            .id("1")
            .routing("r1");
        let source = req.source().unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(
            serde_json::from_str::<Value>(&source[0]).unwrap(),
            json!({"index": {"_index": "twitter", "_type": "tweet", "_id": "1", "_routing": "r1"}})
        );
        assert_eq!(source[1], r#"{"user":"olivere"}"#);
    }

    #[test]
    fn test_create_update_delete_sources() {
        let create = BulkIndexRequest::create(json!({"a": 1})).index("i").id("1");
        assert!(create.source().unwrap()[0].starts_with(r#"{"create":"#));

        let update = BulkUpdateRequest::new()
            .index("i")
            .id("2")
            .retry_on_conflict(3)
            .doc(json!({"counter": 42}))
            .doc_as_upsert(true);
        let source = update.source().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&source[0]).unwrap(),
            json!({"update": {"_index": "i", "_id": "2", "_retry_on_conflict": 3}})
        );
        assert_eq!(
            serde_json::from_str::<Value>(&source[1]).unwrap(),
            json!({"doc": {"counter": 42}, "doc_as_upsert": true})
        );

        let delete = BulkDeleteRequest::new().index("i").typ("t").id("3");
        assert_eq!(delete.source().unwrap().len(), 1);
    }

    #[test]
    fn test_bulk_body_and_size() {
        let svc = test_client()
            .bulk()
            .index("twitter")
            .typ("tweet")
            .add(BulkIndexRequest::new(json!({"user": "olivere"})).id("1"))
            .unwrap()
            .add(BulkDeleteRequest::new().id("2"))
            .unwrap()
            .add(BulkUpdateRequest::new().id("3").doc(json!({"retweets": 1})))
            .unwrap();

        assert_eq!(svc.number_of_actions(), 3);
        let body = svc.body_as_string().unwrap();
        assert!(body.ends_with('\n'));
        assert_eq!(body.len() as u64, svc.estimated_size_in_bytes());
        let parsed = lines(&body);
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[2], json!({"delete": {"_id": "2"}}));

        let (path, _) = svc.build_url().unwrap();
        assert_eq!(path, "/twitter/tweet/_bulk");
    }

    #[test]
    fn test_bulk_reset_and_validate() {
        let mut svc = test_client()
            .bulk()
            .add(BulkDeleteRequest::new().index("i").id("1"))
            .unwrap();
        assert!(svc.validate().is_ok());
        assert_eq!(svc.build_url().unwrap().0, "/_bulk");
        svc.reset();
        assert_eq!(svc.number_of_actions(), 0);
        assert_eq!(svc.estimated_size_in_bytes(), 0);
        assert!(svc.validate().is_err());
    }

    #[test]
    fn test_bulk_response_summaries() {
        let res: BulkResponse = serde_json::from_value(json!({
            "took": 30,
            "errors": true,
            "items": [
                {"index": {"_index": "t", "_type": "x", "_id": "1", "result": "created", "status": 201}},
                {"create": {"_index": "t", "_type": "x", "_id": "2", "status": 409,
                    "error": {"type": "version_conflict_engine_exception", "reason": "exists"}}},
                {"update": {"_index": "t", "_type": "x", "_id": "3", "result": "updated", "status": 200}},
                {"delete": {"_index": "t", "_type": "x", "_id": "1", "result": "deleted", "status": 200}}
            ]
        }))
        .unwrap();
        assert!(res.errors);
        assert_eq!(res.indexed().len(), 1);
        assert_eq!(res.created().len(), 1);
        assert_eq!(res.updated().len(), 1);
        assert_eq!(res.deleted().len(), 1);
        assert_eq!(res.succeeded().len(), 3);
        let failed = res.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(
            failed[0].error.as_ref().map(|e| e.error_type.as_str()),
            Some("version_conflict_engine_exception")
        );
        assert_eq!(res.by_id("1").len(), 2);
    }
}
