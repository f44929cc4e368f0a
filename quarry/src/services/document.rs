//! Single-document APIs: index, get, exists, delete, update and mget

use crate::client::{Client, PerformRequestOptions};
use crate::dsl::{FetchSourceContext, Script};
use crate::error::{ApiError, Error, Result};
use crate::response::Response;
use crate::services::{require, ParamsBuilder, ShardsInfo};
use crate::uritemplates::{expand, Params};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Result of index, delete and update calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentResponse {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub typ: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: i64,
    /// `created`, `updated`, `deleted`, `noop` or `not_found`
    #[serde(default)]
    pub result: String,
    #[serde(rename = "_shards", default)]
    pub shards: ShardsInfo,
    #[serde(rename = "_seq_no", default)]
    pub seq_no: i64,
    #[serde(rename = "_primary_term", default)]
    pub primary_term: i64,
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub forced_refresh: bool,
    /// Populated by update requests with `fields` or `_source`
    pub get: Option<GetResult>,
}

/// A fetched document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetResult {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub typ: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_routing")]
    pub routing: Option<String>,
    #[serde(rename = "_parent")]
    pub parent: Option<String>,
    #[serde(rename = "_version")]
    pub version: Option<i64>,
    #[serde(rename = "_source")]
    pub source: Option<Value>,
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    /// Set on failed mget items
    pub error: Option<Value>,
}

impl GetResult {
    /// Decode `_source` into `T`; `None` when the document has no source
    pub fn source_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.source {
            Some(source) => Ok(Some(serde_json::from_value(source.clone())?)),
            None => Ok(None),
        }
    }
}

/// A 404 carrying an `error` object is a missing index, not a missing document
fn reject_missing_index(res: &Response) -> Result<()> {
    if res.status_code != 404 {
        return Ok(());
    }
    let body: Value = serde_json::from_slice(&res.body).unwrap_or(Value::Null);
    if body.get("error").is_some() {
        return Err(Error::Api(ApiError::from_body(404, &res.body)));
    }
    Ok(())
}

/// Builder for `PUT /{index}/{type}/{id}` or `POST /{index}/{type}`
pub struct IndexService {
    client: Client,
    index: String,
    typ: String,
    id: Option<String>,
    body: Option<Value>,
    op_type: Option<String>,
    routing: Option<String>,
    parent: Option<String>,
    version: Option<i64>,
    version_type: Option<String>,
    refresh: Option<String>,
    timeout: Option<String>,
    pipeline: Option<String>,
    wait_for_active_shards: Option<String>,
    pretty: bool,
}

impl IndexService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            index: String::new(),
            typ: String::new(),
            id: None,
            body: None,
            op_type: None,
            routing: None,
            parent: None,
            version: None,
            version_type: None,
            refresh: None,
            timeout: None,
            pipeline: None,
            wait_for_active_shards: None,
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = typ.into();
        self
    }

    /// Document id; without one the server generates it
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn body_json<T: Serialize>(mut self, doc: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(doc)?);
        Ok(self)
    }

    pub fn body(mut self, doc: Value) -> Self {
        self.body = Some(doc);
        self
    }

    /// `index` or `create`
    pub fn op_type(mut self, op_type: impl Into<String>) -> Self {
        self.op_type = Some(op_type.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
        self
    }

    /// `true`, `false` or `wait_for`
    pub fn refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
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

    pub fn validate(&self) -> Result<()> {
        require(&[
            ("Index", self.index.is_empty()),
            ("Type", self.typ.is_empty()),
            ("BodyJson", self.body.is_none()),
        ])
    }

    /// Returns the method too: PUT with an id, POST without
    pub fn build_url(&self) -> Result<(Method, String, Params)> {
        let (method, path) = match &self.id {
            Some(id) => (
                Method::PUT,
                expand(
                    "/{index}/{type}/{id}",
                    &[("index", &self.index), ("type", &self.typ), ("id", id)],
                )?,
            ),
            None => (
                Method::POST,
                expand(
                    "/{index}/{type}",
                    &[("index", &self.index), ("type", &self.typ)],
                )?,
            ),
        };
        let params = ParamsBuilder::new()
            .opt("op_type", self.op_type.as_ref())
            .opt("routing", self.routing.as_ref())
            .opt("parent", self.parent.as_ref())
            .opt("version", self.version)
            .opt("version_type", self.version_type.as_ref())
            .opt("refresh", self.refresh.as_ref())
            .opt("timeout", self.timeout.as_ref())
            .opt("pipeline", self.pipeline.as_ref())
            .opt("wait_for_active_shards", self.wait_for_active_shards.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((method, path, params))
    }

    pub async fn do_request(self) -> Result<DocumentResponse> {
        self.validate()?;
        let (method, path, params) = self.build_url()?;
        let mut opts = PerformRequestOptions::new(method, path).params(params);
        if let Some(body) = self.body {
            opts = opts.body(body);
        }
        self.client.send_json(opts).await
    }
}

/// Builder for `GET /{index}/{type}/{id}`
pub struct GetService {
    client: Client,
    index: String,
    typ: String,
    id: String,
    routing: Option<String>,
    parent: Option<String>,
    preference: Option<String>,
    stored_fields: Vec<String>,
    refresh: Option<bool>,
    realtime: Option<bool>,
    version: Option<i64>,
    version_type: Option<String>,
    fetch_source: Option<FetchSourceContext>,
    pretty: bool,
}

impl GetService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            index: String::new(),
            typ: "_all".to_string(),
            id: String::new(),
            routing: None,
            parent: None,
            preference: None,
            stored_fields: Vec::new(),
            refresh: None,
            realtime: None,
            version: None,
            version_type: None,
            fetch_source: None,
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = typ.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn stored_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.stored_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
        self
    }

    pub fn fetch_source_context(mut self, ctx: FetchSourceContext) -> Self {
        self.fetch_source = Some(ctx);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[
            ("Index", self.index.is_empty()),
            ("Type", self.typ.is_empty()),
            ("Id", self.id.is_empty()),
        ])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand(
            "/{index}/{type}/{id}",
            &[("index", &self.index), ("type", &self.typ), ("id", &self.id)],
        )?;
        let mut params = ParamsBuilder::new()
            .opt("routing", self.routing.as_ref())
            .opt("parent", self.parent.as_ref())
            .opt("preference", self.preference.as_ref())
            .list("stored_fields", &self.stored_fields)
            .opt("refresh", self.refresh)
            .opt("realtime", self.realtime)
            .opt("version", self.version)
            .opt("version_type", self.version_type.as_ref())
            .pretty(self.pretty);
        if let Some(ctx) = &self.fetch_source {
            for (key, value) in ctx.query_params() {
                params = params.opt(key, Some(value));
            }
        }
        Ok((path, params.build()))
    }

    /// A missing document is `found == false`, not an error
    pub async fn do_request(self) -> Result<GetResult> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let res = self
            .client
            .perform_request(
                PerformRequestOptions::new(Method::GET, path)
                    .params(params)
                    .ignore_errors(&[404]),
            )
            .await?;
        reject_missing_index(&res)?;
        res.json()
    }
}

/// Builder for `HEAD /{index}/{type}/{id}`
pub struct ExistsService {
    client: Client,
    index: String,
    typ: String,
    id: String,
    routing: Option<String>,
    parent: Option<String>,
    preference: Option<String>,
    realtime: Option<bool>,
    refresh: Option<bool>,
}

impl ExistsService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            index: String::new(),
            typ: "_all".to_string(),
            id: String::new(),
            routing: None,
            parent: None,
            preference: None,
            realtime: None,
            refresh: None,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = typ.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[
            ("Index", self.index.is_empty()),
            ("Type", self.typ.is_empty()),
            ("Id", self.id.is_empty()),
        ])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand(
            "/{index}/{type}/{id}",
            &[("index", &self.index), ("type", &self.typ), ("id", &self.id)],
        )?;
        let params = ParamsBuilder::new()
            .opt("routing", self.routing.as_ref())
            .opt("parent", self.parent.as_ref())
            .opt("preference", self.preference.as_ref())
            .opt("realtime", self.realtime)
            .opt("refresh", self.refresh)
            .build();
        Ok((path, params))
    }

    pub async fn do_request(self) -> Result<bool> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let res = self
            .client
            .perform_request(
                PerformRequestOptions::new(Method::HEAD, path)
                    .params(params)
                    .ignore_errors(&[404]),
            )
            .await?;
        Ok(res.status_code == 200)
    }
}

/// Builder for `DELETE /{index}/{type}/{id}`
pub struct DeleteService {
    client: Client,
    index: String,
    typ: String,
    id: String,
    routing: Option<String>,
    parent: Option<String>,
    version: Option<i64>,
    version_type: Option<String>,
    refresh: Option<String>,
    timeout: Option<String>,
    wait_for_active_shards: Option<String>,
    pretty: bool,
}

impl DeleteService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            index: String::new(),
            typ: String::new(),
            id: String::new(),
            routing: None,
            parent: None,
            version: None,
            version_type: None,
            refresh: None,
            timeout: None,
            wait_for_active_shards: None,
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = typ.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
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

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[
            ("Index", self.index.is_empty()),
            ("Type", self.typ.is_empty()),
            ("Id", self.id.is_empty()),
        ])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand(
            "/{index}/{type}/{id}",
            &[("index", &self.index), ("type", &self.typ), ("id", &self.id)],
        )?;
        let params = ParamsBuilder::new()
            .opt("routing", self.routing.as_ref())
            .opt("parent", self.parent.as_ref())
            .opt("version", self.version)
            .opt("version_type", self.version_type.as_ref())
            .opt("refresh", self.refresh.as_ref())
            .opt("timeout", self.timeout.as_ref())
            .opt("wait_for_active_shards", self.wait_for_active_shards.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    /// Deleting a missing document yields `result == "not_found"`
    pub async fn do_request(self) -> Result<DocumentResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let res = self
            .client
            .perform_request(
                PerformRequestOptions::new(Method::DELETE, path)
                    .params(params)
                    .ignore_errors(&[404]),
            )
            .await?;
        reject_missing_index(&res)?;
        res.json()
    }
}

/// Builder for `POST /{index}/{type}/{id}/_update`
pub struct UpdateService {
    client: Client,
    index: String,
    typ: String,
    id: String,
    doc: Option<Value>,
    doc_as_upsert: Option<bool>,
    script: Option<Script>,
    scripted_upsert: Option<bool>,
    upsert: Option<Value>,
    detect_noop: Option<bool>,
    fetch_source: Option<FetchSourceContext>,
    retry_on_conflict: Option<u32>,
    fields: Vec<String>,
    routing: Option<String>,
    parent: Option<String>,
    version: Option<i64>,
    version_type: Option<String>,
    refresh: Option<String>,
    timeout: Option<String>,
    wait_for_active_shards: Option<String>,
    pretty: bool,
}

impl UpdateService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            index: String::new(),
            typ: String::new(),
            id: String::new(),
            doc: None,
            doc_as_upsert: None,
            script: None,
            scripted_upsert: None,
            upsert: None,
            detect_noop: None,
            fetch_source: None,
            retry_on_conflict: None,
            fields: Vec::new(),
            routing: None,
            parent: None,
            version: None,
            version_type: None,
            refresh: None,
            timeout: None,
            wait_for_active_shards: None,
            pretty: false,
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = typ.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Partial document merged into the existing one
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

    /// Document to insert when none exists
    pub fn upsert(mut self, doc: Value) -> Self {
        self.upsert = Some(doc);
        self
    }

    pub fn detect_noop(mut self, enabled: bool) -> Self {
        self.detect_noop = Some(enabled);
        self
    }

    pub fn fetch_source_context(mut self, ctx: FetchSourceContext) -> Self {
        self.fetch_source = Some(ctx);
        self
    }

    pub fn retry_on_conflict(mut self, retries: u32) -> Self {
        self.retry_on_conflict = Some(retries);
        self
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
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

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[
            ("Index", self.index.is_empty()),
            ("Type", self.typ.is_empty()),
            ("Id", self.id.is_empty()),
        ])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = expand(
            "/{index}/{type}/{id}/_update",
            &[("index", &self.index), ("type", &self.typ), ("id", &self.id)],
        )?;
        let params = ParamsBuilder::new()
            .opt("retry_on_conflict", self.retry_on_conflict)
            .list("fields", &self.fields)
            .opt("routing", self.routing.as_ref())
            .opt("parent", self.parent.as_ref())
            .opt("version", self.version)
            .opt("version_type", self.version_type.as_ref())
            .opt("refresh", self.refresh.as_ref())
            .opt("timeout", self.timeout.as_ref())
            .opt("wait_for_active_shards", self.wait_for_active_shards.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub fn body(&self) -> Value {
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
        if let Some(ctx) = &self.fetch_source {
            body.insert("_source".into(), ctx.source());
        }
        Value::Object(body)
    }

    pub async fn do_request(self) -> Result<DocumentResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let body = self.body();
        self.client
            .send_json(
                PerformRequestOptions::new(Method::POST, path)
                    .params(params)
                    .body(body),
            )
            .await
    }
}

/// One document reference in an mget request
#[derive(Debug, Clone, Default)]
pub struct MultiGetItem {
    index: Option<String>,
    typ: Option<String>,
    id: String,
    routing: Option<String>,
    stored_fields: Vec<String>,
    version: Option<i64>,
    version_type: Option<String>,
    fetch_source: Option<FetchSourceContext>,
}

impl MultiGetItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = Some(typ.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn stored_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.stored_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
        self
    }

    pub fn fetch_source_context(mut self, ctx: FetchSourceContext) -> Self {
        self.fetch_source = Some(ctx);
        self
    }

    pub fn source(&self) -> Value {
        let mut item = Map::new();
        if let Some(index) = &self.index {
            item.insert("_index".into(), json!(index));
        }
        if let Some(typ) = &self.typ {
            item.insert("_type".into(), json!(typ));
        }
        item.insert("_id".into(), json!(self.id));
        if let Some(routing) = &self.routing {
            item.insert("routing".into(), json!(routing));
        }
        if !self.stored_fields.is_empty() {
            item.insert("stored_fields".into(), json!(self.stored_fields));
        }
        if let Some(version) = self.version {
            item.insert("version".into(), json!(version));
        }
        if let Some(version_type) = &self.version_type {
            item.insert("version_type".into(), json!(version_type));
        }
        if let Some(ctx) = &self.fetch_source {
            item.insert("_source".into(), ctx.source());
        }
        Value::Object(item)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MgetResponse {
    #[serde(default)]
    pub docs: Vec<GetResult>,
}

/// Builder for `POST /_mget`
pub struct MgetService {
    client: Client,
    items: Vec<MultiGetItem>,
    preference: Option<String>,
    realtime: Option<bool>,
    refresh: Option<bool>,
    routing: Option<String>,
    stored_fields: Vec<String>,
    pretty: bool,
}

impl MgetService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            items: Vec::new(),
            preference: None,
            realtime: None,
            refresh: None,
            routing: None,
            stored_fields: Vec::new(),
            pretty: false,
        }
    }

    pub fn add(mut self, item: MultiGetItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn stored_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.stored_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require(&[("Items", self.items.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let params = ParamsBuilder::new()
            .opt("preference", self.preference.as_ref())
            .opt("realtime", self.realtime)
            .opt("refresh", self.refresh)
            .opt("routing", self.routing.as_ref())
            .list("stored_fields", &self.stored_fields)
            .pretty(self.pretty)
            .build();
        Ok(("/_mget".to_string(), params))
    }

    pub fn body(&self) -> Value {
        let docs: Vec<Value> = self.items.iter().map(MultiGetItem::source).collect();
        json!({ "docs": docs })
    }

    pub async fn do_request(self) -> Result<MgetResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        let body = self.body();
        self.client
            .send_json(
                PerformRequestOptions::new(Method::POST, path)
                    .params(params)
                    .body(body),
            )
            .await
    }
}

impl Client {
    pub fn index(&self) -> IndexService {
        IndexService::new(self.clone())
    }

    pub fn get(&self) -> GetService {
        GetService::new(self.clone())
    }

    pub fn exists(&self) -> ExistsService {
        ExistsService::new(self.clone())
    }

    pub fn delete(&self) -> DeleteService {
        DeleteService::new(self.clone())
    }

    pub fn update(&self) -> UpdateService {
        UpdateService::new(self.clone())
    }

    pub fn mget(&self) -> MgetService {
        MgetService::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use bytes::Bytes;
    use reqwest::header::HeaderMap;

    #[test]
    fn test_index_url_with_and_without_id() {
        let client = test_client();
        let (method, path, params) = client
            .index()
            .index("twitter")
            .typ("tweet")
            .id("1")
            .op_type("create")
            .refresh("wait_for")
            .body(json!({"user": "olivere"}))
            .build_url()
            .unwrap();
        assert_eq!(method, Method::PUT);
        assert_eq!(path, "/twitter/tweet/1");
        assert_eq!(params["op_type"], "create");
        assert_eq!(params["refresh"], "wait_for");

        let (method, path, _) = client.index().index("twitter").typ("tweet").build_url().unwrap();
        assert_eq!(method, Method::POST);
        assert_eq!(path, "/twitter/tweet");
    }

    #[test]
    fn test_index_validation() {
        let err = test_client().index().typ("tweet").validate().unwrap_err();
        assert!(err.to_string().contains("[Index, BodyJson]"));
    }

    #[test]
    fn test_get_url_with_source_filter() {
        let (path, params) = test_client()
            .get()
            .index("twitter")
            .id("1")
            .fetch_source_context(FetchSourceContext::new(true).include(["user", "message"]))
            .realtime(false)
            .build_url()
            .unwrap();
        assert_eq!(path, "/twitter/_all/1");
        assert_eq!(params["_source_include"], "user,message");
        assert_eq!(params["realtime"], "false");
    }

    #[test]
    fn test_update_body() {
        let svc = test_client()
            .update()
            .index("twitter")
            .typ("tweet")
            .id("1")
            .script(Script::new("ctx._source.retweets += params.num").param("num", json!(1)))
            .upsert(json!({"retweets": 0}))
            .retry_on_conflict(3);
        let (path, params) = svc.build_url().unwrap();
        assert_eq!(path, "/twitter/tweet/1/_update");
        assert_eq!(params["retry_on_conflict"], "3");
        assert_eq!(
            svc.body(),
            json!({
                "script": {"source": "ctx._source.retweets += params.num", "params": {"num": 1}},
                "upsert": {"retweets": 0}
            })
        );
    }

    #[test]
    fn test_mget_body() {
        let svc = test_client()
            .mget()
            .add(MultiGetItem::new("1").index("twitter").typ("tweet"))
            .add(MultiGetItem::new("2").index("twitter").stored_fields(["user"]));
        assert_eq!(
            svc.body(),
            json!({"docs": [
                {"_index": "twitter", "_type": "tweet", "_id": "1"},
                {"_index": "twitter", "_id": "2", "stored_fields": ["user"]}
            ]})
        );
        assert!(test_client().mget().validate().is_err());
    }

    #[test]
    fn test_missing_index_rejected() {
        let missing_doc = Response {
            status_code: 404,
            headers: HeaderMap::new(),
            body: Bytes::from_static(br#"{"_index":"t","_type":"x","_id":"1","found":false}"#),
        };
        assert!(reject_missing_index(&missing_doc).is_ok());
        let doc: GetResult = missing_doc.json().unwrap();
        assert!(!doc.found);

        let missing_index = Response {
            status_code: 404,
            headers: HeaderMap::new(),
            body: Bytes::from_static(
                br#"{"error":{"type":"index_not_found_exception","reason":"no such index"},"status":404}"#,
            ),
        };
        let err = reject_missing_index(&missing_index).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_source_as() {
        #[derive(Deserialize)]
        struct Tweet {
            user: String,
        }
        let doc = GetResult {
            source: Some(json!({"user": "olivere"})),
            found: true,
            ..Default::default()
        };
        let tweet: Tweet = doc.source_as().unwrap().unwrap();
        assert_eq!(tweet.user, "olivere");
    }
}
