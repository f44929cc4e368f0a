//! `_search` and the search response model

use crate::client::{Client, PerformRequestOptions};
use crate::dsl::aggs_response::Aggregations;
use crate::dsl::{
    Aggregation, FetchSourceContext, Highlight, Query, SearchSource, SearchSuggestion, Sorter,
    Suggester,
};
use crate::error::{Error, ErrorDetails, Result};
use crate::services::{ParamsBuilder, ShardsInfo};
use crate::uritemplates::{expand, join_list, Params};
use reqwest::Method;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Builder for `POST /{indices}/{types}/_search`
#[derive(Debug, Clone)]
pub struct SearchService {
    client: Client,
    indices: Vec<String>,
    types: Vec<String>,
    source: SearchSource,
    raw_body: Option<Value>,
    search_type: Option<String>,
    routing: Vec<String>,
    preference: Option<String>,
    scroll: Option<String>,
    request_cache: Option<bool>,
    ignore_unavailable: Option<bool>,
    allow_no_indices: Option<bool>,
    expand_wildcards: Option<String>,
    typed_keys: Option<bool>,
    pretty: bool,
}

impl SearchService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            types: Vec::new(),
            source: SearchSource::new(),
            raw_body: None,
            search_type: None,
            routing: Vec::new(),
            preference: None,
            scroll: None,
            request_cache: None,
            ignore_unavailable: None,
            allow_no_indices: None,
            expand_wildcards: None,
            typed_keys: None,
            pretty: false,
        }
    }

    fn with_source(mut self, f: impl FnOnce(SearchSource) -> SearchSource) -> Self {
        self.source = f(std::mem::take(&mut self.source));
        self
    }

    pub fn index<S: Into<String>>(mut self, indices: impl IntoIterator<Item = S>) -> Self {
        self.indices.extend(indices.into_iter().map(Into::into));
        self
    }

    pub fn typ<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Replace the whole request body
    pub fn search_source(mut self, source: SearchSource) -> Self {
        self.source = source;
        self
    }

    /// Send `body` verbatim, ignoring every body setter
    pub fn source(mut self, body: Value) -> Self {
        self.raw_body = Some(body);
        self
    }

    pub fn query(self, query: impl Query) -> Self {
        self.with_source(|s| s.query(query))
    }

    pub fn post_filter(self, filter: impl Query) -> Self {
        self.with_source(|s| s.post_filter(filter))
    }

    pub fn from(self, from: u64) -> Self {
        self.with_source(|s| s.from(from))
    }

    pub fn size(self, size: u64) -> Self {
        self.with_source(|s| s.size(size))
    }

    pub fn sort(self, field: impl Into<String>, ascending: bool) -> Self {
        self.with_source(|s| s.sort(field, ascending))
    }

    pub fn sort_by(self, sorter: impl Sorter) -> Self {
        self.with_source(|s| s.sort_by(sorter))
    }

    pub fn aggregation(self, name: impl Into<String>, agg: impl Aggregation) -> Self {
        self.with_source(|s| s.aggregation(name, agg))
    }

    pub fn highlight(self, highlight: Highlight) -> Self {
        self.with_source(|s| s.highlight(highlight))
    }

    pub fn suggester(self, suggester: impl Suggester) -> Self {
        self.with_source(|s| s.suggester(suggester))
    }

    pub fn fetch_source(self, fetch: bool) -> Self {
        self.with_source(|s| s.fetch_source(fetch))
    }

    pub fn fetch_source_context(self, ctx: FetchSourceContext) -> Self {
        self.with_source(|s| s.fetch_source_context(ctx))
    }

    pub fn stored_fields<S: Into<String>>(self, fields: impl IntoIterator<Item = S>) -> Self {
        self.with_source(|s| s.stored_fields(fields))
    }

    pub fn explain(self, explain: bool) -> Self {
        self.with_source(|s| s.explain(explain))
    }

    pub fn version(self, version: bool) -> Self {
        self.with_source(|s| s.version(version))
    }

    pub fn timeout(self, timeout: impl Into<String>) -> Self {
        self.with_source(|s| s.timeout(timeout))
    }

    pub fn terminate_after(self, n: u64) -> Self {
        self.with_source(|s| s.terminate_after(n))
    }

    pub fn min_score(self, min_score: f64) -> Self {
        self.with_source(|s| s.min_score(min_score))
    }

    pub fn track_scores(self, track: bool) -> Self {
        self.with_source(|s| s.track_scores(track))
    }

    pub fn search_after<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        self.with_source(|s| s.search_after(values))
    }

    /// `query_then_fetch` or `dfs_query_then_fetch`
    pub fn search_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = Some(search_type.into());
        self
    }

    pub fn routing<S: Into<String>>(mut self, routing: impl IntoIterator<Item = S>) -> Self {
        self.routing.extend(routing.into_iter().map(Into::into));
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    /// Keep a scroll context open for `keep_alive`, e.g. `1m`
    pub fn scroll(mut self, keep_alive: impl Into<String>) -> Self {
        self.scroll = Some(keep_alive.into());
        self
    }

    pub fn request_cache(mut self, enabled: bool) -> Self {
        self.request_cache = Some(enabled);
        self
    }

    pub fn ignore_unavailable(mut self, ignore: bool) -> Self {
        self.ignore_unavailable = Some(ignore);
        self
    }

    pub fn allow_no_indices(mut self, allow: bool) -> Self {
        self.allow_no_indices = Some(allow);
        self
    }

    /// `open`, `closed`, `none` or `all`
    pub fn expand_wildcards(mut self, expand: impl Into<String>) -> Self {
        self.expand_wildcards = Some(expand.into());
        self
    }

    pub fn typed_keys(mut self, enabled: bool) -> Self {
        self.typed_keys = Some(enabled);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = search_path(&self.indices, &self.types, "_search")?;
        let params = ParamsBuilder::new()
            .opt("search_type", self.search_type.as_ref())
            .list("routing", &self.routing)
            .opt("preference", self.preference.as_ref())
            .opt("scroll", self.scroll.as_ref())
            .opt("request_cache", self.request_cache)
            .opt("ignore_unavailable", self.ignore_unavailable)
            .opt("allow_no_indices", self.allow_no_indices)
            .opt("expand_wildcards", self.expand_wildcards.as_ref())
            .opt("typed_keys", self.typed_keys)
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub fn body(&self) -> Value {
        match &self.raw_body {
            Some(raw) => raw.clone(),
            None => self.source.source(),
        }
    }

    pub async fn do_request(self) -> Result<SearchResult> {
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

/// `/{indices}/{types}/{endpoint}`; types without indices search `_all`
pub(crate) fn search_path(indices: &[String], types: &[String], endpoint: &str) -> Result<String> {
    match (indices.is_empty(), types.is_empty()) {
        (true, true) => Ok(format!("/{}", endpoint)),
        (false, true) => Ok(format!(
            "{}/{}",
            expand("/{index}", &[("index", &join_list(indices))])?,
            endpoint
        )),
        (indices_empty, false) => {
            let index = if indices_empty {
                "_all".to_string()
            } else {
                join_list(indices)
            };
            Ok(format!(
                "{}/{}",
                expand(
                    "/{index}/{type}",
                    &[("index", &index), ("type", &join_list(types))]
                )?,
                endpoint
            ))
        }
    }
}

/// Decoded `_search` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub took: u64,
    #[serde(rename = "_scroll_id", default, skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    #[serde(default)]
    pub hits: SearchHits,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub suggest: HashMap<String, Vec<SearchSuggestion>>,
    #[serde(default, skip_serializing_if = "Aggregations::is_empty")]
    pub aggregations: Aggregations,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated_early: Option<bool>,
    #[serde(rename = "_shards", default)]
    pub shards: ShardsInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
    /// Set on failed items of a multi search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl SearchResult {
    /// Total number of matching documents, not just those returned
    pub fn total_hits(&self) -> u64 {
        self.hits.total
    }

    /// Decode the `_source` of every hit, skipping hits without one
    pub fn each<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.hits
            .hits
            .iter()
            .filter_map(|hit| hit.source.as_ref())
            .map(|source| T::deserialize(source).map_err(Error::from))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    #[serde(default, deserialize_with = "deserialize_total")]
    pub total: u64,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// Accept both `"total": 5` and `"total": {"value": 5, "relation": "eq"}`
fn deserialize_total<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Total {
        Count(u64),
        Object { value: u64 },
    }

    Ok(match Total::deserialize(deserializer)? {
        Total::Count(n) | Total::Object { value: n } => n,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub typ: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_routing", default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    #[serde(rename = "_parent", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub highlight: HashMap<String, Vec<String>>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, Value>,
    #[serde(rename = "_explanation", default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_queries: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub inner_hits: HashMap<String, SearchHitInnerHits>,
}

impl SearchHit {
    pub fn source_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.source {
            Some(source) => Ok(Some(T::deserialize(source)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHitInnerHits {
    #[serde(default)]
    pub hits: SearchHits,
}

impl Client {
    pub fn search<S: Into<String>>(&self, indices: impl IntoIterator<Item = S>) -> SearchService {
        SearchService::new(self.clone()).index(indices)
    }
}
