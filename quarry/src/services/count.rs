//! `_count`

use crate::client::{Client, PerformRequestOptions};
use crate::dsl::Query;
use crate::error::Result;
use crate::services::search::search_path;
use crate::services::{ParamsBuilder, ShardsInfo};
use crate::uritemplates::Params;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(rename = "_shards", default)]
    pub shards: ShardsInfo,
}

/// Builder for `POST /{indices}/{types}/_count`
pub struct CountService {
    client: Client,
    indices: Vec<String>,
    types: Vec<String>,
    query: Option<Value>,
    q: Option<String>,
    df: Option<String>,
    default_operator: Option<String>,
    analyzer: Option<String>,
    lenient: Option<bool>,
    min_score: Option<f64>,
    preference: Option<String>,
    routing: Option<String>,
    terminate_after: Option<u64>,
    ignore_unavailable: Option<bool>,
    allow_no_indices: Option<bool>,
    expand_wildcards: Option<String>,
    pretty: bool,
}

impl CountService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            types: Vec::new(),
            query: None,
            q: None,
            df: None,
            default_operator: None,
            analyzer: None,
            lenient: None,
            min_score: None,
            preference: None,
            routing: None,
            terminate_after: None,
            ignore_unavailable: None,
            allow_no_indices: None,
            expand_wildcards: None,
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

    /// Lucene query string passed as `q`
    pub fn q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn df(mut self, field: impl Into<String>) -> Self {
        self.df = Some(field.into());
        self
    }

    pub fn default_operator(mut self, operator: impl Into<String>) -> Self {
        self.default_operator = Some(operator.into());
        self
    }

    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = Some(lenient);
        self
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn terminate_after(mut self, n: u64) -> Self {
        self.terminate_after = Some(n);
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

    pub fn expand_wildcards(mut self, expand: impl Into<String>) -> Self {
        self.expand_wildcards = Some(expand.into());
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = search_path(&self.indices, &self.types, "_count")?;
        let params = ParamsBuilder::new()
            .opt("q", self.q.as_ref())
            .opt("df", self.df.as_ref())
            .opt("default_operator", self.default_operator.as_ref())
            .opt("analyzer", self.analyzer.as_ref())
            .opt("lenient", self.lenient)
            .opt("min_score", self.min_score)
            .opt("preference", self.preference.as_ref())
            .opt("routing", self.routing.as_ref())
            .opt("terminate_after", self.terminate_after)
            .opt("ignore_unavailable", self.ignore_unavailable)
            .opt("allow_no_indices", self.allow_no_indices)
            .opt("expand_wildcards", self.expand_wildcards.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub fn body(&self) -> Option<Value> {
        self.query.as_ref().map(|query| json!({ "query": query }))
    }

    pub async fn do_request(self) -> Result<u64> {
        let (path, params) = self.build_url()?;
        let mut opts = PerformRequestOptions::new(Method::POST, path).params(params);
        if let Some(body) = self.body() {
            opts = opts.body(body);
        }
        let res: CountResponse = self.client.send_json(opts).await?;
        Ok(res.count)
    }
}

impl Client {
    pub fn count<S: Into<String>>(&self, indices: impl IntoIterator<Item = S>) -> CountService {
        CountService::new(self.clone()).index(indices)
    }
}
