//! `_msearch`: several searches in one round trip

use crate::client::{Client, PerformRequestOptions};
use crate::dsl::{Query, SearchSource};
use crate::error::Result;
use crate::services::search::SearchResult;
use crate::services::ParamsBuilder;
use crate::uritemplates::{expand, join_list, Params};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One search of a multi search: a header line and a body line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    indices: Vec<String>,
    types: Vec<String>,
    search_type: Option<String>,
    routing: Option<String>,
    preference: Option<String>,
    request_cache: Option<bool>,
    source: SearchSource,
}

impl SearchRequest {
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

    pub fn search_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = Some(search_type.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn request_cache(mut self, enabled: bool) -> Self {
        self.request_cache = Some(enabled);
        self
    }

    pub fn source(mut self, source: SearchSource) -> Self {
        self.source = source;
        self
    }

    /// Shortcut for a body holding only `query`
    pub fn query(mut self, query: impl Query) -> Self {
        self.source = std::mem::take(&mut self.source).query(query);
        self
    }

    pub fn header(&self) -> Value {
        let mut header = Map::new();
        match self.indices.as_slice() {
            [] => {}
            [single] => {
                header.insert("index".into(), json!(single));
            }
            many => {
                header.insert("index".into(), json!(many));
            }
        }
        match self.types.as_slice() {
            [] => {}
            [single] => {
                header.insert("type".into(), json!(single));
            }
            many => {
                header.insert("type".into(), json!(many));
            }
        }
        if let Some(search_type) = &self.search_type {
            header.insert("search_type".into(), json!(search_type));
        }
        if let Some(routing) = &self.routing {
            header.insert("routing".into(), json!(routing));
        }
        if let Some(preference) = &self.preference {
            header.insert("preference".into(), json!(preference));
        }
        if let Some(cache) = self.request_cache {
            header.insert("request_cache".into(), json!(cache));
        }
        Value::Object(header)
    }

    pub fn body(&self) -> Value {
        self.source.source()
    }
}

/// Builder for `POST /{indices}/_msearch`
pub struct MultiSearchService {
    client: Client,
    indices: Vec<String>,
    requests: Vec<SearchRequest>,
    max_concurrent_searches: Option<u32>,
    pretty: bool,
}

impl MultiSearchService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            requests: Vec::new(),
            max_concurrent_searches: None,
            pretty: false,
        }
    }

    /// Default indices for requests whose header names none
    pub fn index<S: Into<String>>(mut self, indices: impl IntoIterator<Item = S>) -> Self {
        self.indices.extend(indices.into_iter().map(Into::into));
        self
    }

    pub fn add(mut self, request: SearchRequest) -> Self {
        self.requests.push(request);
        self
    }

    pub fn max_concurrent_searches(mut self, max: u32) -> Self {
        self.max_concurrent_searches = Some(max);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let path = if self.indices.is_empty() {
            "/_msearch".to_string()
        } else {
            expand(
                "/{index}/_msearch",
                &[("index", &join_list(&self.indices))],
            )?
        };
        let params = ParamsBuilder::new()
            .opt("max_concurrent_searches", self.max_concurrent_searches)
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    /// Header and body line per request, newline terminated
    pub fn body_as_string(&self) -> Result<String> {
        let mut body = String::new();
        for request in &self.requests {
            body.push_str(&serde_json::to_string(&request.header())?);
            body.push('\n');
            body.push_str(&serde_json::to_string(&request.body())?);
            body.push('\n');
        }
        Ok(body)
    }

    pub async fn do_request(self) -> Result<MultiSearchResult> {
        let (path, params) = self.build_url()?;
        let body = self.body_as_string()?;
        self.client
            .send_json(
                PerformRequestOptions::new(Method::POST, path)
                    .params(params)
                    .body(body)
                    .content_type("application/x-ndjson"),
            )
            .await
    }
}

/// Responses in request order; failed searches carry `error` and `status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiSearchResult {
    #[serde(default)]
    pub responses: Vec<SearchResult>,
}

impl Client {
    pub fn multi_search(&self) -> MultiSearchService {
        MultiSearchService::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use crate::dsl::{MatchAllQuery, TermQuery};

    #[test]
    fn test_msearch_body() {
        let svc = test_client()
            .multi_search()
            .add(
                SearchRequest::new()
                    .index(["twitter"])
                    .query(TermQuery::new("user", "olivere")),
            )
            .add(
                SearchRequest::new()
                    .index(["a", "b"])
                    .search_type("dfs_query_then_fetch")
                    .source(SearchSource::new().query(MatchAllQuery::new()).size(0)),
            );
        let body = svc.body_as_string().unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));
        assert_eq!(
            serde_json::from_str::<Value>(lines[0]).unwrap(),
            json!({"index": "twitter"})
        );
        assert_eq!(
            serde_json::from_str::<Value>(lines[1]).unwrap(),
            json!({"query": {"term": {"user": "olivere"}}})
        );
        assert_eq!(
            serde_json::from_str::<Value>(lines[2]).unwrap(),
            json!({"index": ["a", "b"], "search_type": "dfs_query_then_fetch"})
        );
        assert_eq!(
            serde_json::from_str::<Value>(lines[3]).unwrap(),
            json!({"size": 0, "query": {"match_all": {}}})
        );
    }

    #[test]
    fn test_msearch_url() {
        let (path, _) = test_client().multi_search().build_url().unwrap();
        assert_eq!(path, "/_msearch");
        let (path, params) = test_client()
            .multi_search()
            .index(["logs"])
            .max_concurrent_searches(2)
            .build_url()
            .unwrap();
        assert_eq!(path, "/logs/_msearch");
        assert_eq!(params["max_concurrent_searches"], "2");
    }

    #[test]
    fn test_decode_item_error() {
        let raw = json!({"responses": [
            {"took": 1, "hits": {"total": 0, "hits": []}},
            {"error": {"type": "index_not_found_exception", "reason": "no such index"}, "status": 404}
        ]});
        let res: MultiSearchResult = serde_json::from_value(raw).unwrap();
        assert_eq!(res.responses.len(), 2);
        assert!(res.responses[0].error.is_none());
        assert_eq!(res.responses[1].status, Some(404));
        assert_eq!(
            res.responses[1].error.as_ref().unwrap().error_type,
            "index_not_found_exception"
        );
    }
}
