//! Scrolling through large result sets

use crate::client::{Client, PerformRequestOptions};
use crate::dsl::{Query, SearchSource, Sorter};
use crate::error::{Error, Result};
use crate::services::search::{search_path, SearchResult};
use crate::services::ParamsBuilder;
use crate::uritemplates::Params;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Default lifetime of the server-side search context
pub const DEFAULT_KEEP_ALIVE: &str = "5m";

/// Iterates a search page by page.
///
/// The first call runs the search with `scroll=keep_alive`; every later
/// call posts the returned scroll id to `/_search/scroll`. A page without
/// hits ends the scroll with [`Error::EndOfScroll`].
///
/// ```ignore
/// let mut scroll = client.scroll(["logs"]).size(500);
/// loop {
///     match scroll.do_request().await {
///         Ok(page) => handle(page),
///         Err(Error::EndOfScroll) => break,
///         Err(e) => return Err(e),
///     }
/// }
/// scroll.clear().await?;
/// ```
pub struct ScrollService {
    client: Client,
    indices: Vec<String>,
    types: Vec<String>,
    keep_alive: String,
    source: SearchSource,
    scroll_id: Option<String>,
    routing: Option<String>,
    preference: Option<String>,
    ignore_unavailable: Option<bool>,
    allow_no_indices: Option<bool>,
    expand_wildcards: Option<String>,
    pretty: bool,
}

impl ScrollService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            types: Vec::new(),
            keep_alive: DEFAULT_KEEP_ALIVE.to_string(),
            source: SearchSource::new(),
            scroll_id: None,
            routing: None,
            preference: None,
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

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = keep_alive.into();
        self
    }

    pub fn search_source(mut self, source: SearchSource) -> Self {
        self.source = source;
        self
    }

    pub fn query(mut self, query: impl Query) -> Self {
        self.source = std::mem::take(&mut self.source).query(query);
        self
    }

    /// Page size
    pub fn size(mut self, size: u64) -> Self {
        self.source = std::mem::take(&mut self.source).size(size);
        self
    }

    pub fn sort_by(mut self, sorter: impl Sorter) -> Self {
        self.source = std::mem::take(&mut self.source).sort_by(sorter);
        self
    }

    /// Resume from a scroll id obtained elsewhere
    pub fn scroll_id(mut self, id: impl Into<String>) -> Self {
        self.scroll_id = Some(id.into());
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

    pub fn current_scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// URL of the next request: the initial search, or a continuation
    pub fn build_url(&self) -> Result<(String, Params)> {
        if self.scroll_id.is_some() {
            let params = ParamsBuilder::new().pretty(self.pretty).build();
            return Ok(("/_search/scroll".to_string(), params));
        }
        let path = search_path(&self.indices, &self.types, "_search")?;
        let params = ParamsBuilder::new()
            .opt("scroll", Some(&self.keep_alive))
            .opt("routing", self.routing.as_ref())
            .opt("preference", self.preference.as_ref())
            .opt("ignore_unavailable", self.ignore_unavailable)
            .opt("allow_no_indices", self.allow_no_indices)
            .opt("expand_wildcards", self.expand_wildcards.as_ref())
            .pretty(self.pretty)
            .build();
        Ok((path, params))
    }

    pub fn body(&self) -> serde_json::Value {
        match &self.scroll_id {
            Some(id) => json!({ "scroll": self.keep_alive, "scroll_id": id }),
            None => self.source.source(),
        }
    }

    /// Fetch the next page
    pub async fn do_request(&mut self) -> Result<SearchResult> {
        let (path, params) = self.build_url()?;
        let res: SearchResult = self
            .client
            .send_json(
                PerformRequestOptions::new(Method::POST, path)
                    .params(params)
                    .body(self.body()),
            )
            .await?;
        if let Some(id) = &res.scroll_id {
            self.scroll_id = Some(id.clone());
        }
        if res.hits.hits.is_empty() {
            debug!(scroll_id = ?self.scroll_id, "elastic: scroll exhausted");
            return Err(Error::EndOfScroll);
        }
        Ok(res)
    }

    /// Release the server-side context; a no-op before the first page
    pub async fn clear(&mut self) -> Result<()> {
        if let Some(id) = self.scroll_id.take() {
            self.client.clear_scroll([id]).do_request().await?;
        }
        Ok(())
    }
}

/// Builder for `DELETE /_search/scroll`
pub struct ClearScrollService {
    client: Client,
    scroll_ids: Vec<String>,
    pretty: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearScrollResponse {
    #[serde(default)]
    pub succeeded: bool,
    #[serde(default)]
    pub num_freed: u64,
}

impl ClearScrollService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            scroll_ids: Vec::new(),
            pretty: false,
        }
    }

    pub fn scroll_id<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.scroll_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn validate(&self) -> Result<()> {
        super::require(&[("ScrollId", self.scroll_ids.is_empty())])
    }

    pub fn build_url(&self) -> Result<(String, Params)> {
        let params = ParamsBuilder::new().pretty(self.pretty).build();
        Ok(("/_search/scroll".to_string(), params))
    }

    /// 404 means the contexts had already expired
    pub async fn do_request(self) -> Result<ClearScrollResponse> {
        self.validate()?;
        let (path, params) = self.build_url()?;
        self.client
            .send_json(
                PerformRequestOptions::new(Method::DELETE, path)
                    .params(params)
                    .body(json!({ "scroll_id": self.scroll_ids }))
                    .ignore_errors(&[404]),
            )
            .await
    }
}

impl Client {
    pub fn scroll<S: Into<String>>(&self, indices: impl IntoIterator<Item = S>) -> ScrollService {
        ScrollService::new(self.clone()).index(indices)
    }

    pub fn clear_scroll<S: Into<String>>(&self, ids: impl IntoIterator<Item = S>) -> ClearScrollService {
        ClearScrollService::new(self.clone()).scroll_id(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use crate::dsl::MatchAllQuery;

    #[test]
    fn test_initial_request() {
        let svc = test_client()
            .scroll(["twitter"])
            .query(MatchAllQuery::new())
            .size(100)
            .keep_alive("1m");
        let (path, params) = svc.build_url().unwrap();
        assert_eq!(path, "/twitter/_search");
        assert_eq!(params["scroll"], "1m");
        assert_eq!(svc.body(), json!({"size": 100, "query": {"match_all": {}}}));
    }

    #[test]
    fn test_continuation_request() {
        let svc = test_client().scroll(["twitter"]).scroll_id("c2Nhbjs2OzM0NDg1");
        let (path, params) = svc.build_url().unwrap();
        assert_eq!(path, "/_search/scroll");
        assert!(params.is_empty());
        assert_eq!(
            svc.body(),
            json!({"scroll": DEFAULT_KEEP_ALIVE, "scroll_id": "c2Nhbjs2OzM0NDg1"})
        );
    }

    #[test]
    fn test_clear_requires_ids() {
        let err = test_client()
            .clear_scroll(Vec::<String>::new())
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("[ScrollId]"));
    }
}
