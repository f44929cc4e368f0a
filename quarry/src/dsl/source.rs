//! Search request body and source filtering

use super::aggs::Aggregation;
use super::highlight::Highlight;
use super::query::Query;
use super::sort::{SortInfo, Sorter};
use super::suggest::Suggester;
use serde_json::{json, Map, Value};

/// Which parts of `_source` to return
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSourceContext {
    fetch: bool,
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl FetchSourceContext {
    pub fn new(fetch: bool) -> Self {
        Self {
            fetch,
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    pub fn include<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.includes.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn exclude<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.excludes.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn fetch(&self) -> bool {
        self.fetch
    }

    /// Body form: a bool, or an object of include/exclude patterns
    pub fn source(&self) -> Value {
        if !self.fetch {
            return json!(false);
        }
        if self.includes.is_empty() && self.excludes.is_empty() {
            return json!(true);
        }
        let mut ctx = Map::new();
        if !self.includes.is_empty() {
            ctx.insert("includes".into(), json!(self.includes));
        }
        if !self.excludes.is_empty() {
            ctx.insert("excludes".into(), json!(self.excludes));
        }
        Value::Object(ctx)
    }

    /// URL form for document APIs
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        if !self.fetch {
            return vec![("_source", "false".to_string())];
        }
        let mut params = Vec::new();
        if !self.includes.is_empty() {
            params.push(("_source_include", self.includes.join(",")));
        }
        if !self.excludes.is_empty() {
            params.push(("_source_exclude", self.excludes.join(",")));
        }
        params
    }
}

/// Body of a `_search` request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSource {
    query: Option<Value>,
    post_filter: Option<Value>,
    from: Option<u64>,
    size: Option<u64>,
    sorts: Vec<Value>,
    aggregations: Map<String, Value>,
    highlight: Option<Highlight>,
    suggesters: Map<String, Value>,
    global_suggest_text: Option<String>,
    fetch_source: Option<FetchSourceContext>,
    stored_fields: Option<Vec<String>>,
    docvalue_fields: Vec<String>,
    explain: Option<bool>,
    version: Option<bool>,
    timeout: Option<String>,
    terminate_after: Option<u64>,
    min_score: Option<f64>,
    track_scores: Option<bool>,
    search_after: Vec<Value>,
    profile: Option<bool>,
}

impl SearchSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Query) -> Self {
        self.query = Some(query.source());
        self
    }

    /// Filter applied after aggregations are computed
    pub fn post_filter(mut self, filter: impl Query) -> Self {
        self.post_filter = Some(filter.source());
        self
    }

    pub fn from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn sort(self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort_by(SortInfo::new(field).ascending(ascending))
    }

    pub fn sort_by(mut self, sorter: impl Sorter) -> Self {
        self.sorts.push(sorter.source());
        self
    }

    pub fn aggregation(mut self, name: impl Into<String>, agg: impl Aggregation) -> Self {
        self.aggregations.insert(name.into(), agg.source());
        self
    }

    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
        self
    }

    pub fn suggester(mut self, suggester: impl Suggester) -> Self {
        self.suggesters
            .insert(suggester.name().to_string(), suggester.source());
        self
    }

    /// Text shared by all suggesters that set none of their own
    pub fn global_suggest_text(mut self, text: impl Into<String>) -> Self {
        self.global_suggest_text = Some(text.into());
        self
    }

    pub fn fetch_source(mut self, fetch: bool) -> Self {
        self.fetch_source = Some(FetchSourceContext::new(fetch));
        self
    }

    pub fn fetch_source_context(mut self, ctx: FetchSourceContext) -> Self {
        self.fetch_source = Some(ctx);
        self
    }

    /// An empty list renders `_none_`
    pub fn stored_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.stored_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn docvalue_field(mut self, field: impl Into<String>) -> Self {
        self.docvalue_fields.push(field.into());
        self
    }

    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = Some(explain);
        self
    }

    pub fn version(mut self, version: bool) -> Self {
        self.version = Some(version);
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn terminate_after(mut self, n: u64) -> Self {
        self.terminate_after = Some(n);
        self
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn track_scores(mut self, track: bool) -> Self {
        self.track_scores = Some(track);
        self
    }

    /// Sort values of the last hit of the previous page
    pub fn search_after<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.search_after = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn profile(mut self, profile: bool) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn source(&self) -> Value {
        let mut body = Map::new();
        if let Some(from) = self.from {
            body.insert("from".into(), json!(from));
        }
        if let Some(size) = self.size {
            body.insert("size".into(), json!(size));
        }
        if let Some(timeout) = &self.timeout {
            body.insert("timeout".into(), json!(timeout));
        }
        if let Some(n) = self.terminate_after {
            body.insert("terminate_after".into(), json!(n));
        }
        if let Some(query) = &self.query {
            body.insert("query".into(), query.clone());
        }
        if let Some(filter) = &self.post_filter {
            body.insert("post_filter".into(), filter.clone());
        }
        if let Some(min_score) = self.min_score {
            body.insert("min_score".into(), json!(min_score));
        }
        if let Some(version) = self.version {
            body.insert("version".into(), json!(version));
        }
        if let Some(explain) = self.explain {
            body.insert("explain".into(), json!(explain));
        }
        if let Some(profile) = self.profile {
            body.insert("profile".into(), json!(profile));
        }
        if let Some(ctx) = &self.fetch_source {
            body.insert("_source".into(), ctx.source());
        }
        match &self.stored_fields {
            Some(fields) if fields.is_empty() => {
                body.insert("stored_fields".into(), json!("_none_"));
            }
            Some(fields) => {
                body.insert("stored_fields".into(), json!(fields));
            }
            None => {}
        }
        if !self.docvalue_fields.is_empty() {
            body.insert("docvalue_fields".into(), json!(self.docvalue_fields));
        }
        if !self.sorts.is_empty() {
            body.insert("sort".into(), Value::Array(self.sorts.clone()));
        }
        if let Some(track) = self.track_scores {
            body.insert("track_scores".into(), json!(track));
        }
        if !self.search_after.is_empty() {
            body.insert("search_after".into(), Value::Array(self.search_after.clone()));
        }
        if !self.aggregations.is_empty() {
            body.insert("aggregations".into(), Value::Object(self.aggregations.clone()));
        }
        if let Some(highlight) = &self.highlight {
            body.insert("highlight".into(), highlight.source());
        }
        if !self.suggesters.is_empty() || self.global_suggest_text.is_some() {
            let mut suggest = self.suggesters.clone();
            if let Some(text) = &self.global_suggest_text {
                suggest.insert("text".into(), json!(text));
            }
            body.insert("suggest".into(), Value::Object(suggest));
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::aggs::TermsAggregation;
    use crate::dsl::query::{MatchAllQuery, TermQuery};
    use crate::dsl::sort::ScoreSort;
    use crate::dsl::suggest::TermSuggester;

    #[test]
    fn test_fetch_source_forms() {
        assert_eq!(FetchSourceContext::new(false).source(), json!(false));
        assert_eq!(FetchSourceContext::new(true).source(), json!(true));
        let ctx = FetchSourceContext::new(true)
            .include(["obj1.*", "obj2.*"])
            .exclude(["*.description"]);
        assert_eq!(
            ctx.source(),
            json!({"includes": ["obj1.*", "obj2.*"], "excludes": ["*.description"]})
        );
        assert_eq!(
            ctx.query_params(),
            vec![
                ("_source_include", "obj1.*,obj2.*".to_string()),
                ("_source_exclude", "*.description".to_string())
            ]
        );
        assert_eq!(
            FetchSourceContext::new(false).query_params(),
            vec![("_source", "false".to_string())]
        );
    }

    #[test]
    fn test_search_source_full() {
        let src = SearchSource::new()
            .query(MatchAllQuery::new())
            .post_filter(TermQuery::new("tag", "go"))
            .from(10)
            .size(20)
            .sort_by(ScoreSort::new())
            .sort("created", false)
            .aggregation("tags", TermsAggregation::new().field("tag"))
            .suggester(TermSuggester::new("spelling").text("serach").field("message"))
            .fetch_source(false)
            .search_after([json!(1463538857), json!("tweet#654")])
            .terminate_after(100)
            .explain(true);
        assert_eq!(
            src.source(),
            json!({
                "from": 10,
                "size": 20,
                "terminate_after": 100,
                "query": {"match_all": {}},
                "post_filter": {"term": {"tag": "go"}},
                "explain": true,
                "_source": false,
                "sort": [{"_score": {"order": "desc"}}, {"created": {"order": "desc"}}],
                "search_after": [1463538857, "tweet#654"],
                "aggregations": {"tags": {"terms": {"field": "tag"}}},
                "suggest": {"spelling": {"text": "serach", "term": {"field": "message"}}}
            })
        );
    }

    #[test]
    fn test_empty_stored_fields_is_none() {
        let src = SearchSource::new().stored_fields(Vec::<String>::new());
        assert_eq!(src.source(), json!({"stored_fields": "_none_"}));
        assert_eq!(SearchSource::new().source(), json!({}));
    }
}
