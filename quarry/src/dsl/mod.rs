//! Search request builders and response accessors
//!
//! Builders render to `serde_json::Value` through their `source()` method.
//! Composite builders (bool queries, bucket aggregations, search sources)
//! render their children eagerly, so everything here is `Clone`.

pub mod aggs;
pub mod aggs_response;
pub mod highlight;
pub mod query;
pub mod sort;
pub mod source;
pub mod suggest;

pub use aggs::Aggregation;
pub use aggs_response::Aggregations;
pub use highlight::{Highlight, HighlighterField};
pub use query::*;
pub use sort::{ScoreSort, SortInfo, Sorter};
pub use source::{FetchSourceContext, SearchSource};
pub use suggest::{SearchSuggestion, SearchSuggestionOption, Suggester};

use serde_json::{json, Map, Value};

/// A script for updates, reindexing, and scripted queries
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    source: String,
    lang: Option<String>,
    params: Map<String, Value>,
    stored: bool,
}

impl Script {
    /// Inline script
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            lang: None,
            params: Map::new(),
            stored: false,
        }
    }

    /// Script stored in the cluster under `id`
    pub fn stored(id: impl Into<String>) -> Self {
        Self {
            stored: true,
            ..Self::new(id)
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn source(&self) -> Value {
        let mut script = Map::new();
        let key = if self.stored { "id" } else { "source" };
        script.insert(key.to_string(), json!(self.source));
        if let Some(lang) = &self.lang {
            script.insert("lang".to_string(), json!(lang));
        }
        if !self.params.is_empty() {
            script.insert("params".to_string(), Value::Object(self.params.clone()));
        }
        Value::Object(script)
    }
}
