//! Highlighting of matched terms in search hits

use super::query::Query;
use serde_json::{json, Map, Value};

/// Options shared by the global highlighter and per-field entries
#[derive(Debug, Clone, Default, PartialEq)]
struct HighlightOptions {
    pre_tags: Vec<String>,
    post_tags: Vec<String>,
    fragment_size: Option<u32>,
    number_of_fragments: Option<u32>,
    highlighter_type: Option<String>,
    require_field_match: Option<bool>,
    highlight_query: Option<Value>,
    no_match_size: Option<u32>,
    order: Option<String>,
}

impl HighlightOptions {
    fn render(&self, into: &mut Map<String, Value>) {
        if !self.pre_tags.is_empty() {
            into.insert("pre_tags".into(), json!(self.pre_tags));
        }
        if !self.post_tags.is_empty() {
            into.insert("post_tags".into(), json!(self.post_tags));
        }
        if let Some(size) = self.fragment_size {
            into.insert("fragment_size".into(), json!(size));
        }
        if let Some(n) = self.number_of_fragments {
            into.insert("number_of_fragments".into(), json!(n));
        }
        if let Some(typ) = &self.highlighter_type {
            into.insert("type".into(), json!(typ));
        }
        if let Some(require) = self.require_field_match {
            into.insert("require_field_match".into(), json!(require));
        }
        if let Some(query) = &self.highlight_query {
            into.insert("highlight_query".into(), query.clone());
        }
        if let Some(size) = self.no_match_size {
            into.insert("no_match_size".into(), json!(size));
        }
        if let Some(order) = &self.order {
            into.insert("order".into(), json!(order));
        }
    }
}

macro_rules! highlight_option_setters {
    () => {
        pub fn pre_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
            self.options.pre_tags = tags.into_iter().map(Into::into).collect();
            self
        }

        pub fn post_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
            self.options.post_tags = tags.into_iter().map(Into::into).collect();
            self
        }

        pub fn fragment_size(mut self, size: u32) -> Self {
            self.options.fragment_size = Some(size);
            self
        }

        pub fn number_of_fragments(mut self, n: u32) -> Self {
            self.options.number_of_fragments = Some(n);
            self
        }

        /// `unified`, `plain` or `fvh`
        pub fn highlighter_type(mut self, typ: impl Into<String>) -> Self {
            self.options.highlighter_type = Some(typ.into());
            self
        }

        pub fn require_field_match(mut self, require: bool) -> Self {
            self.options.require_field_match = Some(require);
            self
        }

        pub fn highlight_query(mut self, query: impl Query) -> Self {
            self.options.highlight_query = Some(query.source());
            self
        }

        pub fn no_match_size(mut self, size: u32) -> Self {
            self.options.no_match_size = Some(size);
            self
        }

        /// `score` sorts fragments by relevance
        pub fn order(mut self, order: impl Into<String>) -> Self {
            self.options.order = Some(order.into());
            self
        }
    };
}

/// Per-field highlighter settings
#[derive(Debug, Clone, PartialEq)]
pub struct HighlighterField {
    name: String,
    options: HighlightOptions,
    matched_fields: Vec<String>,
}

impl HighlighterField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: HighlightOptions::default(),
            matched_fields: Vec::new(),
        }
    }

    highlight_option_setters!();

    pub fn matched_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.matched_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Value {
        let mut params = Map::new();
        self.options.render(&mut params);
        if !self.matched_fields.is_empty() {
            params.insert("matched_fields".into(), json!(self.matched_fields));
        }
        Value::Object(params)
    }
}

/// Highlight section of a search request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Highlight {
    options: HighlightOptions,
    fields: Vec<HighlighterField>,
    encoder: Option<String>,
    tags_schema: Option<String>,
}

impl Highlight {
    pub fn new() -> Self {
        Self::default()
    }

    highlight_option_setters!();

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(HighlighterField::new(name));
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = HighlighterField>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// `default` or `html`
    pub fn encoder(mut self, encoder: impl Into<String>) -> Self {
        self.encoder = Some(encoder.into());
        self
    }

    pub fn tags_schema(mut self, schema: impl Into<String>) -> Self {
        self.tags_schema = Some(schema.into());
        self
    }

    pub fn source(&self) -> Value {
        let mut params = Map::new();
        self.options.render(&mut params);
        if let Some(encoder) = &self.encoder {
            params.insert("encoder".into(), json!(encoder));
        }
        if let Some(schema) = &self.tags_schema {
            params.insert("tags_schema".into(), json!(schema));
        }
        if !self.fields.is_empty() {
            let mut fields = Map::new();
            for field in &self.fields {
                fields.insert(field.name.clone(), field.source());
            }
            params.insert("fields".into(), Value::Object(fields));
        }
        Value::Object(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::query::MatchQuery;

    #[test]
    fn test_highlight_with_fields() {
        let hl = Highlight::new()
            .pre_tags(["<em>"])
            .post_tags(["</em>"])
            .encoder("html")
            .field("message")
            .fields([HighlighterField::new("title")
                .fragment_size(50)
                .number_of_fragments(2)]);
        assert_eq!(
            hl.source(),
            json!({
                "pre_tags": ["<em>"],
                "post_tags": ["</em>"],
                "encoder": "html",
                "fields": {
                    "message": {},
                    "title": {"fragment_size": 50, "number_of_fragments": 2}
                }
            })
        );
    }

    #[test]
    fn test_highlight_query_and_type() {
        let hl = Highlight::new()
            .highlighter_type("plain")
            .require_field_match(false)
            .highlight_query(MatchQuery::new("body", "quick"));
        assert_eq!(
            hl.source(),
            json!({
                "type": "plain",
                "require_field_match": false,
                "highlight_query": {"match": {"body": {"query": "quick"}}}
            })
        );
    }
}
