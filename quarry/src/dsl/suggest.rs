//! Suggesters and their response entries

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::Debug;

/// A named suggester rendered under the request's `suggest` section
pub trait Suggester: Debug + Send + Sync {
    fn name(&self) -> &str;
    fn source(&self) -> Value;
}

/// Fields every suggester shares
#[derive(Debug, Clone, Default, PartialEq)]
struct SuggesterBase {
    name: String,
    text: Option<String>,
    field: Option<String>,
    analyzer: Option<String>,
    size: Option<u32>,
    shard_size: Option<u32>,
}

impl SuggesterBase {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn render(&self, kind: &str, text_key: &str, mut params: Map<String, Value>) -> Value {
        if let Some(field) = &self.field {
            params.insert("field".into(), json!(field));
        }
        if let Some(analyzer) = &self.analyzer {
            params.insert("analyzer".into(), json!(analyzer));
        }
        if let Some(size) = self.size {
            params.insert("size".into(), json!(size));
        }
        if let Some(shard_size) = self.shard_size {
            params.insert("shard_size".into(), json!(shard_size));
        }
        let mut suggester = Map::new();
        if let Some(text) = &self.text {
            suggester.insert(text_key.into(), json!(text));
        }
        suggester.insert(kind.into(), Value::Object(params));
        Value::Object(suggester)
    }
}

macro_rules! base_setters {
    () => {
        pub fn text(mut self, text: impl Into<String>) -> Self {
            self.base.text = Some(text.into());
            self
        }

        pub fn field(mut self, field: impl Into<String>) -> Self {
            self.base.field = Some(field.into());
            self
        }

        pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
            self.base.analyzer = Some(analyzer.into());
            self
        }

        pub fn size(mut self, size: u32) -> Self {
            self.base.size = Some(size);
            self
        }

        pub fn shard_size(mut self, shard_size: u32) -> Self {
            self.base.shard_size = Some(shard_size);
            self
        }
    };
}

/// Per-term spelling corrections
#[derive(Debug, Clone, PartialEq)]
pub struct TermSuggester {
    base: SuggesterBase,
    suggest_mode: Option<String>,
    sort: Option<String>,
    min_word_length: Option<u32>,
    max_edits: Option<u32>,
}

impl TermSuggester {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: SuggesterBase::new(name),
            suggest_mode: None,
            sort: None,
            min_word_length: None,
            max_edits: None,
        }
    }

    base_setters!();

    /// `missing`, `popular` or `always`
    pub fn suggest_mode(mut self, mode: impl Into<String>) -> Self {
        self.suggest_mode = Some(mode.into());
        self
    }

    /// `score` or `frequency`
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn min_word_length(mut self, len: u32) -> Self {
        self.min_word_length = Some(len);
        self
    }

    pub fn max_edits(mut self, edits: u32) -> Self {
        self.max_edits = Some(edits);
        self
    }
}

impl Suggester for TermSuggester {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(mode) = &self.suggest_mode {
            params.insert("suggest_mode".into(), json!(mode));
        }
        if let Some(sort) = &self.sort {
            params.insert("sort".into(), json!(sort));
        }
        if let Some(len) = self.min_word_length {
            params.insert("min_word_length".into(), json!(len));
        }
        if let Some(edits) = self.max_edits {
            params.insert("max_edits".into(), json!(edits));
        }
        self.base.render("term", "text", params)
    }
}

/// Whole-phrase corrections
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseSuggester {
    base: SuggesterBase,
    gram_size: Option<u32>,
    max_errors: Option<f64>,
    confidence: Option<f64>,
    separator: Option<String>,
    highlight: Option<(String, String)>,
}

impl PhraseSuggester {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: SuggesterBase::new(name),
            gram_size: None,
            max_errors: None,
            confidence: None,
            separator: None,
            highlight: None,
        }
    }

    base_setters!();

    pub fn gram_size(mut self, size: u32) -> Self {
        self.gram_size = Some(size);
        self
    }

    pub fn max_errors(mut self, max_errors: f64) -> Self {
        self.max_errors = Some(max_errors);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn highlight(mut self, pre_tag: impl Into<String>, post_tag: impl Into<String>) -> Self {
        self.highlight = Some((pre_tag.into(), post_tag.into()));
        self
    }
}

impl Suggester for PhraseSuggester {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(size) = self.gram_size {
            params.insert("gram_size".into(), json!(size));
        }
        if let Some(max_errors) = self.max_errors {
            params.insert("max_errors".into(), json!(max_errors));
        }
        if let Some(confidence) = self.confidence {
            params.insert("confidence".into(), json!(confidence));
        }
        if let Some(separator) = &self.separator {
            params.insert("separator".into(), json!(separator));
        }
        if let Some((pre, post)) = &self.highlight {
            params.insert("highlight".into(), json!({ "pre_tag": pre, "post_tag": post }));
        }
        self.base.render("phrase", "text", params)
    }
}

/// Prefix completion on a `completion` field
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSuggester {
    base: SuggesterBase,
    fuzzy: Option<Value>,
    skip_duplicates: Option<bool>,
}

impl CompletionSuggester {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: SuggesterBase::new(name),
            fuzzy: None,
            skip_duplicates: None,
        }
    }

    base_setters!();

    pub fn fuzziness(mut self, fuzziness: impl Into<Value>) -> Self {
        self.fuzzy = Some(json!({ "fuzziness": fuzziness.into() }));
        self
    }

    pub fn skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = Some(skip);
        self
    }
}

impl Suggester for CompletionSuggester {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(fuzzy) = &self.fuzzy {
            params.insert("fuzzy".into(), fuzzy.clone());
        }
        if let Some(skip) = self.skip_duplicates {
            params.insert("skip_duplicates".into(), json!(skip));
        }
        self.base.render("completion", "prefix", params)
    }
}

/// One analyzed token of the suggest text and its candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub text: String,
    pub offset: u64,
    pub length: u64,
    #[serde(default)]
    pub options: Vec<SearchSuggestionOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSuggestionOption {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collate_match: Option<bool>,
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub doc_score: Option<f64>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_suggester() {
        let s = TermSuggester::new("my-suggestion")
            .text("tring out Elasticsearch")
            .field("message")
            .suggest_mode("popular");
        assert_eq!(s.name(), "my-suggestion");
        assert_eq!(
            s.source(),
            json!({"text": "tring out Elasticsearch", "term": {"suggest_mode": "popular", "field": "message"}})
        );
    }

    #[test]
    fn test_phrase_and_completion() {
        let p = PhraseSuggester::new("simple_phrase")
            .text("noble prize")
            .field("title.trigram")
            .size(1)
            .gram_size(3)
            .highlight("<em>", "</em>");
        assert_eq!(
            p.source(),
            json!({"text": "noble prize", "phrase": {
                "gram_size": 3,
                "highlight": {"pre_tag": "<em>", "post_tag": "</em>"},
                "field": "title.trigram",
                "size": 1
            }})
        );
        let c = CompletionSuggester::new("song-suggest")
            .text("nir")
            .field("suggest")
            .skip_duplicates(true);
        assert_eq!(
            c.source(),
            json!({"prefix": "nir", "completion": {"skip_duplicates": true, "field": "suggest"}})
        );
    }

    #[test]
    fn test_decode_suggestion() {
        let raw = json!({
            "text": "tring", "offset": 0, "length": 5,
            "options": [{"text": "trying", "score": 0.8, "freq": 1}]
        });
        let s: SearchSuggestion = serde_json::from_value(raw).unwrap();
        assert_eq!(s.length, 5);
        assert_eq!(s.options[0].text, "trying");
        assert_eq!(s.options[0].freq, Some(1));
    }
}
