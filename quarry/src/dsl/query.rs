//! Query builders

use serde_json::{json, Map, Value};
use std::fmt::Debug;

/// Anything that renders to a query clause
pub trait Query: Debug + Send + Sync {
    fn source(&self) -> Value;
}

impl Query for Value {
    fn source(&self) -> Value {
        self.clone()
    }
}

fn insert_opt<T: Into<Value> + Clone>(map: &mut Map<String, Value>, key: &str, value: &Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.clone().into());
    }
}

/// Matches every document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchAllQuery {
    boost: Option<f64>,
}

impl MatchAllQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for MatchAllQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        insert_opt(&mut params, "boost", &self.boost);
        json!({ "match_all": params })
    }
}

/// Full-text match on one field
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    field: String,
    text: Value,
    operator: Option<String>,
    analyzer: Option<String>,
    fuzziness: Option<String>,
    minimum_should_match: Option<String>,
    boost: Option<f64>,
    query_name: Option<String>,
}

impl MatchQuery {
    pub fn new(field: impl Into<String>, text: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            operator: None,
            analyzer: None,
            fuzziness: None,
            minimum_should_match: None,
            boost: None,
            query_name: None,
        }
    }

    /// `and` or `or`
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn fuzziness(mut self, fuzziness: impl Into<String>) -> Self {
        self.fuzziness = Some(fuzziness.into());
        self
    }

    pub fn minimum_should_match(mut self, msm: impl Into<String>) -> Self {
        self.minimum_should_match = Some(msm.into());
        self
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    pub fn query_name(mut self, name: impl Into<String>) -> Self {
        self.query_name = Some(name.into());
        self
    }
}

impl Query for MatchQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert("query".into(), self.text.clone());
        insert_opt(&mut params, "operator", &self.operator);
        insert_opt(&mut params, "analyzer", &self.analyzer);
        insert_opt(&mut params, "fuzziness", &self.fuzziness);
        insert_opt(&mut params, "minimum_should_match", &self.minimum_should_match);
        insert_opt(&mut params, "boost", &self.boost);
        insert_opt(&mut params, "_name", &self.query_name);
        let mut field = Map::new();
        field.insert(self.field.clone(), Value::Object(params));
        json!({ "match": field })
    }
}

/// Phrase match on one field
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPhraseQuery {
    field: String,
    text: Value,
    slop: Option<u32>,
    analyzer: Option<String>,
    boost: Option<f64>,
}

impl MatchPhraseQuery {
    pub fn new(field: impl Into<String>, text: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            slop: None,
            analyzer: None,
            boost: None,
        }
    }

    pub fn slop(mut self, slop: u32) -> Self {
        self.slop = Some(slop);
        self
    }

    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for MatchPhraseQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert("query".into(), self.text.clone());
        insert_opt(&mut params, "slop", &self.slop);
        insert_opt(&mut params, "analyzer", &self.analyzer);
        insert_opt(&mut params, "boost", &self.boost);
        let mut field = Map::new();
        field.insert(self.field.clone(), Value::Object(params));
        json!({ "match_phrase": field })
    }
}

/// Full-text match across several fields
#[derive(Debug, Clone, PartialEq)]
pub struct MultiMatchQuery {
    text: Value,
    fields: Vec<String>,
    typ: Option<String>,
    operator: Option<String>,
    tie_breaker: Option<f64>,
    minimum_should_match: Option<String>,
    boost: Option<f64>,
}

impl MultiMatchQuery {
    pub fn new<S: Into<String>>(text: impl Into<Value>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            text: text.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            typ: None,
            operator: None,
            tie_breaker: None,
            minimum_should_match: None,
            boost: None,
        }
    }

    /// `best_fields`, `most_fields`, `cross_fields`, `phrase` or `phrase_prefix`
    pub fn typ(mut self, typ: impl Into<String>) -> Self {
        self.typ = Some(typ.into());
        self
    }

    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn tie_breaker(mut self, tie_breaker: f64) -> Self {
        self.tie_breaker = Some(tie_breaker);
        self
    }

    pub fn minimum_should_match(mut self, msm: impl Into<String>) -> Self {
        self.minimum_should_match = Some(msm.into());
        self
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for MultiMatchQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert("query".into(), self.text.clone());
        params.insert("fields".into(), json!(self.fields));
        insert_opt(&mut params, "type", &self.typ);
        insert_opt(&mut params, "operator", &self.operator);
        insert_opt(&mut params, "tie_breaker", &self.tie_breaker);
        insert_opt(&mut params, "minimum_should_match", &self.minimum_should_match);
        insert_opt(&mut params, "boost", &self.boost);
        json!({ "multi_match": params })
    }
}

/// Exact value match on an unanalyzed field
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    field: String,
    value: Value,
    boost: Option<f64>,
}

impl TermQuery {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            boost: None,
        }
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for TermQuery {
    fn source(&self) -> Value {
        let mut field = Map::new();
        match self.boost {
            Some(boost) => {
                field.insert(
                    self.field.clone(),
                    json!({ "value": self.value, "boost": boost }),
                );
            }
            None => {
                field.insert(self.field.clone(), self.value.clone());
            }
        }
        json!({ "term": field })
    }
}

/// Matches any of several exact values
#[derive(Debug, Clone, PartialEq)]
pub struct TermsQuery {
    field: String,
    values: Vec<Value>,
    boost: Option<f64>,
}

impl TermsQuery {
    pub fn new<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            boost: None,
        }
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for TermsQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert(self.field.clone(), Value::Array(self.values.clone()));
        insert_opt(&mut params, "boost", &self.boost);
        json!({ "terms": params })
    }
}

/// Range over numbers, dates, or strings
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    field: String,
    from: Option<Value>,
    to: Option<Value>,
    include_lower: bool,
    include_upper: bool,
    format: Option<String>,
    time_zone: Option<String>,
    boost: Option<f64>,
}

impl RangeQuery {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            from: None,
            to: None,
            include_lower: true,
            include_upper: true,
            format: None,
            time_zone: None,
            boost: None,
        }
    }

    pub fn gt(mut self, from: impl Into<Value>) -> Self {
        self.from = Some(from.into());
        self.include_lower = false;
        self
    }

    pub fn gte(mut self, from: impl Into<Value>) -> Self {
        self.from = Some(from.into());
        self.include_lower = true;
        self
    }

    pub fn lt(mut self, to: impl Into<Value>) -> Self {
        self.to = Some(to.into());
        self.include_upper = false;
        self
    }

    pub fn lte(mut self, to: impl Into<Value>) -> Self {
        self.to = Some(to.into());
        self.include_upper = true;
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for RangeQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert("from".into(), self.from.clone().unwrap_or(Value::Null));
        params.insert("to".into(), self.to.clone().unwrap_or(Value::Null));
        params.insert("include_lower".into(), json!(self.include_lower));
        params.insert("include_upper".into(), json!(self.include_upper));
        insert_opt(&mut params, "format", &self.format);
        insert_opt(&mut params, "time_zone", &self.time_zone);
        insert_opt(&mut params, "boost", &self.boost);
        let mut field = Map::new();
        field.insert(self.field.clone(), Value::Object(params));
        json!({ "range": field })
    }
}

/// Documents with any value in `field`
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsQuery {
    field: String,
}

impl ExistsQuery {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl Query for ExistsQuery {
    fn source(&self) -> Value {
        json!({ "exists": { "field": self.field } })
    }
}

/// Documents with the given ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdsQuery {
    types: Vec<String>,
    ids: Vec<String>,
    boost: Option<f64>,
}

impl IdsQuery {
    pub fn new<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for IdsQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        match self.types.len() {
            0 => {}
            1 => {
                params.insert("type".into(), json!(self.types[0]));
            }
            _ => {
                params.insert("type".into(), json!(self.types));
            }
        }
        params.insert("values".into(), json!(self.ids));
        insert_opt(&mut params, "boost", &self.boost);
        json!({ "ids": params })
    }
}

/// Terms starting with a prefix
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixQuery {
    field: String,
    prefix: String,
    boost: Option<f64>,
}

impl PrefixQuery {
    pub fn new(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            prefix: prefix.into(),
            boost: None,
        }
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for PrefixQuery {
    fn source(&self) -> Value {
        let mut field = Map::new();
        match self.boost {
            Some(boost) => {
                field.insert(
                    self.field.clone(),
                    json!({ "prefix": self.prefix, "boost": boost }),
                );
            }
            None => {
                field.insert(self.field.clone(), json!(self.prefix));
            }
        }
        json!({ "prefix": field })
    }
}

/// Terms matching a `*`/`?` pattern
#[derive(Debug, Clone, PartialEq)]
pub struct WildcardQuery {
    field: String,
    wildcard: String,
    boost: Option<f64>,
}

impl WildcardQuery {
    pub fn new(field: impl Into<String>, wildcard: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            wildcard: wildcard.into(),
            boost: None,
        }
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for WildcardQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert("wildcard".into(), json!(self.wildcard));
        insert_opt(&mut params, "boost", &self.boost);
        let mut field = Map::new();
        field.insert(self.field.clone(), Value::Object(params));
        json!({ "wildcard": field })
    }
}

/// Lucene query syntax
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStringQuery {
    query: String,
    default_field: Option<String>,
    fields: Vec<String>,
    default_operator: Option<String>,
    analyzer: Option<String>,
    analyze_wildcard: Option<bool>,
    lenient: Option<bool>,
    boost: Option<f64>,
}

impl QueryStringQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            default_field: None,
            fields: Vec::new(),
            default_operator: None,
            analyzer: None,
            analyze_wildcard: None,
            lenient: None,
            boost: None,
        }
    }

    pub fn default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = Some(field.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
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

    pub fn analyze_wildcard(mut self, enabled: bool) -> Self {
        self.analyze_wildcard = Some(enabled);
        self
    }

    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = Some(lenient);
        self
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }
}

impl Query for QueryStringQuery {
    fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert("query".into(), json!(self.query));
        insert_opt(&mut params, "default_field", &self.default_field);
        if !self.fields.is_empty() {
            params.insert("fields".into(), json!(self.fields));
        }
        insert_opt(&mut params, "default_operator", &self.default_operator);
        insert_opt(&mut params, "analyzer", &self.analyzer);
        insert_opt(&mut params, "analyze_wildcard", &self.analyze_wildcard);
        insert_opt(&mut params, "lenient", &self.lenient);
        insert_opt(&mut params, "boost", &self.boost);
        json!({ "query_string": params })
    }
}

/// Boolean combination of other queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    must: Vec<Value>,
    must_not: Vec<Value>,
    filter: Vec<Value>,
    should: Vec<Value>,
    minimum_should_match: Option<String>,
    boost: Option<f64>,
    query_name: Option<String>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, query: impl Query) -> Self {
        self.must.push(query.source());
        self
    }

    pub fn must_not(mut self, query: impl Query) -> Self {
        self.must_not.push(query.source());
        self
    }

    pub fn filter(mut self, query: impl Query) -> Self {
        self.filter.push(query.source());
        self
    }

    pub fn should(mut self, query: impl Query) -> Self {
        self.should.push(query.source());
        self
    }

    pub fn minimum_should_match(mut self, msm: impl ToString) -> Self {
        self.minimum_should_match = Some(msm.to_string());
        self
    }

    pub fn boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    pub fn query_name(mut self, name: impl Into<String>) -> Self {
        self.query_name = Some(name.into());
        self
    }
}

impl Query for BoolQuery {
    fn source(&self) -> Value {
        // a single clause is rendered as an object, several as an array
        fn clauses(queries: &[Value]) -> Value {
            match queries {
                [single] => single.clone(),
                many => Value::Array(many.to_vec()),
            }
        }

        let mut params = Map::new();
        for (key, queries) in [
            ("must", &self.must),
            ("must_not", &self.must_not),
            ("filter", &self.filter),
            ("should", &self.should),
        ] {
            if !queries.is_empty() {
                params.insert(key.to_string(), clauses(queries));
            }
        }
        insert_opt(&mut params, "minimum_should_match", &self.minimum_should_match);
        insert_opt(&mut params, "boost", &self.boost);
        insert_opt(&mut params, "_name", &self.query_name);
        json!({ "bool": params })
    }
}

/// Pre-built query JSON passed through unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuery(pub Value);

impl std::str::FromStr for RawQuery {
    type Err = crate::error::Error;

    fn from_str(raw: &str) -> crate::error::Result<Self> {
        Ok(Self(serde_json::from_str(raw)?))
    }
}

impl Query for RawQuery {
    fn source(&self) -> Value {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_all() {
        assert_eq!(MatchAllQuery::new().source(), json!({"match_all": {}}));
        assert_eq!(
            MatchAllQuery::new().boost(1.5).source(),
            json!({"match_all": {"boost": 1.5}})
        );
    }

    #[test]
    fn test_match_query() {
        let q = MatchQuery::new("message", "this is a test").operator("and");
        assert_eq!(
            q.source(),
            json!({"match": {"message": {"query": "this is a test", "operator": "and"}}})
        );
    }

    #[test]
    fn test_term_and_terms() {
        assert_eq!(
            TermQuery::new("user", "olivere").source(),
            json!({"term": {"user": "olivere"}})
        );
        assert_eq!(
            TermQuery::new("user", "olivere").boost(2.0).source(),
            json!({"term": {"user": {"value": "olivere", "boost": 2.0}}})
        );
        assert_eq!(
            TermsQuery::new("tags", ["a", "b"]).source(),
            json!({"terms": {"tags": ["a", "b"]}})
        );
    }

    #[test]
    fn test_range_query() {
        let q = RangeQuery::new("age").gte(10).lt(20);
        assert_eq!(
            q.source(),
            json!({"range": {"age": {"from": 10, "to": 20, "include_lower": true, "include_upper": false}}})
        );
    }

    #[test]
    fn test_ids_query() {
        assert_eq!(
            IdsQuery::new(["1", "2"]).types(["tweet"]).source(),
            json!({"ids": {"type": "tweet", "values": ["1", "2"]}})
        );
    }

    #[test]
    fn test_bool_query() {
        let q = BoolQuery::new()
            .must(TermQuery::new("tag", "wow"))
            .must_not(RangeQuery::new("age").gte(10).lte(20))
            .filter(TermQuery::new("account", "1"))
            .should(TermQuery::new("tag", "sometag"))
            .should(TermQuery::new("tag", "sometagtag"))
            .minimum_should_match(1)
            .boost(3.0);
        assert_eq!(
            q.source(),
            json!({"bool": {
                "must": {"term": {"tag": "wow"}},
                "must_not": {"range": {"age": {"from": 10, "to": 20, "include_lower": true, "include_upper": true}}},
                "filter": {"term": {"account": "1"}},
                "should": [{"term": {"tag": "sometag"}}, {"term": {"tag": "sometagtag"}}],
                "minimum_should_match": "1",
                "boost": 3.0
            }})
        );
    }

    #[test]
    fn test_raw_and_query_string() {
        let raw: RawQuery = r#"{"match_all":{}}"#.parse().unwrap();
        assert_eq!(raw.source(), json!({"match_all": {}}));
        assert_eq!(
            QueryStringQuery::new("user:olivere").default_operator("AND").source(),
            json!({"query_string": {"query": "user:olivere", "default_operator": "AND"}})
        );
        assert!("{".parse::<RawQuery>().is_err());
    }

    #[test]
    fn test_prefix_wildcard_exists() {
        assert_eq!(
            PrefixQuery::new("user", "oli").source(),
            json!({"prefix": {"user": "oli"}})
        );
        assert_eq!(
            WildcardQuery::new("user", "ol*e").source(),
            json!({"wildcard": {"user": {"wildcard": "ol*e"}}})
        );
        assert_eq!(
            ExistsQuery::new("user").source(),
            json!({"exists": {"field": "user"}})
        );
    }
}
