//! Typed views over the `aggregations` section of a search response

use crate::services::search::SearchHits;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Aggregation results by name, decoded on access
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aggregations(pub Map<String, Value>);

impl Aggregations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The undecoded JSON of an aggregation
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Decode an aggregation into any shape
    pub fn decode<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = self.0.get(name)?;
        serde_json::from_value(raw.clone()).ok()
    }

    pub fn min(&self, name: &str) -> Option<AggregationValueMetric> {
        self.decode(name)
    }

    pub fn max(&self, name: &str) -> Option<AggregationValueMetric> {
        self.decode(name)
    }

    pub fn sum(&self, name: &str) -> Option<AggregationValueMetric> {
        self.decode(name)
    }

    pub fn avg(&self, name: &str) -> Option<AggregationValueMetric> {
        self.decode(name)
    }

    pub fn value_count(&self, name: &str) -> Option<AggregationValueMetric> {
        self.decode(name)
    }

    pub fn cardinality(&self, name: &str) -> Option<AggregationValueMetric> {
        self.decode(name)
    }

    pub fn stats(&self, name: &str) -> Option<AggregationStatsMetric> {
        self.decode(name)
    }

    pub fn extended_stats(&self, name: &str) -> Option<AggregationExtendedStatsMetric> {
        self.decode(name)
    }

    pub fn percentiles(&self, name: &str) -> Option<AggregationPercentilesMetric> {
        self.decode(name)
    }

    pub fn top_hits(&self, name: &str) -> Option<AggregationTopHitsMetric> {
        self.decode(name)
    }

    pub fn global(&self, name: &str) -> Option<AggregationSingleBucket> {
        self.decode(name)
    }

    pub fn filter(&self, name: &str) -> Option<AggregationSingleBucket> {
        self.decode(name)
    }

    pub fn missing(&self, name: &str) -> Option<AggregationSingleBucket> {
        self.decode(name)
    }

    pub fn terms(&self, name: &str) -> Option<AggregationBucketKeyItems> {
        self.decode(name)
    }

    pub fn range(&self, name: &str) -> Option<AggregationBucketRangeItems> {
        self.decode(name)
    }

    pub fn date_range(&self, name: &str) -> Option<AggregationBucketRangeItems> {
        self.decode(name)
    }

    pub fn histogram(&self, name: &str) -> Option<AggregationBucketHistogramItems> {
        self.decode(name)
    }

    pub fn date_histogram(&self, name: &str) -> Option<AggregationBucketHistogramItems> {
        self.decode(name)
    }

    /// Buckets of a filters aggregation, anonymous or named
    pub fn filters(&self, name: &str) -> Option<AggregationBucketFilters> {
        let raw = self.0.get(name)?.as_object()?;
        let meta = raw.get("meta").cloned();
        let buckets: FilterBuckets = serde_json::from_value(raw.get("buckets")?.clone()).ok()?;
        Some(match buckets {
            FilterBuckets::Anonymous(buckets) => AggregationBucketFilters {
                buckets,
                named_buckets: BTreeMap::new(),
                meta,
            },
            FilterBuckets::Named(named_buckets) => AggregationBucketFilters {
                buckets: Vec::new(),
                named_buckets,
                meta,
            },
        })
    }
}

/// Result of a single-value metric (min, max, sum, avg, value_count, cardinality)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationValueMetric {
    /// `None` when no document had the field
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_as_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationStatsMetric {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationExtendedStatsMetric {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub sum: Option<f64>,
    #[serde(default)]
    pub sum_of_squares: Option<f64>,
    #[serde(default)]
    pub variance: Option<f64>,
    #[serde(default)]
    pub std_deviation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Percentile values keyed by percent, e.g. `"99.0"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationPercentilesMetric {
    pub values: BTreeMap<String, Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl AggregationPercentilesMetric {
    /// Value at `percent`, matching keys like `99.0` and `99`
    pub fn value(&self, percent: f64) -> Option<f64> {
        self.values.iter().find_map(|(key, value)| {
            let parsed: f64 = key.parse().ok()?;
            if (parsed - percent).abs() < f64::EPSILON {
                *value
            } else {
                None
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationTopHitsMetric {
    pub hits: SearchHits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Bucket of a single-bucket aggregation (filter, global, missing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSingleBucket {
    pub doc_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub aggregations: Aggregations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucketKeyItems {
    #[serde(default)]
    pub doc_count_error_upper_bound: u64,
    #[serde(default)]
    pub sum_other_doc_count: u64,
    pub buckets: Vec<AggregationBucketKeyItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// One term bucket; `key` is a string or a number depending on the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucketKeyItem {
    pub key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_count_error_upper_bound: Option<u64>,
    #[serde(flatten)]
    pub aggregations: Aggregations,
}

impl AggregationBucketKeyItem {
    /// Key as text, numbers rendered in their JSON form
    pub fn key_string(&self) -> String {
        match &self.key {
            Value::String(s) => s.clone(),
            other => self.key_as_string.clone().unwrap_or_else(|| other.to_string()),
        }
    }
}

impl AggregationBucketKeyItems {
    pub fn bucket(&self, key: &str) -> Option<&AggregationBucketKeyItem> {
        self.buckets.iter().find(|b| b.key_string() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucketRangeItems {
    pub buckets: Vec<AggregationBucketRangeItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucketRangeItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub doc_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_as_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_as_string: Option<String>,
    #[serde(flatten)]
    pub aggregations: Aggregations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucketHistogramItems {
    pub buckets: Vec<AggregationBucketHistogramItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Histogram bucket; date histograms key by epoch millis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucketHistogramItem {
    pub key: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    #[serde(flatten)]
    pub aggregations: Aggregations,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum FilterBuckets {
    Anonymous(Vec<AggregationSingleBucket>),
    Named(BTreeMap<String, AggregationSingleBucket>),
}

/// Filters aggregation; exactly one of the two bucket collections is filled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationBucketFilters {
    pub buckets: Vec<AggregationSingleBucket>,
    pub named_buckets: BTreeMap<String, AggregationSingleBucket>,
    pub meta: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn aggs(raw: Value) -> Aggregations {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_value_metrics() {
        let a = aggs(json!({
            "max_price": {"value": 42.5},
            "empty_min": {"value": null},
            "users": {"value": 7, "meta": {"k": "v"}}
        }));
        assert_eq!(a.max("max_price").unwrap().value, Some(42.5));
        assert_eq!(a.min("empty_min").unwrap().value, None);
        let users = a.cardinality("users").unwrap();
        assert_eq!(users.value, Some(7.0));
        assert_eq!(users.meta, Some(json!({"k": "v"})));
        assert!(a.avg("nope").is_none());
    }

    #[test]
    fn test_stats_and_percentiles() {
        let a = aggs(json!({
            "grades": {"count": 6, "min": 60, "max": 98, "avg": 78.5, "sum": 471},
            "ext": {"count": 0, "min": null, "max": null, "avg": null, "sum": null,
                    "sum_of_squares": null, "variance": null, "std_deviation": null},
            "load": {"values": {"95.0": 60.0, "99.0": 150.0}}
        }));
        let stats = a.stats("grades").unwrap();
        assert_eq!(stats.count, 6);
        assert_eq!(stats.max, Some(98.0));
        let ext = a.extended_stats("ext").unwrap();
        assert_eq!(ext.count, 0);
        assert_eq!(ext.std_deviation, None);
        let load = a.percentiles("load").unwrap();
        assert_eq!(load.value(99.0), Some(150.0));
        assert_eq!(load.value(50.0), None);
    }

    #[test]
    fn test_terms_with_nested_aggregations() {
        let a = aggs(json!({
            "users": {
                "doc_count_error_upper_bound": 0,
                "sum_other_doc_count": 2,
                "buckets": [
                    {"key": "olivere", "doc_count": 2, "retweets": {"value": 108.0}},
                    {"key": 1, "doc_count": 1, "retweets": {"value": 0.0}}
                ]
            }
        }));
        let terms = a.terms("users").unwrap();
        assert_eq!(terms.sum_other_doc_count, 2);
        assert_eq!(terms.buckets.len(), 2);
        let first = terms.bucket("olivere").unwrap();
        assert_eq!(first.doc_count, 2);
        assert_eq!(first.aggregations.avg("retweets").unwrap().value, Some(108.0));
        assert_eq!(terms.buckets[1].key_string(), "1");
    }

    #[test]
    fn test_range_and_histogram() {
        let a = aggs(json!({
            "prices": {"buckets": [
                {"key": "*-50.0", "to": 50.0, "doc_count": 2},
                {"key": "50.0-*", "from": 50.0, "doc_count": 4}
            ]},
            "by_month": {"buckets": [
                {"key_as_string": "2012-01", "key": 1325376000000u64, "doc_count": 1},
                {"key_as_string": "2012-02", "key": 1328054400000u64, "doc_count": 0}
            ]}
        }));
        let prices = a.range("prices").unwrap();
        assert_eq!(prices.buckets[0].to, Some(50.0));
        assert_eq!(prices.buckets[0].from, None);
        assert_eq!(prices.buckets[1].doc_count, 4);
        let months = a.date_histogram("by_month").unwrap();
        assert_eq!(months.buckets.len(), 2);
        assert_eq!(months.buckets[0].key, 1325376000000.0);
        assert_eq!(months.buckets[1].key_as_string.as_deref(), Some("2012-02"));
    }

    #[test]
    fn test_single_bucket_and_filters() {
        let a = aggs(json!({
            "olivere": {"doc_count": 2, "avg_retweets": {"value": 54.0}},
            "anon": {"buckets": [{"doc_count": 1}, {"doc_count": 3}]},
            "named": {"buckets": {"errors": {"doc_count": 4}, "warnings": {"doc_count": 0}}}
        }));
        let filter = a.filter("olivere").unwrap();
        assert_eq!(filter.doc_count, 2);
        assert_eq!(filter.aggregations.avg("avg_retweets").unwrap().value, Some(54.0));
        let anon = a.filters("anon").unwrap();
        assert_eq!(anon.buckets.len(), 2);
        assert!(anon.named_buckets.is_empty());
        let named = a.filters("named").unwrap();
        assert_eq!(named.named_buckets["errors"].doc_count, 4);
        assert!(named.buckets.is_empty());
    }

    #[test]
    fn test_wrong_shape_is_none() {
        let a = aggs(json!({"users": {"value": 3}}));
        assert!(a.terms("users").is_none());
        assert!(a.filters("users").is_none());
    }
}
