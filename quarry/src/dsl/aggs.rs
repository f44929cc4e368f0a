//! Aggregation builders
//!
//! Each builder renders to `{"<kind>": {...}, "aggregations": {...}, "meta": {...}}`.
//! Sub-aggregations are rendered when they are attached.

use super::highlight::Highlight;
use super::query::Query;
use super::sort::Sorter;
use super::source::FetchSourceContext;
use super::Script;
use serde_json::{json, Map, Value};
use std::fmt::Debug;

/// Anything that renders to an aggregation clause
pub trait Aggregation: Debug + Send + Sync {
    fn source(&self) -> Value;
}

impl Aggregation for Value {
    fn source(&self) -> Value {
        self.clone()
    }
}

fn wrap(
    kind: &str,
    params: Map<String, Value>,
    subaggs: &Map<String, Value>,
    meta: &Option<Value>,
) -> Value {
    let mut agg = Map::new();
    agg.insert(kind.to_string(), Value::Object(params));
    if !subaggs.is_empty() {
        agg.insert("aggregations".to_string(), Value::Object(subaggs.clone()));
    }
    if let Some(meta) = meta {
        agg.insert("meta".to_string(), meta.clone());
    }
    Value::Object(agg)
}

macro_rules! meta_setter {
    () => {
        /// Free-form metadata echoed back in the response
        pub fn meta(mut self, meta: Value) -> Self {
            self.meta = Some(meta);
            self
        }
    };
}

macro_rules! sub_aggregation_setter {
    () => {
        pub fn sub_aggregation(mut self, name: impl Into<String>, agg: impl Aggregation) -> Self {
            self.subaggs.insert(name.into(), agg.source());
            self
        }
    };
}

macro_rules! metric_aggregation {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            field: Option<String>,
            script: Option<Script>,
            missing: Option<Value>,
            format: Option<String>,
            subaggs: Map<String, Value>,
            meta: Option<Value>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn field(mut self, field: impl Into<String>) -> Self {
                self.field = Some(field.into());
                self
            }

            pub fn script(mut self, script: Script) -> Self {
                self.script = Some(script);
                self
            }

            /// Value used for documents without the field
            pub fn missing(mut self, missing: impl Into<Value>) -> Self {
                self.missing = Some(missing.into());
                self
            }

            pub fn format(mut self, format: impl Into<String>) -> Self {
                self.format = Some(format.into());
                self
            }

            sub_aggregation_setter!();
            meta_setter!();
        }

        impl Aggregation for $name {
            fn source(&self) -> Value {
                let mut params = Map::new();
                if let Some(field) = &self.field {
                    params.insert("field".into(), json!(field));
                }
                if let Some(script) = &self.script {
                    params.insert("script".into(), script.source());
                }
                if let Some(missing) = &self.missing {
                    params.insert("missing".into(), missing.clone());
                }
                if let Some(format) = &self.format {
                    params.insert("format".into(), json!(format));
                }
                wrap($kind, params, &self.subaggs, &self.meta)
            }
        }
    };
}

metric_aggregation!(
    /// Minimum of a numeric field
    MinAggregation,
    "min"
);
metric_aggregation!(MaxAggregation, "max");
metric_aggregation!(SumAggregation, "sum");
metric_aggregation!(AvgAggregation, "avg");
metric_aggregation!(
    /// Number of values extracted, not the number of documents
    ValueCountAggregation,
    "value_count"
);
metric_aggregation!(
    /// count, min, max, avg and sum in one pass
    StatsAggregation,
    "stats"
);
metric_aggregation!(ExtendedStatsAggregation, "extended_stats");

/// Approximate distinct count
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardinalityAggregation {
    field: Option<String>,
    script: Option<Script>,
    missing: Option<Value>,
    precision_threshold: Option<u64>,
    rehash: Option<bool>,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl CardinalityAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Some(missing.into());
        self
    }

    pub fn precision_threshold(mut self, threshold: u64) -> Self {
        self.precision_threshold = Some(threshold);
        self
    }

    pub fn rehash(mut self, rehash: bool) -> Self {
        self.rehash = Some(rehash);
        self
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for CardinalityAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(field) = &self.field {
            params.insert("field".into(), json!(field));
        }
        if let Some(script) = &self.script {
            params.insert("script".into(), script.source());
        }
        if let Some(missing) = &self.missing {
            params.insert("missing".into(), missing.clone());
        }
        if let Some(threshold) = self.precision_threshold {
            params.insert("precision_threshold".into(), json!(threshold));
        }
        if let Some(rehash) = self.rehash {
            params.insert("rehash".into(), json!(rehash));
        }
        wrap("cardinality", params, &self.subaggs, &self.meta)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PercentilesAggregation {
    field: Option<String>,
    script: Option<Script>,
    missing: Option<Value>,
    percentiles: Vec<f64>,
    keyed: Option<bool>,
    compression: Option<f64>,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl PercentilesAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Some(missing.into());
        self
    }

    pub fn percentiles(mut self, percentiles: impl IntoIterator<Item = f64>) -> Self {
        self.percentiles.extend(percentiles);
        self
    }

    pub fn keyed(mut self, keyed: bool) -> Self {
        self.keyed = Some(keyed);
        self
    }

    /// TDigest compression
    pub fn compression(mut self, compression: f64) -> Self {
        self.compression = Some(compression);
        self
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for PercentilesAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(field) = &self.field {
            params.insert("field".into(), json!(field));
        }
        if let Some(script) = &self.script {
            params.insert("script".into(), script.source());
        }
        if let Some(missing) = &self.missing {
            params.insert("missing".into(), missing.clone());
        }
        if !self.percentiles.is_empty() {
            params.insert("percents".into(), json!(self.percentiles));
        }
        if let Some(keyed) = self.keyed {
            params.insert("keyed".into(), json!(keyed));
        }
        if let Some(compression) = self.compression {
            params.insert("tdigest".into(), json!({ "compression": compression }));
        }
        wrap("percentiles", params, &self.subaggs, &self.meta)
    }
}

/// One bucket per unique term
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermsAggregation {
    field: Option<String>,
    script: Option<Script>,
    missing: Option<Value>,
    size: Option<u32>,
    shard_size: Option<u32>,
    min_doc_count: Option<u64>,
    include: Option<String>,
    exclude: Option<String>,
    order: Vec<Value>,
    execution_hint: Option<String>,
    collect_mode: Option<String>,
    show_term_doc_count_error: Option<bool>,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl TermsAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Some(missing.into());
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn shard_size(mut self, shard_size: u32) -> Self {
        self.shard_size = Some(shard_size);
        self
    }

    pub fn min_doc_count(mut self, min_doc_count: u64) -> Self {
        self.min_doc_count = Some(min_doc_count);
        self
    }

    /// Regex of terms to include
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    /// Order buckets by `key`, `_count`, `_term`, or a sub-aggregation path
    pub fn order(mut self, key: impl Into<String>, ascending: bool) -> Self {
        let mut order = Map::new();
        order.insert(key.into(), json!(if ascending { "asc" } else { "desc" }));
        self.order.push(Value::Object(order));
        self
    }

    pub fn order_by_count(self, ascending: bool) -> Self {
        self.order("_count", ascending)
    }

    pub fn order_by_term(self, ascending: bool) -> Self {
        self.order("_term", ascending)
    }

    pub fn execution_hint(mut self, hint: impl Into<String>) -> Self {
        self.execution_hint = Some(hint.into());
        self
    }

    /// `breadth_first` or `depth_first`
    pub fn collect_mode(mut self, mode: impl Into<String>) -> Self {
        self.collect_mode = Some(mode.into());
        self
    }

    pub fn show_term_doc_count_error(mut self, show: bool) -> Self {
        self.show_term_doc_count_error = Some(show);
        self
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for TermsAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(field) = &self.field {
            params.insert("field".into(), json!(field));
        }
        if let Some(script) = &self.script {
            params.insert("script".into(), script.source());
        }
        if let Some(missing) = &self.missing {
            params.insert("missing".into(), missing.clone());
        }
        if let Some(size) = self.size {
            params.insert("size".into(), json!(size));
        }
        if let Some(shard_size) = self.shard_size {
            params.insert("shard_size".into(), json!(shard_size));
        }
        if let Some(min) = self.min_doc_count {
            params.insert("min_doc_count".into(), json!(min));
        }
        if let Some(include) = &self.include {
            params.insert("include".into(), json!(include));
        }
        if let Some(exclude) = &self.exclude {
            params.insert("exclude".into(), json!(exclude));
        }
        match self.order.as_slice() {
            [] => {}
            [single] => {
                params.insert("order".into(), single.clone());
            }
            many => {
                params.insert("order".into(), Value::Array(many.to_vec()));
            }
        }
        if let Some(hint) = &self.execution_hint {
            params.insert("execution_hint".into(), json!(hint));
        }
        if let Some(mode) = &self.collect_mode {
            params.insert("collect_mode".into(), json!(mode));
        }
        if let Some(show) = self.show_term_doc_count_error {
            params.insert("show_term_doc_count_error".into(), json!(show));
        }
        wrap("terms", params, &self.subaggs, &self.meta)
    }
}

/// Fixed-width numeric buckets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramAggregation {
    field: Option<String>,
    interval: Option<f64>,
    offset: Option<f64>,
    min_doc_count: Option<u64>,
    extended_bounds: Option<(Option<f64>, Option<f64>)>,
    keyed: Option<bool>,
    missing: Option<Value>,
    order: Option<Value>,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl HistogramAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn min_doc_count(mut self, min_doc_count: u64) -> Self {
        self.min_doc_count = Some(min_doc_count);
        self
    }

    pub fn extended_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.extended_bounds = Some((min, max));
        self
    }

    pub fn keyed(mut self, keyed: bool) -> Self {
        self.keyed = Some(keyed);
        self
    }

    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Some(missing.into());
        self
    }

    pub fn order(mut self, key: impl Into<String>, ascending: bool) -> Self {
        let mut order = Map::new();
        order.insert(key.into(), json!(if ascending { "asc" } else { "desc" }));
        self.order = Some(Value::Object(order));
        self
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for HistogramAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(field) = &self.field {
            params.insert("field".into(), json!(field));
        }
        if let Some(interval) = self.interval {
            params.insert("interval".into(), json!(interval));
        }
        if let Some(offset) = self.offset {
            params.insert("offset".into(), json!(offset));
        }
        if let Some(min) = self.min_doc_count {
            params.insert("min_doc_count".into(), json!(min));
        }
        if let Some((min, max)) = self.extended_bounds {
            params.insert("extended_bounds".into(), bounds(min.map(Value::from), max.map(Value::from)));
        }
        if let Some(keyed) = self.keyed {
            params.insert("keyed".into(), json!(keyed));
        }
        if let Some(missing) = &self.missing {
            params.insert("missing".into(), missing.clone());
        }
        if let Some(order) = &self.order {
            params.insert("order".into(), order.clone());
        }
        wrap("histogram", params, &self.subaggs, &self.meta)
    }
}

fn bounds(min: Option<Value>, max: Option<Value>) -> Value {
    let mut b = Map::new();
    if let Some(min) = min {
        b.insert("min".into(), min);
    }
    if let Some(max) = max {
        b.insert("max".into(), max);
    }
    Value::Object(b)
}

/// Calendar or fixed interval date buckets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateHistogramAggregation {
    field: Option<String>,
    interval: Option<String>,
    format: Option<String>,
    time_zone: Option<String>,
    offset: Option<String>,
    min_doc_count: Option<u64>,
    extended_bounds: Option<(Option<Value>, Option<Value>)>,
    missing: Option<Value>,
    order: Option<Value>,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl DateHistogramAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// `year`, `quarter`, `month`, `week`, `day`, `hour`, `minute`,
    /// `second`, or a time value like `90m`
    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
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

    pub fn offset(mut self, offset: impl Into<String>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    pub fn min_doc_count(mut self, min_doc_count: u64) -> Self {
        self.min_doc_count = Some(min_doc_count);
        self
    }

    pub fn extended_bounds(mut self, min: Option<Value>, max: Option<Value>) -> Self {
        self.extended_bounds = Some((min, max));
        self
    }

    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Some(missing.into());
        self
    }

    pub fn order(mut self, key: impl Into<String>, ascending: bool) -> Self {
        let mut order = Map::new();
        order.insert(key.into(), json!(if ascending { "asc" } else { "desc" }));
        self.order = Some(Value::Object(order));
        self
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for DateHistogramAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(field) = &self.field {
            params.insert("field".into(), json!(field));
        }
        if let Some(interval) = &self.interval {
            params.insert("interval".into(), json!(interval));
        }
        if let Some(format) = &self.format {
            params.insert("format".into(), json!(format));
        }
        if let Some(time_zone) = &self.time_zone {
            params.insert("time_zone".into(), json!(time_zone));
        }
        if let Some(offset) = &self.offset {
            params.insert("offset".into(), json!(offset));
        }
        if let Some(min) = self.min_doc_count {
            params.insert("min_doc_count".into(), json!(min));
        }
        if let Some((min, max)) = &self.extended_bounds {
            params.insert("extended_bounds".into(), bounds(min.clone(), max.clone()));
        }
        if let Some(missing) = &self.missing {
            params.insert("missing".into(), missing.clone());
        }
        if let Some(order) = &self.order {
            params.insert("order".into(), order.clone());
        }
        wrap("date_histogram", params, &self.subaggs, &self.meta)
    }
}

/// User-defined ranges; `date_range` when built with [`RangeAggregation::dates`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeAggregation {
    kind: &'static str,
    field: Option<String>,
    script: Option<Script>,
    missing: Option<Value>,
    format: Option<String>,
    keyed: Option<bool>,
    ranges: Vec<Value>,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl RangeAggregation {
    pub fn new() -> Self {
        Self {
            kind: "range",
            ..Default::default()
        }
    }

    pub fn dates() -> Self {
        Self {
            kind: "date_range",
            ..Default::default()
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Some(missing.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn keyed(mut self, keyed: bool) -> Self {
        self.keyed = Some(keyed);
        self
    }

    /// Add a range; either bound may be open
    pub fn add_range(self, from: Option<Value>, to: Option<Value>) -> Self {
        self.push_range(None, from, to)
    }

    pub fn add_range_with_key(
        self,
        key: impl Into<String>,
        from: Option<Value>,
        to: Option<Value>,
    ) -> Self {
        self.push_range(Some(key.into()), from, to)
    }

    pub fn add_unbounded_from(self, to: impl Into<Value>) -> Self {
        self.push_range(None, None, Some(to.into()))
    }

    pub fn add_unbounded_to(self, from: impl Into<Value>) -> Self {
        self.push_range(None, Some(from.into()), None)
    }

    fn push_range(mut self, key: Option<String>, from: Option<Value>, to: Option<Value>) -> Self {
        let mut range = Map::new();
        if let Some(key) = key {
            range.insert("key".into(), json!(key));
        }
        if let Some(from) = from {
            range.insert("from".into(), from);
        }
        if let Some(to) = to {
            range.insert("to".into(), to);
        }
        self.ranges.push(Value::Object(range));
        self
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for RangeAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(field) = &self.field {
            params.insert("field".into(), json!(field));
        }
        if let Some(script) = &self.script {
            params.insert("script".into(), script.source());
        }
        if let Some(missing) = &self.missing {
            params.insert("missing".into(), missing.clone());
        }
        if let Some(format) = &self.format {
            params.insert("format".into(), json!(format));
        }
        if let Some(keyed) = self.keyed {
            params.insert("keyed".into(), json!(keyed));
        }
        params.insert("ranges".into(), Value::Array(self.ranges.clone()));
        let kind = if self.kind.is_empty() { "range" } else { self.kind };
        wrap(kind, params, &self.subaggs, &self.meta)
    }
}

/// Single bucket of documents matching a query
#[derive(Debug, Clone, PartialEq)]
pub struct FilterAggregation {
    filter: Value,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl FilterAggregation {
    pub fn new(filter: impl Query) -> Self {
        Self {
            filter: filter.source(),
            subaggs: Map::new(),
            meta: None,
        }
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for FilterAggregation {
    fn source(&self) -> Value {
        let mut agg = Map::new();
        agg.insert("filter".into(), self.filter.clone());
        if !self.subaggs.is_empty() {
            agg.insert("aggregations".into(), Value::Object(self.subaggs.clone()));
        }
        if let Some(meta) = &self.meta {
            agg.insert("meta".into(), meta.clone());
        }
        Value::Object(agg)
    }
}

/// One bucket per filter; anonymous filters render as an array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltersAggregation {
    unnamed: Vec<Value>,
    named: Map<String, Value>,
    other_bucket_key: Option<String>,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl FiltersAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Query) -> Self {
        self.unnamed.push(filter.source());
        self
    }

    pub fn filter_with_name(mut self, name: impl Into<String>, filter: impl Query) -> Self {
        self.named.insert(name.into(), filter.source());
        self
    }

    pub fn other_bucket_key(mut self, key: impl Into<String>) -> Self {
        self.other_bucket_key = Some(key.into());
        self
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for FiltersAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if !self.named.is_empty() {
            params.insert("filters".into(), Value::Object(self.named.clone()));
        } else {
            params.insert("filters".into(), Value::Array(self.unnamed.clone()));
        }
        if let Some(key) = &self.other_bucket_key {
            params.insert("other_bucket_key".into(), json!(key));
        }
        wrap("filters", params, &self.subaggs, &self.meta)
    }
}

/// Bucket of documents lacking a value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingAggregation {
    field: Option<String>,
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl MissingAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for MissingAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(field) = &self.field {
            params.insert("field".into(), json!(field));
        }
        wrap("missing", params, &self.subaggs, &self.meta)
    }
}

/// Bucket of every document, ignoring the search query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalAggregation {
    subaggs: Map<String, Value>,
    meta: Option<Value>,
}

impl GlobalAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    sub_aggregation_setter!();
    meta_setter!();
}

impl Aggregation for GlobalAggregation {
    fn source(&self) -> Value {
        wrap("global", Map::new(), &self.subaggs, &self.meta)
    }
}

/// Best matching hits per bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopHitsAggregation {
    from: Option<u32>,
    size: Option<u32>,
    sort: Vec<Value>,
    fetch_source: Option<FetchSourceContext>,
    highlight: Option<Highlight>,
    explain: Option<bool>,
    version: Option<bool>,
    track_scores: Option<bool>,
    stored_fields: Vec<String>,
    docvalue_fields: Vec<String>,
    meta: Option<Value>,
}

impl TopHitsAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: u32) -> Self {
        self.from = Some(from);
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn sort_by(mut self, sorter: impl Sorter) -> Self {
        self.sort.push(sorter.source());
        self
    }

    pub fn sort(self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort_by(super::sort::SortInfo::new(field).ascending(ascending))
    }

    pub fn fetch_source_context(mut self, ctx: FetchSourceContext) -> Self {
        self.fetch_source = Some(ctx);
        self
    }

    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
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

    pub fn track_scores(mut self, track: bool) -> Self {
        self.track_scores = Some(track);
        self
    }

    pub fn stored_field(mut self, field: impl Into<String>) -> Self {
        self.stored_fields.push(field.into());
        self
    }

    pub fn docvalue_field(mut self, field: impl Into<String>) -> Self {
        self.docvalue_fields.push(field.into());
        self
    }

    meta_setter!();
}

impl Aggregation for TopHitsAggregation {
    fn source(&self) -> Value {
        let mut params = Map::new();
        if let Some(from) = self.from {
            params.insert("from".into(), json!(from));
        }
        if let Some(size) = self.size {
            params.insert("size".into(), json!(size));
        }
        if !self.sort.is_empty() {
            params.insert("sort".into(), Value::Array(self.sort.clone()));
        }
        if let Some(ctx) = &self.fetch_source {
            params.insert("_source".into(), ctx.source());
        }
        if let Some(highlight) = &self.highlight {
            params.insert("highlight".into(), highlight.source());
        }
        if let Some(explain) = self.explain {
            params.insert("explain".into(), json!(explain));
        }
        if let Some(version) = self.version {
            params.insert("version".into(), json!(version));
        }
        if let Some(track) = self.track_scores {
            params.insert("track_scores".into(), json!(track));
        }
        if !self.stored_fields.is_empty() {
            params.insert("stored_fields".into(), json!(self.stored_fields));
        }
        if !self.docvalue_fields.is_empty() {
            params.insert("docvalue_fields".into(), json!(self.docvalue_fields));
        }
        wrap("top_hits", params, &Map::new(), &self.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::query::TermQuery;

    #[test]
    fn test_metric_aggregations() {
        assert_eq!(
            MaxAggregation::new().field("price").source(),
            json!({"max": {"field": "price"}})
        );
        assert_eq!(
            AvgAggregation::new()
                .field("grade")
                .missing(10)
                .meta(json!({"name": "agg"}))
                .source(),
            json!({"avg": {"field": "grade", "missing": 10}, "meta": {"name": "agg"}})
        );
        assert_eq!(
            CardinalityAggregation::new()
                .field("author")
                .precision_threshold(100)
                .source(),
            json!({"cardinality": {"field": "author", "precision_threshold": 100}})
        );
        assert_eq!(
            PercentilesAggregation::new()
                .field("load_time")
                .percentiles([95.0, 99.0])
                .source(),
            json!({"percentiles": {"field": "load_time", "percents": [95.0, 99.0]}})
        );
    }

    #[test]
    fn test_terms_with_sub_aggregation() {
        let agg = TermsAggregation::new()
            .field("user")
            .size(10)
            .order_by_count(false)
            .sub_aggregation("avg_retweets", AvgAggregation::new().field("retweets"));
        assert_eq!(
            agg.source(),
            json!({
                "terms": {"field": "user", "size": 10, "order": {"_count": "desc"}},
                "aggregations": {"avg_retweets": {"avg": {"field": "retweets"}}}
            })
        );
    }

    #[test]
    fn test_range_aggregations() {
        let agg = RangeAggregation::new()
            .field("price")
            .add_unbounded_from(50)
            .add_range(Some(json!(50)), Some(json!(100)))
            .add_unbounded_to(100);
        assert_eq!(
            agg.source(),
            json!({"range": {"field": "price", "ranges": [
                {"to": 50}, {"from": 50, "to": 100}, {"from": 100}
            ]}})
        );
        let dates = RangeAggregation::dates()
            .field("created")
            .add_range_with_key("old", None, Some(json!("2012-01-01")));
        assert_eq!(
            dates.source(),
            json!({"date_range": {"field": "created", "ranges": [
                {"key": "old", "to": "2012-01-01"}
            ]}})
        );
    }

    #[test]
    fn test_histograms() {
        assert_eq!(
            HistogramAggregation::new()
                .field("price")
                .interval(50.0)
                .min_doc_count(0)
                .source(),
            json!({"histogram": {"field": "price", "interval": 50.0, "min_doc_count": 0}})
        );
        assert_eq!(
            DateHistogramAggregation::new()
                .field("created")
                .interval("month")
                .format("yyyy-MM")
                .source(),
            json!({"date_histogram": {"field": "created", "interval": "month", "format": "yyyy-MM"}})
        );
    }

    #[test]
    fn test_filter_and_filters() {
        let agg = FilterAggregation::new(TermQuery::new("user", "olivere"))
            .sub_aggregation("avg_price", AvgAggregation::new().field("price"));
        assert_eq!(
            agg.source(),
            json!({
                "filter": {"term": {"user": "olivere"}},
                "aggregations": {"avg_price": {"avg": {"field": "price"}}}
            })
        );
        let named = FiltersAggregation::new()
            .filter_with_name("errors", TermQuery::new("body", "error"))
            .filter_with_name("warnings", TermQuery::new("body", "warning"));
        assert_eq!(
            named.source(),
            json!({"filters": {"filters": {
                "errors": {"term": {"body": "error"}},
                "warnings": {"term": {"body": "warning"}}
            }}})
        );
        let unnamed = FiltersAggregation::new().filter(TermQuery::new("body", "error"));
        assert_eq!(
            unnamed.source(),
            json!({"filters": {"filters": [{"term": {"body": "error"}}]}})
        );
    }

    #[test]
    fn test_global_missing_top_hits() {
        assert_eq!(
            GlobalAggregation::new()
                .sub_aggregation("all", ValueCountAggregation::new().field("id"))
                .source(),
            json!({"global": {}, "aggregations": {"all": {"value_count": {"field": "id"}}}})
        );
        assert_eq!(
            MissingAggregation::new().field("price").source(),
            json!({"missing": {"field": "price"}})
        );
        assert_eq!(
            TopHitsAggregation::new()
                .size(1)
                .sort("last_activity", false)
                .fetch_source_context(FetchSourceContext::new(true).include(["title"]))
                .source(),
            json!({"top_hits": {
                "size": 1,
                "sort": [{"last_activity": {"order": "desc"}}],
                "_source": {"includes": ["title"]}
            }})
        );
    }
}
