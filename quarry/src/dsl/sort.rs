//! Sort clauses

use serde_json::{json, Map, Value};
use std::fmt::Debug;

/// Anything that renders to one entry of a `sort` array
pub trait Sorter: Debug + Send + Sync {
    fn source(&self) -> Value;
}

/// Sort on a document field
#[derive(Debug, Clone, PartialEq)]
pub struct SortInfo {
    field: String,
    ascending: bool,
    missing: Option<Value>,
    unmapped_type: Option<String>,
    mode: Option<String>,
    nested_path: Option<String>,
}

impl SortInfo {
    /// Ascending sort on `field`
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
            missing: None,
            unmapped_type: None,
            mode: None,
            nested_path: None,
        }
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    pub fn desc(self) -> Self {
        self.ascending(false)
    }

    /// `_first`, `_last`, or a substitute value
    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Some(missing.into());
        self
    }

    pub fn unmapped_type(mut self, typ: impl Into<String>) -> Self {
        self.unmapped_type = Some(typ.into());
        self
    }

    /// `min`, `max`, `sum`, `avg` or `median` for multi-valued fields
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn nested_path(mut self, path: impl Into<String>) -> Self {
        self.nested_path = Some(path.into());
        self
    }
}

impl Sorter for SortInfo {
    fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert(
            "order".into(),
            json!(if self.ascending { "asc" } else { "desc" }),
        );
        if let Some(missing) = &self.missing {
            params.insert("missing".into(), missing.clone());
        }
        if let Some(typ) = &self.unmapped_type {
            params.insert("unmapped_type".into(), json!(typ));
        }
        if let Some(mode) = &self.mode {
            params.insert("mode".into(), json!(mode));
        }
        if let Some(path) = &self.nested_path {
            params.insert("nested_path".into(), json!(path));
        }
        let mut sort = Map::new();
        sort.insert(self.field.clone(), Value::Object(params));
        Value::Object(sort)
    }
}

/// Sort on relevance; descending unless reversed
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSort {
    ascending: bool,
}

impl Default for ScoreSort {
    fn default() -> Self {
        Self { ascending: false }
    }
}

impl ScoreSort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self) -> Self {
        self.ascending = true;
        self
    }
}

impl Sorter for ScoreSort {
    fn source(&self) -> Value {
        json!({ "_score": { "order": if self.ascending { "asc" } else { "desc" } } })
    }
}

impl Sorter for Value {
    fn source(&self) -> Value {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_info() {
        assert_eq!(
            SortInfo::new("created").desc().missing("_last").source(),
            json!({"created": {"order": "desc", "missing": "_last"}})
        );
        assert_eq!(
            SortInfo::new("price").mode("avg").unmapped_type("long").source(),
            json!({"price": {"order": "asc", "unmapped_type": "long", "mode": "avg"}})
        );
    }

    #[test]
    fn test_score_sort() {
        assert_eq!(ScoreSort::new().source(), json!({"_score": {"order": "desc"}}));
        assert_eq!(ScoreSort::new().asc().source(), json!({"_score": {"order": "asc"}}));
    }
}
