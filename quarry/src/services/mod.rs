//! Request builders, one per REST endpoint
//!
//! Each service owns a handle to the [`Client`](crate::Client), takes its
//! required path parts up front and optional parameters through chained
//! setters, then sends with `do_request()`:
//!
//! ```ignore
//! let health = client
//!     .cluster_health()
//!     .index("logs")
//!     .wait_for_status("yellow")
//!     .timeout("10s")
//!     .do_request()
//!     .await?;
//! ```
//!
//! Every service exposes `validate()` and `build_url()` so the request
//! can be inspected without sending it.

pub mod aliases;
pub mod bulk;
pub mod bulk_processor;
pub mod cluster;
pub mod count;
pub mod document;
pub mod indices;
pub mod msearch;
pub mod nodes;
pub mod ping;
pub mod reindex;
pub mod scroll;
pub mod search;
pub mod templates;

use crate::error::{Error, Result};
use crate::uritemplates::Params;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shard summary included in most write and search responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardsInfo {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Value>,
}

/// `{"acknowledged": true}` style response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub shards_acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

/// Collects query-string parameters, skipping unset options
#[derive(Debug, Default)]
pub(crate) struct ParamsBuilder {
    params: Params,
}

impl ParamsBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn opt<T: ToString>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.params.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub(crate) fn list(mut self, key: &str, values: &[String]) -> Self {
        if !values.is_empty() {
            self.params.insert(key.to_string(), values.join(","));
        }
        self
    }

    pub(crate) fn pretty(self, pretty: bool) -> Self {
        if pretty {
            self.opt("pretty", Some("true"))
        } else {
            self
        }
    }

    pub(crate) fn build(self) -> Params {
        self.params
    }
}

/// Fail with the names of all missing required parts
pub(crate) fn require(missing: &[(&str, bool)]) -> Result<()> {
    let names: Vec<&str> = missing
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| *name)
        .collect();
    if names.is_empty() {
        return Ok(());
    }
    Err(Error::InvalidArgument(format!(
        "missing required fields: [{}]",
        names.join(", ")
    )))
}
