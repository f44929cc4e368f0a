//! Cluster-aware Elasticsearch REST client.
//!
//! A [`Client`] keeps a pool of node connections. With sniffing enabled it
//! discovers the cluster's nodes through `/_nodes/http` and refreshes the
//! pool periodically; with health checks enabled it pings dead nodes and
//! brings them back. Requests go round-robin over live nodes and are retried
//! according to the configured [`Retrier`](retry::Retrier).
//!
//! ```ignore
//! let client = quarry::Client::builder()
//!     .url("http://127.0.0.1:9200")
//!     .max_retries(3)
//!     .build()
//!     .await?;
//!
//! let res = client
//!     .search(["twitter"])
//!     .query(quarry::dsl::TermQuery::new("user", "olivere"))
//!     .do_request()
//!     .await?;
//! println!("{} hits", res.total_hits());
//! ```

pub mod client;
pub mod config;
pub mod conn;
pub mod dsl;
pub mod error;
pub mod metrics;
pub mod response;
pub mod retry;
pub mod services;
pub mod uritemplates;

pub use client::{extract_hostname, Client, ClientBuilder, PerformRequestOptions};
pub use config::ClientConfig;
pub use conn::Conn;
pub use error::{ApiError, Error, ErrorDetails, Result};
pub use response::{Body, Response};
pub use services::bulk::{
    BulkDeleteRequest, BulkIndexRequest, BulkResponse, BulkUpdateRequest, BulkableRequest,
};
pub use services::bulk_processor::{BulkProcessor, BulkProcessorStats};
pub use services::search::{SearchHit, SearchResult};
