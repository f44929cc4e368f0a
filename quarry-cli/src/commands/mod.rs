pub mod bulk;
pub mod cluster;
pub mod indices;
pub mod reindex;
pub mod search;

pub use bulk::run_bulk;
pub use cluster::{run_health, run_nodes, run_ping};
pub use indices::{run_create_index, run_delete_index, run_index_exists, run_refresh};
pub use reindex::run_reindex;
pub use search::{run_count, run_search};
