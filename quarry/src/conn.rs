//! A single node connection in the client's pool

use parking_lot::RwLock;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Default)]
struct ConnState {
    failures: u32,
    dead: bool,
    dead_since: Option<Instant>,
}

/// A node the client can send requests to
///
/// Health state is shared: the same `Arc<Conn>` survives a sniff as long as
/// the node id is still part of the cluster.
#[derive(Debug)]
pub struct Conn {
    node_id: String,
    url: String,
    state: RwLock<ConnState>,
}

impl Conn {
    pub fn new(node_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            url: url.into(),
            state: RwLock::new(ConnState::default()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_dead(&self) -> bool {
        self.state.read().dead
    }

    /// Number of failures since the connection was last healthy
    pub fn failures(&self) -> u32 {
        self.state.read().failures
    }

    /// When the connection was first marked dead
    pub fn dead_since(&self) -> Option<Instant> {
        self.state.read().dead_since
    }

    pub fn mark_as_dead(&self) {
        let mut state = self.state.write();
        state.dead = true;
        if state.dead_since.is_none() {
            state.dead_since = Some(Instant::now());
        }
        state.failures += 1;
    }

    /// Put the connection back into rotation without forgetting its failures
    pub fn mark_as_alive(&self) {
        self.state.write().dead = false;
    }

    /// Put the connection back into rotation and reset its failure history
    pub fn mark_as_healthy(&self) {
        let mut state = self.state.write();
        state.dead = false;
        state.dead_since = None;
        state.failures = 0;
    }
}

impl fmt::Display for Conn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_dead() { "dead" } else { "alive" };
        write!(f, "{} [{}] ({})", self.node_id, self.url, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conn_is_alive() {
        let conn = Conn::new("node-1", "http://127.0.0.1:9200");
        assert!(!conn.is_dead());
        assert_eq!(conn.failures(), 0);
        assert!(conn.dead_since().is_none());
        assert_eq!(conn.to_string(), "node-1 [http://127.0.0.1:9200] (alive)");
    }

    #[test]
    fn test_mark_dead_then_alive_keeps_failures() {
        let conn = Conn::new("node-1", "http://127.0.0.1:9200");
        conn.mark_as_dead();
        let since = conn.dead_since();
        conn.mark_as_dead();
        assert!(conn.is_dead());
        assert_eq!(conn.failures(), 2);
        assert_eq!(conn.dead_since(), since);

        conn.mark_as_alive();
        assert!(!conn.is_dead());
        assert_eq!(conn.failures(), 2);
    }

    #[test]
    fn test_mark_healthy_resets() {
        let conn = Conn::new("node-1", "http://127.0.0.1:9200");
        conn.mark_as_dead();
        conn.mark_as_healthy();
        assert!(!conn.is_dead());
        assert_eq!(conn.failures(), 0);
        assert!(conn.dead_since().is_none());
    }
}
