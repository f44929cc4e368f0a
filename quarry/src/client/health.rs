//! Node health checks
//!
//! ```text
//! startup:  HEAD each seed URL until one answers 2xx or the timeout elapses
//! periodic: HEAD every pooled node; 2xx → alive, anything else → dead
//! ```

use super::{Client, Inner};
use crate::conn::Conn;
use crate::error::{Error, Result};
use crate::metrics::{record_healthcheck, record_node_dead};
use futures::future::join_all;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

impl Client {
    /// Wait until at least one seed URL responds
    pub(crate) async fn startup_healthcheck(&self, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let pause = timeout.min(Duration::from_secs(1));

        while started.elapsed() < timeout {
            for url in &self.inner.settings.urls {
                let request = self.inner.http.head(url).timeout(timeout);
                match self.apply_auth(request).send().await {
                    Ok(res) if res.status().is_success() => return Ok(()),
                    Ok(res) => debug!("elastic: {} answered {} at startup", url, res.status()),
                    Err(e) => debug!("elastic: {} unreachable at startup: {}", url, e),
                }
            }
            tokio::time::sleep(pause).await;
        }

        Err(Error::NoClient("health check timeout".to_string()))
    }

    /// Ping every pooled connection and update its alive/dead state
    ///
    /// Skipped unless health checks are enabled or `force` is set.
    pub async fn healthcheck(&self, timeout: Duration, force: bool) {
        if !self.inner.settings.healthcheck && !force {
            return;
        }

        let conns = self.conns();
        join_all(conns.iter().map(|conn| self.check_conn(conn, timeout))).await;

        let dead = conns.iter().filter(|c| c.is_dead()).count();
        record_healthcheck(conns.len() - dead, dead);
    }

    async fn check_conn(&self, conn: &Arc<Conn>, timeout: Duration) {
        let request = self.inner.http.head(conn.url()).timeout(timeout);
        match self.apply_auth(request).send().await {
            Ok(res) if res.status().is_success() => {
                if conn.is_dead() {
                    info!("elastic: {} is alive again", conn.url());
                }
                conn.mark_as_alive();
            }
            Ok(res) => {
                warn!(
                    "elastic: {} is dead [status={}]",
                    conn.url(),
                    res.status().as_u16()
                );
                conn.mark_as_dead();
                record_node_dead(conn.node_id());
            }
            Err(e) => {
                warn!("elastic: {} is dead: {}", conn.url(), e);
                conn.mark_as_dead();
                record_node_dead(conn.node_id());
            }
        }
    }
}

pub(super) async fn healthcheck_loop(
    inner: Weak<Inner>,
    mut shutdown_rx: watch::Receiver<bool>,
    interval: Duration,
    timeout: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(client) = Client::from_weak(&inner) else {
                    break;
                };
                client.healthcheck(timeout, true).await;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    debug!("elastic: healthchecker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client_with;

    #[tokio::test]
    async fn test_healthcheck_disabled_without_force() {
        let client = client_with(&["http://127.0.0.1:1"], false);
        client.healthcheck(Duration::from_millis(50), false).await;
        assert!(!client.conns()[0].is_dead());
    }

    #[tokio::test]
    async fn test_forced_healthcheck_marks_unreachable_dead() {
        let client = client_with(&["http://127.0.0.1:1"], false);
        client.healthcheck(Duration::from_millis(200), true).await;
        assert!(client.conns()[0].is_dead());
    }

    #[tokio::test]
    async fn test_startup_healthcheck_times_out() {
        let client = client_with(&["http://127.0.0.1:1"], false);
        let err = client
            .startup_healthcheck(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoClient(ref msg) if msg == "health check timeout"));
    }
}
