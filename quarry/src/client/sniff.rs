//! Node discovery through the nodes info API

use super::{Client, Inner};
use crate::conn::Conn;
use crate::error::{Error, Result};
use crate::metrics::record_sniff;
use crate::services::nodes::NodesInfoResponse;
use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// `inet[/127.0.0.1:9200]` and `inet[hostname/127.0.0.1:9200]`
static INET_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^:]*):([0-9]+)\]").expect("static pattern"));

/// Turn a published HTTP address into a URL
///
/// Returns an empty string when the address has no port.
pub fn extract_hostname(scheme: &str, address: &str) -> String {
    if address.starts_with("inet") {
        return match INET_ADDRESS.captures(address) {
            Some(caps) => format!("{}://{}:{}", scheme, &caps[1], &caps[2]),
            None => String::new(),
        };
    }

    let host = match address.find('/') {
        Some(idx) => &address[idx + 1..],
        None => address,
    };
    if !host.contains(':') {
        return String::new();
    }
    format!("{}://{}", scheme, host)
}

impl Client {
    /// Replace the pool with the nodes currently published by the cluster
    ///
    /// Every seed URL and every alive connection is asked concurrently; the
    /// first node list that yields at least one connection wins.
    pub async fn sniff(&self, timeout: Duration) -> Result<()> {
        if !self.inner.settings.sniff {
            return Ok(());
        }

        let mut urls = self.inner.settings.urls.clone();
        for conn in self.conns() {
            if !conn.is_dead() && !urls.iter().any(|u| u == conn.url()) {
                urls.push(conn.url().to_string());
            }
        }
        if urls.is_empty() {
            return Err(Error::NoClient("no URLs found".to_string()));
        }

        let attempt = async {
            let mut pending: FuturesUnordered<_> =
                urls.iter().map(|url| self.sniff_node(url)).collect();
            while let Some(conns) = pending.next().await {
                if !conns.is_empty() {
                    return Some(conns);
                }
            }
            None
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Some(conns)) => {
                record_sniff(true);
                self.update_conns(conns);
                self.record_pool();
                Ok(())
            }
            Ok(None) => {
                record_sniff(false);
                Err(Error::NoClient("no nodes found while sniffing".to_string()))
            }
            Err(_) => {
                record_sniff(false);
                Err(Error::NoClient("sniff timeout".to_string()))
            }
        }
    }

    /// Ask one node for the cluster's HTTP-enabled nodes
    async fn sniff_node(&self, url: &str) -> Vec<Conn> {
        let request = self.inner.http.get(format!("{}/_nodes/http", url));
        let res = match self.apply_auth(request).send().await {
            Ok(res) if res.status().is_success() => res,
            Ok(res) => {
                debug!("elastic: sniffing {} returned {}", url, res.status());
                return Vec::new();
            }
            Err(e) => {
                debug!("elastic: sniffing {} failed: {}", url, e);
                return Vec::new();
            }
        };

        let info: NodesInfoResponse = match res.json().await {
            Ok(info) => info,
            Err(e) => {
                warn!("elastic: cannot decode nodes info from {}: {}", url, e);
                return Vec::new();
            }
        };

        let scheme = &self.inner.settings.scheme;
        let mut conns = Vec::new();
        for (node_id, node) in &info.nodes {
            if !(self.inner.sniffer_callback)(node) {
                continue;
            }
            let Some(address) = node.http.as_ref().map(|h| h.publish_address.as_str()) else {
                continue;
            };
            let url = extract_hostname(scheme, address);
            if !url.is_empty() {
                conns.push(Conn::new(node_id.clone(), url));
            }
        }
        conns
    }

    /// Swap in a new node list, keeping health state for known nodes
    pub(crate) fn update_conns(&self, conns: Vec<Conn>) {
        let mut pool = self.inner.pool.write();
        let known: HashMap<&str, &Arc<Conn>> =
            pool.conns.iter().map(|c| (c.node_id(), c)).collect();

        let mut next = Vec::with_capacity(conns.len());
        for conn in conns {
            match known.get(conn.node_id()) {
                Some(existing) => next.push(Arc::clone(existing)),
                None => {
                    info!("elastic: {} joined the cluster", conn.url());
                    next.push(Arc::new(conn));
                }
            }
        }

        for old in &pool.conns {
            if !next.iter().any(|c| c.node_id() == old.node_id()) {
                info!("elastic: {} left the cluster", old.url());
            }
        }

        pool.conns = next;
        pool.cursor = 0;
    }
}

pub(super) async fn sniffer_loop(
    inner: Weak<Inner>,
    mut shutdown_rx: watch::Receiver<bool>,
    interval: Duration,
    timeout: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // the first tick fires immediately and the pool was just sniffed
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(client) = Client::from_weak(&inner) else {
                    break;
                };
                if let Err(e) = client.sniff(timeout).await {
                    warn!("elastic: periodic sniff failed: {}", e);
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    debug!("elastic: sniffer stopped");
}
