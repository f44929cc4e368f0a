//! Cluster-aware HTTP client
//!
//! A [`Client`] keeps a pool of node connections. Requests are spread over
//! the live nodes round-robin; nodes that fail are marked dead and skipped
//! until a health check brings them back.
//!
//! ```text
//! seed URLs ──startup healthcheck──▶ sniff (/_nodes/http) ──▶ pool
//!                                                             │
//!     periodic sniffer (15m) ─── replaces node list ──────────┤
//!     periodic healthcheck (60s) ─── alive/dead per node ─────┘
//! ```

mod health;
mod sniff;

pub use sniff::extract_hostname;

use crate::config::ClientConfig;
use crate::conn::Conn;
use crate::error::{Error, Result};
use crate::metrics::{record_node_dead, record_pool_size, record_retry, RequestTimer};
use crate::response::{check_response, Body, Response};
use crate::retry::{max_retries, Retrier, RetryDecision};
use crate::services::nodes::NodesInfoNode;
use crate::uritemplates::{with_params, Params};
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::Method;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Decides whether a sniffed node joins the pool
pub type SnifferCallback = Arc<dyn Fn(&NodesInfoNode) -> bool + Send + Sync>;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Settings fixed at build time
#[derive(Debug, Clone)]
struct Settings {
    urls: Vec<String>,
    scheme: String,
    basic_auth: Option<(String, String)>,
    sniff: bool,
    sniffer_timeout_startup: Duration,
    sniffer_timeout: Duration,
    sniffer_interval: Duration,
    healthcheck: bool,
    healthcheck_timeout_startup: Duration,
    healthcheck_timeout: Duration,
    healthcheck_interval: Duration,
    gzip: bool,
    send_get_body_as: Method,
    required_plugins: Vec<String>,
}

#[derive(Default)]
struct Pool {
    conns: Vec<Arc<Conn>>,
    cursor: usize,
}

struct BackgroundTasks {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

struct Inner {
    http: reqwest::Client,
    pool: RwLock<Pool>,
    settings: Settings,
    retrier: Arc<dyn Retrier>,
    sniffer_callback: SnifferCallback,
    tasks: Mutex<Option<BackgroundTasks>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(tasks) = self.tasks.get_mut().take() {
            let _ = tasks.shutdown_tx.send(true);
        }
    }
}

/// Elasticsearch client. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

/// Everything needed to send one request through the pool
#[derive(Debug, Clone)]
pub struct PerformRequestOptions {
    pub method: Method,
    pub path: String,
    pub params: Params,
    pub body: Option<Body>,
    /// Statuses that are returned as responses instead of errors
    pub ignore_errors: Vec<u16>,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
}

impl PerformRequestOptions {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            body: None,
            ignore_errors: Vec::new(),
            content_type: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn ignore_errors(mut self, statuses: &[u16]) -> Self {
        self.ignore_errors = statuses.to_vec();
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    config: ClientConfig,
    http: Option<reqwest::Client>,
    retrier: Option<Arc<dyn Retrier>>,
    sniffer_callback: Option<SnifferCallback>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            http: None,
            retrier: None,
            sniffer_callback: None,
        }
    }

    pub fn url(self, url: impl Into<String>) -> Self {
        self.urls(vec![url.into()])
    }

    /// Seed URLs; an empty list falls back to the local default
    pub fn urls(mut self, urls: Vec<String>) -> Self {
        self.config.urls = if urls.is_empty() {
            vec![crate::config::DEFAULT_URL.to_string()]
        } else {
            urls
        };
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    pub fn sniff(mut self, enabled: bool) -> Self {
        self.config.sniff = enabled;
        self
    }

    pub fn sniffer_timeout_startup(mut self, timeout: Duration) -> Self {
        self.config.sniffer_timeout_startup_ms = timeout.as_millis() as u64;
        self
    }

    pub fn sniffer_timeout(mut self, timeout: Duration) -> Self {
        self.config.sniffer_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn sniffer_interval(mut self, interval: Duration) -> Self {
        self.config.sniffer_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Filter sniffed nodes; nodes rejected by `f` receive no requests
    pub fn sniffer_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&NodesInfoNode) -> bool + Send + Sync + 'static,
    {
        self.sniffer_callback = Some(Arc::new(f));
        self
    }

    pub fn healthcheck(mut self, enabled: bool) -> Self {
        self.config.healthcheck = enabled;
        self
    }

    pub fn healthcheck_timeout_startup(mut self, timeout: Duration) -> Self {
        self.config.healthcheck_timeout_startup_ms = timeout.as_millis() as u64;
        self
    }

    pub fn healthcheck_timeout(mut self, timeout: Duration) -> Self {
        self.config.healthcheck_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn healthcheck_interval(mut self, interval: Duration) -> Self {
        self.config.healthcheck_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn gzip(mut self, enabled: bool) -> Self {
        self.config.gzip = enabled;
        self
    }

    /// Method for GET requests with a body, e.g. "POST" for proxies that drop GET bodies
    pub fn send_get_body_as(mut self, method: impl Into<String>) -> Self {
        self.config.send_get_body_as = method.into();
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self.retrier = None;
        self
    }

    pub fn retrier(mut self, retrier: Arc<dyn Retrier>) -> Self {
        self.retrier = Some(retrier);
        self
    }

    pub fn required_plugins<S: Into<String>>(mut self, plugins: impl IntoIterator<Item = S>) -> Self {
        self.config
            .required_plugins
            .extend(plugins.into_iter().map(Into::into));
        self
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build a long-lived client: health check, sniff, and start the
    /// background sniffer and healthchecker.
    pub async fn build(self) -> Result<Client> {
        let client = self.into_client(false)?;
        let settings = client.inner.settings.clone();

        if settings.healthcheck {
            client
                .startup_healthcheck(settings.healthcheck_timeout_startup)
                .await?;
        }

        if settings.sniff {
            client.sniff(settings.sniffer_timeout_startup).await?;
        } else {
            client.use_seed_urls();
        }

        if settings.healthcheck {
            client
                .healthcheck(settings.healthcheck_timeout_startup, true)
                .await;
        }

        client.must_active_conn()?;
        client.check_required_plugins().await?;
        client.start();

        Ok(client)
    }

    /// Build a short-lived client without sniffing, health checks, or
    /// background tasks.
    pub async fn build_simple(self) -> Result<Client> {
        let client = self.into_client(true)?;
        client.use_seed_urls();
        client.must_active_conn()?;
        client.check_required_plugins().await?;
        Ok(client)
    }

    fn into_client(self, simple: bool) -> Result<Client> {
        let config = self.config;

        let urls = canonicalize(&config.urls);
        if urls.is_empty() {
            return Err(Error::NoClient(format!(
                "no valid URLs in {:?}",
                config.urls
            )));
        }

        if config.scheme.is_empty() {
            return Err(Error::Config("scheme must not be empty".to_string()));
        }

        let send_get_body_as = Method::from_bytes(config.send_get_body_as.to_uppercase().as_bytes())
            .map_err(|_| {
                Error::Config(format!(
                    "invalid send_get_body_as method: {}",
                    config.send_get_body_as
                ))
            })?;

        let sniff = config.sniff && !simple;
        let healthcheck = config.healthcheck && !simple;
        if sniff && config.sniffer_interval_ms == 0 {
            return Err(Error::Config("sniffer interval must be positive".to_string()));
        }
        if healthcheck && config.healthcheck_interval_ms == 0 {
            return Err(Error::Config(
                "healthcheck interval must be positive".to_string(),
            ));
        }

        let basic_auth = config
            .basic_auth()
            .or_else(|| credentials_from_urls(&config.urls));

        let settings = Settings {
            urls,
            scheme: config.scheme.clone(),
            basic_auth,
            sniff,
            sniffer_timeout_startup: config.sniffer_timeout_startup(),
            sniffer_timeout: config.sniffer_timeout(),
            sniffer_interval: config.sniffer_interval(),
            healthcheck,
            healthcheck_timeout_startup: config.healthcheck_timeout_startup(),
            healthcheck_timeout: config.healthcheck_timeout(),
            healthcheck_interval: config.healthcheck_interval(),
            gzip: config.gzip,
            send_get_body_as,
            required_plugins: config.required_plugins.clone(),
        };

        let retrier = self
            .retrier
            .unwrap_or_else(|| max_retries(config.max_retries));

        Ok(Client {
            inner: Arc::new(Inner {
                http: self.http.unwrap_or_default(),
                pool: RwLock::new(Pool::default()),
                settings,
                retrier,
                sniffer_callback: self.sniffer_callback.unwrap_or_else(|| Arc::new(|_| true)),
                tasks: Mutex::new(None),
            }),
        })
    }
}

impl Client {
    /// Create a client from configuration (see [`ClientBuilder::build`])
    pub async fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build().await
    }

    /// Create a client without background processing (see [`ClientBuilder::build_simple`])
    pub async fn simple(config: ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build_simple().await
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Snapshot of the pooled connections
    pub fn conns(&self) -> Vec<Arc<Conn>> {
        self.inner.pool.read().conns.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.tasks.lock().is_some()
    }

    /// Start the background sniffer and healthchecker. No-op if running.
    pub fn start(&self) {
        let mut tasks = self.inner.tasks.lock();
        if tasks.is_some() {
            return;
        }

        let settings = &self.inner.settings;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        if settings.sniff {
            handles.push(tokio::spawn(sniff::sniffer_loop(
                Arc::downgrade(&self.inner),
                shutdown_rx.clone(),
                settings.sniffer_interval,
                settings.sniffer_timeout,
            )));
        }
        if settings.healthcheck {
            handles.push(tokio::spawn(health::healthcheck_loop(
                Arc::downgrade(&self.inner),
                shutdown_rx,
                settings.healthcheck_interval,
                settings.healthcheck_timeout,
            )));
        }

        *tasks = Some(BackgroundTasks {
            shutdown_tx,
            handles,
        });
        info!("elastic: client started");
    }

    /// Stop the background tasks and wait for them to exit. No-op if stopped.
    pub async fn stop(&self) {
        let tasks = self.inner.tasks.lock().take();
        let Some(tasks) = tasks else {
            return;
        };

        let _ = tasks.shutdown_tx.send(true);
        for handle in tasks.handles {
            if let Err(e) = handle.await {
                warn!("elastic: background task ended abnormally: {}", e);
            }
        }
        info!("elastic: client stopped");
    }

    fn from_weak(inner: &Weak<Inner>) -> Option<Self> {
        inner.upgrade().map(|inner| Client { inner })
    }

    fn use_seed_urls(&self) {
        let conns = self
            .inner
            .settings
            .urls
            .iter()
            .map(|url| Arc::new(Conn::new(url.clone(), url.clone())))
            .collect();
        let mut pool = self.inner.pool.write();
        pool.conns = conns;
        pool.cursor = 0;
    }

    /// Pick the next live connection, round-robin
    ///
    /// When every connection is dead and sniffing is off, all of them are
    /// resurrected so the next attempt has somewhere to go; this call still
    /// fails.
    pub(crate) fn next_conn(&self) -> Result<Arc<Conn>> {
        let mut pool = self.inner.pool.write();
        let n = pool.conns.len();

        for _ in 0..n {
            let index = pool.cursor % n;
            pool.cursor = (index + 1) % n;
            let conn = &pool.conns[index];
            if !conn.is_dead() {
                return Ok(Arc::clone(conn));
            }
        }

        if !self.inner.settings.sniff {
            error!(
                "elastic: all {} nodes marked as dead; resurrecting them to prevent deadlock",
                n
            );
            for conn in &pool.conns {
                conn.mark_as_alive();
            }
        }

        Err(Error::NoClient("no available connection".to_string()))
    }

    fn must_active_conn(&self) -> Result<()> {
        let pool = self.inner.pool.read();
        if pool.conns.iter().any(|c| !c.is_dead()) {
            return Ok(());
        }
        Err(Error::NoClient("no active connection found".to_string()))
    }

    async fn check_required_plugins(&self) -> Result<()> {
        for plugin in &self.inner.settings.required_plugins {
            if !self.has_plugin(plugin).await? {
                return Err(Error::PluginNotFound(plugin.clone()));
            }
        }
        Ok(())
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.settings.basic_auth {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }

    fn encode_body(&self, body: Body) -> Result<Bytes> {
        let raw = body.into_bytes()?;
        if !self.inner.settings.gzip {
            return Ok(Bytes::from(raw));
        }
        let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
        encoder.write_all(&raw)?;
        Ok(Bytes::from(encoder.finish()?))
    }

    /// Send a request to the next live node, retrying per the client's retrier
    pub async fn perform_request(&self, opts: PerformRequestOptions) -> Result<Response> {
        let settings = &self.inner.settings;

        let mut method = opts.method;
        if method == Method::GET && opts.body.is_some() && settings.send_get_body_as != Method::GET {
            method = settings.send_get_body_as.clone();
        }

        let timer = RequestTimer::new(method.as_str());
        let path = with_params(&opts.path, &opts.params);
        let content_type = opts
            .content_type
            .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string());
        let body = match opts.body {
            Some(body) => Some(self.encode_body(body)?),
            None => None,
        };

        let mut retries = 0u32;
        let mut retried = false;

        loop {
            let conn = match self.next_conn() {
                Ok(conn) => conn,
                Err(err @ Error::NoClient(_)) => {
                    retries += 1;
                    if !retried {
                        self.healthcheck(settings.healthcheck_timeout, false).await;
                    }
                    match self.inner.retrier.retry(retries, &err) {
                        RetryDecision::Stop => {
                            timer.error(err.error_type(), None);
                            return Err(err);
                        }
                        RetryDecision::RetryAfter(wait) => {
                            retried = true;
                            record_retry();
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                    }
                }
                Err(err) => return Err(err),
            };

            let url = format!("{}{}", conn.url(), path);
            let mut request = self
                .inner
                .http
                .request(method.clone(), &url)
                .headers(opts.headers.clone());
            request = self.apply_auth(request);
            if let Some(bytes) = &body {
                let header = HeaderValue::from_str(&content_type)
                    .map_err(|e| Error::InvalidArgument(format!("content type: {}", e)))?;
                request = request.header(CONTENT_TYPE, header).body(bytes.clone());
                if settings.gzip {
                    request = request.header(CONTENT_ENCODING, "gzip");
                }
            }

            trace!(method = %method, url = %url, body_bytes = body.as_ref().map(|b| b.len()), "elastic: sending request");

            // A body cut short is a transport failure just like a refused connection
            let sent = async {
                let res = request.send().await?;
                let status = res.status().as_u16();
                let headers = res.headers().clone();
                let bytes = res.bytes().await?;
                Ok::<_, reqwest::Error>((status, headers, bytes))
            };
            let (status, headers, bytes) = match sent.await {
                Ok(parts) => parts,
                Err(e) => {
                    retries += 1;
                    warn!("elastic: {} is dead: {}", conn.url(), e);
                    conn.mark_as_dead();
                    record_node_dead(conn.node_id());
                    let err = Error::Transport(e);
                    match self.inner.retrier.retry(retries, &err) {
                        RetryDecision::Stop => {
                            timer.error(err.error_type(), None);
                            return Err(err);
                        }
                        RetryDecision::RetryAfter(wait) => {
                            retried = true;
                            record_retry();
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                    }
                }
            };

            trace!(status, body = %String::from_utf8_lossy(&bytes), "elastic: received response");

            if let Err(err) = check_response(status, &bytes, &opts.ignore_errors) {
                debug!("elastic: {} {} returned {}", method, url, status);
                timer.error(err.error_type(), Some(status));
                return Err(err);
            }

            conn.mark_as_healthy();

            let elapsed = timer.finish(status);
            info!(
                "{} {} [status:{}, request:{:.3}s]",
                method,
                url,
                status,
                elapsed.as_secs_f64()
            );

            return Ok(Response {
                status_code: status,
                headers,
                body: bytes,
            });
        }
    }

    /// Perform a request and decode the JSON body
    pub(crate) async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        opts: PerformRequestOptions,
    ) -> Result<T> {
        self.perform_request(opts).await?.json()
    }

    fn record_pool(&self) {
        let pool = self.inner.pool.read();
        let dead = pool.conns.iter().filter(|c| c.is_dead()).count();
        record_pool_size(pool.conns.len() - dead, dead);
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conns = self.conns();
        let parts: Vec<String> = conns.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("urls", &self.inner.settings.urls)
            .field("conns", &self.to_string())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_client() -> Client {
    let client = match ClientBuilder::new().sniff(false).healthcheck(false).into_client(true) {
        Ok(client) => client,
        Err(e) => panic!("test client: {}", e),
    };
    client.use_seed_urls();
    client
}

/// Normalize seed URLs to `scheme://host[:port]`, dropping anything unparsable
fn canonicalize(urls: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(urls.len());
    for raw in urls {
        let parsed = match url::Url::parse(raw) {
            Ok(u) => u,
            Err(e) => {
                warn!("elastic: ignoring invalid URL {}: {}", raw, e);
                continue;
            }
        };
        let Some(host) = parsed.host_str() else {
            warn!("elastic: ignoring URL without host: {}", raw);
            continue;
        };
        let canonical = match parsed.port() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        };
        if !out.contains(&canonical) {
            out.push(canonical);
        }
    }
    out
}

/// Credentials embedded in the first seed URL that has any
fn credentials_from_urls(urls: &[String]) -> Option<(String, String)> {
    urls.iter()
        .filter_map(|raw| url::Url::parse(raw).ok())
        .find(|u| !u.username().is_empty())
        .map(|u| {
            let decode = |s: &str| percent_encoding::percent_decode_str(s).decode_utf8_lossy().into_owned();
            (
                decode(u.username()),
                u.password().map(decode).unwrap_or_default(),
            )
        })
}
