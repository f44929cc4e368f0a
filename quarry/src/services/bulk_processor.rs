//! Background bulk indexing
//!
//! ```text
//! add() ──round-robin──▶ worker 0 ─┐
//!                       worker 1 ─┼─▶ BulkService::do_request (with backoff)
//!                       worker N ─┘
//! ```
//!
//! Each worker owns a [`BulkService`] and commits it when it holds
//! `bulk_actions` requests or `bulk_size` bytes, when the flush interval
//! ticks, on [`BulkProcessor::flush`], and on [`BulkProcessor::close`].

use crate::client::Client;
use crate::error::{Error, Result};
use crate::metrics::record_bulk_commit;
use crate::retry::{Backoff, ExponentialBackoff};
use crate::services::bulk::{BulkResponse, BulkService, BulkableRequest};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Interval;
use tracing::{debug, info, warn};

const DEFAULT_BULK_ACTIONS: usize = 1000;
const DEFAULT_BULK_SIZE: u64 = 5 << 20;

/// Called before a commit with the execution id and the requests
pub type BulkBeforeFn = Arc<dyn Fn(u64, &[BulkableRequest]) + Send + Sync>;

/// Called after a commit with the execution id, the requests, and the outcome
pub type BulkAfterFn =
    Arc<dyn Fn(u64, &[BulkableRequest], std::result::Result<&BulkResponse, &Error>) + Send + Sync>;

/// Counters collected while the processor runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkProcessorStats {
    /// Commits triggered by `flush()` or the flush interval
    pub flushed: u64,
    pub committed: u64,
    pub indexed: u64,
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub workers: Vec<BulkProcessorWorkerStats>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkProcessorWorkerStats {
    /// Requests waiting in the worker's bulk service
    pub queued: usize,
    pub last_duration: Duration,
}

/// Configures and starts a [`BulkProcessor`]
pub struct BulkProcessorBuilder {
    client: Client,
    name: String,
    workers: usize,
    bulk_actions: usize,
    bulk_size: u64,
    flush_interval: Option<Duration>,
    want_stats: bool,
    backoff: Arc<dyn Backoff>,
    before: Option<BulkBeforeFn>,
    after: Option<BulkAfterFn>,
}

impl BulkProcessorBuilder {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            name: String::new(),
            workers: 1,
            bulk_actions: DEFAULT_BULK_ACTIONS,
            bulk_size: DEFAULT_BULK_SIZE,
            flush_interval: None,
            want_stats: false,
            backoff: Arc::new(ExponentialBackoff::new(
                Duration::from_millis(200),
                Duration::from_secs(10),
            )),
            before: None,
            after: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Commit after this many requests; 0 disables the threshold
    pub fn bulk_actions(mut self, actions: usize) -> Self {
        self.bulk_actions = actions;
        self
    }

    /// Commit after this many bytes; 0 disables the threshold
    pub fn bulk_size(mut self, bytes: u64) -> Self {
        self.bulk_size = bytes;
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    pub fn stats(mut self, enabled: bool) -> Self {
        self.want_stats = enabled;
        self
    }

    /// Backoff between attempts of a failed commit
    pub fn backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn before<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &[BulkableRequest]) + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(f));
        self
    }

    pub fn after<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &[BulkableRequest], std::result::Result<&BulkResponse, &Error>)
            + Send
            + Sync
            + 'static,
    {
        self.after = Some(Arc::new(f));
        self
    }

    /// Spawn the workers on the current runtime
    pub fn start(self) -> Result<BulkProcessor> {
        if self.workers == 0 {
            return Err(Error::Config("bulk processor needs at least one worker".to_string()));
        }
        if self.flush_interval == Some(Duration::ZERO) {
            return Err(Error::Config("flush interval must be positive".to_string()));
        }

        let stats = Arc::new(Mutex::new(BulkProcessorStats {
            workers: vec![BulkProcessorWorkerStats::default(); self.workers],
            ..Default::default()
        }));
        let execution_id = Arc::new(AtomicU64::new(0));
        let capacity = self.bulk_actions.max(1);

        let mut senders = Vec::with_capacity(self.workers);
        let mut handles = Vec::with_capacity(self.workers);
        for index in 0..self.workers {
            let (tx, rx) = mpsc::channel(capacity);
            let worker = Worker {
                index,
                name: self.name.clone(),
                rx,
                service: BulkService::new(self.client.clone()),
                bulk_actions: self.bulk_actions,
                bulk_size: self.bulk_size,
                flush_interval: self.flush_interval,
                backoff: Arc::clone(&self.backoff),
                before: self.before.clone(),
                after: self.after.clone(),
                stats: self.want_stats.then(|| Arc::clone(&stats)),
                execution_id: Arc::clone(&execution_id),
            };
            senders.push(tx);
            handles.push(tokio::spawn(worker.run()));
        }

        info!(
            "bulk processor {:?} started with {} workers",
            self.name, self.workers
        );

        Ok(BulkProcessor {
            name: self.name,
            senders: RwLock::new(senders),
            next: AtomicUsize::new(0),
            handles: Mutex::new(handles),
            stats,
        })
    }
}

enum WorkerMsg {
    Request(BulkableRequest),
    Flush(oneshot::Sender<()>),
}

/// Handle to running bulk workers
pub struct BulkProcessor {
    name: String,
    senders: RwLock<Vec<mpsc::Sender<WorkerMsg>>>,
    next: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<Mutex<BulkProcessorStats>>,
}

impl BulkProcessor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a request; waits while the chosen worker's channel is full
    pub async fn add(&self, request: impl Into<BulkableRequest>) -> Result<()> {
        let sender = {
            let senders = self.senders.read();
            if senders.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "bulk processor {:?} is closed",
                    self.name
                )));
            }
            let index = self.next.fetch_add(1, Ordering::Relaxed) % senders.len();
            senders[index].clone()
        };
        sender
            .send(WorkerMsg::Request(request.into()))
            .await
            .map_err(|_| Error::InvalidArgument(format!("bulk processor {:?} is closed", self.name)))
    }

    /// Commit everything queued so far and wait for it
    pub async fn flush(&self) -> Result<()> {
        let senders: Vec<_> = self.senders.read().clone();
        let mut acks = Vec::with_capacity(senders.len());
        for sender in senders {
            let (tx, rx) = oneshot::channel();
            if sender.send(WorkerMsg::Flush(tx)).await.is_ok() {
                acks.push(rx);
            }
        }
        for ack in acks {
            let _ = ack.await;
        }
        Ok(())
    }

    /// Commit what is queued, then stop the workers. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.senders.write().clear();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("bulk processor {:?} worker ended abnormally: {}", self.name, e);
            }
        }
        info!("bulk processor {:?} closed", self.name);
        Ok(())
    }

    /// Snapshot of the counters; all zero unless stats were enabled
    pub fn stats(&self) -> BulkProcessorStats {
        self.stats.lock().clone()
    }
}

struct Worker {
    index: usize,
    name: String,
    rx: mpsc::Receiver<WorkerMsg>,
    service: BulkService,
    bulk_actions: usize,
    bulk_size: u64,
    flush_interval: Option<Duration>,
    backoff: Arc<dyn Backoff>,
    before: Option<BulkBeforeFn>,
    after: Option<BulkAfterFn>,
    stats: Option<Arc<Mutex<BulkProcessorStats>>>,
    execution_id: Arc<AtomicU64>,
}

impl Worker {
    async fn run(mut self) {
        let mut ticker = self.flush_interval.map(|every| {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker
        });
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(WorkerMsg::Request(request)) => {
                        if let Err(e) = self.service.push(request) {
                            warn!("bulk processor {:?} dropped a request: {}", self.name, e);
                            continue;
                        }
                        self.update_queued();
                        if self.commit_required() {
                            self.commit().await;
                        }
                    }
                    Some(WorkerMsg::Flush(ack)) => {
                        self.flush().await;
                        let _ = ack.send(());
                    }
                    None => {
                        self.commit().await;
                        break;
                    }
                },
                _ = tick(&mut ticker) => self.flush().await,
            }
        }
        debug!("bulk processor {:?} worker {} stopped", self.name, self.index);
    }

    fn commit_required(&self) -> bool {
        commit_required(
            self.service.number_of_actions(),
            self.service.estimated_size_in_bytes(),
            self.bulk_actions,
            self.bulk_size,
        )
    }

    async fn flush(&mut self) {
        if self.service.number_of_actions() == 0 {
            return;
        }
        if let Some(stats) = &self.stats {
            stats.lock().flushed += 1;
        }
        self.commit().await;
    }

    async fn commit(&mut self) {
        let actions = self.service.number_of_actions();
        if actions == 0 {
            return;
        }

        let id = self.execution_id.fetch_add(1, Ordering::Relaxed) + 1;
        let requests = self.service.requests().to_vec();
        if let Some(before) = &self.before {
            before(id, &requests);
        }

        let started = Instant::now();
        let mut attempt = 0;
        let result = loop {
            match self.service.do_request().await {
                Ok(res) => break Ok(res),
                Err(e) if is_retriable(&e) => {
                    attempt += 1;
                    match self.backoff.next(attempt) {
                        Some(wait) => {
                            debug!(
                                "bulk processor {:?} commit failed, retrying in {:?}: {}",
                                self.name, wait, e
                            );
                            tokio::time::sleep(wait).await;
                        }
                        None => break Err(e),
                    }
                }
                Err(e) => break Err(e),
            }
        };

        if let Err(e) = &result {
            warn!(
                "bulk processor {:?} dropped {} actions after failed commit: {}",
                self.name, actions, e
            );
            self.service.reset();
        }

        record_bulk_commit(&self.name, actions, result.is_ok());
        self.record_stats(&result, started.elapsed());

        if let Some(after) = &self.after {
            after(id, &requests, result.as_ref());
        }
    }

    fn update_queued(&self) {
        if let Some(stats) = &self.stats {
            if let Some(worker) = stats.lock().workers.get_mut(self.index) {
                worker.queued = self.service.number_of_actions();
            }
        }
    }

    fn record_stats(&self, result: &Result<BulkResponse>, took: Duration) {
        let Some(stats) = &self.stats else {
            return;
        };
        let mut stats = stats.lock();
        stats.committed += 1;
        if let Some(worker) = stats.workers.get_mut(self.index) {
            worker.queued = self.service.number_of_actions();
            worker.last_duration = took;
        }
        if let Ok(res) = result {
            stats.indexed += res.indexed().len() as u64;
            stats.created += res.created().len() as u64;
            stats.updated += res.updated().len() as u64;
            stats.deleted += res.deleted().len() as u64;
            stats.succeeded += res.succeeded().len() as u64;
            stats.failed += res.failed().len() as u64;
        }
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn commit_required(actions: usize, size: u64, max_actions: usize, max_size: u64) -> bool {
    (max_actions > 0 && actions >= max_actions) || (max_size > 0 && size >= max_size)
}

/// Connection problems, throttling and server errors are worth another try
fn is_retriable(err: &Error) -> bool {
    match err {
        Error::Transport(_) | Error::NoClient(_) => true,
        Error::Api(api) => api.status == 408 || api.status == 429 || api.status >= 500,
        _ => false,
    }
}

impl Client {
    pub fn bulk_processor(&self) -> BulkProcessorBuilder {
        BulkProcessorBuilder::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use crate::error::ApiError;

    #[test]
    fn test_commit_required() {
        assert!(!commit_required(0, 0, 1000, 5 << 20));
        assert!(commit_required(1000, 10, 1000, 5 << 20));
        assert!(commit_required(1, 5 << 20, 1000, 5 << 20));
        assert!(!commit_required(5000, 5 << 30, 0, 0));
    }

    #[test]
    fn test_is_retriable() {
        assert!(is_retriable(&Error::NoClient("x".into())));
        assert!(is_retriable(&Error::Api(ApiError { status: 503, details: None })));
        assert!(is_retriable(&Error::Api(ApiError { status: 429, details: None })));
        assert!(!is_retriable(&Error::Api(ApiError { status: 400, details: None })));
        assert!(!is_retriable(&Error::InvalidArgument("x".into())));
    }

    #[tokio::test]
    async fn test_start_rejects_zero_workers() {
        let result = test_client().bulk_processor().workers(0).start();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_closed_processor_rejects_adds() {
        let processor = test_client()
            .bulk_processor()
            .name("test")
            .workers(2)
            .stats(true)
            .start()
            .unwrap();
        assert_eq!(processor.stats().workers.len(), 2);

        processor.close().await.unwrap();
        processor.close().await.unwrap();

        let req = crate::services::bulk::BulkDeleteRequest::new().index("i").id("1");
        assert!(processor.add(req).await.is_err());
        assert_eq!(processor.stats().committed, 0);
    }
}
