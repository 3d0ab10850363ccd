//! Worker pool behind the compute boundary.
//!
//! Requests enter as JSON text on a job queue shared by the worker threads.
//! Workers send their JSON replies to a single router thread, which owns the
//! table of pending request ids and forwards each reply to the oneshot
//! channel registered for that id.
//!
//! ```text
//! submit ──Register{id}──▶ router ◀──Response(json)── worker
//!        ──Job(json)────▶ queue ──▶ worker
//! ```
//!
//! Registration is enqueued before the job, so the router always knows an id
//! before its reply can arrive. A request that times out or never reaches
//! the queue is deregistered, so its pending entry does not outlive it.
//! Replies whose waiter has gone away are counted as dead letters.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use statgrid_protocol::{response_action, CancelMessage, ComputeRequest, ComputeResponse, RequestId};

use crate::error::{ComputeError, DispatchError, TransportError};
use crate::module::{CancelToken, ModuleRegistry};
use crate::oneshot;

type Delivery = Result<ComputeResponse, TransportError>;

enum Job {
    Run { request: String, token: CancelToken },
    Shutdown,
}

enum RouterMsg {
    Register {
        id: RequestId,
        action: String,
        reply: oneshot::Sender<Delivery>,
    },
    Deregister(RequestId),
    Response(String),
    Shutdown,
}

/// Counters shared by the pool's threads.
#[derive(Debug, Default)]
struct PoolMetrics {
    submitted: AtomicU64,
    delivered: AtomicU64,
    dead_letters: AtomicU64,
    pending: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub delivered: u64,
    pub dead_letters: u64,
    /// Requests the router still holds a waiter for.
    pub pending: u64,
}

type TokenTable = Arc<Mutex<HashMap<RequestId, CancelToken>>>;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(2);
        Self { workers: workers.clamp(1, 8) }
    }
}

pub struct ComputePool {
    jobs: mpsc::Sender<Job>,
    router: mpsc::Sender<RouterMsg>,
    tokens: TokenTable,
    next_id: AtomicU64,
    metrics: Arc<PoolMetrics>,
    workers: Vec<JoinHandle<()>>,
    router_handle: Option<JoinHandle<()>>,
}

impl ComputePool {
    /// Start `config.workers` worker threads plus the router thread.
    pub fn start(config: PoolConfig, registry: ModuleRegistry) -> std::io::Result<Self> {
        let worker_count = config.workers.max(1);
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        let (router_tx, router_rx) = mpsc::channel::<RouterMsg>();
        let tokens: TokenTable = Arc::new(Mutex::new(HashMap::new()));
        let metrics = Arc::new(PoolMetrics::default());

        let router_metrics = Arc::clone(&metrics);
        let router_handle = thread::Builder::new()
            .name("compute-router".into())
            .spawn(move || run_router(router_rx, router_metrics))?;

        let mut workers = Vec::with_capacity(worker_count);
        for n in 0..worker_count {
            let jobs_rx = Arc::clone(&jobs_rx);
            let router_tx = router_tx.clone();
            let registry = registry.clone();
            let tokens = Arc::clone(&tokens);
            let handle = thread::Builder::new()
                .name(format!("compute-worker-{n}"))
                .spawn(move || run_worker(jobs_rx, router_tx, registry, tokens))?;
            workers.push(handle);
        }

        log::info!("Compute pool started with {} workers", worker_count);

        Ok(Self {
            jobs: jobs_tx,
            router: router_tx,
            tokens,
            next_id: AtomicU64::new(1),
            metrics,
            workers,
            router_handle: Some(router_handle),
        })
    }

    /// Serialize `data` into a request for `action` and queue it.
    ///
    /// Every call gets a fresh request id, so concurrent submissions for the
    /// same action never share a correlation key.
    pub fn submit<T: Serialize>(&self, action: &str, data: &T) -> Result<Ticket, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = ComputeRequest::new(id, action, data)
            .and_then(|r| serde_json::to_string(&r))
            .map_err(|e| TransportError::Encode(e.to_string()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.router
            .send(RouterMsg::Register {
                id,
                action: action.to_string(),
                reply: reply_tx,
            })
            .map_err(|_| TransportError::ChannelClosed)?;

        let token = CancelToken::new();
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(id, token.clone());
        }

        if self.jobs.send(Job::Run { request, token }).is_err() {
            forget(&self.tokens, &self.router, id);
            return Err(TransportError::ChannelClosed);
        }
        self.metrics.submitted.fetch_add(1, Ordering::Relaxed);
        log::debug!("Dispatched request {} ({})", id, action);

        Ok(Ticket {
            id,
            action: action.to_string(),
            reply: reply_rx,
            canceller: Canceller {
                tokens: Arc::clone(&self.tokens),
            },
            router: self.router.clone(),
        })
    }

    /// Ask the module running request `id` to stop. Returns false if the
    /// request already finished or never existed.
    pub fn cancel(&self, id: RequestId) -> bool {
        Canceller {
            tokens: Arc::clone(&self.tokens),
        }
        .send(CancelMessage { id })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.metrics.submitted.load(Ordering::Relaxed),
            delivered: self.metrics.delivered.load(Ordering::Relaxed),
            dead_letters: self.metrics.dead_letters.load(Ordering::Relaxed),
            pending: self.metrics.pending.load(Ordering::Relaxed),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ComputePool {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.jobs.send(Job::Shutdown);
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        let _ = self.router.send(RouterMsg::Shutdown);
        if let Some(handle) = self.router_handle.take() {
            let _ = handle.join();
        }
        log::info!("Compute pool stopped");
    }
}

/// Drop every trace of request `id` (its cancel token and the router's
/// pending entry) and hand back the token. A reply arriving afterwards is a
/// dead letter.
fn forget(tokens: &TokenTable, router: &mpsc::Sender<RouterMsg>, id: RequestId) -> Option<CancelToken> {
    let token = tokens.lock().ok().and_then(|mut t| t.remove(&id));
    let _ = router.send(RouterMsg::Deregister(id));
    token
}

/// Sends cancel messages for requests of one pool. Cheap to clone and `Send`,
/// so another thread can cancel while the owner waits.
#[derive(Clone)]
pub struct Canceller {
    tokens: TokenTable,
}

impl Canceller {
    pub fn send(&self, msg: CancelMessage) -> bool {
        let token = self.tokens.lock().ok().and_then(|t| t.get(&msg.id).cloned());
        match token {
            Some(token) => {
                log::debug!("Cancelling request {}", msg.id);
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Handle for one in-flight request.
pub struct Ticket {
    id: RequestId,
    action: String,
    reply: oneshot::Receiver<Delivery>,
    canceller: Canceller,
    router: mpsc::Sender<RouterMsg>,
}

impl Ticket {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    pub fn cancel(&self) -> bool {
        self.canceller.send(CancelMessage { id: self.id })
    }

    /// Block until the module answers. With a timeout, an unanswered request
    /// is cancelled and reported as [`TransportError::Timeout`].
    pub fn wait(self, timeout: Option<Duration>) -> Result<Value, DispatchError> {
        let delivery = match timeout {
            Some(after) => match self.reply.recv_timeout(after) {
                Ok(delivery) => delivery,
                Err(oneshot::RecvError::Timeout) => {
                    log::warn!("Request {} ({}) timed out after {:?}", self.id, self.action, after);
                    // Deregister before cancelling so the module's reply lands after it
                    if let Some(token) = forget(&self.canceller.tokens, &self.router, self.id) {
                        token.cancel();
                    }
                    return Err(TransportError::Timeout { id: self.id, after }.into());
                }
                Err(oneshot::RecvError::Closed) => return Err(TransportError::ChannelClosed.into()),
            },
            None => self
                .reply
                .blocking_recv()
                .map_err(|_| TransportError::ChannelClosed)?,
        };

        match delivery? {
            ComputeResponse::Success(r) => Ok(r.data),
            ComputeResponse::Failure(r) => Err(DispatchError::Module(r.error)),
            ComputeResponse::Cancelled(r) => Err(TransportError::Cancelled { id: r.id }.into()),
        }
    }
}

fn run_router(rx: mpsc::Receiver<RouterMsg>, metrics: Arc<PoolMetrics>) {
    let mut pending: HashMap<RequestId, (String, oneshot::Sender<Delivery>)> = HashMap::new();

    while let Ok(msg) = rx.recv() {
        match msg {
            RouterMsg::Register { id, action, reply } => {
                pending.insert(id, (action, reply));
            }
            RouterMsg::Deregister(id) => {
                if pending.remove(&id).is_some() {
                    log::debug!("Deregistered request {}", id);
                }
            }
            RouterMsg::Response(text) => {
                let response: ComputeResponse = match serde_json::from_str(&text) {
                    Ok(r) => r,
                    Err(e) => {
                        log::error!("Dropping undecodable compute response: {}", e);
                        metrics.dead_letters.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                };

                let id = response.id();
                let Some((action, reply)) = pending.remove(&id) else {
                    log::warn!("Dead letter: response for unknown request {}", id);
                    metrics.dead_letters.fetch_add(1, Ordering::Relaxed);
                    continue;
                };

                let delivery = match response {
                    ComputeResponse::Success(ref r) if r.action != response_action(&action) => {
                        Err(TransportError::Correlation {
                            id,
                            expected: response_action(&action),
                            got: r.action.clone(),
                        })
                    }
                    other => Ok(other),
                };

                if reply.send(delivery).is_err() {
                    log::warn!("Dead letter: nobody waiting for request {} ({})", id, action);
                    metrics.dead_letters.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
            RouterMsg::Shutdown => break,
        }
        metrics.pending.store(pending.len() as u64, Ordering::Relaxed);
    }
}

fn run_worker(
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    router: mpsc::Sender<RouterMsg>,
    registry: ModuleRegistry,
    tokens: TokenTable,
) {
    loop {
        let job = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };

        let (request, token) = match job {
            Ok(Job::Run { request, token }) => (request, token),
            Ok(Job::Shutdown) | Err(_) => break,
        };

        let response = execute(&registry, &request, &token);
        if let Ok(mut tokens) = tokens.lock() {
            tokens.remove(&response.id());
        }

        let text = match serde_json::to_string(&response) {
            Ok(text) => text,
            Err(e) => {
                let fallback = ComputeResponse::failure(response.id(), format!("cannot encode result: {e}"));
                match serde_json::to_string(&fallback) {
                    Ok(text) => text,
                    Err(_) => continue,
                }
            }
        };

        if router.send(RouterMsg::Response(text)).is_err() {
            break;
        }
    }
}

/// Run one request. Every outcome, including a panicking module, becomes a
/// response; nothing is thrown across the boundary.
fn execute(registry: &ModuleRegistry, text: &str, token: &CancelToken) -> ComputeResponse {
    let request: ComputeRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            let id = serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|v| v.get("id").and_then(Value::as_u64))
                .unwrap_or(0);
            return ComputeResponse::failure(id, format!("validation error: malformed request: {e}"));
        }
    };

    if token.is_cancelled() {
        return ComputeResponse::cancelled(request.id);
    }

    let Some(module) = registry.get(&request.action) else {
        return ComputeResponse::failure(
            request.id,
            format!("validation error: unknown action '{}'", request.action),
        );
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| module.compute(&request.data, token)));
    match outcome {
        Ok(Ok(_)) if token.is_cancelled() => ComputeResponse::cancelled(request.id),
        Ok(Ok(data)) => ComputeResponse::success(request.id, &request.action, data),
        Ok(Err(ComputeError::Cancelled)) => ComputeResponse::cancelled(request.id),
        Ok(Err(e)) => ComputeResponse::failure(request.id, e.to_string()),
        Err(_) => {
            log::error!("Compute module '{}' panicked on request {}", request.action, request.id);
            ComputeResponse::failure(request.id, "internal error: compute module panicked")
        }
    }
}
