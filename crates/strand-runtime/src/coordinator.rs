//! Session coordinator — multi-session run tracking.
//!
//! One session has at most one active run; total concurrent runs are
//! capped by a semaphore. Every background run is tracked with its own
//! cancellation token and join handle — no untracked spawned tasks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use metrics::gauge;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use strand_core::events::StrandEvent;

use crate::emitter::EventEmitter;
use crate::errors::RuntimeError;

/// One active background run.
struct ActiveRun {
    run_id: String,
    cancel: CancellationToken,
    /// Completion signal; taken during shutdown so it can be awaited.
    handle: Option<JoinHandle<()>>,
    /// RAII guard — released when the run is removed from `active_runs`.
    _permit: OwnedSemaphorePermit,
}

/// Multi-session coordinator.
pub struct SessionCoordinator {
    emitter: Arc<EventEmitter>,
    max_concurrent_runs: usize,
    /// Semaphore limiting total concurrent runs.
    run_semaphore: Arc<Semaphore>,
    /// Active runs keyed by `session_id`.
    active_runs: Mutex<HashMap<String, ActiveRun>>,
}

impl SessionCoordinator {
    /// Create a coordinator with a shared emitter and a concurrency cap.
    pub fn new(emitter: Arc<EventEmitter>, max_concurrent: usize) -> Self {
        Self {
            emitter,
            max_concurrent_runs: max_concurrent,
            run_semaphore: Arc::new(Semaphore::new(max_concurrent)),
            active_runs: Mutex::new(HashMap::new()),
        }
    }

    /// Shared event emitter.
    pub fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    /// Subscribe to all session events.
    pub fn subscribe(&self) -> broadcast::Receiver<StrandEvent> {
        self.emitter.subscribe()
    }

    /// Spawn a tracked background run for a session.
    ///
    /// `make_run` receives the run's cancellation token and returns the
    /// future to drive. The run is removed from tracking when the future
    /// finishes (on any path).
    ///
    /// Errors if:
    /// - The session already has an active run (`SessionBusy`)
    /// - The server is at max concurrent runs (`ServerBusy`)
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub fn spawn_run<F, Fut>(
        self: &Arc<Self>,
        session_id: &str,
        make_run: F,
    ) -> Result<String, RuntimeError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let run_id = format!("run_{}", uuid::Uuid::now_v7());
        let cancel = self.start_run(session_id, &run_id)?;

        let run = make_run(cancel);
        let coordinator = Arc::clone(self);
        let sid = session_id.to_owned();
        let handle = tokio::spawn(async move {
            run.await;
            coordinator.complete_run(&sid);
        });

        // The task may already have finished and removed itself; only
        // attach the handle if the entry is still present.
        if let Some(active) = self.active_runs.lock().get_mut(session_id) {
            active.handle = Some(handle);
        }
        Ok(run_id)
    }

    /// Start tracking a run for a session. Returns the `CancellationToken`.
    pub fn start_run(
        &self,
        session_id: &str,
        run_id: &str,
    ) -> Result<CancellationToken, RuntimeError> {
        let mut runs = self.active_runs.lock();
        if runs.contains_key(session_id) {
            return Err(RuntimeError::SessionBusy(session_id.to_owned()));
        }
        // Acquire a concurrency permit (non-blocking).
        let permit = Arc::clone(&self.run_semaphore)
            .try_acquire_owned()
            .map_err(|_| RuntimeError::ServerBusy {
                current: runs.len(),
                max: self.max_concurrent_runs,
            })?;
        let cancel = CancellationToken::new();
        let _ = runs.insert(
            session_id.to_owned(),
            ActiveRun {
                run_id: run_id.to_owned(),
                cancel: cancel.clone(),
                handle: None,
                _permit: permit,
            },
        );
        #[allow(clippy::cast_precision_loss)]
        gauge!("session_runs_active").set(runs.len() as f64);
        info!(session_id, run_id, "run started");
        Ok(cancel)
    }

    /// Complete a run for a session (removes it from active tracking).
    pub fn complete_run(&self, session_id: &str) {
        debug!(session_id, "run completed");
        let mut runs = self.active_runs.lock();
        let _ = runs.remove(session_id);
        #[allow(clippy::cast_precision_loss)]
        gauge!("session_runs_active").set(runs.len() as f64);
    }

    /// Get the run ID for an active session (if any).
    pub fn get_run_id(&self, session_id: &str) -> Option<String> {
        self.active_runs
            .lock()
            .get(session_id)
            .map(|r| r.run_id.clone())
    }

    /// Check if a session has an active run.
    pub fn has_active_run(&self, session_id: &str) -> bool {
        self.active_runs.lock().contains_key(session_id)
    }

    /// Number of active runs.
    pub fn active_run_count(&self) -> usize {
        self.active_runs.lock().len()
    }

    /// Maximum concurrent run limit.
    pub fn max_concurrent_runs(&self) -> usize {
        self.max_concurrent_runs
    }

    /// Abort a running session by cancelling its token.
    ///
    /// Returns true if the session had an active run. In-flight tool
    /// futures are discarded, not killed; the run removes itself from
    /// tracking when its task observes the cancellation.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn abort(&self, session_id: &str) -> bool {
        let runs = self.active_runs.lock();
        if let Some(run) = runs.get(session_id) {
            warn!(session_id, run_id = %run.run_id, "abort requested");
            run.cancel.cancel();
            true
        } else {
            false
        }
    }

    /// Graceful shutdown — cancel every active run and wait for their
    /// tasks to finish.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        info!("coordinator shutdown initiated");
        let handles: Vec<JoinHandle<()>> = {
            let mut runs = self.active_runs.lock();
            runs.values_mut()
                .filter_map(|run| {
                    run.cancel.cancel();
                    run.handle.take()
                })
                .collect()
        };
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(%err, "run task panicked during shutdown");
            }
        }
    }
}
