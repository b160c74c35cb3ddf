//! # Analyzer
//!
//! [`ArbitrageSearch`] owns a [`CycleSearch`], a result handler and a background
//! analysis loop. The loop runs one search per trigger and hands every completed
//! [`AnalysisResult`] to the handler. Shutdown is checked between searches only, so
//! a handler never sees a partial result.
//!
//! Lifecycle policy: starting a running loop fails with `AlreadyStarted`, stopping
//! an idle loop fails with `NotStarted`, and a second concurrent stop fails with
//! `StopPending`. A stopped analyzer can be started again.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};

use super::graph::MarketGraph;
use super::search::{AnalysisResult, CycleSearch};
use super::types::Currency;
use crate::error::ArbError;

/// Receives every completed analysis.
///
/// The handler runs inline on the analysis task, which lives on a Tokio worker
/// thread. A handler that blocks (placing orders, waiting on a venue) stalls that
/// worker and delays the next search; forward results through a
/// [`ChannelHandler`] and consume them elsewhere instead. A panicking handler ends
/// the loop and the panic is reported by [`ArbitrageSearch::stop`].
pub trait AnalysisHandler: Send + Sync {
    /// Called once per completed search, from the analysis task.
    fn on_analysis_complete(&self, result: AnalysisResult);
}

impl<F> AnalysisHandler for F
where
    F: Fn(AnalysisResult) + Send + Sync,
{
    fn on_analysis_complete(&self, result: AnalysisResult) {
        self(result);
    }
}

/// Forwards results into an unbounded channel.
#[derive(Clone, Debug)]
pub struct ChannelHandler(pub mpsc::UnboundedSender<AnalysisResult>);

impl AnalysisHandler for ChannelHandler {
    fn on_analysis_complete(&self, result: AnalysisResult) {
        if self.0.send(result).is_err() {
            warn!("analysis result dropped, receiver is gone");
        }
    }
}

/// When the loop runs a search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnalysisCadence {
    /// On a fixed timer; the first search runs immediately.
    Interval(Duration),
    /// Immediately, then once after every burst of graph mutations.
    #[default]
    OnGraphChange,
}

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

enum LoopState {
    Idle,
    Running(Worker),
    Stopping,
}

/// Returns the analyzer to `Idle` even if the stopping future is dropped mid-wait.
struct IdleOnDrop<'a>(&'a Mutex<LoopState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.lock() = LoopState::Idle;
    }
}

/// Arbitrage analyzer with a start/stop background loop.
pub struct ArbitrageSearch {
    search: CycleSearch,
    handler: Arc<dyn AnalysisHandler>,
    cadence: AnalysisCadence,
    state: Mutex<LoopState>,
}

impl ArbitrageSearch {
    /// Creates an idle analyzer over a graph shared with the ingestion path.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::InvalidPathLength` if `max_path_length` is zero.
    pub fn new(
        graph: Arc<MarketGraph>,
        home: Currency,
        max_path_length: usize,
        handler: impl AnalysisHandler + 'static,
    ) -> Result<Self, ArbError> {
        Ok(Self {
            search: CycleSearch::new(graph, home, max_path_length)?,
            handler: Arc::new(handler),
            cadence: AnalysisCadence::default(),
            state: Mutex::new(LoopState::Idle),
        })
    }

    /// Sets the trigger cadence used by subsequent starts.
    #[must_use]
    pub fn with_cadence(mut self, cadence: AnalysisCadence) -> Self {
        self.cadence = cadence;
        self
    }

    #[must_use]
    pub const fn home(&self) -> &Currency {
        self.search.home()
    }

    #[must_use]
    pub const fn cadence(&self) -> AnalysisCadence {
        self.cadence
    }

    /// Whether the background loop is running.
    ///
    /// Turns false as soon as the loop task ends, including after a handler panic.
    /// The analyzer still counts as started until [`stop`](Self::stop) collects
    /// the outcome, so `start` keeps failing with `AlreadyStarted` until then.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(&*self.state.lock(), LoopState::Running(worker) if !worker.handle.is_finished())
    }

    /// Runs one search on the caller's thread, without invoking the handler.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::DivisionByZero` if an edge with a zero price bypassed validation.
    pub fn search_for_arbitrage(&self) -> Result<AnalysisResult, ArbError> {
        self.search.search_for_arbitrage()
    }

    /// Spawns the analysis loop on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// * `ArbError::AlreadyStarted` if the loop is running
    /// * `ArbError::StopPending` if a stop is still in progress
    /// * `ArbError::NoRuntime` if called outside a Tokio runtime
    pub fn start(&self) -> Result<(), ArbError> {
        let runtime = Handle::try_current().map_err(|_| ArbError::NoRuntime)?;
        let mut state = self.state.lock();
        match *state {
            LoopState::Running(_) => return Err(ArbError::AlreadyStarted),
            LoopState::Stopping => return Err(ArbError::StopPending),
            LoopState::Idle => {}
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(analysis_loop(
            self.search.clone(),
            Arc::clone(&self.handler),
            self.cadence,
            shutdown_rx,
        ));
        *state = LoopState::Running(Worker { shutdown, handle });
        info!(
            "analysis loop started: home {}, max {} hops, {:?}",
            self.search.home(),
            self.search.max_path_length(),
            self.cadence
        );
        Ok(())
    }

    /// Signals the loop to stop and waits until it has terminated.
    ///
    /// A search in progress finishes and is delivered before the loop exits.
    ///
    /// # Errors
    ///
    /// * `ArbError::NotStarted` if the loop is not running
    /// * `ArbError::StopPending` if another stop is already waiting
    /// * `ArbError::Interrupted` if the task was cancelled or panicked
    pub async fn stop(&self) -> Result<(), ArbError> {
        let worker = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, LoopState::Stopping) {
                LoopState::Running(worker) => worker,
                LoopState::Idle => {
                    *state = LoopState::Idle;
                    return Err(ArbError::NotStarted);
                }
                LoopState::Stopping => return Err(ArbError::StopPending),
            }
        };
        let _idle = IdleOnDrop(&self.state);

        // The loop may already be gone if it panicked; the join below reports that.
        let _ = worker.shutdown.send(true);
        worker.handle.await.map_err(|e| ArbError::Interrupted {
            reason: e.to_string(),
        })?;
        info!("analysis loop stopped");
        Ok(())
    }
}

/// Waits for the next reason to search.
enum Trigger {
    Timer(Interval),
    GraphChange {
        versions: watch::Receiver<u64>,
        first: bool,
    },
}

impl Trigger {
    fn new(cadence: AnalysisCadence, graph: &MarketGraph) -> Self {
        match cadence {
            AnalysisCadence::Interval(period) => {
                // tokio panics on a zero period
                let mut timer = time::interval(period.max(Duration::from_millis(1)));
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Self::Timer(timer)
            }
            AnalysisCadence::OnGraphChange => Self::GraphChange {
                versions: graph.subscribe(),
                first: true,
            },
        }
    }

    async fn wait(&mut self) {
        match self {
            Self::Timer(timer) => {
                timer.tick().await;
            }
            Self::GraphChange { versions, first } => {
                if std::mem::take(first) {
                    versions.borrow_and_update();
                    return;
                }
                if versions.changed().await.is_err() {
                    // Graph dropped: nothing will ever change again.
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

async fn analysis_loop(
    search: CycleSearch,
    handler: Arc<dyn AnalysisHandler>,
    cadence: AnalysisCadence,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut trigger = Trigger::new(cadence, search.graph());
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            () = trigger.wait() => {}
        }
        if *shutdown.borrow() {
            break;
        }

        let job = search.clone();
        match tokio::task::spawn_blocking(move || job.search_for_arbitrage()).await {
            Ok(Ok(result)) => {
                if result.is_profitable() {
                    info!("arbitrage found: {result}");
                } else {
                    debug!("no arbitrage through {}", search.home());
                }
                handler.on_analysis_complete(result);
            }
            Ok(Err(e)) => error!("arbitrage search failed: {e}"),
            Err(e) => error!("arbitrage search task failed: {e}"),
        }
    }
    debug!("analysis loop exiting");
}
