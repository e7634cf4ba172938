//! Run Loop
//!
//! Drives the poll cycle:
//!
//! ```text
//! Idle ──run()──▶ WaitingForWindow ──in window──▶ Collecting
//!                   ▲        │ outside: sleep, re-check   │
//!                   └────────┴──── pause until start + interval
//!
//! any state ──stop──▶ Stopped (outputs closed once)
//! ```
//!
//! The pause after a cycle is measured from the cycle's start, so a slow
//! cycle shortens the pause instead of pushing every later cycle back. A
//! stop request interrupts sleeps but never an in-flight cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use strum::{AsRefStr, Display};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::orchestrator::CollectionOrchestrator;
use crate::status::SharedSnapshot;
use crate::window::OperatingWindow;

// ============================================================================
// State
// ============================================================================

/// Observable run loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    Idle,
    WaitingForWindow,
    Collecting,
    Stopped,
}

/// Source of local wall-clock time for window checks.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Requests a graceful stop. Cloneable and usable from any task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

// ============================================================================
// Run loop
// ============================================================================

/// Periodic, window-aware driver of a [`CollectionOrchestrator`].
pub struct RunLoop {
    orchestrator: Arc<CollectionOrchestrator>,
    window: OperatingWindow,
    interval: Duration,
    clock: Arc<dyn Clock>,
    stop_tx: Arc<watch::Sender<bool>>,
    state_tx: watch::Sender<RunState>,
}

impl RunLoop {
    pub fn new(
        orchestrator: Arc<CollectionOrchestrator>,
        window: OperatingWindow,
        interval: Duration,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self {
            orchestrator,
            window,
            interval,
            clock: Arc::new(LocalClock),
            stop_tx: Arc::new(stop_tx),
            state_tx,
        }
    }

    /// Replace the wall clock used for window checks.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Receiver that follows every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> RunState {
        *self.state_tx.borrow()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn window(&self) -> &OperatingWindow {
        &self.window
    }

    pub fn orchestrator(&self) -> &Arc<CollectionOrchestrator> {
        &self.orchestrator
    }

    /// One collect and dispatch cycle, regardless of the operating window.
    pub async fn run_once(&self) -> SharedSnapshot {
        let snapshot: SharedSnapshot = Arc::new(self.orchestrator.collect().await);
        let delivered = self.orchestrator.dispatch(&snapshot).await;
        tracing::info!(
            jobs = snapshot.len(),
            outputs = delivered,
            failed_outputs = self.orchestrator.outputs().len() - delivered,
            "Cycle complete"
        );
        snapshot
    }

    /// Run until stopped, then close the outputs.
    ///
    /// Returns the number of completed cycles.
    pub async fn run(self) -> u64 {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut cycles = 0;
        tracing::info!(
            interval = %humantime::format_duration(self.interval),
            "Run loop started"
        );

        loop {
            if *stop_rx.borrow() {
                break;
            }
            self.set_state(RunState::WaitingForWindow);

            let wait = self.window.seconds_to_next_operating(self.clock.now());
            if wait > 0 {
                let wait = Duration::from_secs(wait);
                tracing::info!(
                    wait = %humantime::format_duration(wait),
                    "Outside operating window"
                );
                if pause_until(&mut stop_rx, Instant::now() + wait).await {
                    break;
                }
                continue;
            }

            self.set_state(RunState::Collecting);
            let started = Instant::now();
            self.run_once().await;
            cycles += 1;

            if pause_until(&mut stop_rx, started + self.interval).await {
                break;
            }
        }

        self.orchestrator.close().await;
        self.set_state(RunState::Stopped);
        tracing::info!(cycles, "Run loop stopped");
        cycles
    }

    fn set_state(&self, state: RunState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Run state changed");
        }
    }
}

impl std::fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLoop")
            .field("orchestrator", &self.orchestrator)
            .field("window", &self.window)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Sleep until `deadline` or a stop request. Returns `true` when stopped.
async fn pause_until(stop_rx: &mut watch::Receiver<bool>, deadline: Instant) -> bool {
    tokio::select! {
        biased;
        _ = stop_requested(stop_rx) => true,
        _ = tokio::time::sleep_until(deadline) => false,
    }
}

/// Resolves once a stop has been requested or every handle is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}
