use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::Admission;
use crate::LimiterConfig;
use crate::Reason;
use crate::gate::CountingGate;
use crate::gate::Entry;
use crate::path_matcher;

/// Limits admissions to `limit` per `window`.
///
/// Excess callers queue on a [`CountingGate`] (or are rejected, with fail fast) until
/// a background reset loop reopens it. The loop is spawned onto the current tokio
/// runtime by the first admission, keeps resetting every `window` while each reset
/// releases queued callers, and stops on the first reset that releases nobody. The
/// next admission starts it again.
///
/// Cloning is cheap; clones share the same window.
#[derive(Clone, Debug)]
pub struct WindowedLimiter {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    limit: usize,
    window: Duration,
    fail_fast: bool,
    exclusions: Vec<String>,
    // `None` when limiting is disabled
    gate: Option<CountingGate>,
    tally: AtomicUsize,
    state: Mutex<LoopState>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopState {
    Idle,
    Active,
}

impl WindowedLimiter {
    /// Creates a new `WindowedLimiter`.
    ///
    /// The config is taken as is; run [`LimiterConfig::validate`] first when it comes
    /// from an untrusted source.
    pub fn new(config: LimiterConfig) -> Self {
        let LimiterConfig {
            limit,
            window,
            exclusions,
            fail_fast,
        } = config;

        Self {
            shared: Arc::new(Shared {
                limit,
                window,
                fail_fast,
                exclusions,
                gate: NonZeroUsize::new(limit).map(CountingGate::new),
                tally: AtomicUsize::new(0),
                state: Mutex::new(LoopState::Idle),
            }),
        }
    }

    /// Waits until a request for `path` may be dispatched.
    ///
    /// Exempt paths, and every path when the limit is zero, pass immediately without
    /// counting. Other requests take a slot in the current window, queuing until the
    /// next reset if the window is full.
    ///
    /// With fail fast configured, a request arriving once the window's tally has
    /// reached the limit is rejected with [`Reason::RequestsExceeded`]. That check
    /// reads the tally without the gate's lock, so a request racing a reset may
    /// still end up queued for the following window.
    ///
    /// Must be called from within a tokio runtime, which hosts the reset loop.
    pub async fn admit(&self, path: &str) -> ControlFlow<Reason, Admission> {
        let shared = &self.shared;
        let Some(gate) = shared.gate.as_ref() else {
            return ControlFlow::Continue(Admission::Unlimited);
        };

        if path_matcher::matches(path, &shared.exclusions) {
            trace!(path, "exempt from limiting");
            return ControlFlow::Continue(Admission::Exempt);
        }

        self.arm();

        if shared.fail_fast && shared.tally.load(Ordering::Acquire) >= shared.limit {
            debug!(path, limit = shared.limit, "requests exceeded");
            return ControlFlow::Break(Reason::RequestsExceeded);
        }

        if let Entry::Queued(waiter) = gate.enter() {
            // The loop may have gone idle between arming and queuing. Its final
            // reset and the transition to idle share one critical section, so
            // checking again here guarantees someone will release us.
            self.arm();
            let _ = waiter.await;
        }
        shared.tally.fetch_add(1, Ordering::AcqRel);

        ControlFlow::Continue(Admission::Gated)
    }

    /// Spawns the reset loop unless it is already running.
    fn arm(&self) {
        let mut state = self.shared.state.lock();
        if *state == LoopState::Idle {
            *state = LoopState::Active;
            debug!(window = ?self.shared.window, "arming reset loop");
            tokio::spawn(reset_loop(Arc::clone(&self.shared)));
        }
    }

    pub fn limit(&self) -> usize {
        self.shared.limit
    }

    pub fn window(&self) -> Duration {
        self.shared.window
    }

    pub fn fail_fast(&self) -> bool {
        self.shared.fail_fast
    }

    pub fn exclusions(&self) -> &[String] {
        &self.shared.exclusions
    }

    /// Admissions counted since the last reset.
    pub fn tally(&self) -> usize {
        self.shared.tally.load(Ordering::Acquire)
    }

    /// Number of callers queued for the next window.
    pub fn waiting(&self) -> usize {
        self.shared.gate.as_ref().map_or(0, CountingGate::waiting)
    }

    /// Whether the reset loop is currently running.
    pub fn is_active(&self) -> bool {
        *self.shared.state.lock() == LoopState::Active
    }
}

impl From<LimiterConfig> for WindowedLimiter {
    fn from(config: LimiterConfig) -> Self {
        Self::new(config)
    }
}

impl Shared {
    /// Clears the window. Returns `false` once the loop has gone idle.
    fn reset_window(&self) -> bool {
        let mut state = self.state.lock();
        self.tally.store(0, Ordering::Release);
        let released = self.gate.as_ref().map_or(0, CountingGate::reset);
        trace!(released, "window reset");

        if released == 0 {
            *state = LoopState::Idle;
            debug!("reset loop idle");
            false
        } else {
            true
        }
    }
}

async fn reset_loop(shared: Arc<Shared>) {
    loop {
        tokio::time::sleep(shared.window).await;
        if !shared.reset_window() {
            break;
        }
    }
}
