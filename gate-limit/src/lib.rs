//! # gate-limit
//!
//! `gate-limit` provides the admission machinery for throttling outbound requests to
//! "at most N per window".
//!
//! ## Core Philosophy
//!
//! Requests that exceed the limit are not dropped or retried. They queue, in arrival
//! order, on a [`CountingGate`] until the next window reopens it. A background reset
//! loop drives the windows, and it only runs while there is traffic to drain: once a
//! reset finds nobody waiting the loop goes idle, and the next admission re-arms it.
//!
//! ## Key Concepts
//!
//! * **Counting Gate**: admits up to `capacity` holders, queues the rest FIFO.
//! * **Windowed Reset**: every `window` the tally is cleared and the gate releases up to
//!   `limit` queued callers.
//! * **Exemptions**: request paths matching a configured pattern bypass the gate
//!   entirely. See [`path_matcher`] for the pattern rules.
//! * **Fail Fast**: optionally reject with [`Reason::RequestsExceeded`] instead of
//!   queuing once the window is used up.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use gate_limit::LimiterConfig;
//! use gate_limit::WindowedLimiter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = LimiterConfig::new(100, Duration::from_secs(60))
//!     .with_exclusions(["/health/", "/servers/*/status"]);
//! let limiter = WindowedLimiter::new(config);
//!
//! if limiter.admit("/servers/42").await.is_continue() {
//!     // Dispatch the request
//! }
//! # }
//! ```

mod config;
mod gate;
pub mod path_matcher;
mod windowed;

pub use config::ConfigError;
pub use config::LimiterConfig;
pub use gate::CountingGate;
pub use windowed::WindowedLimiter;

/// Reasons why a request might be rejected by the limiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    /// The window's allowance is already used up and the limiter is configured to
    /// fail fast rather than queue.
    RequestsExceeded,
}

/// How an admitted request got through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Limiting is disabled (a limit of zero).
    Unlimited,
    /// The path matched an exclusion pattern.
    Exempt,
    /// The request took a slot in the current window.
    Gated,
}
