//! # Tower Gate
//!
//! `tower-gate` throttles outbound requests for the
//! [Tower](https://github.com/tower-rs/tower) ecosystem: wrap the service that actually
//! sends requests (an HTTP client, a connection pool, ...) in a [`ThrottleLayer`] and at
//! most `limit` requests are dispatched per window.
//!
//! ## Behaviour
//!
//! 1. **Queuing**: requests over the limit wait, in arrival order, for the next
//!    window. Nothing is dropped and nothing is retried.
//! 2. **Exemptions**: requests whose path matches a configured exclusion pattern are
//!    dispatched immediately and do not count towards the limit.
//! 3. **Fail Fast**: optionally, requests over the limit fail with
//!    [`GateError::RequestsExceeded`] instead of waiting.
//! 4. **Deadlines**: [`ThrottleLayer::with_timeout`] bounds how long a request may
//!    wait for admission, failing with [`GateError::Timeout`].
//!
//! Errors from the wrapped service are passed through untouched.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use gate_limit::LimiterConfig;
//! use tower::ServiceBuilder;
//! use tower::ServiceExt;
//! use tower_gate::ServiceBuilderExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tower::BoxError> {
//! let config = LimiterConfig::new(60, Duration::from_secs(60))
//!     .with_exclusions(["/servers/*/status"]);
//!
//! let client = ServiceBuilder::new()
//!     .throttle(config.into())
//!     .service_fn(|path: &'static str| async move {
//!         Ok::<_, tower::BoxError>(format!("GET {path}"))
//!     });
//!
//! assert_eq!(client.oneshot("/servers/1").await?, "GET /servers/1");
//! # Ok(())
//! # }
//! ```

mod error;
mod layer;
mod path;
mod service;
mod utils;


pub use error::GateError;
pub use layer::ThrottleLayer;
pub use path::RequestPath;
pub use service::ResponseFuture;
pub use service::ThrottleService;
pub use utils::ServiceBuilderExt;
pub use utils::make_throttled_svc;
