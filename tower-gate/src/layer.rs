use std::time::Duration;

use gate_limit::ConfigError;
use gate_limit::LimiterConfig;
use gate_limit::WindowedLimiter;
use tower::Layer;

use crate::service::ThrottleService;

/// Applies windowed throttling to requests.
///
/// Every service produced by the same layer (or by clones of it) shares one window.
#[derive(Clone, Debug)]
pub struct ThrottleLayer {
    limiter: WindowedLimiter,
    timeout: Option<Duration>,
}

impl ThrottleLayer {
    /// Create a ThrottleLayer
    pub fn new(limiter: WindowedLimiter) -> Self {
        ThrottleLayer {
            limiter,
            timeout: None,
        }
    }

    /// Validate `config` and create a ThrottleLayer from it.
    pub fn from_config(config: LimiterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(WindowedLimiter::new(config)))
    }

    /// Set the longest a request may wait to be admitted.
    ///
    /// If the wait exceeds this duration, the service will return
    /// `GateError::Timeout` and the request is never dispatched.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn limiter(&self) -> &WindowedLimiter {
        &self.limiter
    }
}

impl<S> Layer<S> for ThrottleLayer {
    type Service = ThrottleService<S>;

    fn layer(&self, service: S) -> Self::Service {
        let mut svc = ThrottleService::new(service, self.limiter.clone());
        if let Some(timeout) = self.timeout {
            svc = svc.with_timeout(timeout);
        }
        svc
    }
}
