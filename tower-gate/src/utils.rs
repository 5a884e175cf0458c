use std::time::Duration;

use gate_limit::WindowedLimiter;
use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::layer::util::Stack;
use tower::util::BoxCloneSyncService;

use crate::RequestPath;
use crate::ThrottleLayer;

/// Throttle `svc` and erase the resulting type, bounding the wait for admission
/// when `timeout` is given.
pub fn make_throttled_svc<V, Req, Resp>(
    limiter: WindowedLimiter,
    timeout: Option<Duration>,
    svc: V,
) -> BoxCloneSyncService<Req, Resp, BoxError>
where
    Req: RequestPath + Send + 'static,
    V: Service<Req, Response = Resp> + Clone + Send + Sync + 'static,
    V::Error: Into<BoxError>,
    V::Future: Send + 'static,
    Resp: 'static,
{
    let mut layer = ThrottleLayer::new(limiter);
    if let Some(timeout) = timeout {
        layer = layer.with_timeout(timeout);
    }
    BoxCloneSyncService::new(ServiceBuilder::new().layer(layer).service(svc))
}

/// Service Builder Extension with additional useful functions for tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Add a throttling layer
    fn throttle(self, limiter: WindowedLimiter) -> ServiceBuilder<Stack<ThrottleLayer, L>>;

    /// Add a throttling layer that gives up waiting for admission after `timeout`
    fn throttle_with_timeout(
        self,
        limiter: WindowedLimiter,
        timeout: Duration,
    ) -> ServiceBuilder<Stack<ThrottleLayer, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn throttle(self, limiter: WindowedLimiter) -> ServiceBuilder<Stack<ThrottleLayer, L>> {
        self.layer(ThrottleLayer::new(limiter))
    }

    fn throttle_with_timeout(
        self,
        limiter: WindowedLimiter,
        timeout: Duration,
    ) -> ServiceBuilder<Stack<ThrottleLayer, L>> {
        self.layer(ThrottleLayer::new(limiter).with_timeout(timeout))
    }
}
