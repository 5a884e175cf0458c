use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use gate_limit::Admission;
use gate_limit::Reason;
use gate_limit::WindowedLimiter;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tokio::time::Sleep;
use tokio::time::sleep;
use tower::BoxError;
use tower::Service;
use tracing::debug;

use crate::error::GateError;
use crate::path::RequestPath;

type AdmitFuture = Pin<Box<dyn Future<Output = ControlFlow<Reason, Admission>> + Send>>;

#[derive(Clone, Debug)]
struct ThrottleServiceMetrics {
    admitted: Counter<u64>,
    rejected: Counter<u64>,
}

impl ThrottleServiceMetrics {
    fn record_admission(&self, admission: Admission) {
        let kind = match admission {
            Admission::Unlimited => "unlimited",
            Admission::Exempt => "exempt",
            Admission::Gated => "gated",
        };
        self.admitted.add(1, &[KeyValue::new("admission", kind)]);
    }

    fn record_rejection(&self, err: &GateError) {
        let reason = match err {
            GateError::RequestsExceeded => "requests_exceeded",
            GateError::Timeout => "timeout",
        };
        self.rejected.add(1, &[KeyValue::new("reason", reason)]);
    }
}

/// Throttles requests to the inner service through a shared [`WindowedLimiter`].
///
/// Each call first waits for admission and then dispatches the request to the inner
/// service exactly once.
#[derive(Clone, Debug)]
pub struct ThrottleService<S> {
    inner: S,
    limiter: WindowedLimiter,
    timeout: Option<Duration>,
    instruments: ThrottleServiceMetrics,
}

pin_project! {
    /// The response future of [`ThrottleService`].
    ///
    /// Resolves with [`GateError`] if admission is refused, otherwise with whatever the
    /// inner service returns.
    pub struct ResponseFuture<S, Req>
    where
        S: Service<Req>,
    {
        #[pin]
        state: State<S, Req>,
        instruments: ThrottleServiceMetrics,
    }
}

pin_project! {
    #[project = StateProj]
    enum State<S, Req>
    where
        S: Service<Req>,
    {
        Admitting {
            admission: AdmitFuture,
            #[pin]
            deadline: Option<Sleep>,
            // Taken exactly once, when admission succeeds
            call: Option<(S, Req)>,
        },
        Calling {
            #[pin]
            future: <S as Service<Req>>::Future,
        },
    }
}

impl<S, Req> ResponseFuture<S, Req>
where
    S: Service<Req>,
{
    fn reject(self: Pin<&mut Self>, err: GateError) -> Poll<Result<S::Response, BoxError>> {
        self.project().instruments.record_rejection(&err);
        Poll::Ready(Err(Box::new(err)))
    }
}

impl<S, Req> Future for ResponseFuture<S, Req>
where
    S: Service<Req>,
    S::Error: Into<BoxError>,
{
    type Output = Result<S::Response, BoxError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            let mut this = self.as_mut().project();
            match this.state.as_mut().project() {
                StateProj::Admitting {
                    admission,
                    deadline,
                    call,
                } => {
                    let outcome = match admission.as_mut().poll(cx) {
                        Poll::Ready(outcome) => outcome,
                        Poll::Pending => {
                            if let Some(deadline) = deadline.as_pin_mut()
                                && deadline.poll(cx).is_ready()
                            {
                                debug!("admission deadline elapsed");
                                return self.reject(GateError::Timeout);
                            }
                            return Poll::Pending;
                        }
                    };

                    match outcome {
                        ControlFlow::Continue(admission) => {
                            this.instruments.record_admission(admission)
                        }
                        ControlFlow::Break(reason) => return self.reject(reason.into()),
                    }

                    let Some((mut service, request)) = call.take() else {
                        unreachable!("admission resolves only once");
                    };
                    let future = service.call(request);
                    this.state.set(State::Calling { future });
                }
                StateProj::Calling { future } => return future.poll(cx).map_err(Into::into),
            }
        }
    }
}

impl<S, Req> Service<Req> for ThrottleService<S>
where
    S: Service<Req> + Clone,
    S::Error: Into<BoxError>,
    Req: RequestPath,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = ResponseFuture<S, Req>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // Keep the instance that was driven to readiness for this request and leave a
        // fresh clone behind for the next one.
        let clone = self.inner.clone();
        let service = std::mem::replace(&mut self.inner, clone);

        let limiter = self.limiter.clone();
        let path = req.request_path().to_owned();
        let admission: AdmitFuture = Box::pin(async move { limiter.admit(&path).await });

        ResponseFuture {
            state: State::Admitting {
                admission,
                deadline: self.timeout.map(sleep),
                call: Some((service, req)),
            },
            instruments: self.instruments.clone(),
        }
    }
}

impl<S> ThrottleService<S> {
    pub fn new(inner: S, limiter: WindowedLimiter) -> Self {
        let meter = global::meter("throttle_service");
        let instruments = ThrottleServiceMetrics {
            admitted: meter.u64_counter("admitted").build(),
            rejected: meter.u64_counter("rejected").build(),
        };

        Self {
            inner,
            limiter,
            timeout: None,
            instruments,
        }
    }

    /// Set the longest a request may wait for admission.
    ///
    /// The inner service call itself is not bounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn limiter(&self) -> &WindowedLimiter {
        &self.limiter
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}
