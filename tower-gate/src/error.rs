use gate_limit::Reason;

/// Errors produced by the throttling middleware.
///
/// Failures of the wrapped service are never converted into a `GateError`; they reach
/// the caller as the inner service returned them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The window's allowance was already used up and the limiter fails fast.
    ///
    /// No hint is given about when capacity returns.
    #[error("you have exceeded requests count")]
    RequestsExceeded,

    /// The request was queued but exceeded the maximum allowed wait for admission.
    #[error("request timed out waiting for admission")]
    Timeout,
}

impl From<Reason> for GateError {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::RequestsExceeded => Self::RequestsExceeded,
        }
    }
}
