//! Error reporting seam. Caught transport and provider errors are handed to a
//! [`Reporter`]; reporting is fire-and-forget and must never fail the caller.

use std::sync::Arc;
use tracing::error;

/// Receives errors that are swallowed by the API client or the login flow.
pub trait Reporter: Send + Sync {
    fn notify(&self, error: &(dyn std::error::Error + 'static));
}

/// Default reporter: emits a structured `tracing` error event. With OTLP export
/// enabled the event is attached to the active span and shipped to the
/// collector.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn notify(&self, error: &(dyn std::error::Error + 'static)) {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        error!(
            error.message = %error,
            error.chain = ?chain,
            "reported error"
        );
    }
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn notify(&self, error: &(dyn std::error::Error + 'static)) {
        (**self).notify(error);
    }
}
