//! Panic reporting for rendering paths.

use std::panic::{self, AssertUnwindSafe};

/// Receives reports about panics that escaped a guarded section.
pub trait FaultReporter {
    /// Record a panic from the named section.
    fn report(&self, section: &str, message: &str);
}

/// Reporter that writes panic reports to the tracing log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingFaultReporter;

impl FaultReporter for TracingFaultReporter {
    fn report(&self, section: &str, message: &str) {
        tracing::error!("panic in {}: {}", section, message);
    }
}

/// Run `f`, report any panic through `reporter`, then resume unwinding.
///
/// The panic is reported but never swallowed. Callers that want to keep
/// running have to catch it further up the stack.
pub fn guard<T>(reporter: &dyn FaultReporter, section: &str, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            reporter.report(section, &payload_message(payload.as_ref()));
            panic::resume_unwind(payload);
        }
    }
}

/// Pull a readable message out of a panic payload.
fn payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
