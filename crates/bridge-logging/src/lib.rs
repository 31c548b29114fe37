//! ---
//! bridge_section: "03-logging"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Structured lifecycle logging helpers."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
//! Structured logging context and helpers used by the bridge lifecycle.
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Name of the bridge service instance.
    pub service: Option<&'a str>,
    /// Subsystem the event relates to.
    pub subsystem: Option<&'a str>,
    /// Lifecycle phase (start, shutdown).
    pub phase: Option<&'a str>,
    /// Step number within the phase.
    pub sequence: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a service name.
    pub fn with_service(mut self, service: &'a str) -> Self {
        self.service = Some(service);
        self
    }

    /// Attach a subsystem name.
    pub fn with_subsystem(mut self, subsystem: &'a str) -> Self {
        self.subsystem = Some(subsystem);
        self
    }

    /// Attach a lifecycle phase.
    pub fn with_phase(mut self, phase: &'a str) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attach a step number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    /// Label recorded in the `outcome` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized system event with a success/fault outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default_ctx = LogContext::default();
    let ctx = context.unwrap_or(&default_ctx);
    match outcome {
        SystemEventOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            service = ctx.service.unwrap_or(""),
            subsystem = ctx.subsystem.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            service = ctx.service.unwrap_or(""),
            subsystem = ctx.subsystem.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_service("bridge-a")
            .with_subsystem("registry");
        bridge_info!(context = ctx.clone(), "registry online");
        bridge_debug!("debug message");
        bridge_warn!(context = ctx.clone().with_sequence(3), "slow stop");
        bridge_error!(context = ctx, "error code: {}", 42);
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_service("bridge-a").with_phase("start");
        log_system_event(
            Some(&ctx),
            "service.start",
            "system event helper executed",
            SystemEventOutcome::Success,
        );
        log_system_event(
            None,
            "service.start",
            "system event helper fault",
            SystemEventOutcome::Fault,
        );
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(SystemEventOutcome::Success.as_str(), "success");
        assert_eq!(SystemEventOutcome::Fault.as_str(), "fault");
    }
}
