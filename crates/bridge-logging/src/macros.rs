//! ---
//! bridge_section: "03-logging"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Structured lifecycle logging helpers."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
/// Emit an event at the given level enriched with bridge lifecycle context.
#[doc(hidden)]
#[macro_export]
macro_rules! __bridge_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            service = ctx.service.unwrap_or(""),
            subsystem = ctx.subsystem.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            sequence = ctx.sequence.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with lifecycle context.
#[macro_export]
macro_rules! bridge_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__bridge_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__bridge_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with lifecycle context.
#[macro_export]
macro_rules! bridge_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__bridge_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__bridge_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with lifecycle context.
#[macro_export]
macro_rules! bridge_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__bridge_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__bridge_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with lifecycle context.
#[macro_export]
macro_rules! bridge_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__bridge_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__bridge_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
