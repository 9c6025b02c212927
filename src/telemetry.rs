// ABOUTME: Logging and timing collaborator injected into the retry and deploy layers.
// ABOUTME: TracingTelemetry forwards leveled events to tracing and keeps named timers.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::Level;

/// Sink for structured events and named timers.
pub trait Telemetry: Send + Sync {
    /// Emit a leveled event with key/value fields.
    fn event(&self, level: Level, message: &str, fields: &[(&str, String)]);

    /// Start (or restart) a named timer.
    fn start_timer(&self, name: &str);

    /// Stop a named timer, returning elapsed seconds if it was running.
    fn stop_timer(&self, name: &str) -> Option<f64>;
}

/// Default telemetry backed by `tracing`.
#[derive(Default)]
pub struct TracingTelemetry {
    timers: Mutex<HashMap<String, Instant>>,
}

impl TracingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn render_fields(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Telemetry for TracingTelemetry {
    fn event(&self, level: Level, message: &str, fields: &[(&str, String)]) {
        let fields = render_fields(fields);
        match level {
            Level::ERROR => tracing::error!(%fields, "{message}"),
            Level::WARN => tracing::warn!(%fields, "{message}"),
            Level::INFO => tracing::info!(%fields, "{message}"),
            Level::DEBUG => tracing::debug!(%fields, "{message}"),
            _ => tracing::trace!(%fields, "{message}"),
        }
    }

    fn start_timer(&self, name: &str) {
        self.timers.lock().insert(name.to_string(), Instant::now());
    }

    fn stop_timer(&self, name: &str) -> Option<f64> {
        let started = self.timers.lock().remove(name)?;
        let elapsed = started.elapsed().as_secs_f64();
        tracing::trace!(timer = name, elapsed, "timer stopped");
        Some(elapsed)
    }
}

/// Telemetry that discards everything. Timers still measure.
#[derive(Default)]
pub struct NoopTelemetry {
    timers: Mutex<HashMap<String, Instant>>,
}

impl Telemetry for NoopTelemetry {
    fn event(&self, _level: Level, _message: &str, _fields: &[(&str, String)]) {}

    fn start_timer(&self, name: &str) {
        self.timers.lock().insert(name.to_string(), Instant::now());
    }

    fn stop_timer(&self, name: &str) -> Option<f64> {
        self.timers
            .lock()
            .remove(name)
            .map(|t| t.elapsed().as_secs_f64())
    }
}
