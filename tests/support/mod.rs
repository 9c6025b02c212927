// ABOUTME: Test support utilities.
// ABOUTME: Scripted operations, handlers, notifiers, and compensators for integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use rollwright::deploy::{
    Compensator, Deployment, HandlerSet, Orchestrator, PhaseContext, PhaseHandler, PhaseName,
    PhaseOutcome,
};
use rollwright::notify::{Notification, Notifier, NotifyError};
use rollwright::retry::{CommandOutput, Operation, RetryPolicy};
use rollwright::types::BackupId;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("rollwright=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Operation that replays a script of outputs, repeating the last one.
#[allow(dead_code)]
pub struct ScriptedOperation {
    outputs: Mutex<VecDeque<CommandOutput>>,
    last: Mutex<CommandOutput>,
    calls: AtomicU32,
}

#[allow(dead_code)]
impl ScriptedOperation {
    pub fn new(outputs: Vec<CommandOutput>) -> Self {
        let last = outputs.last().cloned().unwrap_or_default();
        Self {
            outputs: Mutex::new(outputs.into()),
            last: Mutex::new(last),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(output: CommandOutput) -> Self {
        Self::new(vec![output])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Operation for ScriptedOperation {
    async fn invoke(&self) -> std::io::Result<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.outputs.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.last.lock().clone()))
    }
}

/// Handler with a fixed outcome, optional delay, and a call counter.
#[allow(dead_code)]
#[derive(Clone)]
pub struct ScriptedHandler {
    success: bool,
    message: String,
    delay: Duration,
    calls: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl ScriptedHandler {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            ..Self::ok()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhaseHandler for ScriptedHandler {
    async fn handle(&self, ctx: PhaseContext) -> PhaseOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.report_progress(50, "halfway");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.success {
            PhaseOutcome::success(self.message.clone())
        } else {
            PhaseOutcome::failure(self.message.clone())
        }
    }
}

/// Handler that pauses its own deployment, then succeeds.
#[allow(dead_code)]
pub struct PausingHandler {
    pub orchestrator: Arc<Mutex<Option<Orchestrator>>>,
}

#[async_trait]
impl PhaseHandler for PausingHandler {
    async fn handle(&self, ctx: PhaseContext) -> PhaseOutcome {
        let orchestrator = self.orchestrator.lock().clone();
        if let Some(orchestrator) = orchestrator {
            orchestrator.pause(ctx.deployment_id()).unwrap();
        }
        PhaseOutcome::success("paused after work")
    }
}

/// Handlers that succeed for every standard phase.
#[allow(dead_code)]
pub fn succeeding_handlers() -> HandlerSet {
    let mut handlers = HandlerSet::new();
    for phase in PhaseName::ALL {
        handlers.register(phase, Arc::new(ScriptedHandler::ok()));
    }
    handlers
}

/// Handlers that succeed except `phase`, which uses `handler`.
#[allow(dead_code)]
pub fn handlers_with(phase: PhaseName, handler: impl PhaseHandler + 'static) -> HandlerSet {
    let mut handlers = succeeding_handlers();
    handlers.register(phase, Arc::new(handler));
    handlers
}

/// Notifier that records every delivery.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, Notification)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        destination: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .push((destination.to_string(), notification.clone()));
        Ok(())
    }
}

/// Compensator that records which actions ran.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingCompensator {
    pub actions: Mutex<Vec<String>>,
    pub fail: bool,
}

#[allow(dead_code)]
impl RecordingCompensator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn record(&self, action: String) -> Result<(), String> {
        self.actions.lock().push(action);
        if self.fail {
            Err("compensating action failed".to_string())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Compensator for RecordingCompensator {
    async fn recreate(&self, deployment: &Deployment) -> Result<(), String> {
        self.record(format!("recreate:{}", deployment.id))
    }

    async fn restore_snapshot(&self, deployment: &Deployment, backup: &BackupId) -> Result<(), String> {
        self.record(format!("snapshot:{}:{}", deployment.id, backup))
    }

    async fn switch_traffic(&self, deployment: &Deployment) -> Result<(), String> {
        self.record(format!("blue_green:{}", deployment.id))
    }
}

/// Retry policy without jitter so paused-clock tests are deterministic.
#[allow(dead_code)]
pub fn quiet_policy() -> RetryPolicy {
    RetryPolicy::default().without_jitter()
}
