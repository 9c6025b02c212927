// ABOUTME: Retry controller executing external operations with adaptive backoff.
// ABOUTME: Guards each operation name with a shared circuit breaker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Level;

use super::backoff::adaptive_delay;
use super::breaker::{BreakerState, CircuitBreaker};
use super::error::{CircuitOpenSnafu, FailedSnafu, RetryError};
use super::operation::{CommandOutput, Operation};
use super::policy::RetryPolicy;
use super::service::ServiceClass;
use crate::classify::classify;
use crate::telemetry::Telemetry;

/// Executes operations with classification-driven retries.
pub struct RetryController {
    policy: RetryPolicy,
    breaker: CircuitBreaker,
    telemetry: Arc<dyn Telemetry>,
    /// Sequence for timer keys; concurrent calls may share an operation name.
    calls: AtomicU64,
}

impl std::fmt::Debug for RetryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryController")
            .field("policy", &self.policy)
            .finish()
    }
}

impl RetryController {
    pub fn new(policy: RetryPolicy, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            breaker: CircuitBreaker::new(policy.failure_threshold, policy.recovery_timeout),
            policy,
            telemetry,
            calls: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` up to `max_attempts` times.
    ///
    /// # Errors
    ///
    /// - `RetryError::CircuitOpen` if the breaker for `operation_name` is open;
    ///   the operation is not invoked.
    /// - `RetryError::Failed` with the last captured output once the failure is
    ///   permanent, attempts run out, or the failure opened the breaker.
    pub async fn execute(
        &self,
        operation_name: &str,
        max_attempts: u32,
        operation: &dyn Operation,
    ) -> Result<CommandOutput, RetryError> {
        if let Err(remaining) = self.breaker.check(operation_name) {
            self.telemetry.event(
                Level::ERROR,
                "circuit breaker open, skipping call",
                &[
                    ("operation", operation_name.to_string()),
                    ("remaining_secs", remaining.as_secs().to_string()),
                ],
            );
            return CircuitOpenSnafu {
                operation: operation_name,
                remaining,
            }
            .fail();
        }

        let max_attempts = max_attempts.max(1);
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let call_timer = format!("retry:{operation_name}#{call}");
        self.telemetry.start_timer(&call_timer);

        let mut attempt = 1;
        let result = loop {
            let attempt_timer = format!("{call_timer}:attempt:{attempt}");
            self.telemetry.start_timer(&attempt_timer);
            let output = self.invoke_once(operation).await;
            let elapsed = self.telemetry.stop_timer(&attempt_timer).unwrap_or_default();

            if output.success() {
                self.breaker.record_success(operation_name);
                self.telemetry.event(
                    Level::DEBUG,
                    "operation succeeded",
                    &[
                        ("operation", operation_name.to_string()),
                        ("attempt", attempt.to_string()),
                        ("elapsed_secs", format!("{elapsed:.3}")),
                    ],
                );
                break Ok(output);
            }

            let verdict = self.breaker.record_failure(operation_name);
            let classification = classify(output.error_text(), operation_name, output.exit_code);
            self.telemetry.event(
                Level::WARN,
                "operation failed",
                &[
                    ("operation", operation_name.to_string()),
                    ("attempt", attempt.to_string()),
                    ("exit_code", output.exit_code.to_string()),
                    ("error_code", classification.error_code.clone()),
                    ("category", classification.category.to_string()),
                    ("retryable", classification.retryable.to_string()),
                    ("consecutive_failures", verdict.consecutive_failures.to_string()),
                ],
            );

            if verdict.tripped {
                self.telemetry.event(
                    Level::ERROR,
                    "failure threshold reached, opening circuit breaker",
                    &[
                        ("operation", operation_name.to_string()),
                        ("recovery_secs", self.policy.recovery_timeout.as_secs().to_string()),
                    ],
                );
            }

            let give_up = verdict.tripped
                || !classification.retryable
                || attempt >= max_attempts
                || attempt > classification.max_retries;
            if give_up {
                break FailedSnafu {
                    operation: operation_name,
                    attempts: attempt,
                    output,
                    classification: Box::new(classification),
                    breaker_tripped: verdict.tripped,
                }
                .fail();
            }

            let delay = adaptive_delay(
                classification.category,
                classification.retry_delay,
                attempt,
                self.policy.max_delay,
            ) + self.policy.jitter().sample();
            self.telemetry.event(
                Level::INFO,
                "retrying after backoff",
                &[
                    ("operation", operation_name.to_string()),
                    ("next_attempt", (attempt + 1).to_string()),
                    ("delay_secs", format!("{:.1}", delay.as_secs_f64())),
                    ("suggested_action", classification.suggested_action.to_string()),
                ],
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        if let Some(total) = self.telemetry.stop_timer(&call_timer) {
            self.telemetry.event(
                Level::DEBUG,
                "retry call finished",
                &[
                    ("operation", operation_name.to_string()),
                    ("attempts", attempt.to_string()),
                    ("total_secs", format!("{total:.3}")),
                ],
            );
        }

        result
    }

    async fn invoke_once(&self, operation: &dyn Operation) -> CommandOutput {
        match tokio::time::timeout(self.policy.attempt_timeout, operation.invoke()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => CommandOutput::spawn_failed(err),
            Err(_) => CommandOutput::timed_out(self.policy.attempt_timeout),
        }
    }

    /// Run `operation` with the service's default attempt budget.
    pub async fn call(
        &self,
        service: ServiceClass,
        name: &str,
        operation: &dyn Operation,
    ) -> Result<CommandOutput, RetryError> {
        self.execute(
            &service.operation_name(name),
            service.default_max_attempts(),
            operation,
        )
        .await
    }

    pub async fn ec2(&self, name: &str, operation: &dyn Operation) -> Result<CommandOutput, RetryError> {
        self.call(ServiceClass::Ec2, name, operation).await
    }

    pub async fn s3(&self, name: &str, operation: &dyn Operation) -> Result<CommandOutput, RetryError> {
        self.call(ServiceClass::S3, name, operation).await
    }

    pub async fn iam(&self, name: &str, operation: &dyn Operation) -> Result<CommandOutput, RetryError> {
        self.call(ServiceClass::Iam, name, operation).await
    }

    pub async fn cloudformation(
        &self,
        name: &str,
        operation: &dyn Operation,
    ) -> Result<CommandOutput, RetryError> {
        self.call(ServiceClass::CloudFormation, name, operation).await
    }

    pub fn breaker_state(&self, operation_name: &str) -> Option<BreakerState> {
        self.breaker.state(operation_name)
    }

    pub fn reset_breaker(&self, operation_name: &str) {
        self.breaker.reset(operation_name);
    }
}
