// ABOUTME: Integration tests for the retry controller and circuit breaker.
// ABOUTME: Uses a paused tokio clock so backoff and cool-down run instantly.

mod support;

use rollwright::classify::Category;
use parking_lot::Mutex;
use rollwright::retry::{
    CommandOutput, EXIT_TIMEOUT, RetryController, RetryErrorKind, RetryPolicy, ServiceClass,
    from_fn,
};
use rollwright::telemetry::{NoopTelemetry, Telemetry};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use support::{ScriptedOperation, quiet_policy};
use tokio::time::Instant;
use tracing::Level;

const THROTTLED: &str = "An error occurred (Throttling) when calling the ListBuckets operation";
const DENIED: &str = "An error occurred (AccessDenied) when calling DescribeInstances";

fn controller() -> RetryController {
    support::init_tracing();
    RetryController::new(quiet_policy(), Arc::new(NoopTelemetry::default()))
}

mod breaker {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn five_failures_open_the_breaker_and_sixth_call_is_rejected() {
        let retry = controller();
        let op = ScriptedOperation::always(CommandOutput::failed(255, THROTTLED));

        let err = retry.execute("s3:list", 6, &op).await.unwrap_err();
        assert_eq!(err.kind(), RetryErrorKind::BreakerTripped);
        assert_eq!(op.calls(), 5);

        let err = retry.execute("s3:list", 6, &op).await.unwrap_err();
        assert_eq!(err.kind(), RetryErrorKind::CircuitOpen);
        assert!(err.remaining_cooldown().unwrap() <= Duration::from_secs(300));
        assert_eq!(op.calls(), 5, "open breaker must not invoke the operation");
    }

    #[tokio::test(start_paused = true)]
    async fn failures_across_separate_calls_accumulate() {
        let retry = controller();
        let op = ScriptedOperation::always(CommandOutput::failed(255, DENIED));

        for _ in 0..4 {
            let err = retry.execute("ec2:describe", 6, &op).await.unwrap_err();
            assert_eq!(err.kind(), RetryErrorKind::Permanent);
        }
        assert_eq!(
            retry.breaker_state("ec2:describe").unwrap().consecutive_failures,
            4
        );

        let err = retry.execute("ec2:describe", 6, &op).await.unwrap_err();
        assert_eq!(err.kind(), RetryErrorKind::BreakerTripped);

        let err = retry.execute("ec2:describe", 6, &op).await.unwrap_err();
        assert_eq!(err.kind(), RetryErrorKind::CircuitOpen);
        assert_eq!(op.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_closes_after_recovery_timeout() {
        let retry = controller();
        let failing = ScriptedOperation::always(CommandOutput::failed(255, THROTTLED));
        retry.execute("cfn:deploy", 5, &failing).await.unwrap_err();

        tokio::time::advance(Duration::from_secs(301)).await;

        let ok = ScriptedOperation::always(CommandOutput::ok("done"));
        let output = retry.execute("cfn:deploy", 5, &ok).await.unwrap();
        assert_eq!(output.stdout, "done");
        assert!(retry.breaker_state("cfn:deploy").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn breakers_are_per_operation_name() {
        let retry = controller();
        let failing = ScriptedOperation::always(CommandOutput::failed(255, THROTTLED));
        retry.execute("s3:put", 5, &failing).await.unwrap_err();

        let ok = ScriptedOperation::always(CommandOutput::ok(""));
        assert!(retry.execute("s3:get", 5, &ok).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn success_clears_consecutive_failures() {
        let retry = controller();
        let op = ScriptedOperation::new(vec![
            CommandOutput::failed(255, THROTTLED),
            CommandOutput::failed(255, THROTTLED),
            CommandOutput::ok("fine"),
        ]);
        retry.execute("iam:get", 5, &op).await.unwrap();
        assert!(retry.breaker_state("iam:get").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_breaker_allows_calls_again() {
        let retry = controller();
        let failing = ScriptedOperation::always(CommandOutput::failed(255, THROTTLED));
        retry.execute("ec2:run", 6, &failing).await.unwrap_err();
        retry.reset_breaker("ec2:run");

        let ok = ScriptedOperation::always(CommandOutput::ok(""));
        assert!(retry.execute("ec2:run", 6, &ok).await.is_ok());
    }
}

mod attempts {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rate_errors_back_off_exponentially() {
        let retry = controller();
        let op = ScriptedOperation::new(vec![
            CommandOutput::failed(255, THROTTLED),
            CommandOutput::failed(255, THROTTLED),
            CommandOutput::ok("listed"),
        ]);

        let started = Instant::now();
        let output = retry.execute("s3:list", 5, &op).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(output.stdout, "listed");
        assert_eq!(op.calls(), 3);
        // 5s after the first failure, 10s after the second.
        assert!(elapsed >= Duration::from_secs(15), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(16), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let retry = controller();
        let op = ScriptedOperation::always(CommandOutput::failed(254, DENIED));

        let err = retry.execute("ec2:describe", 6, &op).await.unwrap_err();
        assert_eq!(err.kind(), RetryErrorKind::Permanent);
        assert_eq!(err.category(), Some(Category::Auth));
        assert_eq!(err.output().unwrap().exit_code, 254);
        assert_eq!(op.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_stop_at_max_attempts() {
        let retry = controller();
        let op = ScriptedOperation::always(CommandOutput::failed(1, "Connection reset by peer"));

        let err = retry.execute("net:probe", 2, &op).await.unwrap_err();
        assert_eq!(err.kind(), RetryErrorKind::Exhausted);
        assert_eq!(op.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_errors_respect_category_retry_budget() {
        let retry = controller();
        let op = ScriptedOperation::always(CommandOutput::failed(
            1,
            "An error occurred (InsufficientInstanceCapacity) when calling RunInstances",
        ));

        let err = retry.execute("ec2:run", 6, &op).await.unwrap_err();
        assert_eq!(err.kind(), RetryErrorKind::Exhausted);
        // Capacity allows two retries beyond the first attempt.
        assert_eq!(op.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_time_out_with_exit_124() {
        let retry = controller();
        let op = from_fn(|| async {
            tokio::time::sleep(Duration::from_secs(400)).await;
            Ok(CommandOutput::ok("too late"))
        });

        let err = retry.execute("cfn:wait", 1, &op).await.unwrap_err();
        let output = err.output().unwrap();
        assert_eq!(output.exit_code, EXIT_TIMEOUT);
        assert_eq!(err.category(), Some(Category::Network));
    }

    #[tokio::test(start_paused = true)]
    async fn service_wrappers_tag_operation_names() {
        let retry = controller();
        let op = ScriptedOperation::always(CommandOutput::failed(254, DENIED));

        retry.iam("get-user", &op).await.unwrap_err();
        assert!(retry.breaker_state("iam:get-user").is_some());
        assert_eq!(ServiceClass::Iam.default_max_attempts(), 2);
    }
}

mod jitter {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn default_policy_adds_jitter_to_backoff() {
        support::init_tracing();
        let retry = RetryController::new(RetryPolicy::default(), Arc::new(NoopTelemetry::default()));
        let op = ScriptedOperation::new(vec![
            CommandOutput::failed(255, THROTTLED),
            CommandOutput::ok("listed"),
        ]);

        let started = Instant::now();
        retry.execute("s3:list", 3, &op).await.unwrap();
        let elapsed = started.elapsed();

        // 5s base delay plus 1-3s of jitter.
        assert_eq!(op.calls(), 2);
        assert!(elapsed >= Duration::from_secs(6), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(8), "elapsed {elapsed:?}");
    }
}

mod timers {
    use super::*;

    #[derive(Default)]
    struct TimerLog {
        started: Mutex<Vec<String>>,
    }

    impl Telemetry for TimerLog {
        fn event(&self, _level: Level, _message: &str, _fields: &[(&str, String)]) {}

        fn start_timer(&self, name: &str) {
            self.started.lock().push(name.to_string());
        }

        fn stop_timer(&self, _name: &str) -> Option<f64> {
            Some(0.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn calls_with_the_same_name_use_distinct_timers() {
        let log = Arc::new(TimerLog::default());
        let retry = RetryController::new(quiet_policy(), log.clone());
        let first = ScriptedOperation::new(vec![
            CommandOutput::failed(255, THROTTLED),
            CommandOutput::ok("done"),
        ]);
        let second = ScriptedOperation::always(CommandOutput::ok("done"));

        let (a, b) = tokio::join!(
            retry.execute("cloudformation:deploy", 3, &first),
            retry.execute("cloudformation:deploy", 3, &second),
        );
        a.unwrap();
        b.unwrap();

        let started = log.started.lock().clone();
        // Two call timers plus three attempt timers.
        assert_eq!(started.len(), 5);
        let unique: HashSet<&String> = started.iter().collect();
        assert_eq!(unique.len(), started.len(), "{started:?}");
    }
}
