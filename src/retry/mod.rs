// ABOUTME: Adaptive retry layer for external provider calls.
// ABOUTME: Exports the controller, circuit breaker, backoff policy, and operation types.

mod backoff;
mod breaker;
mod controller;
mod error;
mod operation;
mod policy;
mod service;

pub use backoff::{Jitter, adaptive_delay};
pub use breaker::{BreakerState, CircuitBreaker, FailureVerdict};
pub use controller::RetryController;
pub use error::{RetryError, RetryErrorKind};
pub use operation::{
    CommandOutput, EXIT_SPAWN_FAILED, EXIT_TIMEOUT, FnOperation, Operation, ShellCommand, from_fn,
};
pub use policy::RetryPolicy;
pub use service::ServiceClass;
