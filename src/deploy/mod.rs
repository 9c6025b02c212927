// ABOUTME: Deployment orchestration: registry, phases, executor, gate, rollback, and reporting.
// ABOUTME: The Orchestrator is the public entry point; the rest is exported for composition and tests.

mod error;
mod executor;
mod gate;
mod handler;
pub mod options;
mod orchestrator;
mod phase;
mod record;
mod registry;
mod report;
mod rollback;
mod state;

pub use error::{DeployError, DeployErrorKind};
pub use executor::{PhaseExecutor, RunOutcome};
pub use gate::{DependencyGate, MISSING_DEPENDENCY};
pub use handler::{HandlerSet, PhaseContext, PhaseHandler, PhaseOutcome};
pub use options::DeploymentOptions;
pub use orchestrator::{DEFAULT_REGION, Orchestrator, OrchestratorBuilder, RunReport};
pub use phase::{PhaseCatalog, PhaseName, PhaseSpec};
pub use record::{
    Deployment, DeploymentSnapshot, HistoryEvent, PhaseEntry, PhaseMetric, PhaseProgress,
    RollbackInfo, events, result_codes,
};
pub use registry::{PhaseResult, Registry, RunStart};
pub use report::{StatusFormat, render};
pub use rollback::{
    Compensator, NoopCompensator, RollbackManager, RollbackOutcome, RollbackStrategy,
};
pub use state::{DeploymentStatus, PhaseStatus};
