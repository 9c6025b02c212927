// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod deployment_type;
mod id;
mod stack_name;

pub use deployment_type::{DeploymentType, DeploymentTypeError};
pub use id::{BackupId, DeploymentId, Id, IdError, IdKind, SessionId};
pub use stack_name::{MAX_STACK_NAME_LEN, StackName, StackNameError};
