#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Model metadata registration workflow.
//!
//! A [`RegistrationOrchestrator`] checks the requester's access to the target model group,
//! creates a group when none was named, stores the model metadata and reports a single
//! terminal result.

/// Requests, identities and model descriptors.
#[path = "../task.rs"]
pub mod task;

/// Response and task vocabulary.
#[path = "../response.rs"]
pub mod response;

/// Registration error taxonomy.
#[path = "../error.rs"]
pub mod error;

/// Collaborator contracts.
#[path = "../collaborators.rs"]
pub mod collaborators;

#[path = "../state.rs"]
pub mod state;

/// Async driver and background handles.
#[path = "../orchestrator.rs"]
pub mod orchestrator;

/// In-memory collaborators.
#[path = "../loopback.rs"]
pub mod loopback;

pub use collaborators::{AccessControl, ModelGroupManager, ModelGroupRequest, ModelMetaStore};
pub use error::{RegistrationError, Step, PERMISSION_DENIED_MESSAGE};
pub use orchestrator::{
    RegistrationHandle, RegistrationOrchestrator, RegistrationOrchestratorBuilder,
    RegistrationResult,
};
pub use response::{RegisterModelMetaResponse, TaskResponse, TaskState, TaskType};
pub use task::{AccessMode, ModelFormat, ModelMetaInput, RegistrationTask, User};

/// Prelude exports for consumers wiring a registration workflow.
pub mod prelude {
    pub use crate::collaborators::{AccessControl, ModelGroupManager, ModelMetaStore};
    pub use crate::loopback::{
        InMemoryAccessControl, InMemoryModelGroupManager, InMemoryModelMetaStore,
        ModelGroupDirectory,
    };
    pub use crate::orchestrator::{RegistrationHandle, RegistrationOrchestrator};
    pub use crate::task::{AccessMode, ModelMetaInput, RegistrationTask, User};
}
