//! Registration phases.
//!
//! Each in-flight phase owns the task and exposes what its collaborator call needs. Feeding
//! the collaborator's outcome to `complete` consumes the phase and yields the next one, so a
//! finished run cannot be advanced again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    collaborators::ModelGroupRequest,
    error::{RegistrationError, Step},
    response::RegisterModelMetaResponse,
    task::{ModelMetaInput, RegistrationTask, User},
};

/// Label of a [`Registration`] phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Waiting on the access check.
    AccessCheck,
    /// Waiting on group creation.
    GroupCreate,
    /// Waiting on the metadata store.
    MetadataRegister,
    /// Finished with a model id.
    Done,
    /// Finished with an error.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AccessCheck => "ACCESS_CHECK",
            Self::GroupCreate => "GROUP_CREATE",
            Self::MetadataRegister => "METADATA_REGISTER",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        })
    }
}

/// A registration run, positioned at one phase.
#[derive(Debug)]
pub enum Registration {
    /// Access must be checked.
    AccessCheck(AccessCheck),
    /// A group must be created.
    GroupCreate(GroupCreate),
    /// Metadata must be stored.
    MetadataRegister(MetadataRegister),
    /// Registered.
    Done(RegisterModelMetaResponse),
    /// Stopped with an error.
    Failed(RegistrationError),
}

impl Registration {
    /// Starts a run at the access check.
    #[must_use]
    pub const fn start(task: RegistrationTask) -> Self {
        Self::AccessCheck(AccessCheck { task })
    }

    /// Current phase label.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::AccessCheck(_) => Phase::AccessCheck,
            Self::GroupCreate(_) => Phase::GroupCreate,
            Self::MetadataRegister(_) => Phase::MetadataRegister,
            Self::Done(_) => Phase::Done,
            Self::Failed(_) => Phase::Failed,
        }
    }

    /// Whether the run has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Phase waiting on [`crate::AccessControl::check_access`].
#[derive(Debug)]
pub struct AccessCheck {
    task: RegistrationTask,
}

impl AccessCheck {
    /// Requesting identity.
    #[must_use]
    pub const fn requester(&self) -> Option<&User> {
        self.task.requester.as_ref()
    }

    /// Group the requester wants to register into, if any.
    #[must_use]
    pub fn model_group_id(&self) -> Option<&str> {
        self.task.input.group_id()
    }

    /// Applies the access decision.
    #[must_use]
    pub fn complete(self, outcome: anyhow::Result<bool>) -> Registration {
        match outcome {
            Err(source) => Registration::Failed(RegistrationError::dependency(
                Step::AccessCheck,
                source,
            )),
            Ok(false) => Registration::Failed(RegistrationError::PermissionDenied),
            Ok(true) if self.model_group_id().is_some() => {
                Registration::MetadataRegister(MetadataRegister {
                    task: self.task,
                    created_group: None,
                })
            }
            Ok(true) => Registration::GroupCreate(GroupCreate { task: self.task }),
        }
    }
}

/// Phase waiting on [`crate::ModelGroupManager::create_group`].
#[derive(Debug)]
pub struct GroupCreate {
    task: RegistrationTask,
}

impl GroupCreate {
    /// Group request derived from the model descriptor.
    #[must_use]
    pub fn request(&self) -> ModelGroupRequest {
        ModelGroupRequest::from_descriptor(&self.task.input, self.task.requester.as_ref())
    }

    /// Writes the new group id into the descriptor, or fails the run.
    #[must_use]
    pub fn complete(mut self, outcome: anyhow::Result<String>) -> Registration {
        match outcome {
            Ok(group_id) => {
                self.task.input.model_group_id = Some(group_id.clone());
                Registration::MetadataRegister(MetadataRegister {
                    task: self.task,
                    created_group: Some(group_id),
                })
            }
            Err(source) => Registration::Failed(RegistrationError::dependency(
                Step::GroupCreate,
                source,
            )),
        }
    }
}

/// Phase waiting on [`crate::ModelMetaStore::register_meta`].
#[derive(Debug)]
pub struct MetadataRegister {
    task: RegistrationTask,
    created_group: Option<String>,
}

impl MetadataRegister {
    /// Descriptor to store, carrying the resolved group id.
    #[must_use]
    pub const fn descriptor(&self) -> &ModelMetaInput {
        &self.task.input
    }

    /// Group created earlier in this run, if any.
    #[must_use]
    pub fn created_group(&self) -> Option<&str> {
        self.created_group.as_deref()
    }

    /// Finishes the run with the store's outcome.
    #[must_use]
    pub fn complete(self, outcome: anyhow::Result<String>) -> Registration {
        match outcome {
            Ok(model_id) => Registration::Done(RegisterModelMetaResponse::created(model_id)),
            Err(source) => Registration::Failed(RegistrationError::dependency(
                Step::MetadataRegister,
                source,
            )),
        }
    }
}
