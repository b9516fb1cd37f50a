use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::task::{AccessMode, ModelMetaInput, User};

/// Decides whether a user may act on a model group.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Resolves to `true` when `user` may register models into `model_group_id`.
    ///
    /// An absent group id asks whether the user may register at all.
    async fn check_access(&self, user: Option<&User>, model_group_id: Option<&str>)
        -> Result<bool>;
}

/// Creates model groups.
#[async_trait]
pub trait ModelGroupManager: Send + Sync {
    /// Creates a group and resolves to its id.
    async fn create_group(&self, request: ModelGroupRequest) -> Result<String>;
}

/// Persists model metadata.
#[async_trait]
pub trait ModelMetaStore: Send + Sync {
    /// Stores `input` and resolves to the new model id.
    async fn register_meta(&self, input: ModelMetaInput) -> Result<String>;
}

/// Group creation request derived from a model descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGroupRequest {
    /// Group name, taken from the model name.
    pub name: String,
    /// Group description.
    pub description: Option<String>,
    /// Backend roles allowed on a restricted group.
    pub backend_roles: Vec<String>,
    /// Requested visibility.
    pub access_mode: Option<AccessMode>,
    /// Grant every backend role of the owner.
    pub add_all_backend_roles: Option<bool>,
    /// User the group is created for.
    pub owner: Option<User>,
}

impl ModelGroupRequest {
    /// Request for a group named after `input`, owned by `owner`.
    #[must_use]
    pub fn from_descriptor(input: &ModelMetaInput, owner: Option<&User>) -> Self {
        Self {
            name: input.name.clone(),
            description: input.description.clone(),
            backend_roles: input.backend_roles.clone(),
            access_mode: input.access_mode,
            add_all_backend_roles: input.add_all_backend_roles,
            owner: owner.cloned(),
        }
    }
}
