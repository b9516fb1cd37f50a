//! In-process collaborators backed by shared maps, used by `mlctl` and in tests.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    collaborators::{AccessControl, ModelGroupManager, ModelGroupRequest, ModelMetaStore},
    response::TaskState,
    task::{AccessMode, ModelMetaInput, User},
};

/// Security role that bypasses group access checks.
pub const ALL_ACCESS_ROLE: &str = "all_access";

/// A stored model group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGroup {
    /// Group id.
    pub id: String,
    /// Unique group name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Creator.
    pub owner: Option<User>,
    /// Visibility.
    pub access_mode: AccessMode,
    /// Backend roles allowed on a restricted group.
    pub backend_roles: Vec<String>,
    /// Creation time.
    pub created_time: DateTime<Utc>,
}

/// Shared table of model groups.
#[derive(Debug, Clone, Default)]
pub struct ModelGroupDirectory {
    groups: Arc<RwLock<IndexMap<String, ModelGroup>>>,
}

impl ModelGroupDirectory {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a group.
    pub fn insert(&self, group: ModelGroup) {
        self.groups.write().insert(group.id.clone(), group);
    }

    /// Adds `group` unless another group already uses its name.
    ///
    /// The name check and the insert happen under one write lock.
    pub fn insert_unique(&self, group: ModelGroup) -> Result<()> {
        let mut groups = self.groups.write();
        if let Some(existing) = groups.values().find(|other| other.name == group.name) {
            bail!(
                "The name you provided is already being used by a model group with ID: {}.",
                existing.id
            );
        }
        groups.insert(group.id.clone(), group);
        Ok(())
    }

    /// Group by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ModelGroup> {
        self.groups.read().get(id).cloned()
    }

    /// Id of the group called `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<String> {
        self.groups
            .read()
            .values()
            .find(|group| group.name == name)
            .map(|group| group.id.clone())
    }

    /// Every group, in creation order.
    #[must_use]
    pub fn groups(&self) -> Vec<ModelGroup> {
        self.groups.read().values().cloned().collect()
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

/// Access control over a [`ModelGroupDirectory`].
#[derive(Debug, Clone)]
pub struct InMemoryAccessControl {
    enabled: bool,
    admins: Vec<String>,
    directory: ModelGroupDirectory,
}

impl InMemoryAccessControl {
    /// Enforcing access control over `directory`.
    #[must_use]
    pub const fn new(directory: ModelGroupDirectory) -> Self {
        Self {
            enabled: true,
            admins: Vec::new(),
            directory,
        }
    }

    /// Access control that grants every request.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(ModelGroupDirectory::new())
        }
    }

    /// Toggles enforcement.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Users treated as administrators.
    #[must_use]
    pub fn admins<I, S>(mut self, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admins = admins.into_iter().map(Into::into).collect();
        self
    }

    fn is_admin(&self, user: &User) -> bool {
        self.admins.contains(&user.name) || user.roles.iter().any(|role| role == ALL_ACCESS_ROLE)
    }
}

#[async_trait]
impl AccessControl for InMemoryAccessControl {
    async fn check_access(
        &self,
        user: Option<&User>,
        model_group_id: Option<&str>,
    ) -> Result<bool> {
        let (Some(user), Some(group_id)) = (user, model_group_id) else {
            return Ok(true);
        };
        if !self.enabled || self.is_admin(user) {
            return Ok(true);
        }
        let group = self
            .directory
            .get(group_id)
            .ok_or_else(|| anyhow!("Failed to find model group with ID: {group_id}"))?;
        let allowed = match group.access_mode {
            AccessMode::Public => true,
            AccessMode::Private => group.owner.is_some_and(|owner| owner.name == user.name),
            AccessMode::Restricted => user.shares_backend_role(&group.backend_roles),
        };
        tracing::debug!(user = %user.name, group_id, allowed, "model group access checked");
        Ok(allowed)
    }
}

/// Group manager writing into a [`ModelGroupDirectory`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryModelGroupManager {
    directory: ModelGroupDirectory,
}

impl InMemoryModelGroupManager {
    /// Manager writing into `directory`.
    #[must_use]
    pub const fn new(directory: ModelGroupDirectory) -> Self {
        Self { directory }
    }

    fn resolve(request: &ModelGroupRequest) -> Result<(AccessMode, Vec<String>)> {
        let add_all = request.add_all_backend_roles.unwrap_or(false);
        let mode = request.access_mode.unwrap_or_else(|| {
            if add_all || !request.backend_roles.is_empty() {
                AccessMode::Restricted
            } else {
                AccessMode::Private
            }
        });
        if mode != AccessMode::Restricted {
            if add_all || !request.backend_roles.is_empty() {
                bail!("You can specify backend roles only for a model group with the restricted access mode.");
            }
            return Ok((mode, Vec::new()));
        }
        if add_all && !request.backend_roles.is_empty() {
            bail!("You cannot specify backend roles and add all backend roles to true at same time.");
        }
        if !add_all {
            if request.backend_roles.is_empty() {
                bail!("You must specify one or more backend roles or add all backend roles to register a restricted model group.");
            }
            return Ok((mode, request.backend_roles.clone()));
        }
        match &request.owner {
            Some(owner) if !owner.backend_roles.is_empty() => Ok((mode, owner.backend_roles.clone())),
            _ => bail!("You don't have any backend roles."),
        }
    }
}

#[async_trait]
impl ModelGroupManager for InMemoryModelGroupManager {
    async fn create_group(&self, request: ModelGroupRequest) -> Result<String> {
        let (access_mode, backend_roles) = Self::resolve(&request)?;
        let group = ModelGroup {
            id: Uuid::new_v4().to_string(),
            name: request.name,
            description: request.description,
            owner: request.owner,
            access_mode,
            backend_roles,
            created_time: Utc::now(),
        };
        let id = group.id.clone();
        self.directory.insert_unique(group)?;
        tracing::debug!(group_id = %id, %access_mode, "model group created");
        Ok(id)
    }
}

/// A stored model metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredModel {
    /// Model id.
    pub model_id: String,
    /// Descriptor as registered.
    pub input: ModelMetaInput,
    /// Lifecycle state.
    pub state: TaskState,
    /// Registration time.
    pub created_time: DateTime<Utc>,
}

/// Metadata store keeping documents in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryModelMetaStore {
    directory: ModelGroupDirectory,
    models: Arc<RwLock<IndexMap<String, StoredModel>>>,
}

impl InMemoryModelMetaStore {
    /// Store validating group ids against `directory`.
    #[must_use]
    pub fn new(directory: ModelGroupDirectory) -> Self {
        Self {
            directory,
            models: Arc::default(),
        }
    }

    /// Stored model by id.
    #[must_use]
    pub fn get(&self, model_id: &str) -> Option<StoredModel> {
        self.models.read().get(model_id).cloned()
    }

    /// Every stored model, in registration order.
    #[must_use]
    pub fn models(&self) -> Vec<StoredModel> {
        self.models.read().values().cloned().collect()
    }

    /// Number of stored models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}

#[async_trait]
impl ModelMetaStore for InMemoryModelMetaStore {
    async fn register_meta(&self, input: ModelMetaInput) -> Result<String> {
        let group_id = input
            .group_id()
            .ok_or_else(|| anyhow!("model group id is required to register model metadata"))?;
        if self.directory.get(group_id).is_none() {
            bail!("Failed to find model group with ID: {group_id}");
        }
        let model_id = Uuid::new_v4().to_string();
        let stored = StoredModel {
            model_id: model_id.clone(),
            input,
            state: TaskState::Created,
            created_time: Utc::now(),
        };
        self.models.write().insert(model_id.clone(), stored);
        Ok(model_id)
    }
}
