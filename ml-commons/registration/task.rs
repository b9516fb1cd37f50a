use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of the caller, passed explicitly into every registration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// Login name.
    pub name: String,
    /// Backend roles used for restricted model groups.
    #[serde(default)]
    pub backend_roles: Vec<String>,
    /// Security roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    /// User with a name and no roles.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds backend roles.
    #[must_use]
    pub fn with_backend_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Whether the user shares at least one backend role with `roles`.
    #[must_use]
    pub fn shares_backend_role(&self, roles: &[String]) -> bool {
        self.backend_roles.iter().any(|role| roles.contains(role))
    }
}

/// Visibility of a model group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    /// Every user may use the group.
    Public,
    /// Only the owner may use the group.
    Private,
    /// Users sharing a backend role with the group may use it.
    Restricted,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
            Self::Restricted => "RESTRICTED",
        })
    }
}

/// Serialization format of uploaded model content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelFormat {
    /// TorchScript archive.
    TorchScript,
    /// ONNX graph.
    Onnx,
}

/// Descriptor of a model whose metadata is being registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetaInput {
    /// Model name.
    pub name: String,
    /// Target group; absent means a group is created from this descriptor.
    #[serde(default)]
    pub model_group_id: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Model version label.
    #[serde(default)]
    pub version: Option<String>,
    /// Content format.
    pub model_format: ModelFormat,
    /// Size of the model content in bytes.
    #[serde(default)]
    pub model_content_size_in_bytes: Option<u64>,
    /// Hash of the model content.
    #[serde(default)]
    pub model_content_hash_value: Option<String>,
    /// Number of chunks the content will be uploaded in.
    pub total_chunks: u32,
    /// Backend roles for a group created on the fly.
    #[serde(default)]
    pub backend_roles: Vec<String>,
    /// Access mode for a group created on the fly.
    #[serde(default)]
    pub access_mode: Option<AccessMode>,
    /// Grant the group every backend role of the requesting user.
    #[serde(default)]
    pub add_all_backend_roles: Option<bool>,
}

impl ModelMetaInput {
    /// Starts a builder for a model called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModelMetaInputBuilder {
        ModelMetaInputBuilder::new(name)
    }

    /// Group id, treating an empty string as absent.
    #[must_use]
    pub fn group_id(&self) -> Option<&str> {
        self.model_group_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Builder for [`ModelMetaInput`].
#[derive(Debug, Clone)]
pub struct ModelMetaInputBuilder {
    input: ModelMetaInput,
}

impl ModelMetaInputBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            input: ModelMetaInput {
                name: name.into(),
                model_group_id: None,
                description: None,
                version: None,
                model_format: ModelFormat::TorchScript,
                model_content_size_in_bytes: None,
                model_content_hash_value: None,
                total_chunks: 1,
                backend_roles: Vec::new(),
                access_mode: None,
                add_all_backend_roles: None,
            },
        }
    }

    /// Registers into an existing group; an empty id is treated as absent.
    #[must_use]
    pub fn model_group_id(mut self, id: impl Into<String>) -> Self {
        self.input.model_group_id = Some(id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.input.description = Some(description.into());
        self
    }

    /// Sets the version label.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.input.version = Some(version.into());
        self
    }

    /// Sets the content format.
    #[must_use]
    pub fn model_format(mut self, format: ModelFormat) -> Self {
        self.input.model_format = format;
        self
    }

    /// Records the content size and hash.
    #[must_use]
    pub fn content(mut self, size_in_bytes: u64, hash: impl Into<String>) -> Self {
        self.input.model_content_size_in_bytes = Some(size_in_bytes);
        self.input.model_content_hash_value = Some(hash.into());
        self
    }

    /// Sets the chunk count.
    #[must_use]
    pub fn total_chunks(mut self, chunks: u32) -> Self {
        self.input.total_chunks = chunks;
        self
    }

    /// Backend roles for an auto-created group.
    #[must_use]
    pub fn backend_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input.backend_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Access mode for an auto-created group.
    #[must_use]
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.input.access_mode = Some(mode);
        self
    }

    /// Grants an auto-created group all of the requester's backend roles.
    #[must_use]
    pub fn add_all_backend_roles(mut self, add_all: bool) -> Self {
        self.input.add_all_backend_roles = Some(add_all);
        self
    }

    /// Finishes the descriptor.
    #[must_use]
    pub fn build(self) -> ModelMetaInput {
        self.input
    }
}

/// One registration request: who is asking and what to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationTask {
    /// Requesting identity; absent when security is disabled upstream.
    pub requester: Option<User>,
    /// Model descriptor.
    pub input: ModelMetaInput,
}

impl RegistrationTask {
    /// Builds a task, normalizing an empty group id to absent.
    #[must_use]
    pub fn new(requester: Option<User>, mut input: ModelMetaInput) -> Self {
        if input.group_id().is_none() {
            input.model_group_id = None;
        }
        Self { requester, input }
    }
}
