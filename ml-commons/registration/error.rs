use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned when the access check denies the requester.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "You don't have permissions to perform this operation on this model.";

/// Collaborator call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Model-group access validation.
    AccessCheck,
    /// Model-group creation.
    GroupCreate,
    /// Model metadata registration.
    MetadataRegister,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AccessCheck => "model group access check",
            Self::GroupCreate => "model group creation",
            Self::MetadataRegister => "model metadata registration",
        })
    }
}

/// Terminal failure of a registration run.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The access check returned `false`.
    #[error("{}", PERMISSION_DENIED_MESSAGE)]
    PermissionDenied,
    /// A collaborator failed; its error is carried unchanged.
    #[error("{step} failed: {source}")]
    DependencyFailure {
        /// Failing step.
        step: Step,
        /// Collaborator error.
        #[source]
        source: anyhow::Error,
    },
    /// The background run ended without delivering a result.
    #[error("registration task ended without a result")]
    Dispatch,
}

impl RegistrationError {
    pub(crate) fn dependency(step: Step, source: anyhow::Error) -> Self {
        Self::DependencyFailure { step, source }
    }

    /// Step that failed, when a collaborator was at fault.
    #[must_use]
    pub const fn step(&self) -> Option<Step> {
        match self {
            Self::DependencyFailure { step, .. } => Some(*step),
            Self::PermissionDenied | Self::Dispatch => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn dependency_failure_keeps_the_collaborator_error() {
        let err = RegistrationError::dependency(Step::GroupCreate, anyhow!("index closed"));
        assert_eq!(err.step(), Some(Step::GroupCreate));
        assert_eq!(err.to_string(), "model group creation failed: index closed");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "index closed");
    }

    #[test]
    fn denial_uses_the_fixed_message() {
        assert_eq!(
            RegistrationError::PermissionDenied.to_string(),
            PERMISSION_DENIED_MESSAGE
        );
        assert_eq!(RegistrationError::PermissionDenied.step(), None);
    }
}
