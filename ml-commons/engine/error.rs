use thiserror::Error;

use crate::function_name::FunctionName;

/// Failures raised by the registry, the dispatch engine and the built-in providers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required argument was absent or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The function is not registered, or its instance lacks the requested capability.
    #[error("unsupported algorithm {function_name}: {reason}")]
    UnsupportedAlgorithm {
        /// Requested function.
        function_name: FunctionName,
        /// Why dispatch was refused.
        reason: String,
    },
    /// The provider's factory failed.
    #[error("failed to construct {function_name}: {cause}")]
    Construction {
        /// Function whose factory failed.
        function_name: FunctionName,
        /// Description of the underlying failure.
        cause: String,
    },
    /// A provider could not be constructed while collecting engine metadata.
    #[error("failed to collect engine metadata from {function_name}: {cause}")]
    MetadataCollection {
        /// First function whose construction failed.
        function_name: FunctionName,
        /// Description of the underlying failure.
        cause: String,
    },
    /// Parameters failed validation.
    #[error("invalid parameters for {function_name}: {reason}")]
    InvalidParameters {
        /// Function the parameters were meant for.
        function_name: FunctionName,
        /// Validation failure.
        reason: String,
    },
    /// The algorithm itself failed while training, predicting or executing.
    #[error("{function_name} failed: {message}")]
    Algorithm {
        /// Failing function.
        function_name: FunctionName,
        /// Failure detail.
        message: String,
    },
    /// The provider table was empty at start-up.
    #[error("no algorithm providers found")]
    NoProviders,
}

impl EngineError {
    pub(crate) fn unsupported(function_name: FunctionName, reason: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            function_name,
            reason: reason.into(),
        }
    }

    pub(crate) fn algorithm(function_name: FunctionName, message: impl Into<String>) -> Self {
        Self::Algorithm {
            function_name,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_parameters(function_name: FunctionName, reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            function_name,
            reason: reason.into(),
        }
    }
}
