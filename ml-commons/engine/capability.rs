use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    frame::{DataFrame, Input, Model, Output},
    function_name::FunctionName,
};

/// Fits a model to a frame.
pub trait Trainable {
    /// Trains on `frame` and hands the resulting model to the caller.
    fn train(&self, frame: &DataFrame) -> Result<Model, EngineError>;
}

/// Scores a frame against a trained model.
pub trait Predictable {
    /// Produces one prediction per row of `frame`.
    fn predict(&self, frame: &DataFrame, model: &Model) -> Result<Output, EngineError>;
}

/// Runs a self-contained computation over an [`Input`].
pub trait Executable {
    /// Executes `input`.
    fn execute(&self, input: &Input) -> Result<Output, EngineError>;
}

/// Reports descriptive metadata about the algorithm.
pub trait SelfDescribing {
    /// Descriptive record for this algorithm.
    fn metadata(&self) -> AlgorithmMetadata;
}

/// A constructed algorithm instance.
///
/// Capabilities are opted into by overriding the matching accessor; the defaults
/// report the capability as absent.
pub trait Algorithm: Send {
    /// Function implemented by this instance.
    fn function_name(&self) -> FunctionName;

    /// Training capability.
    fn as_trainable(&self) -> Option<&dyn Trainable> {
        None
    }

    /// Prediction capability.
    fn as_predictable(&self) -> Option<&dyn Predictable> {
        None
    }

    /// Execution capability.
    fn as_executable(&self) -> Option<&dyn Executable> {
        None
    }

    /// Metadata capability.
    fn as_self_describing(&self) -> Option<&dyn SelfDescribing> {
        None
    }
}

/// Metadata record reported by a [`SelfDescribing`] algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmMetadata {
    /// Function name.
    pub name: FunctionName,
    /// Short human-readable description.
    pub description: String,
    /// Provider version.
    pub version: String,
    /// Supports `train`.
    pub trainable: bool,
    /// Supports `predict`.
    pub predictable: bool,
    /// Supports `execute`.
    pub executable: bool,
}

impl AlgorithmMetadata {
    /// Builds a record whose capability flags mirror `algorithm`'s accessors.
    #[must_use]
    pub fn of(
        algorithm: &dyn Algorithm,
        description: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: algorithm.function_name(),
            description: description.into(),
            version: version.into(),
            trainable: algorithm.as_trainable().is_some(),
            predictable: algorithm.as_predictable().is_some(),
            executable: algorithm.as_executable().is_some(),
        }
    }
}
