#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Algorithm registry and dispatch engine.
//!
//! Providers are listed in a compile-time table and registered into an
//! [`AlgorithmRegistry`]; [`MlEngine`] resolves a [`FunctionName`] to a fresh instance and
//! invokes the requested capability.

/// Closed set of dispatchable functions.
#[path = "../function_name.rs"]
pub mod function_name;

/// Engine error taxonomy.
#[path = "../error.rs"]
pub mod error;

/// Per-algorithm parameter types.
#[path = "../params.rs"]
pub mod params;

/// Data frames, models, inputs and outputs.
#[path = "../frame.rs"]
pub mod frame;

/// Capability traits implemented by algorithms.
#[path = "../capability.rs"]
pub mod capability;

/// Function name to factory lookup.
#[path = "../registry.rs"]
pub mod registry;

/// Built-in providers.
#[path = "../algorithms/main.rs"]
pub mod algorithms;

/// Train/predict/execute dispatch.
#[path = "../dispatch.rs"]
pub mod dispatch;

/// Metadata aggregation over the registry.
#[path = "../metadata.rs"]
pub mod metadata;

pub use capability::{
    Algorithm, AlgorithmMetadata, Executable, Predictable, SelfDescribing, Trainable,
};
pub use dispatch::MlEngine;
pub use error::EngineError;
pub use frame::{DataFrame, Input, InputData, Model, Output};
pub use function_name::FunctionName;
pub use metadata::{EngineMetadata, MetadataIntrospector};
pub use params::AlgorithmParams;
pub use registry::{AlgorithmFactory, AlgorithmRegistry, ProviderEntry};

/// Prelude exports for engine consumers.
pub mod prelude {
    pub use crate::algorithms::BUILTIN_PROVIDERS;
    pub use crate::dispatch::MlEngine;
    pub use crate::error::EngineError;
    pub use crate::frame::{DataFrame, Input, InputData, Model, Output};
    pub use crate::function_name::FunctionName;
    pub use crate::params::{
        AlgorithmParams, DistanceType, KMeansParams, LinearRegressionParams,
        SampleCalculatorParams, SampleOperation,
    };
    pub use crate::registry::AlgorithmRegistry;
}
