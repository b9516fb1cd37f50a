//! Built-in algorithm providers and the start-up provider table.

/// k-means clustering.
pub mod kmeans;
/// Linear regression.
pub mod linear_regression;
/// Sum/min/max/mean over sample values.
pub mod sample_calculator;

use crate::{function_name::FunctionName, registry::ProviderEntry};

pub use kmeans::KMeans;
pub use linear_regression::LinearRegression;
pub use sample_calculator::LocalSampleCalculator;

/// Every provider compiled into the engine, in registration order.
pub const BUILTIN_PROVIDERS: &[ProviderEntry] = &[
    ProviderEntry {
        function_name: FunctionName::LinearRegression,
        construct: linear_regression::construct,
    },
    ProviderEntry {
        function_name: FunctionName::KMeans,
        construct: kmeans::construct,
    },
    ProviderEntry {
        function_name: FunctionName::LocalSampleCalculator,
        construct: sample_calculator::construct,
    },
];
