use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Closed set of functions the engine can dispatch to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FunctionName {
    /// Ordinary least squares fitted by gradient descent.
    #[serde(rename = "LINEAR_REGRESSION")]
    LinearRegression,
    /// Lloyd's k-means clustering.
    #[serde(rename = "KMEANS")]
    KMeans,
    /// Aggregate statistics over a list of sample values.
    #[serde(rename = "LOCAL_SAMPLE_CALCULATOR")]
    LocalSampleCalculator,
}

impl FunctionName {
    /// Every declared function, in declaration order.
    pub const ALL: [Self; 3] = [
        Self::LinearRegression,
        Self::KMeans,
        Self::LocalSampleCalculator,
    ];

    /// Wire name, e.g. `LINEAR_REGRESSION`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LinearRegression => "LINEAR_REGRESSION",
            Self::KMeans => "KMEANS",
            Self::LocalSampleCalculator => "LOCAL_SAMPLE_CALCULATOR",
        }
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionName {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == wanted)
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown function name `{value}`")))
    }
}
