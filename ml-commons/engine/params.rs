use serde::{Deserialize, Serialize};

use crate::{error::EngineError, function_name::FunctionName};

/// Algorithm-specific parameter bag, one variant per [`FunctionName`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function_name", content = "parameters")]
pub enum AlgorithmParams {
    /// Parameters for [`FunctionName::LinearRegression`].
    #[serde(rename = "LINEAR_REGRESSION")]
    LinearRegression(LinearRegressionParams),
    /// Parameters for [`FunctionName::KMeans`].
    #[serde(rename = "KMEANS")]
    KMeans(KMeansParams),
    /// Parameters for [`FunctionName::LocalSampleCalculator`].
    #[serde(rename = "LOCAL_SAMPLE_CALCULATOR")]
    LocalSampleCalculator(SampleCalculatorParams),
}

impl AlgorithmParams {
    /// Function these parameters belong to.
    #[must_use]
    pub const fn function_name(&self) -> FunctionName {
        match self {
            Self::LinearRegression(_) => FunctionName::LinearRegression,
            Self::KMeans(_) => FunctionName::KMeans,
            Self::LocalSampleCalculator(_) => FunctionName::LocalSampleCalculator,
        }
    }

    /// Validates the variant's own constraints.
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            Self::LinearRegression(params) => params.validate(),
            Self::KMeans(params) => params.validate(),
            Self::LocalSampleCalculator(_) => Ok(()),
        }
    }
}

/// Rejects parameters addressed to a different function.
pub(crate) fn mismatch(expected: FunctionName, supplied: &AlgorithmParams) -> EngineError {
    EngineError::invalid_parameters(
        expected,
        format!("received parameters for {}", supplied.function_name()),
    )
}

/// Gradient-descent settings for linear regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearRegressionParams {
    /// Column holding the regression target; every other column is a feature.
    pub target: String,
    /// Step size.
    pub learning_rate: f64,
    /// Full passes over the data.
    pub epochs: usize,
}

impl Default for LinearRegressionParams {
    fn default() -> Self {
        Self {
            target: "label".into(),
            learning_rate: 0.01,
            epochs: 100,
        }
    }
}

impl LinearRegressionParams {
    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        let name = FunctionName::LinearRegression;
        if self.target.trim().is_empty() {
            return Err(EngineError::invalid_parameters(name, "target column is empty"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(EngineError::invalid_parameters(
                name,
                format!("learning_rate must be positive, got {}", self.learning_rate),
            ));
        }
        if self.epochs == 0 {
            return Err(EngineError::invalid_parameters(name, "epochs must be positive"));
        }
        Ok(())
    }
}

/// Distance used to assign rows to centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceType {
    /// Straight-line distance.
    Euclidean,
    /// One minus cosine similarity.
    Cosine,
    /// Manhattan distance.
    L1,
}

/// Clustering settings for k-means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansParams {
    /// Number of clusters.
    pub centroids: usize,
    /// Maximum Lloyd iterations.
    pub iterations: usize,
    /// Distance function.
    pub distance_type: DistanceType,
    /// Seed for centroid initialisation.
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            centroids: 2,
            iterations: 10,
            distance_type: DistanceType::Euclidean,
            seed: 42,
        }
    }
}

impl KMeansParams {
    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if self.centroids == 0 {
            return Err(EngineError::invalid_parameters(
                FunctionName::KMeans,
                "centroids must be positive",
            ));
        }
        if self.iterations == 0 {
            return Err(EngineError::invalid_parameters(
                FunctionName::KMeans,
                "iterations must be positive",
            ));
        }
        Ok(())
    }
}

/// Aggregate computed by the sample calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SampleOperation {
    /// Sum of all values.
    #[default]
    Sum,
    /// Largest value.
    Max,
    /// Smallest value.
    Min,
    /// Arithmetic mean.
    Mean,
}

/// Settings for the local sample calculator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleCalculatorParams {
    /// Aggregate to compute.
    pub operation: SampleOperation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_json_round_trips_through_the_wire_name() {
        let json = r#"{"function_name":"KMEANS","parameters":{"centroids":3}}"#;
        let params: AlgorithmParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.function_name(), FunctionName::KMeans);
        match params {
            AlgorithmParams::KMeans(kmeans) => {
                assert_eq!(kmeans.centroids, 3);
                assert_eq!(kmeans.iterations, 10);
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn each_variant_validates_independently() {
        let bad_lr = AlgorithmParams::LinearRegression(LinearRegressionParams {
            learning_rate: -1.0,
            ..LinearRegressionParams::default()
        });
        assert!(matches!(
            bad_lr.validate(),
            Err(EngineError::InvalidParameters {
                function_name: FunctionName::LinearRegression,
                ..
            })
        ));
        let bad_kmeans = AlgorithmParams::KMeans(KMeansParams {
            centroids: 0,
            ..KMeansParams::default()
        });
        assert!(bad_kmeans.validate().is_err());
        let calc = AlgorithmParams::LocalSampleCalculator(SampleCalculatorParams::default());
        assert!(calc.validate().is_ok());
    }
}
