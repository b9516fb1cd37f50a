use serde::{Deserialize, Serialize};

use crate::{
    capability::{Algorithm, AlgorithmMetadata, Predictable, SelfDescribing, Trainable},
    error::EngineError,
    frame::{DataFrame, Model, Output},
    function_name::FunctionName,
    params::{mismatch, AlgorithmParams, LinearRegressionParams},
};

const NAME: FunctionName = FunctionName::LinearRegression;

/// Linear regression with bias, fitted by batch gradient descent.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    params: LinearRegressionParams,
}

/// Builds an instance, validating supplied parameters.
pub fn construct(params: Option<&AlgorithmParams>) -> anyhow::Result<Box<dyn Algorithm>> {
    let params = match params {
        None => LinearRegressionParams::default(),
        Some(AlgorithmParams::LinearRegression(params)) => params.clone(),
        Some(other) => return Err(mismatch(NAME, other).into()),
    };
    params.validate()?;
    Ok(Box::new(LinearRegression { params }))
}

#[derive(Debug, Serialize, Deserialize)]
struct FittedWeights {
    features: Vec<String>,
    weights: Vec<f64>,
    bias: f64,
}

impl FittedWeights {
    fn predict_row(&self, row: &[f64]) -> f64 {
        row.iter()
            .zip(&self.weights)
            .map(|(feature, weight)| feature * weight)
            .sum::<f64>()
            + self.bias
    }
}

impl LinearRegression {
    fn fit(&self, features: &[Vec<f64>], labels: &[f64], names: Vec<String>) -> FittedWeights {
        let mut fitted = FittedWeights {
            weights: vec![0.0; names.len()],
            features: names,
            bias: 0.0,
        };
        let n = features.len() as f64;
        for _ in 0..self.params.epochs {
            let errors = features
                .iter()
                .zip(labels)
                .map(|(row, label)| fitted.predict_row(row) - label)
                .collect::<Vec<f64>>();
            for (idx, weight) in fitted.weights.iter_mut().enumerate() {
                let grad = errors
                    .iter()
                    .zip(features)
                    .map(|(err, row)| err * row[idx])
                    .sum::<f64>()
                    / n;
                *weight -= self.params.learning_rate * grad;
            }
            fitted.bias -= self.params.learning_rate * errors.iter().sum::<f64>() / n;
        }
        fitted
    }
}

impl Trainable for LinearRegression {
    fn train(&self, frame: &DataFrame) -> Result<Model, EngineError> {
        let target = &self.params.target;
        let labels = frame.column(target).ok_or_else(|| {
            EngineError::InvalidArgument(format!("target column `{target}` not found"))
        })?;
        if frame.is_empty() {
            return Err(EngineError::algorithm(NAME, "cannot train on an empty frame"));
        }
        let names = frame
            .columns()
            .iter()
            .filter(|column| *column != target)
            .cloned()
            .collect::<Vec<_>>();
        let features = frame.select(&names)?;
        let fitted = self.fit(&features, &labels, names);
        if !fitted.bias.is_finite() || fitted.weights.iter().any(|weight| !weight.is_finite()) {
            return Err(EngineError::algorithm(
                NAME,
                "gradient descent diverged; lower the learning rate",
            ));
        }
        Model::encode(NAME, &fitted)
    }
}

impl Predictable for LinearRegression {
    fn predict(&self, frame: &DataFrame, model: &Model) -> Result<Output, EngineError> {
        let fitted: FittedWeights = model.decode(NAME)?;
        let rows = frame.select(&fitted.features)?;
        let predictions = rows.iter().map(|row| fitted.predict_row(row)).collect();
        Ok(Output::Predictions {
            function_name: NAME,
            frame: DataFrame::single_column("prediction", predictions),
        })
    }
}

impl SelfDescribing for LinearRegression {
    fn metadata(&self) -> AlgorithmMetadata {
        AlgorithmMetadata::of(
            self,
            "Linear regression fitted with batch gradient descent",
            "1.0.0",
        )
    }
}

impl Algorithm for LinearRegression {
    fn function_name(&self) -> FunctionName {
        NAME
    }

    fn as_trainable(&self) -> Option<&dyn Trainable> {
        Some(self)
    }

    fn as_predictable(&self) -> Option<&dyn Predictable> {
        Some(self)
    }

    fn as_self_describing(&self) -> Option<&dyn SelfDescribing> {
        Some(self)
    }
}
