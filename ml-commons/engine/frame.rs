use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::EngineError,
    function_name::FunctionName,
    params::{AlgorithmParams, SampleOperation},
};

/// Immutable table of named numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataFrame")]
pub struct DataFrame {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawDataFrame {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawDataFrame> for DataFrame {
    type Error = EngineError;

    fn try_from(raw: RawDataFrame) -> Result<Self, Self::Error> {
        Self::new(raw.columns, raw.rows)
    }
}

impl DataFrame {
    /// Builds a frame, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, EngineError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(EngineError::InvalidArgument(format!(
                "row {idx} has {} values but the frame has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Single-column frame.
    pub fn single_column(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            columns: vec![name.into()],
            rows: values.into_iter().map(|value| vec![value]).collect(),
        }
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row-major values.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the header.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Values of one column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Rows projected onto `names`, in that order.
    pub fn select(&self, names: &[String]) -> Result<Vec<Vec<f64>>, EngineError> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name).ok_or_else(|| {
                    EngineError::InvalidArgument(format!("missing column `{name}`"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&idx| row[idx]).collect())
            .collect())
    }
}

/// Opaque result of training, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Function that produced the model.
    pub function_name: FunctionName,
    /// Format version of `content`.
    pub version: u32,
    /// Serialized model state.
    pub content: Vec<u8>,
}

impl Model {
    const FORMAT_VERSION: u32 = 1;

    /// Serializes `state` as the content of a model for `function_name`.
    pub fn encode<T: Serialize>(function_name: FunctionName, state: &T) -> Result<Self, EngineError> {
        let content = serde_json::to_vec(state)
            .map_err(|err| EngineError::algorithm(function_name, format!("encoding model: {err}")))?;
        Ok(Self {
            function_name,
            version: Self::FORMAT_VERSION,
            content,
        })
    }

    /// Restores state written by [`Model::encode`], checking the producing function.
    pub fn decode<T: DeserializeOwned>(&self, expected: FunctionName) -> Result<T, EngineError> {
        if self.function_name != expected {
            return Err(EngineError::InvalidArgument(format!(
                "model trained by {} cannot be used with {expected}",
                self.function_name
            )));
        }
        serde_json::from_slice(&self.content)
            .map_err(|err| EngineError::algorithm(expected, format!("decoding model: {err}")))
    }
}

/// Payload of an execute request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputData {
    /// Flat list of sample values.
    Values(Vec<f64>),
    /// Tabular payload.
    Frame(DataFrame),
}

/// Request for [`crate::MlEngine::execute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Function to run.
    pub function_name: FunctionName,
    /// Optional parameters; providers fall back to defaults.
    #[serde(default)]
    pub parameters: Option<AlgorithmParams>,
    /// Request body.
    pub data: InputData,
}

/// Result of prediction or execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// One prediction row per input row.
    Predictions {
        /// Producing function.
        function_name: FunctionName,
        /// Prediction columns.
        frame: DataFrame,
    },
    /// Aggregate over sample values.
    Sample {
        /// Aggregate that was computed.
        operation: SampleOperation,
        /// Result.
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let err = DataFrame::new(vec!["a".into(), "b".into()], vec![vec![1.0, 2.0], vec![3.0]])
            .unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn deserialization_applies_the_same_check() {
        let ok: DataFrame = serde_json::from_str(r#"{"columns":["x"],"rows":[[1.0],[2.0]]}"#).unwrap();
        assert_eq!(ok.column("x").unwrap(), vec![1.0, 2.0]);
        assert!(serde_json::from_str::<DataFrame>(r#"{"columns":["x"],"rows":[[1.0,2.0]]}"#).is_err());
    }

    #[test]
    fn select_projects_named_columns() {
        let frame = DataFrame::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![1.0, 2.0, 3.0]],
        )
        .unwrap();
        let projected = frame.select(&["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(projected, vec![vec![3.0, 1.0]]);
        assert!(frame.select(&["z".to_string()]).is_err());
    }

    #[test]
    fn model_decode_checks_producer() {
        let model = Model::encode(FunctionName::KMeans, &vec![1_u8, 2]).unwrap();
        assert!(model.decode::<Vec<u8>>(FunctionName::LinearRegression).is_err());
        assert_eq!(model.decode::<Vec<u8>>(FunctionName::KMeans).unwrap(), vec![1, 2]);
    }
}
