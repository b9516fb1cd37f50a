use crate::{
    capability::{Algorithm, AlgorithmMetadata, Executable, SelfDescribing},
    error::EngineError,
    frame::{Input, InputData, Output},
    function_name::FunctionName,
    params::{mismatch, AlgorithmParams, SampleOperation},
};

const NAME: FunctionName = FunctionName::LocalSampleCalculator;

/// Aggregates a flat list of sample values in-process.
#[derive(Debug, Clone, Copy)]
pub struct LocalSampleCalculator {
    operation: SampleOperation,
}

/// Builds an instance; absent parameters select [`SampleOperation::Sum`].
pub fn construct(params: Option<&AlgorithmParams>) -> anyhow::Result<Box<dyn Algorithm>> {
    let operation = match params {
        None => SampleOperation::default(),
        Some(AlgorithmParams::LocalSampleCalculator(params)) => params.operation,
        Some(other) => return Err(mismatch(NAME, other).into()),
    };
    Ok(Box::new(LocalSampleCalculator { operation }))
}

impl LocalSampleCalculator {
    fn aggregate(self, values: &[f64]) -> Result<f64, EngineError> {
        if values.is_empty() && self.operation != SampleOperation::Sum {
            return Err(EngineError::algorithm(
                NAME,
                format!("{:?} of an empty sample is undefined", self.operation),
            ));
        }
        let value = match self.operation {
            SampleOperation::Sum => values.iter().sum(),
            SampleOperation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            SampleOperation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            SampleOperation::Mean => values.iter().sum::<f64>() / values.len() as f64,
        };
        Ok(value)
    }
}

impl Executable for LocalSampleCalculator {
    fn execute(&self, input: &Input) -> Result<Output, EngineError> {
        let InputData::Values(values) = &input.data else {
            return Err(EngineError::InvalidArgument(
                "sample calculator expects a list of values".into(),
            ));
        };
        Ok(Output::Sample {
            operation: self.operation,
            value: self.aggregate(values)?,
        })
    }
}

impl SelfDescribing for LocalSampleCalculator {
    fn metadata(&self) -> AlgorithmMetadata {
        AlgorithmMetadata::of(self, "Sum, max, min or mean over sample values", "1.0.0")
    }
}

impl Algorithm for LocalSampleCalculator {
    fn function_name(&self) -> FunctionName {
        NAME
    }

    fn as_executable(&self) -> Option<&dyn Executable> {
        Some(self)
    }

    fn as_self_describing(&self) -> Option<&dyn SelfDescribing> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::DataFrame, params::SampleCalculatorParams};

    fn run(operation: SampleOperation, values: Vec<f64>) -> Result<Output, EngineError> {
        let params = AlgorithmParams::LocalSampleCalculator(SampleCalculatorParams { operation });
        let algorithm = construct(Some(&params)).unwrap();
        let input = Input {
            function_name: NAME,
            parameters: Some(params),
            data: InputData::Values(values),
        };
        algorithm.as_executable().unwrap().execute(&input)
    }

    fn value_of(output: Output) -> f64 {
        match output {
            Output::Sample { value, .. } => value,
            other => panic!("expected sample output, got {other:?}"),
        }
    }

    #[test]
    fn computes_each_operation() {
        let sample = vec![4.0, -2.0, 7.0, 3.0];
        assert_eq!(value_of(run(SampleOperation::Sum, sample.clone()).unwrap()), 12.0);
        assert_eq!(value_of(run(SampleOperation::Max, sample.clone()).unwrap()), 7.0);
        assert_eq!(value_of(run(SampleOperation::Min, sample.clone()).unwrap()), -2.0);
        assert_eq!(value_of(run(SampleOperation::Mean, sample).unwrap()), 3.0);
    }

    #[test]
    fn empty_sample_only_sums() {
        assert_eq!(value_of(run(SampleOperation::Sum, Vec::new()).unwrap()), 0.0);
        assert!(matches!(
            run(SampleOperation::Mean, Vec::new()),
            Err(EngineError::Algorithm { .. })
        ));
    }

    #[test]
    fn rejects_frames() {
        let algorithm = construct(None).unwrap();
        let input = Input {
            function_name: NAME,
            parameters: None,
            data: InputData::Frame(DataFrame::single_column("x", vec![1.0])),
        };
        assert!(matches!(
            algorithm.as_executable().unwrap().execute(&input),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(algorithm.as_trainable().is_none());
    }
}
