use serde_json::json;
use shared_logging::{LogLevel, Telemetry};

use crate::{
    capability::Algorithm,
    error::EngineError,
    frame::{DataFrame, Input, Model, Output},
    function_name::FunctionName,
    metadata::{EngineMetadata, MetadataIntrospector},
    params::AlgorithmParams,
    registry::AlgorithmRegistry,
};

/// Uniform entry point for training, prediction and execution.
///
/// The engine keeps no per-call state: every call resolves a fresh instance from the
/// registry and hands the result straight back, so one engine can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct MlEngine {
    registry: AlgorithmRegistry,
    telemetry: Option<Telemetry>,
}

impl Default for MlEngine {
    fn default() -> Self {
        Self::new(AlgorithmRegistry::builtin())
    }
}

impl MlEngine {
    /// Engine dispatching through `registry`.
    #[must_use]
    pub const fn new(registry: AlgorithmRegistry) -> Self {
        Self {
            registry,
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Registry backing this engine.
    #[must_use]
    pub const fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    /// Scores `frame` with `model`.
    pub fn predict(
        &self,
        function_name: Option<FunctionName>,
        params: Option<&AlgorithmParams>,
        frame: &DataFrame,
        model: &Model,
    ) -> Result<Output, EngineError> {
        let function_name = self.require_name("predict", function_name)?;
        let result = self.instantiate(function_name, params).and_then(|algorithm| {
            algorithm
                .as_predictable()
                .ok_or_else(|| EngineError::unsupported(function_name, "not predictable"))?
                .predict(frame, model)
        });
        self.observe("predict", function_name, result)
    }

    /// Trains on `frame` and returns the model to the caller.
    pub fn train(
        &self,
        function_name: Option<FunctionName>,
        params: Option<&AlgorithmParams>,
        frame: &DataFrame,
    ) -> Result<Model, EngineError> {
        let function_name = self.require_name("train", function_name)?;
        let result = self.instantiate(function_name, params).and_then(|algorithm| {
            algorithm
                .as_trainable()
                .ok_or_else(|| EngineError::unsupported(function_name, "not trainable"))?
                .train(frame)
        });
        self.observe("train", function_name, result)
    }

    /// Runs `input` through its function's executable capability.
    pub fn execute(&self, input: Option<&Input>) -> Result<Output, EngineError> {
        let input = input.ok_or_else(|| self.rejected("execute", "input should not be null"))?;
        let function_name = input.function_name;
        let result = self
            .instantiate(function_name, input.parameters.as_ref())
            .and_then(|algorithm| {
                algorithm
                    .as_executable()
                    .ok_or_else(|| EngineError::unsupported(function_name, "not executable"))?
                    .execute(input)
            });
        self.observe("execute", function_name, result)
    }

    /// Metadata of every self-describing registered algorithm.
    pub fn metadata(&self) -> Result<EngineMetadata, EngineError> {
        MetadataIntrospector::new(&self.registry).collect()
    }

    fn instantiate(
        &self,
        function_name: FunctionName,
        params: Option<&AlgorithmParams>,
    ) -> Result<Box<dyn Algorithm>, EngineError> {
        tracing::debug!(%function_name, has_params = params.is_some(), "resolving algorithm");
        self.registry.instantiate(function_name, params)
    }

    fn observe<T>(
        &self,
        operation: &str,
        function_name: FunctionName,
        result: Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        match &result {
            Ok(_) => {
                self.log(
                    LogLevel::Debug,
                    &format!("engine.{operation}.completed"),
                    json!({ "function_name": function_name }),
                );
                self.event(
                    &format!("engine.{operation}.completed"),
                    json!({ "function_name": function_name }),
                );
            }
            Err(err) => self.record_failure(operation, Some(function_name), err),
        }
        result
    }

    fn require_name(
        &self,
        operation: &str,
        function_name: Option<FunctionName>,
    ) -> Result<FunctionName, EngineError> {
        function_name.ok_or_else(|| self.rejected(operation, "algorithm name should not be null"))
    }

    /// Argument rejections happen before any function is resolved.
    fn rejected(&self, operation: &str, reason: &str) -> EngineError {
        let err = EngineError::InvalidArgument(reason.into());
        self.record_failure(operation, None, &err);
        err
    }

    fn record_failure(
        &self,
        operation: &str,
        function_name: Option<FunctionName>,
        err: &EngineError,
    ) {
        tracing::debug!(?function_name, operation, error = %err, "dispatch failed");
        self.log(
            LogLevel::Warn,
            &format!("engine.{operation}.failed"),
            json!({ "function_name": function_name, "error": err.to_string() }),
        );
        self.event(
            "engine.dispatch.failed",
            json!({
                "operation": operation,
                "function_name": function_name,
                "error": err.to_string(),
            }),
        );
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(level, message, metadata);
        }
    }

    fn event(&self, event_type: &str, payload: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.event(event_type, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use shared_event_bus::MemoryEventBus;

    use super::*;
    use crate::{
        frame::InputData,
        params::{LinearRegressionParams, SampleCalculatorParams, SampleOperation},
    };

    fn counting_registry(calls: &Arc<AtomicUsize>) -> AlgorithmRegistry {
        let registry = AlgorithmRegistry::new();
        for entry in crate::algorithms::BUILTIN_PROVIDERS {
            let calls = Arc::clone(calls);
            let construct = entry.construct;
            registry.register(entry.function_name, move |params| {
                calls.fetch_add(1, Ordering::SeqCst);
                construct(params)
            });
        }
        registry
    }

    fn training_frame() -> DataFrame {
        DataFrame::new(
            vec!["x".into(), "label".into()],
            vec![vec![0.0, 1.0], vec![1.0, 3.0], vec![2.0, 5.0]],
        )
        .unwrap()
    }

    #[test]
    fn absent_arguments_fail_before_the_registry_is_touched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = Telemetry::builder("ml-engine")
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        let engine = MlEngine::new(counting_registry(&calls)).with_telemetry(telemetry);
        let frame = training_frame();
        let model = Model::encode(FunctionName::LinearRegression, &0_u8).unwrap();

        assert!(matches!(
            engine.train(None, None, &frame),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.predict(None, None, &frame, &model),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.execute(None),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let failures = bus.events_of("engine.dispatch.failed");
        let operations = failures
            .iter()
            .map(|event| event.payload["operation"].as_str().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(operations, vec!["train", "predict", "execute"]);
        assert!(failures
            .iter()
            .all(|event| event.payload["function_name"].is_null()));
    }

    #[test]
    fn unregistered_functions_are_unsupported() {
        let engine = MlEngine::new(AlgorithmRegistry::new());
        let frame = training_frame();
        let model = Model::encode(FunctionName::KMeans, &0_u8).unwrap();
        let input = Input {
            function_name: FunctionName::LocalSampleCalculator,
            parameters: None,
            data: InputData::Values(vec![1.0]),
        };
        for result in [
            engine.train(Some(FunctionName::KMeans), None, &frame).map(|_| ()),
            engine
                .predict(Some(FunctionName::KMeans), None, &frame, &model)
                .map(|_| ()),
            engine.execute(Some(&input)).map(|_| ()),
        ] {
            assert!(matches!(result, Err(EngineError::UnsupportedAlgorithm { .. })));
        }
    }

    #[test]
    fn missing_capability_is_unsupported() {
        let engine = MlEngine::default();
        let frame = training_frame();
        let err = engine
            .train(Some(FunctionName::LocalSampleCalculator), None, &frame)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnsupportedAlgorithm {
                function_name: FunctionName::LocalSampleCalculator,
                ..
            }
        ));
        let input = Input {
            function_name: FunctionName::KMeans,
            parameters: None,
            data: InputData::Values(vec![1.0]),
        };
        assert!(matches!(
            engine.execute(Some(&input)),
            Err(EngineError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn train_then_predict_round_trip() {
        let engine = MlEngine::default();
        let params = AlgorithmParams::LinearRegression(LinearRegressionParams {
            learning_rate: 0.1,
            epochs: 2_000,
            ..LinearRegressionParams::default()
        });
        let model = engine
            .train(Some(FunctionName::LinearRegression), Some(&params), &training_frame())
            .unwrap();
        assert_eq!(model.function_name, FunctionName::LinearRegression);
        let output = engine
            .predict(
                Some(FunctionName::LinearRegression),
                None,
                &DataFrame::single_column("x", vec![3.0]),
                &model,
            )
            .unwrap();
        let Output::Predictions { frame, .. } = output else {
            panic!("expected predictions");
        };
        let predicted = frame.column("prediction").unwrap()[0];
        assert!((predicted - 7.0).abs() < 0.2, "{predicted}");
    }

    #[test]
    fn execute_forwards_input_parameters() {
        let engine = MlEngine::default();
        let input = Input {
            function_name: FunctionName::LocalSampleCalculator,
            parameters: Some(AlgorithmParams::LocalSampleCalculator(SampleCalculatorParams {
                operation: SampleOperation::Max,
            })),
            data: InputData::Values(vec![2.0, 9.0, 4.0]),
        };
        assert_eq!(
            engine.execute(Some(&input)).unwrap(),
            Output::Sample {
                operation: SampleOperation::Max,
                value: 9.0,
            }
        );
    }

    #[test]
    fn outcomes_are_published_as_events() {
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = Telemetry::builder("ml-engine")
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        let engine = MlEngine::default().with_telemetry(telemetry);
        let input = Input {
            function_name: FunctionName::LocalSampleCalculator,
            parameters: None,
            data: InputData::Values(vec![1.0, 2.0]),
        };
        engine.execute(Some(&input)).unwrap();
        let _ = engine.train(Some(FunctionName::LocalSampleCalculator), None, &training_frame());

        assert_eq!(bus.events_of("engine.execute.completed").len(), 1);
        let failures = bus.events_of("engine.dispatch.failed");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].payload["operation"], "train");
    }

    #[test]
    fn failures_are_logged_at_warn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");
        let telemetry = Telemetry::builder("ml-engine")
            .log_path(path.clone())
            .build()
            .unwrap();
        let engine = MlEngine::new(AlgorithmRegistry::new()).with_telemetry(telemetry);
        let input = Input {
            function_name: FunctionName::LocalSampleCalculator,
            parameters: None,
            data: InputData::Values(vec![1.0]),
        };
        assert!(engine.execute(Some(&input)).is_err());

        let contents = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(contents.lines().last().unwrap()).unwrap();
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["message"], "engine.execute.failed");
    }
}
