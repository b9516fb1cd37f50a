use std::{sync::Arc, thread};

use ml_engine::prelude::*;
use ml_engine::{Algorithm, MetadataIntrospector};

fn default_params(function_name: FunctionName) -> AlgorithmParams {
    match function_name {
        FunctionName::LinearRegression => {
            AlgorithmParams::LinearRegression(LinearRegressionParams::default())
        }
        FunctionName::KMeans => AlgorithmParams::KMeans(KMeansParams::default()),
        FunctionName::LocalSampleCalculator => {
            AlgorithmParams::LocalSampleCalculator(SampleCalculatorParams::default())
        }
    }
}

#[test]
fn every_builtin_accepts_its_own_default_parameters() {
    let registry = AlgorithmRegistry::from_providers(BUILTIN_PROVIDERS).unwrap();
    for name in FunctionName::ALL {
        let params = default_params(name);
        assert!(params.validate().is_ok());
        let instance = registry.instantiate(name, Some(&params)).ok().unwrap();
        assert_eq!(instance.function_name(), name);
    }
}

#[test]
fn clustering_round_trip_through_the_engine() {
    let engine = MlEngine::default();
    let frame = DataFrame::new(
        vec!["lat".into(), "lon".into()],
        vec![
            vec![1.0, 1.0],
            vec![1.2, 0.9],
            vec![40.0, 40.0],
            vec![40.5, 39.8],
        ],
    )
    .unwrap();
    let model = engine.train(Some(FunctionName::KMeans), None, &frame).unwrap();
    let output = engine
        .predict(Some(FunctionName::KMeans), None, &frame, &model)
        .unwrap();
    let Output::Predictions { function_name, frame } = output else {
        panic!("expected predictions");
    };
    assert_eq!(function_name, FunctionName::KMeans);
    let ids = frame.column("cluster_id").unwrap();
    assert_eq!(ids[0], ids[1]);
    assert_eq!(ids[2], ids[3]);
    assert_ne!(ids[0], ids[2]);
}

#[test]
fn model_from_another_function_is_rejected() {
    let engine = MlEngine::default();
    let frame = DataFrame::new(
        vec!["x".into(), "label".into()],
        vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]],
    )
    .unwrap();
    let model = engine
        .train(Some(FunctionName::LinearRegression), None, &frame)
        .unwrap();
    assert!(matches!(
        engine.predict(Some(FunctionName::KMeans), None, &frame, &model),
        Err(EngineError::InvalidArgument(_))
    ));
}

#[test]
fn execute_payload_from_json() {
    let input: Input = serde_json::from_str(
        r#"{
            "function_name": "LOCAL_SAMPLE_CALCULATOR",
            "parameters": {
                "function_name": "LOCAL_SAMPLE_CALCULATOR",
                "parameters": { "operation": "MEAN" }
            },
            "data": { "values": [1.0, 2.0, 6.0] }
        }"#,
    )
    .unwrap();
    assert!(matches!(input.data, InputData::Values(ref values) if values.len() == 3));
    let output = MlEngine::default().execute(Some(&input)).unwrap();
    assert_eq!(
        serde_json::to_value(&output).unwrap(),
        serde_json::json!({ "type": "sample", "operation": "MEAN", "value": 3.0 })
    );
}

#[test]
fn engine_metadata_matches_the_introspector() {
    let engine = MlEngine::default();
    let via_engine = engine.metadata().unwrap();
    let via_introspector = MetadataIntrospector::new(engine.registry()).collect().unwrap();
    assert_eq!(via_engine, via_introspector);
    let executable = via_engine
        .algorithms
        .iter()
        .filter(|meta| meta.executable)
        .map(|meta| meta.name)
        .collect::<Vec<_>>();
    assert_eq!(executable, vec![FunctionName::LocalSampleCalculator]);
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn one_engine_serves_threads_while_providers_are_registered() {
    assert_send_sync::<MlEngine>();
    assert_send_sync::<AlgorithmRegistry>();

    let engine = Arc::new(MlEngine::default());
    let frame = DataFrame::new(
        vec!["x".into(), "label".into()],
        vec![vec![0.0, 1.0], vec![1.0, 3.0], vec![2.0, 5.0]],
    )
    .unwrap();
    let calculator = BUILTIN_PROVIDERS
        .iter()
        .find(|entry| entry.function_name == FunctionName::LocalSampleCalculator)
        .unwrap()
        .construct;

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..50 {
                engine
                    .registry()
                    .register(FunctionName::LocalSampleCalculator, calculator);
            }
        })
    };
    let workers = (0..8_u32)
        .map(|idx| {
            let engine = Arc::clone(&engine);
            let frame = frame.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    let model = engine
                        .train(Some(FunctionName::LinearRegression), None, &frame)
                        .unwrap();
                    let output = engine
                        .predict(
                            Some(FunctionName::LinearRegression),
                            None,
                            &DataFrame::single_column("x", vec![1.0]),
                            &model,
                        )
                        .unwrap();
                    let Output::Predictions { frame: scored, .. } = output else {
                        panic!("expected predictions");
                    };
                    assert_eq!(scored.len(), 1);

                    let input = Input {
                        function_name: FunctionName::LocalSampleCalculator,
                        parameters: None,
                        data: InputData::Values(vec![f64::from(idx), 1.0]),
                    };
                    assert_eq!(
                        engine.execute(Some(&input)).unwrap(),
                        Output::Sample {
                            operation: SampleOperation::Sum,
                            value: f64::from(idx) + 1.0,
                        }
                    );
                }
            })
        })
        .collect::<Vec<_>>();

    writer.join().unwrap();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(engine.registry().function_names(), FunctionName::ALL.to_vec());
}
