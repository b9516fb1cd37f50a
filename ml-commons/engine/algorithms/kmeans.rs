use rand::{rngs::SmallRng, seq::index::sample, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    capability::{Algorithm, AlgorithmMetadata, Predictable, SelfDescribing, Trainable},
    error::EngineError,
    frame::{DataFrame, Model, Output},
    function_name::FunctionName,
    params::{mismatch, AlgorithmParams, DistanceType, KMeansParams},
};

const NAME: FunctionName = FunctionName::KMeans;

/// Lloyd's k-means over every column of the frame.
#[derive(Debug, Clone)]
pub struct KMeans {
    params: KMeansParams,
}

/// Builds an instance, validating supplied parameters.
pub fn construct(params: Option<&AlgorithmParams>) -> anyhow::Result<Box<dyn Algorithm>> {
    let params = match params {
        None => KMeansParams::default(),
        Some(AlgorithmParams::KMeans(params)) => params.clone(),
        Some(other) => return Err(mismatch(NAME, other).into()),
    };
    params.validate()?;
    Ok(Box::new(KMeans { params }))
}

#[derive(Debug, Serialize, Deserialize)]
struct Centroids {
    columns: Vec<String>,
    distance_type: DistanceType,
    centers: Vec<Vec<f64>>,
}

impl Centroids {
    fn nearest(&self, row: &[f64]) -> usize {
        self.centers
            .iter()
            .enumerate()
            .map(|(idx, center)| (idx, distance(self.distance_type, row, center)))
            .min_by(|left, right| left.1.total_cmp(&right.1))
            .map_or(0, |(idx, _)| idx)
    }
}

fn distance(kind: DistanceType, left: &[f64], right: &[f64]) -> f64 {
    let pairs = left.iter().zip(right);
    match kind {
        DistanceType::Euclidean => pairs.map(|(a, b)| (a - b).powi(2)).sum::<f64>().sqrt(),
        DistanceType::L1 => pairs.map(|(a, b)| (a - b).abs()).sum(),
        DistanceType::Cosine => {
            let (dot, left_norm, right_norm) = pairs.fold((0.0, 0.0, 0.0), |acc, (a, b)| {
                (acc.0 + a * b, acc.1 + a * a, acc.2 + b * b)
            });
            let denom = (left_norm * right_norm).sqrt();
            if denom == 0.0 {
                1.0
            } else {
                1.0 - dot / denom
            }
        }
    }
}

impl KMeans {
    fn cluster(&self, rows: &[Vec<f64>], columns: Vec<String>) -> Result<Centroids, EngineError> {
        let k = self.params.centroids;
        if rows.len() < k {
            return Err(EngineError::algorithm(
                NAME,
                format!("cannot pick {k} centroids from {} rows", rows.len()),
            ));
        }
        let mut rng = SmallRng::seed_from_u64(self.params.seed);
        let mut model = Centroids {
            columns,
            distance_type: self.params.distance_type,
            centers: sample(&mut rng, rows.len(), k)
                .into_iter()
                .map(|idx| rows[idx].clone())
                .collect(),
        };
        let width = model.columns.len();
        let mut assignments = vec![usize::MAX; rows.len()];
        for _ in 0..self.params.iterations {
            let mut changed = false;
            for (row, slot) in rows.iter().zip(assignments.iter_mut()) {
                let nearest = model.nearest(row);
                if *slot != nearest {
                    *slot = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            let mut sums = vec![vec![0.0; width]; k];
            let mut counts = vec![0_usize; k];
            for (row, &cluster) in rows.iter().zip(&assignments) {
                counts[cluster] += 1;
                for (sum, value) in sums[cluster].iter_mut().zip(row) {
                    *sum += value;
                }
            }
            // Empty clusters keep their previous center.
            for ((center, sum), count) in model.centers.iter_mut().zip(sums).zip(counts) {
                if count > 0 {
                    *center = sum.into_iter().map(|value| value / count as f64).collect();
                }
            }
        }
        Ok(model)
    }
}

impl Trainable for KMeans {
    fn train(&self, frame: &DataFrame) -> Result<Model, EngineError> {
        let centroids = self.cluster(frame.rows(), frame.columns().to_vec())?;
        Model::encode(NAME, &centroids)
    }
}

impl Predictable for KMeans {
    fn predict(&self, frame: &DataFrame, model: &Model) -> Result<Output, EngineError> {
        let centroids: Centroids = model.decode(NAME)?;
        let rows = frame.select(&centroids.columns)?;
        let clusters = rows
            .iter()
            .map(|row| centroids.nearest(row) as f64)
            .collect();
        Ok(Output::Predictions {
            function_name: NAME,
            frame: DataFrame::single_column("cluster_id", clusters),
        })
    }
}

impl SelfDescribing for KMeans {
    fn metadata(&self) -> AlgorithmMetadata {
        AlgorithmMetadata::of(self, "k-means clustering with Lloyd iterations", "1.0.0")
    }
}

impl Algorithm for KMeans {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> DataFrame {
        DataFrame::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![10.0, 10.0],
                vec![10.0, 11.0],
                vec![11.0, 10.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn separates_distant_blobs() {
        let algorithm = construct(None).unwrap();
        let model = algorithm.as_trainable().unwrap().train(&blobs()).unwrap();
        let output = algorithm
            .as_predictable()
            .unwrap()
            .predict(&blobs(), &model)
            .unwrap();
        let Output::Predictions { frame, .. } = output else {
            panic!("expected predictions");
        };
        let ids = frame.column("cluster_id").unwrap();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[0], ids[2]);
        assert_eq!(ids[3], ids[4]);
        assert_eq!(ids[3], ids[5]);
        assert_ne!(ids[0], ids[3]);
    }

    #[test]
    fn too_few_rows_is_an_algorithm_failure() {
        let algorithm = construct(Some(&AlgorithmParams::KMeans(KMeansParams {
            centroids: 10,
            ..KMeansParams::default()
        })))
        .unwrap();
        let err = algorithm.as_trainable().unwrap().train(&blobs()).unwrap_err();
        assert!(matches!(err, EngineError::Algorithm { .. }));
    }

    #[test]
    fn cosine_distance_ignores_magnitude() {
        assert!(distance(DistanceType::Cosine, &[1.0, 1.0], &[5.0, 5.0]).abs() < 1e-9);
        assert!((distance(DistanceType::L1, &[0.0, 0.0], &[1.0, 2.0]) - 3.0).abs() < 1e-9);
    }
}
