use serde::{Deserialize, Serialize};

use crate::{capability::AlgorithmMetadata, error::EngineError, registry::AlgorithmRegistry};

/// Snapshot of every self-describing algorithm, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMetadata {
    /// One record per self-describing algorithm.
    pub algorithms: Vec<AlgorithmMetadata>,
}

/// Walks a registry and gathers self-reported metadata.
#[derive(Debug, Clone, Copy)]
pub struct MetadataIntrospector<'a> {
    registry: &'a AlgorithmRegistry,
}

impl<'a> MetadataIntrospector<'a> {
    /// Introspector over `registry`.
    #[must_use]
    pub const fn new(registry: &'a AlgorithmRegistry) -> Self {
        Self { registry }
    }

    /// Builds a fresh snapshot.
    ///
    /// Each provider is constructed with default parameters. The first construction failure
    /// aborts the pass; instances that are not self-describing contribute nothing.
    pub fn collect(&self) -> Result<EngineMetadata, EngineError> {
        let mut algorithms = Vec::new();
        for (function_name, factory) in self.registry.snapshot() {
            let instance = factory(None).map_err(|err| EngineError::MetadataCollection {
                function_name,
                cause: format!("{err:#}"),
            })?;
            if let Some(describing) = instance.as_self_describing() {
                algorithms.push(describing.metadata());
            }
        }
        tracing::debug!(count = algorithms.len(), "engine metadata collected");
        Ok(EngineMetadata { algorithms })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::{capability::Algorithm, function_name::FunctionName};

    struct Opaque;

    impl Algorithm for Opaque {
        fn function_name(&self) -> FunctionName {
            FunctionName::KMeans
        }
    }

    #[test]
    fn one_record_per_builtin_in_stable_order() {
        let registry = AlgorithmRegistry::builtin();
        let introspector = MetadataIntrospector::new(&registry);
        let first = introspector.collect().unwrap();
        let names = first.algorithms.iter().map(|meta| meta.name).collect::<Vec<_>>();
        assert_eq!(names, FunctionName::ALL.to_vec());
        assert_eq!(introspector.collect().unwrap(), first);
    }

    #[test]
    fn non_describing_algorithms_are_skipped() {
        let registry = AlgorithmRegistry::builtin();
        registry.register(FunctionName::KMeans, |_| Ok(Box::new(Opaque)));
        let metadata = MetadataIntrospector::new(&registry).collect().unwrap();
        assert_eq!(metadata.algorithms.len(), 2);
        assert!(metadata
            .algorithms
            .iter()
            .all(|meta| meta.name != FunctionName::KMeans));
    }

    #[test]
    fn construction_failure_aborts_collection() {
        let registry = AlgorithmRegistry::builtin();
        registry.register(FunctionName::KMeans, |_| Err(anyhow!("model cache offline")));
        match MetadataIntrospector::new(&registry).collect() {
            Err(EngineError::MetadataCollection {
                function_name,
                cause,
            }) => {
                assert_eq!(function_name, FunctionName::KMeans);
                assert!(cause.contains("model cache offline"));
            }
            other => panic!("expected metadata collection failure, got {other:?}"),
        }
    }
}
