//! Registry of derivation function implementations.
//!
//! Function definitions name their implementation by identifier
//! (`hipposys:classname`). The registry maps each identifier to a factory
//! producing a fresh [`DerivedDataFunction`] per use; it is filled once at
//! startup.

use std::collections::BTreeMap;
use std::sync::Arc;
use strsim::levenshtein;

use super::stock;
use crate::core::{DerivedDataError, Parameters, Result};

/// Maximum Levenshtein distance, as a percentage of the identifier length,
/// for an identifier to be suggested.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// A pluggable computation.
///
/// Implementations are pure with respect to the repository: they see only
/// the accessed parameters and return the derived ones.
pub trait DerivedDataFunction: Send + Sync {
    /// Compute derived parameters from accessed ones.
    fn compute(&self, parameters: Parameters) -> Result<Parameters>;
}

type Factory = Box<dyn Fn() -> Result<Box<dyn DerivedDataFunction>> + Send + Sync>;

struct ClosureFunction<F>(Arc<F>);

impl<F> DerivedDataFunction for ClosureFunction<F>
where
    F: Fn(Parameters) -> Result<Parameters> + Send + Sync,
{
    fn compute(&self, parameters: Parameters) -> Result<Parameters> {
        (self.0)(parameters)
    }
}

/// Maps implementation identifiers to function factories.
#[derive(Default)]
pub struct FunctionRegistry {
    factories: BTreeMap<String, Factory>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock `copy` and `ancestors` functions.
    pub fn with_stock_functions() -> Self {
        let mut registry = Self::new();
        registry.register(stock::COPY, || Ok(Box::new(stock::CopyFunction)));
        registry.register(stock::ANCESTORS, || Ok(Box::new(stock::AncestorsFunction)));
        registry
    }

    /// Register a factory, replacing any previous one for `implementation_id`.
    pub fn register<F>(&mut self, implementation_id: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn DerivedDataFunction>> + Send + Sync + 'static,
    {
        self.factories.insert(implementation_id.into(), Box::new(factory));
    }

    /// Register a plain closure as a function.
    pub fn register_fn<F>(&mut self, implementation_id: impl Into<String>, function: F)
    where
        F: Fn(Parameters) -> Result<Parameters> + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        self.register(implementation_id, move || {
            Ok(Box::new(ClosureFunction(Arc::clone(&function))) as Box<dyn DerivedDataFunction>)
        });
    }

    /// Whether an identifier is registered.
    pub fn contains(&self, implementation_id: &str) -> bool {
        self.factories.contains_key(implementation_id)
    }

    /// Registered identifiers, sorted.
    pub fn implementation_ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the function registered under `implementation_id`.
    ///
    /// # Errors
    ///
    /// [`DerivedDataError::UnknownFunction`] (with the closest registered
    /// identifier as suggestion) if nothing is registered under the id, or
    /// whatever the factory fails with.
    pub fn create(&self, implementation_id: &str) -> Result<Box<dyn DerivedDataFunction>> {
        match self.factories.get(implementation_id) {
            Some(factory) => factory(),
            None => Err(DerivedDataError::UnknownFunction {
                implementation_id: implementation_id.to_string(),
                suggestion: self.closest(implementation_id),
            }),
        }
    }

    fn closest(&self, target: &str) -> Option<String> {
        let limit = target.len() * SIMILARITY_THRESHOLD_PERCENT / 100;
        self.factories
            .keys()
            .map(|id| (id, levenshtein(target, id)))
            .filter(|(_, distance)| *distance <= limit)
            .min_by_key(|(_, distance)| *distance)
            .map(|(id, _)| id.clone())
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("implementations", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_stock_functions_registered() {
        let registry = FunctionRegistry::with_stock_functions();
        assert!(registry.contains(stock::COPY));
        assert!(registry.contains(stock::ANCESTORS));
        assert_eq!(registry.implementation_ids().collect::<Vec<_>>(), ["ancestors", "copy"]);
    }

    #[test]
    fn test_closure_function() {
        let mut registry = FunctionRegistry::new();
        registry.register_fn("upper", |parameters: Parameters| {
            Ok(parameters
                .into_iter()
                .map(|(name, values)| {
                    let values = values.iter().map(|v| Value::from(v.as_string().to_uppercase())).collect();
                    (name, values)
                })
                .collect())
        });

        let function = registry.create("upper").unwrap();
        let output = function
            .compute(Parameters::from([("title".to_string(), vec![Value::from("hello")])]))
            .unwrap();
        assert_eq!(output["title"], vec![Value::from("HELLO")]);
    }

    #[test]
    fn test_unknown_function_suggests_closest() {
        let registry = FunctionRegistry::with_stock_functions();
        match registry.create("cpy") {
            Err(DerivedDataError::UnknownFunction {
                implementation_id,
                suggestion,
            }) => {
                assert_eq!(implementation_id, "cpy");
                assert_eq!(suggestion.as_deref(), Some("copy"));
            }
            other => panic!("expected UnknownFunction, got {:?}", other.map(|_| ())),
        }

        assert!(matches!(
            registry.create("org.example.Unrelated"),
            Err(DerivedDataError::UnknownFunction { suggestion: None, .. })
        ));
    }

    #[test]
    fn test_factory_failure_propagates() {
        let mut registry = FunctionRegistry::new();
        registry.register("broken", || {
            Err(DerivedDataError::FunctionFailed {
                function: "broken".to_string(),
                reason: "cannot construct".to_string(),
            })
        });
        assert!(matches!(registry.create("broken"), Err(DerivedDataError::FunctionFailed { .. })));
    }
}
