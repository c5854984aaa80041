//! Functions available without any registration.

use super::registry::DerivedDataFunction;
use crate::core::{Parameters, Result};

/// Implementation id of [`CopyFunction`].
pub const COPY: &str = "copy";
/// Implementation id of [`AncestorsFunction`].
pub const ANCESTORS: &str = "ancestors";

/// Passes every accessed parameter through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyFunction;

impl DerivedDataFunction for CopyFunction {
    fn compute(&self, parameters: Parameters) -> Result<Parameters> {
        Ok(parameters)
    }
}

/// Publishes the `ancestors` parameter as `paths`, the facet used for
/// location-based search.
#[derive(Debug, Default, Clone, Copy)]
pub struct AncestorsFunction;

impl DerivedDataFunction for AncestorsFunction {
    fn compute(&self, mut parameters: Parameters) -> Result<Parameters> {
        let mut derived = Parameters::new();
        if let Some(ancestors) = parameters.remove("ancestors") {
            derived.insert("paths".to_string(), ancestors);
        }
        Ok(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_copy() {
        let parameters = Parameters::from([("a".to_string(), vec![Value::from(1), Value::from(2)])]);
        assert_eq!(CopyFunction.compute(parameters.clone()).unwrap(), parameters);
    }

    #[test]
    fn test_ancestors_become_paths() {
        let parameters = Parameters::from([
            ("ancestors".to_string(), vec![Value::from("x"), Value::from("y")]),
            ("other".to_string(), vec![Value::from("z")]),
        ]);
        let derived = AncestorsFunction.compute(parameters).unwrap();
        assert_eq!(derived.len(), 1);
        assert_eq!(derived["paths"], vec![Value::from("x"), Value::from("y")]);

        assert!(AncestorsFunction.compute(Parameters::new()).unwrap().is_empty());
    }
}
