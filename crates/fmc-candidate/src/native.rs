//! In-process runtime for candidates written in Rust
//!
//! Each constructible type registers a constructor closure. Constructors may
//! panic; the verifier contains that at the check boundary.

use crate::runtime::{CandidateObject, CandidateRuntime, InvocationError};
use indexmap::IndexMap;
use std::fmt;

type Constructor = Box<dyn Fn() -> Box<dyn CandidateObject> + Send + Sync>;

/// Runtime backed by registered constructor closures
#[derive(Default)]
pub struct NativeRuntime {
    constructors: IndexMap<String, Constructor>,
}

impl NativeRuntime {
    /// Create runtime with no constructible types
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `type_name`
    #[must_use]
    pub fn register<F, O>(mut self, type_name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> O + Send + Sync + 'static,
        O: CandidateObject + 'static,
    {
        self.constructors.insert(
            type_name.into(),
            Box::new(move || Box::new(constructor()) as Box<dyn CandidateObject>),
        );
        self
    }

    /// Names of constructible types
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl fmt::Debug for NativeRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRuntime")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CandidateRuntime for NativeRuntime {
    fn name(&self) -> &'static str {
        "native"
    }

    fn instantiate(&self, type_name: &str) -> Result<Box<dyn CandidateObject>, InvocationError> {
        let constructor = self
            .constructors
            .get(type_name)
            .ok_or_else(|| InvocationError::NotConstructible(type_name.to_string()))?;
        Ok(constructor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Value;

    struct Widget;

    impl CandidateObject for Widget {
        fn type_name(&self) -> &str {
            "Widget"
        }

        fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
            match operation {
                "name" => Ok(Value::text("widget")),
                other => Err(InvocationError::UnknownOperation {
                    type_name: "Widget".to_string(),
                    operation: other.to_string(),
                }),
            }
        }
    }

    #[test]
    fn registered_type_is_constructed() {
        let runtime = NativeRuntime::new().register("Widget", || Widget);
        let mut object = runtime.instantiate("Widget").ok().unwrap();
        assert_eq!(object.type_name(), "Widget");
        assert!(matches!(object.invoke("name"), Ok(Value::Text(t)) if t == "widget"));
    }

    #[test]
    fn unregistered_type_is_not_constructible() {
        let runtime = NativeRuntime::new();
        assert!(matches!(
            runtime.instantiate("Widget").err(),
            Some(InvocationError::NotConstructible(name)) if name == "Widget"
        ));
    }

    #[test]
    fn type_names_preserve_registration_order() {
        let runtime = NativeRuntime::new()
            .register("B", || Widget)
            .register("A", || Widget);
        assert_eq!(runtime.type_names().collect::<Vec<_>>(), vec!["B", "A"]);
    }
}
