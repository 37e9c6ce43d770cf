//! Candidate runtimes
//!
//! Behavioral checks drive candidate code through two traits:
//! [`CandidateRuntime`] constructs instances by type name and
//! [`CandidateObject`] invokes operations by name. Operation names come from
//! the role binding, so a runtime never needs to know the pattern.

use fmc_contract::ReturnKind;
use std::fmt;
use std::time::Duration;

/// Errors constructing or invoking candidate code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    /// No type with that name can be constructed
    #[error("type '{0}' is not constructible by this runtime")]
    NotConstructible(String),

    /// The object has no such operation
    #[error("'{type_name}' has no operation '{operation}'")]
    UnknownOperation { type_name: String, operation: String },

    /// Identifier unsafe to pass to the runtime
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Candidate code failed to build
    #[error("candidate failed to build: {0}")]
    Build(String),

    /// Candidate code terminated abnormally
    #[error("candidate crashed: {0}")]
    Crashed(String),

    /// Candidate code raised an error
    #[error("candidate raised: {0}")]
    Raised(String),

    /// Candidate code did not finish in time
    #[error("candidate timed out after {0:?}")]
    Timeout(Duration),

    /// Result could not be interpreted
    #[error("unsupported result: {0}")]
    UnsupportedResult(String),

    /// Runtime cannot execute candidates at all
    #[error("behavioral execution unavailable: {0}")]
    Unavailable(String),

    /// Runtime infrastructure failure
    #[error("runtime error: {0}")]
    Internal(String),
}

/// Result of invoking an operation
pub enum Value {
    /// Textual result
    Text(String),
    /// Reference to another candidate object; ownership passes to the caller
    Object(Box<dyn CandidateObject>),
    /// Absent object reference (null pointer, `None`)
    Null,
    /// No result
    Unit,
}

impl Value {
    /// Textual value
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Wrap an object
    #[inline]
    #[must_use]
    pub fn object(object: impl CandidateObject + 'static) -> Self {
        Value::Object(Box::new(object))
    }

    /// Shape of this value
    #[must_use]
    pub fn kind(&self) -> ReturnKind {
        match self {
            Value::Text(_) => ReturnKind::Text,
            Value::Object(_) | Value::Null => ReturnKind::Object,
            Value::Unit => ReturnKind::Void,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Value::Object(object) => f.debug_tuple("Object").field(&object.type_name()).finish(),
            Value::Null => f.write_str("Null"),
            Value::Unit => f.write_str("Unit"),
        }
    }
}

/// A live instance of a candidate type
///
/// Dropping the box releases the instance; the verifier guarantees that
/// happens exactly once per acquired object.
pub trait CandidateObject {
    /// Dynamic type name of this instance
    fn type_name(&self) -> &str;

    /// Invoke a parameterless operation by name
    fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError>;
}

/// Constructs candidate instances by type name
pub trait CandidateRuntime: Send {
    /// Short runtime name for diagnostics
    fn name(&self) -> &'static str;

    /// Construct an instance of `type_name`
    fn instantiate(&self, type_name: &str) -> Result<Box<dyn CandidateObject>, InvocationError>;
}

/// Runtime for structural-only verification
///
/// Every instantiation fails with [`InvocationError::Unavailable`], so
/// behavioral checks report inconclusive.
#[derive(Debug, Clone)]
pub struct UnavailableRuntime {
    reason: String,
}

impl UnavailableRuntime {
    /// Create with a reason shown in check messages
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl CandidateRuntime for UnavailableRuntime {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn instantiate(&self, _type_name: &str) -> Result<Box<dyn CandidateObject>, InvocationError> {
        Err(InvocationError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named;

    impl CandidateObject for Named {
        fn type_name(&self) -> &str {
            "Named"
        }

        fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
            Err(InvocationError::UnknownOperation {
                type_name: self.type_name().to_string(),
                operation: operation.to_string(),
            })
        }
    }

    #[test]
    fn value_kinds() {
        assert_eq!(Value::text("A").kind(), ReturnKind::Text);
        assert_eq!(Value::object(Named).kind(), ReturnKind::Object);
        assert_eq!(Value::Null.kind(), ReturnKind::Object);
        assert_eq!(Value::Unit.kind(), ReturnKind::Void);
    }

    #[test]
    fn value_debug_names_object_type() {
        assert_eq!(format!("{:?}", Value::object(Named)), "Object(\"Named\")");
    }

    #[test]
    fn unavailable_runtime_refuses_instantiation() {
        let runtime = UnavailableRuntime::new("structural-only run");
        let err = runtime.instantiate("Anything").err().unwrap();
        assert!(matches!(err, InvocationError::Unavailable(reason) if reason == "structural-only run"));
    }
}
