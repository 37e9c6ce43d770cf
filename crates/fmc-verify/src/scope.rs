//! Per-check object ownership
//!
//! Candidate code is not trusted to free what it hands out. Every object a
//! behavioral check acquires, whether constructed directly or returned by a
//! factory, is adopted by a [`Scope`] and released exactly once by
//! [`Scope::release_all`]. Candidate panics are caught at every call into
//! candidate code, including type-name lookups and releases.

use fmc_candidate::{CandidateObject, CandidateRuntime, InvocationError, Value};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Handle to an object owned by a [`Scope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

/// Result of an invocation, with returned objects already adopted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Textual result
    Text(String),
    /// Object now owned by the scope
    Object(ObjectKey),
    /// Absent object
    Null,
    /// No value
    Unit,
}

impl Outcome {
    /// Short description for check messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Outcome::Text(text) => format!("text \"{text}\""),
            Outcome::Object(_) => "an object".to_string(),
            Outcome::Null => "a null reference".to_string(),
            Outcome::Unit => "no value".to_string(),
        }
    }
}

/// Owner of every object acquired during one check
#[derive(Default)]
pub struct Scope {
    objects: Vec<Option<Box<dyn CandidateObject>>>,
}

impl Scope {
    /// Create empty scope
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an object
    pub fn adopt(&mut self, object: Box<dyn CandidateObject>) -> ObjectKey {
        self.objects.push(Some(object));
        ObjectKey(self.objects.len() - 1)
    }

    /// Construct `type_name` through `runtime` and adopt the instance
    pub fn instantiate(
        &mut self,
        runtime: &dyn CandidateRuntime,
        type_name: &str,
    ) -> Result<ObjectKey, InvocationError> {
        let object = catch_unwind(AssertUnwindSafe(|| runtime.instantiate(type_name)))
            .map_err(|payload| panicked(payload.as_ref()))??;
        Ok(self.adopt(object))
    }

    /// Invoke `operation` on an owned object
    pub fn invoke(&mut self, key: ObjectKey, operation: &str) -> Result<Outcome, InvocationError> {
        let object = self
            .objects
            .get_mut(key.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| InvocationError::Internal(format!("object #{} already released", key.0)))?;

        let value = catch_unwind(AssertUnwindSafe(|| object.invoke(operation)))
            .map_err(|payload| panicked(payload.as_ref()))??;

        Ok(match value {
            Value::Text(text) => Outcome::Text(text),
            Value::Object(object) => Outcome::Object(self.adopt(object)),
            Value::Null => Outcome::Null,
            Value::Unit => Outcome::Unit,
        })
    }

    /// Dynamic type name of an owned object; `None` if the lookup panicked
    #[must_use]
    pub fn type_name(&self, key: ObjectKey) -> Option<&str> {
        let object = self.objects.get(key.0).and_then(Option::as_ref)?;
        guarded_type_name(object.as_ref())
    }

    /// Number of objects still owned
    #[must_use]
    pub fn live(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }

    /// Release every owned object, most recent first
    ///
    /// Returns the number of objects released. A panicking destructor is
    /// logged and counted as released.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for slot in self.objects.iter_mut().rev() {
            let Some(object) = slot.take() else { continue };
            let type_name = guarded_type_name(object.as_ref()).unwrap_or("unknown").to_string();
            if let Err(payload) = catch_unwind(AssertUnwindSafe(move || drop(object))) {
                tracing::warn!(
                    type_name = %type_name,
                    panic = %panic_message(payload.as_ref()),
                    "candidate object panicked while being released"
                );
            }
            released += 1;
        }
        released
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if std::thread::panicking() {
            // A second panic while unwinding aborts the process.
            for slot in &mut self.objects {
                if let Some(object) = slot.take() {
                    std::mem::forget(object);
                }
            }
            return;
        }
        self.release_all();
    }
}

fn guarded_type_name(object: &dyn CandidateObject) -> Option<&str> {
    match catch_unwind(AssertUnwindSafe(|| object.type_name())) {
        Ok(name) => Some(name),
        Err(payload) => {
            tracing::warn!(panic = %panic_message(payload.as_ref()), "candidate type name lookup panicked");
            None
        }
    }
}

fn panicked(payload: &(dyn Any + Send)) -> InvocationError {
    InvocationError::Raised(format!("panicked: {}", panic_message(payload)))
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmc_candidate::NativeRuntime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Tracked {
        drops: Arc<AtomicUsize>,
        panic_on_drop: bool,
    }

    struct Nameless {
        drops: Arc<AtomicUsize>,
    }

    impl CandidateObject for Nameless {
        fn type_name(&self) -> &str {
            panic!("type_name blew up")
        }

        fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
            Ok(Value::text(operation))
        }
    }

    impl Drop for Nameless {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CandidateObject for Tracked {
        fn type_name(&self) -> &str {
            "Tracked"
        }

        fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
            match operation {
                "spawn" => Ok(Value::object(Tracked {
                    drops: Arc::clone(&self.drops),
                    panic_on_drop: false,
                })),
                "boom" => panic!("boom"),
                _ => Ok(Value::text(operation)),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_drop {
                panic!("destructor failure");
            }
        }
    }

    fn tracked(drops: &Arc<AtomicUsize>, panic_on_drop: bool) -> Box<dyn CandidateObject> {
        Box::new(Tracked {
            drops: Arc::clone(drops),
            panic_on_drop,
        })
    }

    #[test]
    fn returned_objects_are_adopted_and_released_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut scope = Scope::new();
        let root = scope.adopt(tracked(&drops, false));
        let child = match scope.invoke(root, "spawn").unwrap() {
            Outcome::Object(key) => key,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(scope.type_name(child), Some("Tracked"));
        assert_eq!(scope.live(), 2);

        assert_eq!(scope.release_all(), 2);
        assert_eq!(scope.release_all(), 0);
        drop(scope);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_invocation_becomes_error() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut scope = Scope::new();
        let key = scope.adopt(tracked(&drops, false));
        let err = scope.invoke(key, "boom").unwrap_err();
        assert!(matches!(err, InvocationError::Raised(message) if message.contains("boom")));

        drop(scope);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_destructor_is_contained() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut scope = Scope::new();
        scope.adopt(tracked(&drops, true));
        scope.adopt(tracked(&drops, false));
        assert_eq!(scope.release_all(), 2);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_constructor_becomes_error() {
        let runtime = NativeRuntime::new().register("Fragile", || -> Tracked {
            panic!("constructor failure")
        });
        let mut scope = Scope::new();
        let err = scope.instantiate(&runtime, "Fragile").unwrap_err();
        assert!(matches!(err, InvocationError::Raised(message) if message.contains("constructor failure")));
        assert_eq!(scope.live(), 0);
    }

    #[test]
    fn released_key_is_rejected() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut scope = Scope::new();
        let key = scope.adopt(tracked(&drops, false));
        scope.release_all();
        assert!(matches!(scope.invoke(key, "x"), Err(InvocationError::Internal(_))));
    }

    #[test]
    fn panicking_type_name_still_releases_everything() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut scope = Scope::new();
        scope.adopt(tracked(&drops, false));
        let key = scope.adopt(Box::new(Nameless {
            drops: Arc::clone(&drops),
        }));
        scope.adopt(tracked(&drops, false));

        assert_eq!(scope.type_name(key), None);
        assert_eq!(scope.release_all(), 3);
        assert_eq!(drops.load(Ordering::SeqCst), 3);
        assert_eq!(scope.live(), 0);
    }
}
