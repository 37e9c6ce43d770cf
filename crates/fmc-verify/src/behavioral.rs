//! Behavioral verifier
//!
//! Instantiates the concrete roles through the candidate's runtime and checks
//! what the contract's behavioral expectations observe, once per concrete
//! pair in the binding. Each check owns a fresh [`Scope`]; every object it
//! acquired is released when the check returns, whatever the outcome, even
//! if the check itself panicked.
//!
//! Behavioral mismatches are `fail`. Anything that prevents observing the
//! behavior (unbound or abstract role, construction failure, candidate
//! panic, crash or timeout) is `inconclusive`.

use crate::scope::{panic_message, ObjectKey, Outcome, Scope};
use fmc_candidate::{CandidateModel, CandidateRuntime, InvocationError};
use fmc_contract::{
    CheckId, CheckResult, InconclusiveCause, OperationSlot, PatternContract, Role, RoleBinding,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Bound type and operations a check needs
struct Prepared<'b> {
    type_name: &'b str,
    operations: Vec<&'b str>,
}

/// Behavioral checks over one candidate runtime
#[derive(Clone, Copy)]
pub struct BehavioralVerifier<'a> {
    contract: &'a PatternContract,
    binding: &'a RoleBinding,
    model: &'a CandidateModel,
    runtime: &'a dyn CandidateRuntime,
}

impl<'a> BehavioralVerifier<'a> {
    /// Create verifier
    #[inline]
    #[must_use]
    pub fn new(
        contract: &'a PatternContract,
        binding: &'a RoleBinding,
        model: &'a CandidateModel,
        runtime: &'a dyn CandidateRuntime,
    ) -> Self {
        Self {
            contract,
            binding,
            model,
            runtime,
        }
    }

    /// Run every behavioral clause in contract order, for every concrete pair
    #[must_use]
    pub fn run(&self) -> Vec<CheckResult> {
        self.contract
            .behavioral_clauses_for(self.binding.variant_count())
            .into_iter()
            .filter_map(|id| self.check(id))
            .collect()
    }

    /// Run one clause; `None` for structural clauses
    #[must_use]
    pub fn check(&self, id: CheckId) -> Option<CheckResult> {
        let result = match id {
            CheckId::OperationNonEmpty { role, variant } => self.operation_non_empty(role, variant),
            CheckId::FactoryReturnsProduct { role, variant } => self.factory_returns_product(role, variant),
            CheckId::OrchestrationEmbedsProduct { role, variant } => self.orchestration(role, variant),
            _ => return None,
        };
        tracing::debug!(
            check = %result.id,
            status = %result.status,
            runtime = self.runtime.name(),
            "behavioral check"
        );
        Some(result)
    }

    /// The product operation of `role` must return non-empty text
    #[must_use]
    pub fn check_operation_non_empty(&self, role: Role) -> CheckResult {
        self.operation_non_empty(role, 0)
    }

    /// The factory operation of `role` must return a present object
    #[must_use]
    pub fn check_factory_returns_valid_product(&self, role: Role) -> CheckResult {
        self.factory_returns_product(role, 0)
    }

    /// The orchestration output of `role` must contain its product's output
    #[must_use]
    pub fn check_orchestration(&self, role: Role) -> CheckResult {
        self.orchestration(role, 0)
    }

    fn operation_non_empty(&self, role: Role, variant: usize) -> CheckResult {
        let id = CheckId::OperationNonEmpty { role, variant };
        self.scoped(id, role, &[OperationSlot::ProductOperation], |scope, target| {
            let operation = target.operations[0];
            let subject = match self.construct(id, scope, target.type_name) {
                Ok(key) => key,
                Err(result) => return result,
            };

            match scope.invoke(subject, operation) {
                Err(e) => runtime_failure(id, target.type_name, operation, &e),
                Ok(Outcome::Text(text)) if text.is_empty() => CheckResult::fail(
                    id,
                    format!(
                        "'{}::{operation}' returned empty text, expected non-empty text",
                        target.type_name
                    ),
                ),
                Ok(Outcome::Text(text)) => CheckResult::pass(
                    id,
                    format!("'{}::{operation}' returned \"{text}\"", target.type_name),
                ),
                Ok(other) => CheckResult::fail(
                    id,
                    format!(
                        "'{}::{operation}' returned {}, expected non-empty text",
                        target.type_name,
                        other.describe()
                    ),
                ),
            }
        })
    }

    fn factory_returns_product(&self, role: Role, variant: usize) -> CheckResult {
        let id = CheckId::FactoryReturnsProduct { role, variant };
        self.scoped(id, role, &[OperationSlot::FactoryMethod], |scope, target| {
            let factory = target.operations[0];
            let creator = match self.construct(id, scope, target.type_name) {
                Ok(key) => key,
                Err(result) => return result,
            };

            match scope.invoke(creator, factory) {
                Err(e) => runtime_failure(id, target.type_name, factory, &e),
                Ok(Outcome::Object(product)) => CheckResult::pass(
                    id,
                    format!(
                        "'{}::{factory}' returned a product ({})",
                        target.type_name,
                        scope.type_name(product).unwrap_or("unknown type")
                    ),
                ),
                Ok(other) => CheckResult::fail(
                    id,
                    format!(
                        "'{}::{factory}' returned {}, expected a product object",
                        target.type_name,
                        other.describe()
                    ),
                ),
            }
        })
    }

    fn orchestration(&self, role: Role, variant: usize) -> CheckResult {
        let id = CheckId::OrchestrationEmbedsProduct { role, variant };
        let slots = [
            OperationSlot::FactoryMethod,
            OperationSlot::ProductOperation,
            OperationSlot::Orchestration,
        ];
        self.scoped(id, role, &slots, |scope, target| {
            let (factory, product_operation, orchestration) =
                (target.operations[0], target.operations[1], target.operations[2]);
            let creator = match self.construct(id, scope, target.type_name) {
                Ok(key) => key,
                Err(result) => return result,
            };

            let product = match scope.invoke(creator, factory) {
                Err(e) => return runtime_failure(id, target.type_name, factory, &e),
                Ok(Outcome::Object(product)) => product,
                Ok(other) => {
                    return CheckResult::inconclusive(
                        id,
                        InconclusiveCause::AbsentProduct,
                        format!(
                            "'{}::{factory}' returned {}; no product payload to look for",
                            target.type_name,
                            other.describe()
                        ),
                    )
                }
            };

            let payload = match scope.invoke(product, product_operation) {
                Err(e) => {
                    let product_name = scope.type_name(product).unwrap_or("product").to_string();
                    return runtime_failure(id, &product_name, product_operation, &e);
                }
                Ok(Outcome::Text(text)) if !text.is_empty() => text,
                Ok(other) => {
                    return CheckResult::inconclusive(
                        id,
                        InconclusiveCause::EmptyPayload,
                        format!(
                            "product '{product_operation}' returned {}; containment is undecidable",
                            other.describe()
                        ),
                    )
                }
            };

            match scope.invoke(creator, orchestration) {
                Err(e) => runtime_failure(id, target.type_name, orchestration, &e),
                Ok(Outcome::Text(output)) if output.contains(&payload) => CheckResult::pass(
                    id,
                    format!(
                        "'{}::{orchestration}' output \"{output}\" contains product payload \"{payload}\"",
                        target.type_name
                    ),
                ),
                Ok(Outcome::Text(output)) => CheckResult::fail(
                    id,
                    format!(
                        "expected '{}::{orchestration}' output to contain \"{payload}\", got \"{output}\"",
                        target.type_name
                    ),
                ),
                Ok(other) => CheckResult::fail(
                    id,
                    format!(
                        "'{}::{orchestration}' returned {}, expected text containing \"{payload}\"",
                        target.type_name,
                        other.describe()
                    ),
                ),
            }
        })
    }

    /// Resolve prerequisites, run `body` in a fresh scope, release the scope
    fn scoped<F>(&self, id: CheckId, role: Role, slots: &[OperationSlot], body: F) -> CheckResult
    where
        F: FnOnce(&mut Scope, &Prepared<'a>) -> CheckResult,
    {
        let target = match self.prepare(id, role, slots) {
            Ok(target) => target,
            Err(result) => return result,
        };

        let mut scope = Scope::new();
        let outcome = catch_unwind(AssertUnwindSafe(|| body(&mut scope, &target)));
        let released = scope.release_all();
        tracing::trace!(check = %id, released, "released check scope");

        outcome.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::warn!(check = %id, panic = %message, "check aborted by panic");
            CheckResult::inconclusive(
                id,
                InconclusiveCause::Runtime,
                format!("check aborted by panic: {message}"),
            )
        })
    }

    fn prepare(
        &self,
        id: CheckId,
        role: Role,
        slots: &[OperationSlot],
    ) -> Result<Prepared<'a>, CheckResult> {
        let Some(type_name) = self.binding.role_in(role, id.variant()) else {
            return Err(CheckResult::inconclusive(
                id,
                InconclusiveCause::UnboundRole,
                format!("role {role} is not bound"),
            ));
        };
        let Some(abstractness) = self.model.abstractness(type_name) else {
            return Err(CheckResult::inconclusive(
                id,
                InconclusiveCause::MissingType,
                format!("type '{type_name}' bound to {role} was not found in the candidate"),
            ));
        };
        if abstractness.is_abstract() {
            return Err(CheckResult::inconclusive(
                id,
                InconclusiveCause::NotInstantiable,
                format!("'{type_name}' bound to {role} is abstract and cannot be instantiated"),
            ));
        }

        let mut operations = Vec::with_capacity(slots.len());
        for &slot in slots {
            match self.binding.operation(slot) {
                Some(name) => operations.push(name),
                None => {
                    return Err(CheckResult::inconclusive(
                        id,
                        InconclusiveCause::UnboundRole,
                        format!("operation slot {slot} is not bound"),
                    ))
                }
            }
        }

        Ok(Prepared {
            type_name,
            operations,
        })
    }

    fn construct(&self, id: CheckId, scope: &mut Scope, type_name: &str) -> Result<ObjectKey, CheckResult> {
        scope.instantiate(self.runtime, type_name).map_err(|e| {
            tracing::warn!(check = %id, type_name, error = %e, "candidate construction failed");
            CheckResult::inconclusive(
                id,
                InconclusiveCause::Construction,
                format!("could not construct '{type_name}': {e}"),
            )
        })
    }
}

fn runtime_failure(id: CheckId, type_name: &str, operation: &str, error: &InvocationError) -> CheckResult {
    tracing::warn!(check = %id, type_name, operation, error = %error, "candidate invocation failed");
    CheckResult::inconclusive(
        id,
        InconclusiveCause::Runtime,
        format!("invoking '{type_name}::{operation}' failed: {error}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmc_candidate::{CandidateObject, NativeRuntime, TypeDescriptor, Value};
    use fmc_contract::{CheckStatus, ReturnKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct Gadget;

    impl CandidateObject for Gadget {
        fn type_name(&self) -> &str {
            "Gadget"
        }

        fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
            match operation {
                "label" => Ok(Value::text("")),
                other => Err(InvocationError::UnknownOperation {
                    type_name: "Gadget".to_string(),
                    operation: other.to_string(),
                }),
            }
        }
    }

    fn binding() -> RoleBinding {
        RoleBinding::new()
            .with_role(Role::Product, "Device")
            .with_role(Role::ConcreteProduct, "Gadget")
            .with_operation(OperationSlot::ProductOperation, "label")
    }

    fn model() -> CandidateModel {
        CandidateModel::new()
            .with_type(TypeDescriptor::new("Device").with_pure("label", ReturnKind::Text))
            .with_type(
                TypeDescriptor::new("Gadget")
                    .extends("Device")
                    .with_method("label", ReturnKind::Text),
            )
    }

    #[test]
    fn empty_text_fails_operation_check() {
        let runtime = NativeRuntime::new().register("Gadget", || Gadget);
        let binding = binding();
        let model = model();
        let verifier = BehavioralVerifier::new(PatternContract::describe(), &binding, &model, &runtime);

        let result = verifier.check_operation_non_empty(Role::ConcreteProduct);
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("empty text"));
    }

    #[test]
    fn abstract_binding_is_not_instantiable() {
        let runtime = NativeRuntime::new();
        let binding = binding().with_role(Role::ConcreteProduct, "Device");
        let model = model();
        let verifier = BehavioralVerifier::new(PatternContract::describe(), &binding, &model, &runtime);

        let result = verifier.check_operation_non_empty(Role::ConcreteProduct);
        assert_eq!(result.cause, Some(InconclusiveCause::NotInstantiable));
    }

    #[test]
    fn unregistered_type_is_construction_failure() {
        let runtime = NativeRuntime::new();
        let binding = binding();
        let model = model();
        let verifier = BehavioralVerifier::new(PatternContract::describe(), &binding, &model, &runtime);

        let result = verifier.check_operation_non_empty(Role::ConcreteProduct);
        assert_eq!(result.cause, Some(InconclusiveCause::Construction));
    }

    #[test]
    fn unbound_creator_slots_are_inconclusive() {
        let runtime = NativeRuntime::new();
        let binding = binding();
        let model = model();
        let verifier = BehavioralVerifier::new(PatternContract::describe(), &binding, &model, &runtime);

        let results = verifier.run();
        assert_eq!(results.len(), 3);
        assert!(results[1..]
            .iter()
            .all(|r| r.cause == Some(InconclusiveCause::UnboundRole)));
    }

    /// Product whose type name lookup panics, counting live instances
    struct Anonymous {
        live: Arc<AtomicUsize>,
    }

    impl Anonymous {
        fn new(live: &Arc<AtomicUsize>) -> Self {
            live.fetch_add(1, Ordering::SeqCst);
            Self {
                live: Arc::clone(live),
            }
        }
    }

    impl Drop for Anonymous {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl CandidateObject for Anonymous {
        fn type_name(&self) -> &str {
            panic!("type_name blew up")
        }

        fn invoke(&mut self, _operation: &str) -> Result<Value, InvocationError> {
            Ok(Value::text("anonymous"))
        }
    }

    struct AnonymousMaker {
        live: Arc<AtomicUsize>,
    }

    impl CandidateObject for AnonymousMaker {
        fn type_name(&self) -> &str {
            "AnonymousMaker"
        }

        fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
            match operation {
                "make" => Ok(Value::object(Anonymous::new(&self.live))),
                "render" => panic!("render blew up"),
                other => Err(InvocationError::UnknownOperation {
                    type_name: "AnonymousMaker".to_string(),
                    operation: other.to_string(),
                }),
            }
        }
    }

    fn anonymous_setup(live: &Arc<AtomicUsize>) -> (NativeRuntime, RoleBinding, CandidateModel) {
        let maker_live = Arc::clone(live);
        let runtime = NativeRuntime::new().register("AnonymousMaker", move || AnonymousMaker {
            live: Arc::clone(&maker_live),
        });
        let binding = binding()
            .with_role(Role::Creator, "Maker")
            .with_role(Role::ConcreteCreator, "AnonymousMaker")
            .with_operation(OperationSlot::FactoryMethod, "make")
            .with_operation(OperationSlot::Orchestration, "render");
        let model = model()
            .with_type(
                TypeDescriptor::new("Maker")
                    .with_pure("make", ReturnKind::Object)
                    .with_method("render", ReturnKind::Text),
            )
            .with_type(
                TypeDescriptor::new("AnonymousMaker")
                    .extends("Maker")
                    .with_method("make", ReturnKind::Object),
            );
        (runtime, binding, model)
    }

    #[test]
    fn product_with_panicking_type_name_is_still_released() {
        let live = Arc::new(AtomicUsize::new(0));
        let (runtime, binding, model) = anonymous_setup(&live);
        let verifier = BehavioralVerifier::new(PatternContract::describe(), &binding, &model, &runtime);

        let result = verifier.check_factory_returns_valid_product(Role::ConcreteCreator);
        assert!(result.is_pass(), "{result}");
        assert!(result.message.contains("unknown type"));
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_check_releases_its_scope() {
        let live = Arc::new(AtomicUsize::new(0));
        let (runtime, binding, model) = anonymous_setup(&live);
        let verifier = BehavioralVerifier::new(PatternContract::describe(), &binding, &model, &runtime);

        let result = verifier.scoped(
            CheckId::FactoryReturnsProduct {
                role: Role::ConcreteCreator,
                variant: 0,
            },
            Role::ConcreteCreator,
            &[OperationSlot::FactoryMethod],
            |scope, target| {
                let creator = scope.instantiate(&runtime, target.type_name).ok().unwrap();
                let _ = scope.invoke(creator, target.operations[0]);
                panic!("check body failed");
            },
        );
        assert_eq!(result.cause, Some(InconclusiveCause::Runtime));
        assert!(result.message.contains("check body failed"));
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn later_pairs_use_their_own_types() {
        let runtime = NativeRuntime::new().register("Gadget", || Gadget);
        let binding = binding().with_variant("Widget", "WidgetMaker");
        let model = model();
        let verifier = BehavioralVerifier::new(PatternContract::describe(), &binding, &model, &runtime);

        let results = verifier.run();
        assert_eq!(results.len(), 6);
        assert_eq!(results[0].status, CheckStatus::Fail);
        assert_eq!(results[3].id.key(), "behavioral.operation_non_empty.concrete_product[1]");
        assert_eq!(results[3].cause, Some(InconclusiveCause::MissingType));
        assert!(results[3].message.contains("'Widget'"));
    }
}
