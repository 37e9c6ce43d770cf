//! Structural verifier
//!
//! Answers the contract's shape questions from a [`CandidateModel`] alone:
//! no candidate code runs here. Role names reach the model only through the
//! [`RoleBinding`], so the same verifier accepts `Product`/`FactoryMethod`
//! and `Shape`/`create` alike.

use fmc_candidate::{Abstractness, CandidateModel, TypeDescriptor};
use fmc_contract::{
    CheckId, CheckResult, InconclusiveCause, OperationSlot, PatternContract, Role, RoleBinding,
};

/// Shape checks over one candidate model
#[derive(Debug, Clone, Copy)]
pub struct StructuralVerifier<'a> {
    contract: &'a PatternContract,
    binding: &'a RoleBinding,
    model: &'a CandidateModel,
}

impl<'a> StructuralVerifier<'a> {
    /// Create verifier
    #[inline]
    #[must_use]
    pub fn new(
        contract: &'a PatternContract,
        binding: &'a RoleBinding,
        model: &'a CandidateModel,
    ) -> Self {
        Self {
            contract,
            binding,
            model,
        }
    }

    /// Run every structural clause in contract order, for every concrete pair
    #[must_use]
    pub fn run(&self) -> Vec<CheckResult> {
        self.contract
            .structural_clauses_for(self.binding.variant_count())
            .into_iter()
            .filter_map(|id| self.check(id))
            .collect()
    }

    /// Run one clause; `None` for behavioral clauses
    #[must_use]
    pub fn check(&self, id: CheckId) -> Option<CheckResult> {
        let result = match id {
            CheckId::Abstract { role } => self.check_abstract(role),
            CheckId::Inherits {
                child,
                parent,
                variant,
            } => self.check_variant_inheritance(variant, child, parent),
            CheckId::Signature { slot } => self.check_signature(slot),
            _ => return None,
        };
        tracing::debug!(check = %result.id, status = %result.status, "structural check");
        Some(result)
    }

    /// The type bound to `role` must not be directly constructible
    #[must_use]
    pub fn check_abstract(&self, role: Role) -> CheckResult {
        let id = CheckId::Abstract { role };
        let ty = match self.bound_type(id, role) {
            Ok(ty) => ty,
            Err(result) => return result,
        };

        match self.model.abstractness(&ty.name) {
            Some(Abstractness::PureOperations(pending)) => CheckResult::pass(
                id,
                format!(
                    "'{}' is abstract: pure operation(s) {} have no final definition",
                    ty.name,
                    pending.join(", ")
                ),
            ),
            Some(Abstractness::ExplicitMarker) => CheckResult::pass(
                id,
                format!("'{}' is abstract: construction is restricted", ty.name),
            ),
            Some(Abstractness::Concrete) | None => CheckResult::fail(
                id,
                format!(
                    "expected {role} '{}' to be abstract, but it is directly instantiable",
                    ty.name
                ),
            ),
        }
    }

    /// The type bound to `child` must be a distinct descendant of `parent`
    #[must_use]
    pub fn check_inheritance(&self, child: Role, parent: Role) -> CheckResult {
        self.check_variant_inheritance(0, child, parent)
    }

    /// [`check_inheritance`](Self::check_inheritance) for concrete pair `variant`
    #[must_use]
    pub fn check_variant_inheritance(&self, variant: usize, child: Role, parent: Role) -> CheckResult {
        let id = CheckId::Inherits {
            child,
            parent,
            variant,
        };
        let child_ty = match self.bound_type(id, child) {
            Ok(ty) => ty,
            Err(result) => return result,
        };
        let parent_ty = match self.bound_type(id, parent) {
            Ok(ty) => ty,
            Err(result) => return result,
        };

        if child_ty.name == parent_ty.name {
            return CheckResult::fail(
                id,
                format!(
                    "{child} and {parent} are both bound to '{}'; they must be distinct types",
                    child_ty.name
                ),
            );
        }

        if self.model.inherits_from(&child_ty.name, &parent_ty.name) {
            CheckResult::pass(
                id,
                format!("'{}' derives from '{}'", child_ty.name, parent_ty.name),
            )
        } else {
            CheckResult::fail(
                id,
                format!(
                    "expected '{}' ({child}) to derive from '{}' ({parent})",
                    child_ty.name, parent_ty.name
                ),
            )
        }
    }

    /// The bound operation must be visible on its role with the contract's shape
    #[must_use]
    pub fn check_signature(&self, slot: OperationSlot) -> CheckResult {
        let id = CheckId::Signature { slot };
        let Some(signature) = self.contract.signature(slot) else {
            return CheckResult::inconclusive(
                id,
                InconclusiveCause::NotExecuted,
                format!("contract declares no signature for {slot}"),
            );
        };
        let ty = match self.bound_type(id, signature.role) {
            Ok(ty) => ty,
            Err(result) => return result,
        };
        let Some(operation_name) = self.binding.operation(slot) else {
            return CheckResult::inconclusive(
                id,
                InconclusiveCause::UnboundRole,
                format!("operation slot {slot} is not bound"),
            );
        };

        let Some((owner, operation)) = self.model.find_operation(&ty.name, operation_name) else {
            return CheckResult::fail(
                id,
                format!(
                    "'{}' ({}) has no operation '{operation_name}'",
                    ty.name, signature.role
                ),
            );
        };

        if operation.arity != signature.arity {
            return CheckResult::fail(
                id,
                format!(
                    "'{}::{operation_name}' takes {} parameter(s), expected {}",
                    owner.name, operation.arity, signature.arity
                ),
            );
        }
        if !operation.returns.satisfies(signature.returns) {
            return CheckResult::fail(
                id,
                format!(
                    "'{}::{operation_name}' returns {}, expected {}",
                    owner.name, operation.returns, signature.returns
                ),
            );
        }

        CheckResult::pass(
            id,
            format!(
                "'{}::{operation_name}' has arity {} and returns {}",
                owner.name, operation.arity, operation.returns
            ),
        )
    }

    fn bound_type(&self, id: CheckId, role: Role) -> Result<&'a TypeDescriptor, CheckResult> {
        let Some(name) = self.binding.role_in(role, id.variant()) else {
            return Err(CheckResult::inconclusive(
                id,
                InconclusiveCause::UnboundRole,
                format!("role {role} is not bound"),
            ));
        };
        self.model.resolve(name).ok_or_else(|| {
            CheckResult::inconclusive(
                id,
                InconclusiveCause::MissingType,
                format!("type '{name}' bound to {role} was not found in the candidate"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmc_candidate::OperationDescriptor;
    use fmc_contract::{CheckStatus, ReturnKind};
    use pretty_assertions::assert_eq;

    fn binding() -> RoleBinding {
        RoleBinding::new()
            .with_role(Role::Product, "Shape")
            .with_role(Role::Creator, "ShapeMaker")
            .with_role(Role::ConcreteProduct, "Circle")
            .with_role(Role::ConcreteCreator, "CircleMaker")
            .with_operation(OperationSlot::ProductOperation, "draw")
            .with_operation(OperationSlot::FactoryMethod, "make")
            .with_operation(OperationSlot::Orchestration, "render")
    }

    fn model() -> CandidateModel {
        CandidateModel::new()
            .with_type(TypeDescriptor::new("Shape").with_pure("draw", ReturnKind::Text))
            .with_type(
                TypeDescriptor::new("Circle")
                    .extends("Shape")
                    .with_method("draw", ReturnKind::Text),
            )
            .with_type(
                TypeDescriptor::new("ShapeMaker")
                    .with_pure("make", ReturnKind::Object)
                    .with_method("render", ReturnKind::Text),
            )
            .with_type(
                TypeDescriptor::new("CircleMaker")
                    .extends("ShapeMaker")
                    .with_method("make", ReturnKind::Object),
            )
    }

    #[test]
    fn renamed_roles_pass_every_structural_clause() {
        let contract = PatternContract::describe();
        let binding = binding();
        let model = model();
        let results = StructuralVerifier::new(contract, &binding, &model).run();

        assert_eq!(results.len(), 7);
        assert!(results.iter().all(CheckResult::is_pass), "{results:#?}");
    }

    #[test]
    fn concrete_base_fails_abstract_check() {
        let contract = PatternContract::describe();
        let binding = binding();
        let model = CandidateModel::new()
            .with_type(TypeDescriptor::new("Shape").with_method("draw", ReturnKind::Text));
        let result = StructuralVerifier::new(contract, &binding, &model).check_abstract(Role::Product);

        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("directly instantiable"));
    }

    #[test]
    fn same_type_for_both_roles_fails_inheritance() {
        let contract = PatternContract::describe();
        let binding = binding().with_role(Role::ConcreteProduct, "Shape");
        let model = model();
        let result = StructuralVerifier::new(contract, &binding, &model)
            .check_inheritance(Role::ConcreteProduct, Role::Product);

        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("distinct"));
    }

    #[test]
    fn unbound_and_missing_roles_are_inconclusive() {
        let contract = PatternContract::describe();
        let model = model();

        let unbound = RoleBinding::new();
        let result = StructuralVerifier::new(contract, &unbound, &model).check_abstract(Role::Creator);
        assert_eq!(result.cause, Some(InconclusiveCause::UnboundRole));

        let missing = binding().with_role(Role::Creator, "Factory");
        let result = StructuralVerifier::new(contract, &missing, &model).check_abstract(Role::Creator);
        assert_eq!(result.cause, Some(InconclusiveCause::MissingType));
    }

    #[test]
    fn signature_checks_arity_and_return_kind() {
        let contract = PatternContract::describe();
        let binding = binding();
        let model = model().with_type(
            TypeDescriptor::new("Polygon")
                .extends("Shape")
                .with_operation(OperationDescriptor::new("draw", 2, ReturnKind::Text)),
        );

        let wrong_arity = binding.clone().with_role(Role::Product, "Polygon");
        let result = StructuralVerifier::new(contract, &wrong_arity, &model)
            .check_signature(OperationSlot::ProductOperation);
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("2 parameter(s)"));

        let wrong_slot = binding.with_operation(OperationSlot::FactoryMethod, "render");
        let result = StructuralVerifier::new(contract, &wrong_slot, &model)
            .check_signature(OperationSlot::FactoryMethod);
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("returns text, expected object"));
    }

    #[test]
    fn unknown_return_kind_is_tolerated() {
        let contract = PatternContract::describe();
        let binding = binding();
        let model = CandidateModel::new().with_type(
            TypeDescriptor::new("ShapeMaker").with_pure("make", ReturnKind::Unknown),
        );
        let result = StructuralVerifier::new(contract, &binding, &model)
            .check_signature(OperationSlot::FactoryMethod);
        assert!(result.is_pass());
    }

    #[test]
    fn each_concrete_pair_gets_its_own_inheritance_clauses() {
        let contract = PatternContract::describe();
        let binding = binding().with_variant("Square", "SquareMaker");
        let model = model()
            .with_type(TypeDescriptor::new("Square").with_method("draw", ReturnKind::Text))
            .with_type(
                TypeDescriptor::new("SquareMaker")
                    .extends("ShapeMaker")
                    .with_method("make", ReturnKind::Object),
            );
        let results = StructuralVerifier::new(contract, &binding, &model).run();

        assert_eq!(results.len(), 9);
        let keys: Vec<String> = results.iter().map(|r| r.id.key()).collect();
        assert_eq!(keys[4], "structural.inherits.concrete_product.product[1]");
        assert_eq!(keys[5], "structural.inherits.concrete_creator.creator[1]");

        let problems: Vec<&CheckResult> = results.iter().filter(|r| !r.is_pass()).collect();
        assert_eq!(problems.len(), 1, "{problems:#?}");
        assert_eq!(problems[0].status, CheckStatus::Fail);
        assert!(problems[0].message.contains("'Square' (ConcreteProduct) to derive from 'Shape'"));
    }

    #[test]
    fn missing_operation_fails() {
        let contract = PatternContract::describe();
        let binding = binding().with_operation(OperationSlot::Orchestration, "paint");
        let model = model();
        let result = StructuralVerifier::new(contract, &binding, &model)
            .check_signature(OperationSlot::Orchestration);
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("no operation 'paint'"));
    }
}
