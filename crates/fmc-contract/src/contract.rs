//! The Factory Method pattern contract
//!
//! Pure data describing what any valid Factory Method implementation must
//! exhibit, independent of naming style. Built once per process and shared
//! read-only by both verifiers.

use crate::check::CheckId;
use crate::role::{OperationSlot, ReturnKind, Role};
use once_cell::sync::Lazy;
use serde::Serialize;

static FACTORY_METHOD: Lazy<PatternContract> = Lazy::new(PatternContract::factory_method);

/// Required is-a relation between two roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InheritanceRequirement {
    /// Deriving role
    pub child: Role,
    /// Base role
    pub parent: Role,
}

/// Required shape of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationSignature {
    /// Operation slot
    pub slot: OperationSlot,
    /// Role that must expose the operation
    pub role: Role,
    /// Number of parameters
    pub arity: usize,
    /// Expected result shape
    pub returns: ReturnKind,
}

/// Observable behaviour the contract demands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum BehavioralExpectation {
    /// The product operation returns non-empty text
    OperationNonEmpty {
        /// Concrete product role
        role: Role,
    },
    /// The factory operation returns a present product
    FactoryReturnsProduct {
        /// Concrete creator role
        role: Role,
    },
    /// The orchestration output contains the produced product's output
    OrchestrationEmbedsProduct {
        /// Concrete creator role
        role: Role,
    },
}

impl BehavioralExpectation {
    /// Check identity for this expectation on the first concrete pair
    #[inline]
    #[must_use]
    pub fn check_id(self) -> CheckId {
        match self {
            BehavioralExpectation::OperationNonEmpty { role } => {
                CheckId::OperationNonEmpty { role, variant: 0 }
            }
            BehavioralExpectation::FactoryReturnsProduct { role } => {
                CheckId::FactoryReturnsProduct { role, variant: 0 }
            }
            BehavioralExpectation::OrchestrationEmbedsProduct { role } => {
                CheckId::OrchestrationEmbedsProduct { role, variant: 0 }
            }
        }
    }
}

/// Immutable rule set for one pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternContract {
    /// Pattern name
    pub name: &'static str,
    /// Roles that must not be directly constructible
    pub required_abstract_roles: Vec<Role>,
    /// Required is-a relations
    pub required_inheritance: Vec<InheritanceRequirement>,
    /// Required operation shapes
    pub required_operations: Vec<OperationSignature>,
    /// Required runtime behaviour
    pub behavioral_expectations: Vec<BehavioralExpectation>,
}

impl PatternContract {
    /// The process-wide Factory Method contract
    #[inline]
    #[must_use]
    pub fn describe() -> &'static PatternContract {
        &FACTORY_METHOD
    }

    fn factory_method() -> Self {
        Self {
            name: "factory-method",
            required_abstract_roles: vec![Role::Product, Role::Creator],
            required_inheritance: vec![
                InheritanceRequirement {
                    child: Role::ConcreteProduct,
                    parent: Role::Product,
                },
                InheritanceRequirement {
                    child: Role::ConcreteCreator,
                    parent: Role::Creator,
                },
            ],
            required_operations: vec![
                OperationSignature {
                    slot: OperationSlot::ProductOperation,
                    role: Role::Product,
                    arity: 0,
                    returns: ReturnKind::Text,
                },
                OperationSignature {
                    slot: OperationSlot::FactoryMethod,
                    role: Role::Creator,
                    arity: 0,
                    returns: ReturnKind::Object,
                },
                OperationSignature {
                    slot: OperationSlot::Orchestration,
                    role: Role::Creator,
                    arity: 0,
                    returns: ReturnKind::Text,
                },
            ],
            behavioral_expectations: vec![
                BehavioralExpectation::OperationNonEmpty {
                    role: Role::ConcreteProduct,
                },
                BehavioralExpectation::FactoryReturnsProduct {
                    role: Role::ConcreteCreator,
                },
                BehavioralExpectation::OrchestrationEmbedsProduct {
                    role: Role::ConcreteCreator,
                },
            ],
        }
    }

    /// Signature required for a slot
    #[must_use]
    pub fn signature(&self, slot: OperationSlot) -> Option<&OperationSignature> {
        self.required_operations.iter().find(|s| s.slot == slot)
    }

    /// Structural clauses in declaration order
    #[must_use]
    pub fn structural_clauses(&self) -> Vec<CheckId> {
        self.structural_clauses_for(1)
    }

    /// Structural clauses for a binding with `variants` concrete pairs
    ///
    /// Abstract-role clauses come first, then the inheritance clauses of each
    /// pair in turn, then the operation signatures.
    #[must_use]
    pub fn structural_clauses_for(&self, variants: usize) -> Vec<CheckId> {
        let abstracts = self
            .required_abstract_roles
            .iter()
            .map(|&role| CheckId::Abstract { role });
        let inherits = (0..variants.max(1)).flat_map(|variant| {
            self.required_inheritance.iter().map(move |r| CheckId::Inherits {
                child: r.child,
                parent: r.parent,
                variant,
            })
        });
        let signatures = self
            .required_operations
            .iter()
            .map(|s| CheckId::Signature { slot: s.slot });

        abstracts.chain(inherits).chain(signatures).collect()
    }

    /// Behavioral clauses in declaration order
    #[must_use]
    pub fn behavioral_clauses(&self) -> Vec<CheckId> {
        self.behavioral_clauses_for(1)
    }

    /// Behavioral clauses for `variants` concrete pairs, pair by pair
    #[must_use]
    pub fn behavioral_clauses_for(&self, variants: usize) -> Vec<CheckId> {
        (0..variants.max(1))
            .flat_map(|variant| {
                self.behavioral_expectations
                    .iter()
                    .map(move |e| e.check_id().for_variant(variant))
            })
            .collect()
    }

    /// Every clause: structural first, then behavioral
    #[must_use]
    pub fn clauses(&self) -> Vec<CheckId> {
        self.clauses_for(1)
    }

    /// Every clause for a binding with `variants` concrete pairs
    ///
    /// A count of 0 is treated as 1.
    #[must_use]
    pub fn clauses_for(&self, variants: usize) -> Vec<CheckId> {
        let mut all = self.structural_clauses_for(variants);
        all.extend(self.behavioral_clauses_for(variants));
        all
    }

    /// Ordering key of a clause within [`clauses`](Self::clauses)
    #[must_use]
    pub fn position(&self, id: &CheckId) -> Option<usize> {
        self.clauses().iter().position(|c| c == id)
    }

    /// Ordering key of a clause within [`clauses_for`](Self::clauses_for)
    #[must_use]
    pub fn position_for(&self, id: &CheckId, variants: usize) -> Option<usize> {
        self.clauses_for(variants).iter().position(|c| c == id)
    }
}
