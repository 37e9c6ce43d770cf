//! Roles, operation slots and return kinds
//!
//! A role is a position in the pattern that some candidate type must fill.
//! An operation slot is a method the contract expects on one of those roles.
//! Neither carries a candidate identifier; the [`RoleBinding`](crate::RoleBinding)
//! supplies those.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in the Factory Method pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Abstract product interface
    Product,
    /// Abstract creator declaring the factory operation
    Creator,
    /// A concrete product implementation
    ConcreteProduct,
    /// A concrete creator overriding the factory operation
    ConcreteCreator,
}

impl Role {
    /// All roles in declaration order
    pub const ALL: [Role; 4] = [
        Role::Product,
        Role::Creator,
        Role::ConcreteProduct,
        Role::ConcreteCreator,
    ];

    /// Stable key used in bindings and check identities
    #[inline]
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Role::Product => "product",
            Role::Creator => "creator",
            Role::ConcreteProduct => "concrete_product",
            Role::ConcreteCreator => "concrete_creator",
        }
    }

    /// Whether instances of this role are expected to be constructible
    #[inline]
    #[must_use]
    pub fn is_concrete(self) -> bool {
        matches!(self, Role::ConcreteProduct | Role::ConcreteCreator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Product => "Product",
            Role::Creator => "Creator",
            Role::ConcreteProduct => "ConcreteProduct",
            Role::ConcreteCreator => "ConcreteCreator",
        };
        f.write_str(name)
    }
}

/// Method the contract expects on a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationSlot {
    /// The product's own operation (e.g. `Operation`, `operation`)
    ProductOperation,
    /// The creator's factory operation (e.g. `FactoryMethod`, `create`, `make`)
    FactoryMethod,
    /// The creator's higher-level operation that uses the product
    /// (e.g. `DoSomething`, `someOperation`)
    Orchestration,
}

impl OperationSlot {
    /// All slots in declaration order
    pub const ALL: [OperationSlot; 3] = [
        OperationSlot::ProductOperation,
        OperationSlot::FactoryMethod,
        OperationSlot::Orchestration,
    ];

    /// Stable key used in bindings and check identities
    #[inline]
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            OperationSlot::ProductOperation => "product_operation",
            OperationSlot::FactoryMethod => "factory_method",
            OperationSlot::Orchestration => "orchestration",
        }
    }
}

impl fmt::Display for OperationSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Shape of an operation's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// Textual value (`std::string`, `String`, `&str`)
    Text,
    /// Reference to another object (raw or smart pointer, boxed trait object)
    Object,
    /// No value
    Void,
    /// Could not be determined statically
    Unknown,
}

impl ReturnKind {
    /// Check whether a declared kind satisfies an expected kind
    ///
    /// `Unknown` on either side is tolerated: the structural check only
    /// rejects kinds it can prove wrong.
    #[inline]
    #[must_use]
    pub fn satisfies(self, expected: ReturnKind) -> bool {
        self == expected || self == ReturnKind::Unknown || expected == ReturnKind::Unknown
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnKind::Text => "text",
            ReturnKind::Object => "object",
            ReturnKind::Void => "void",
            ReturnKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
