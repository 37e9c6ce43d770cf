//! Candidate type descriptors
//!
//! Instantiation-free view of a candidate's types: names, bases, operations
//! and abstractness markers. Every structural question the verifier asks
//! (is this type abstract? is it-a that one? does it expose this operation?)
//! is answered here without running candidate code.

use fmc_contract::ReturnKind;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Maximum alias hops followed before giving up
const MAX_ALIAS_HOPS: usize = 16;

/// One declared operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    /// Method name as written by the candidate
    pub name: String,
    /// Parameter count
    pub arity: usize,
    /// Result shape
    pub returns: ReturnKind,
    /// Declared without a definition that instances could use (`= 0`)
    pub is_pure: bool,
    /// Marked as overriding a base operation
    pub is_override: bool,
}

impl OperationDescriptor {
    /// Concrete operation
    #[must_use]
    pub fn new(name: impl Into<String>, arity: usize, returns: ReturnKind) -> Self {
        Self {
            name: name.into(),
            arity,
            returns,
            is_pure: false,
            is_override: false,
        }
    }

    /// Mark as pure
    #[inline]
    #[must_use]
    pub fn pure(mut self) -> Self {
        self.is_pure = true;
        self
    }

    /// Mark as overriding
    #[inline]
    #[must_use]
    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }
}

/// One candidate type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    /// Type name as written by the candidate
    pub name: String,
    /// Direct bases, as written
    pub bases: Vec<String>,
    /// Operations declared directly on this type
    pub operations: Vec<OperationDescriptor>,
    /// Construction is restricted independently of pure operations
    /// (explicit marker, no public constructor)
    pub explicit_abstract: bool,
    /// 1-based source line, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl TypeDescriptor {
    /// Create descriptor without bases or operations
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            operations: Vec::new(),
            explicit_abstract: false,
            line: None,
        }
    }

    /// Add a direct base
    #[must_use]
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Add an operation
    #[must_use]
    pub fn with_operation(mut self, operation: OperationDescriptor) -> Self {
        self.operations.push(operation);
        self
    }

    /// Add a pure, parameterless operation
    #[must_use]
    pub fn with_pure(self, name: impl Into<String>, returns: ReturnKind) -> Self {
        self.with_operation(OperationDescriptor::new(name, 0, returns).pure())
    }

    /// Add a concrete, parameterless operation
    #[must_use]
    pub fn with_method(self, name: impl Into<String>, returns: ReturnKind) -> Self {
        self.with_operation(OperationDescriptor::new(name, 0, returns))
    }

    /// Mark as not directly constructible
    #[inline]
    #[must_use]
    pub fn mark_abstract(mut self) -> Self {
        self.explicit_abstract = true;
        self
    }

    /// Set source line
    #[inline]
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Operation declared directly on this type
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|o| o.name == name)
    }
}

/// Why a type can or cannot be constructed directly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "operations", rename_all = "snake_case")]
pub enum Abstractness {
    /// Instances can be constructed
    Concrete,
    /// Pure operations remain without a final definition
    PureOperations(Vec<String>),
    /// Construction restricted by an explicit marker
    ExplicitMarker,
}

impl Abstractness {
    /// Check if direct construction is impossible
    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        !matches!(self, Abstractness::Concrete)
    }
}

/// All types discovered in one candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateModel {
    types: IndexMap<String, TypeDescriptor>,
    aliases: IndexMap<String, String>,
    diagnostics: Vec<String>,
}

impl CandidateModel {
    /// Create empty model
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert)
    #[must_use]
    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Builder-style [`insert_alias`](Self::insert_alias)
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.insert_alias(alias, target);
        self
    }

    /// Add a type; a second definition with the same name is recorded as a diagnostic
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        if self.types.contains_key(&descriptor.name) {
            self.diagnostics
                .push(format!("duplicate definition of `{}` ignored", descriptor.name));
            return;
        }
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Record `alias` as another name for `target`
    pub fn insert_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Record a non-fatal extraction problem
    pub fn push_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }

    /// Extraction diagnostics
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// All types in discovery order
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Number of types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if no types were discovered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve a name through aliases and namespace qualification
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&TypeDescriptor> {
        let mut current = name.trim();
        for _ in 0..MAX_ALIAS_HOPS {
            if let Some(found) = self.types.get(current) {
                return Some(found);
            }
            if let Some(target) = self.aliases.get(current) {
                current = target.as_str();
                continue;
            }
            let unqualified = unqualified(current);
            if unqualified != current {
                current = unqualified;
                continue;
            }
            return None;
        }
        None
    }

    /// Strict ancestors of a type in breadth-first order
    #[must_use]
    pub fn ancestors(&self, name: &str) -> Vec<&TypeDescriptor> {
        let Some(start) = self.resolve(name) else {
            return Vec::new();
        };

        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(start.name.as_str());
        let mut queue: VecDeque<&TypeDescriptor> = VecDeque::from([start]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            for base in &current.bases {
                if let Some(parent) = self.resolve(base) {
                    if seen.insert(parent.name.as_str()) {
                        out.push(parent);
                        queue.push_back(parent);
                    }
                }
            }
        }
        out
    }

    /// Reflexive, transitive is-a
    #[must_use]
    pub fn is_a(&self, child: &str, parent: &str) -> bool {
        match (self.resolve(child), self.resolve(parent)) {
            (Some(c), Some(p)) => {
                c.name == p.name || self.ancestors(&c.name).iter().any(|a| a.name == p.name)
            }
            _ => false,
        }
    }

    /// Is-a between two distinct types
    #[must_use]
    pub fn inherits_from(&self, child: &str, parent: &str) -> bool {
        match (self.resolve(child), self.resolve(parent)) {
            (Some(c), Some(p)) if c.name != p.name => self.is_a(&c.name, &p.name),
            _ => false,
        }
    }

    /// Find an operation on a type or its ancestors, nearest first
    #[must_use]
    pub fn find_operation(
        &self,
        type_name: &str,
        operation: &str,
    ) -> Option<(&TypeDescriptor, &OperationDescriptor)> {
        let start = self.resolve(type_name)?;
        std::iter::once(start)
            .chain(self.ancestors(type_name))
            .find_map(|ty| ty.operation(operation).map(|op| (ty, op)))
    }

    /// Abstractness of a type, `None` if unknown
    #[must_use]
    pub fn abstractness(&self, name: &str) -> Option<Abstractness> {
        let ty = self.resolve(name)?;
        let pending = self.unresolved_pure(&ty.name, &mut Vec::new());

        Some(if !pending.is_empty() {
            Abstractness::PureOperations(pending.into_iter().collect())
        } else if ty.explicit_abstract {
            Abstractness::ExplicitMarker
        } else {
            Abstractness::Concrete
        })
    }

    /// Pure operations without a final definition, by name
    fn unresolved_pure(&self, name: &str, visiting: &mut Vec<String>) -> BTreeSet<String> {
        let Some(ty) = self.resolve(name) else {
            return BTreeSet::new();
        };
        if visiting.contains(&ty.name) {
            return BTreeSet::new();
        }

        visiting.push(ty.name.clone());
        let mut pending = BTreeSet::new();
        for base in &ty.bases {
            pending.extend(self.unresolved_pure(base, visiting));
        }
        visiting.pop();

        for op in &ty.operations {
            if op.is_pure {
                pending.insert(op.name.clone());
            } else {
                pending.remove(&op.name);
            }
        }
        pending
    }
}

/// Last `::` segment of a name, template arguments stripped
#[must_use]
pub fn unqualified(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name).trim();
    base.rsplit("::").next().unwrap_or(base).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn factory_model() -> CandidateModel {
        CandidateModel::new()
            .with_type(TypeDescriptor::new("Product").with_pure("Operation", ReturnKind::Text))
            .with_type(
                TypeDescriptor::new("ConcreteProductA")
                    .extends("Product")
                    .with_method("Operation", ReturnKind::Text),
            )
            .with_type(
                TypeDescriptor::new("Creator")
                    .with_pure("FactoryMethod", ReturnKind::Object)
                    .with_method("DoSomething", ReturnKind::Text),
            )
            .with_type(
                TypeDescriptor::new("ConcreteCreatorA")
                    .extends("Creator")
                    .with_method("FactoryMethod", ReturnKind::Object),
            )
    }

    #[test]
    fn pure_operation_makes_type_abstract() {
        let model = factory_model();
        assert_eq!(
            model.abstractness("Product"),
            Some(Abstractness::PureOperations(vec!["Operation".to_string()]))
        );
        assert_eq!(model.abstractness("ConcreteProductA"), Some(Abstractness::Concrete));
        assert_eq!(model.abstractness("Missing"), None);
    }

    #[test]
    fn inherited_pure_without_override_stays_abstract() {
        let model = factory_model()
            .with_type(TypeDescriptor::new("HalfCreator").extends("Creator"));
        assert!(model.abstractness("HalfCreator").unwrap().is_abstract());
    }

    #[test]
    fn explicit_marker_makes_type_abstract() {
        let model = CandidateModel::new().with_type(TypeDescriptor::new("Base").mark_abstract());
        assert_eq!(model.abstractness("Base"), Some(Abstractness::ExplicitMarker));
    }

    #[test]
    fn is_a_is_transitive_and_follows_aliases() {
        let model = factory_model()
            .with_type(TypeDescriptor::new("SpecialProduct").extends("ConcreteProductA"))
            .with_alias("ProductBase", "Product")
            .with_type(TypeDescriptor::new("AliasedProduct").extends("ProductBase"));

        assert!(model.inherits_from("SpecialProduct", "Product"));
        assert!(model.inherits_from("AliasedProduct", "Product"));
        assert!(model.is_a("Product", "Product"));
        assert!(!model.inherits_from("Product", "Product"));
        assert!(!model.inherits_from("Product", "ConcreteProductA"));
    }

    #[test]
    fn qualified_names_resolve_to_unqualified_types() {
        let model = factory_model();
        assert!(model.resolve("shop::Product").is_some());
        assert!(model.inherits_from("ConcreteProductA", "::shop::Product"));
        assert_eq!(unqualified("std::unique_ptr<Product>"), "unique_ptr");
    }

    #[test]
    fn find_operation_walks_ancestors() {
        let model = factory_model();
        let (owner, op) = model.find_operation("ConcreteCreatorA", "DoSomething").unwrap();
        assert_eq!(owner.name, "Creator");
        assert_eq!(op.returns, ReturnKind::Text);

        let (owner, _) = model.find_operation("ConcreteCreatorA", "FactoryMethod").unwrap();
        assert_eq!(owner.name, "ConcreteCreatorA");
    }

    #[test]
    fn cyclic_hierarchies_terminate() {
        let model = CandidateModel::new()
            .with_type(TypeDescriptor::new("A").extends("B").with_pure("f", ReturnKind::Text))
            .with_type(TypeDescriptor::new("B").extends("A"));
        assert!(model.is_a("A", "B"));
        assert!(model.abstractness("B").unwrap().is_abstract());
    }

    #[test]
    fn duplicate_definitions_are_diagnosed() {
        let mut model = CandidateModel::new();
        model.insert(TypeDescriptor::new("Product"));
        model.insert(TypeDescriptor::new("Product").mark_abstract());
        assert_eq!(model.len(), 1);
        assert_eq!(model.diagnostics().len(), 1);
    }

    proptest! {
        #[test]
        fn every_link_of_a_chain_is_an_ancestor(depth in 1usize..12) {
            let mut model = CandidateModel::new().with_type(TypeDescriptor::new("T0"));
            for i in 1..=depth {
                model.insert(TypeDescriptor::new(format!("T{i}")).extends(format!("T{}", i - 1)));
            }
            let leaf = format!("T{depth}");
            for i in 0..depth {
                let ancestor = format!("T{i}");
                prop_assert!(model.inherits_from(&leaf, &ancestor));
                prop_assert!(!model.inherits_from(&ancestor, &leaf));
            }
            prop_assert_eq!(model.ancestors(&leaf).len(), depth);
        }
    }
}
