//! Testing utilities for FMC workspace
//!
//! Shared candidates, bindings and C++ sources for the verifier test suites.

#![allow(missing_docs)]

use fmc_candidate::{
    Candidate, CandidateModel, CandidateObject, InvocationError, NativeRuntime, TypeDescriptor, Value,
};
use fmc_contract::{OperationSlot, ReturnKind, Role, RoleBinding};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Prefix the conforming creator puts before the product payload
pub const ORCHESTRATION_PREFIX: &str = "Creator: working with -> ";

/// Method names of one naming convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub product_operation: &'static str,
    pub factory_method: &'static str,
    pub orchestration: &'static str,
}

impl Naming {
    pub const PASCAL: Naming = Naming {
        product_operation: "Operation",
        factory_method: "FactoryMethod",
        orchestration: "DoSomething",
    };

    pub const CAMEL: Naming = Naming {
        product_operation: "operation",
        factory_method: "factoryMethod",
        orchestration: "someOperation",
    };

    pub fn binding(&self) -> RoleBinding {
        RoleBinding::new()
            .with_role(Role::Product, "Product")
            .with_role(Role::Creator, "Creator")
            .with_role(Role::ConcreteProduct, "ConcreteProductA")
            .with_role(Role::ConcreteCreator, "ConcreteCreatorA")
            .with_operation(OperationSlot::ProductOperation, self.product_operation)
            .with_operation(OperationSlot::FactoryMethod, self.factory_method)
            .with_operation(OperationSlot::Orchestration, self.orchestration)
    }
}

pub fn pascal_binding() -> RoleBinding {
    Naming::PASCAL.binding()
}

pub fn camel_binding() -> RoleBinding {
    Naming::CAMEL.binding()
}

/// Counts objects created and released by fixture candidates
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    created: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.created().saturating_sub(self.released())
    }

    fn track(&self) -> Tracked {
        self.created.fetch_add(1, Ordering::SeqCst);
        Tracked {
            released: Arc::clone(&self.released),
        }
    }
}

struct Tracked {
    released: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the concrete creator's factory hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryBehavior {
    Product,
    Null,
    Text,
}

/// What the concrete creator's orchestration returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationBehavior {
    /// Prefix plus the produced product's output
    EmbedProduct,
    /// A fixed string that ignores the product
    Fixed(String),
    /// Panics mid-call
    Panic,
}

#[derive(Debug, Clone)]
struct Behavior {
    naming: Naming,
    product_output: String,
    factory: FactoryBehavior,
    orchestration: OrchestrationBehavior,
    constructor_panics: bool,
    lifecycle: Lifecycle,
}

/// Configurable in-process Factory Method candidate
#[derive(Debug, Clone)]
pub struct Fixture {
    behavior: Behavior,
    abstract_product: bool,
    abstract_creator: bool,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::conforming()
    }
}

impl Fixture {
    /// The canonical teaching example, PascalCase names
    pub fn conforming() -> Self {
        Self {
            behavior: Behavior {
                naming: Naming::PASCAL,
                product_output: "A".to_string(),
                factory: FactoryBehavior::Product,
                orchestration: OrchestrationBehavior::EmbedProduct,
                constructor_panics: false,
                lifecycle: Lifecycle::new(),
            },
            abstract_product: true,
            abstract_creator: true,
        }
    }

    pub fn with_naming(mut self, naming: Naming) -> Self {
        self.behavior.naming = naming;
        self
    }

    pub fn with_product_output(mut self, output: impl Into<String>) -> Self {
        self.behavior.product_output = output.into();
        self
    }

    pub fn with_factory(mut self, factory: FactoryBehavior) -> Self {
        self.behavior.factory = factory;
        self
    }

    pub fn with_orchestration(mut self, orchestration: OrchestrationBehavior) -> Self {
        self.behavior.orchestration = orchestration;
        self
    }

    /// `Product` gets a default implementation instead of a pure operation
    pub fn with_concrete_product_base(mut self) -> Self {
        self.abstract_product = false;
        self
    }

    /// `Creator` gets a default factory instead of a pure one
    pub fn with_concrete_creator_base(mut self) -> Self {
        self.abstract_creator = false;
        self
    }

    pub fn with_panicking_constructor(mut self) -> Self {
        self.behavior.constructor_panics = true;
        self
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.behavior.lifecycle.clone()
    }

    pub fn binding(&self) -> RoleBinding {
        self.behavior.naming.binding()
    }

    pub fn model(&self) -> CandidateModel {
        let naming = &self.behavior.naming;
        let product = if self.abstract_product {
            TypeDescriptor::new("Product").with_pure(naming.product_operation, ReturnKind::Text)
        } else {
            TypeDescriptor::new("Product").with_method(naming.product_operation, ReturnKind::Text)
        };
        let creator = if self.abstract_creator {
            TypeDescriptor::new("Creator").with_pure(naming.factory_method, ReturnKind::Object)
        } else {
            TypeDescriptor::new("Creator").with_method(naming.factory_method, ReturnKind::Object)
        };

        CandidateModel::new()
            .with_type(product)
            .with_type(
                TypeDescriptor::new("ConcreteProductA")
                    .extends("Product")
                    .with_method(naming.product_operation, ReturnKind::Text),
            )
            .with_type(creator.with_method(naming.orchestration, ReturnKind::Text))
            .with_type(
                TypeDescriptor::new("ConcreteCreatorA")
                    .extends("Creator")
                    .with_method(naming.factory_method, ReturnKind::Object),
            )
    }

    pub fn runtime(&self) -> NativeRuntime {
        let product = Arc::new(self.behavior.clone());
        let creator = Arc::clone(&product);
        NativeRuntime::new()
            .register("ConcreteProductA", move || ProductObject::new(&product))
            .register("ConcreteCreatorA", move || {
                if creator.constructor_panics {
                    panic!("ConcreteCreatorA constructor failed");
                }
                CreatorObject::new(&creator)
            })
    }

    pub fn candidate(&self, label: &str) -> Candidate {
        Candidate::new(label, self.model(), self.runtime())
    }
}

struct ProductObject {
    operation: &'static str,
    output: String,
    _tracked: Tracked,
}

impl ProductObject {
    fn new(behavior: &Behavior) -> Self {
        Self {
            operation: behavior.naming.product_operation,
            output: behavior.product_output.clone(),
            _tracked: behavior.lifecycle.track(),
        }
    }
}

impl CandidateObject for ProductObject {
    fn type_name(&self) -> &str {
        "ConcreteProductA"
    }

    fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
        if operation == self.operation {
            Ok(Value::text(self.output.clone()))
        } else {
            Err(unknown("ConcreteProductA", operation))
        }
    }
}

struct CreatorObject {
    behavior: Arc<Behavior>,
    _tracked: Tracked,
}

impl CreatorObject {
    fn new(behavior: &Arc<Behavior>) -> Self {
        Self {
            behavior: Arc::clone(behavior),
            _tracked: behavior.lifecycle.track(),
        }
    }

    fn factory(&self) -> Value {
        match self.behavior.factory {
            FactoryBehavior::Product => Value::object(ProductObject::new(&self.behavior)),
            FactoryBehavior::Null => Value::Null,
            FactoryBehavior::Text => Value::text("ConcreteProductA"),
        }
    }
}

impl CandidateObject for CreatorObject {
    fn type_name(&self) -> &str {
        "ConcreteCreatorA"
    }

    fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
        let naming = &self.behavior.naming;
        if operation == naming.factory_method {
            return Ok(self.factory());
        }
        if operation != naming.orchestration {
            return Err(unknown("ConcreteCreatorA", operation));
        }

        match &self.behavior.orchestration {
            OrchestrationBehavior::EmbedProduct => {
                let payload = match self.factory() {
                    Value::Object(mut product) => match product.invoke(naming.product_operation)? {
                        Value::Text(text) => text,
                        _ => String::new(),
                    },
                    _ => String::new(),
                };
                Ok(Value::text(format!("{ORCHESTRATION_PREFIX}{payload}")))
            }
            OrchestrationBehavior::Fixed(text) => Ok(Value::text(text.clone())),
            OrchestrationBehavior::Panic => panic!("orchestration failed"),
        }
    }
}

fn unknown(type_name: &str, operation: &str) -> InvocationError {
    InvocationError::UnknownOperation {
        type_name: type_name.to_string(),
        operation: operation.to_string(),
    }
}

/// C++ sources for the g++ front-end
pub mod cpp {
    /// The teaching example
    pub const CONFORMING: &str = r#"// Minimal Factory Method example
#include <string>
#include <memory>

struct Product {
    virtual ~Product() = default;
    virtual std::string Operation() const = 0;
};

struct ConcreteProductA : Product {
    std::string Operation() const override { return "A"; }
};

struct Creator {
    virtual ~Creator() = default;
    virtual Product* FactoryMethod() const = 0;

    std::string DoSomething() const {
        Product* p = FactoryMethod();
        std::string r = "Creator: working with -> " + p->Operation();
        delete p;
        return r;
    }
};

struct ConcreteCreatorA : Creator {
    Product* FactoryMethod() const override { return new ConcreteProductA(); }
};
"#;

    /// Split-header style with camelCase methods, concatenated
    pub const CAMEL_CASE: &str = r#"#include <iostream>
#include <string>

class Product {
public:
    virtual ~Product() = default;
    virtual std::string operation() const = 0;
};

class ConcreteProductA : public Product {
public:
    std::string operation() const override { return "Result of ConcreteProductA"; }
};

class Creator {
public:
    virtual ~Creator() = default;
    virtual Product* factoryMethod() const = 0;

    std::string someOperation() const {
        Product* p = factoryMethod();
        std::string result = p->operation();
        delete p;
        return result;
    }
};

class ConcreteCreatorA : public Creator {
public:
    Product* factoryMethod() const override { return new ConcreteProductA(); }
};

int main() {
    Creator* c1 = new ConcreteCreatorA();
    std::cout << c1->someOperation() << "\n";
    delete c1;
    return 0;
}
"#;

    /// Base classes with default implementations
    pub const CONCRETE_BASES: &str = r#"#include <string>

class Product {
public:
    virtual ~Product() = default;
    virtual std::string Operation() const { return "base"; }
};

class ConcreteProductA : public Product {
public:
    std::string Operation() const override { return "A"; }
};

class Creator {
public:
    virtual ~Creator() = default;
    virtual Product* FactoryMethod() const { return nullptr; }
    std::string DoSomething() const {
        Product* p = FactoryMethod();
        std::string r = p ? p->Operation() : std::string("nothing");
        delete p;
        return r;
    }
};

class ConcreteCreatorA : public Creator {
public:
    Product* FactoryMethod() const override { return new ConcreteProductA(); }
};
"#;

    /// Factory returning a null product
    pub const NULL_FACTORY: &str = r#"#include <string>

struct Product {
    virtual ~Product() = default;
    virtual std::string Operation() const = 0;
};

struct ConcreteProductA : Product {
    std::string Operation() const override { return "A"; }
};

struct Creator {
    virtual ~Creator() = default;
    virtual Product* FactoryMethod() const = 0;
    std::string DoSomething() const { return "done"; }
};

struct ConcreteCreatorA : Creator {
    Product* FactoryMethod() const override { return nullptr; }
};
"#;

    /// Creator that hands out a product it owns as a member
    pub const OWNED_PRODUCT: &str = r#"#include <string>

struct Product {
    virtual ~Product() = default;
    virtual std::string Operation() const = 0;
};

struct ConcreteProductA : Product {
    std::string Operation() const override { return "A"; }
};

struct Creator {
    virtual ~Creator() = default;
    virtual Product* FactoryMethod() = 0;

    std::string DoSomething() {
        return "Creator: working with -> " + FactoryMethod()->Operation();
    }
};

struct ConcreteCreatorA : Creator {
    ConcreteProductA owned;
    Product* FactoryMethod() override { return &owned; }
};
"#;

    /// One header per class plus a `main.cpp`, camelCase, two variants
    pub const SPLIT_EXAMPLE: &[(&str, &str)] = &[
        (
            "Product.hpp",
            r#"#pragma once
#include <string>

class Product {
public:
    virtual ~Product() = default;
    virtual std::string operation() const = 0;
};
"#,
        ),
        (
            "ConcreteProductA.hpp",
            r#"#pragma once
#include "Product.hpp"

class ConcreteProductA : public Product {
public:
    std::string operation() const override { return "Result of ConcreteProductA"; }
};
"#,
        ),
        (
            "ConcreteProductB.hpp",
            r#"#pragma once
#include "Product.hpp"

class ConcreteProductB : public Product {
public:
    std::string operation() const override { return "Result of ConcreteProductB"; }
};
"#,
        ),
        (
            "Creator.hpp",
            r#"#pragma once
#include "Product.hpp"

class Creator {
public:
    virtual ~Creator() = default;
    virtual Product* factoryMethod() const = 0;

    std::string someOperation() const {
        Product* p = factoryMethod();
        std::string result = p->operation();
        delete p;
        return result;
    }
};
"#,
        ),
        (
            "ConcreteCreatorA.hpp",
            r#"#pragma once
#include "Creator.hpp"
#include "ConcreteProductA.hpp"

class ConcreteCreatorA : public Creator {
public:
    Product* factoryMethod() const override { return new ConcreteProductA(); }
};
"#,
        ),
        (
            "ConcreteCreatorB.hpp",
            r#"#pragma once
#include "Creator.hpp"
#include "ConcreteProductB.hpp"

class ConcreteCreatorB : public Creator {
public:
    Product* factoryMethod() const override { return new ConcreteProductB(); }
};
"#,
        ),
        (
            "main.cpp",
            r#"#include <iostream>
#include "ConcreteCreatorA.hpp"
#include "ConcreteCreatorB.hpp"

int main() {
    Creator* c1 = new ConcreteCreatorA();
    std::cout << c1->someOperation() << "\n";
    delete c1;

    Creator* c2 = new ConcreteCreatorB();
    std::cout << c2->someOperation() << "\n";
    delete c2;

    return 0;
}
"#,
        ),
    ];

    /// Write [`SPLIT_EXAMPLE`] into `dir`
    pub fn write_split_example(dir: &std::path::Path) -> std::io::Result<()> {
        for (name, content) in SPLIT_EXAMPLE {
            std::fs::write(dir.join(name), content)?;
        }
        Ok(())
    }
}
