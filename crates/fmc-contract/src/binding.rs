//! Role binding: contract roles to candidate identifiers
//!
//! The harness decides which candidate type fills which role and which method
//! implements which operation slot. Two submissions using `Operation` /
//! `FactoryMethod` and `operation` / `create` are the same contract under
//! different bindings.
//!
//! ```toml
//! [roles]
//! product = "Product"
//! creator = "Creator"
//! concrete_product = "ConcreteProductA"
//! concrete_creator = "ConcreteCreatorA"
//!
//! [operations]
//! product_operation = "Operation"
//! factory_method = "FactoryMethod"
//! orchestration = "DoSomething"
//!
//! # further concrete pairs, checked after the one in [roles]
//! [[variants]]
//! concrete_product = "ConcreteProductB"
//! concrete_creator = "ConcreteCreatorB"
//! ```

use crate::role::{OperationSlot, Role};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors loading or validating a binding
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// IO error reading a binding file
    #[error("io error reading {path}: {source}")]
    Io {
        /// Binding file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Binding file could not be decoded
    #[error("invalid {format} binding: {message}")]
    Parse {
        /// Format the file was decoded as
        format: &'static str,
        /// Decoder message
        message: String,
    },

    /// File extension not recognised
    #[error("unsupported binding format: '{0}'")]
    UnsupportedFormat(String),

    /// A bound value is not an identifier
    #[error("binding for '{key}' is not an identifier: '{value}'")]
    InvalidIdentifier {
        /// Role or slot key, e.g. `concrete_product` or `variants[0].concrete_creator`
        key: String,
        /// Rejected value
        value: String,
    },
}

impl BindingError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn parse(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            format,
            message: err.to_string(),
        }
    }
}

/// Additional concrete product/creator pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcreteVariant {
    /// Type filling the concrete product role
    pub concrete_product: String,
    /// Type filling the concrete creator role
    pub concrete_creator: String,
}

impl ConcreteVariant {
    /// Pair a concrete product with the creator that makes it
    #[must_use]
    pub fn new(concrete_product: impl Into<String>, concrete_creator: impl Into<String>) -> Self {
        Self {
            concrete_product: concrete_product.into(),
            concrete_creator: concrete_creator.into(),
        }
    }

    /// Identifier for a concrete role
    #[must_use]
    pub fn role(&self, role: Role) -> Option<&str> {
        match role {
            Role::ConcreteProduct => Some(&self.concrete_product),
            Role::ConcreteCreator => Some(&self.concrete_creator),
            Role::Product | Role::Creator => None,
        }
    }
}

/// Mapping from roles and operation slots to candidate identifiers
///
/// The concrete roles in `roles` form pair 0; `variants` lists pairs 1 and
/// up, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleBinding {
    #[serde(default)]
    roles: IndexMap<Role, String>,
    #[serde(default)]
    operations: IndexMap<OperationSlot, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    variants: Vec<ConcreteVariant>,
}

impl RoleBinding {
    /// Create empty binding
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a role to a candidate type identifier
    #[must_use]
    pub fn with_role(mut self, role: Role, identifier: impl Into<String>) -> Self {
        self.roles.insert(role, identifier.into());
        self
    }

    /// Bind an operation slot to a candidate method identifier
    #[must_use]
    pub fn with_operation(mut self, slot: OperationSlot, identifier: impl Into<String>) -> Self {
        self.operations.insert(slot, identifier.into());
        self
    }

    /// Append another concrete product/creator pair
    #[must_use]
    pub fn with_variant(
        mut self,
        concrete_product: impl Into<String>,
        concrete_creator: impl Into<String>,
    ) -> Self {
        self.variants
            .push(ConcreteVariant::new(concrete_product, concrete_creator));
        self
    }

    /// Identifier bound to a role
    #[inline]
    #[must_use]
    pub fn role(&self, role: Role) -> Option<&str> {
        self.roles.get(&role).map(String::as_str)
    }

    /// Identifier bound to a role for concrete pair `variant`
    ///
    /// Abstract roles ignore `variant`. Pair 0 reads `roles`; an index past
    /// the last pair yields `None`.
    #[must_use]
    pub fn role_in(&self, role: Role, variant: usize) -> Option<&str> {
        if variant == 0 || !role.is_concrete() {
            return self.role(role);
        }
        self.variants.get(variant - 1).and_then(|v| v.role(role))
    }

    /// Pairs listed after the one in `roles`
    #[inline]
    #[must_use]
    pub fn variants(&self) -> &[ConcreteVariant] {
        &self.variants
    }

    /// Number of concrete pairs under test, at least 1
    #[inline]
    #[must_use]
    pub fn variant_count(&self) -> usize {
        1 + self.variants.len()
    }

    /// Identifier bound to an operation slot
    #[inline]
    #[must_use]
    pub fn operation(&self, slot: OperationSlot) -> Option<&str> {
        self.operations.get(&slot).map(String::as_str)
    }

    /// Roles without an identifier
    #[must_use]
    pub fn unbound_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|r| !self.roles.contains_key(r))
            .collect()
    }

    /// Operation slots without an identifier
    #[must_use]
    pub fn unbound_operations(&self) -> Vec<OperationSlot> {
        OperationSlot::ALL
            .into_iter()
            .filter(|s| !self.operations.contains_key(s))
            .collect()
    }

    /// Check that every bound value is an identifier
    ///
    /// Missing entries are not an error here: the verifiers report them as
    /// inconclusive checks.
    pub fn validate(&self) -> Result<(), BindingError> {
        let roles = self.roles.iter().map(|(r, v)| (r.key(), v));
        let operations = self.operations.iter().map(|(s, v)| (s.key(), v));

        for (key, value) in roles.chain(operations) {
            if !is_identifier(value) {
                return Err(BindingError::InvalidIdentifier {
                    key: key.to_string(),
                    value: value.clone(),
                });
            }
        }

        for (index, variant) in self.variants.iter().enumerate() {
            for role in [Role::ConcreteProduct, Role::ConcreteCreator] {
                let value = variant.role(role).unwrap_or_default();
                if !is_identifier(value) {
                    return Err(BindingError::InvalidIdentifier {
                        key: format!("variants[{index}].{}", role.key()),
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse TOML binding
    pub fn from_toml_str(content: &str) -> Result<Self, BindingError> {
        let binding: Self = toml::from_str(content).map_err(|e| BindingError::parse("toml", e))?;
        binding.validate()?;
        Ok(binding)
    }

    /// Parse JSON binding
    pub fn from_json_str(content: &str) -> Result<Self, BindingError> {
        let binding: Self =
            serde_json::from_str(content).map_err(|e| BindingError::parse("json", e))?;
        binding.validate()?;
        Ok(binding)
    }

    /// Parse YAML binding
    pub fn from_yaml_str(content: &str) -> Result<Self, BindingError> {
        let binding: Self =
            serde_yaml::from_str(content).map_err(|e| BindingError::parse("yaml", e))?;
        binding.validate()?;
        Ok(binding)
    }

    /// Load binding from file, format chosen by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BindingError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| BindingError::io(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "toml" => Self::from_toml_str(&content),
            "json" => Self::from_json_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            other => Err(BindingError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Check if `value` is an identifier, optionally `::`-qualified
#[must_use]
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.split("::").all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
