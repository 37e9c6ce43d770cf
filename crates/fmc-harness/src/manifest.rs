//! Batch manifests
//!
//! ```toml
//! binding = "bindings/pascal.toml"   # default for entries without one
//!
//! [[submission]]
//! label = "alice"
//! source = "alice/factory.cpp"
//!
//! [[submission]]
//! source = "bob/"                    # every C++ file under the directory
//! binding = "bindings/camel.toml"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use crate::error::HarnessError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One submission listed in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Display label; defaults to the source path
    #[serde(default)]
    pub label: Option<String>,
    /// C++ source file, or a directory holding a multi-file submission
    pub source: PathBuf,
    /// Role binding file
    #[serde(default)]
    pub binding: Option<PathBuf>,
}

impl ManifestEntry {
    /// Label shown in reports
    #[must_use]
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Submissions to verify together
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchManifest {
    /// Binding for entries that declare none
    #[serde(default)]
    pub binding: Option<PathBuf>,
    /// Entries in verification order
    #[serde(default, rename = "submission")]
    pub submissions: Vec<ManifestEntry>,
}

impl BatchManifest {
    /// Parse TOML; paths are kept as written
    pub fn from_toml_str(content: &str) -> Result<Self, HarnessError> {
        toml::from_str(content).map_err(|e| HarnessError::Parse {
            what: "manifest",
            message: e.to_string(),
        })
    }

    /// Load a manifest and resolve its paths against its directory
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::from_toml_str(&content)?.resolved_against(base))
    }

    /// Make every relative path relative to `base`
    #[must_use]
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.binding = self.binding.map(resolve);
        for entry in &mut self.submissions {
            entry.source = resolve(std::mem::take(&mut entry.source));
            entry.binding = entry.binding.take().map(resolve);
        }
        self
    }

    /// Binding file for an entry
    pub fn binding_for<'m>(&'m self, entry: &'m ManifestEntry) -> Result<&'m Path, HarnessError> {
        entry
            .binding
            .as_deref()
            .or(self.binding.as_deref())
            .ok_or_else(|| HarnessError::MissingBinding(entry.display_label()))
    }
}
