//! Candidate submissions

use crate::cpp::sources::has_extension;
use crate::cpp::{CppSources, ExtractError, GxxConfig, GxxRuntime, SourceError, CPP_EXTENSIONS};
use crate::descriptor::CandidateModel;
use crate::runtime::{CandidateRuntime, UnavailableRuntime};
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors preparing a candidate
#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    /// Source could not be parsed at all
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Reading a submission file failed
    #[error("IO error at {path}: {source}")]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Staging sources for the g++ runtime failed
    #[error("cannot prepare work directory: {0}")]
    Workspace(#[source] std::io::Error),

    /// Submission file layout was rejected
    #[error("invalid submission: {0}")]
    Sources(#[from] SourceError),

    /// Directory or file list held no C++ files
    #[error("no C++ sources found at {}", .0.display())]
    NoSources(PathBuf),
}

impl CandidateError {
    /// Create IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// One implementation under verification
///
/// Pairs the structural model with the runtime that can execute it.
pub struct Candidate {
    label: String,
    model: CandidateModel,
    runtime: Box<dyn CandidateRuntime>,
    fingerprint: Option<String>,
}

impl Candidate {
    /// Combine a model with a runtime
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        model: CandidateModel,
        runtime: impl CandidateRuntime + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            model,
            runtime: Box::new(runtime),
            fingerprint: None,
        }
    }

    /// Candidate whose behavioral checks cannot run
    #[must_use]
    pub fn structural_only(label: impl Into<String>, model: CandidateModel) -> Self {
        Self::new(
            label,
            model,
            UnavailableRuntime::new("candidate was loaded for structural verification only"),
        )
    }

    /// Parse C++ source and attach a g++ runtime
    pub fn from_cpp_source(
        label: impl Into<String>,
        source: &str,
        config: GxxConfig,
    ) -> Result<Self, CandidateError> {
        Self::from_sources(label, &CppSources::single(source), config)
    }

    /// Parse C++ source without behavioral execution
    pub fn from_cpp_source_structural(
        label: impl Into<String>,
        source: &str,
    ) -> Result<Self, CandidateError> {
        Self::from_sources_structural(label, &CppSources::single(source))
    }

    /// Parse every file of a submission and attach a g++ runtime
    pub fn from_sources(
        label: impl Into<String>,
        sources: &CppSources,
        config: GxxConfig,
    ) -> Result<Self, CandidateError> {
        let model = sources.extract()?;
        let runtime = GxxRuntime::from_sources(sources, config).map_err(CandidateError::Workspace)?;
        Ok(Self::new(label, model, runtime).with_fingerprint(sources.fingerprint()))
    }

    /// Parse every file of a submission without behavioral execution
    pub fn from_sources_structural(
        label: impl Into<String>,
        sources: &CppSources,
    ) -> Result<Self, CandidateError> {
        let model = sources.extract()?;
        Ok(Self::structural_only(label, model).with_fingerprint(sources.fingerprint()))
    }

    /// Read a C++ file or a directory of them; `config` of `None` skips
    /// behavioral execution
    ///
    /// Directory files keep their relative paths, so includes between them
    /// resolve as written.
    pub fn load_cpp(path: &Path, config: Option<GxxConfig>) -> Result<Self, CandidateError> {
        let sources = if path.is_dir() {
            read_directory(path)?
        } else {
            let source = std::fs::read_to_string(path).map_err(|e| CandidateError::io(path, e))?;
            CppSources::single(source)
        };
        Self::assemble(path.display().to_string(), &sources, config)
    }

    /// Read several C++ files as one submission, staged under their file
    /// names; the label comes from the first file
    pub fn load_cpp_files(paths: &[PathBuf], config: Option<GxxConfig>) -> Result<Self, CandidateError> {
        let [first, rest @ ..] = paths else {
            return Err(CandidateError::NoSources(PathBuf::new()));
        };
        if rest.is_empty() {
            return Self::load_cpp(first, config);
        }
        let mut sources = CppSources::new();
        for path in paths {
            let content = std::fs::read_to_string(path).map_err(|e| CandidateError::io(path, e))?;
            let name = path
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| SourceError::InvalidPath(path.clone()))?;
            sources.push(name, content)?;
        }
        Self::assemble(first.display().to_string(), &sources, config)
    }

    fn assemble(
        label: String,
        sources: &CppSources,
        config: Option<GxxConfig>,
    ) -> Result<Self, CandidateError> {
        tracing::debug!(label = %label, files = sources.len(), "loading C++ submission");
        match config {
            Some(config) => Self::from_sources(label, sources, config),
            None => Self::from_sources_structural(label, sources),
        }
    }

    /// Attach a content fingerprint
    #[inline]
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Replace the label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Human-readable label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Structural model
    #[inline]
    #[must_use]
    pub fn model(&self) -> &CandidateModel {
        &self.model
    }

    /// Runtime for behavioral checks
    #[inline]
    #[must_use]
    pub fn runtime(&self) -> &dyn CandidateRuntime {
        self.runtime.as_ref()
    }

    /// Content fingerprint, when loaded from source
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("label", &self.label)
            .field("types", &self.model.len())
            .field("runtime", &self.runtime.name())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Collect every C++ file under `root`, sorted by relative path
fn read_directory(root: &Path) -> Result<CppSources, CandidateError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| CandidateError::io(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| CandidateError::io(&dir, e))?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                pending.push(path);
            } else if has_extension(&path, CPP_EXTENSIONS) {
                found.push(path);
            }
        }
    }
    if found.is_empty() {
        return Err(CandidateError::NoSources(root.to_path_buf()));
    }
    found.sort();

    let mut sources = CppSources::new();
    for path in found {
        let content = std::fs::read_to_string(&path).map_err(|e| CandidateError::io(&path, e))?;
        let relative = path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .map_err(|_| SourceError::InvalidPath(path.clone()))?;
        sources.push(relative, content)?;
    }
    Ok(sources)
}

/// BLAKE3 hex digest of candidate source
#[must_use]
pub fn fingerprint(source: &str) -> String {
    blake3::hash(source.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::runtime::InvocationError;

    #[test]
    fn structural_only_candidate_refuses_execution() {
        let model = CandidateModel::new().with_type(TypeDescriptor::new("Product"));
        let candidate = Candidate::structural_only("model", model);
        assert_eq!(candidate.runtime().name(), "unavailable");
        assert!(matches!(
            candidate.runtime().instantiate("Product").err(),
            Some(InvocationError::Unavailable(_))
        ));
        assert!(candidate.fingerprint().is_none());
    }

    #[test]
    fn cpp_source_is_fingerprinted() {
        let source = "struct Product { virtual int f() = 0; };";
        let candidate = Candidate::from_cpp_source_structural("inline", source).unwrap();
        assert_eq!(candidate.fingerprint(), Some(fingerprint(source).as_str()));
        assert_eq!(candidate.fingerprint().map(str::len), Some(64));
        assert_eq!(candidate.model().len(), 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Candidate::load_cpp(Path::new("/nonexistent/student.cpp"), None).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/student.cpp"));
    }

    #[test]
    fn directory_submission_merges_nested_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("shapes")).unwrap();
        std::fs::write(
            dir.path().join("Product.hpp"),
            "#pragma once\nstruct Product { virtual ~Product() = default; virtual int f() = 0; };\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("shapes/Widget.hpp"),
            "#pragma once\n#include \"../Product.hpp\"\nstruct Widget : Product { int f() override { return 1; } };\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not C++").unwrap();

        let candidate = Candidate::load_cpp(dir.path(), None).unwrap();
        assert_eq!(candidate.model().len(), 2);
        assert!(candidate.model().inherits_from("Widget", "Product"));
        assert_eq!(candidate.label(), dir.path().display().to_string());
    }

    #[test]
    fn empty_directory_has_no_sources() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Candidate::load_cpp(dir.path(), None).unwrap_err();
        assert!(matches!(err, CandidateError::NoSources(_)));
    }

    #[test]
    fn file_list_is_one_submission() {
        let dir = tempfile::TempDir::new().unwrap();
        let product = dir.path().join("Product.hpp");
        let widget = dir.path().join("Widget.hpp");
        std::fs::write(&product, "#pragma once\nstruct Product { virtual int f() = 0; };\n").unwrap();
        std::fs::write(&widget, "#include \"Product.hpp\"\nstruct Widget : Product { int f() override { return 1; } };\n")
            .unwrap();

        let candidate = Candidate::load_cpp_files(&[product.clone(), widget], None).unwrap();
        assert!(candidate.model().inherits_from("Widget", "Product"));
        assert_eq!(candidate.label(), product.display().to_string());
        assert_ne!(candidate.fingerprint(), Some(fingerprint("").as_str()));
    }
}
