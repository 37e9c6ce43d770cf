//! Multi-file C++ submissions
//!
//! A submission is a set of files keyed by relative path, staged verbatim
//! into the g++ work directory so quoted includes resolve as they did for
//! the author. The *entry* translation unit is the one defining `main`, or the
//! first source file when none does; generated programs include it and link
//! every other source file. A headers-only submission has no entry, and every
//! header is included instead.

use super::extract::{defines_main, extract_into, ExtractError};
use crate::descriptor::CandidateModel;
use std::path::{Component, Path, PathBuf};

/// Extensions treated as C++ files when reading a directory
pub const CPP_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c++", "hpp", "hh", "hxx", "h", "ipp"];

const TRANSLATION_UNIT_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c++"];

/// File name used for single-source submissions
pub const CANDIDATE_FILE: &str = "candidate.cpp";

/// Problems assembling a submission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Path is absolute, escapes the submission or cannot be quoted in `#include`
    #[error("unsupported source path '{}'", .0.display())]
    InvalidPath(PathBuf),

    /// Two files map to the same relative path
    #[error("duplicate source path '{}'", .0.display())]
    Duplicate(PathBuf),
}

/// One file of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the submission root
    pub path: PathBuf,
    /// File content
    pub content: String,
}

impl SourceFile {
    /// Path with `/` separators, as written in an `#include`
    #[must_use]
    pub fn include_path(&self) -> String {
        self.path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Check if this file is compiled on its own rather than included
    #[must_use]
    pub fn is_translation_unit(&self) -> bool {
        has_extension(&self.path, TRANSLATION_UNIT_EXTENSIONS)
    }
}

/// Every file of one C++ submission, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CppSources {
    files: Vec<SourceFile>,
}

impl CppSources {
    /// Create empty submission
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submission of one source file named [`CANDIDATE_FILE`]
    #[must_use]
    pub fn single(content: impl Into<String>) -> Self {
        Self {
            files: vec![SourceFile {
                path: PathBuf::from(CANDIDATE_FILE),
                content: content.into(),
            }],
        }
    }

    /// Add a file under `path`, relative to the submission root
    pub fn push(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Result<(), SourceError> {
        let path = path.into();
        validate_path(&path)?;
        if self.files.iter().any(|f| f.path == path) {
            return Err(SourceError::Duplicate(path));
        }
        self.files.push(SourceFile {
            path,
            content: content.into(),
        });
        Ok(())
    }

    /// Builder-style [`push`](Self::push)
    pub fn with_file(
        mut self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Result<Self, SourceError> {
        self.push(path, content)?;
        Ok(self)
    }

    /// Files in submission order
    #[inline]
    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the submission has no files
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Translation unit generated programs are built around
    #[must_use]
    pub fn entry(&self) -> Option<&SourceFile> {
        let units: Vec<&SourceFile> = self.files.iter().filter(|f| f.is_translation_unit()).collect();
        units
            .iter()
            .copied()
            .find(|f| defines_main(&f.content))
            .or_else(|| units.first().copied())
    }

    /// Files to `#include` from a generated program, as include paths
    #[must_use]
    pub fn entry_includes(&self) -> Vec<String> {
        match self.entry() {
            Some(entry) => vec![entry.include_path()],
            None => self.files.iter().map(SourceFile::include_path).collect(),
        }
    }

    /// Translation units compiled next to the entry
    #[must_use]
    pub fn companion_units(&self) -> Vec<&Path> {
        let entry = self.entry().map(|f| f.path.as_path());
        self.files
            .iter()
            .filter(|f| f.is_translation_unit() && Some(f.path.as_path()) != entry)
            .map(|f| f.path.as_path())
            .collect()
    }

    /// Extract the types of every file into one model
    pub fn extract(&self) -> Result<CandidateModel, ExtractError> {
        let mut model = CandidateModel::new();
        let name_files = self.files.len() > 1;
        for file in &self.files {
            let origin = file.include_path();
            extract_into(&mut model, &file.content, name_files.then_some(origin.as_str()))?;
        }
        Ok(model)
    }

    /// BLAKE3 hex digest over paths and contents
    ///
    /// A single-file submission hashes to the digest of its content alone.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        if let [only] = self.files.as_slice() {
            return blake3::hash(only.content.as_bytes()).to_hex().to_string();
        }
        let mut hasher = blake3::Hasher::new();
        for file in &self.files {
            hasher.update(file.include_path().as_bytes());
            hasher.update(&[0]);
            hasher.update(&(file.content.len() as u64).to_le_bytes());
            hasher.update(file.content.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Check if `path` has one of `extensions`, case-insensitively
#[must_use]
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn validate_path(path: &Path) -> Result<(), SourceError> {
    let invalid = || SourceError::InvalidPath(path.to_path_buf());
    let mut components = 0;
    for component in path.components() {
        let Component::Normal(part) = component else {
            return Err(invalid());
        };
        let part = part.to_str().ok_or_else(invalid)?;
        if part.chars().any(|c| matches!(c, '"' | '\\' | '\n' | '\r')) {
            return Err(invalid());
        }
        components += 1;
    }
    if components == 0 {
        return Err(invalid());
    }
    Ok(())
}
