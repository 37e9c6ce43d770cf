//! g++-backed runtime
//!
//! Each distinct call chain is compiled into its own probe executable, linked
//! with the submission's other translation units, and run once; results are
//! memoized per chain. An object handed to the verifier is therefore a recipe
//! (root type plus call chain). Whatever a probe allocates is reclaimed when
//! its process exits.
//!
//! Probes run on a private current-thread tokio runtime, so methods here must
//! not be called from inside another tokio runtime.

use super::probe::{parse_probe_output, render_probe, ProbeOutcome};
use super::sources::CppSources;
use crate::runtime::{CandidateObject, CandidateRuntime, InvocationError, Value};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

/// Lines of compiler or probe stderr kept in error messages
const STDERR_EXCERPT_LINES: usize = 12;

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GxxConfig {
    /// Compiler executable
    pub compiler: PathBuf,
    /// Language standard passed as `-std=`
    pub standard: String,
    /// Additional compiler flags
    pub extra_flags: Vec<String>,
    /// Limit for compiling one probe
    #[serde(rename = "compile_timeout_ms", with = "millis")]
    pub compile_timeout: Duration,
    /// Limit for running one probe
    #[serde(rename = "probe_timeout_ms", with = "millis")]
    pub probe_timeout: Duration,
}

impl Default for GxxConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("g++"),
            standard: "c++17".to_string(),
            extra_flags: Vec::new(),
            compile_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

impl GxxConfig {
    /// Set compiler executable
    #[inline]
    #[must_use]
    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Set probe run limit
    #[inline]
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Check if the compiler can be started
    #[must_use]
    pub fn compiler_available(&self) -> bool {
        std::process::Command::new(&self.compiler)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

struct Inner {
    config: GxxConfig,
    workdir: TempDir,
    includes: Vec<String>,
    companions: Vec<PathBuf>,
    cache: DashMap<Vec<String>, Result<ProbeOutcome, InvocationError>>,
    counter: AtomicUsize,
    runtime: tokio::runtime::Runtime,
}

impl Inner {
    fn probe(&self, root: &str, chain: &[String]) -> Result<ProbeOutcome, InvocationError> {
        let key: Vec<String> = std::iter::once(root.to_string()).chain(chain.iter().cloned()).collect();
        if let Some(hit) = self.cache.get(&key) {
            return hit.value().clone();
        }

        let outcome = self.run_probe(root, chain);
        tracing::debug!(root, chain = ?chain, outcome = ?outcome, "probe finished");
        self.cache.insert(key, outcome.clone());
        outcome
    }

    fn run_probe(&self, root: &str, chain: &[String]) -> Result<ProbeOutcome, InvocationError> {
        let program = render_probe(&self.includes, root, chain)?;
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let dir = self.workdir.path();
        let probe_path = dir.join(format!(".fmcheck_probe_{id}.cpp"));
        let exe_path = dir.join(format!(".fmcheck_probe_{id}"));

        std::fs::write(&probe_path, program).map_err(|e| {
            InvocationError::Internal(format!("cannot write {}: {e}", probe_path.display()))
        })?;

        self.runtime.block_on(async {
            self.compile(dir, &probe_path, &exe_path).await?;
            self.execute(dir, &exe_path).await
        })
    }

    async fn compile(&self, dir: &Path, source: &Path, exe: &Path) -> Result<(), InvocationError> {
        let config = &self.config;
        let mut command = Command::new(&config.compiler);
        command
            .arg(format!("-std={}", config.standard))
            .args(&config.extra_flags)
            .arg("-I")
            .arg(dir)
            .arg("-o")
            .arg(exe)
            .arg(source)
            .args(&self.companions)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(config.compile_timeout, command.output())
            .await
            .map_err(|_| InvocationError::Timeout(config.compile_timeout))?
            .map_err(|e| {
                InvocationError::Internal(format!(
                    "cannot start compiler {}: {e}",
                    config.compiler.display()
                ))
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(InvocationError::Build(excerpt(&String::from_utf8_lossy(&output.stderr))))
        }
    }

    async fn execute(&self, dir: &Path, exe: &Path) -> Result<ProbeOutcome, InvocationError> {
        let limit = self.config.probe_timeout;
        let mut command = Command::new(exe);
        command.current_dir(dir).stdin(Stdio::null()).kill_on_drop(true);

        let output = tokio::time::timeout(limit, command.output())
            .await
            .map_err(|_| InvocationError::Timeout(limit))?
            .map_err(|e| InvocationError::Internal(format!("cannot start probe: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            if stderr.contains("terminate called") {
                return Err(InvocationError::Raised(excerpt(&stderr)));
            }
            let mut message = describe_status(output.status);
            if !stderr.trim().is_empty() {
                message.push_str(": ");
                message.push_str(&excerpt(&stderr));
            }
            return Err(InvocationError::Crashed(message));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

fn excerpt(stderr: &str) -> String {
    stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(STDERR_EXCERPT_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_status(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }
    match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "terminated abnormally".to_string(),
    }
}

/// Runtime that compiles and runs C++ candidates with g++
pub struct GxxRuntime {
    inner: Arc<Inner>,
}

impl GxxRuntime {
    /// Stage a single-file `source` in a private work directory
    pub fn new(source: &str, config: GxxConfig) -> std::io::Result<Self> {
        Self::from_sources(&CppSources::single(source), config)
    }

    /// Stage every file of `sources` in a private work directory
    pub fn from_sources(sources: &CppSources, config: GxxConfig) -> std::io::Result<Self> {
        let workdir = tempfile::Builder::new().prefix("fmcheck-").tempdir()?;
        for file in sources.files() {
            let target = workdir.path().join(&file.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, &file.content)?;
        }
        let companions = sources
            .companion_units()
            .into_iter()
            .map(|path| workdir.path().join(path))
            .collect();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        tracing::debug!(
            workdir = %workdir.path().display(),
            files = sources.len(),
            "staged C++ candidate"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                includes: sources.entry_includes(),
                companions,
                workdir,
                cache: DashMap::new(),
                counter: AtomicUsize::new(0),
                runtime,
            }),
        })
    }

    /// Compiler settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GxxConfig {
        &self.inner.config
    }

    /// Number of probes compiled so far
    #[must_use]
    pub fn probes_compiled(&self) -> usize {
        self.inner.counter.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for GxxRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GxxRuntime")
            .field("config", &self.inner.config)
            .field("workdir", &self.inner.workdir.path())
            .finish()
    }
}

impl CandidateRuntime for GxxRuntime {
    fn name(&self) -> &'static str {
        "g++"
    }

    fn instantiate(&self, type_name: &str) -> Result<Box<dyn CandidateObject>, InvocationError> {
        match self.inner.probe(type_name, &[])? {
            ProbeOutcome::Constructed => Ok(Box::new(ProbeObject {
                inner: Arc::clone(&self.inner),
                root: type_name.to_string(),
                chain: Vec::new(),
                type_name: type_name.to_string(),
            })),
            other => Err(InvocationError::UnsupportedResult(format!(
                "constructing '{type_name}' produced {other:?}"
            ))),
        }
    }
}

/// Object reached by constructing `root` and following `chain`
struct ProbeObject {
    inner: Arc<Inner>,
    root: String,
    chain: Vec<String>,
    type_name: String,
}

impl CandidateObject for ProbeObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn invoke(&mut self, operation: &str) -> Result<Value, InvocationError> {
        let mut chain = self.chain.clone();
        chain.push(operation.to_string());

        match self.inner.probe(&self.root, &chain)? {
            ProbeOutcome::Text(text) => Ok(Value::Text(text)),
            ProbeOutcome::Present => Ok(Value::Object(Box::new(ProbeObject {
                inner: Arc::clone(&self.inner),
                root: self.root.clone(),
                type_name: format!("{}.{operation}()", self.type_name),
                chain,
            }))),
            ProbeOutcome::Null => Ok(Value::Null),
            ProbeOutcome::Void => Ok(Value::Unit),
            ProbeOutcome::Constructed | ProbeOutcome::Opaque => Err(InvocationError::UnsupportedResult(
                format!("'{operation}' returned neither text nor an object reference"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
#include <string>
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
};
struct ConcreteCreatorA : Creator {
    Product* FactoryMethod() const override { return new ConcreteProductA(); }
};
struct Broken {
    std::string Explode() const { throw 42; }
};
int main() { return 0; }
"#;

    fn runtime() -> Option<GxxRuntime> {
        let config = GxxConfig::default();
        if !config.compiler_available() {
            eprintln!("g++ not available, skipping");
            return None;
        }
        Some(GxxRuntime::new(SOURCE, config).unwrap())
    }

    #[test]
    fn config_defaults_and_millis_fields() {
        let config: GxxConfig =
            serde_json::from_str(r#"{"compiler": "clang++", "probe_timeout_ms": 2500}"#).unwrap();
        assert_eq!(config.compiler, PathBuf::from("clang++"));
        assert_eq!(config.standard, "c++17");
        assert_eq!(config.probe_timeout, Duration::from_millis(2500));
        assert_eq!(config.compile_timeout, Duration::from_secs(60));
    }

    #[test]
    fn missing_compiler_is_reported_unavailable() {
        let config = GxxConfig::default().with_compiler("/nonexistent/fmcheck-g++");
        assert!(!config.compiler_available());
    }

    #[test]
    fn missing_compiler_surfaces_as_internal_error() {
        let config = GxxConfig::default().with_compiler("/nonexistent/fmcheck-g++");
        let runtime = GxxRuntime::new(SOURCE, config).unwrap();
        let err = runtime.instantiate("ConcreteProductA").err().unwrap();
        assert!(matches!(err, InvocationError::Internal(_)));
    }

    #[test]
    fn follows_factory_chain() {
        let Some(runtime) = runtime() else { return };
        let mut creator = runtime.instantiate("ConcreteCreatorA").ok().unwrap();
        let Value::Object(mut product) = creator.invoke("FactoryMethod").unwrap() else {
            panic!("factory should return an object");
        };
        assert!(matches!(product.invoke("Operation"), Ok(Value::Text(t)) if t == "A"));
    }

    #[test]
    fn abstract_type_fails_to_build() {
        let Some(runtime) = runtime() else { return };
        let err = runtime.instantiate("Product").err().unwrap();
        assert!(matches!(err, InvocationError::Build(_)));
    }

    #[test]
    fn uncaught_exception_is_raised() {
        let Some(runtime) = runtime() else { return };
        let mut broken = runtime.instantiate("Broken").ok().unwrap();
        assert!(matches!(broken.invoke("Explode"), Err(InvocationError::Raised(_))));
    }

    #[test]
    fn repeated_chains_are_memoized() {
        let Some(runtime) = runtime() else { return };
        let _ = runtime.instantiate("ConcreteProductA").ok().unwrap();
        let _ = runtime.instantiate("ConcreteProductA").ok().unwrap();
        assert_eq!(runtime.probes_compiled(), 1);
    }

    #[test]
    fn member_owned_product_is_not_freed_by_the_runtime() {
        const OWNED: &str = r#"
#include <string>
struct Product {
    virtual ~Product() = default;
    virtual std::string Operation() const = 0;
};
struct ConcreteProductA : Product {
    std::string Operation() const override { return "A"; }
};
struct ConcreteCreatorA {
    ConcreteProductA owned;
    Product* FactoryMethod() { return &owned; }
};
"#;
        let config = GxxConfig::default();
        if !config.compiler_available() {
            return;
        }
        let runtime = GxxRuntime::new(OWNED, config).unwrap();
        let mut creator = runtime.instantiate("ConcreteCreatorA").ok().unwrap();
        let Value::Object(mut product) = creator.invoke("FactoryMethod").unwrap() else {
            panic!("factory should return an object");
        };
        assert!(matches!(product.invoke("Operation"), Ok(Value::Text(t)) if t == "A"));
    }

    #[test]
    fn links_companion_translation_units() {
        let sources = CppSources::new()
            .with_file("Product.hpp", "#pragma once\n#include <string>\nstruct Product {\n    virtual ~Product() = default;\n    std::string Operation() const;\n};\n")
            .and_then(|s| s.with_file("product.cpp", "#include \"Product.hpp\"\nstd::string Product::Operation() const { return \"linked\"; }\n"))
            .and_then(|s| s.with_file("main.cpp", "#include \"Product.hpp\"\nint main() { return Product().Operation().empty(); }\n"))
            .unwrap();
        let config = GxxConfig::default();
        if !config.compiler_available() {
            return;
        }
        let runtime = GxxRuntime::from_sources(&sources, config).unwrap();
        let mut product = runtime.instantiate("Product").ok().unwrap();
        assert!(matches!(product.invoke("Operation"), Ok(Value::Text(t)) if t == "linked"));
    }
}
