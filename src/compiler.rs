//! The `Compiler` capability boundary (spec.md §6) and one concrete
//! implementation that shells out to a real `solc` binary.
//!
//! `Compiler::compile` is synchronous, matching the teacher's own
//! `compilers::Compiler` trait (`src/compilers/mod.rs`) — the standard-JSON
//! contract itself is "synchronous or async" per spec.md §6, and keeping
//! the trait synchronous lets [`crate::service::CompilationService`] run
//! compilation on a blocking thread (`tokio::task::spawn_blocking`) rather
//! than requiring an async-trait dependency the teacher never carries.

use crate::{error::Result, release::ReleaseId, standard_json::StandardJsonOutput};
use solang_parser::pt::SourceUnitPart;
use std::{
    collections::HashMap,
    process::{Command, Stdio},
    sync::Arc,
};

/// Invoked synchronously by a [`Compiler`] for each import path it cannot
/// resolve from the sources already handed to it (spec.md §6).
pub trait ImportResolver: Send + Sync {
    fn resolve(&self, import_path: &str) -> std::result::Result<String, String>;
}

/// A loaded, invocable compiler bound to one [`ReleaseId`] (spec.md's
/// `CompilerHandle`). Implementations must be safe to call concurrently —
/// the compiler is pure in its input.
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        input: &crate::standard_json::StandardJsonInput,
        import_resolver: Option<&dyn ImportResolver>,
    ) -> Result<StandardJsonOutput>;

    fn release(&self) -> &ReleaseId;
}

pub type CompilerHandle = Arc<dyn Compiler>;

/// Walks `content` for `import "..."`/`import {X} from "..."` directives
/// via [`solang_parser`], the same Solidity parser
/// [`crate::analysis::AnalysisEngine`] uses for its signature-only pass
/// (grounded on the teacher's own `collect_contract_names`, `src/lib.rs`,
/// which matches `SourceUnitPart::ContractDefinition` off the identical
/// parse tree). A parse failure yields no imports rather than propagating
/// — callers fall back to whatever sources were already supplied.
fn parse_import_paths(content: &str) -> Vec<String> {
    let Ok((unit, _)) = solang_parser::parse(content, 0) else { return Vec::new() };
    unit.0
        .into_iter()
        .filter_map(|part| match part {
            SourceUnitPart::ImportDirective(import) => Some(import_path_of(&import)),
            _ => None,
        })
        .collect()
}

fn import_path_of(import: &solang_parser::pt::Import) -> String {
    match import {
        solang_parser::pt::Import::Plain(path, _) => import_path_string(path),
        solang_parser::pt::Import::GlobalSymbol(path, _, _) => import_path_string(path),
        solang_parser::pt::Import::Rename(path, _, _) => import_path_string(path),
    }
}

fn import_path_string(path: &solang_parser::pt::ImportPath) -> String {
    match path {
        solang_parser::pt::ImportPath::Filename(literal) => literal.string.clone(),
        solang_parser::pt::ImportPath::Path(identifier_path) => identifier_path
            .identifiers
            .iter()
            .map(|identifier| identifier.name.clone())
            .collect::<Vec<_>>()
            .join("."),
    }
}

/// Recursively pulls in every import reachable from `entry_content` via
/// `resolver`, keyed by whatever path each import directive names. Missing
/// imports surface as `ImportUnresolved`, which [`CompilationService`]
/// (spec.md §7) folds into a `CompilerDiagnosticError`.
fn resolve_imports(
    entry_path: &str,
    entry_content: &str,
    resolver: &dyn ImportResolver,
) -> Result<HashMap<String, String>> {
    let mut sources = HashMap::new();
    sources.insert(entry_path.to_string(), entry_content.to_string());
    let mut frontier = parse_import_paths(entry_content);

    while let Some(path) = frontier.pop() {
        if sources.contains_key(&path) {
            continue;
        }
        let contents = resolver.resolve(&path).map_err(|message| {
            crate::error::AnalysisError::ImportUnresolved { path: path.clone(), message }
        })?;
        frontier.extend(parse_import_paths(&contents));
        sources.insert(path, contents);
    }

    Ok(sources)
}

/// Invokes a real `solc` binary with `--standard-json` on stdin (spec.md
/// §6's "standard-JSON interface of the Solidity compiler"). The binary
/// path normally comes from [`crate::registry::SvmRegistrySource`]'s
/// installed release directory.
pub struct ProcessSolcCompiler {
    binary_path: std::path::PathBuf,
    release: ReleaseId,
}

impl ProcessSolcCompiler {
    pub fn new(binary_path: impl Into<std::path::PathBuf>, release: ReleaseId) -> Self {
        Self { binary_path: binary_path.into(), release }
    }
}

impl Compiler for ProcessSolcCompiler {
    fn compile(
        &self,
        input: &crate::standard_json::StandardJsonInput,
        import_resolver: Option<&dyn ImportResolver>,
    ) -> Result<StandardJsonOutput> {
        let mut input = input.clone();

        if let Some(resolver) = import_resolver {
            for (path, source) in input.sources.clone() {
                let resolved = resolve_imports(&path, &source.content, resolver)?;
                for (import_path, content) in resolved {
                    input
                        .sources
                        .entry(import_path)
                        .or_insert(crate::standard_json::SourceInput { content });
                }
            }
        }

        let payload = serde_json::to_vec(&input).map_err(|e| {
            crate::error::AnalysisError::CompilerInvocationFailed(format!(
                "failed to serialize standard-json input: {e}"
            ))
        })?;

        let mut child = Command::new(&self.binary_path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                crate::error::AnalysisError::CompilerInvocationFailed(format!(
                    "failed to spawn {}: {e}",
                    self.binary_path.display()
                ))
            })?;

        {
            use std::io::Write;
            let stdin = child.stdin.as_mut().expect("stdin was piped");
            stdin.write_all(&payload).map_err(|e| {
                crate::error::AnalysisError::CompilerInvocationFailed(format!(
                    "failed to write standard-json input: {e}"
                ))
            })?;
        }

        let output = child.wait_with_output().map_err(|e| {
            crate::error::AnalysisError::CompilerInvocationFailed(format!(
                "failed to read solc output: {e}"
            ))
        })?;

        serde_json::from_slice(&output.stdout).map_err(|e| {
            crate::error::AnalysisError::CompilerInvocationFailed(format!(
                "failed to parse solc standard-json output: {e}"
            ))
        })
    }

    fn release(&self) -> &ReleaseId {
        &self.release
    }
}

#[cfg(test)]
pub mod testutil {
    use super::*;
    use std::sync::Mutex;

    /// Scripted `Compiler` double: returns a preset response for every
    /// `compile` call and records the inputs it was given, so tests can
    /// assert on what [`crate::service::CompilationService`] built without
    /// needing a real `solc` binary.
    pub struct FakeCompiler {
        pub release: ReleaseId,
        pub response: StandardJsonOutput,
        pub calls: Mutex<Vec<crate::standard_json::StandardJsonInput>>,
    }

    impl FakeCompiler {
        pub fn new(release: ReleaseId, response: StandardJsonOutput) -> Self {
            Self { release, response, calls: Mutex::new(Vec::new()) }
        }
    }

    impl Compiler for FakeCompiler {
        fn compile(
            &self,
            input: &crate::standard_json::StandardJsonInput,
            _import_resolver: Option<&dyn ImportResolver>,
        ) -> Result<StandardJsonOutput> {
            self.calls.lock().expect("lock poisoned").push(input.clone());
            Ok(self.response.clone())
        }

        fn release(&self) -> &ReleaseId {
            &self.release
        }
    }

    pub struct FailingResolver;

    impl ImportResolver for FailingResolver {
        fn resolve(&self, import_path: &str) -> std::result::Result<String, String> {
            Err(format!("no such file: {import_path}"))
        }
    }
}
