//! Flat, exhaustive error taxonomy for the orchestrator (spec.md §7).
//!
//! Recoverable conditions (`PragmaUnresolved`, `CompilerLoadFailed`) are
//! handled locally by [`crate::service::CompilationService`] and never
//! escape as an `Err` from its public API — they become warnings attached
//! to a [`crate::events::CompilationResult`]. These variants exist so the
//! recovery path has a concrete value to log and attach, not so callers can
//! match on them.

use crate::release::ReleaseId;

/// Crate-wide result alias, mirroring the teacher's `error::Result`.
pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A pragma constraint was present but no loaded or available release
    /// satisfies it. Recovered by falling back to the bundled compiler.
    #[error("no compiler release satisfies the source's pragma constraint")]
    PragmaUnresolved,

    /// [`crate::registry::CompilerRegistry::load`] failed for the resolved
    /// release. Recovered by falling back to the bundled compiler; the
    /// in-flight entry for the release is dropped so a later call retries.
    #[error("failed to load compiler {release}: {source}")]
    CompilerLoadFailed {
        release: ReleaseId,
        #[source]
        source: RegistryError,
    },

    /// The compiler returned one or more `severity == error` diagnostics.
    /// Not retried; `gasInfo` may still be populated via the regex
    /// fallback.
    #[error("compiler reported {0} error diagnostic(s)")]
    CompilerDiagnosticError(usize),

    /// The compiler invocation itself failed (bad input, process crash).
    /// Not retried automatically.
    #[error("compiler invocation failed: {0}")]
    CompilerInvocationFailed(String),

    /// The import resolver returned an error for an unresolved import path.
    /// The compiler treats this as a diagnostic error; this variant exists
    /// to carry the resolver's own message before it's folded into
    /// [`AnalysisError::CompilerDiagnosticError`].
    #[error("import {path:?} unresolved: {message}")]
    ImportUnresolved { path: String, message: String },
}

/// Errors from the compiler version pool (spec.md §4.3), kept distinct
/// from [`AnalysisError`] because registry failures are a layer the
/// service recovers from rather than a condition it surfaces.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("release {0} is not available from this registry source")]
    NotAvailable(ReleaseId),

    #[error("{0}")]
    Message(String),

    #[error("installation of {release} failed: {source}")]
    InstallationFailed {
        release: ReleaseId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RegistryError {
    pub fn msg(msg: impl std::fmt::Display) -> Self {
        Self::Message(msg.to_string())
    }
}
