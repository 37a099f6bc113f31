//! The data model shared across the orchestrator (spec.md §3) and the
//! events it publishes (spec.md §4.5, §5).

use crate::{fingerprint::Fingerprint, release::ReleaseId};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};

/// A document/buffer identifier, as handed to the crate by its host. The
/// crate treats it as an opaque string key; a host typically uses an LSP
/// `file://` URI here, but nothing requires that shape.
pub type Uri = Arc<str>;

/// What prompted a compilation request (spec.md §4.5 scheduling table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    FileOpen,
    FileSave,
    Manual,
    Change,
    SettingsChange,
    PragmaChange,
}

impl Trigger {
    /// Whether this trigger runs immediately (no debounce) per the
    /// scheduling table.
    pub fn is_immediate(self) -> bool {
        !matches!(self, Trigger::Change)
    }

    /// Whether this trigger forces recompilation even on an otherwise
    /// fresh cache hit.
    pub fn forces_recompile(self) -> bool {
        matches!(self, Trigger::SettingsChange | Trigger::PragmaChange)
    }
}

/// Diagnostic severity, preserved faithfully from the compiler's
/// standard-JSON `severity` field (Open Question 1, SPEC_FULL.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single human-facing diagnostic, uniform whether it came from the
/// compiler or from the signature-only collision pass (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: Option<u32>,
}

/// A per-function gas estimate: either a finite value or the sentinel
/// "unbounded" marker. Modeled as a sum type rather than a magic integer
/// so "infinite" can never be mistaken for a real measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum GasAmount {
    Finite(u64),
    Infinite,
}

impl fmt::Display for GasAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GasAmount::Finite(n) => write!(f, "{n}"),
            GasAmount::Infinite => write!(f, "\u{221e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

/// A function's source location, 1-based and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub line: u32,
    pub end_line: u32,
}

/// Per-function record emitted by [`crate::selector::SelectorEngine`]
/// (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasInfo {
    pub name: String,
    /// `0x` + 8 lowercase hex chars.
    pub selector: String,
    pub gas: GasAmount,
    pub loc: LineSpan,
    pub visibility: Visibility,
    pub state_mutability: StateMutability,
    pub warnings: Vec<String>,
}

/// A simplified per-function view a host can render directly, derived
/// from [`GasInfo`] by [`crate::analysis::AnalysisEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub selector: String,
    pub gas: GasAmount,
    pub warnings: Vec<String>,
}

/// Raw compilation output (spec.md §3). `success` is fixed to
/// `errors.is_empty()` per Open Question 2 (SPEC_FULL.md §9), regardless
/// of what an individual compiler backend reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationOutput {
    pub success: bool,
    pub version: Option<ReleaseId>,
    pub gas_info: Vec<GasInfo>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// `severity == info` diagnostics, kept distinct from `errors`/
    /// `warnings` so nothing the compiler reported is silently dropped.
    pub infos: Vec<Diagnostic>,
    /// `true` unless the pragma went unsatisfied and the bundled compiler
    /// was substituted (spec.md §4.2 failure modes).
    pub is_exact: bool,
    pub bytecode: Option<String>,
    pub deployed_bytecode: Option<String>,
}

impl CompilationOutput {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// [`CompilationOutput`] plus request-level metadata (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationResult {
    pub uri: Uri,
    pub output: CompilationOutput,
    pub timestamp_millis: u64,
    pub trigger: Trigger,
    pub fingerprint: Fingerprint,
    pub cached: bool,
}

/// What a subscriber observes for a buffer (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveAnalysis {
    pub gas_estimates: HashMap<String, GasEstimate>,
    pub diagnostics: Vec<Diagnostic>,
    pub is_pending: bool,
    pub gas_info: Vec<GasInfo>,
}

impl LiveAnalysis {
    pub fn pending(gas_info: Vec<GasInfo>, diagnostics: Vec<Diagnostic>) -> Self {
        Self { gas_estimates: HashMap::new(), diagnostics, is_pending: true, gas_info }
    }

    pub fn from_output(output: &CompilationOutput) -> Self {
        let mut gas_estimates = HashMap::with_capacity(output.gas_info.len());
        for info in &output.gas_info {
            gas_estimates.insert(
                info.name.clone(),
                GasEstimate {
                    selector: info.selector.clone(),
                    gas: info.gas,
                    warnings: info.warnings.clone(),
                },
            );
        }
        let mut diagnostics: Vec<Diagnostic> = output.errors.clone();
        diagnostics.extend(output.warnings.clone());
        Self { gas_estimates, diagnostics, is_pending: false, gas_info: output.gas_info.clone() }
    }
}

/// Lifecycle events published by [`crate::service::CompilationService`]
/// (spec.md §4.5). Within a single compilation, `Start` precedes any
/// `VersionDownloading`/`VersionReady` precedes `Success`/`Error`.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    CompilationStart { uri: Uri, version: Option<ReleaseId> },
    CompilationSuccess { uri: Uri, result: Arc<CompilationResult> },
    CompilationError { uri: Uri, errors: Vec<Diagnostic>, result: Option<Arc<CompilationResult>> },
    VersionDownloading { release: ReleaseId },
    VersionReady { release: ReleaseId },
}

/// Published by [`crate::analysis::AnalysisEngine`] once a background
/// compilation completes (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct AnalysisReady {
    pub uri: Uri,
    pub analysis: Arc<LiveAnalysis>,
}
