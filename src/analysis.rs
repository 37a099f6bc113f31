//! `AnalysisEngine`: the host-facing façade (spec.md §4.6). Returns an
//! immediate signature-only view on every edit while a background
//! [`crate::service::CompilationService`] compilation runs, then republishes
//! the full view once that compilation completes.

use crate::{
    events::{
        AnalysisReady, Diagnostic, GasAmount, GasEstimate, GasInfo, LineSpan, LiveAnalysis,
        Severity, StateMutability, Trigger, Uri, Visibility,
    },
    fingerprint::Fingerprint,
    selector,
    service::{CompilationService, ServiceStats},
    settings::{CompilerSettings, CompilerSettingsPatch},
};
use once_cell::sync::Lazy;
use regex::Regex;
use solang_parser::{
    helpers::CodeLocation,
    pt::{
        ContractPart, Expression, FunctionAttribute, FunctionTy, Parameter, SourceUnitPart, Type,
        Visibility as PtVisibility,
    },
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, Mutex};

struct EngineState {
    signature_cache: HashMap<Fingerprint, Arc<LiveAnalysis>>,
    full_cache: HashMap<Fingerprint, Arc<LiveAnalysis>>,
    uri_to_fingerprint: HashMap<Uri, Fingerprint>,
}

/// The crate's top-level entry point. Wraps a [`CompilationService`] with
/// the two-tier cache and signature-only fast path spec.md §4.6 describes;
/// hosts drive the crate through this type, not `CompilationService`
/// directly.
#[derive(Clone)]
pub struct AnalysisEngine {
    service: CompilationService,
    state: Arc<Mutex<EngineState>>,
    ready: broadcast::Sender<AnalysisReady>,
}

impl AnalysisEngine {
    pub fn new(service: CompilationService) -> Self {
        let (ready, _) = broadcast::channel(256);
        let state = EngineState {
            signature_cache: HashMap::new(),
            full_cache: HashMap::new(),
            uri_to_fingerprint: HashMap::new(),
        };
        let engine = Self { service, state: Arc::new(Mutex::new(state)), ready };
        engine.spawn_event_bridge();
        engine
    }

    /// Bridges `CompilationService`'s `compilation:success`/`compilation:error`
    /// events into this engine's own cache and `analysisReady` fan-out, so a
    /// background compilation kicked off by `onOpen`/`onChange` updates the
    /// full cache without its caller having to await it.
    fn spawn_event_bridge(&self) {
        let mut events = self.service.subscribe();
        let state = self.state.clone();
        let ready = self.ready.clone();
        tokio::task::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(crate::events::ServiceEvent::CompilationSuccess { uri, result }) => {
                        let analysis = Arc::new(LiveAnalysis::from_output(&result.output));
                        state.lock().await.full_cache.insert(result.fingerprint, analysis.clone());
                        let _ = ready.send(AnalysisReady { uri, analysis });
                    }
                    Ok(crate::events::ServiceEvent::CompilationError { uri, result: Some(result), .. }) => {
                        let analysis = Arc::new(LiveAnalysis::from_output(&result.output));
                        state.lock().await.full_cache.insert(result.fingerprint, analysis.clone());
                        let _ = ready.send(AnalysisReady { uri, analysis });
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // A lagging subscriber resynchronizes via
                        // `get_cached_analysis`/`get_stats`, per spec.md §5.
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisReady> {
        self.ready.subscribe()
    }

    /// Step 1-5 of spec.md §4.6's `onOpen`: immediate (non-debounced)
    /// background compilation, returning the cached full view or a fresh
    /// signature-only view.
    pub async fn on_open(&self, uri: Uri, source: Arc<str>) -> Arc<LiveAnalysis> {
        self.analyze(uri, source, Trigger::FileOpen).await
    }

    /// As `on_open`, but schedules the background compilation through the
    /// `change` debounced trigger.
    pub async fn on_change(&self, uri: Uri, source: Arc<str>) -> Arc<LiveAnalysis> {
        self.analyze(uri, source, Trigger::Change).await
    }

    async fn analyze(&self, uri: Uri, source: Arc<str>, trigger: Trigger) -> Arc<LiveAnalysis> {
        let fingerprint = Fingerprint::of(source.as_bytes());

        {
            let mut state = self.state.lock().await;
            state.uri_to_fingerprint.insert(uri.clone(), fingerprint);
            if let Some(full) = state.full_cache.get(&fingerprint) {
                return full.clone();
            }
        }

        let signature_view = {
            let mut state = self.state.lock().await;
            if let Some(cached) = state.signature_cache.get(&fingerprint) {
                cached.clone()
            } else {
                let view = Arc::new(build_signature_view(&source));
                state.signature_cache.insert(fingerprint, view.clone());
                view
            }
        };

        let service = self.service.clone();
        tokio::task::spawn(async move {
            service.compile(uri, source, trigger, None).await;
        });

        signature_view
    }

    pub async fn get_cached_analysis(&self, uri: &Uri) -> Option<Arc<LiveAnalysis>> {
        let state = self.state.lock().await;
        let fingerprint = state.uri_to_fingerprint.get(uri)?;
        state
            .full_cache
            .get(fingerprint)
            .or_else(|| state.signature_cache.get(fingerprint))
            .cloned()
    }

    pub async fn update_compiler_settings(&self, patch: CompilerSettingsPatch) {
        self.service.update_settings(patch).await;
        self.state.lock().await.full_cache.clear();
    }

    pub async fn get_compiler_settings(&self) -> CompilerSettings {
        self.service.get_settings().await
    }

    pub async fn get_stats(&self) -> ServiceStats {
        self.service.get_stats().await
    }
}

/// Builds a signature-only [`LiveAnalysis`]: canonical signatures and
/// selectors parsed directly from `source` with [`solang_parser`] (spec.md
/// §4.6 step 3), plus the selector-collision diagnostic pass (spec.md
/// §4.6's "Collision diagnostic"). No gas figures are available yet —
/// `gasInfo` entries carry `GasAmount::Finite(0)` and `isPending = true`
/// tells a host not to render them as real numbers.
fn build_signature_view(source: &str) -> LiveAnalysis {
    let functions = parse_signatures(source);

    let mut by_selector: HashMap<String, Vec<&ParsedFunction>> = HashMap::new();
    for function in &functions {
        if matches!(function.visibility, Visibility::Public | Visibility::External) {
            by_selector.entry(function.selector.clone()).or_default().push(function);
        }
    }

    let mut diagnostics = Vec::new();
    for (selector, colliding) in &by_selector {
        if colliding.len() < 2 {
            continue;
        }
        for function in colliding {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                message: format!(
                    "selector {selector} is shared by {} other function(s): {}",
                    colliding.len() - 1,
                    colliding
                        .iter()
                        .map(|f| f.signature.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                line: Some(function.line),
            });
        }
    }

    let mut gas_estimates = HashMap::with_capacity(functions.len());
    let mut gas_info = Vec::with_capacity(functions.len());
    for function in &functions {
        let estimate = GasEstimate {
            selector: function.selector.clone(),
            gas: GasAmount::Finite(0),
            warnings: Vec::new(),
        };
        gas_estimates.insert(function.name.clone(), estimate);
        gas_info.push(GasInfo {
            name: function.name.clone(),
            selector: function.selector.clone(),
            gas: GasAmount::Finite(0),
            loc: LineSpan { line: function.line, end_line: function.line },
            visibility: function.visibility,
            state_mutability: function.state_mutability,
            warnings: Vec::new(),
        });
    }

    LiveAnalysis { gas_estimates, diagnostics, is_pending: true, gas_info }
}

struct ParsedFunction {
    name: String,
    signature: String,
    selector: String,
    visibility: Visibility,
    state_mutability: StateMutability,
    line: u32,
}

/// Parses `source` with [`solang_parser`] and extracts one [`ParsedFunction`]
/// per named function across every contract/interface/library (spec.md
/// §4.6's "lightweight source scan"). A source the parser rejects outright
/// (mid-edit, unbalanced braces) yields an empty list rather than an error
/// — the authoritative diagnostics still arrive via the background
/// compilation.
fn parse_signatures(source: &str) -> Vec<ParsedFunction> {
    let Ok((unit, _)) = solang_parser::parse(source, 0) else { return Vec::new() };
    let line_index = crate::ast::LineIndex::new(source);

    let mut functions = Vec::new();
    for part in unit.0 {
        let SourceUnitPart::ContractDefinition(contract) = part else { continue };
        for part in contract.parts {
            let ContractPart::FunctionDefinition(function) = part else { continue };
            if function.ty != FunctionTy::Function {
                continue;
            }
            let Some(name) = function.name.as_ref().map(|id| id.name.clone()) else { continue };

            let types: Vec<String> =
                function.params.iter().filter_map(|(_, param)| param.as_ref()).map(parameter_type).collect();
            let signature = format!("{name}({})", types.join(","));
            let selector = selector::selector_of(&signature);

            let visibility = function
                .attributes
                .iter()
                .find_map(|attr| match attr {
                    FunctionAttribute::Visibility(PtVisibility::External(_)) => Some(Visibility::External),
                    FunctionAttribute::Visibility(PtVisibility::Public(_)) => Some(Visibility::Public),
                    FunctionAttribute::Visibility(PtVisibility::Internal(_)) => Some(Visibility::Internal),
                    FunctionAttribute::Visibility(PtVisibility::Private(_)) => Some(Visibility::Private),
                    _ => None,
                })
                .unwrap_or(Visibility::Internal);

            let state_mutability = function
                .attributes
                .iter()
                .find_map(|attr| match attr {
                    FunctionAttribute::Mutability(mutability) => {
                        Some(mutability_of(&format!("{mutability:?}")))
                    }
                    _ => None,
                })
                .unwrap_or(StateMutability::Nonpayable);

            let line = line_index.line_at(function.loc.start());
            functions.push(ParsedFunction { name, signature, selector, visibility, state_mutability, line });
        }
    }
    functions
}

static PURE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)pure").expect("valid regex"));
static VIEW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)view").expect("valid regex"));
static PAYABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)payable").expect("valid regex"));

/// `solang_parser::pt::Mutability` has no `Display` guaranteed stable
/// across its own versions for pattern matching here, so the variant's
/// `Debug` text is classified instead — cheap and immune to field-name
/// churn in the upstream enum.
fn mutability_of(debug_text: &str) -> StateMutability {
    if PURE_RE.is_match(debug_text) {
        StateMutability::Pure
    } else if VIEW_RE.is_match(debug_text) {
        StateMutability::View
    } else if PAYABLE_RE.is_match(debug_text) {
        StateMutability::Payable
    } else {
        StateMutability::Nonpayable
    }
}

/// Renders a parameter's type expression into its canonical ABI string
/// (spec.md §4.4a applied at parse time rather than from a solc AST).
/// Mapping types cannot appear in a function's external parameter list, so
/// unlike [`crate::selector::normalize_type`] this never needs to render
/// one.
fn parameter_type(param: &Parameter) -> String {
    type_of(&param.ty)
}

fn type_of(expr: &Expression) -> String {
    match expr {
        Expression::Type(_, ty) => builtin_type_of(ty),
        Expression::Variable(ident) => ident.name.clone(),
        Expression::ArraySubscript(_, inner, _) => format!("{}[]", type_of(inner)),
        Expression::MemberAccess(_, lhs, rhs) => format!("{}.{}", type_of(lhs), rhs.name),
        _ => "bytes".to_string(),
    }
}

fn builtin_type_of(ty: &Type) -> String {
    match ty {
        Type::Address => "address".to_string(),
        Type::AddressPayable => "address".to_string(),
        Type::Payable => "address".to_string(),
        Type::Bool => "bool".to_string(),
        Type::String => "string".to_string(),
        Type::Int(size) => format!("int{size}"),
        Type::Uint(size) => format!("uint{size}"),
        Type::Bytes(size) => format!("bytes{size}"),
        Type::DynamicBytes => "bytes".to_string(),
        Type::Mapping { .. } => "bytes".to_string(),
        Type::Function { .. } => "bytes".to_string(),
        Type::Rational => "bytes".to_string(),
    }
}
