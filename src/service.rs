//! `CompilationService`: the single-flight compilation orchestrator
//! (spec.md §4.5). Accepts `(uri, source, trigger)` requests, resolves the
//! compiler via [`crate::pragma`] + [`crate::registry`], debounces or runs
//! immediately depending on trigger, dedupes in-flight work by
//! fingerprint, caches results, and publishes lifecycle events.

use crate::{
    cache::FingerprintCache,
    compiler::{Compiler, ImportResolver},
    error::{AnalysisError, RegistryError, Result},
    events::{
        CompilationOutput, CompilationResult, Diagnostic, Severity, ServiceEvent, Trigger, Uri,
    },
    fingerprint::Fingerprint,
    pragma, registry,
    release::ReleaseId,
    selector,
    settings::{CompilerSettings, CompilerSettingsPatch, EngineConfig},
    standard_json::{StandardJsonInput, StandardJsonOutput},
};
use futures_util::future::{FutureExt, Shared};
use semver::Version;
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};

type SharedCompile = Shared<Pin<Box<dyn Future<Output = Arc<CompilationResult>> + Send>>>;

struct ServiceState {
    fresh_cache: FingerprintCache<Arc<CompilationResult>>,
    in_flight: HashMap<Fingerprint, SharedCompile>,
    uri_to_fingerprint: HashMap<Uri, Fingerprint>,
    debounce_timers: HashMap<Uri, JoinHandle<()>>,
    settings: CompilerSettings,
}

/// Running counters for `getStats()` (spec.md §6).
#[derive(Debug, Clone)]
pub struct ServiceStats {
    pub cache_size: usize,
    pub cached_versions: Vec<ReleaseId>,
    pub pending_compilations: usize,
}

/// Cloneable handle to the orchestrator; clones share state via `Arc`, the
/// same sharing model [`crate::registry::CompilerRegistry`] uses.
#[derive(Clone)]
pub struct CompilationService {
    registry: registry::CompilerRegistry,
    config: EngineConfig,
    state: Arc<Mutex<ServiceState>>,
    events: tokio::sync::broadcast::Sender<ServiceEvent>,
}

impl CompilationService {
    pub fn new(registry: registry::CompilerRegistry, config: EngineConfig) -> Self {
        let (events, _) = tokio::sync::broadcast::channel(256);
        let state = ServiceState {
            fresh_cache: FingerprintCache::new(
                config.cache_ttl(),
                config.cache_capacity(),
                config.eviction_fraction(),
            ),
            in_flight: HashMap::new(),
            uri_to_fingerprint: HashMap::new(),
            debounce_timers: HashMap::new(),
            settings: CompilerSettings::default(),
        };
        Self { registry, config, state: Arc::new(Mutex::new(state)), events }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }

    /// Cancels the pending debounce timer for `uri`, if any. Does not
    /// cancel a compilation already past the debounce stage (spec.md
    /// §4.5 "Cancellation").
    pub async fn cancel_pending(&self, uri: &Uri) {
        let mut state = self.state.lock().await;
        if let Some(handle) = state.debounce_timers.remove(uri) {
            handle.abort();
        }
    }

    /// Merges `patch` into the current settings, clears the full-result
    /// cache, and notifies (spec.md §4.5 "Settings"). Subsequent calls
    /// recompile.
    pub async fn update_settings(&self, patch: CompilerSettingsPatch) {
        let mut state = self.state.lock().await;
        state.settings = patch.apply_to(&state.settings);
        state.fresh_cache.clear();
    }

    pub async fn get_settings(&self) -> CompilerSettings {
        self.state.lock().await.settings.clone()
    }

    pub async fn get_stats(&self) -> ServiceStats {
        let state = self.state.lock().await;
        ServiceStats {
            cache_size: state.fresh_cache.len(),
            cached_versions: self.registry.list(),
            pending_compilations: state.in_flight.len(),
        }
    }

    /// The public contract (spec.md §4.5): `compile(uri, source, trigger,
    /// importResolver?) → Future<CompilationResult>`.
    #[tracing::instrument(skip(self, source, import_resolver), fields(uri = %uri))]
    pub async fn compile(
        &self,
        uri: Uri,
        source: Arc<str>,
        trigger: Trigger,
        import_resolver: Option<Arc<dyn ImportResolver>>,
    ) -> Arc<CompilationResult> {
        let fingerprint = Fingerprint::of(source.as_bytes());

        {
            let mut state = self.state.lock().await;
            state.uri_to_fingerprint.insert(uri.clone(), fingerprint);
            if !trigger.forces_recompile() {
                if let Some(cached) = state.fresh_cache.get_fresh(&fingerprint) {
                    tracing::debug!(%fingerprint, "cache hit");
                    return Arc::new(CompilationResult { cached: true, ..(*cached).clone() });
                }
            }
            if let Some(existing) = state.in_flight.get(&fingerprint) {
                tracing::debug!(%fingerprint, "joining in-flight compilation");
                return existing.clone().await;
            }
        }

        if trigger.is_immediate() {
            self.cancel_pending(&uri).await;
            self.run_compilation(uri, source, fingerprint, trigger, import_resolver).await
        } else {
            self.schedule_debounced(uri, source, fingerprint, trigger, import_resolver).await
        }
    }

    /// Registers (replacing any prior) a per-uri idle timer (spec.md
    /// §4.5 step 4). On fire, proceeds to the in-flight install + compile
    /// path exactly as an immediate trigger would.
    async fn schedule_debounced(
        &self,
        uri: Uri,
        source: Arc<str>,
        fingerprint: Fingerprint,
        trigger: Trigger,
        import_resolver: Option<Arc<dyn ImportResolver>>,
    ) -> Arc<CompilationResult> {
        let debounce = self.config.debounce();
        let this = self.clone();
        let uri_for_timer = uri.clone();
        let source_for_timer = source.clone();

        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = tokio::task::spawn(async move {
            sleep(debounce).await;
            let result = this
                .run_compilation(
                    uri_for_timer.clone(),
                    source_for_timer,
                    fingerprint,
                    trigger,
                    import_resolver,
                )
                .await;
            this.state.lock().await.debounce_timers.remove(&uri_for_timer);
            let _ = tx.send(result);
        });

        {
            let mut state = self.state.lock().await;
            if let Some(previous) = state.debounce_timers.insert(uri.clone(), handle) {
                previous.abort();
            }
        }

        match rx.await {
            Ok(result) => result,
            // The timer was aborted (superseded or cancelled) before firing.
            Err(_) => {
                let state = self.state.lock().await;
                state
                    .fresh_cache
                    .get_any(&fingerprint)
                    .unwrap_or_else(|| pending_placeholder(uri, fingerprint, trigger))
            }
        }
    }

    /// Installs an in-flight future under `fingerprint` and performs the
    /// work outside the lock (spec.md §4.5 step 5).
    async fn run_compilation(
        &self,
        uri: Uri,
        source: Arc<str>,
        fingerprint: Fingerprint,
        trigger: Trigger,
        import_resolver: Option<Arc<dyn ImportResolver>>,
    ) -> Arc<CompilationResult> {
        let shared: SharedCompile = {
            let mut state = self.state.lock().await;
            if let Some(existing) = state.in_flight.get(&fingerprint) {
                existing.clone()
            } else {
                let this = self.clone();
                let uri = uri.clone();
                let future: Pin<Box<dyn Future<Output = Arc<CompilationResult>> + Send>> =
                    Box::pin(async move {
                        this.compile_uncached(uri, source, fingerprint, trigger, import_resolver)
                            .await
                    });
                let shared = future.shared();
                state.in_flight.insert(fingerprint, shared.clone());
                shared
            }
        };

        let result = shared.await;

        let mut state = self.state.lock().await;
        state.in_flight.remove(&fingerprint);
        result
    }

    async fn compile_uncached(
        &self,
        uri: Uri,
        source: Arc<str>,
        fingerprint: Fingerprint,
        trigger: Trigger,
        import_resolver: Option<Arc<dyn ImportResolver>>,
    ) -> Arc<CompilationResult> {
        let settings = self.get_settings().await;

        let (compiler, release, is_exact) = self.resolve_compiler(&uri, &source).await;

        crate::report::compilation_start(&uri, Some(&release));
        let _ = self.events.send(ServiceEvent::CompilationStart {
            uri: uri.clone(),
            version: Some(release.clone()),
        });

        let input = StandardJsonInput::single_source(
            uri.to_string(),
            source.to_string(),
            settings.to_standard_json(),
        );

        // `Compiler::compile` is synchronous and CPU-bound (it shells out
        // to a real `solc` process); run it on a blocking thread so it
        // never stalls the executor the debounce timers and other
        // compilations share (spec.md §5 "an implementation MAY use a
        // thread pool for compile calls, which are CPU-bound").
        let output = tokio::task::spawn_blocking(move || {
            compiler.compile(&input, import_resolver.as_deref())
        })
        .await
        .unwrap_or_else(|join_error| {
            Err(AnalysisError::CompilerInvocationFailed(join_error.to_string()))
        });
        let compilation_output = self.build_output(output, release.clone(), is_exact, &source);

        let result = Arc::new(CompilationResult {
            uri: uri.clone(),
            output: compilation_output,
            timestamp_millis: now_millis(),
            trigger,
            fingerprint,
            cached: false,
        });

        {
            let mut state = self.state.lock().await;
            state.fresh_cache.insert(fingerprint, result.clone());
        }

        if result.output.success() {
            crate::report::compilation_success(&uri, &fingerprint, false);
            let _ = self.events.send(ServiceEvent::CompilationSuccess {
                uri: uri.clone(),
                result: result.clone(),
            });
        } else {
            crate::report::compilation_error(&uri, result.output.errors.len());
            let _ = self.events.send(ServiceEvent::CompilationError {
                uri,
                errors: result.output.errors.clone(),
                result: Some(result.clone()),
            });
        }

        result
    }

    /// Resolves `pragma → release → CompilerHandle`, falling back to the
    /// bundled compiler on either a pragma mismatch or a registry load
    /// failure (spec.md §4.2, §4.5 step 5a-b).
    async fn resolve_compiler(
        &self,
        uri: &Uri,
        source: &str,
    ) -> (Arc<dyn Compiler>, ReleaseId, bool) {
        let Some(parsed) = pragma::extract_pragma(source) else {
            let bundled = self.registry.bundled();
            let release = bundled.release().clone();
            return (bundled, release, true);
        };

        let constraint = match parsed {
            Ok(constraint) => constraint,
            Err(_) => {
                crate::report::pragma_fallback(uri, "unparseable pragma");
                let bundled = self.registry.bundled();
                let release = bundled.release().clone();
                return (bundled, release, false);
            }
        };

        let available: Vec<Version> =
            self.registry.list().into_iter().map(|release| release.version).collect();
        let resolved_version = match pragma::resolve(&constraint, &available) {
            Ok(version) => version.clone(),
            Err(_) => {
                crate::report::pragma_fallback(uri, "no release satisfies pragma");
                let bundled = self.registry.bundled();
                let release = bundled.release().clone();
                return (bundled, release, false);
            }
        };

        let release = self
            .registry
            .list()
            .into_iter()
            .find(|release| release.version == resolved_version)
            .unwrap_or_else(|| ReleaseId::new(resolved_version, "unknown"));

        if self.registry.cached(&release).await.is_none() {
            let _ = self
                .events
                .send(ServiceEvent::VersionDownloading { release: release.clone() });
        }

        match self.registry.load(release.clone()).await {
            Ok(handle) => {
                let _ = self.events.send(ServiceEvent::VersionReady { release: release.clone() });
                (handle, release, true)
            }
            Err(source) => {
                let error = AnalysisError::CompilerLoadFailed {
                    release: release.clone(),
                    source: RegistryError::msg(source.to_string()),
                };
                tracing::warn!(error = %error, "falling back to bundled compiler");
                let bundled = self.registry.bundled();
                let fallback_release = bundled.release().clone();
                (bundled, fallback_release, false)
            }
        }
    }

    /// Classifies diagnostics by severity and attaches gas info (spec.md
    /// §4.5 steps 5e-g).
    fn build_output(
        &self,
        output: Result<StandardJsonOutput>,
        release: ReleaseId,
        is_exact: bool,
        source: &str,
    ) -> CompilationOutput {
        let output = match output {
            Ok(output) => output,
            Err(error) => {
                return CompilationOutput {
                    success: false,
                    version: Some(release),
                    gas_info: Vec::new(),
                    errors: vec![Diagnostic {
                        severity: Severity::Error,
                        message: error.to_string(),
                        line: None,
                    }],
                    warnings: Vec::new(),
                    infos: Vec::new(),
                    is_exact,
                    bytecode: None,
                    deployed_bytecode: None,
                };
            }
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut infos = Vec::new();
        for error in &output.errors {
            let diagnostic = Diagnostic {
                severity: classify_severity(&error.severity),
                message: if error.formatted_message.is_empty() {
                    error.message.clone()
                } else {
                    error.formatted_message.clone()
                },
                line: None,
            };
            match diagnostic.severity {
                Severity::Error => errors.push(diagnostic),
                Severity::Warning => warnings.push(diagnostic),
                Severity::Info => infos.push(diagnostic),
            }
        }

        let line_index = crate::ast::LineIndex::new(source);
        let mut gas_info = Vec::new();
        let mut bytecode = None;
        let mut deployed_bytecode = None;
        for (file, contracts) in &output.contracts {
            let ast_value = output.sources.get(file).and_then(|s| s.ast.clone());
            let ast_root = ast_value.as_ref().map(crate::ast::parse);

            // `ast_root` covers every contract declared in `file`, so the
            // walk below must happen once per file, not once per contract,
            // otherwise each function is emitted once per contract in the
            // file. Gas tables are per-contract, so merge them first; a
            // function is looked up by its own signature regardless of
            // which contract in the file contributed its table entry.
            let mut tables = selector::GasTables::default();
            for contract in contracts.values() {
                if let Some(contract_tables) =
                    contract.evm.as_ref().and_then(|evm| evm.gas_estimates.clone())
                {
                    let contract_tables = selector::GasTables::from(contract_tables);
                    tables.external.extend(contract_tables.external);
                    tables.internal.extend(contract_tables.internal);
                }

                if let Some(evm) = &contract.evm {
                    bytecode = evm.bytecode.as_ref().and_then(|b| b.object.clone()).or(bytecode);
                    deployed_bytecode = evm
                        .deployed_bytecode
                        .as_ref()
                        .and_then(|b| b.object.clone())
                        .or(deployed_bytecode);
                }
            }

            if let Some(root) = &ast_root {
                gas_info.extend(selector::map_gas_to_ast(root, source, &line_index, &tables));
            }
        }

        if gas_info.is_empty() && !errors.is_empty() {
            // AST absent (compilation failure): salvage whatever function
            // signatures a regex scan can find (spec.md §4.4 edge cases).
            gas_info.extend(selector::regex_fallback(source));
        }

        CompilationOutput {
            success: errors.is_empty(),
            version: Some(release),
            gas_info,
            errors,
            warnings,
            infos,
            is_exact,
            bytecode,
            deployed_bytecode,
        }
    }
}

fn classify_severity(raw: &str) -> Severity {
    match raw {
        "error" => Severity::Error,
        "info" => Severity::Info,
        _ => Severity::Warning,
    }
}

fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

fn pending_placeholder(uri: Uri, fingerprint: Fingerprint, trigger: Trigger) -> Arc<CompilationResult> {
    Arc::new(CompilationResult {
        uri,
        output: CompilationOutput {
            success: true,
            version: None,
            gas_info: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            infos: Vec::new(),
            is_exact: true,
            bytecode: None,
            deployed_bytecode: None,
        },
        timestamp_millis: now_millis(),
        trigger,
        fingerprint,
        cached: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::testutil::FakeCompiler;
    use crate::compiler::CompilerHandle;
    use crate::registry::{CompilerRegistry, CompilerRegistrySource};
    use crate::standard_json::StandardJsonOutput;
    use std::time::Duration;

    /// A source with no releases of its own; every test in this module
    /// drives the bundled compiler directly (no pragma in the fixtures
    /// below), so `load`/`available` are never exercised for real work.
    struct EmptySource;

    impl CompilerRegistrySource for EmptySource {
        fn available(&self) -> Vec<ReleaseId> {
            Vec::new()
        }

        fn load(
            &self,
            release: ReleaseId,
        ) -> Pin<Box<dyn Future<Output = Result<CompilerHandle, RegistryError>> + Send>> {
            Box::pin(async move { Err(RegistryError::NotAvailable(release)) })
        }
    }

    fn bundled_handle() -> (Arc<FakeCompiler>, ReleaseId) {
        let release = ReleaseId::new(Version::new(0, 8, 20), "deadbeef");
        let handle = Arc::new(FakeCompiler::new(release.clone(), StandardJsonOutput::default()));
        (handle, release)
    }

    fn service_with_bundled(handle: Arc<FakeCompiler>) -> CompilationService {
        let registry = CompilerRegistry::new(Arc::new(EmptySource), handle);
        CompilationService::new(registry, EngineConfig::default())
    }

    #[tokio::test]
    async fn trivial_contract_compiles_and_caches() {
        let (handle, _release) = bundled_handle();
        let service = service_with_bundled(handle.clone());
        let uri: Uri = Arc::from("a.sol");
        let source: Arc<str> = Arc::from("contract A {}");

        let first = service.compile(uri.clone(), source.clone(), Trigger::Manual, None).await;
        assert!(first.output.success());
        assert!(!first.cached);
        assert_eq!(handle.calls.lock().unwrap().len(), 1);

        let second = service.compile(uri, source, Trigger::Manual, None).await;
        assert!(second.cached);
        assert_eq!(handle.calls.lock().unwrap().len(), 1, "cache hit must not recompile");
    }

    #[tokio::test]
    async fn settings_change_invalidates_cache() {
        let (handle, _release) = bundled_handle();
        let service = service_with_bundled(handle.clone());
        let uri: Uri = Arc::from("a.sol");
        let source: Arc<str> = Arc::from("contract A {}");

        service.compile(uri.clone(), source.clone(), Trigger::Manual, None).await;
        service
            .update_settings(CompilerSettingsPatch { optimizer_runs: Some(999), ..Default::default() })
            .await;
        let after = service.compile(uri, source, Trigger::SettingsChange, None).await;
        assert!(!after.cached);
        assert_eq!(handle.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn change_trigger_is_debounced() {
        let (handle, _release) = bundled_handle();
        let service = service_with_bundled(handle.clone());
        let uri: Uri = Arc::from("a.sol");
        let source: Arc<str> = Arc::from("contract A {}");

        let service_clone = service.clone();
        let uri_clone = uri.clone();
        let source_clone = source.clone();
        let task = tokio::spawn(async move {
            service_clone.compile(uri_clone, source_clone, Trigger::Change, None).await
        });

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(handle.calls.lock().unwrap().len(), 0, "must not fire before the debounce window");

        tokio::time::advance(Duration::from_millis(300)).await;
        let result = task.await.unwrap();
        assert!(result.output.success());
        assert_eq!(handle.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_identical_requests_dedupe() {
        let (handle, _release) = bundled_handle();
        let service = service_with_bundled(handle.clone());
        let uri: Uri = Arc::from("a.sol");
        let source: Arc<str> = Arc::from("contract A {}");

        let (a, b) = tokio::join!(
            service.compile(uri.clone(), source.clone(), Trigger::Manual, None),
            service.compile(uri, source, Trigger::Manual, None)
        );
        assert!(a.output.success());
        assert!(b.output.success());
        assert_eq!(handle.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unbounded_gas_heuristic_surfaces_a_warning() {
        // Grounded on spec.md §4.4d's calldata-array-length loop bound
        // example; the AST/gas wiring here does not depend on a real
        // solc, only on a standard-json output with an inline AST.
        let ast = serde_json::json!({
            "nodeType": "ContractDefinition",
            "nodes": [{
                "nodeType": "FunctionDefinition",
                "name": "sumAll",
                "kind": "function",
                "visibility": "external",
                "stateMutability": "nonpayable",
                "parameters": { "parameters": [{
                    "name": "items",
                    "typeDescriptions": { "typeString": "uint256[] calldata" }
                }]},
                "src": "0:97:0",
                "body": { "src": "51:46:0" }
            }]
        });
        let source = "function sumAll(uint256[] calldata items) external { for (uint i = 0; i < items.length; i++) {} }";
        let mut contracts = HashMap::new();
        contracts.insert(
            "A".to_string(),
            crate::standard_json::ContractOutput {
                abi: None,
                metadata: None,
                evm: Some(crate::standard_json::EvmOutput {
                    gas_estimates: None,
                    bytecode: None,
                    deployed_bytecode: None,
                }),
            },
        );
        let mut by_file = HashMap::new();
        by_file.insert("a.sol".to_string(), contracts);
        let mut sources = HashMap::new();
        sources.insert(
            "a.sol".to_string(),
            crate::standard_json::SourceOutput { ast: Some(ast) },
        );
        let response = StandardJsonOutput { errors: Vec::new(), sources, contracts: by_file };

        let release = ReleaseId::new(Version::new(0, 8, 20), "deadbeef");
        let handle = Arc::new(FakeCompiler::new(release, response));
        let service = service_with_bundled(handle);
        let uri: Uri = Arc::from("a.sol");
        let result = service.compile(uri, Arc::from(source), Trigger::Manual, None).await;

        assert!(result.output.success());
        assert_eq!(result.output.gas_info.len(), 1);
        assert!(!result.output.gas_info[0].warnings.is_empty());
    }

    #[tokio::test]
    async fn multiple_contracts_in_one_file_each_emit_their_functions_once() {
        // Two contracts sharing one file's SourceUnit AST; build_output must
        // walk that AST once per file, not once per contract, or `a` and
        // `b` would each appear twice in the flattened gas_info.
        let ast = serde_json::json!({
            "nodeType": "SourceUnit",
            "nodes": [
                {
                    "nodeType": "ContractDefinition",
                    "nodes": [{
                        "nodeType": "FunctionDefinition", "name": "a", "kind": "function",
                        "visibility": "external", "stateMutability": "pure",
                        "parameters": { "parameters": [] }, "src": "0:10:0",
                        "body": { "src": "5:5:0" }
                    }]
                },
                {
                    "nodeType": "ContractDefinition",
                    "nodes": [{
                        "nodeType": "FunctionDefinition", "name": "b", "kind": "function",
                        "visibility": "public", "stateMutability": "view",
                        "parameters": { "parameters": [] }, "src": "20:10:0",
                        "body": { "src": "25:5:0" }
                    }]
                }
            ]
        });
        let source = "a".repeat(40);
        let mut contracts = HashMap::new();
        contracts.insert(
            "A".to_string(),
            crate::standard_json::ContractOutput {
                abi: None,
                metadata: None,
                evm: Some(crate::standard_json::EvmOutput {
                    gas_estimates: Some(crate::standard_json::GasEstimatesOutput {
                        external: HashMap::from([("a()".to_string(), "100".to_string())]),
                        internal: HashMap::new(),
                    }),
                    bytecode: None,
                    deployed_bytecode: None,
                }),
            },
        );
        contracts.insert(
            "B".to_string(),
            crate::standard_json::ContractOutput {
                abi: None,
                metadata: None,
                evm: Some(crate::standard_json::EvmOutput {
                    gas_estimates: Some(crate::standard_json::GasEstimatesOutput {
                        external: HashMap::from([("b()".to_string(), "200".to_string())]),
                        internal: HashMap::new(),
                    }),
                    bytecode: None,
                    deployed_bytecode: None,
                }),
            },
        );
        let mut by_file = HashMap::new();
        by_file.insert("ab.sol".to_string(), contracts);
        let mut sources = HashMap::new();
        sources.insert("ab.sol".to_string(), crate::standard_json::SourceOutput { ast: Some(ast) });
        let response = StandardJsonOutput { errors: Vec::new(), sources, contracts: by_file };

        let release = ReleaseId::new(Version::new(0, 8, 20), "deadbeef");
        let handle = Arc::new(FakeCompiler::new(release, response));
        let service = service_with_bundled(handle);
        let uri: Uri = Arc::from("ab.sol");
        let result = service.compile(uri, Arc::from(source), Trigger::Manual, None).await;

        assert!(result.output.success());
        assert_eq!(result.output.gas_info.len(), 2, "each function must be emitted exactly once");
        let names: Vec<&str> = result.output.gas_info.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        let gas_by_name: HashMap<&str, _> =
            result.output.gas_info.iter().map(|g| (g.name.as_str(), g.gas.clone())).collect();
        assert_eq!(gas_by_name["a"], crate::events::GasAmount::Finite(100));
        assert_eq!(gas_by_name["b"], crate::events::GasAmount::Finite(200));
    }
}
