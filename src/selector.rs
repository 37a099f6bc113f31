//! Canonical signatures, 4-byte selectors, and gas attachment (spec.md
//! §4.4). The public entry point is [`map_gas_to_ast`]; [`regex_fallback`]
//! covers the case where compilation failed before an AST was produced.

use crate::{
    ast::{AstNode, FunctionKind, LineIndex, SourceSpan, TypeDescription},
    events::{GasAmount, GasInfo, LineSpan, StateMutability, Visibility},
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tiny_keccak::{Hasher, Keccak};

/// The compiler's `evm.gasEstimates.{external,internal}` tables, each keyed
/// by canonical signature, value either a base-10 integer string or the
/// literal `"infinite"`.
#[derive(Debug, Clone, Default)]
pub struct GasTables {
    pub external: HashMap<String, String>,
    pub internal: HashMap<String, String>,
}

static QUALIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(memory|storage|calldata)\b").expect("valid regex"));
static KIND_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(contract|struct|enum)\s+").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static MAPPING_ARROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*=>\s*").expect("valid regex"));

/// Normalizes a single parameter's type string into its canonical ABI form
/// (spec.md §4.4a): strip `memory|storage|calldata` qualifiers, strip a
/// leading `contract |struct |enum ` kind tag, collapse whitespace, and
/// tighten mapping arrows.
fn normalize_type(raw: &str) -> String {
    let without_qualifiers = QUALIFIER_RE.replace_all(raw, "");
    let without_kind_tag = KIND_TAG_RE.replace(&without_qualifiers, "");
    let tightened_arrows = MAPPING_ARROW_RE.replace_all(&without_kind_tag, "=>");
    WHITESPACE_RE.replace_all(tightened_arrows.trim(), " ").trim().to_string()
}

/// Builds `name(type1,type2,…)` from a function's name and parameter list.
pub fn canonical_signature(name: &str, parameters: &[TypeDescription]) -> String {
    let types: Vec<String> =
        parameters.iter().map(|param| normalize_type(&param.type_string)).collect();
    format!("{name}({})", types.join(","))
}

/// `0x` + 8 lowercase hex chars: the first four bytes of
/// `keccak256(signature)`.
pub fn selector_of(signature: &str) -> String {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    format!("0x{:02x}{:02x}{:02x}{:02x}", output[0], output[1], output[2], output[3])
}

/// Finds the gas figure for `signature`/`name` by trying, in order: exact
/// external key, exact internal key, any external key prefixed `name(`,
/// any internal key prefixed `name(` (spec.md §4.4c). Absent from every
/// table maps to `0`, not a missing value — the engine always reports a
/// number.
fn lookup_gas(name: &str, signature: &str, tables: &GasTables) -> GasAmount {
    let prefix = format!("{name}(");
    let raw = tables
        .external
        .get(signature)
        .or_else(|| tables.internal.get(signature))
        .or_else(|| tables.external.iter().find(|(key, _)| key.starts_with(&prefix)).map(|(_, v)| v))
        .or_else(|| tables.internal.iter().find(|(key, _)| key.starts_with(&prefix)).map(|(_, v)| v));

    match raw {
        Some(value) if value == "infinite" => GasAmount::Infinite,
        Some(value) => value.parse().map(GasAmount::Finite).unwrap_or(GasAmount::Finite(0)),
        None => GasAmount::Finite(0),
    }
}

static FOR_WHILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:for|while)\s*\(([^)]*)\)").expect("valid regex"));
static DOT_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\s*(\w+)\s*\(").expect("valid regex"));
static INDEXED_WRITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+\s*\[[^\]]*\]\s*=(?!=)").expect("valid regex"));
static DELEGATECALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdelegatecall\s*\(").expect("valid regex"));

/// Dot-invocations excluded from the external-call-in-loop heuristic
/// because they're ordinary array bookkeeping, not an external call.
const SAFE_LOOP_CALL_MEMBERS: [&str; 3] = ["length", "push", "pop"];

/// Scans a function body for the five unbounded-gas patterns (spec.md
/// §4.4d) and returns the warnings that fired. A non-empty result means
/// the caller should promote `gas` to [`GasAmount::Infinite`].
pub fn scan_unbounded_gas(body: &str, function_name: &str, parameter_names: &[&str]) -> Vec<String> {
    let mut warnings = Vec::new();
    let loop_bodies: Vec<&str> = FOR_WHILE_RE
        .captures_iter(body)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str()))
        .collect();

    let loop_bound_from_calldata = loop_bodies.iter().any(|condition| {
        parameter_names.iter().any(|param| {
            Regex::new(&format!(r"\b{}\b", regex::escape(param)))
                .map(|re| re.is_match(condition))
                .unwrap_or(false)
        })
    });
    if loop_bound_from_calldata {
        warnings.push("loop bound from calldata".to_string());
    }

    let any_loop = FOR_WHILE_RE.is_match(body);
    if any_loop {
        let external_call_in_loop = DOT_CALL_RE
            .captures_iter(body)
            .any(|captures| !SAFE_LOOP_CALL_MEMBERS.contains(&&captures[1]));
        if external_call_in_loop {
            warnings.push("external call inside loop".to_string());
        }
        if INDEXED_WRITE_RE.is_match(body) {
            warnings.push("dynamic storage write in loop".to_string());
        }
    }

    if DELEGATECALL_RE.is_match(body) {
        warnings.push("delegatecall detected".to_string());
    }

    if !function_name.is_empty() {
        let recursion_re = Regex::new(&format!(r"\b{}\s*\(", regex::escape(function_name)))
            .expect("escaped pattern is valid");
        // `body` is the function's block only, not its signature, so a
        // single hit already means the name reappears at a call site.
        if recursion_re.is_match(body) {
            warnings.push("possible recursion".to_string());
        }
    }

    warnings
}

/// Which name a function node is emitted under, per spec.md §4.4e's
/// edge-case rule: constructors are kept as `"constructor"` even though
/// they carry no `name` in the AST; fallback/receive are skipped entirely;
/// an unnamed ordinary function is skipped.
fn emission_name(node: &crate::ast::FunctionDefinitionNode) -> Option<String> {
    match node.kind {
        FunctionKind::Constructor => Some("constructor".to_string()),
        FunctionKind::Fallback | FunctionKind::Receive => None,
        FunctionKind::Function => node.name.clone(),
    }
}

/// Depth-first walk of `root` producing one [`GasInfo`] per named function,
/// in document order (spec.md §4.4e). `source` is the full file text the
/// AST's `src` offsets index into.
pub fn map_gas_to_ast(
    root: &AstNode,
    source: &str,
    line_index: &LineIndex,
    tables: &GasTables,
) -> Vec<GasInfo> {
    let mut out = Vec::new();
    crate::ast::walk_functions(root, &mut |node| {
        let Some(name) = emission_name(node) else { return };

        let signature = canonical_signature(&name, &node.parameters);
        let selector = selector_of(&signature);

        let span = node.src.unwrap_or_default();
        let loc = LineSpan {
            line: line_index.line_at(span.start),
            end_line: line_index.line_at(span.end().saturating_sub(1).max(span.start)),
        };

        let mut gas = lookup_gas(&name, &signature, tables);

        let parameter_names: Vec<&str> =
            node.parameters.iter().filter_map(|p| p.name.as_deref()).collect();
        let warnings = node
            .body_src
            .and_then(|body_span| slice_span(source, body_span))
            .map(|body| scan_unbounded_gas(body, &name, &parameter_names))
            .unwrap_or_default();

        if !warnings.is_empty() {
            gas = GasAmount::Infinite;
        }

        out.push(GasInfo {
            name,
            selector,
            gas,
            loc,
            visibility: node.visibility.unwrap_or(Visibility::Internal),
            state_mutability: node.state_mutability.unwrap_or(StateMutability::Nonpayable),
            warnings,
        });
    });
    out
}

fn slice_span(source: &str, span: SourceSpan) -> Option<&str> {
    source.get(span.start..span.end().min(source.len()))
}

static FALLBACK_FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"function\s+(\w+)\s*\(([^)]*)\)\s*([\w\s]*)").expect("valid regex")
});

/// Regex-only recovery path used when compilation failed before an AST was
/// produced (spec.md §4.4 edge cases): scans raw source for `function`
/// declarations, emits selectors built from empty canonical types, and
/// reports `gas: 0` with a `"Gas unavailable"` warning for every hit.
pub fn regex_fallback(source: &str) -> Vec<GasInfo> {
    let line_index = LineIndex::new(source);
    FALLBACK_FN_RE
        .captures_iter(source)
        .map(|captures| {
            let name = captures[1].to_string();
            let modifiers = captures.get(3).map(|m| m.as_str()).unwrap_or_default();
            let visibility = if modifiers.contains("external") {
                Visibility::External
            } else if modifiers.contains("public") {
                Visibility::Public
            } else if modifiers.contains("private") {
                Visibility::Private
            } else {
                Visibility::Internal
            };
            let state_mutability = if modifiers.contains("pure") {
                StateMutability::Pure
            } else if modifiers.contains("view") {
                StateMutability::View
            } else if modifiers.contains("payable") {
                StateMutability::Payable
            } else {
                StateMutability::Nonpayable
            };
            let signature = format!("{name}()");
            let offset = captures.get(0).map(|m| m.start()).unwrap_or(0);
            let line = line_index.line_at(offset);
            GasInfo {
                name,
                selector: selector_of(&signature),
                gas: GasAmount::Finite(0),
                loc: LineSpan { line, end_line: line },
                visibility,
                state_mutability,
                warnings: vec!["Gas unavailable".to_string()],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_signature_strips_qualifiers() {
        let params = vec![
            TypeDescription { type_string: "uint256 memory".to_string(), name: None },
            TypeDescription { type_string: "address calldata".to_string(), name: None },
        ];
        assert_eq!(canonical_signature("foo", &params), "foo(uint256,address)");
    }

    #[test]
    fn canonical_signature_normalizes_mapping_spacing() {
        let params =
            vec![TypeDescription { type_string: "mapping(address => uint256)".to_string(), name: None }];
        assert_eq!(canonical_signature("bar", &params), "bar(mapping(address=>uint256))");
    }

    #[test]
    fn selector_matches_known_vector() {
        // keccak256("a()")[0..4]
        assert_eq!(selector_of("a()"), "0x0dbe671f");
    }

    #[test]
    fn overloaded_functions_get_distinct_selectors() {
        let uint_sig = canonical_signature(
            "foo",
            &[TypeDescription { type_string: "uint256".to_string(), name: None }],
        );
        let addr_sig = canonical_signature(
            "foo",
            &[TypeDescription { type_string: "address".to_string(), name: None }],
        );
        assert_ne!(selector_of(&uint_sig), selector_of(&addr_sig));
    }

    #[test]
    fn lookup_gas_prefers_exact_external() {
        let mut tables = GasTables::default();
        tables.external.insert("foo()".to_string(), "120".to_string());
        tables.internal.insert("foo()".to_string(), "999".to_string());
        assert_eq!(lookup_gas("foo", "foo()", &tables), GasAmount::Finite(120));
    }

    #[test]
    fn lookup_gas_falls_back_to_prefix_match() {
        let mut tables = GasTables::default();
        tables.internal.insert("foo(uint256)".to_string(), "infinite".to_string());
        assert_eq!(lookup_gas("foo", "foo()", &tables), GasAmount::Infinite);
    }

    #[test]
    fn lookup_gas_missing_is_zero() {
        let tables = GasTables::default();
        assert_eq!(lookup_gas("foo", "foo()", &tables), GasAmount::Finite(0));
    }

    #[test]
    fn loop_bound_from_calldata_fires_on_parameter_reference() {
        let warnings = scan_unbounded_gas("for (uint i = 0; i < n; i++) {}", "f", &["n"]);
        assert!(warnings.contains(&"loop bound from calldata".to_string()));
    }

    #[test]
    fn external_call_in_loop_ignores_length_push_pop() {
        let safe = scan_unbounded_gas("for (uint i = 0; i < arr.length; i++) { arr.push(i); }", "f", &[]);
        assert!(!safe.contains(&"external call inside loop".to_string()));

        let unsafe_body = scan_unbounded_gas("for (uint i = 0; i < 10; i++) { target.call(i); }", "f", &[]);
        assert!(unsafe_body.contains(&"external call inside loop".to_string()));
    }

    #[test]
    fn dynamic_storage_write_in_loop_detected() {
        let warnings =
            scan_unbounded_gas("for (uint i = 0; i < 10; i++) { balances[i] = 0; }", "f", &[]);
        assert!(warnings.contains(&"dynamic storage write in loop".to_string()));
    }

    #[test]
    fn delegatecall_detected_outside_loop() {
        let warnings = scan_unbounded_gas("target.delegatecall(data);", "f", &[]);
        assert!(warnings.contains(&"delegatecall detected".to_string()));
    }

    #[test]
    fn recursion_detected_when_name_reappears() {
        let warnings = scan_unbounded_gas("if (n > 0) { factorial(n - 1); }", "factorial", &[]);
        assert!(warnings.contains(&"possible recursion".to_string()));
    }

    #[test]
    fn no_warnings_on_trivial_body() {
        let warnings = scan_unbounded_gas("return 1;", "f", &[]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn map_gas_to_ast_walks_in_document_order() {
        let json = serde_json::json!({
            "nodeType": "SourceUnit",
            "nodes": [{
                "nodeType": "ContractDefinition",
                "nodes": [
                    { "nodeType": "FunctionDefinition", "name": "a", "kind": "function",
                      "visibility": "external", "stateMutability": "pure",
                      "parameters": { "parameters": [] }, "src": "0:10:0",
                      "body": { "src": "0:10:0" } },
                    { "nodeType": "FunctionDefinition", "name": "b", "kind": "function",
                      "visibility": "public", "stateMutability": "view",
                      "parameters": { "parameters": [] }, "src": "20:10:0",
                      "body": { "src": "20:10:0" } }
                ]
            }]
        });
        let root = crate::ast::parse(&json);
        let source = "a".repeat(40);
        let line_index = LineIndex::new(&source);
        let gas_info = map_gas_to_ast(&root, &source, &line_index, &GasTables::default());
        assert_eq!(gas_info.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn constructor_is_emitted_under_fixed_name() {
        let json = serde_json::json!({
            "nodeType": "FunctionDefinition", "name": "", "kind": "constructor",
            "visibility": "public", "stateMutability": "nonpayable",
            "parameters": { "parameters": [] }, "src": "0:5:0", "body": { "src": "0:5:0" }
        });
        let root = crate::ast::parse(&json);
        let source = "a".repeat(10);
        let line_index = LineIndex::new(&source);
        let gas_info = map_gas_to_ast(&root, &source, &line_index, &GasTables::default());
        assert_eq!(gas_info.len(), 1);
        assert_eq!(gas_info[0].name, "constructor");
    }

    #[test]
    fn fallback_and_receive_are_skipped() {
        let json = serde_json::json!({
            "nodeType": "SourceUnit",
            "nodes": [
                { "nodeType": "FunctionDefinition", "name": "", "kind": "fallback",
                  "visibility": "external", "stateMutability": "payable",
                  "parameters": { "parameters": [] }, "src": "0:5:0" },
                { "nodeType": "FunctionDefinition", "name": "", "kind": "receive",
                  "visibility": "external", "stateMutability": "payable",
                  "parameters": { "parameters": [] }, "src": "10:5:0" }
            ]
        });
        let root = crate::ast::parse(&json);
        let source = "a".repeat(20);
        let line_index = LineIndex::new(&source);
        let gas_info = map_gas_to_ast(&root, &source, &line_index, &GasTables::default());
        assert!(gas_info.is_empty());
    }

    #[test]
    fn regex_fallback_reports_gas_unavailable() {
        let source = "contract C { function foo() external pure returns (uint256) {} }";
        let gas_info = regex_fallback(source);
        assert_eq!(gas_info.len(), 1);
        assert_eq!(gas_info[0].name, "foo");
        assert_eq!(gas_info[0].gas, GasAmount::Finite(0));
        assert_eq!(gas_info[0].warnings, vec!["Gas unavailable".to_string()]);
        assert_eq!(gas_info[0].visibility, Visibility::External);
        assert_eq!(gas_info[0].state_mutability, StateMutability::Pure);
    }
}
