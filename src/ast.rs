//! A typed view over the compiler's JSON-shaped AST (spec.md §9 Design
//! Notes: "AST as tagged tree").
//!
//! Untyped `serde_json::Value` traversal is the natural way to consume a
//! schema as varied as solc's AST, but it pushes every consumer back into
//! stringly-typed field lookups. Instead we deserialize into one sum type
//! with a single meaningful variant — `FunctionDefinition` — and a
//! catch-all `Other` that keeps whatever children it finds so the walker
//! can still reach every function regardless of how deeply it's nested.

use crate::events::{StateMutability, Visibility};
use serde_json::Value;

/// A byte-offset span into a source file, parsed from solc's
/// `"start:length:fileIndex"` `src` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub start: usize,
    pub length: usize,
}

impl SourceSpan {
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Parses a `src` field of the form `"start:length:fileIndex"`. Returns
    /// `None` for anything else rather than panicking — a malformed or
    /// absent `src` just means that node contributes no location info.
    pub fn parse(src: &str) -> Option<Self> {
        let mut parts = src.split(':');
        let start: usize = parts.next()?.parse().ok()?;
        let length: usize = parts.next()?.parse().ok()?;
        Some(Self { start, length })
    }
}

/// A function parameter: its canonical type string (e.g. `uint256` or
/// `mapping(address => uint256)`) plus its identifier, when named. Solidity
/// allows unnamed parameters, so `name` is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescription {
    pub type_string: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    Receive,
}

/// The fields [`crate::selector::SelectorEngine`] needs from a
/// `FunctionDefinition` AST node.
#[derive(Debug, Clone)]
pub struct FunctionDefinitionNode {
    pub name: Option<String>,
    pub kind: FunctionKind,
    pub visibility: Option<Visibility>,
    pub state_mutability: Option<StateMutability>,
    pub parameters: Vec<TypeDescription>,
    pub src: Option<SourceSpan>,
    pub body_src: Option<SourceSpan>,
}

/// A node in the typed AST: either the one variant the engine cares about,
/// or an opaque `Other` carrying whatever children were found so the walk
/// can still recurse into them.
#[derive(Debug, Clone)]
pub enum AstNode {
    FunctionDefinition(FunctionDefinitionNode),
    Other { kind: String, children: Vec<AstNode> },
}

/// Parses a raw `serde_json::Value` (as found under `sources[file].ast`)
/// into an [`AstNode`] tree. Solc's AST doesn't have a single fixed
/// children field name across node kinds, so rather than assume one we
/// collect every array-of-objects and object-with-`nodeType` field we find.
pub fn parse(value: &Value) -> AstNode {
    build_node(value)
}

fn build_node(value: &Value) -> AstNode {
    let Some(obj) = value.as_object() else {
        return AstNode::Other { kind: "Value".to_string(), children: Vec::new() };
    };

    let node_type = obj.get("nodeType").and_then(Value::as_str).unwrap_or("Unknown").to_string();

    if node_type == "FunctionDefinition" {
        return AstNode::FunctionDefinition(parse_function_definition(obj));
    }

    let mut children = Vec::new();
    collect_children(value, &mut children);
    AstNode::Other { kind: node_type, children }
}

/// Recurses into every object/array field of `value`, treating any nested
/// object that itself carries a `nodeType` (or is reachable through an
/// array) as a candidate child node.
fn collect_children(value: &Value, out: &mut Vec<AstNode>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "nodeType" {
                    continue;
                }
                collect_children(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                if item.is_object() {
                    out.push(build_node(item));
                } else {
                    collect_children(item, out);
                }
            }
        }
        _ => {}
    }
}

fn parse_function_definition(obj: &serde_json::Map<String, Value>) -> FunctionDefinitionNode {
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let kind = match obj.get("kind").and_then(Value::as_str) {
        Some("constructor") => FunctionKind::Constructor,
        Some("fallback") => FunctionKind::Fallback,
        Some("receive") => FunctionKind::Receive,
        _ => FunctionKind::Function,
    };

    let visibility = obj.get("visibility").and_then(Value::as_str).and_then(|v| match v {
        "public" => Some(Visibility::Public),
        "external" => Some(Visibility::External),
        "internal" => Some(Visibility::Internal),
        "private" => Some(Visibility::Private),
        _ => None,
    });

    let state_mutability =
        obj.get("stateMutability").and_then(Value::as_str).and_then(|m| match m {
            "pure" => Some(StateMutability::Pure),
            "view" => Some(StateMutability::View),
            "nonpayable" => Some(StateMutability::Nonpayable),
            "payable" => Some(StateMutability::Payable),
            _ => None,
        });

    let parameters = obj
        .get("parameters")
        .and_then(|p| p.get("parameters"))
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .map(|param| {
                    let type_string = param
                        .get("typeDescriptions")
                        .and_then(|td| td.get("typeString"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let name = param
                        .get("name")
                        .and_then(Value::as_str)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string);
                    TypeDescription { type_string, name }
                })
                .collect()
        })
        .unwrap_or_default();

    let src = obj.get("src").and_then(Value::as_str).and_then(SourceSpan::parse);
    let body_src = obj
        .get("body")
        .and_then(|b| b.get("src"))
        .and_then(Value::as_str)
        .and_then(SourceSpan::parse);

    FunctionDefinitionNode { name, kind, visibility, state_mutability, parameters, src, body_src }
}

/// Depth-first walk that invokes `visit` on every `FunctionDefinition`
/// node, in document order (spec.md §4.4e).
pub fn walk_functions<'a>(node: &'a AstNode, visit: &mut impl FnMut(&'a FunctionDefinitionNode)) {
    match node {
        AstNode::FunctionDefinition(f) => visit(f),
        AstNode::Other { children, .. } => {
            for child in children {
                walk_functions(child, visit);
            }
        }
    }
}

/// Byte-offset → 1-based line table, built by a single linear scan over
/// the source (spec.md §4.4b).
pub struct LineIndex {
    /// `line_starts[i]` is the byte offset at which line `i + 1` begins.
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    /// Maps a byte offset to its 1-based line number.
    pub fn line_at(&self, offset: usize) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => (idx + 1) as u32,
            Err(idx) => idx as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_span_parses_triple() {
        let span = SourceSpan::parse("120:45:0").unwrap();
        assert_eq!(span.start, 120);
        assert_eq!(span.length, 45);
        assert_eq!(span.end(), 165);
    }

    #[test]
    fn source_span_rejects_malformed() {
        assert!(SourceSpan::parse("not-a-span").is_none());
    }

    #[test]
    fn line_index_maps_offsets() {
        let idx = LineIndex::new("line one\nline two\nline three");
        assert_eq!(idx.line_at(0), 1);
        assert_eq!(idx.line_at(9), 2);
        assert_eq!(idx.line_at(18), 3);
    }

    #[test]
    fn walk_finds_nested_function_in_document_order() {
        let json = serde_json::json!({
            "nodeType": "SourceUnit",
            "nodes": [
                {
                    "nodeType": "ContractDefinition",
                    "nodes": [
                        { "nodeType": "FunctionDefinition", "name": "a", "kind": "function",
                          "visibility": "external", "stateMutability": "pure",
                          "parameters": { "parameters": [] }, "src": "0:10:0",
                          "body": { "src": "5:5:0" } },
                        { "nodeType": "FunctionDefinition", "name": "b", "kind": "function",
                          "visibility": "public", "stateMutability": "view",
                          "parameters": { "parameters": [] }, "src": "20:10:0",
                          "body": { "src": "25:5:0" } }
                    ]
                }
            ]
        });
        let root = parse(&json);
        let mut names = Vec::new();
        walk_functions(&root, &mut |f| names.push(f.name.clone().unwrap()));
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
