//! Extracts and resolves a source's `pragma solidity` version constraint
//! (spec.md §4.2).
//!
//! `semver::VersionReq`'s own parser cannot be handed a Solidity constraint
//! verbatim: Solidity joins comparators within a range with whitespace
//! (`>=0.8.0 <0.9.0`) where `VersionReq` wants commas, supports `||` for
//! alternative ranges which `VersionReq` has no concept of at all, and —
//! the detail that actually differs in *meaning*, not just syntax — treats
//! a bare, operator-less version as an **exact** pin, whereas `VersionReq`'s
//! own no-operator parse is caret semantics. This module translates once,
//! up front, rather than asking every call site to remember the mismatch.

use once_cell::sync::Lazy;
use regex::Regex;
use semver::{Version, VersionReq};

/// Matches the first `pragma solidity <constraint>;` directive in a source
/// buffer. The constraint is captured without the trailing semicolon.
static PRAGMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pragma\s+solidity\s+([^;]+);").expect("valid regex"));

/// Raised when a pragma is present but either unparseable or unsatisfiable
/// against the available releases.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum NoMatch {
    #[error("could not parse pragma constraint {0:?}")]
    Unparseable(String),
    #[error("no available release satisfies constraint {0:?}")]
    Unsatisfied(String),
}

/// A parsed `pragma solidity` constraint: one or more OR-ed branches, each
/// of which is itself an AND of comparators (ordinary `VersionReq`
/// semantics once the bare-version rewrite has been applied).
#[derive(Debug, Clone)]
pub struct PragmaConstraint {
    raw: String,
    branches: Vec<VersionReq>,
}

impl PragmaConstraint {
    /// Parses a constraint string such as `^0.8.20`, `>=0.8.0 <0.9.0`, or
    /// `>=0.5.0 <0.6.0 || >=0.7.0 <0.8.0`.
    pub fn parse(raw: &str) -> Result<Self, NoMatch> {
        let raw_trimmed = raw.trim();
        let mut branches = Vec::new();
        for branch in raw_trimmed.split("||") {
            let req = parse_branch(branch.trim())
                .ok_or_else(|| NoMatch::Unparseable(raw_trimmed.to_string()))?;
            branches.push(req);
        }
        if branches.is_empty() {
            return Err(NoMatch::Unparseable(raw_trimmed.to_string()));
        }
        Ok(Self { raw: raw_trimmed.to_string(), branches })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.branches.iter().any(|req| req.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Rewrites a single whitespace-separated range (no `||`) into the comma
/// form `VersionReq::parse` accepts, prefixing any bare comparator with `=`.
fn parse_branch(branch: &str) -> Option<VersionReq> {
    if branch.is_empty() {
        return None;
    }
    let comparators: Vec<String> = branch
        .split_whitespace()
        .map(|comparator| {
            if comparator.starts_with(['^', '~', '>', '<', '=']) {
                comparator.to_string()
            } else {
                format!("={comparator}")
            }
        })
        .collect();
    VersionReq::parse(&comparators.join(",")).ok()
}

/// Extracts the first `pragma solidity` constraint from `source`, if any.
/// Absence of a pragma is not an error — the caller falls back to the
/// bundled compiler.
pub fn extract_pragma(source: &str) -> Option<Result<PragmaConstraint, NoMatch>> {
    let captures = PRAGMA_RE.captures(source)?;
    let raw = captures.get(1)?.as_str();
    Some(PragmaConstraint::parse(raw))
}

/// Selects the **highest** release in `available` that satisfies
/// `constraint`. `available` need not be pre-sorted.
pub fn resolve<'a>(
    constraint: &PragmaConstraint,
    available: &'a [Version],
) -> Result<&'a Version, NoMatch> {
    let mut sorted: Vec<&Version> = available.iter().collect();
    sorted.sort();
    sorted
        .into_iter()
        .rev()
        .find(|version| constraint.matches(version))
        .ok_or_else(|| NoMatch::Unsatisfied(constraint.raw.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn no_pragma_is_none_not_error() {
        assert!(extract_pragma("contract C {}").is_none());
    }

    #[test]
    fn extracts_simple_caret() {
        let c = extract_pragma("pragma solidity ^0.8.20;\ncontract C {}").unwrap().unwrap();
        assert_eq!(c.as_str(), "^0.8.20");
        assert!(c.matches(&v("0.8.25")));
        assert!(!c.matches(&v("0.9.0")));
    }

    #[test]
    fn bare_version_is_exact_pin_not_caret() {
        let c = extract_pragma("pragma solidity 0.8.20;").unwrap().unwrap();
        assert!(c.matches(&v("0.8.20")));
        assert!(!c.matches(&v("0.8.21")));
        assert!(!c.matches(&v("0.8.19")));
    }

    #[test]
    fn tilde_allows_patch_level_only() {
        let c = extract_pragma("pragma solidity ~0.8.20;").unwrap().unwrap();
        assert!(c.matches(&v("0.8.25")));
        assert!(!c.matches(&v("0.9.0")));
    }

    #[test]
    fn compound_range_with_whitespace() {
        let c = extract_pragma("pragma solidity >=0.8.0 <0.9.0;").unwrap().unwrap();
        assert!(c.matches(&v("0.8.5")));
        assert!(!c.matches(&v("0.9.0")));
        assert!(!c.matches(&v("0.7.9")));
    }

    #[test]
    fn union_of_ranges() {
        let c =
            extract_pragma("pragma solidity >=0.5.0 <0.6.0 || >=0.7.0 <0.8.0;").unwrap().unwrap();
        assert!(c.matches(&v("0.5.9")));
        assert!(c.matches(&v("0.7.3")));
        assert!(!c.matches(&v("0.6.5")));
    }

    #[test]
    fn unparseable_constraint_is_no_match() {
        let err = PragmaConstraint::parse("not a version").unwrap_err();
        assert!(matches!(err, NoMatch::Unparseable(_)));
    }

    #[test]
    fn resolve_picks_highest_satisfying_release() {
        let c = PragmaConstraint::parse("^0.8.0").unwrap();
        let available = vec![v("0.8.10"), v("0.8.25"), v("0.7.6"), v("0.8.19")];
        assert_eq!(resolve(&c, &available).unwrap(), &v("0.8.25"));
    }

    #[test]
    fn resolve_with_no_satisfying_release_is_unsatisfied() {
        let c = PragmaConstraint::parse("^0.9.0").unwrap();
        let available = vec![v("0.8.25")];
        assert!(matches!(resolve(&c, &available), Err(NoMatch::Unsatisfied(_))));
    }
}
