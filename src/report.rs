//! Thin `tracing`-backed lifecycle logging, following the teacher's
//! `crate::report::solc_installation_*` convention (referenced from
//! `compile/mod.rs`, `compilers/solc/vm.rs`, `compilers/solc/version_manager.rs`)
//! generalized from a single Solc version manager to every [`ReleaseId`]
//! this crate loads.

use crate::release::ReleaseId;

pub fn compiler_install_start(release: &ReleaseId) {
    tracing::trace!(%release, "installing compiler");
}

pub fn compiler_install_success(release: &ReleaseId) {
    tracing::trace!(%release, "compiler installed");
}

pub fn compiler_install_error(release: &ReleaseId, error: &str) {
    tracing::warn!(%release, %error, "compiler installation failed");
}

pub fn compilation_start(uri: &str, version: Option<&ReleaseId>) {
    match version {
        Some(release) => tracing::debug!(uri, %release, "compilation started"),
        None => tracing::debug!(uri, "compilation started"),
    }
}

pub fn compilation_success(uri: &str, fingerprint: &crate::fingerprint::Fingerprint, cached: bool) {
    tracing::debug!(uri, %fingerprint, cached, "compilation finished");
}

pub fn compilation_error(uri: &str, error_count: usize) {
    tracing::warn!(uri, error_count, "compilation reported errors");
}

pub fn pragma_fallback(uri: &str, reason: &str) {
    tracing::warn!(uri, reason, "falling back to bundled compiler");
}
