#![doc = include_str!("../README.md")]
#![warn(rustdoc::all)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! `sol-analyzer` orchestrates real-time Solidity analysis for editor
//! hosts: resolving the right `solc` release from a source's pragma,
//! dispatching debounced/cached compilations, and extracting per-function
//! gas estimates and ABI selectors from the result. [`AnalysisEngine`] is
//! the crate's entry point; everything else is plumbing it composes.

pub mod fingerprint;
pub mod release;
pub mod error;

pub mod pragma;
pub mod ast;
pub mod selector;
pub mod standard_json;
pub mod events;
pub mod settings;
pub mod report;
pub mod compiler;
pub mod registry;
pub mod cache;
pub mod service;
pub mod analysis;

pub use analysis::AnalysisEngine;
pub use error::{AnalysisError, RegistryError, Result};
pub use events::{
    AnalysisReady, CompilationOutput, CompilationResult, Diagnostic, GasAmount, GasEstimate,
    GasInfo, LiveAnalysis, ServiceEvent, Severity, StateMutability, Trigger, Uri, Visibility,
};
pub use fingerprint::Fingerprint;
pub use release::ReleaseId;
pub use service::{CompilationService, ServiceStats};
pub use settings::{CompilerSettings, CompilerSettingsPatch, EngineConfig};

#[cfg(feature = "svm-solc")]
pub use registry::SvmRegistrySource;

#[cfg(feature = "network-registry")]
pub use registry::NetworkRegistrySource;
