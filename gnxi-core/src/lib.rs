//! # gNXI Tester Core
//!
//! Core library for the gNXI tester control plane: the pieces that decide what
//! a conformance run is, who may start one, and how its progress is observed.
//!
//! ## Overview
//!
//! - **Domain**: prompt sets, target descriptors and the test catalog
//! - **Ports**: trait seams for the configuration store, file store and the
//!   protocol test engine
//! - **Run lifecycle**: configuration resolver, run state machine, output
//!   buffer and run executor
//! - **Adapters**: JSON-file configuration store, filesystem file store and a
//!   process-backed test engine
//!
//! ## Architecture
//!
//! A run request is resolved into an immutable [`run::RunSpec`], admitted by
//! the [`run::RunStateMachine`] (at most one run is active process-wide), then
//! driven by the [`run::RunExecutor`] which streams engine output into the
//! run's [`run::OutputBuffer`]. Polling clients read the buffer by offset.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// HTTP route paths and the response envelope shared with the server
pub mod api;

/// Prompt sets, targets and the test catalog
pub mod domain;

/// Protocol test engine adapters
pub mod engine;

/// Error types
pub mod error;

/// Trait seams for external collaborators
pub mod ports;

/// Run lifecycle: resolver, state machine, output buffer, executor
pub mod run;

/// Store implementations backing the ports
pub mod stores;

pub use domain::{
    catalog::{CatalogLoadError, TestCatalog, TestDescriptor},
    prompts::PromptSet,
    targets::TargetDescriptor,
};
pub use error::{ResourceKind, Result, TesterError};
pub use ports::{
    config_store::ConfigStore,
    file_store::{FileStore, StoredFile},
    test_engine::{EngineError, TestEngine, TestInvocation, TestVerdict},
};
pub use run::{
    AdmitError, Admission, ConfigurationResolver, ExecutionError,
    ExecutionReport, ExecutorSettings, OutputBuffer, OutputChunk, OutputPoll,
    ResolutionError, RunExecutor, RunId, RunRecord, RunRequest, RunSpec,
    RunState, RunStateMachine, RunStatus, TestOutcome, TestResult,
};
