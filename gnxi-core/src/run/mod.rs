//! Run lifecycle.
//!
//! Control flow: [`ConfigurationResolver`] turns a [`RunRequest`] into a
//! [`RunSpec`], [`RunStateMachine::admit`] claims the single run slot, and a
//! [`RunExecutor`] drives the tests while writing to the run's
//! [`OutputBuffer`]. Terminal status flows back through
//! [`RunStateMachine::complete`] or [`RunStateMachine::fail`].

pub mod executor;
pub mod output;
pub mod resolver;
pub mod state;
mod template;
pub mod types;

pub use executor::{
    ExecutionError, ExecutionReport, ExecutorSettings, RunExecutor,
};
pub use output::{OutputBuffer, OutputChunk};
pub use resolver::{ConfigurationResolver, ResolutionError};
pub use state::{AdmitError, Admission, OutputPoll, RunStateMachine, RunStatus};
pub use types::{
    RunId, RunRecord, RunRequest, RunSpec, RunState, TestOutcome, TestResult,
};
