//! Test engine adapters.

pub mod process;

pub use process::{ProcessEngineSettings, ProcessTestEngine};
