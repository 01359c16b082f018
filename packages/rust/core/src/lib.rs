//! Smoke-run orchestration for the thread-to-corpus pipeline.
//!
//! This crate resolves the interpreter, plans the external stage
//! invocations, runs them in order, and summarizes the resulting corpus.
//! It also carries the debug-artifact diagnostics used after a run.

pub mod diagnostics;
pub mod pipeline;
pub mod runtime;
pub mod stage;
pub mod summary;
