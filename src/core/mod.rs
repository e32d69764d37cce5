// src/core/mod.rs

// Root of the orchestration core: data model, tool catalog, the execution
// service internals, the sequential scan controller, and report rendering.

/// Data structures shared across the suite: tool identity, execution
/// outcomes, scan results, log entries and the scan session aggregate.
pub mod models;

/// The static tool catalog and the tool-id-to-command resolver.
pub mod catalog;

/// Subprocess execution with validation, timeout, output capping and
/// outcome classification. The business end of the execution service.
pub mod executor;

/// The client-side controller that sequences tool executions over the
/// transport boundary and maintains the scan session.
pub mod controller;

/// Markdown report generation over a finished (or partial) session.
pub mod report;
