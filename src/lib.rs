//! # batch-controller
//!
//! Submits risk-pricing and simulation workloads to a batch compute service.
//!
//! ## Usage
//!
//! ```bash
//! batch-controller -e mybatch.eastus.batch.azure.com workflow-fs --trade-window 1000 --tasks 10
//! ```
//!
//! ## Modules
//!
//! - `workload` - Partitioning, task specs and workflow graphs (pure, synchronous)
//! - `batch` - Submission and pool boundaries, REST client and in-memory mock
//! - `config` - Layered controller configuration
//! - `error` - Unified error type with stable codes and exit codes
//! - `cli` - Argument parsing and command routing
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod workload;
