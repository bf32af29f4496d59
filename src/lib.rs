//! torpedo library: the cluster registry, resiliency coordination and workload
//! drivers behind the `torpedo` binary. Exposed as a lib so scenario code and the
//! integration tests in tests/ can drive them directly.
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::must_use_candidate,   // builders and accessors; callers are scenarios and tests
    clippy::missing_errors_doc,   // every fallible fn returns crate::error::Error or anyhow
    clippy::missing_panics_doc,
)]

pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod k8s;
pub mod logging;
pub mod metadata;
pub mod poll;
pub mod registry;
pub mod resiliency;
pub mod scheduler;
pub mod workload;

pub use error::{Error, Result};
