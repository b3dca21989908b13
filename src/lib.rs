//! # changed-matrix
//!
//! Decides which entries of a CI build matrix are relevant to a change.
//!
//! A symbolic reference (branch, tag or `<number>/merge`) is resolved into
//! a `base...head` range, the files changed in that range are reduced to
//! their top-level directories, and the caller's matrix is filtered down to
//! the entries whose service directory changed.
//!
//! ## Quick Start
//!
//! ```rust
//! use changed_matrix::changes::{changed_top_level_dirs, FileChange};
//! use changed_matrix::matrix::filter_flat;
//! use serde_json::json;
//!
//! let changed = changed_top_level_dirs(&[
//!     FileChange::new("api/src/main.rs"),
//!     FileChange::new("README.md"),
//! ]);
//! let matrix = vec![json!({"service": "api"}), json!({"service": "web"})];
//!
//! assert_eq!(filter_flat(&matrix, &changed), vec![json!({"service": "api"})]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod changes;
pub mod cli;
pub mod config;
pub mod error;
pub mod matrix;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod resolve;

pub use crate::cli::Cli;
pub use crate::error::FilterError;

/// The current version of changed-matrix.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
