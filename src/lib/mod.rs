//! Format-preserving Maven POM synchronization library.
//!
//! This library reads `pom.xml` files into a typed model, lets callers change
//! or merge that model, and writes it back while keeping the comments,
//! attribute order, indentation and blank lines of everything that did not
//! change.
//!
//! # Features
//!
//! - **Two parses, one source**: a typed [`model::Project`] for editing and a
//!   formatting-preserving [`tree::Document`] for writing
//! - **Reconciliation**: only changed values touch the file; new elements
//!   copy the indentation of their siblings
//! - **Merging**: overlay one project onto another with identity-aware lists
//! - **Deterministic properties**: property maps are always written in
//!   ascending key order
//! - **Optional tracing**: detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use pom_sync::sync::PomSync;
//!
//! let mut project = PomSync::read_model("pom.xml").unwrap();
//! project.version = Some("2.0.0".to_string());
//! project.properties.insert("java.version", "17");
//!
//! PomSync::write_model(&project).unwrap();
//! ```

pub mod merge;
pub mod model;
pub mod ordered;
pub mod parse;
pub mod read;
pub mod reconcile;
pub mod serialize;
pub mod sync;
pub mod tree;

pub use model::Project;
pub use ordered::OrderedKeyMap;
pub use sync::{PomSync, PomSyncError, PomSyncOptions};
