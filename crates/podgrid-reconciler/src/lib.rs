//! podgrid-reconciler — reconciles pod records into cluster Deployments.
//!
//! The [`Reconciler`] owns the ordering contract between the orchestrator
//! and the record store:
//!
//! ```text
//! create:  store name lookup (must be absent) → translate → get (must be absent)
//!          → orchestrator create → store create
//! update:  store get → translate → get (must be present) → orchestrator update → store update
//! delete:  store get → orchestrator delete → store delete (one transaction)
//! ```
//!
//! The orchestrator is always mutated before the store, and the store is
//! never touched after a failed orchestrator call. The only inconsistency
//! that can remain comes from a store write failing after the orchestrator
//! call succeeded. It is reported to the caller and logged at `warn`;
//! nothing retries or compensates.

pub mod error;
pub mod reconciler;

pub use error::{PodError, PodResult};
pub use reconciler::Reconciler;
