//! podgrid-state — record store for desired pod state.
//!
//! Backed by [redb](https://docs.rs/redb). A pod record is split over
//! explicitly defined tables (see [`tables`]): one row per pod, a unique
//! name index, and ordered port/env rows keyed by `(pod_id, position)`.
//! Rows are JSON-serialized and mapped to and from [`PodRecord`] by the
//! functions in [`rows`].
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod rows;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
