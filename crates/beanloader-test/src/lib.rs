//! # Beanloader Test
//!
//! Testing utilities for the beanloader workspace.
//!
//! - [`MemoryStore`]: reference [`RecordStore`] keeping tables in memory,
//!   mutable through a shared reference
//! - [`StoreConfig`]: TOML/JSON fixtures describing tables, schema and rows
//! - [`fixtures`]: rstest fixtures with ready-made stores
//! - [`logging`]: one-time `tracing` subscriber for tests
//!
//! [`RecordStore`]: beanloader_core::RecordStore

pub mod config;
pub mod fixtures;
pub mod logging;
pub mod store;

pub use config::{FieldConfig, FixtureError, RelationConfig, StoreConfig, TableConfig};
pub use fixtures::{people_store, project_store};
pub use store::MemoryStore;
