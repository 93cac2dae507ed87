//! # Beanloader
//!
//! Record-backed bean types for Rust.
//!
//! A bean type is a thin wrapper around a [`Proxy`] that declares its getters
//! once; a [`BeanLoader`] synthesizes instances whose getters read scalar
//! fields and follow relations of a path-addressable [`RecordStore`].
//!
//! ## Strategies
//!
//! - **Backed** ([`BeanLoader::backed`]): every getter call reads the live
//!   store, so beans observe later mutations.
//! - **Eager** ([`BeanLoader::eager`]): every getter is computed at load time;
//!   one instance exists per (bean type, record identity) for the lifetime of
//!   the loader, and cyclic graphs terminate.
//!
//! ## Relations
//!
//! - Direct foreign key (the field holds the key or keys)
//! - Inverse foreign key (related records hold this record's key)
//! - Association by predicate (`project = ${id} and status = 'open'`)
//! - Association by junction table (many-to-many through link rows)
//!
//! To-many getters collect into lists, sets, insertion-ordered sets, 1:1 maps
//! or grouped maps.
//!
//! ## Feature Flags
//!
//! - `test-utils` - re-exports `beanloader-test` (in-memory store, fixtures,
//!   test logging) as [`test`]
//!
//! ## Example
//!
//! ```
//! use beanloader::Result;
//! use beanloader::prelude::*;
//! use beanloader_test::{MemoryStore, fixtures::PEOPLE_FIXTURE};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! struct Person(Proxy);
//!
//! impl Person {
//!     fn name(&self) -> Result<Option<String>> {
//!         self.0.scalar("getName")
//!     }
//!
//!     fn manager(&self) -> Result<Option<Person>> {
//!         self.0.bean("getManager")
//!     }
//! }
//!
//! impl Bean for Person {
//!     const TABLE: &'static str = "person";
//!
//!     fn declare(def: &mut BeanDefinition) {
//!         def.getter("getName").returns::<String>();
//!         def.getter("getManager").returns_bean::<Person>();
//!     }
//!
//!     fn from_proxy(proxy: Proxy) -> Self {
//!         Person(proxy)
//!     }
//!
//!     fn proxy(&self) -> &Proxy {
//!         &self.0
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let store = Arc::new(MemoryStore::from_toml_str(PEOPLE_FIXTURE).unwrap());
//! let loader = BeanLoader::eager(store);
//!
//! let a: Person = loader.load_one(&Record::new("person", 1))?;
//! let b = a.manager()?.unwrap();
//! assert_eq!(a.name()?, Some("A".to_string()));
//! assert_eq!(b.name()?, Some("B".to_string()));
//! assert!(b.manager()?.is_none());
//! # Ok(())
//! # }
//! ```
//!
//! [`Proxy`]: beanloader_beans::Proxy
//! [`BeanLoader`]: beanloader_beans::BeanLoader
//! [`BeanLoader::backed`]: beanloader_beans::BeanLoader::backed
//! [`BeanLoader::eager`]: beanloader_beans::BeanLoader::eager
//! [`RecordStore`]: beanloader_core::RecordStore

pub use beanloader_beans as beans;
pub use beanloader_core as store;

#[cfg(feature = "test-utils")]
pub use beanloader_test as test;

pub use beanloader_beans::{
	Bean, BeanDefinition, BeanError, BeanLoader, BeanValue, CollectionKind, ConfigurationError,
	KeyExtractorRef, Proxy, Resolved, Result, ScalarValue, Strategy, TransformError,
	TransformerRef, register_transformer,
};
pub use beanloader_core::{
	Identity, Record, RecordCursor, RecordStore, SchemaNode, SortKey, StoreError, Value,
};

/// Everything needed to declare and load bean types
///
/// The crate's [`Result`] alias is left out so glob imports keep the
/// standard two-parameter `Result` in scope.
pub mod prelude {
	pub use crate::{
		Bean, BeanDefinition, BeanError, BeanLoader, BeanValue, CollectionKind, ConfigurationError,
		Identity, KeyExtractorRef, Proxy, Record, RecordCursor, RecordStore, Resolved, ScalarValue,
		SortKey, Strategy, StoreError, TransformError, TransformerRef, Value,
		register_transformer,
	};
}
