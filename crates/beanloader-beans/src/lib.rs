//! # Beanloader Beans
//!
//! Object-mapping engine synthesizing instances of caller-declared bean
//! types whose getters are backed by records of a [`RecordStore`].
//!
//! ## Components
//!
//! - **Declarations** (`declare`): the [`Bean`] trait and the getter builder
//!   a bean type describes its methods with
//! - **Transformers** (`transform`): implicit and explicit coercions from raw
//!   store values into getter results
//! - **Descriptors** (`descriptor`): each getter resolved once against the
//!   store schema and cached for the process
//! - **Relations** (`relation`): direct and inverse foreign keys,
//!   associations by predicate and by junction table
//! - **Collectors** (`collect`): lists, sets, ordered sets, 1:1 and grouped
//!   maps
//! - **Proxies** (`proxy`): backed proxies read the live store, eager proxies
//!   are frozen at load time in a per-loader identity arena
//! - **Loader** (`loader`): the [`BeanLoader`] entry point
//!
//! [`RecordStore`]: beanloader_core::RecordStore

mod arena;
pub mod collect;
pub mod declare;
pub mod descriptor;
pub mod error;
mod evaluate;
pub mod loader;
pub mod proxy;
mod relation;
pub mod transform;

pub use collect::{BeanValue, Resolved};
pub use declare::{
	AnnotationKind, Bean, BeanDefinition, BeanTypeRef, CollectionKind, ElementType, GetterBuilder,
	KeyExtractor, KeyExtractorRef, ReturnShape,
};
pub use descriptor::{
	BeanDescriptor, GetterDescriptor, GetterKind, KeyStrategy, Shape, describe, describe_reachable,
};
pub use error::{BeanError, ConfigurationError, Result};
pub use loader::{BeanLoader, Strategy};
pub use proxy::Proxy;
pub use transform::{
	DomainValue, FromScalar, ScalarValue, TransformError, Transformer, TransformerRef,
	TransformerRegistry, TypeInfo, register_transformer,
};
