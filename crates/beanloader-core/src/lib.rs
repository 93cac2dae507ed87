//! # Beanloader Core
//!
//! Shared vocabulary between the bean mapping engine and the record stores it
//! reads from.
//!
//! - [`Value`]: raw, totally ordered and hashable store value
//! - [`Identity`] / [`Record`]: stable record identity and the handle the
//!   engine holds instead of record contents
//! - [`SchemaNode`] / [`RelationKind`]: what a path of a table's schema is
//! - [`Predicate`] / [`PredicateExpr`] / [`SortKey`]: queries issued to the
//!   store, including parsed association expressions
//! - [`RecordStore`] / [`RecordCursor`]: the read contract itself

pub mod predicate;
pub mod record;
pub mod schema;
pub mod store;
pub mod value;

pub use predicate::{Condition, Operand, Predicate, PredicateError, PredicateExpr, SortKey};
pub use record::{Identity, Record};
pub use schema::{Cardinality, RelationKind, SchemaNode, ValueType};
pub use store::{IterCursor, RecordCursor, RecordStore, StoreError};
pub use value::Value;
