//! The read contract a record store offers to the mapping engine

use crate::predicate::{Predicate, PredicateError, SortKey};
use crate::record::{Identity, Record};
use crate::schema::SchemaNode;
use crate::value::Value;
use thiserror::Error;

/// Errors reported by a record store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
	#[error("Unknown table: {0}")]
	UnknownTable(String),

	#[error("Unknown record: {0}")]
	UnknownRecord(Identity),

	#[error("Invalid predicate: {0}")]
	Predicate(#[from] PredicateError),

	#[error("Store backend error: {0}")]
	Backend(String),
}

/// Read access to a hierarchical, path-addressable record store
///
/// Implementations own the records; the engine only holds [`Record`]
/// handles and reads through this trait. All calls are synchronous.
pub trait RecordStore: Send + Sync {
	/// Read the value at `path` (dotted, relative to the record's table)
	///
	/// Multi-valued attributes are returned as [`Value::List`], absent values
	/// as [`Value::Null`].
	fn get(&self, record: &Record, path: &str) -> Result<Value, StoreError>;

	/// Resolve `path` against the schema of `table`
	fn resolve_schema(&self, table: &str, path: &str) -> Option<SchemaNode>;

	/// Find the record of `table` whose key is `key`
	fn lookup_by_identity(&self, table: &str, key: &Value) -> Result<Option<Record>, StoreError>;

	/// Records of `table` matching `predicate`, in store order unless `sort`
	/// is non-empty
	fn query_by_predicate(
		&self,
		table: &str,
		predicate: &Predicate,
		sort: &[SortKey],
	) -> Result<Vec<Record>, StoreError>;

	/// Stable identity of `record`
	fn identity_of(&self, record: &Record) -> Identity {
		record.identity().clone()
	}
}

/// A forward-only source of records owned by the caller
///
/// Loading from a cursor drains it but never closes it; closing stays the
/// caller's responsibility.
pub trait RecordCursor {
	fn next_record(&mut self) -> Result<Option<Record>, StoreError>;
}

/// Adapts any iterator of records into a cursor
pub struct IterCursor<I> {
	inner: I,
}

impl<I> IterCursor<I>
where
	I: Iterator<Item = Record>,
{
	pub fn new(inner: I) -> Self {
		Self { inner }
	}
}

impl<I> RecordCursor for IterCursor<I>
where
	I: Iterator<Item = Record>,
{
	fn next_record(&mut self) -> Result<Option<Record>, StoreError> {
		Ok(self.inner.next())
	}
}
