//! Record handles and identities

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a record: its containing table plus primary key
///
/// Identities are cheap to clone, totally ordered and hashable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
	table: Arc<str>,
	key: Value,
}

impl Identity {
	/// Create an identity for the record `key` in `table`
	///
	/// # Examples
	///
	/// ```
	/// use beanloader_core::{Identity, Value};
	///
	/// let id = Identity::new("person", 1);
	/// assert_eq!(id.table(), "person");
	/// assert_eq!(id.key(), &Value::Int(1));
	/// ```
	pub fn new(table: impl Into<Arc<str>>, key: impl Into<Value>) -> Self {
		Self {
			table: table.into(),
			key: key.into(),
		}
	}

	pub fn table(&self) -> &str {
		&self.table
	}

	pub fn key(&self) -> &Value {
		&self.key
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.table, self.key)
	}
}

/// Handle to a record held by a [`RecordStore`](crate::RecordStore)
///
/// The handle does not carry the record's contents. Every field read goes
/// back to the store, so a handle always observes the store's current state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
	identity: Identity,
}

impl Record {
	/// Create a handle for the record `key` in `table`
	pub fn new(table: impl Into<Arc<str>>, key: impl Into<Value>) -> Self {
		Self {
			identity: Identity::new(table, key),
		}
	}

	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	pub fn table(&self) -> &str {
		self.identity.table()
	}

	pub fn key(&self) -> &Value {
		self.identity.key()
	}
}

impl From<Identity> for Record {
	fn from(identity: Identity) -> Self {
		Self { identity }
	}
}

impl fmt::Display for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.identity)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_identity_equality_uses_table_and_key() {
		assert_eq!(Identity::new("person", 1), Identity::new("person", 1));
		assert_ne!(Identity::new("person", 1), Identity::new("team", 1));
		assert_ne!(Identity::new("person", 1), Identity::new("person", 2));
	}

	#[rstest]
	fn test_record_display() {
		let record = Record::new("task", "T-1");
		assert_eq!(record.to_string(), r#"task#"T-1""#);
		assert_eq!(record.identity().key(), &Value::from("T-1"));
	}
}
