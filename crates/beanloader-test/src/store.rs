//! In-memory record store
//!
//! Tables keep rows in insertion order, which is the store order relation
//! queries observe when no sort is requested. Rows are mutable through
//! `&self`, so a store shared behind an `Arc` can be changed under live
//! (backed) beans.

use beanloader_core::{
	Cardinality, Predicate, Record, RecordStore, RelationKind, SchemaNode, SortKey, StoreError,
	Value, ValueType,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::cmp::Ordering;

type Row = IndexMap<String, Value>;

#[derive(Debug, Clone)]
struct Table {
	key_field: String,
	schema: IndexMap<String, SchemaNode>,
	rows: IndexMap<Value, Row>,
}

impl Table {
	fn new(key_field: &str) -> Self {
		let mut schema = IndexMap::new();
		schema.insert(key_field.to_string(), SchemaNode::attribute(ValueType::Any));
		Self {
			key_field: key_field.to_string(),
			schema,
			rows: IndexMap::new(),
		}
	}
}

/// Record store keeping every table in memory
///
/// # Examples
///
/// ```
/// use beanloader_core::{Record, RecordStore, SchemaNode, Value, ValueType};
/// use beanloader_test::MemoryStore;
///
/// let store = MemoryStore::new()
///     .with_table("person", "id")
///     .with_field("person", "name", SchemaNode::attribute(ValueType::Text));
/// let alice = store.insert("person", [("id", Value::from(1)), ("name", Value::from("Alice"))]).unwrap();
///
/// assert_eq!(store.get(&alice, "name").unwrap(), Value::from("Alice"));
/// assert_eq!(alice, Record::new("person", 1));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
	tables: RwLock<IndexMap<String, Table>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add an empty table whose rows are keyed by `key_field`
	pub fn with_table(self, table: &str, key_field: &str) -> Self {
		self.tables
			.write()
			.entry(table.to_string())
			.or_insert_with(|| Table::new(key_field));
		self
	}

	/// Declare `path` in the schema of `table`, creating the table if needed
	pub fn with_field(self, table: &str, path: &str, node: SchemaNode) -> Self {
		self.tables
			.write()
			.entry(table.to_string())
			.or_insert_with(|| Table::new("id"))
			.schema
			.insert(path.to_string(), node);
		self
	}

	/// Insert or replace a row, returning its record handle
	pub fn insert<'a>(
		&self,
		table: &str,
		fields: impl IntoIterator<Item = (&'a str, Value)>,
	) -> Result<Record, StoreError> {
		let mut tables = self.tables.write();
		let entry = tables
			.get_mut(table)
			.ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
		let row: Row = fields
			.into_iter()
			.map(|(field, value)| (field.to_string(), value))
			.collect();
		let key = row.get(&entry.key_field).cloned().unwrap_or_default();
		if key.is_null() {
			return Err(StoreError::Backend(format!(
				"row of `{}` has no `{}` key",
				table, entry.key_field
			)));
		}
		entry.rows.insert(key.clone(), row);
		Ok(Record::new(table, key))
	}

	/// Overwrite one field of an existing row
	pub fn set(&self, record: &Record, field: &str, value: impl Into<Value>) -> Result<(), StoreError> {
		let mut tables = self.tables.write();
		let row = tables
			.get_mut(record.table())
			.ok_or_else(|| StoreError::UnknownTable(record.table().to_string()))?
			.rows
			.get_mut(record.key())
			.ok_or_else(|| StoreError::UnknownRecord(record.identity().clone()))?;
		row.insert(field.to_string(), value.into());
		Ok(())
	}

	/// Delete a row; returns whether it existed
	pub fn remove(&self, record: &Record) -> bool {
		self.tables
			.write()
			.get_mut(record.table())
			.and_then(|table| table.rows.shift_remove(record.key()))
			.is_some()
	}

	/// Handles of every row of `table`, in store order
	pub fn records(&self, table: &str) -> Vec<Record> {
		self.tables
			.read()
			.get(table)
			.map(|entry| {
				entry
					.rows
					.keys()
					.map(|key| Record::new(table, key.clone()))
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn len(&self, table: &str) -> usize {
		self.tables.read().get(table).map_or(0, |entry| entry.rows.len())
	}
}

fn node_of(tables: &IndexMap<String, Table>, table: &str, path: &str) -> Option<SchemaNode> {
	let entry = tables.get(table)?;
	if let Some(node) = entry.schema.get(path) {
		return Some(node.clone());
	}
	let (head, rest) = path.split_once('.')?;
	let node = entry.schema.get(head)?;
	match (&node.relation, &node.foreign_table) {
		(Some(RelationKind::DirectForeignKey), Some(foreign)) => {
			let inner = node_of(tables, foreign, rest)?;
			Some(match node.cardinality {
				Cardinality::Many => inner.with_cardinality(Cardinality::Many),
				Cardinality::One => inner,
			})
		}
		_ => None,
	}
}

/// Read `path` of the row `key` of `table`, following direct foreign keys
/// through dotted paths
fn read_path(tables: &IndexMap<String, Table>, table: &str, row: &Row, path: &str) -> Value {
	if let Some(value) = row.get(path) {
		return value.clone();
	}
	let Some((head, rest)) = path.split_once('.') else {
		return Value::Null;
	};
	let Some(entry) = tables.get(table) else {
		return Value::Null;
	};
	let Some(node) = entry.schema.get(head) else {
		return Value::Null;
	};
	let (Some(RelationKind::DirectForeignKey), Some(foreign)) = (&node.relation, &node.foreign_table) else {
		return Value::Null;
	};
	let Some(foreign_rows) = tables.get(foreign.as_str()).map(|entry| &entry.rows) else {
		return Value::Null;
	};

	let values: Vec<Value> = row
		.get(head)
		.cloned()
		.unwrap_or_default()
		.into_list()
		.iter()
		.filter_map(|key| foreign_rows.get(key))
		.map(|related| read_path(tables, foreign, related, rest))
		.collect();
	match node.cardinality {
		Cardinality::One => values.into_iter().next().unwrap_or_default(),
		Cardinality::Many => Value::List(
			values
				.into_iter()
				.flat_map(Value::into_list)
				.collect(),
		),
	}
}

fn compare_rows(a: &[Value], b: &[Value], sort: &[SortKey]) -> Ordering {
	a.iter()
		.zip(b)
		.zip(sort)
		.map(|((left, right), key)| {
			if key.ascending {
				left.cmp(right)
			} else {
				right.cmp(left)
			}
		})
		.find(|ordering| *ordering != Ordering::Equal)
		.unwrap_or(Ordering::Equal)
}

impl RecordStore for MemoryStore {
	fn get(&self, record: &Record, path: &str) -> Result<Value, StoreError> {
		let tables = self.tables.read();
		let entry = tables
			.get(record.table())
			.ok_or_else(|| StoreError::UnknownTable(record.table().to_string()))?;
		let row = entry
			.rows
			.get(record.key())
			.ok_or_else(|| StoreError::UnknownRecord(record.identity().clone()))?;
		Ok(read_path(&tables, record.table(), row, path))
	}

	fn resolve_schema(&self, table: &str, path: &str) -> Option<SchemaNode> {
		node_of(&self.tables.read(), table, path)
	}

	fn lookup_by_identity(&self, table: &str, key: &Value) -> Result<Option<Record>, StoreError> {
		let tables = self.tables.read();
		let entry = tables
			.get(table)
			.ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
		Ok(entry
			.rows
			.get_key_value(key)
			.map(|(key, _)| Record::new(table, key.clone())))
	}

	fn query_by_predicate(
		&self,
		table: &str,
		predicate: &Predicate,
		sort: &[SortKey],
	) -> Result<Vec<Record>, StoreError> {
		let tables = self.tables.read();
		let entry = tables
			.get(table)
			.ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

		let mut matched: Vec<(Vec<Value>, Record)> = entry
			.rows
			.iter()
			.filter(|(_, row)| predicate.matches(|field| read_path(&tables, table, row, field)))
			.map(|(key, row)| {
				let sort_values = sort
					.iter()
					.map(|key| read_path(&tables, table, row, &key.path))
					.collect();
				(sort_values, Record::new(table, key.clone()))
			})
			.collect();
		if !sort.is_empty() {
			matched.sort_by(|(a, _), (b, _)| compare_rows(a, b, sort));
		}
		Ok(matched.into_iter().map(|(_, record)| record).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn store() -> MemoryStore {
		let store = MemoryStore::new()
			.with_table("city", "code")
			.with_field("city", "name", SchemaNode::attribute(ValueType::Text))
			.with_field("person", "name", SchemaNode::attribute(ValueType::Text))
			.with_field(
				"person",
				"city",
				SchemaNode::relation(RelationKind::DirectForeignKey, "city", Cardinality::One),
			);
		store
			.insert("city", [("code", Value::from("PAR")), ("name", Value::from("Paris"))])
			.unwrap();
		store
			.insert(
				"person",
				[("id", Value::from(1)), ("name", Value::from("b")), ("city", Value::from("PAR"))],
			)
			.unwrap();
		store
			.insert("person", [("id", Value::from(2)), ("name", Value::from("a"))])
			.unwrap();
		store
	}

	#[rstest]
	fn test_get_follows_dotted_foreign_key(store: MemoryStore) {
		let person = Record::new("person", 1);
		assert_eq!(store.get(&person, "city.name").unwrap(), Value::from("Paris"));
		assert_eq!(store.get(&Record::new("person", 2), "city.name").unwrap(), Value::Null);
	}

	#[rstest]
	fn test_resolve_schema_through_relation(store: MemoryStore) {
		let node = store.resolve_schema("person", "city.name").unwrap();
		assert_eq!(node.declared_type, ValueType::Text);
		assert!(store.resolve_schema("person", "city.country").is_none());
		assert!(store.resolve_schema("nowhere", "name").is_none());
	}

	#[rstest]
	fn test_get_unknown_record(store: MemoryStore) {
		let err = store.get(&Record::new("person", 9), "name").unwrap_err();
		assert!(matches!(err, StoreError::UnknownRecord(_)));
	}

	#[rstest]
	fn test_query_sorts_and_filters(store: MemoryStore) {
		let all = store
			.query_by_predicate("person", &Predicate::all(), &[SortKey::asc("name")])
			.unwrap();
		assert_eq!(all, vec![Record::new("person", 2), Record::new("person", 1)]);

		let in_paris = store
			.query_by_predicate("person", &Predicate::all().eq("city", "PAR"), &[])
			.unwrap();
		assert_eq!(in_paris, vec![Record::new("person", 1)]);
	}

	#[rstest]
	fn test_mutation(store: MemoryStore) {
		let person = Record::new("person", 2);
		store.set(&person, "name", "z").unwrap();
		assert_eq!(store.get(&person, "name").unwrap(), Value::from("z"));
		assert!(store.remove(&person));
		assert!(!store.remove(&person));
		assert_eq!(store.len("person"), 1);
	}

	#[rstest]
	fn test_insert_requires_key(store: MemoryStore) {
		let err = store.insert("person", [("name", Value::from("x"))]).unwrap_err();
		assert!(matches!(err, StoreError::Backend(_)));
	}
}
