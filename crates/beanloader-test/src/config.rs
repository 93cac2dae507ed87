//! Declarative store fixtures
//!
//! A [`StoreConfig`] describes tables, their schema and their rows. It is
//! read from TOML or JSON and turned into a populated [`MemoryStore`]:
//!
//! ```toml
//! [tables.person.fields]
//! name = { type = "text" }
//!
//! [tables.person.relations]
//! manager = { kind = "direct_foreign_key", table = "person" }
//!
//! [[tables.person.rows]]
//! id = 1
//! name = "A"
//! manager = 2
//! ```

use crate::store::MemoryStore;
use beanloader_core::{Cardinality, RelationKind, SchemaNode, Value, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Errors raised while loading a fixture
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Unsupported fixture format: {0}")]
	UnsupportedFormat(String),

	#[error("Invalid fixture: {0}")]
	Invalid(String),
}

/// A whole store: tables by name, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
	#[serde(default)]
	pub tables: IndexMap<String, TableConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
	/// Field holding the row key
	#[serde(default = "default_key")]
	pub key: String,
	#[serde(default)]
	pub fields: IndexMap<String, FieldConfig>,
	#[serde(default)]
	pub relations: IndexMap<String, RelationConfig>,
	#[serde(default)]
	pub rows: Vec<IndexMap<String, Value>>,
}

fn default_key() -> String {
	"id".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
	#[serde(rename = "type", default)]
	pub value_type: ValueType,
	#[serde(default)]
	pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationConfig {
	/// Table holding the related records
	pub table: String,
	#[serde(default)]
	pub cardinality: Cardinality,
	#[serde(flatten)]
	pub kind: RelationKind,
}

impl StoreConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, FixtureError> {
		Ok(toml::from_str(input)?)
	}

	pub fn from_json_str(input: &str) -> Result<Self, FixtureError> {
		Ok(serde_json::from_str(input)?)
	}

	/// Load a fixture file, picking the format from its extension
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
		let path = path.as_ref();
		let ext = path
			.extension()
			.and_then(|e| e.to_str())
			.ok_or_else(|| FixtureError::UnsupportedFormat("No file extension".to_string()))?;
		let content = fs::read_to_string(path)?;

		match ext {
			"toml" => Self::from_toml_str(&content),
			"json" => Self::from_json_str(&content),
			_ => Err(FixtureError::UnsupportedFormat(format!(
				"Unsupported file extension: {}",
				ext
			))),
		}
	}

	/// Check cross-table references before any row is inserted
	pub fn validate(&self) -> Result<(), FixtureError> {
		for (name, table) in &self.tables {
			for (field, relation) in &table.relations {
				if !self.tables.contains_key(&relation.table) {
					return Err(FixtureError::Invalid(format!(
						"{}.{} points to unknown table `{}`",
						name, field, relation.table
					)));
				}
				if let RelationKind::AssociationByJunctionTable { junction_table, .. } = &relation.kind {
					if !self.tables.contains_key(junction_table) {
						return Err(FixtureError::Invalid(format!(
							"{}.{} uses unknown junction table `{}`",
							name, field, junction_table
						)));
					}
				}
			}
			for (index, row) in table.rows.iter().enumerate() {
				if row.get(&table.key).is_none_or(Value::is_null) {
					return Err(FixtureError::Invalid(format!(
						"row {} of `{}` has no `{}` key",
						index, name, table.key
					)));
				}
			}
		}
		Ok(())
	}

	/// Build a populated store
	pub fn build(&self) -> Result<MemoryStore, FixtureError> {
		self.validate()?;

		let mut store = MemoryStore::new();
		for (name, table) in &self.tables {
			store = store.with_table(name, &table.key);
			for (field, config) in &table.fields {
				store = store.with_field(
					name,
					field,
					SchemaNode::attribute(config.value_type).with_cardinality(config.cardinality),
				);
			}
			for (field, relation) in &table.relations {
				store = store.with_field(
					name,
					field,
					SchemaNode::relation(relation.kind.clone(), relation.table.clone(), relation.cardinality),
				);
			}
		}

		for (name, table) in &self.tables {
			for row in &table.rows {
				store
					.insert(name, row.iter().map(|(field, value)| (field.as_str(), value.clone())))
					.map_err(|err| FixtureError::Invalid(err.to_string()))?;
			}
		}
		Ok(store)
	}
}

impl MemoryStore {
	/// Build a store from a TOML fixture
	pub fn from_toml_str(input: &str) -> Result<Self, FixtureError> {
		StoreConfig::from_toml_str(input)?.build()
	}

	/// Build a store from a fixture file (`.toml` or `.json`)
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
		StoreConfig::from_file(path)?.build()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use beanloader_core::{Record, RecordStore};
	use rstest::rstest;
	use std::io::Write;
	use tempfile::TempDir;

	const FIXTURE: &str = r#"
[tables.person]
key = "id"

[tables.person.fields]
name = { type = "text" }
nicknames = { type = "text", cardinality = "many" }

[tables.person.relations]
manager = { kind = "direct_foreign_key", table = "person" }
reports = { kind = "inverse_foreign_key", foreign_field = "manager", table = "person", cardinality = "many" }

[[tables.person.rows]]
id = 1
name = "A"
manager = 2
nicknames = ["a", "aa"]

[[tables.person.rows]]
id = 2
name = "B"
"#;

	#[rstest]
	fn test_parse_toml_fixture() {
		let config = StoreConfig::from_toml_str(FIXTURE).unwrap();
		let person = &config.tables["person"];
		assert_eq!(person.rows.len(), 2);
		assert_eq!(
			person.relations["reports"].kind,
			RelationKind::InverseForeignKey {
				foreign_field: "manager".to_string()
			}
		);
		assert_eq!(person.relations["reports"].cardinality, Cardinality::Many);
		assert_eq!(person.fields["nicknames"].cardinality, Cardinality::Many);
	}

	#[rstest]
	fn test_build_store_from_fixture() {
		let store = MemoryStore::from_toml_str(FIXTURE).unwrap();
		let a = Record::new("person", 1);
		assert_eq!(store.get(&a, "manager.name").unwrap(), Value::from("B"));
		assert_eq!(
			store.get(&a, "nicknames").unwrap(),
			Value::List(vec![Value::from("a"), Value::from("aa")])
		);
		assert!(store.resolve_schema("person", "reports").unwrap().is_relation());
	}

	#[rstest]
	fn test_unknown_foreign_table_is_invalid() {
		let input = r#"
[tables.task.relations]
owner = { kind = "direct_foreign_key", table = "person" }
"#;
		let err = StoreConfig::from_toml_str(input).unwrap().build().unwrap_err();
		assert!(matches!(err, FixtureError::Invalid(message) if message.contains("person")));
	}

	#[rstest]
	fn test_row_without_key_is_invalid() {
		let input = r#"
[[tables.person.rows]]
name = "nobody"
"#;
		let err = StoreConfig::from_toml_str(input).unwrap().validate().unwrap_err();
		assert!(matches!(err, FixtureError::Invalid(_)));
	}

	#[rstest]
	fn test_from_file_by_extension() {
		let temp_dir = TempDir::new().unwrap();
		let json_path = temp_dir.path().join("store.json");
		let mut file = fs::File::create(&json_path).unwrap();
		writeln!(
			file,
			r#"{{"tables": {{"tag": {{"fields": {{"label": {{"type": "text"}}}}, "rows": [{{"id": 1, "label": "x"}}]}}}}}}"#
		)
		.unwrap();

		let store = MemoryStore::from_file(&json_path).unwrap();
		assert_eq!(store.len("tag"), 1);

		let yaml_path = temp_dir.path().join("store.yaml");
		fs::write(&yaml_path, "tables: {}").unwrap();
		assert!(matches!(
			StoreConfig::from_file(&yaml_path),
			Err(FixtureError::UnsupportedFormat(_))
		));
	}
}
