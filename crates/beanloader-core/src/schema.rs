//! Schema metadata exposed by a record store
//!
//! The mapping engine never inspects a schema directly. It asks the store to
//! resolve a path relative to a table and receives a [`SchemaNode`] that
//! states whether the path is a plain attribute or a relation, how many
//! values it may hold and, for relations, how the related records are found.

use serde::{Deserialize, Serialize};

/// Maximum number of values a schema node may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
	/// At most one value
	#[default]
	One,
	/// Any number of values
	Many,
}

/// Declared element type of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
	Bool,
	Int,
	Float,
	Text,
	/// Holds record keys of another table
	Reference,
	/// Untyped
	#[default]
	Any,
}

/// How the records behind a relation node are located
///
/// Every variant resolves to records of the node's foreign table, never to
/// raw scalars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKind {
	/// The attribute itself holds the key (or keys) of the target records
	DirectForeignKey,
	/// Target records hold this record's key in `foreign_field`
	InverseForeignKey { foreign_field: String },
	/// Target records match a declarative predicate whose `${path}`
	/// placeholders are read from this record
	AssociationByPredicate { expression: String },
	/// Many-to-many through a link table holding two foreign keys
	AssociationByJunctionTable {
		junction_table: String,
		source_field: String,
		target_field: String,
	},
}

impl RelationKind {
	/// Short stable name, used in logs and error messages
	pub fn name(&self) -> &'static str {
		match self {
			RelationKind::DirectForeignKey => "direct_foreign_key",
			RelationKind::InverseForeignKey { .. } => "inverse_foreign_key",
			RelationKind::AssociationByPredicate { .. } => "association_by_predicate",
			RelationKind::AssociationByJunctionTable { .. } => "association_by_junction_table",
		}
	}
}

/// Resolved metadata for one path of a table's schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaNode {
	pub cardinality: Cardinality,
	pub declared_type: ValueType,
	/// Present when the node is a relation
	pub relation: Option<RelationKind>,
	/// Table holding the related records, present for relations
	pub foreign_table: Option<String>,
}

impl SchemaNode {
	/// A plain single-valued attribute
	///
	/// # Examples
	///
	/// ```
	/// use beanloader_core::{Cardinality, SchemaNode, ValueType};
	///
	/// let node = SchemaNode::attribute(ValueType::Text);
	/// assert!(!node.is_relation());
	/// assert_eq!(node.cardinality, Cardinality::One);
	/// ```
	pub fn attribute(declared_type: ValueType) -> Self {
		Self {
			cardinality: Cardinality::One,
			declared_type,
			relation: None,
			foreign_table: None,
		}
	}

	/// A relation to records of `foreign_table`
	pub fn relation(
		relation: RelationKind,
		foreign_table: impl Into<String>,
		cardinality: Cardinality,
	) -> Self {
		Self {
			cardinality,
			declared_type: ValueType::Reference,
			relation: Some(relation),
			foreign_table: Some(foreign_table.into()),
		}
	}

	pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
		self.cardinality = cardinality;
		self
	}

	pub fn is_relation(&self) -> bool {
		self.relation.is_some()
	}
}
