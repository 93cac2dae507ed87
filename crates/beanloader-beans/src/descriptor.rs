//! Getter descriptor resolution
//!
//! A [`GetterDescriptor`] is everything the engine needs to compute one
//! getter: the schema path, whether it is a field or a relation, the
//! transformer, key strategy, sort order and collection shape. It is derived
//! from the bean declaration and the store schema once per (bean type,
//! method) and cached for the lifetime of the process; later loads only read
//! the cache. Concurrent first resolutions may race, the first writer wins
//! and the loser's identical result is dropped.

use crate::declare::{
	AnnotationKind, BeanTypeRef, CollectionKind, DefaultMethod, ElementType, GetterDecl,
	KeyExtractor, Member, ReturnShape,
};
use crate::error::{BeanError, ConfigurationError, Result};
use crate::transform::{self, Transformer, TypeInfo};
use beanloader_core::{Cardinality, PredicateExpr, RecordStore, RelationKind, SortKey};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// What a getter reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GetterKind {
	ScalarField,
	ToOneRelation,
	ToManyRelation,
}

/// Container produced by a getter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
	Single,
	List,
	Set,
	OrderedSet,
	Map,
	MapOfCollection(CollectionKind),
}

impl Shape {
	fn of(shape: &ReturnShape) -> Self {
		match shape {
			ReturnShape::Single(_) => Shape::Single,
			ReturnShape::Collection(CollectionKind::List, _) => Shape::List,
			ReturnShape::Collection(CollectionKind::Set, _) => Shape::Set,
			ReturnShape::Collection(CollectionKind::OrderedSet, _) => Shape::OrderedSet,
			ReturnShape::Map { group: None, .. } => Shape::Map,
			ReturnShape::Map {
				group: Some(kind), ..
			} => Shape::MapOfCollection(*kind),
		}
	}

	pub(crate) fn collection(&self) -> Option<CollectionKind> {
		match self {
			Shape::List => Some(CollectionKind::List),
			Shape::Set => Some(CollectionKind::Set),
			Shape::OrderedSet => Some(CollectionKind::OrderedSet),
			_ => None,
		}
	}
}

/// How map keys are computed from related records
#[derive(Clone)]
pub enum KeyStrategy {
	/// Read from this path of each related record
	Path(String),
	Extractor {
		name: &'static str,
		extractor: Arc<dyn KeyExtractor>,
	},
}

impl PartialEq for KeyStrategy {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(KeyStrategy::Path(a), KeyStrategy::Path(b)) => a == b,
			(KeyStrategy::Extractor { name: a, .. }, KeyStrategy::Extractor { name: b, .. }) => a == b,
			_ => false,
		}
	}
}

impl fmt::Debug for KeyStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			KeyStrategy::Path(path) => f.debug_tuple("Path").field(path).finish(),
			KeyStrategy::Extractor { name, .. } => f.debug_tuple("Extractor").field(name).finish(),
		}
	}
}

/// A transformer bound to a getter, with the names used in diagnostics
#[derive(Clone)]
pub struct AppliedTransformer {
	/// Explicit transformer name, or the target type name for implicit ones
	pub name: &'static str,
	/// Type the transformer produces
	pub target: &'static str,
	pub(crate) transformer: Arc<dyn Transformer>,
}

impl AppliedTransformer {
	pub(crate) fn apply(&self, raw: &beanloader_core::Value) -> Result<transform::ScalarValue> {
		self.transformer
			.transform(raw)
			.map_err(|err| BeanError::Transform {
				type_name: self.target,
				message: err.0,
			})
	}
}

impl PartialEq for AppliedTransformer {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.target == other.target
	}
}

impl fmt::Debug for AppliedTransformer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AppliedTransformer")
			.field("name", &self.name)
			.field("target", &self.target)
			.finish()
	}
}

/// Relation metadata of a relation getter
#[derive(Debug, Clone, PartialEq)]
pub struct RelationTarget {
	pub kind: RelationKind,
	pub foreign_table: String,
	/// Cardinality the schema declares; a to-one getter over `Many` keeps the
	/// first related record
	pub cardinality: Cardinality,
	/// Parsed expression of an association by predicate
	pub expression: Option<PredicateExpr>,
}

/// Resolved metadata for one getter of one bean type
#[derive(Debug, Clone, PartialEq)]
pub struct GetterDescriptor {
	pub bean: &'static str,
	pub method: String,
	pub property_path: String,
	pub kind: GetterKind,
	pub target: ElementType,
	pub shape: Shape,
	pub transformer: Option<AppliedTransformer>,
	pub key: Option<KeyStrategy>,
	/// Implicit transformer of the declared map key type
	pub key_transformer: Option<AppliedTransformer>,
	pub sort: Vec<SortKey>,
	pub relation: Option<RelationTarget>,
}

impl GetterDescriptor {
	pub fn is_relation(&self) -> bool {
		self.kind != GetterKind::ScalarField
	}
}

/// How a method call on a proxy is answered
#[derive(Clone)]
pub(crate) enum Route {
	Getter(Arc<GetterDescriptor>),
	Default(DefaultMethod),
	BackingRecord,
}

/// Dispatch table of one bean type
pub struct BeanDescriptor {
	bean: BeanTypeRef,
	getters: Vec<Arc<GetterDescriptor>>,
	routes: HashMap<String, Route>,
}

impl BeanDescriptor {
	/// Resolve `bean` against the schema of `store`, bypassing every cache
	pub fn resolve(bean: BeanTypeRef, store: &dyn RecordStore) -> Result<Self> {
		Self::build(bean, |decl| resolve_getter(bean, decl, store).map(Arc::new))
	}

	fn build(
		bean: BeanTypeRef,
		mut getter: impl FnMut(&GetterDecl) -> Result<Arc<GetterDescriptor>>,
	) -> Result<Self> {
		let definition = bean.definition();
		let mut getters = Vec::new();
		let mut routes = HashMap::with_capacity(definition.members.len());

		for member in &definition.members {
			if routes.contains_key(member.method()) {
				return Err(ConfigurationError::DuplicateMethod {
					bean: bean.name(),
					method: member.method().to_string(),
				}
				.into());
			}
			let route = match member {
				Member::Getter(decl) => {
					let descriptor = getter(decl)?;
					getters.push(Arc::clone(&descriptor));
					Route::Getter(descriptor)
				}
				Member::Default { body, .. } => Route::Default(Arc::clone(body)),
				Member::RecordAccessor(_) => Route::BackingRecord,
			};
			routes.insert(member.method().to_string(), route);
		}

		Ok(Self {
			bean,
			getters,
			routes,
		})
	}

	pub fn bean(&self) -> BeanTypeRef {
		self.bean
	}

	/// Getters in declaration order
	pub fn getters(&self) -> &[Arc<GetterDescriptor>] {
		&self.getters
	}

	pub fn getter(&self, method: &str) -> Option<&Arc<GetterDescriptor>> {
		match self.routes.get(method) {
			Some(Route::Getter(descriptor)) => Some(descriptor),
			_ => None,
		}
	}

	pub(crate) fn route(&self, method: &str) -> Option<&Route> {
		self.routes.get(method)
	}
}

impl fmt::Debug for BeanDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BeanDescriptor")
			.field("bean", &self.bean)
			.field("getters", &self.getters)
			.finish_non_exhaustive()
	}
}

static BEANS: Lazy<DashMap<TypeId, Arc<BeanDescriptor>>> = Lazy::new(DashMap::new);
static GETTERS: Lazy<DashMap<(TypeId, String), Arc<GetterDescriptor>>> = Lazy::new(DashMap::new);

/// The cached dispatch table of `bean`, resolving it on first use
///
/// Configuration errors are not cached; a broken declaration fails again on
/// the next attempt.
pub fn describe(bean: BeanTypeRef, store: &dyn RecordStore) -> Result<Arc<BeanDescriptor>> {
	if let Some(found) = BEANS.get(&bean.id()) {
		return Ok(Arc::clone(found.value()));
	}

	let descriptor = BeanDescriptor::build(bean, |decl| {
		let key = (bean.id(), decl.method().to_string());
		if let Some(found) = GETTERS.get(&key) {
			return Ok(Arc::clone(found.value()));
		}
		let resolved = Arc::new(resolve_getter(bean, decl, store)?);
		tracing::debug!(
			bean = bean.name(),
			method = %resolved.method,
			path = %resolved.property_path,
			kind = ?resolved.kind,
			"resolved getter descriptor"
		);
		Ok(Arc::clone(GETTERS.entry(key).or_insert(resolved).value()))
	})?;

	Ok(Arc::clone(
		BEANS.entry(bean.id()).or_insert_with(|| Arc::new(descriptor)).value(),
	))
}

/// Describe `bean` and every bean type reachable through its relation getters
///
/// Used by loads so that a broken declaration anywhere in the graph fails
/// before the first proxy is produced.
pub fn describe_reachable(bean: BeanTypeRef, store: &dyn RecordStore) -> Result<Arc<BeanDescriptor>> {
	let root = describe(bean, store)?;
	let mut seen = HashSet::from([bean.id()]);
	let mut pending = vec![Arc::clone(&root)];
	while let Some(descriptor) = pending.pop() {
		for getter in descriptor.getters() {
			if let ElementType::Bean(target) = getter.target {
				if seen.insert(target.id()) {
					pending.push(describe(target, store)?);
				}
			}
		}
	}
	Ok(root)
}

/// Property path implied by a getter name: `getFirstName` gives `firstName`
pub fn infer_property_path(method: &str) -> Option<String> {
	let rest = method
		.strip_prefix("get")
		.or_else(|| method.strip_prefix("is"))?;
	let mut chars = rest.chars();
	let first = chars.next()?;
	if !first.is_uppercase() {
		return None;
	}
	Some(first.to_lowercase().chain(chars).collect())
}

/// Resolve one getter declaration of `bean` against the schema of `store`
pub(crate) fn resolve_getter(
	bean: BeanTypeRef,
	decl: &GetterDecl,
	store: &dyn RecordStore,
) -> Result<GetterDescriptor> {
	let name = bean.name();
	let method = decl.method().to_string();

	let inferred = infer_property_path(&method).ok_or_else(|| ConfigurationError::InvalidGetterName {
		bean: name,
		method: method.clone(),
	})?;
	let property_path = match (&decl.value, &decl.path) {
		(Some(value), Some(path)) => {
			return Err(ConfigurationError::AmbiguousPath {
				bean: name,
				method,
				value: value.clone(),
				path: path.clone(),
			}
			.into());
		}
		(Some(explicit), None) | (None, Some(explicit)) => explicit.clone(),
		(None, None) => inferred,
	};

	let node = store
		.resolve_schema(bean.table(), &property_path)
		.ok_or_else(|| ConfigurationError::UnknownPath {
			bean: name,
			method: method.clone(),
			path: property_path.clone(),
		})?;
	let shape = decl.shape.ok_or_else(|| ConfigurationError::MissingReturnShape {
		bean: name,
		method: method.clone(),
	})?;
	if decl.key_path.is_some() && decl.key_extractor.is_some() {
		return Err(ConfigurationError::KeyStrategyConflict { bean: name, method }.into());
	}

	let explicit_transformer = decl
		.transformer
		.map(|reference| {
			reference
				.instantiate()
				.map(|transformer| (reference.name(), transformer))
				.map_err(|reason| ConfigurationError::TransformerInstantiation {
					bean: name,
					method: method.clone(),
					transformer: reference.name(),
					reason,
				})
		})
		.transpose()?;

	let element = shape.element();
	let is_scalar = match (decl.annotation, element) {
		(Some(AnnotationKind::Field), _) => true,
		(_, ElementType::Scalar(info)) if explicit_transformer.is_some() || transform::is_known_scalar(info.id()) => true,
		_ => !node.is_relation(),
	};

	if is_scalar {
		if matches!(
			decl.annotation,
			Some(AnnotationKind::ForeignKey | AnnotationKind::Association)
		) && !node.is_relation()
		{
			return Err(ConfigurationError::NotARelation {
				bean: name,
				method,
				path: property_path,
			}
			.into());
		}
		let ElementType::Scalar(info) = element else {
			return Err(ConfigurationError::UnmatchedMethod {
				bean: name,
				method,
				path: property_path,
			}
			.into());
		};
		if shape.is_map() {
			return Err(ConfigurationError::MapOverScalar {
				bean: name,
				method,
				path: property_path,
			}
			.into());
		}
		if !decl.sort.is_empty() {
			return Err(ConfigurationError::SortWithoutToMany { bean: name, method }.into());
		}
		if decl.key_path.is_some() || decl.key_extractor.is_some() {
			return Err(ConfigurationError::KeyStrategyWithoutMap { bean: name, method }.into());
		}

		let transformer = match explicit_transformer {
			Some((transformer_name, transformer)) => Some(AppliedTransformer {
				name: transformer_name,
				target: info.name(),
				transformer,
			}),
			None => implicit(info),
		};

		return Ok(GetterDescriptor {
			bean: name,
			method,
			property_path,
			kind: GetterKind::ScalarField,
			target: element,
			shape: Shape::of(&shape),
			transformer,
			key: None,
			key_transformer: None,
			sort: Vec::new(),
			relation: None,
		});
	}

	let ElementType::Bean(target_bean) = element else {
		return Err(ConfigurationError::UnmatchedMethod {
			bean: name,
			method,
			path: property_path,
		}
		.into());
	};
	if explicit_transformer.is_some() {
		return Err(ConfigurationError::TransformerOnRelation { bean: name, method }.into());
	}
	let (Some(relation), Some(foreign_table)) = (node.relation.clone(), node.foreign_table.clone()) else {
		return Err(ConfigurationError::IncompleteRelation {
			bean: name,
			method,
			path: property_path,
		}
		.into());
	};
	if target_bean.table() != foreign_table {
		return Err(ConfigurationError::TargetTableMismatch {
			bean: name,
			method,
			expected: target_bean.table().to_string(),
			found: foreign_table,
		}
		.into());
	}

	let kind = if shape.is_single() {
		GetterKind::ToOneRelation
	} else {
		GetterKind::ToManyRelation
	};
	if kind == GetterKind::ToOneRelation && node.cardinality == Cardinality::Many {
		tracing::debug!(
			bean = name,
			method = %method,
			path = %property_path,
			"to-one getter over a many-valued relation keeps the first record"
		);
	}
	if kind != GetterKind::ToManyRelation && !decl.sort.is_empty() {
		return Err(ConfigurationError::SortWithoutToMany { bean: name, method }.into());
	}

	let key = match (&decl.key_path, decl.key_extractor) {
		(Some(path), None) => Some(KeyStrategy::Path(path.clone())),
		(None, Some(reference)) => {
			let extractor = reference.instantiate().map_err(|reason| {
				ConfigurationError::KeyExtractorInstantiation {
					bean: name,
					method: method.clone(),
					extractor: reference.name(),
					reason,
				}
			})?;
			Some(KeyStrategy::Extractor {
				name: reference.name(),
				extractor,
			})
		}
		_ => None,
	};
	let key_transformer = match (&shape, &key) {
		(ReturnShape::Map { key: key_type, .. }, Some(_)) => implicit(*key_type),
		(ReturnShape::Map { .. }, None) => {
			return Err(ConfigurationError::MissingKeyStrategy { bean: name, method }.into());
		}
		(_, Some(_)) => {
			return Err(ConfigurationError::KeyStrategyWithoutMap { bean: name, method }.into());
		}
		(_, None) => None,
	};

	let expression = match &relation {
		RelationKind::AssociationByPredicate { expression } => Some(
			PredicateExpr::parse(expression).map_err(|source| ConfigurationError::InvalidPredicate {
				bean: name,
				method: method.clone(),
				source,
			})?,
		),
		_ => None,
	};

	Ok(GetterDescriptor {
		bean: name,
		method,
		property_path,
		kind,
		target: element,
		shape: Shape::of(&shape),
		transformer: None,
		key,
		key_transformer,
		sort: decl.sort.clone(),
		relation: Some(RelationTarget {
			kind: relation,
			foreign_table,
			cardinality: node.cardinality,
			expression,
		}),
	})
}

fn implicit(info: TypeInfo) -> Option<AppliedTransformer> {
	transform::implicit_transformer(info.id()).map(|transformer| AppliedTransformer {
		name: info.name(),
		target: info.name(),
		transformer,
	})
}
