//! Bean type declarations
//!
//! Rust has no runtime reflection over trait methods, so a bean type states
//! its shape once, through a builder, instead of having it inferred from
//! method signatures. The engine resolves that declaration against the store
//! schema the first time the bean type is loaded and caches the result for
//! the lifetime of the process.
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! struct Person(Proxy);
//!
//! impl Bean for Person {
//!     const TABLE: &'static str = "person";
//!
//!     fn declare(def: &mut BeanDefinition) {
//!         def.getter("getName").returns::<String>();
//!         def.getter("getManager").returns_bean::<Person>();
//!         def.getter("getReports").beans::<Person>().sort(SortKey::asc("name"));
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
//! ```

use crate::collect::BeanValue;
use crate::error::Result;
use crate::proxy::Proxy;
use crate::transform::{TransformerRef, TypeInfo};
use beanloader_core::{Record, RecordStore, SortKey, StoreError, Value};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A caller-declared bean type
///
/// Implementors are thin wrappers around a [`Proxy`]; their accessor methods
/// call the proxy's typed getters.
pub trait Bean: Sized + 'static {
	/// Table whose records back this bean type
	const TABLE: &'static str;

	/// Declare the getters, default methods and escape hatch of this type
	fn declare(def: &mut BeanDefinition);

	fn from_proxy(proxy: Proxy) -> Self;

	fn proxy(&self) -> &Proxy;

	/// Name used in diagnostics
	fn bean_name() -> &'static str {
		std::any::type_name::<Self>()
	}
}

/// Type-erased handle to a [`Bean`] implementation
#[derive(Clone, Copy)]
pub struct BeanTypeRef {
	id: TypeId,
	name: &'static str,
	table: &'static str,
	declare: fn(&mut BeanDefinition),
}

impl BeanTypeRef {
	pub fn of<B: Bean>() -> Self {
		Self {
			id: TypeId::of::<B>(),
			name: B::bean_name(),
			table: B::TABLE,
			declare: B::declare,
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn table(&self) -> &'static str {
		self.table
	}

	pub(crate) fn definition(&self) -> BeanDefinition {
		let mut def = BeanDefinition::default();
		(self.declare)(&mut def);
		def
	}
}

impl PartialEq for BeanTypeRef {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for BeanTypeRef {}

impl Hash for BeanTypeRef {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for BeanTypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// Element type of a getter, or of the values of a collection/map getter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
	Scalar(TypeInfo),
	Bean(BeanTypeRef),
}

impl ElementType {
	pub fn scalar<T: Any>() -> Self {
		ElementType::Scalar(TypeInfo::of::<T>())
	}

	pub fn bean<B: Bean>() -> Self {
		ElementType::Bean(BeanTypeRef::of::<B>())
	}
}

/// Container shape of a collection getter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
	/// Keeps duplicates and source order
	List,
	/// Drops duplicates, order unspecified
	Set,
	/// Drops duplicates, keeps first-seen order
	OrderedSet,
}

/// Declared return shape of a getter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
	Single(ElementType),
	Collection(CollectionKind, ElementType),
	/// `group` is set when each key maps to a collection of values
	Map {
		key: TypeInfo,
		value: ElementType,
		group: Option<CollectionKind>,
	},
}

impl ReturnShape {
	pub fn element(&self) -> ElementType {
		match self {
			ReturnShape::Single(element) | ReturnShape::Collection(_, element) => *element,
			ReturnShape::Map { value, .. } => *value,
		}
	}

	pub fn is_single(&self) -> bool {
		matches!(self, ReturnShape::Single(_))
	}

	pub fn is_map(&self) -> bool {
		matches!(self, ReturnShape::Map { .. })
	}
}

/// Explicit mapping annotation of a getter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
	/// Always a scalar field
	Field,
	/// A relation through a foreign key, direct or inverse
	ForeignKey,
	/// A relation through an association (predicate or junction table)
	Association,
}

/// Computes the map key of a related record
///
/// Implementations must be stateless or otherwise shareable between threads.
pub trait KeyExtractor: Send + Sync {
	fn extract(&self, store: &dyn RecordStore, record: &Record) -> std::result::Result<Value, StoreError>;
}

impl<F> KeyExtractor for F
where
	F: Fn(&dyn RecordStore, &Record) -> std::result::Result<Value, StoreError> + Send + Sync,
{
	fn extract(&self, store: &dyn RecordStore, record: &Record) -> std::result::Result<Value, StoreError> {
		self(store, record)
	}
}

/// Factory of a key extractor, named by a getter declaration
#[derive(Clone, Copy)]
pub struct KeyExtractorRef {
	name: &'static str,
	factory: fn() -> std::result::Result<Arc<dyn KeyExtractor>, String>,
}

impl KeyExtractorRef {
	pub const fn new(
		name: &'static str,
		factory: fn() -> std::result::Result<Arc<dyn KeyExtractor>, String>,
	) -> Self {
		Self { name, factory }
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub(crate) fn instantiate(&self) -> std::result::Result<Arc<dyn KeyExtractor>, String> {
		(self.factory)()
	}
}

impl fmt::Debug for KeyExtractorRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("KeyExtractorRef").field(&self.name).finish()
	}
}

/// A method with a body, evaluated against the proxy it is called on
pub type DefaultMethod = Arc<dyn Fn(&Proxy) -> Result<BeanValue> + Send + Sync>;

/// One declared getter, before resolution
#[derive(Debug, Clone, Default)]
pub struct GetterDecl {
	pub(crate) method: String,
	pub(crate) shape: Option<ReturnShape>,
	pub(crate) annotation: Option<AnnotationKind>,
	pub(crate) value: Option<String>,
	pub(crate) path: Option<String>,
	pub(crate) sort: Vec<SortKey>,
	pub(crate) transformer: Option<TransformerRef>,
	pub(crate) key_path: Option<String>,
	pub(crate) key_extractor: Option<KeyExtractorRef>,
}

impl GetterDecl {
	pub fn method(&self) -> &str {
		&self.method
	}
}

pub(crate) enum Member {
	Getter(GetterDecl),
	Default { method: String, body: DefaultMethod },
	RecordAccessor(String),
}

impl Member {
	pub(crate) fn method(&self) -> &str {
		match self {
			Member::Getter(decl) => &decl.method,
			Member::Default { method, .. } | Member::RecordAccessor(method) => method,
		}
	}
}

/// Declaration of one bean type's methods, in declaration order
#[derive(Default)]
pub struct BeanDefinition {
	pub(crate) members: Vec<Member>,
}

impl BeanDefinition {
	/// Declare a getter; its shape and mapping are set on the returned builder
	pub fn getter(&mut self, method: impl Into<String>) -> GetterBuilder<'_> {
		self.members.push(Member::Getter(GetterDecl {
			method: method.into(),
			..GetterDecl::default()
		}));
		match self.members.last_mut() {
			Some(Member::Getter(decl)) => GetterBuilder { decl },
			_ => unreachable!("a getter was just pushed"),
		}
	}

	/// Declare a method with a body, evaluated on every call
	pub fn default_method(
		&mut self,
		method: impl Into<String>,
		body: impl Fn(&Proxy) -> Result<BeanValue> + Send + Sync + 'static,
	) -> &mut Self {
		self.members.push(Member::Default {
			method: method.into(),
			body: Arc::new(body),
		});
		self
	}

	/// Declare the escape-hatch method answering the backing record handle
	pub fn record_accessor(&mut self, method: impl Into<String>) -> &mut Self {
		self.members.push(Member::RecordAccessor(method.into()));
		self
	}
}

/// Builder for one getter declaration
pub struct GetterBuilder<'a> {
	decl: &'a mut GetterDecl,
}

impl GetterBuilder<'_> {
	pub fn shape(self, shape: ReturnShape) -> Self {
		self.decl.shape = Some(shape);
		self
	}

	/// Single scalar of type `T`
	pub fn returns<T: Any>(self) -> Self {
		self.shape(ReturnShape::Single(ElementType::scalar::<T>()))
	}

	/// Single related bean
	pub fn returns_bean<B: Bean>(self) -> Self {
		self.shape(ReturnShape::Single(ElementType::bean::<B>()))
	}

	/// List of scalars of type `T`
	pub fn list<T: Any>(self) -> Self {
		self.shape(ReturnShape::Collection(CollectionKind::List, ElementType::scalar::<T>()))
	}

	/// Set of scalars of type `T`
	pub fn set<T: Any>(self) -> Self {
		self.shape(ReturnShape::Collection(CollectionKind::Set, ElementType::scalar::<T>()))
	}

	/// List of related beans
	pub fn beans<B: Bean>(self) -> Self {
		self.shape(ReturnShape::Collection(CollectionKind::List, ElementType::bean::<B>()))
	}

	/// Set of related beans
	pub fn bean_set<B: Bean>(self) -> Self {
		self.shape(ReturnShape::Collection(CollectionKind::Set, ElementType::bean::<B>()))
	}

	/// Insertion-ordered set of related beans
	pub fn bean_ordered_set<B: Bean>(self) -> Self {
		self.shape(ReturnShape::Collection(
			CollectionKind::OrderedSet,
			ElementType::bean::<B>(),
		))
	}

	/// Map from a key of type `K` to one related bean
	pub fn bean_map<K: Any, B: Bean>(self) -> Self {
		self.shape(ReturnShape::Map {
			key: TypeInfo::of::<K>(),
			value: ElementType::bean::<B>(),
			group: None,
		})
	}

	/// Map from a key of type `K` to a collection of related beans
	pub fn bean_groups<K: Any, B: Bean>(self, group: CollectionKind) -> Self {
		self.shape(ReturnShape::Map {
			key: TypeInfo::of::<K>(),
			value: ElementType::bean::<B>(),
			group: Some(group),
		})
	}

	/// Mark as a scalar field
	pub fn field(self) -> Self {
		self.decl.annotation = Some(AnnotationKind::Field);
		self
	}

	/// Mark as a foreign-key relation
	pub fn foreign_key(self) -> Self {
		self.decl.annotation = Some(AnnotationKind::ForeignKey);
		self
	}

	/// Mark as an association relation
	pub fn association(self) -> Self {
		self.decl.annotation = Some(AnnotationKind::Association);
		self
	}

	/// Explicit path, alias of [`path`](Self::path)
	pub fn value(self, path: impl Into<String>) -> Self {
		self.decl.value = Some(path.into());
		self
	}

	/// Explicit path relative to the bean type's table
	pub fn path(self, path: impl Into<String>) -> Self {
		self.decl.path = Some(path.into());
		self
	}

	/// Append a sort key; to-many relations only
	pub fn sort(self, key: SortKey) -> Self {
		self.decl.sort.push(key);
		self
	}

	pub fn transformer(self, transformer: TransformerRef) -> Self {
		self.decl.transformer = Some(transformer);
		self
	}

	/// Read map keys from `path` of each related record
	pub fn key_path(self, path: impl Into<String>) -> Self {
		self.decl.key_path = Some(path.into());
		self
	}

	/// Compute map keys with a key extractor
	pub fn key_extractor(self, extractor: KeyExtractorRef) -> Self {
		self.decl.key_extractor = Some(extractor);
		self
	}
}
