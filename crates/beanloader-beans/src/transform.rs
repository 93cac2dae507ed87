//! Transformer registry
//!
//! A transformer coerces a raw store [`Value`] into the value a getter
//! declares. The registry maps a target type to its implicit transformer; a
//! getter may instead name an explicit transformer, which always wins.
//!
//! Transformers see `Value::Null` too, so a null in the store may become a
//! non-null domain default (the builtin `bool` transformer maps null to
//! `false`).
//!
//! The registry is process-wide, like the descriptor cache that captures its
//! entries: register custom transformers at startup, before the first load
//! that needs them.

use beanloader_core::Value;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime description of a Rust type: its `TypeId` and name
#[derive(Clone, Copy)]
pub struct TypeInfo {
	id: TypeId,
	name: &'static str,
}

impl TypeInfo {
	pub fn of<T: Any>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl PartialEq for TypeInfo {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for TypeInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// A transformed value of an arbitrary Rust type
///
/// Retrieved with [`DomainValue::downcast_ref`] or the `domain` accessor of a
/// proxy.
#[derive(Clone)]
pub struct DomainValue {
	value: Arc<dyn Any + Send + Sync>,
	type_name: &'static str,
}

impl DomainValue {
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self {
			value: Arc::new(value),
			type_name: std::any::type_name::<T>(),
		}
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref::<T>()
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}
}

impl fmt::Debug for DomainValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "DomainValue<{}>", self.type_name)
	}
}

/// Output of a transformer
#[derive(Debug, Clone)]
pub enum ScalarValue {
	/// A plain store value (possibly coerced)
	Plain(Value),
	/// A value of a richer domain type
	Domain(DomainValue),
}

impl ScalarValue {
	pub fn domain<T: Any + Send + Sync>(value: T) -> Self {
		ScalarValue::Domain(DomainValue::new(value))
	}
}

/// A rejected coercion
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}

	fn unexpected(raw: &Value, target: &str) -> Self {
		Self(format!("cannot coerce {} value {} into {}", raw.kind_name(), raw, target))
	}
}

/// A pure coercion from a raw store value
///
/// Implementations must be stateless or otherwise safe to share between
/// threads; one instance serves every bean of the process.
pub trait Transformer: Send + Sync {
	fn transform(&self, raw: &Value) -> Result<ScalarValue, TransformError>;
}

impl<F> Transformer for F
where
	F: Fn(&Value) -> Result<ScalarValue, TransformError> + Send + Sync,
{
	fn transform(&self, raw: &Value) -> Result<ScalarValue, TransformError> {
		self(raw)
	}
}

/// Factory of an explicit transformer, named by a getter declaration
///
/// The factory runs when the getter is resolved; a failure there is a
/// configuration error, never a call-time error.
#[derive(Clone, Copy)]
pub struct TransformerRef {
	name: &'static str,
	factory: fn() -> Result<Arc<dyn Transformer>, String>,
}

impl TransformerRef {
	pub const fn new(name: &'static str, factory: fn() -> Result<Arc<dyn Transformer>, String>) -> Self {
		Self { name, factory }
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub(crate) fn instantiate(&self) -> Result<Arc<dyn Transformer>, String> {
		(self.factory)()
	}
}

impl fmt::Debug for TransformerRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("TransformerRef").field(&self.name).finish()
	}
}

/// Table of implicit transformers keyed by target type
pub struct TransformerRegistry {
	entries: HashMap<TypeId, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
	/// A registry without any entry
	pub fn empty() -> Self {
		Self {
			entries: HashMap::new(),
		}
	}

	/// A registry holding the builtin scalar coercions
	pub fn with_builtins() -> Self {
		let mut registry = Self::empty();
		registry.register::<String>(coerce_string);
		registry.register::<i64>(|raw: &Value| coerce_int(raw, "i64", |i| Some(Value::Int(i))));
		registry.register::<i32>(|raw: &Value| {
			coerce_int(raw, "i32", |i| i32::try_from(i).ok().map(Value::from))
		});
		registry.register::<u32>(|raw: &Value| {
			coerce_int(raw, "u32", |i| u32::try_from(i).ok().map(Value::from))
		});
		registry.register::<u64>(|raw: &Value| {
			coerce_int(raw, "u64", |i| (i >= 0).then_some(Value::Int(i)))
		});
		registry.register::<f64>(coerce_float);
		registry.register::<bool>(coerce_bool);
		registry.register::<Value>(|raw: &Value| Ok(ScalarValue::Plain(raw.clone())));
		registry
	}

	pub fn register<T: Any>(&mut self, transformer: impl Transformer + 'static) {
		self.entries.insert(TypeId::of::<T>(), Arc::new(transformer));
	}

	pub fn get(&self, type_id: TypeId) -> Option<Arc<dyn Transformer>> {
		self.entries.get(&type_id).cloned()
	}

	pub fn contains(&self, type_id: TypeId) -> bool {
		self.entries.contains_key(&type_id)
	}
}

impl Default for TransformerRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

static REGISTRY: Lazy<RwLock<TransformerRegistry>> =
	Lazy::new(|| RwLock::new(TransformerRegistry::with_builtins()));

/// Register the implicit transformer for `T` in the process-wide registry
///
/// Getters already resolved keep the transformer they captured, so register
/// before the first load that involves `T`.
///
/// # Examples
///
/// ```
/// use beanloader_beans::transform::{register_transformer, implicit_transformer, ScalarValue, TransformError};
/// use beanloader_core::Value;
/// use std::any::TypeId;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Celsius(f64);
///
/// register_transformer::<Celsius>(|raw: &Value| match raw.as_f64() {
///     Some(degrees) => Ok(ScalarValue::domain(Celsius(degrees))),
///     None => Err(TransformError::new("expected a number")),
/// });
/// assert!(implicit_transformer(TypeId::of::<Celsius>()).is_some());
/// ```
pub fn register_transformer<T: Any>(transformer: impl Transformer + 'static) {
	REGISTRY.write().register::<T>(transformer);
}

/// The implicit transformer registered for `type_id`, if any
pub fn implicit_transformer(type_id: TypeId) -> Option<Arc<dyn Transformer>> {
	REGISTRY.read().get(type_id)
}

/// Whether `type_id` is a known scalar type
pub fn is_known_scalar(type_id: TypeId) -> bool {
	REGISTRY.read().contains(type_id)
}

fn coerce_string(raw: &Value) -> Result<ScalarValue, TransformError> {
	match raw {
		Value::Null => Ok(ScalarValue::Plain(Value::Null)),
		Value::Text(_) => Ok(ScalarValue::Plain(raw.clone())),
		Value::Bool(b) => Ok(ScalarValue::Plain(Value::Text(b.to_string()))),
		Value::Int(i) => Ok(ScalarValue::Plain(Value::Text(i.to_string()))),
		Value::Float(f) => Ok(ScalarValue::Plain(Value::Text(f.to_string()))),
		Value::List(_) => Err(TransformError::unexpected(raw, "String")),
	}
}

fn coerce_int(
	raw: &Value,
	target: &str,
	narrow: impl Fn(i64) -> Option<Value>,
) -> Result<ScalarValue, TransformError> {
	let wide = match raw {
		Value::Null => return Ok(ScalarValue::Plain(Value::Null)),
		Value::Text(text) => text.trim().parse::<i64>().ok(),
		other => other.as_i64(),
	};
	wide.and_then(narrow)
		.map(ScalarValue::Plain)
		.ok_or_else(|| TransformError::unexpected(raw, target))
}

fn coerce_float(raw: &Value) -> Result<ScalarValue, TransformError> {
	let value = match raw {
		Value::Null => return Ok(ScalarValue::Plain(Value::Null)),
		Value::Text(text) => text.trim().parse::<f64>().ok(),
		other => other.as_f64(),
	};
	value
		.map(|f| ScalarValue::Plain(Value::Float(f)))
		.ok_or_else(|| TransformError::unexpected(raw, "f64"))
}

fn coerce_bool(raw: &Value) -> Result<ScalarValue, TransformError> {
	let value = match raw {
		Value::Null => Some(false),
		Value::Bool(b) => Some(*b),
		Value::Int(0) => Some(false),
		Value::Int(1) => Some(true),
		Value::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
			"true" | "yes" | "1" => Some(true),
			"false" | "no" | "0" => Some(false),
			_ => None,
		},
		_ => None,
	};
	value
		.map(|b| ScalarValue::Plain(Value::Bool(b)))
		.ok_or_else(|| TransformError::unexpected(raw, "bool"))
}

/// Conversion from a plain store value into a typed getter result
pub trait FromScalar: Sized + 'static {
	fn from_plain(value: &Value) -> Option<Self>;
}

impl FromScalar for String {
	fn from_plain(value: &Value) -> Option<Self> {
		value.as_str().map(str::to_string)
	}
}

impl FromScalar for i64 {
	fn from_plain(value: &Value) -> Option<Self> {
		value.as_i64()
	}
}

impl FromScalar for i32 {
	fn from_plain(value: &Value) -> Option<Self> {
		value.as_i64().and_then(|i| i32::try_from(i).ok())
	}
}

impl FromScalar for u32 {
	fn from_plain(value: &Value) -> Option<Self> {
		value.as_i64().and_then(|i| u32::try_from(i).ok())
	}
}

impl FromScalar for u64 {
	fn from_plain(value: &Value) -> Option<Self> {
		value.as_i64().and_then(|i| u64::try_from(i).ok())
	}
}

impl FromScalar for f64 {
	fn from_plain(value: &Value) -> Option<Self> {
		value.as_f64()
	}
}

impl FromScalar for bool {
	fn from_plain(value: &Value) -> Option<Self> {
		value.as_bool()
	}
}

impl FromScalar for Value {
	fn from_plain(value: &Value) -> Option<Self> {
		Some(value.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn plain(result: Result<ScalarValue, TransformError>) -> Value {
		match result.unwrap() {
			ScalarValue::Plain(value) => value,
			ScalarValue::Domain(domain) => panic!("unexpected domain value {:?}", domain),
		}
	}

	#[rstest]
	#[case(Value::from("42"), Value::Int(42))]
	#[case(Value::Float(7.0), Value::Int(7))]
	#[case(Value::Null, Value::Null)]
	fn test_builtin_i64(#[case] raw: Value, #[case] expected: Value) {
		let registry = TransformerRegistry::with_builtins();
		let transformer = registry.get(TypeId::of::<i64>()).unwrap();
		assert_eq!(plain(transformer.transform(&raw)), expected);
	}

	#[rstest]
	fn test_builtin_i32_rejects_overflow() {
		let registry = TransformerRegistry::with_builtins();
		let transformer = registry.get(TypeId::of::<i32>()).unwrap();
		let err = transformer.transform(&Value::Int(i64::MAX)).unwrap_err();
		assert!(err.0.contains("i32"));
	}

	#[rstest]
	#[case(Value::Null, false)]
	#[case(Value::from("yes"), true)]
	#[case(Value::Int(0), false)]
	fn test_builtin_bool_maps_null_to_false(#[case] raw: Value, #[case] expected: bool) {
		let registry = TransformerRegistry::with_builtins();
		let transformer = registry.get(TypeId::of::<bool>()).unwrap();
		assert_eq!(plain(transformer.transform(&raw)), Value::Bool(expected));
	}

	#[rstest]
	fn test_builtin_string_stringifies_numbers() {
		let registry = TransformerRegistry::with_builtins();
		let transformer = registry.get(TypeId::of::<String>()).unwrap();
		assert_eq!(plain(transformer.transform(&Value::Int(3))), Value::from("3"));
		assert!(transformer.transform(&Value::List(vec![])).is_err());
	}

	#[rstest]
	fn test_empty_registry_knows_nothing() {
		let registry = TransformerRegistry::empty();
		assert!(!registry.contains(TypeId::of::<String>()));
	}

	#[rstest]
	fn test_domain_value_downcast() {
		let value = DomainValue::new(vec![1u8, 2]);
		assert_eq!(value.downcast_ref::<Vec<u8>>(), Some(&vec![1u8, 2]));
		assert!(value.downcast_ref::<String>().is_none());
	}

	#[rstest]
	fn test_from_scalar_narrowing() {
		assert_eq!(u32::from_plain(&Value::Int(-1)), None);
		assert_eq!(i32::from_plain(&Value::Int(12)), Some(12));
		assert_eq!(String::from_plain(&Value::Int(12)), None);
	}
}
