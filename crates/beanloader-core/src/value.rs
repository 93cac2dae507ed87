//! Raw store values
//!
//! [`Value`] is the untyped unit the record store hands to the mapping engine.
//! It is totally ordered and hashable so that it can serve as a map key,
//! a sort key and a record key.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A raw value read from a record store
///
/// Integers and floats compare numerically with each other, so `Int(1)` and
/// `Float(1.0)` are equal and hash identically. Across kinds the order is
/// `Null < Bool < numbers < Text < List`.
///
/// # Examples
///
/// ```
/// use beanloader_core::Value;
///
/// assert_eq!(Value::from(1), Value::Float(1.0));
/// assert!(Value::Null < Value::from("a"));
/// assert_eq!(Value::from(vec![Value::from(1), Value::from(2)]).into_list().len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
	/// Absent or explicitly null
	#[default]
	Null,
	/// Boolean
	Bool(bool),
	/// Signed integer
	Int(i64),
	/// Floating point
	Float(f64),
	/// Text
	Text(String),
	/// Multi-valued attribute
	List(Vec<Value>),
}

impl Value {
	/// Returns `true` for [`Value::Null`]
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Borrow the text content, if this is a [`Value::Text`]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(s) => Some(s),
			_ => None,
		}
	}

	/// Integer view; integral floats are accepted
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			Value::Float(f) if f.fract() == 0.0 && in_i64_range(*f) => Some(*f as i64),
			_ => None,
		}
	}

	/// Floating point view; integers are widened
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Int(i) => Some(*i as f64),
			Value::Float(f) => Some(*f),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	/// Flatten into a list of values
	///
	/// `Null` becomes an empty list, a list is returned as is and any other
	/// value becomes a single-element list.
	pub fn into_list(self) -> Vec<Value> {
		match self {
			Value::Null => Vec::new(),
			Value::List(items) => items,
			other => vec![other],
		}
	}

	/// Short name of the value kind, used in error messages
	pub fn kind_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::Text(_) => "text",
			Value::List(_) => "list",
		}
	}

	fn rank(&self) -> u8 {
		match self {
			Value::Null => 0,
			Value::Bool(_) => 1,
			Value::Int(_) | Value::Float(_) => 2,
			Value::Text(_) => 3,
			Value::List(_) => 4,
		}
	}
}

const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn in_i64_range(f: f64) -> bool {
	(I64_LOWER..I64_UPPER).contains(&f)
}

fn cmp_float(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		// -0.0 and 0.0 compare equal here
		(false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
	}
}

fn cmp_int_float(i: i64, f: f64) -> Ordering {
	if f.is_nan() || f >= I64_UPPER {
		return Ordering::Less;
	}
	if f < I64_LOWER {
		return Ordering::Greater;
	}
	let whole = f.trunc();
	match i.cmp(&(whole as i64)) {
		Ordering::Equal if f > whole => Ordering::Less,
		Ordering::Equal if f < whole => Ordering::Greater,
		other => other,
	}
}

impl Ord for Value {
	fn cmp(&self, other: &Self) -> Ordering {
		match (self, other) {
			(Value::Null, Value::Null) => Ordering::Equal,
			(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
			(Value::Int(a), Value::Int(b)) => a.cmp(b),
			(Value::Float(a), Value::Float(b)) => cmp_float(*a, *b),
			(Value::Int(a), Value::Float(b)) => cmp_int_float(*a, *b),
			(Value::Float(a), Value::Int(b)) => cmp_int_float(*b, *a).reverse(),
			(Value::Text(a), Value::Text(b)) => a.cmp(b),
			(Value::List(a), Value::List(b)) => a.cmp(b),
			(a, b) => a.rank().cmp(&b.rank()),
		}
	}
}

impl PartialOrd for Value {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Value {}

impl Hash for Value {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.rank().hash(state);
		match self {
			Value::Null => {}
			Value::Bool(b) => b.hash(state),
			Value::Int(i) => i.hash(state),
			Value::Float(f) => {
				if f.is_nan() {
					u64::MAX.hash(state);
				} else if f.fract() == 0.0 && in_i64_range(*f) {
					// Must agree with Int for integral floats
					(*f as i64).hash(state);
				} else {
					f.to_bits().hash(state);
				}
			}
			Value::Text(s) => s.hash(state),
			Value::List(items) => items.hash(state),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => write!(f, "null"),
			Value::Bool(b) => write!(f, "{}", b),
			Value::Int(i) => write!(f, "{}", i),
			Value::Float(x) => write!(f, "{}", x),
			Value::Text(s) => write!(f, "{:?}", s),
			Value::List(items) => {
				write!(f, "[")?;
				for (idx, item) in items.iter().enumerate() {
					if idx > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{}", item)?;
				}
				write!(f, "]")
			}
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Int(i64::from(value))
	}
}

impl From<u32> for Value {
	fn from(value: u32) -> Self {
		Value::Int(i64::from(value))
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Text(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Text(value)
	}
}

impl From<Vec<Value>> for Value {
	fn from(value: Vec<Value>) -> Self {
		Value::List(value)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}
