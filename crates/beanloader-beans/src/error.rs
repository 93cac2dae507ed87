//! Error taxonomy of the mapping engine
//!
//! - [`ConfigurationError`]: a bean declaration that cannot be resolved
//!   against the store schema. Raised once, at first resolution, and
//!   surfaced by `load` before any bean is produced.
//! - [`BeanError::Collision`]: two records produced the same key for a 1:1
//!   map getter.
//! - [`BeanError::InternalDispatch`]: a method call that matched no route.
//!   This is an engine defect, not a caller mistake.

use beanloader_core::{PredicateError, StoreError, Value};
use thiserror::Error;

/// A bean declaration that does not match the store schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
	#[error("{bean}::{method}: not a getter name, expected a `get` or `is` prefix")]
	InvalidGetterName { bean: &'static str, method: String },

	#[error("{bean}::{method}: declared more than once")]
	DuplicateMethod { bean: &'static str, method: String },

	#[error("{bean}::{method}: both `value` ({value}) and `path` ({path}) given")]
	AmbiguousPath {
		bean: &'static str,
		method: String,
		value: String,
		path: String,
	},

	#[error("{bean}::{method}: path `{path}` does not exist in the schema")]
	UnknownPath {
		bean: &'static str,
		method: String,
		path: String,
	},

	#[error("{bean}::{method}: no return shape declared")]
	MissingReturnShape { bean: &'static str, method: String },

	#[error("{bean}::{method}: both a key path and a key extractor given")]
	KeyStrategyConflict { bean: &'static str, method: String },

	#[error("{bean}::{method}: map getter without a key path or key extractor")]
	MissingKeyStrategy { bean: &'static str, method: String },

	#[error("{bean}::{method}: key strategy given for a getter that is not a map")]
	KeyStrategyWithoutMap { bean: &'static str, method: String },

	#[error("{bean}::{method}: sort order is only allowed on to-many relations")]
	SortWithoutToMany { bean: &'static str, method: String },

	#[error("{bean}::{method}: map getters require a relation, `{path}` is a field")]
	MapOverScalar {
		bean: &'static str,
		method: String,
		path: String,
	},

	#[error("{bean}::{method}: `{path}` is annotated as a relation but is a plain field")]
	NotARelation {
		bean: &'static str,
		method: String,
		path: String,
	},

	#[error("{bean}::{method}: no field or relation matches `{path}`")]
	UnmatchedMethod {
		bean: &'static str,
		method: String,
		path: String,
	},

	#[error("{bean}::{method}: relation `{path}` has no foreign table")]
	IncompleteRelation {
		bean: &'static str,
		method: String,
		path: String,
	},

	#[error("{bean}::{method}: target bean reads table `{expected}` but relation points to `{found}`")]
	TargetTableMismatch {
		bean: &'static str,
		method: String,
		expected: String,
		found: String,
	},

	#[error("{bean}::{method}: transformers apply to fields, not relations")]
	TransformerOnRelation { bean: &'static str, method: String },

	#[error("{bean}::{method}: cannot instantiate transformer `{transformer}`: {reason}")]
	TransformerInstantiation {
		bean: &'static str,
		method: String,
		transformer: &'static str,
		reason: String,
	},

	#[error("{bean}::{method}: cannot instantiate key extractor `{extractor}`: {reason}")]
	KeyExtractorInstantiation {
		bean: &'static str,
		method: String,
		extractor: &'static str,
		reason: String,
	},

	#[error("{bean}::{method}: invalid association expression: {source}")]
	InvalidPredicate {
		bean: &'static str,
		method: String,
		source: PredicateError,
	},
}

/// Errors raised while loading beans or reading their values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BeanError {
	#[error("Configuration error: {0}")]
	Configuration(#[from] ConfigurationError),

	#[error("Collision in {bean}::{method}: duplicate map key {key}")]
	Collision {
		bean: &'static str,
		method: String,
		key: Value,
	},

	#[error("Internal dispatch error: {bean} has no route for `{method}`")]
	InternalDispatch { bean: &'static str, method: String },

	#[error("Type mismatch: {bean}::{method} does not produce {expected}")]
	TypeMismatch {
		bean: &'static str,
		method: String,
		expected: &'static str,
	},

	#[error("Cannot transform value into {type_name}: {message}")]
	Transform {
		type_name: &'static str,
		message: String,
	},

	#[error("Store error: {0}")]
	Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, BeanError>;
