//! Getter evaluation
//!
//! One pipeline serves both strategies: read or resolve, transform, collect.
//! The strategies only differ in how a related record becomes a bean, which
//! the caller supplies as `link`.

use crate::collect::{self, ElementKey, MapEntry, Resolved};
use crate::declare::{BeanTypeRef, ElementType};
use crate::descriptor::{GetterDescriptor, GetterKind, KeyStrategy, Shape};
use crate::error::{BeanError, Result};
use crate::relation::resolve_related;
use crate::transform::ScalarValue;
use beanloader_core::{Record, RecordStore, Value};

/// Compute the value of `getter` for `record`
pub(crate) fn evaluate<B>(
	store: &dyn RecordStore,
	getter: &GetterDescriptor,
	record: &Record,
	mut link: impl FnMut(BeanTypeRef, Record) -> Result<B>,
) -> Result<Resolved<B>> {
	match getter.kind {
		GetterKind::ScalarField => evaluate_scalar(store, getter, record),
		GetterKind::ToOneRelation | GetterKind::ToManyRelation => {
			let ElementType::Bean(target) = getter.target else {
				return Err(BeanError::InternalDispatch {
					bean: getter.bean,
					method: getter.method.clone(),
				});
			};
			let related = resolve_related(store, getter, record)?;
			evaluate_relation(store, getter, target, related, &mut link)
		}
	}
}

fn evaluate_scalar<B>(
	store: &dyn RecordStore,
	getter: &GetterDescriptor,
	record: &Record,
) -> Result<Resolved<B>> {
	let raw = store.get(record, &getter.property_path)?;
	match getter.shape.collection() {
		None => transform(getter, &raw),
		Some(kind) => {
			let mut items = Vec::new();
			for item in raw.into_list() {
				let value = transform(getter, &item)?;
				items.push((ElementKey::Raw(item), value));
			}
			Ok(collect::collect_elements(kind, items))
		}
	}
}

fn transform<B>(getter: &GetterDescriptor, raw: &Value) -> Result<Resolved<B>> {
	let value = match &getter.transformer {
		Some(transformer) => transformer.apply(raw)?,
		None => ScalarValue::Plain(raw.clone()),
	};
	Ok(match value {
		ScalarValue::Plain(Value::Null) => Resolved::Null,
		ScalarValue::Plain(value) => Resolved::Scalar(value),
		ScalarValue::Domain(value) => Resolved::Domain(value),
	})
}

fn evaluate_relation<B>(
	store: &dyn RecordStore,
	getter: &GetterDescriptor,
	target: BeanTypeRef,
	related: Vec<Record>,
	link: &mut impl FnMut(BeanTypeRef, Record) -> Result<B>,
) -> Result<Resolved<B>> {
	if let Some(kind) = getter.shape.collection() {
		let mut items = Vec::with_capacity(related.len());
		for record in related {
			let element = ElementKey::Record(store.identity_of(&record));
			items.push((element, Resolved::Bean(link(target, record)?)));
		}
		return Ok(collect::collect_elements(kind, items));
	}

	let group = match getter.shape {
		Shape::Single => {
			return match related.into_iter().next() {
				Some(record) => Ok(Resolved::Bean(link(target, record)?)),
				None => Ok(Resolved::Null),
			};
		}
		Shape::MapOfCollection(kind) => Some(kind),
		_ => None,
	};
	let mut entries = Vec::with_capacity(related.len());
	for record in related {
		let key = map_key(store, getter, &record)?;
		let element = ElementKey::Record(store.identity_of(&record));
		entries.push(MapEntry {
			key,
			element,
			value: Resolved::Bean(link(target, record)?),
		});
	}
	collect::collect_map(getter.bean, &getter.method, group, entries)
}

fn map_key(store: &dyn RecordStore, getter: &GetterDescriptor, record: &Record) -> Result<Value> {
	let raw = match &getter.key {
		Some(KeyStrategy::Path(path)) => store.get(record, path)?,
		Some(KeyStrategy::Extractor { extractor, .. }) => extractor.extract(store, record)?,
		None => {
			return Err(BeanError::InternalDispatch {
				bean: getter.bean,
				method: getter.method.clone(),
			});
		}
	};
	match &getter.key_transformer {
		None => Ok(raw),
		Some(transformer) => match transformer.apply(&raw)? {
			ScalarValue::Plain(key) => Ok(key),
			ScalarValue::Domain(_) => Err(BeanError::Transform {
				type_name: transformer.target,
				message: "map keys must be plain values".to_string(),
			}),
		},
	}
}
