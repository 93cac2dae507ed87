//! Relation resolution
//!
//! Fetches the records on the far side of a relation getter. Query-based
//! kinds (inverse foreign key, association by predicate) hand the sort order
//! to the store; lookup-based kinds (direct foreign key, junction table) are
//! sorted here with a stable sort, so ties keep store order. Keys that do not
//! resolve to a record are skipped.

use crate::descriptor::{GetterDescriptor, RelationTarget};
use crate::error::{BeanError, Result};
use beanloader_core::{Predicate, Record, RecordStore, RelationKind, SortKey, Value};
use std::cmp::Ordering;

/// Records related to `source` through `getter`, in relation order
pub(crate) fn resolve_related(
	store: &dyn RecordStore,
	getter: &GetterDescriptor,
	source: &Record,
) -> Result<Vec<Record>> {
	let Some(target) = &getter.relation else {
		return Err(BeanError::InternalDispatch {
			bean: getter.bean,
			method: getter.method.clone(),
		});
	};

	let records = match &target.kind {
		RelationKind::DirectForeignKey => {
			let keys = store.get(source, &getter.property_path)?.into_list();
			let records = lookup_all(store, &target.foreign_table, keys)?;
			sort_records(store, records, &getter.sort)?
		}
		RelationKind::InverseForeignKey { foreign_field } => {
			let key = store.identity_of(source).key().clone();
			let predicate = Predicate::all().eq(foreign_field.clone(), key);
			store.query_by_predicate(&target.foreign_table, &predicate, &getter.sort)?
		}
		RelationKind::AssociationByPredicate { .. } => {
			let predicate = bind_expression(store, getter, target, source)?;
			store.query_by_predicate(&target.foreign_table, &predicate, &getter.sort)?
		}
		RelationKind::AssociationByJunctionTable {
			junction_table,
			source_field,
			target_field,
		} => {
			let key = store.identity_of(source).key().clone();
			let links = store.query_by_predicate(
				junction_table,
				&Predicate::all().eq(source_field.clone(), key),
				&[],
			)?;
			let mut keys = Vec::with_capacity(links.len());
			for link in &links {
				keys.extend(store.get(link, target_field)?.into_list());
			}
			let records = lookup_all(store, &target.foreign_table, keys)?;
			sort_records(store, records, &getter.sort)?
		}
	};

	tracing::trace!(
		bean = getter.bean,
		method = %getter.method,
		relation = target.kind.name(),
		source = %source,
		count = records.len(),
		"resolved relation"
	);
	Ok(records)
}

fn bind_expression(
	store: &dyn RecordStore,
	getter: &GetterDescriptor,
	target: &RelationTarget,
	source: &Record,
) -> Result<Predicate> {
	let Some(expression) = &target.expression else {
		return Err(BeanError::InternalDispatch {
			bean: getter.bean,
			method: getter.method.clone(),
		});
	};
	Ok(expression.bind(|path| store.get(source, path))?)
}

fn lookup_all(store: &dyn RecordStore, table: &str, keys: Vec<Value>) -> Result<Vec<Record>> {
	let mut records = Vec::with_capacity(keys.len());
	for key in keys {
		if key.is_null() {
			continue;
		}
		match store.lookup_by_identity(table, &key)? {
			Some(record) => records.push(record),
			None => tracing::trace!(table, key = %key, "skipping dangling key"),
		}
	}
	Ok(records)
}

/// Stable sort of `records` by `sort`, reading each sort path once
fn sort_records(store: &dyn RecordStore, records: Vec<Record>, sort: &[SortKey]) -> Result<Vec<Record>> {
	if sort.is_empty() || records.len() < 2 {
		return Ok(records);
	}

	let mut keyed = Vec::with_capacity(records.len());
	for record in records {
		let mut values = Vec::with_capacity(sort.len());
		for key in sort {
			values.push(store.get(&record, &key.path)?);
		}
		keyed.push((values, record));
	}

	keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, sort));
	Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

fn compare_keys(a: &[Value], b: &[Value], sort: &[SortKey]) -> Ordering {
	for ((left, right), key) in a.iter().zip(b).zip(sort) {
		let ordering = if key.ascending {
			left.cmp(right)
		} else {
			right.cmp(left)
		};
		if ordering != Ordering::Equal {
			return ordering;
		}
	}
	Ordering::Equal
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(vec![Value::from(1)], vec![Value::from(2)], vec![SortKey::asc("a")], Ordering::Less)]
	#[case(vec![Value::from(1)], vec![Value::from(2)], vec![SortKey::desc("a")], Ordering::Greater)]
	#[case(
		vec![Value::from("x"), Value::from(5)],
		vec![Value::from("x"), Value::from(3)],
		vec![SortKey::asc("a"), SortKey::asc("b")],
		Ordering::Greater
	)]
	#[case(vec![Value::Null], vec![Value::Null], vec![SortKey::asc("a")], Ordering::Equal)]
	fn test_compare_keys(
		#[case] a: Vec<Value>,
		#[case] b: Vec<Value>,
		#[case] sort: Vec<SortKey>,
		#[case] expected: Ordering,
	) {
		assert_eq!(compare_keys(&a, &b, &sort), expected);
	}
}
