//! Collector strategy
//!
//! Turns the per-element results of a getter into the container its
//! declaration asks for: a list, a set, an insertion-ordered set, a 1:1 map
//! or a grouped map. Containers are never null; an empty source gives an
//! empty container.

use crate::declare::CollectionKind;
use crate::error::{BeanError, Result};
use crate::proxy::Proxy;
use crate::transform::DomainValue;
use beanloader_core::{Identity, Record, Value};
use indexmap::IndexMap;
use std::collections::HashSet;

/// A resolved getter value
///
/// `B` is the representation of related beans: a [`Proxy`] for values handed
/// to callers, an arena link for values frozen inside an eager bean.
#[derive(Debug, Clone)]
pub enum Resolved<B> {
	Null,
	Scalar(Value),
	Domain(DomainValue),
	Bean(B),
	/// Backing record handle, answered by the escape-hatch method
	Record(Record),
	List(Vec<Resolved<B>>),
	Set(Vec<Resolved<B>>),
	OrderedSet(Vec<Resolved<B>>),
	/// Entries in first-seen key order, keys unique
	Map(Vec<(Value, Resolved<B>)>),
}

/// A resolved value as seen by callers
pub type BeanValue = Resolved<Proxy>;

impl<B> Resolved<B> {
	pub fn is_null(&self) -> bool {
		matches!(self, Resolved::Null)
	}

	/// Elements of a list, set or ordered set
	pub fn elements(&self) -> Option<&[Resolved<B>]> {
		match self {
			Resolved::List(items) | Resolved::Set(items) | Resolved::OrderedSet(items) => Some(items),
			_ => None,
		}
	}

	/// Convert the bean representation, keeping the shape
	pub(crate) fn try_map_beans<C, E>(
		&self,
		f: &mut impl FnMut(&B) -> std::result::Result<C, E>,
	) -> std::result::Result<Resolved<C>, E> {
		Ok(match self {
			Resolved::Null => Resolved::Null,
			Resolved::Scalar(value) => Resolved::Scalar(value.clone()),
			Resolved::Domain(value) => Resolved::Domain(value.clone()),
			Resolved::Record(record) => Resolved::Record(record.clone()),
			Resolved::Bean(bean) => Resolved::Bean(f(bean)?),
			Resolved::List(items) => Resolved::List(map_items(items, f)?),
			Resolved::Set(items) => Resolved::Set(map_items(items, f)?),
			Resolved::OrderedSet(items) => Resolved::OrderedSet(map_items(items, f)?),
			Resolved::Map(entries) => {
				let mut mapped = Vec::with_capacity(entries.len());
				for (key, value) in entries {
					mapped.push((key.clone(), value.try_map_beans(&mut *f)?));
				}
				Resolved::Map(mapped)
			}
		})
	}
}

fn map_items<B, C, E>(
	items: &[Resolved<B>],
	f: &mut impl FnMut(&B) -> std::result::Result<C, E>,
) -> std::result::Result<Vec<Resolved<C>>, E> {
	let mut mapped = Vec::with_capacity(items.len());
	for item in items {
		mapped.push(item.try_map_beans(&mut *f)?);
	}
	Ok(mapped)
}

/// What makes two collected elements duplicates of each other
///
/// Scalars compare by their raw store value (before transformation), beans
/// by the identity of their backing record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ElementKey {
	Raw(Value),
	Record(Identity),
}

/// Collect `items` into the container `kind`
pub(crate) fn collect_elements<B>(
	kind: CollectionKind,
	items: Vec<(ElementKey, Resolved<B>)>,
) -> Resolved<B> {
	match kind {
		CollectionKind::List => Resolved::List(items.into_iter().map(|(_, item)| item).collect()),
		CollectionKind::Set => Resolved::Set(dedup(items)),
		CollectionKind::OrderedSet => Resolved::OrderedSet(dedup(items)),
	}
}

fn dedup<B>(items: Vec<(ElementKey, Resolved<B>)>) -> Vec<Resolved<B>> {
	let mut seen = HashSet::with_capacity(items.len());
	items
		.into_iter()
		.filter_map(|(key, item)| seen.insert(key).then_some(item))
		.collect()
}

/// One element destined for a map getter
pub(crate) struct MapEntry<B> {
	pub key: Value,
	pub element: ElementKey,
	pub value: Resolved<B>,
}

/// Collect keyed entries into a 1:1 map (`group == None`) or a grouped map
///
/// A repeated key in a 1:1 map is a [`BeanError::Collision`]; nothing is
/// silently dropped.
pub(crate) fn collect_map<B>(
	bean: &'static str,
	method: &str,
	group: Option<CollectionKind>,
	entries: Vec<MapEntry<B>>,
) -> Result<Resolved<B>> {
	match group {
		None => {
			let mut map: IndexMap<Value, Resolved<B>> = IndexMap::with_capacity(entries.len());
			for entry in entries {
				if map.contains_key(&entry.key) {
					return Err(BeanError::Collision {
						bean,
						method: method.to_string(),
						key: entry.key,
					});
				}
				map.insert(entry.key, entry.value);
			}
			Ok(Resolved::Map(map.into_iter().collect()))
		}
		Some(kind) => {
			let mut groups: IndexMap<Value, Vec<(ElementKey, Resolved<B>)>> = IndexMap::new();
			for entry in entries {
				groups
					.entry(entry.key)
					.or_default()
					.push((entry.element, entry.value));
			}
			Ok(Resolved::Map(
				groups
					.into_iter()
					.map(|(key, items)| (key, collect_elements(kind, items)))
					.collect(),
			))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn raw(value: i64) -> (ElementKey, Resolved<u8>) {
		(ElementKey::Raw(Value::Int(value)), Resolved::Scalar(Value::Int(value)))
	}

	fn entry(key: &str, id: i64) -> MapEntry<i64> {
		MapEntry {
			key: Value::from(key),
			element: ElementKey::Record(Identity::new("task", id)),
			value: Resolved::Bean(id),
		}
	}

	#[rstest]
	fn test_list_keeps_duplicates_and_order() {
		let collected = collect_elements(CollectionKind::List, vec![raw(2), raw(1), raw(2)]);
		assert_eq!(collected.elements().map(<[_]>::len), Some(3));
	}

	#[rstest]
	fn test_ordered_set_keeps_first_seen_order() {
		let collected = collect_elements(CollectionKind::OrderedSet, vec![raw(2), raw(1), raw(2)]);
		let values: Vec<_> = collected
			.elements()
			.unwrap()
			.iter()
			.map(|item| match item {
				Resolved::Scalar(value) => value.clone(),
				_ => Value::Null,
			})
			.collect();
		assert_eq!(values, vec![Value::Int(2), Value::Int(1)]);
	}

	#[rstest]
	fn test_empty_input_gives_empty_container() {
		let collected = collect_elements::<u8>(CollectionKind::Set, Vec::new());
		assert!(matches!(collected, Resolved::Set(ref items) if items.is_empty()));
	}

	#[rstest]
	fn test_one_to_one_map_rejects_duplicate_key() {
		let err = collect_map("Project", "getTasksByStatus", None, vec![entry("open", 1), entry("open", 2)])
			.unwrap_err();
		assert_eq!(
			err,
			BeanError::Collision {
				bean: "Project",
				method: "getTasksByStatus".to_string(),
				key: Value::from("open"),
			}
		);
	}

	#[rstest]
	fn test_grouped_map_accumulates_per_key() {
		let collected = collect_map(
			"Project",
			"getTasksGrouped",
			Some(CollectionKind::List),
			vec![entry("open", 1), entry("done", 3), entry("open", 2)],
		)
		.unwrap();
		let Resolved::Map(entries) = collected else {
			panic!("expected a map");
		};
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].0, Value::from("open"));
		assert_eq!(entries[0].1.elements().map(<[_]>::len), Some(2));
		assert_eq!(entries[1].1.elements().map(<[_]>::len), Some(1));
	}

	#[rstest]
	fn test_try_map_beans_preserves_shape() {
		let value: Resolved<i64> = Resolved::Map(vec![(
			Value::from("k"),
			Resolved::List(vec![Resolved::Bean(1), Resolved::Null]),
		)]);
		let mapped = value
			.try_map_beans(&mut |id| Ok::<_, ()>(format!("bean-{}", id)))
			.unwrap();
		let Resolved::Map(entries) = mapped else {
			panic!("expected a map");
		};
		match &entries[0].1 {
			Resolved::List(items) => assert!(matches!(&items[0], Resolved::Bean(name) if name == "bean-1")),
			other => panic!("unexpected {:?}", other),
		}
	}
}
