//! Identity arena of an eager loader
//!
//! Holds exactly one slot per (bean type, record identity). A slot is
//! registered before any of its getters is evaluated, so a cycle that leads
//! back to it finds the half-built slot and terminates. Slots refer to each
//! other by index, never by pointer, and the arena owns every slot: a cyclic
//! bean graph holds no reference cycle.

use crate::collect::Resolved;
use crate::descriptor::BeanDescriptor;
use beanloader_core::{Identity, Record};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Reference from a frozen value to another slot of the same arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BeanLink {
	pub slot: usize,
}

/// Frozen getter values of one eager bean
pub(crate) type ValueMap = HashMap<String, Resolved<BeanLink>>;

/// One eager bean
pub(crate) struct EagerSlot {
	pub descriptor: Arc<BeanDescriptor>,
	pub record: Record,
	pub identity: Identity,
	values: OnceCell<ValueMap>,
}

impl EagerSlot {
	/// Getter values, absent while the slot is still being materialized
	pub fn values(&self) -> Option<&ValueMap> {
		self.values.get()
	}
}

#[derive(Default)]
struct ArenaState {
	slots: Vec<Arc<EagerSlot>>,
	index: HashMap<(TypeId, Identity), usize>,
}

/// Position of the arena before a top-level load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint(usize);

#[derive(Default)]
pub(crate) struct IdentityArena {
	state: RwLock<ArenaState>,
}

impl IdentityArena {
	pub fn new() -> Self {
		Self::default()
	}

	/// Slot already held for (`bean`, `identity`), with its index
	pub fn lookup(&self, bean: TypeId, identity: &Identity) -> Option<(usize, Arc<EagerSlot>)> {
		let state = self.state.read();
		let index = *state.index.get(&(bean, identity.clone()))?;
		let slot = Arc::clone(state.slots.get(index)?);
		tracing::trace!(identity = %identity, slot = index, "identity arena hit");
		Some((index, slot))
	}

	/// Register an empty slot; the caller fills it with [`complete`](Self::complete)
	pub fn register(
		&self,
		descriptor: Arc<BeanDescriptor>,
		record: Record,
		identity: Identity,
	) -> (usize, Arc<EagerSlot>) {
		let mut state = self.state.write();
		let index = state.slots.len();
		tracing::trace!(
			bean = descriptor.bean().name(),
			identity = %identity,
			slot = index,
			"registering eager slot"
		);
		state
			.index
			.insert((descriptor.bean().id(), identity.clone()), index);
		let slot = Arc::new(EagerSlot {
			descriptor,
			record,
			identity,
			values: OnceCell::new(),
		});
		state.slots.push(Arc::clone(&slot));
		(index, slot)
	}

	/// Freeze the values of a registered slot
	pub fn complete(&self, index: usize, values: ValueMap) {
		if let Some(slot) = self.slot(index) {
			if slot.values.set(values).is_err() {
				tracing::warn!(slot = index, "eager slot completed twice");
			}
			tracing::trace!(identity = %slot.identity, slot = index, "eager slot materialized");
		}
	}

	pub fn slot(&self, index: usize) -> Option<Arc<EagerSlot>> {
		self.state.read().slots.get(index).cloned()
	}

	pub fn checkpoint(&self) -> Checkpoint {
		Checkpoint(self.state.read().slots.len())
	}

	/// Drop every slot registered after `checkpoint`
	pub fn rollback(&self, checkpoint: Checkpoint) {
		let mut state = self.state.write();
		let Checkpoint(len) = checkpoint;
		if state.slots.len() <= len {
			return;
		}
		tracing::trace!(dropped = state.slots.len() - len, "rolling back eager slots");
		state.slots.truncate(len);
		state.index.retain(|_, index| *index < len);
	}

	pub fn len(&self) -> usize {
		self.state.read().slots.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::declare::{Bean, BeanDefinition, BeanTypeRef};
	use crate::proxy::Proxy;
	use beanloader_test::MemoryStore;
	use rstest::rstest;

	#[derive(Debug, Clone, PartialEq, Eq, Hash)]
	struct Empty(Proxy);

	impl Bean for Empty {
		const TABLE: &'static str = "empty";

		fn declare(_def: &mut BeanDefinition) {}

		fn from_proxy(proxy: Proxy) -> Self {
			Empty(proxy)
		}

		fn proxy(&self) -> &Proxy {
			&self.0
		}
	}

	fn descriptor() -> Arc<BeanDescriptor> {
		Arc::new(BeanDescriptor::resolve(BeanTypeRef::of::<Empty>(), &MemoryStore::new()).unwrap())
	}

	fn register(arena: &IdentityArena, key: i64) -> usize {
		let record = Record::new("empty", key);
		let identity = record.identity().clone();
		arena.register(descriptor(), record, identity).0
	}

	#[rstest]
	fn test_register_then_lookup() {
		let arena = IdentityArena::new();
		let index = register(&arena, 1);
		let id = TypeId::of::<Empty>();
		let (found, slot) = arena.lookup(id, &Identity::new("empty", 1)).unwrap();
		assert_eq!(found, index);
		assert!(Arc::ptr_eq(&slot, &arena.slot(index).unwrap()));
		assert!(arena.lookup(id, &Identity::new("empty", 2)).is_none());
		assert!(arena.slot(index).unwrap().values().is_none());
	}

	#[rstest]
	fn test_register_hands_back_the_stored_slot() {
		let arena = IdentityArena::new();
		let record = Record::new("empty", 4);
		let identity = record.identity().clone();
		let (index, slot) = arena.register(descriptor(), record, identity.clone());

		assert_eq!(slot.identity, identity);
		assert!(Arc::ptr_eq(&slot, &arena.slot(index).unwrap()));
		arena.complete(index, ValueMap::new());
		assert!(slot.values().is_some());
	}

	#[rstest]
	fn test_complete_freezes_values() {
		let arena = IdentityArena::new();
		let index = register(&arena, 1);
		arena.complete(index, ValueMap::from([("getX".to_string(), Resolved::Null)]));
		let slot = arena.slot(index).unwrap();
		assert_eq!(slot.values().map(HashMap::len), Some(1));
	}

	#[rstest]
	fn test_rollback_forgets_later_slots() {
		let arena = IdentityArena::new();
		register(&arena, 1);
		let checkpoint = arena.checkpoint();
		register(&arena, 2);
		register(&arena, 3);
		arena.rollback(checkpoint);

		let id = TypeId::of::<Empty>();
		assert_eq!(arena.len(), 1);
		assert!(arena.lookup(id, &Identity::new("empty", 1)).is_some());
		assert!(arena.lookup(id, &Identity::new("empty", 3)).is_none());
	}
}
