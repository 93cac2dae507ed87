//! Bean loader
//!
//! Entry point of the engine. A loader is bound to one record store and one
//! materialization strategy:
//!
//! - [`BeanLoader::backed`]: beans read the live store on every call.
//! - [`BeanLoader::eager`]: beans are fully materialized at load time and
//!   share one instance per (bean type, record identity) for the lifetime of
//!   the loader.
//!
//! ```rust,ignore
//! let loader = BeanLoader::eager(store);
//! let person: Person = loader.load_one(&Record::new("person", 1))?;
//! assert_eq!(person.name()?, Some("A".to_string()));
//! ```

use crate::arena::{BeanLink, EagerSlot, IdentityArena};
use crate::collect::Resolved;
use crate::declare::{Bean, BeanTypeRef};
use crate::descriptor::{self, describe_reachable};
use crate::error::Result;
use crate::evaluate::evaluate;
use crate::proxy::Proxy;
use beanloader_core::{Record, RecordCursor, RecordStore};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Materialization strategy of a [`BeanLoader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
	/// Recompute every getter on every call
	Backed,
	/// Compute every getter once, at load time
	Eager,
}

enum Mode {
	Backed,
	Eager(Arc<IdentityArena>),
}

/// Synthesizes bean instances backed by records of one store
pub struct BeanLoader {
	store: Arc<dyn RecordStore>,
	mode: Mode,
}

impl BeanLoader {
	/// A loader producing live-store beans
	pub fn backed(store: Arc<dyn RecordStore>) -> Self {
		Self {
			store,
			mode: Mode::Backed,
		}
	}

	/// A loader producing fully materialized beans
	///
	/// The loader owns an identity cache without eviction; it grows with
	/// every distinct record loaded and lives as long as the loader.
	pub fn eager(store: Arc<dyn RecordStore>) -> Self {
		Self {
			store,
			mode: Mode::Eager(Arc::new(IdentityArena::new())),
		}
	}

	pub fn strategy(&self) -> Strategy {
		match self.mode {
			Mode::Backed => Strategy::Backed,
			Mode::Eager(_) => Strategy::Eager,
		}
	}

	pub fn store(&self) -> &Arc<dyn RecordStore> {
		&self.store
	}

	/// Number of beans held by the identity cache; always 0 when backed
	pub fn cached_beans(&self) -> usize {
		match &self.mode {
			Mode::Backed => 0,
			Mode::Eager(arena) => arena.len(),
		}
	}

	/// Load the bean backed by `record`; `None` gives `None`
	pub fn load<B: Bean>(&self, record: Option<&Record>) -> Result<Option<B>> {
		record.map(|record| self.load_one(record)).transpose()
	}

	/// Load the bean backed by `record`
	pub fn load_one<B: Bean>(&self, record: &Record) -> Result<B> {
		let bean = BeanTypeRef::of::<B>();
		let descriptor = describe_reachable(bean, self.store.as_ref())?;
		let proxy = match &self.mode {
			Mode::Backed => Proxy::backed(descriptor, record.clone(), Arc::clone(&self.store)),
			Mode::Eager(arena) => self.load_eager(arena, bean, record)?,
		};
		Ok(B::from_proxy(proxy))
	}

	/// Load one bean per record, in order; stops at the first error
	pub fn load_all<B: Bean>(&self, records: impl IntoIterator<Item = Record>) -> Result<Vec<B>> {
		records
			.into_iter()
			.map(|record| self.load_one(&record))
			.collect()
	}

	/// Drain `cursor` into beans, in order; the cursor is left open
	pub fn load_cursor<B: Bean>(&self, cursor: &mut impl RecordCursor) -> Result<Vec<B>> {
		let mut beans = Vec::new();
		while let Some(record) = cursor.next_record()? {
			beans.push(self.load_one(&record)?);
		}
		Ok(beans)
	}

	fn load_eager(&self, arena: &Arc<IdentityArena>, bean: BeanTypeRef, record: &Record) -> Result<Proxy> {
		let checkpoint = arena.checkpoint();
		match materialize(arena, self.store.as_ref(), bean, record.clone()) {
			Ok((_, slot)) => Ok(Proxy::eager(Arc::clone(arena), slot)),
			Err(err) => {
				arena.rollback(checkpoint);
				Err(err)
			}
		}
	}
}

impl fmt::Debug for BeanLoader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BeanLoader")
			.field("strategy", &self.strategy())
			.field("cached_beans", &self.cached_beans())
			.finish()
	}
}

/// Materialize `record` as `bean` into `arena`, returning its slot
///
/// A slot that already exists is returned as is, even while it is still
/// being materialized further up the stack.
fn materialize(
	arena: &IdentityArena,
	store: &dyn RecordStore,
	bean: BeanTypeRef,
	record: Record,
) -> Result<(usize, Arc<EagerSlot>)> {
	let identity = store.identity_of(&record);
	if let Some(found) = arena.lookup(bean.id(), &identity) {
		return Ok(found);
	}

	let descriptor = descriptor::describe(bean, store)?;
	let (index, slot) = arena.register(Arc::clone(&descriptor), record.clone(), identity);

	let mut values: HashMap<String, Resolved<BeanLink>> = HashMap::with_capacity(descriptor.getters().len());
	for getter in descriptor.getters() {
		let value = evaluate(store, getter, &record, |target, related| {
			materialize(arena, store, target, related).map(|(slot, _)| BeanLink { slot })
		})?;
		values.insert(getter.method.clone(), value);
	}
	arena.complete(index, values);
	Ok((index, slot))
}
