//! Bean proxies
//!
//! A [`Proxy`] is the instance behind every bean value. Method calls are
//! answered through the dispatch table of its bean type: a getter, a
//! default method, or the backing-record escape hatch.
//!
//! - Backed proxies hold the record and the store and recompute every getter
//!   on every call, so they observe store mutations.
//! - Eager proxies point into the identity arena of their loader; their
//!   values were computed once, at load time.
//!
//! Equality, hashing and formatting only look at the bean type and the
//! record identity, never at getter values.

use crate::arena::{BeanLink, EagerSlot, IdentityArena};
use crate::collect::{BeanValue, Resolved};
use crate::declare::{Bean, BeanTypeRef};
use crate::descriptor::{self, BeanDescriptor, Route};
use crate::error::{BeanError, Result};
use crate::evaluate::evaluate;
use crate::transform::FromScalar;
use beanloader_core::{Identity, Record, RecordStore};
use indexmap::{IndexMap, IndexSet};
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub(crate) struct BackedBean {
	descriptor: Arc<BeanDescriptor>,
	record: Record,
	identity: Identity,
	store: Arc<dyn RecordStore>,
}

#[derive(Clone)]
enum Repr {
	Backed(Arc<BackedBean>),
	Eager {
		arena: Arc<IdentityArena>,
		slot: Arc<EagerSlot>,
	},
}

/// Instance of a bean type
#[derive(Clone)]
pub struct Proxy {
	repr: Repr,
}

impl Proxy {
	pub(crate) fn backed(
		descriptor: Arc<BeanDescriptor>,
		record: Record,
		store: Arc<dyn RecordStore>,
	) -> Self {
		let identity = store.identity_of(&record);
		Self {
			repr: Repr::Backed(Arc::new(BackedBean {
				descriptor,
				record,
				identity,
				store,
			})),
		}
	}

	pub(crate) fn eager(arena: Arc<IdentityArena>, slot: Arc<EagerSlot>) -> Self {
		Self {
			repr: Repr::Eager { arena, slot },
		}
	}

	fn descriptor(&self) -> &BeanDescriptor {
		match &self.repr {
			Repr::Backed(bean) => &bean.descriptor,
			Repr::Eager { slot, .. } => &slot.descriptor,
		}
	}

	/// Bean type this proxy is an instance of
	pub fn bean_type(&self) -> BeanTypeRef {
		self.descriptor().bean()
	}

	/// Backing record handle
	pub fn record(&self) -> &Record {
		match &self.repr {
			Repr::Backed(bean) => &bean.record,
			Repr::Eager { slot, .. } => &slot.record,
		}
	}

	pub fn identity(&self) -> &Identity {
		match &self.repr {
			Repr::Backed(bean) => &bean.identity,
			Repr::Eager { slot, .. } => &slot.identity,
		}
	}

	/// Whether `self` and `other` are the very same instance
	///
	/// Eager proxies of one loader are the same instance whenever they are
	/// equal; backed proxies only when one was cloned from the other.
	pub fn same_instance(&self, other: &Proxy) -> bool {
		match (&self.repr, &other.repr) {
			(Repr::Backed(a), Repr::Backed(b)) => Arc::ptr_eq(a, b),
			(Repr::Eager { slot: a, .. }, Repr::Eager { slot: b, .. }) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}

	/// Call `method` and return its untyped value
	pub fn invoke(&self, method: &str) -> Result<BeanValue> {
		let descriptor = self.descriptor();
		let Some(route) = descriptor.route(method) else {
			return Err(self.no_route(method));
		};
		match route {
			Route::BackingRecord => Ok(Resolved::Record(self.record().clone())),
			Route::Default(body) => body(self),
			Route::Getter(getter) => match &self.repr {
				Repr::Backed(bean) => {
					let store = &bean.store;
					evaluate(store.as_ref(), getter, &bean.record, |target, record| {
						let descriptor = descriptor::describe(target, store.as_ref())?;
						Ok(Proxy::backed(descriptor, record, Arc::clone(store)))
					})
				}
				Repr::Eager { arena, slot } => {
					let value = slot
						.values()
						.and_then(|values| values.get(method))
						.ok_or_else(|| self.no_route(method))?;
					value.try_map_beans(&mut |link: &BeanLink| {
						arena
							.slot(link.slot)
							.map(|slot| Proxy::eager(Arc::clone(arena), slot))
							.ok_or_else(|| self.no_route(method))
					})
				}
			},
		}
	}

	fn no_route(&self, method: &str) -> BeanError {
		BeanError::InternalDispatch {
			bean: self.bean_type().name(),
			method: method.to_string(),
		}
	}

	fn mismatch<T: ?Sized>(&self, method: &str) -> BeanError {
		BeanError::TypeMismatch {
			bean: self.bean_type().name(),
			method: method.to_string(),
			expected: std::any::type_name::<T>(),
		}
	}

	fn plain<T: FromScalar>(&self, method: &str, value: &BeanValue) -> Result<T> {
		match value {
			Resolved::Scalar(raw) => T::from_plain(raw).ok_or_else(|| self.mismatch::<T>(method)),
			_ => Err(self.mismatch::<T>(method)),
		}
	}

	fn as_bean<B: Bean>(&self, method: &str, value: &BeanValue) -> Result<B> {
		match value {
			Resolved::Bean(proxy) if proxy.bean_type().id() == TypeId::of::<B>() => {
				Ok(B::from_proxy(proxy.clone()))
			}
			_ => Err(self.mismatch::<B>(method)),
		}
	}

	fn elements<'v>(&self, method: &str, value: &'v BeanValue) -> Result<&'v [BeanValue]> {
		value
			.elements()
			.ok_or_else(|| self.mismatch::<Vec<BeanValue>>(method))
	}

	/// Single scalar getter; `None` when the store holds null
	pub fn scalar<T: FromScalar>(&self, method: &str) -> Result<Option<T>> {
		match self.invoke(method)? {
			Resolved::Null => Ok(None),
			value => self.plain(method, &value).map(Some),
		}
	}

	/// List-shaped scalar getter; null elements are skipped
	pub fn scalars<T: FromScalar>(&self, method: &str) -> Result<Vec<T>> {
		let value = self.invoke(method)?;
		self.elements(method, &value)?
			.iter()
			.filter(|item| !item.is_null())
			.map(|item| self.plain(method, item))
			.collect()
	}

	/// Set-shaped scalar getter
	pub fn scalar_set<T: FromScalar + Eq + Hash>(&self, method: &str) -> Result<HashSet<T>> {
		Ok(self.scalars(method)?.into_iter().collect())
	}

	/// Single getter produced by a transformer into a domain type
	pub fn domain<T: Any + Clone>(&self, method: &str) -> Result<Option<T>> {
		match self.invoke(method)? {
			Resolved::Null => Ok(None),
			Resolved::Domain(value) => value
				.downcast_ref::<T>()
				.cloned()
				.map(Some)
				.ok_or_else(|| self.mismatch::<T>(method)),
			_ => Err(self.mismatch::<T>(method)),
		}
	}

	/// To-one relation getter
	pub fn bean<B: Bean>(&self, method: &str) -> Result<Option<B>> {
		match self.invoke(method)? {
			Resolved::Null => Ok(None),
			value => self.as_bean(method, &value).map(Some),
		}
	}

	/// List-shaped to-many relation getter
	pub fn beans<B: Bean>(&self, method: &str) -> Result<Vec<B>> {
		let value = self.invoke(method)?;
		self.elements(method, &value)?
			.iter()
			.map(|item| self.as_bean(method, item))
			.collect()
	}

	/// Set-shaped to-many relation getter
	pub fn bean_set<B: Bean + Eq + Hash>(&self, method: &str) -> Result<HashSet<B>> {
		Ok(self.beans(method)?.into_iter().collect())
	}

	/// Ordered-set-shaped to-many relation getter, in first-seen order
	pub fn bean_ordered_set<B: Bean + Eq + Hash>(&self, method: &str) -> Result<IndexSet<B>> {
		Ok(self.beans(method)?.into_iter().collect())
	}

	/// 1:1 map getter, entries in first-seen key order
	pub fn bean_map<K: FromScalar + Eq + Hash, B: Bean>(&self, method: &str) -> Result<IndexMap<K, B>> {
		let Resolved::Map(entries) = self.invoke(method)? else {
			return Err(self.mismatch::<IndexMap<K, B>>(method));
		};
		entries
			.iter()
			.map(|(key, value)| {
				let key = K::from_plain(key).ok_or_else(|| self.mismatch::<K>(method))?;
				Ok((key, self.as_bean(method, value)?))
			})
			.collect()
	}

	/// Grouped map getter, each key holding the declared inner collection
	pub fn bean_groups<K: FromScalar + Eq + Hash, B: Bean>(
		&self,
		method: &str,
	) -> Result<IndexMap<K, Vec<B>>> {
		let Resolved::Map(entries) = self.invoke(method)? else {
			return Err(self.mismatch::<IndexMap<K, Vec<B>>>(method));
		};
		entries
			.iter()
			.map(|(key, group)| {
				let key = K::from_plain(key).ok_or_else(|| self.mismatch::<K>(method))?;
				let beans = self
					.elements(method, group)?
					.iter()
					.map(|item| self.as_bean(method, item))
					.collect::<Result<Vec<B>>>()?;
				Ok((key, beans))
			})
			.collect()
	}
}

impl PartialEq for Proxy {
	fn eq(&self, other: &Self) -> bool {
		self.bean_type() == other.bean_type() && self.identity() == other.identity()
	}
}

impl Eq for Proxy {}

impl Hash for Proxy {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.bean_type().hash(state);
		self.identity().hash(state);
	}
}

impl fmt::Debug for Proxy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let strategy = match self.repr {
			Repr::Backed(_) => "backed",
			Repr::Eager { .. } => "eager",
		};
		f.debug_struct("Proxy")
			.field("bean", &self.bean_type())
			.field("identity", self.identity())
			.field("strategy", &strategy)
			.finish()
	}
}

impl fmt::Display for Proxy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}[{}]", self.bean_type().name(), self.identity())
	}
}
