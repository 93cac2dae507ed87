//! Bean types shared by the integration tests
//!
//! `Person` reads the people fixture; `Project`, `Task` and `Member` read the
//! project fixture.

#![allow(dead_code)]

use beanloader::Result;
use beanloader::prelude::*;

/// Declare a bean type wrapping a [`Proxy`]
macro_rules! proxy_bean {
	($name:ident, $table:literal, |$def:ident| $body:block) => {
		#[derive(Debug, Clone, PartialEq, Eq, Hash)]
		pub struct $name(pub beanloader::Proxy);

		impl beanloader::Bean for $name {
			const TABLE: &'static str = $table;

			fn declare($def: &mut beanloader::BeanDefinition) $body

			fn from_proxy(proxy: beanloader::Proxy) -> Self {
				$name(proxy)
			}

			fn proxy(&self) -> &beanloader::Proxy {
				&self.0
			}
		}
	};
}

proxy_bean!(Person, "person", |def| {
	def.getter("getName").returns::<String>();
	def.getter("getManager").returns_bean::<Person>();
	def.getter("getBuddy").returns_bean::<Person>();
	def.getter("getReports")
		.beans::<Person>()
		.foreign_key()
		.sort(SortKey::asc("name"));
	def.getter("getNicknames").list::<String>();
	def.getter("getNicknameSet").set::<String>().path("nicknames");
	def.getter("isActive").returns::<bool>();
	def.getter("getLevel").returns::<i64>();
	def.getter("getManagerName")
		.returns::<String>()
		.path("manager.name");
	def.default_method("displayName", |proxy| {
		let name = proxy.scalar::<String>("getName")?.unwrap_or_default();
		Ok(Resolved::Scalar(Value::from(format!("<{}>", name))))
	});
	def.record_accessor("getRecord");
});

impl Person {
	pub fn name(&self) -> Result<Option<String>> {
		self.0.scalar("getName")
	}

	pub fn manager(&self) -> Result<Option<Person>> {
		self.0.bean("getManager")
	}

	pub fn buddy(&self) -> Result<Option<Person>> {
		self.0.bean("getBuddy")
	}

	pub fn reports(&self) -> Result<Vec<Person>> {
		self.0.beans("getReports")
	}
}

proxy_bean!(Member, "person", |def| {
	def.getter("getName").returns::<String>();
});

impl Member {
	pub fn name(&self) -> Result<Option<String>> {
		self.0.scalar("getName")
	}
}

proxy_bean!(Task, "task", |def| {
	def.getter("getTitle").returns::<String>();
	def.getter("getStatus").returns::<String>();
	def.getter("getPriority").returns::<i64>();
	def.getter("getProject").returns_bean::<Project>();
	def.getter("getAssignee").returns_bean::<Member>();
});

impl Task {
	pub fn title(&self) -> Result<Option<String>> {
		self.0.scalar("getTitle")
	}

	pub fn project(&self) -> Result<Option<Project>> {
		self.0.bean("getProject")
	}
}

proxy_bean!(Project, "project", |def| {
	def.getter("getName").returns::<String>();
	def.getter("getLead").returns_bean::<Member>();
	def.getter("getTasks")
		.beans::<Task>()
		.sort(SortKey::desc("priority"));
	def.getter("getOpenTasks")
		.beans::<Task>()
		.path("open_tasks")
		.association()
		.sort(SortKey::asc("title"));
	def.getter("getMembers")
		.beans::<Member>()
		.association()
		.sort(SortKey::asc("name"));
	def.getter("getMemberList").beans::<Member>().path("members");
	def.getter("getMemberSet")
		.bean_ordered_set::<Member>()
		.path("members");
	def.getter("getTasksByTitle")
		.bean_map::<String, Task>()
		.path("tasks")
		.key_path("title");
	def.getter("getTasksByStatus")
		.bean_groups::<String, Task>(CollectionKind::List)
		.path("tasks")
		.key_path("status");
});

impl Project {
	pub fn name(&self) -> Result<Option<String>> {
		self.0.scalar("getName")
	}

	pub fn tasks(&self) -> Result<Vec<Task>> {
		self.0.beans("getTasks")
	}
}

/// Titles of `tasks`, in order
pub fn titles(tasks: &[Task]) -> Vec<String> {
	tasks
		.iter()
		.map(|task| task.title().unwrap().unwrap_or_default())
		.collect()
}

/// Names of `members`, in order
pub fn names<'a>(members: impl IntoIterator<Item = &'a Member>) -> Vec<String> {
	members
		.into_iter()
		.map(|member| member.name().unwrap().unwrap_or_default())
		.collect()
}
