//! rstest fixtures with ready-made stores
//!
//! - [`people_store`]: people with a manager chain, reports, nicknames and a
//!   mutual `buddy` cycle
//! - [`project_store`]: projects with tasks, members through a junction
//!   table and an association by predicate

use crate::store::MemoryStore;
use rstest::*;
use std::sync::Arc;

/// People: A (1) reports to B (2), C (3) reports to B, B has no manager.
/// A and B are each other's buddy.
pub const PEOPLE_FIXTURE: &str = r#"
[tables.person.fields]
name = { type = "text" }
nicknames = { type = "text", cardinality = "many" }
active = { type = "bool" }
level = { type = "int" }

[tables.person.relations]
manager = { kind = "direct_foreign_key", table = "person" }
buddy = { kind = "direct_foreign_key", table = "person" }
reports = { kind = "inverse_foreign_key", foreign_field = "manager", table = "person", cardinality = "many" }

[[tables.person.rows]]
id = 1
name = "A"
manager = 2
buddy = 2
nicknames = ["ace", "ace", "alpha"]
active = true
level = 1

[[tables.person.rows]]
id = 2
name = "B"
buddy = 1
level = 3

[[tables.person.rows]]
id = 3
name = "C"
manager = 2
level = 1
"#;

/// Projects, tasks and people.
///
/// Project 1 (Apollo) has three tasks, two of them open, and members listed
/// through `membership` rows, one of which points to a missing person and one
/// repeats a member. Project 2 (Gemini) has nothing.
pub const PROJECT_FIXTURE: &str = r#"
[tables.project.fields]
name = { type = "text" }

[tables.project.relations]
lead = { kind = "direct_foreign_key", table = "person" }
tasks = { kind = "inverse_foreign_key", foreign_field = "project", table = "task", cardinality = "many" }
open_tasks = { kind = "association_by_predicate", expression = "project = ${id} and status = 'open'", table = "task", cardinality = "many" }
members = { kind = "association_by_junction_table", junction_table = "membership", source_field = "project", target_field = "person", table = "person", cardinality = "many" }

[tables.task.fields]
title = { type = "text" }
status = { type = "text" }
priority = { type = "int" }

[tables.task.relations]
project = { kind = "direct_foreign_key", table = "project" }
assignee = { kind = "direct_foreign_key", table = "person" }

[tables.person.fields]
name = { type = "text" }

[tables.membership.fields]
project = { type = "reference" }
person = { type = "reference" }

[[tables.project.rows]]
id = 1
name = "Apollo"
lead = 10

[[tables.project.rows]]
id = 2
name = "Gemini"

[[tables.task.rows]]
id = 100
title = "design"
status = "open"
priority = 2
project = 1
assignee = 10

[[tables.task.rows]]
id = 101
title = "build"
status = "open"
priority = 1
project = 1
assignee = 11

[[tables.task.rows]]
id = 102
title = "ship"
status = "done"
priority = 3
project = 1
assignee = 10

[[tables.person.rows]]
id = 10
name = "Ada"

[[tables.person.rows]]
id = 11
name = "Brian"

[[tables.person.rows]]
id = 12
name = "Cleo"

[[tables.membership.rows]]
id = 1
project = 1
person = 11

[[tables.membership.rows]]
id = 2
project = 1
person = 10

[[tables.membership.rows]]
id = 3
project = 1
person = 99

[[tables.membership.rows]]
id = 4
project = 1
person = 10
"#;

/// Fixture providing the people store
#[fixture]
pub fn people_store() -> Arc<MemoryStore> {
	Arc::new(MemoryStore::from_toml_str(PEOPLE_FIXTURE).expect("people fixture is valid"))
}

/// Fixture providing the project store
#[fixture]
pub fn project_store() -> Arc<MemoryStore> {
	Arc::new(MemoryStore::from_toml_str(PROJECT_FIXTURE).expect("project fixture is valid"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use beanloader_core::{Record, RecordStore, Value};

	#[rstest]
	fn test_people_fixture_loads(people_store: Arc<MemoryStore>) {
		assert_eq!(people_store.len("person"), 3);
		let a = Record::new("person", 1);
		assert_eq!(people_store.get(&a, "manager.name").unwrap(), Value::from("B"));
	}

	#[rstest]
	fn test_project_fixture_loads(project_store: Arc<MemoryStore>) {
		assert_eq!(project_store.len("task"), 3);
		assert_eq!(project_store.len("membership"), 4);
		assert!(project_store.resolve_schema("project", "open_tasks").unwrap().is_relation());
	}
}
