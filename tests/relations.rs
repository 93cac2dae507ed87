//! Relation kinds, ordering and collector shapes over the project fixture

#[macro_use]
mod common;

use beanloader::beans::{BeanTypeRef, GetterKind, describe_reachable};
use beanloader::prelude::*;
use beanloader::store::Cardinality;
use beanloader_test::{MemoryStore, logging::init_test_logging, project_store};
use common::{Member, Project, Task, names, titles};
use rstest::rstest;
use std::sync::Arc;

proxy_bean!(ProjectHead, "project", |def| {
	def.getter("getName").returns::<String>();
	def.getter("getFirstTask").returns_bean::<Task>().path("tasks");
	def.getter("getFirstOpenTask")
		.returns_bean::<Task>()
		.path("open_tasks");
});

fn loader(strategy: Strategy, store: Arc<MemoryStore>) -> BeanLoader {
	init_test_logging();
	match strategy {
		Strategy::Backed => BeanLoader::backed(store),
		Strategy::Eager => BeanLoader::eager(store),
	}
}

fn apollo(loader: &BeanLoader) -> Project {
	loader.load_one(&Record::new("project", 1)).unwrap()
}

#[rstest]
#[case(Strategy::Backed)]
#[case(Strategy::Eager)]
fn test_inverse_foreign_key_sorted_by_store(#[case] strategy: Strategy, project_store: Arc<MemoryStore>) {
	let loader = loader(strategy, project_store);
	let tasks = apollo(&loader).tasks().unwrap();
	assert_eq!(titles(&tasks), vec!["ship", "design", "build"]);

	let back = tasks[0].project().unwrap().unwrap();
	assert_eq!(back.name().unwrap(), Some("Apollo".to_string()));
}

#[rstest]
#[case(Strategy::Backed)]
#[case(Strategy::Eager)]
fn test_association_by_predicate(#[case] strategy: Strategy, project_store: Arc<MemoryStore>) {
	let loader = loader(strategy, project_store);
	let open: Vec<Task> = apollo(&loader).0.beans("getOpenTasks").unwrap();
	assert_eq!(titles(&open), vec!["build", "design"]);
}

#[rstest]
#[case(Strategy::Backed)]
#[case(Strategy::Eager)]
fn test_junction_table_skips_missing_and_sorts(#[case] strategy: Strategy, project_store: Arc<MemoryStore>) {
	let loader = loader(strategy, project_store);
	let project = apollo(&loader);

	// membership rows: Brian, Ada, a missing person, Ada again
	let sorted: Vec<Member> = project.0.beans("getMembers").unwrap();
	assert_eq!(names(&sorted), vec!["Ada", "Ada", "Brian"]);

	let unsorted: Vec<Member> = project.0.beans("getMemberList").unwrap();
	assert_eq!(names(&unsorted), vec!["Brian", "Ada", "Ada"]);

	let unique = project.0.bean_ordered_set::<Member>("getMemberSet").unwrap();
	assert_eq!(names(&unique), vec!["Brian", "Ada"]);
}

#[rstest]
#[case(Strategy::Backed)]
#[case(Strategy::Eager)]
fn test_empty_relations(#[case] strategy: Strategy, project_store: Arc<MemoryStore>) {
	let loader = loader(strategy, project_store);
	let gemini: Project = loader.load_one(&Record::new("project", 2)).unwrap();

	assert!(gemini.tasks().unwrap().is_empty());
	assert!(gemini.0.beans::<Task>("getOpenTasks").unwrap().is_empty());
	assert!(gemini.0.beans::<Member>("getMembers").unwrap().is_empty());
	assert!(gemini.0.bean_ordered_set::<Member>("getMemberSet").unwrap().is_empty());
	assert!(gemini.0.bean_map::<String, Task>("getTasksByTitle").unwrap().is_empty());
	assert!(gemini.0.bean_groups::<String, Task>("getTasksByStatus").unwrap().is_empty());
	assert!(gemini.0.bean::<Member>("getLead").unwrap().is_none());
}

#[rstest]
#[case(Strategy::Backed)]
#[case(Strategy::Eager)]
fn test_one_to_one_map(#[case] strategy: Strategy, project_store: Arc<MemoryStore>) {
	let loader = loader(strategy, project_store);
	let by_title = apollo(&loader)
		.0
		.bean_map::<String, Task>("getTasksByTitle")
		.unwrap();

	// keys in first-seen order of the (unsorted) relation
	assert_eq!(
		by_title.keys().cloned().collect::<Vec<_>>(),
		vec!["design", "build", "ship"]
	);
	assert_eq!(by_title["ship"].title().unwrap(), Some("ship".to_string()));
}

#[rstest]
#[case(Strategy::Backed)]
#[case(Strategy::Eager)]
fn test_grouped_map(#[case] strategy: Strategy, project_store: Arc<MemoryStore>) {
	let loader = loader(strategy, project_store);
	let by_status = apollo(&loader)
		.0
		.bean_groups::<String, Task>("getTasksByStatus")
		.unwrap();

	assert_eq!(by_status.len(), 2);
	assert_eq!(titles(&by_status["open"]), vec!["design", "build"]);
	assert_eq!(titles(&by_status["done"]), vec!["ship"]);
}

#[rstest]
fn test_eager_related_beans_share_instances(project_store: Arc<MemoryStore>) {
	let loader = loader(Strategy::Eager, project_store);
	let project = apollo(&loader);

	let tasks = project.tasks().unwrap();
	let by_title = project.0.bean_map::<String, Task>("getTasksByTitle").unwrap();
	assert!(tasks[0].0.same_instance(&by_title["ship"].0));

	let lead = project.0.bean::<Member>("getLead").unwrap().unwrap();
	let members: Vec<Member> = project.0.beans("getMembers").unwrap();
	assert!(members[0].0.same_instance(&lead.0));
}

#[rstest]
fn test_project_declaration_resolves(project_store: Arc<MemoryStore>) {
	let descriptor = describe_reachable(BeanTypeRef::of::<Project>(), project_store.as_ref()).unwrap();

	let open = descriptor.getter("getOpenTasks").unwrap();
	assert_eq!(open.property_path, "open_tasks");
	assert_eq!(open.kind, GetterKind::ToManyRelation);
	let expression = open.relation.as_ref().and_then(|target| target.expression.as_ref());
	assert_eq!(
		expression.map(|expr| expr.placeholders().collect::<Vec<_>>()),
		Some(vec!["id"])
	);

	// tasks reach back to the project, so the whole graph resolves
	assert!(describe_reachable(BeanTypeRef::of::<Task>(), project_store.as_ref()).is_ok());
}

#[rstest]
#[case(Strategy::Backed)]
#[case(Strategy::Eager)]
fn test_to_one_over_many_relation_keeps_first_record(
	#[case] strategy: Strategy,
	project_store: Arc<MemoryStore>,
) {
	let descriptor = describe_reachable(BeanTypeRef::of::<ProjectHead>(), project_store.as_ref()).unwrap();
	let first = descriptor.getter("getFirstTask").unwrap();
	assert_eq!(first.kind, GetterKind::ToOneRelation);
	assert_eq!(
		first.relation.as_ref().map(|target| target.cardinality),
		Some(Cardinality::Many)
	);

	let loader = loader(strategy, project_store);
	let apollo: ProjectHead = loader.load_one(&Record::new("project", 1)).unwrap();
	let task = apollo.0.bean::<Task>("getFirstTask").unwrap().unwrap();
	assert_eq!(task.title().unwrap(), Some("design".to_string()));
	let open = apollo.0.bean::<Task>("getFirstOpenTask").unwrap().unwrap();
	assert_eq!(open.title().unwrap(), Some("design".to_string()));

	let gemini: ProjectHead = loader.load_one(&Record::new("project", 2)).unwrap();
	assert!(gemini.0.bean::<Task>("getFirstTask").unwrap().is_none());
}
