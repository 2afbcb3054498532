/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! End-to-end scenarios covering registration, scheduling order, and misuse
//! of the graph or the run arguments

#![expect(
	clippy::unwrap_used,
	reason = "panicking on malformed test state is fine"
)]

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use dagrun::{
	Dag, DagResult, InputError, LookupError, RunArgs, RunError, Task, TaskValue,
};
use tokio::time::{sleep, Duration};

type Log = Arc<Mutex<Vec<&'static str>>>;

fn push(log: &Log, entry: &'static str) {
	log.lock().unwrap().push(entry);
}

fn entries(log: &Log) -> Vec<&'static str> {
	log.lock().unwrap().clone()
}

fn int(result: &DagResult, name: &str) -> i64 {
	*result.by_name()[name].downcast_ref::<i64>().unwrap()
}

/// Registers a task that appends `entry` to `log` and returns `()`.
fn logging(dag: &mut Dag, name: &'static str, params: &[&str], log: &Log, entry: &'static str) {
	let log = Arc::clone(log);
	dag.register(Task::new(name, params, move |_input| {
		let log = Arc::clone(&log);
		async move {
			push(&log, entry);
			Ok(TaskValue::unit())
		}
	}))
	.unwrap();
}

#[tokio::test]
async fn single_task_receives_positional_and_keyword_args() {
	let mut dag = Dag::new();

	let a = dag
		.register(Task::new("a", &["x"], |input| async move {
			let t = *input.positional()[0].downcast_ref::<i64>().unwrap();
			let x = *input.require::<i64>("x")?;
			Ok(TaskValue::new(t + x))
		}))
		.unwrap();

	let result = dag
		.run(RunArgs::new().arg(10_i64).kwarg("x", 2_i64))
		.await
		.unwrap();

	assert_eq!(result.get(&a).unwrap().downcast_ref::<i64>(), Some(&12));
	assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn fan_in_chain_runs_in_topological_order() {
	let mut dag = Dag::new();
	let order: Log = Log::default();

	// registered out of order on purpose: "b" names "a" before "a" exists
	{
		let order = Arc::clone(&order);
		dag.register(Task::new("b", &["a", "x"], move |input| {
			let order = Arc::clone(&order);
			async move {
				push(&order, "b");
				Ok(TaskValue::new(input.require::<i64>("a")? + 1))
			}
		}))
		.unwrap();
	}
	{
		let order = Arc::clone(&order);
		dag.register(Task::new("a", &["x"], move |input| {
			let order = Arc::clone(&order);
			async move {
				push(&order, "a");
				Ok(TaskValue::new(*input.require::<i64>("x")?))
			}
		}))
		.unwrap();
	}
	{
		let order = Arc::clone(&order);
		dag.register(Task::new("c", &["b", "x"], move |input| {
			let order = Arc::clone(&order);
			async move {
				push(&order, "c");
				Ok(TaskValue::new(
					input.require::<i64>("b")? + input.require::<i64>("x")?,
				))
			}
		}))
		.unwrap();
	}

	let result = dag.run(RunArgs::new().kwarg("x", 2_i64)).await.unwrap();

	assert_eq!(int(&result, "a"), 2);
	assert_eq!(int(&result, "b"), 3);
	assert_eq!(int(&result, "c"), 5);
	assert_eq!(entries(&order), ["a", "b", "c"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn diamond_completes_layer_by_layer() {
	let mut dag = Dag::new();
	let order: Log = Log::default();

	// a -> b -> c, d -> e -> {c, g}, f -> c
	let sleepy = |log: &Log, entry: &'static str, millis: u64| {
		let log = Arc::clone(log);
		move |_input| {
			let log = Arc::clone(&log);
			async move {
				sleep(Duration::from_millis(millis)).await;
				push(&log, entry);
				Ok(TaskValue::unit())
			}
		}
	};

	dag.register(Task::new("a", &[], sleepy(&order, "1", 50))).unwrap();
	dag.register(Task::new("b", &["a"], sleepy(&order, "2", 50))).unwrap();
	dag.register(Task::new("c", &["b", "d", "e", "f"], sleepy(&order, "3", 20))).unwrap();
	dag.register(Task::new("d", &[], sleepy(&order, "1", 60))).unwrap();
	dag.register(Task::new("e", &["d"], sleepy(&order, "2", 50))).unwrap();
	dag.register(Task::new("f", &[], sleepy(&order, "1", 70))).unwrap();
	dag.register(Task::new("g", &["e"], sleepy(&order, "3", 50))).unwrap();

	let result = dag.run(RunArgs::new()).await.unwrap();

	assert_eq!(result.len(), 7);
	assert!(result.discarded().is_empty());
	assert_eq!(entries(&order), ["1", "1", "1", "2", "2", "3", "3"]);
}

#[tokio::test]
async fn registration_order_does_not_change_the_graph() {
	for in_order in [true, false] {
		let mut dag = Dag::new();
		let order: Log = Log::default();

		if in_order {
			logging(&mut dag, "a", &[], &order, "a");
			logging(&mut dag, "b", &["a"], &order, "b");
		} else {
			logging(&mut dag, "b", &["a"], &order, "b");
			logging(&mut dag, "a", &[], &order, "a");
		}

		dag.run(RunArgs::new()).await.unwrap();
		assert_eq!(entries(&order), ["a", "b"], "in_order: {in_order}");
	}
}

#[tokio::test]
async fn empty_dag_completes_immediately() {
	let dag = Dag::new();

	use tokio_test::assert_ok;
	let result = assert_ok!(dag.run(RunArgs::new()).await);

	assert!(result.is_empty());
	assert!(result.discarded().is_empty());
}

#[tokio::test]
async fn cycle_is_reported_with_everything_stuck_behind_it() {
	let mut dag = Dag::new();
	let order: Log = Log::default();

	logging(&mut dag, "a", &["b"], &order, "a");
	logging(&mut dag, "b", &["a"], &order, "b");
	logging(&mut dag, "c", &["b"], &order, "c");

	let error = dag.run(RunArgs::new()).await.unwrap_err();

	assert_matches!(error, RunError::Cycle(cycle) => {
		let stuck: Vec<&str> = cycle.stuck.iter().map(AsRef::as_ref).collect();
		assert_eq!(stuck, ["a", "b", "c"]);
	});
	// nothing in or behind the cycle ever launched
	assert_eq!(entries(&order), [] as [&str; 0]);
}

#[tokio::test]
async fn self_dependency_is_a_cycle() {
	let mut dag = Dag::new();
	let order: Log = Log::default();

	logging(&mut dag, "a", &["a"], &order, "a");

	assert_matches!(dag.run(RunArgs::new()).await, Err(RunError::Cycle(_)));
	assert_eq!(entries(&order), [] as [&str; 0]);
}

#[tokio::test]
async fn keywords_named_like_templates_are_rejected() {
	let mut dag = Dag::new();
	let order: Log = Log::default();

	logging(&mut dag, "a", &[], &order, "a");
	logging(&mut dag, "b", &["a"], &order, "b");

	let error = dag.run(RunArgs::new().kwarg("a", 1_i64)).await.unwrap_err();

	assert_matches!(error, RunError::ArgumentCollision(names) => {
		assert_eq!(&*names[0], "a");
	});
	// rejected before anything was launched
	assert_eq!(entries(&order), [] as [&str; 0]);
}

#[tokio::test]
async fn missing_keyword_argument_fails_the_task() {
	let mut dag = Dag::new();

	dag.register(Task::new("a", &["x"], |input| async move {
		Ok(TaskValue::new(*input.require::<i64>("x")?))
	}))
	.unwrap();

	let error = dag.run(RunArgs::new()).await.unwrap_err();

	let propagated = error.propagated().unwrap();
	assert_matches!(
		propagated.downcast_ref::<InputError>(),
		Some(InputError::Missing(name)) => assert_eq!(&**name, "x")
	);
}

#[tokio::test]
async fn lookup_with_a_foreign_template_is_not_found() {
	let mut dag = Dag::new();
	let mut other = Dag::new();

	dag.register(Task::new("a", &[], |_input| async {
		Ok(TaskValue::unit())
	}))
	.unwrap();
	let foreign = other
		.register(Task::new("a", &[], |_input| async {
			Ok(TaskValue::unit())
		}))
		.unwrap();

	let result = dag.run(RunArgs::new()).await.unwrap();

	assert_matches!(result.get(&foreign), Err(LookupError::NotFound(_)));
	assert!(!result.contains(&foreign));
}
