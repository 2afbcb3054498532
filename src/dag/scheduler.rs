/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the run loop: partitioning the templates, waiting for
//! the first completion, applying cancel policies, and advancing the frontier,
//! as well as the safe-call wrapper every launched task executes

use std::{
	collections::{HashMap, HashSet},
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use tokio::select;

use super::{result::DagResult, run_args::RunArgs, siblings::SIBLINGS, Dag, Siblings};
use crate::{
	cancellation::{CancelHandle, CancelSignal, Cancelled},
	error::{BoxError, CycleError, RunError},
	handler::{Abort, CancelPolicy, ContinueResult, ExceptionHandler, PostErrorResult, PropagateError},
	task::{input::TaskInput, TaskCallback},
	value::{Outcome, TaskError, TaskValue},
};

type TaskFuture = BoxFuture<'static, (usize, SafeOutcome)>;

/// The bookkeeping of one run, shared between the scheduler and the ambient
/// [`Siblings`] handle.
///
/// The lock is never contended: tasks only make progress while the scheduler
/// is suspended on the first-completed wait, and the handle is only usable
/// from inside a running task.
pub(crate) struct RunState {
	pub(crate) dag_id: u64,
	/// waiting templates mapped to their still-unsatisfied dependencies
	pub(crate) not_ready: HashMap<usize, HashSet<usize>>,
	/// transpose of the dependency relation, fixed for the whole run
	pub(crate) dependants: HashMap<usize, Vec<usize>>,
	/// templates that will never be launched in this run
	pub(crate) discarded: HashSet<usize>,
	/// launched templates mapped to their cancel handles and completion flags
	pub(crate) tasks: HashMap<usize, LaunchedTask>,
	/// completed templates mapped to their recorded outcomes
	intermediary: HashMap<usize, Outcome>,
	launch_order: Vec<usize>,
}

pub(crate) struct LaunchedTask {
	pub(crate) cancel: CancelHandle,
	pub(crate) done: bool,
}

impl RunState {
	fn new(dag: &Dag) -> Self {
		let mut dependants: HashMap<usize, Vec<usize>> = HashMap::new();
		for (slot, template) in dag.templates.iter().enumerate() {
			for &dependency in &template.dependencies {
				dependants.entry(dependency).or_default().push(slot);
			}
		}

		Self {
			dag_id: dag.id,
			not_ready: HashMap::new(),
			dependants,
			discarded: HashSet::new(),
			tasks: HashMap::new(),
			intermediary: HashMap::new(),
			launch_order: Vec::new(),
		}
	}

	/// Transitively discards `seed` and its dependants.
	///
	/// Only templates still waiting are discarded and recursed into, which
	/// both spares the subtrees behind already-launched templates and keeps
	/// the traversal terminating on diamonds.
	pub(crate) fn discard_transitively(&mut self, seed: usize) {
		if self.not_ready.remove(&seed).is_some() {
			self.discarded.insert(seed);
		}

		let mut stack = vec![seed];
		while let Some(current) = stack.pop() {
			for &child in self.dependants.get(&current).into_iter().flatten() {
				if self.not_ready.remove(&child).is_some() {
					self.discarded.insert(child);
					stack.push(child);
				}
			}
		}
	}
}

/// Locks the run state.
///
/// Poisoning can only follow a panic inside a scheduler step, in which case
/// the bookkeeping is still in a consistent enough state to keep reading.
pub(crate) fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
	state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What a launched task delivered to the scheduler.
enum SafeOutcome {
	/// A plain completed outcome
	Completed(Outcome),
	/// A policy to apply, produced by the exception handler or an [`Abort`]
	Policy(PostErrorResult),
	/// The task returned a post-error result as its value
	IllegalReturn,
}

pub(crate) async fn run(dag: &Dag, args: RunArgs) -> Result<DagResult, RunError> {
	let mut collisions: Vec<Arc<str>> = args
		.keywords
		.keys()
		.filter(|name| dag.by_name.contains_key(*name))
		.cloned()
		.collect();
	if !collisions.is_empty() {
		collisions.sort_unstable();
		return Err(RunError::ArgumentCollision(collisions));
	}

	let state = Arc::new(Mutex::new(RunState::new(dag)));
	let siblings = Siblings {
		state: Arc::clone(&state),
	};

	SIBLINGS.scope(siblings, drive(dag, args, state)).await
}

async fn drive(
	dag: &Dag,
	args: RunArgs,
	state: Arc<Mutex<RunState>>,
) -> Result<DagResult, RunError> {
	let positional: Arc<[TaskValue]> = args.positional.into();
	let keywords = args.keywords;

	let mut running = FuturesUnordered::new();
	let mut delayed: Option<(Arc<str>, TaskError)> = None;

	{
		let mut st = lock(&state);
		for (slot, template) in dag.templates.iter().enumerate() {
			if template.dependencies.is_empty() {
				launch(dag, slot, &positional, &keywords, &mut st, &mut running);
			} else {
				st.not_ready.insert(slot, template.dependencies.clone());
			}
		}
	}

	loop {
		if running.is_empty() {
			let st = lock(&state);
			if st.not_ready.is_empty() {
				break;
			}

			let mut stuck_slots: Vec<usize> = st.not_ready.keys().copied().collect();
			stuck_slots.sort_unstable();
			let stuck = stuck_slots
				.into_iter()
				.map(|slot| dag.templates[slot].name.clone())
				.collect();
			return Err(CycleError { stuck }.into());
		}

		// tasks make progress only while we are suspended right here
		let Some((slot, safe_outcome)) = running.next().await else {
			continue;
		};

		let template = &dag.templates[slot];
		tracing::trace!(task = %template.name, "completed");

		{
			let mut st = lock(&state);
			if let Some(task) = st.tasks.get_mut(&slot) {
				task.done = true;
			}
		}

		let outcome = match safe_outcome {
			SafeOutcome::Completed(outcome) => outcome,
			SafeOutcome::IllegalReturn => {
				return Err(RunError::IllegalReturn(template.name.clone()));
			}
			SafeOutcome::Policy(result) => {
				apply_cancel_policy(&state, result.cancel_policy(), slot, &template.name);

				if let PostErrorResult::Propagate(propagate) = &result {
					if delayed.is_none() {
						delayed = Some((template.name.clone(), propagate.error.clone()));
					}
				}

				result.into_outcome()
			}
		};

		let mut st = lock(&state);
		st.intermediary.insert(slot, outcome);

		// advance the frontier
		let dependants = st.dependants.get(&slot).cloned().unwrap_or_default();
		for dependant in dependants {
			let Some(waiting) = st.not_ready.get_mut(&dependant) else {
				// discarded by a cancel policy or a sibling
				continue;
			};

			waiting.remove(&slot);
			if waiting.is_empty() {
				st.not_ready.remove(&dependant);
				launch(dag, dependant, &positional, &keywords, &mut st, &mut running);
			}
		}
	}

	if let Some((name, error)) = delayed {
		return Err(RunError::Propagated { name, error });
	}

	let st = lock(&state);
	let entries = st
		.launch_order
		.iter()
		.filter_map(|&slot| {
			st.intermediary
				.get(&slot)
				.map(|outcome| (dag.handle(slot), outcome.clone()))
		})
		.collect();
	let discarded = st.discarded.iter().map(|&slot| dag.handle(slot)).collect();

	Ok(DagResult::new(dag.id, entries, discarded))
}

/// Creates the task of `slot` and adds it to the running set.
///
/// The task's arguments are the caller's positional values, the caller's
/// keywords, and the recorded outcome of every dependency under the
/// dependency's name.
fn launch(
	dag: &Dag,
	slot: usize,
	positional: &Arc<[TaskValue]>,
	keywords: &HashMap<Arc<str>, TaskValue>,
	st: &mut RunState,
	running: &mut FuturesUnordered<TaskFuture>,
) {
	let template = &dag.templates[slot];

	let mut args: HashMap<Arc<str>, Outcome> = keywords
		.iter()
		.map(|(name, value)| (name.clone(), Outcome::Returned(value.clone())))
		.collect();

	for &dependency in &template.dependencies {
		// every dependency has completed by now, that's what being launchable means
		if let Some(outcome) = st.intermediary.get(&dependency) {
			args.insert(dag.templates[dependency].name.clone(), outcome.clone());
		}
	}

	let input = TaskInput::new(Arc::clone(positional), args);
	let (signal, handle) = CancelSignal::new();

	st.tasks.insert(
		slot,
		LaunchedTask {
			cancel: handle,
			done: false,
		},
	);
	st.launch_order.push(slot);

	tracing::debug!(task = %template.name, "launching");

	let callback = Arc::clone(&template.callback);
	let exception_handler = template.exception_handler.clone();

	running.push(
		async move {
			(
				slot,
				safe_call(callback, exception_handler, input, signal).await,
			)
		}
		.boxed(),
	);
}

fn apply_cancel_policy(state: &Mutex<RunState>, policy: CancelPolicy, slot: usize, name: &Arc<str>) {
	let mut st = lock(state);

	match policy {
		CancelPolicy::CancelAll => {
			tracing::debug!(task = %name, "cancelling every sibling");

			let waiting: Vec<usize> = st.not_ready.keys().copied().collect();
			st.not_ready.clear();
			st.discarded.extend(waiting);

			let cause = Cancelled::with_reason(format!("cancelled by sibling task {name:?}"));
			for task in st.tasks.values() {
				// a no-op for tasks that have already completed
				task.cancel.fire(cause.clone());
			}
		}
		CancelPolicy::DiscardNotStarted => {
			tracing::debug!(task = %name, "discarding every waiting task");

			let waiting: Vec<usize> = st.not_ready.keys().copied().collect();
			st.not_ready.clear();
			st.discarded.extend(waiting);
		}
		CancelPolicy::DiscardChildren => {
			tracing::debug!(task = %name, "discarding dependants");
			st.discard_transitively(slot);
		}
		CancelPolicy::ContinueAll => (),
	}
}

/// Runs one task to completion, converting every way it can finish into a
/// [`SafeOutcome`]:
/// - a plain return stays a plain outcome, unless the value is a post-error
///   result, which only [`Abort`] is allowed to deliver;
/// - an [`Abort`] hands its post-error result over as is, bypassing the
///   exception handler;
/// - any other error, including a delivered cancellation, is resolved through
///   the template's exception handler.
async fn safe_call(
	callback: TaskCallback,
	exception_handler: ExceptionHandler,
	input: TaskInput,
	mut cancel: CancelSignal,
) -> SafeOutcome {
	let body = callback(input);

	let result: Result<TaskValue, BoxError> = select! {
		biased;
		cause = cancel.fired() => Err(cause.into()),
		result = body => result,
	};

	match result {
		Ok(value) => {
			if value.is::<PostErrorResult>()
				|| value.is::<ContinueResult>()
				|| value.is::<PropagateError>()
			{
				SafeOutcome::IllegalReturn
			} else {
				SafeOutcome::Completed(Outcome::Returned(value))
			}
		}
		Err(error) => match error.downcast::<Abort>() {
			Ok(abort) => SafeOutcome::Policy(abort.0),
			Err(error) => {
				let error = TaskError::from(error);
				SafeOutcome::Policy(exception_handler.resolve(&error))
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use std::collections::{HashMap, HashSet};

	use super::RunState;

	fn state(dependants: &[(usize, &[usize])], waiting: &[usize]) -> RunState {
		RunState {
			dag_id: 0,
			not_ready: waiting
				.iter()
				.map(|&slot| (slot, HashSet::new()))
				.collect(),
			dependants: dependants
				.iter()
				.map(|&(slot, children)| (slot, children.to_vec()))
				.collect(),
			discarded: HashSet::new(),
			tasks: HashMap::new(),
			intermediary: HashMap::new(),
			launch_order: Vec::new(),
		}
	}

	#[test]
	fn discard_covers_diamonds_once() {
		// 0 -> {1, 2} -> 3
		let mut st = state(&[(0, &[1, 2]), (1, &[3]), (2, &[3])], &[1, 2, 3]);

		st.discard_transitively(0);

		assert_eq!(st.discarded, HashSet::from([1, 2, 3]));
		assert!(st.not_ready.is_empty());
	}

	#[test]
	fn discard_stops_at_launched_templates() {
		// 0 -> 1 -> 2, but 1 has already been launched
		let mut st = state(&[(0, &[1]), (1, &[2])], &[2]);

		st.discard_transitively(0);

		assert!(st.discarded.is_empty());
		assert_eq!(st.not_ready.len(), 1);
	}

	#[test]
	fn discard_includes_a_waiting_seed() {
		let mut st = state(&[(0, &[1])], &[0, 1]);

		st.discard_transitively(0);

		assert_eq!(st.discarded, HashSet::from([0, 1]));
	}
}
