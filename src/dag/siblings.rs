/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`Siblings`], the ambient per-run handle through which
//! a running task can observe and cancel the other tasks of its run

use std::{
	fmt::{self, Debug},
	sync::{Arc, Mutex},
};

use super::scheduler::{lock, RunState};
use crate::{cancellation::Cancelled, error::DiscardedTask, task::TaskTemplate};

tokio::task_local! {
	/// The sibling handle of the run the current task belongs to, installed
	/// for the whole duration of an invocation
	pub(crate) static SIBLINGS: Siblings;
}

/// The lifecycle state of a template, as observed mid-run from a sibling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiblingState {
	/// Will never be launched in this run
	Discarded,

	/// Still waiting for its dependencies to complete
	Waiting,

	/// Launched and not yet completed
	Running,

	/// Completed, its outcome is recorded
	Done,
}

/// A run-scoped handle giving a running task controlled visibility into, and
/// influence over, its sibling tasks.
///
/// Obtain it from inside a task body via [`Siblings::current`]. All of its
/// operations are safe to call there precisely because the scheduler itself
/// only runs while no task does.
#[derive(Clone)]
pub struct Siblings {
	pub(crate) state: Arc<Mutex<RunState>>,
}

impl Siblings {
	/// The handle of the run the current task belongs to, or `None` when
	/// called outside of a running task.
	#[must_use]
	pub fn current() -> Option<Self> {
		SIBLINGS.try_with(Clone::clone).ok()
	}

	/// The state of `template` at this moment of the run.
	///
	/// A template belonging to a different dag reports [`SiblingState::Waiting`].
	#[must_use]
	pub fn state_of(&self, template: &TaskTemplate) -> SiblingState {
		let state = lock(&self.state);

		if state.dag_id != template.dag_id {
			return SiblingState::Waiting;
		}

		if state.discarded.contains(&template.slot) {
			return SiblingState::Discarded;
		}

		match state.tasks.get(&template.slot) {
			None => SiblingState::Waiting,
			Some(task) if task.done => SiblingState::Done,
			Some(_) => SiblingState::Running,
		}
	}

	/// Cancels a running sibling, or discards a waiting one together with its
	/// dependants. Cancelling an already completed sibling is a no-op.
	///
	/// A cancelled running task observes a [`Cancelled`] error at its next
	/// suspension point, which then flows through that task's own exception
	/// handler — the handler may well turn the cancellation into a substitute
	/// outcome.
	///
	/// # Errors
	/// [`DiscardedTask`] if the template has already been discarded.
	pub fn cancel(&self, template: &TaskTemplate) -> Result<(), DiscardedTask> {
		let mut state = lock(&self.state);

		if state.dag_id != template.dag_id {
			return Ok(());
		}

		if state.discarded.contains(&template.slot) {
			return Err(DiscardedTask(template.name.clone()));
		}

		if let Some(task) = state.tasks.get(&template.slot) {
			task.cancel
				.fire(Cancelled::with_reason("cancelled by a sibling task"));
		} else {
			state.discard_transitively(template.slot);
		}

		Ok(())
	}
}

impl Debug for Siblings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Siblings").finish_non_exhaustive()
	}
}
