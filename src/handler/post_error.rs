/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`PostErrorResult`] and its two variants,
//! [`ContinueResult`] and [`PropagateError`], together with [`CancelPolicy`]
//! and the [`Abort`] escape hatch

use std::any::Any;

use super::ExceptionHandler;
use crate::value::{Outcome, TaskError, TaskValue};

/// What should happen to the rest of the graph after a task produced a
/// post-error result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelPolicy {
	/// Actively cancel every launched sibling and discard every waiting template
	CancelAll,

	/// Discard every waiting template but let the running tasks finish
	DiscardNotStarted,

	/// Transitively discard the waiting templates that depend on the failed task
	DiscardChildren,

	/// Leave every other task alone
	ContinueAll,
}

/// Record a substitute outcome for the failed task and carry on.
///
/// The rest of the run treats the task as if it had completed with
/// [`ContinueResult::value`]: dependents are launched and receive it as their
/// argument, and the run itself does not fail because of this task.
#[derive(Clone, Debug)]
pub struct ContinueResult {
	/// The outcome to record for the task
	pub value: Outcome,

	/// What to do with the task's siblings, [`CancelPolicy::ContinueAll`] by default
	pub cancel_policy: CancelPolicy,
}

impl ContinueResult {
	/// Creates a continue result recording `value` as the task's outcome.
	#[must_use]
	pub fn new<T>(value: T) -> Self
	where
		T: Any + Send + Sync,
	{
		Self::from_outcome(Outcome::Returned(TaskValue::new(value)))
	}

	/// Creates a continue result recording an already built [`Outcome`].
	#[must_use]
	pub fn from_outcome(value: impl Into<Outcome>) -> Self {
		Self {
			value: value.into(),
			cancel_policy: CancelPolicy::ContinueAll,
		}
	}

	/// Replaces the cancel policy.
	#[must_use]
	pub fn with_cancel_policy(mut self, cancel_policy: CancelPolicy) -> Self {
		self.cancel_policy = cancel_policy;
		self
	}

	/// Returns an exception handler that records any raised error as the
	/// failed task's outcome and applies `cancel_policy` to its siblings.
	#[must_use]
	pub fn handler(cancel_policy: CancelPolicy) -> ExceptionHandler {
		ExceptionHandler::from_fn(move |error| {
			Self::from_outcome(Outcome::Failed(error.clone()))
				.with_cancel_policy(cancel_policy)
				.into()
		})
	}
}

/// Record the error as the failed task's outcome and re-raise it from the run.
///
/// The run finishes whatever work the cancel policy allows and then fails with
/// the first propagated error.
#[derive(Clone, Debug)]
pub struct PropagateError {
	/// The error to record and re-raise
	pub error: TaskError,

	/// What to do with the task's siblings, [`CancelPolicy::CancelAll`] by default
	pub cancel_policy: CancelPolicy,
}

impl PropagateError {
	/// Creates a propagating result for `error`.
	#[must_use]
	pub fn new(error: TaskError) -> Self {
		Self {
			error,
			cancel_policy: CancelPolicy::CancelAll,
		}
	}

	/// Replaces the cancel policy.
	#[must_use]
	pub fn with_cancel_policy(mut self, cancel_policy: CancelPolicy) -> Self {
		self.cancel_policy = cancel_policy;
		self
	}

	/// Returns an exception handler that re-raises any raised error from the
	/// run and applies `cancel_policy` to the failed task's siblings.
	#[must_use]
	pub fn handler(cancel_policy: CancelPolicy) -> ExceptionHandler {
		ExceptionHandler::from_fn(move |error| {
			Self::new(error.clone())
				.with_cancel_policy(cancel_policy)
				.into()
		})
	}
}

/// The policy-bearing outcome of a failed task: what to record for the task
/// itself and what to do with its siblings.
///
/// A post-error result is produced either by resolving the task's
/// [`ExceptionHandler`] or by the task raising [`Abort`] explicitly.
#[derive(Clone, Debug)]
pub enum PostErrorResult {
	/// Substitute an outcome and keep the run alive
	Continue(ContinueResult),

	/// Record the error and re-raise it once the run winds down
	Propagate(PropagateError),
}

impl PostErrorResult {
	/// The cancel policy to apply to the failed task's siblings.
	#[must_use]
	pub fn cancel_policy(&self) -> CancelPolicy {
		match self {
			Self::Continue(c) => c.cancel_policy,
			Self::Propagate(p) => p.cancel_policy,
		}
	}

	/// Unwraps the outcome to record for the failed task.
	pub(crate) fn into_outcome(self) -> Outcome {
		match self {
			Self::Continue(c) => c.value,
			Self::Propagate(p) => Outcome::Failed(p.error),
		}
	}
}

impl From<ContinueResult> for PostErrorResult {
	fn from(value: ContinueResult) -> Self {
		Self::Continue(value)
	}
}

impl From<PropagateError> for PostErrorResult {
	fn from(value: PropagateError) -> Self {
		Self::Propagate(value)
	}
}

/// An error a task can return to hand the scheduler an explicit
/// [`PostErrorResult`], bypassing the task's exception handler entirely.
#[derive(thiserror::Error, Debug)]
#[error("task aborted with an explicit post-error result")]
pub struct Abort(pub PostErrorResult);

impl Abort {
	/// Wraps a post-error result.
	#[must_use]
	pub fn new(result: impl Into<PostErrorResult>) -> Self {
		Self(result.into())
	}
}
