/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the dynamically typed values passed between tasks:
//! [`TaskValue`], [`TaskError`], and the per-task [`Outcome`]

use std::{
	any::Any,
	error::Error as StdError,
	fmt::{self, Debug, Display},
	sync::Arc,
};

use crate::error::BoxError;

/// A dynamically typed value produced by a task.
///
/// Tasks in a single run may return values of different types,
/// so results are passed around behind a cheaply clonable type-erased handle.
/// Use [`TaskValue::downcast_ref`] to get the concrete value back out.
#[derive(Clone)]
pub struct TaskValue(Arc<dyn Any + Send + Sync>);

impl TaskValue {
	/// Wraps a concrete value.
	#[must_use]
	pub fn new<T>(value: T) -> Self
	where
		T: Any + Send + Sync,
	{
		Self(Arc::new(value))
	}

	/// The value returned by tasks that have nothing to report, i.e. `()`.
	#[must_use]
	pub fn unit() -> Self {
		Self::new(())
	}

	/// Returns a reference to the contained value if it is a `T`.
	#[must_use]
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref()
	}

	/// Checks if the contained value is a `T`.
	#[must_use]
	pub fn is<T: Any>(&self) -> bool {
		self.0.is::<T>()
	}
}

impl Debug for TaskValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TaskValue").finish_non_exhaustive()
	}
}

/// A shared handle over an error raised by a task.
///
/// Errors outlive the task that raised them: they are recorded as outcomes,
/// fed to dependent tasks, and possibly returned from the whole run,
/// hence the shared ownership.
#[derive(Clone)]
pub struct TaskError(Arc<dyn StdError + Send + Sync>);

impl TaskError {
	/// Wraps a concrete error.
	#[must_use]
	pub fn new<E>(error: E) -> Self
	where
		E: StdError + Send + Sync + 'static,
	{
		Self(Arc::new(error))
	}

	/// Returns a reference to the contained error if it is an `E`.
	#[must_use]
	pub fn downcast_ref<E>(&self) -> Option<&E>
	where
		E: StdError + 'static,
	{
		self.0.downcast_ref()
	}

	/// Checks if this error is a delivered cancellation (see [`Cancelled`](`crate::cancellation::Cancelled`)).
	///
	/// Cancellations are never silently swallowed by exception handlers
	/// that don't name them explicitly.
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.downcast_ref::<crate::cancellation::Cancelled>()
			.is_some()
	}
}

impl From<BoxError> for TaskError {
	fn from(error: BoxError) -> Self {
		Self(Arc::from(error))
	}
}

impl Display for TaskError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl Debug for TaskError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("TaskError").field(&self.0).finish()
	}
}

impl StdError for TaskError {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.0.source()
	}
}

/// The recorded outcome of a completed task.
///
/// This is what dependents receive as their arguments and what the
/// [result of a run](`crate::dag::DagResult`) maps templates to.
/// An outcome is a [`TaskError`] when the task failed and its exception handler
/// recorded the error as the task's result instead of a substitute value.
#[derive(Clone, Debug)]
pub enum Outcome {
	/// The task produced a value, either by returning it or via a substitute
	/// from its exception handler.
	Returned(TaskValue),

	/// The task failed and the error itself was recorded as its outcome.
	Failed(TaskError),
}

impl Outcome {
	/// Returns the contained value, if any.
	#[must_use]
	pub fn value(&self) -> Option<&TaskValue> {
		match self {
			Self::Returned(value) => Some(value),
			Self::Failed(_) => None,
		}
	}

	/// Returns the contained error, if any.
	#[must_use]
	pub fn error(&self) -> Option<&TaskError> {
		match self {
			Self::Returned(_) => None,
			Self::Failed(error) => Some(error),
		}
	}

	/// Returns a reference to the contained value if the task returned a `T`.
	#[must_use]
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value()?.downcast_ref()
	}
}

impl From<TaskValue> for Outcome {
	fn from(value: TaskValue) -> Self {
		Self::Returned(value)
	}
}

impl From<TaskError> for Outcome {
	fn from(error: TaskError) -> Self {
		Self::Failed(error)
	}
}
