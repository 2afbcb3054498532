/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains every error type the scheduler can produce

use std::sync::Arc;

use itertools::Itertools;

use crate::value::TaskError;

/// A boxed opaque error, the error type task callbacks are allowed to return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by [`Dag::register`](`crate::dag::Dag::register`).
#[derive(thiserror::Error, Debug)]
pub enum RegisterError {
	/// A template with this name has already been registered
	#[error("duplicate task name {0:?}")]
	DuplicateName(Arc<str>),
}

/// Error returned by [`Dag::run`](`crate::dag::Dag::run`).
#[derive(thiserror::Error, Debug)]
pub enum RunError {
	/// A caller keyword argument has the same name as a registered template.
	/// These keys are reserved for plumbing dependency values.
	#[error("keyword arguments collide with task names: {}", .0.iter().join(", "))]
	ArgumentCollision(Vec<Arc<str>>),

	/// The dependency graph contains a cycle
	#[error(transparent)]
	Cycle(#[from] CycleError),

	/// A task returned a post-error result as its value instead of raising it
	/// via [`Abort`](`crate::handler::Abort`)
	#[error("task {0:?} returned a post-error result, raise it via Abort instead")]
	IllegalReturn(Arc<str>),

	/// A task failed and its exception handler decided to propagate the error.
	///
	/// This is the first such error of the run; later ones are preserved only
	/// in the outcomes of their own tasks.
	#[error("task {name:?} failed")]
	Propagated {
		/// Name of the failed template
		name: Arc<str>,

		/// The propagated error
		#[source]
		error: TaskError,
	},
}

impl RunError {
	/// Returns the propagated task error, if this is what the run failed with.
	#[must_use]
	pub fn propagated(&self) -> Option<&TaskError> {
		match self {
			Self::Propagated { error, .. } => Some(error),
			_ => None,
		}
	}
}

/// A dependency cycle, reported on the first run since only then is the graph
/// fully known.
#[derive(thiserror::Error, Debug)]
#[error("cyclic dependency between tasks: {}", .stuck.iter().join(", "))]
pub struct CycleError {
	/// Names of the templates that can never be launched, i.e. those
	/// participating in or downstream of a cycle
	pub stuck: Vec<Arc<str>>,
}

/// An attempt was made to access a template that was discarded and thus never
/// launched in this run.
#[derive(thiserror::Error, Debug)]
#[error("task {0:?} was discarded and never launched in this run")]
pub struct DiscardedTask(pub Arc<str>);

/// Error returned when looking a template up in a [`DagResult`](`crate::dag::DagResult`).
#[derive(thiserror::Error, Debug)]
pub enum LookupError {
	/// The template was discarded and never launched
	#[error(transparent)]
	Discarded(#[from] DiscardedTask),

	/// The template is not part of this run at all
	#[error("task {0:?} is not part of this run")]
	NotFound(Arc<str>),
}

/// Error returned by the typed accessors of [`TaskInput`](`crate::task::TaskInput`).
#[derive(thiserror::Error, Debug)]
pub enum InputError {
	/// No argument with this name was provided by the caller or by a dependency
	#[error("missing argument {0:?}")]
	Missing(Arc<str>),

	/// The argument exists but contains a value of a different type
	#[error("argument {name:?} is not a {expected}")]
	WrongType {
		/// Name of the argument
		name: Arc<str>,

		/// The requested type
		expected: &'static str,
	},

	/// The argument names a dependency whose recorded outcome is an error
	#[error("dependency {name:?} failed")]
	FailedDependency {
		/// Name of the failed dependency
		name: Arc<str>,

		/// The error the dependency failed with
		#[source]
		error: TaskError,
	},
}
