/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`TaskInput`], the assembled arguments of one task call

use std::{
	any::{type_name, Any},
	collections::HashMap,
	sync::Arc,
};

use crate::{
	error::InputError,
	value::{Outcome, TaskError, TaskValue},
};

/// The arguments handed to a task callback.
///
/// Named arguments come from two places and share one namespace:
/// the keyword values the caller passed to the run, and, under each
/// dependency's name, the [`Outcome`] that dependency completed with.
/// The two can't collide because caller keywords matching a template name are
/// rejected before the run starts.
#[derive(Clone, Debug)]
pub struct TaskInput {
	positional: Arc<[TaskValue]>,
	args: HashMap<Arc<str>, Outcome>,
}

impl TaskInput {
	pub(crate) fn new(positional: Arc<[TaskValue]>, args: HashMap<Arc<str>, Outcome>) -> Self {
		Self { positional, args }
	}

	/// The positional values the caller passed to the run.
	#[must_use]
	pub fn positional(&self) -> &[TaskValue] {
		&self.positional
	}

	/// The raw outcome stored under `name`, if any.
	///
	/// Caller keywords always appear as [`Outcome::Returned`]; a dependency's
	/// outcome is whatever was recorded for it, possibly an error.
	#[must_use]
	pub fn outcome(&self, name: &str) -> Option<&Outcome> {
		self.args.get(name)
	}

	/// The value stored under `name`, if present, successful, and a `T`.
	#[must_use]
	pub fn value<T: Any>(&self, name: &str) -> Option<&T> {
		self.outcome(name)?.downcast_ref()
	}

	/// The error a dependency named `name` failed with, if any.
	#[must_use]
	pub fn error(&self, name: &str) -> Option<&TaskError> {
		self.outcome(name)?.error()
	}

	/// Typed access to the argument named `name`.
	///
	/// # Errors
	/// * [`InputError::Missing`] if there is no such argument
	/// * [`InputError::FailedDependency`] if the argument is the outcome of a failed dependency
	/// * [`InputError::WrongType`] if the stored value is not a `T`
	pub fn require<T: Any>(&self, name: &str) -> Result<&T, InputError> {
		match self.outcome(name) {
			None => Err(InputError::Missing(name.into())),
			Some(Outcome::Failed(error)) => Err(InputError::FailedDependency {
				name: name.into(),
				error: error.clone(),
			}),
			Some(Outcome::Returned(value)) => {
				value.downcast_ref().ok_or_else(|| InputError::WrongType {
					name: name.into(),
					expected: type_name::<T>(),
				})
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{collections::HashMap, sync::Arc};

	use assert_matches::assert_matches;

	use super::TaskInput;
	use crate::{
		error::InputError,
		value::{Outcome, TaskError, TaskValue},
	};

	#[derive(thiserror::Error, Debug)]
	#[error("boom")]
	struct Boom;

	fn input() -> TaskInput {
		let args = HashMap::from([
			(Arc::from("x"), Outcome::Returned(TaskValue::new(2_i64))),
			(Arc::from("failed"), Outcome::Failed(TaskError::new(Boom))),
		]);

		TaskInput::new(Arc::from([TaskValue::new("first")]), args)
	}

	#[test]
	fn typed_access() {
		let input = input();

		assert_eq!(input.require::<i64>("x").ok(), Some(&2));
		assert_eq!(input.value::<i64>("x"), Some(&2));
		assert_eq!(input.positional().len(), 1);
	}

	#[test]
	fn access_errors() {
		let input = input();

		assert_matches!(input.require::<i64>("y"), Err(InputError::Missing(_)));
		assert_matches!(input.require::<String>("x"), Err(InputError::WrongType { .. }));
		assert_matches!(
			input.require::<i64>("failed"),
			Err(InputError::FailedDependency { .. })
		);
		assert!(input.error("failed").is_some());
	}
}
