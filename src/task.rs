/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`Task`], the declaration registered into a
//! [`Dag`](`crate::dag::Dag`), and its collaborators [`TaskTemplate`] and
//! [`TaskInput`]

pub mod input;
pub mod template;

pub use self::{input::TaskInput, template::TaskTemplate};

use std::{
	fmt::{self, Debug},
	sync::Arc,
};

use futures::{future::BoxFuture, FutureExt};

use crate::{error::BoxError, handler::ExceptionHandler, value::TaskValue};

/// The stored form of a task callback.
pub(crate) type TaskCallback =
	Arc<dyn Fn(TaskInput) -> BoxFuture<'static, Result<TaskValue, BoxError>> + Send + Sync>;

/// The declaration of a single asynchronous task: its name, the names of its
/// formal parameters, the callback, and an optional per-task exception handler.
///
/// Parameter names drive dependency inference at registration: a parameter
/// naming an already (or later) registered template becomes a dependency on
/// that template, any other parameter is expected as a caller keyword.
pub struct Task {
	pub(crate) name: Arc<str>,
	pub(crate) params: Vec<Arc<str>>,
	pub(crate) callback: TaskCallback,
	pub(crate) exception_handler: Option<ExceptionHandler>,
}

impl Task {
	/// Creates a task declaration.
	///
	/// The callback receives the assembled [`TaskInput`] and either returns a
	/// [`TaskValue`] or fails with any boxable error, including
	/// [`Abort`](`crate::handler::Abort`) to hand the scheduler an explicit
	/// post-error result.
	#[must_use]
	pub fn new<F, Fut>(name: impl Into<Arc<str>>, params: &[&str], callback: F) -> Self
	where
		F: Fn(TaskInput) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<TaskValue, BoxError>> + Send + 'static,
	{
		Self {
			name: name.into(),
			params: params.iter().copied().map(Into::into).collect(),
			callback: Arc::new(move |input| callback(input).boxed()),
			exception_handler: None,
		}
	}

	/// Overrides the owning dag's default exception handler for this task.
	#[must_use]
	pub fn with_exception_handler(mut self, handler: impl Into<ExceptionHandler>) -> Self {
		self.exception_handler = Some(handler.into());
		self
	}
}

impl Debug for Task {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task")
			.field("name", &self.name)
			.field("params", &self.params)
			.field("exception_handler", &self.exception_handler)
			.finish_non_exhaustive()
	}
}
