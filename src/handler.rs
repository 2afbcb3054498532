/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the exception-policy machinery:
//! - The [`ExceptionHandler`] resolved against every error a task raises
//! - [`PostErrorResult`] with its [`ContinueResult`] and [`PropagateError`] variants
//! - [`HandlerMap`] for per-error-class dispatch
//! - [`Abort`] for raising an explicit post-error result from a task body

pub mod map;
pub mod post_error;

pub use self::{
	map::HandlerMap,
	post_error::{Abort, CancelPolicy, ContinueResult, PostErrorResult, PropagateError},
};

use std::{
	fmt::{self, Debug},
	sync::Arc,
};

use crate::value::TaskError;

/// A boxed function producing the next handler to resolve an error against.
pub type HandlerFn = Arc<dyn Fn(&TaskError) -> ExceptionHandler + Send + Sync>;

/// Decides what happens after a task raises an error.
///
/// A handler is resolved recursively until it bottoms out at a
/// [`PostErrorResult`]:
/// - [`ExceptionHandler::Result`] is terminal;
/// - [`ExceptionHandler::Fn`] maps the raised error to another handler;
/// - [`ExceptionHandler::Match`] picks the first arm whose error class the
///   raised error is an instance of, or propagate-with-cancel-all when no arm
///   matches.
///
/// A resolved [`ContinueResult`] is upgraded to a [`PropagateError`] when the
/// raised error is a cancellation that no [`HandlerMap`] arm named explicitly:
/// handlers never silently swallow cancellations.
#[derive(Clone)]
pub enum ExceptionHandler {
	/// Terminal: this is the post-error result
	Result(PostErrorResult),

	/// Dispatch on the class of the raised error
	Match(HandlerMap),

	/// Compute the next handler from the raised error
	Fn(HandlerFn),
}

impl ExceptionHandler {
	/// Wraps a handler function.
	#[must_use]
	pub fn from_fn(f: impl Fn(&TaskError) -> ExceptionHandler + Send + Sync + 'static) -> Self {
		Self::Fn(Arc::new(f))
	}

	/// The handler used when nothing else is configured:
	/// re-raise the error and cancel everything.
	#[must_use]
	pub fn propagate() -> Self {
		PropagateError::handler(CancelPolicy::CancelAll)
	}

	/// Resolves this handler against a raised error.
	pub(crate) fn resolve(&self, error: &TaskError) -> PostErrorResult {
		let mut named_cancellation = false;
		let mut handler = self.clone();

		let result = loop {
			handler = match handler {
				Self::Result(result) => break result,
				Self::Fn(f) => f(error),
				Self::Match(map) => match map.lookup(error) {
					Some((next, names_cancellation)) => {
						named_cancellation |= names_cancellation;
						next.clone()
					}
					None => break PropagateError::new(error.clone()).into(),
				},
			};
		};

		// cancellations pass through unless an arm named their class
		if error.is_cancelled()
			&& !named_cancellation
			&& matches!(result, PostErrorResult::Continue(_))
		{
			return PropagateError::new(error.clone()).into();
		}

		result
	}
}

impl Default for ExceptionHandler {
	fn default() -> Self {
		Self::propagate()
	}
}

impl Debug for ExceptionHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Result(result) => f.debug_tuple("Result").field(result).finish(),
			Self::Match(map) => f.debug_tuple("Match").field(map).finish(),
			Self::Fn(_) => f.write_str("Fn(..)"),
		}
	}
}

impl From<PostErrorResult> for ExceptionHandler {
	fn from(result: PostErrorResult) -> Self {
		Self::Result(result)
	}
}

impl From<ContinueResult> for ExceptionHandler {
	fn from(result: ContinueResult) -> Self {
		Self::Result(result.into())
	}
}

impl From<PropagateError> for ExceptionHandler {
	fn from(result: PropagateError) -> Self {
		Self::Result(result.into())
	}
}

impl From<HandlerMap> for ExceptionHandler {
	fn from(map: HandlerMap) -> Self {
		Self::Match(map)
	}
}
