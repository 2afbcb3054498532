/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`HandlerMap`], the error-class dispatch arm of
//! [`ExceptionHandler`]

use std::{
	any::{self, TypeId},
	error::Error as StdError,
	fmt::{self, Debug},
	sync::Arc,
};

use super::ExceptionHandler;
use crate::{cancellation::Cancelled, value::TaskError};

/// An ordered list of error-class arms, each mapping to a nested
/// [`ExceptionHandler`].
///
/// The first arm whose class the raised error is an instance of wins.
/// An error matching no arm resolves to propagate-with-cancel-all.
#[derive(Clone, Default)]
pub struct HandlerMap {
	arms: Vec<Arm>,
}

#[derive(Clone)]
struct Arm {
	matches: Arc<dyn Fn(&TaskError) -> bool + Send + Sync>,
	/// whether this arm names the cancellation class itself
	names_cancellation: bool,
	class: &'static str,
	handler: ExceptionHandler,
}

impl HandlerMap {
	/// Creates an empty map.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an arm matching errors downcastable to `E`.
	#[must_use]
	pub fn on<E>(mut self, handler: impl Into<ExceptionHandler>) -> Self
	where
		E: StdError + Send + Sync + 'static,
	{
		self.arms.push(Arm {
			matches: Arc::new(|error: &TaskError| error.downcast_ref::<E>().is_some()),
			names_cancellation: TypeId::of::<E>() == TypeId::of::<Cancelled>(),
			class: any::type_name::<E>(),
			handler: handler.into(),
		});
		self
	}

	/// Appends an arm matching delivered cancellations.
	///
	/// Naming the cancellation class explicitly is the only way a handler is
	/// allowed to turn a cancellation into a substitute outcome.
	#[must_use]
	pub fn on_cancelled(self, handler: impl Into<ExceptionHandler>) -> Self {
		self.on::<Cancelled>(handler)
	}

	/// Finds the first arm matching `error`.
	///
	/// The second field of the return value reports whether the winning arm
	/// names the cancellation class.
	pub(crate) fn lookup(&self, error: &TaskError) -> Option<(&ExceptionHandler, bool)> {
		self.arms
			.iter()
			.find(|arm| (arm.matches)(error))
			.map(|arm| (&arm.handler, arm.names_cancellation))
	}
}

impl Debug for HandlerMap {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(self.arms.iter().map(|arm| arm.class))
			.finish()
	}
}
