/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the per-task cancellation plumbing and the [`Cancelled`] error type

use std::sync::Arc;

use tokio::sync::watch;

/// The error delivered to a task when it is cancelled, either by a cancel policy
/// or by a sibling task.
///
/// `Cancelled` is the system-class error of the scheduler: an exception handler
/// only gets to replace it with a substitute outcome if it names the class
/// explicitly (see [`HandlerMap::on_cancelled`](`crate::handler::HandlerMap::on_cancelled`)).
#[derive(thiserror::Error, Clone, Debug)]
#[error("task was cancelled{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
pub struct Cancelled {
	reason: Option<Arc<str>>,
}

impl Cancelled {
	/// Creates a cancellation without a reason.
	#[must_use]
	pub fn new() -> Self {
		Self { reason: None }
	}

	/// Creates a cancellation carrying the reason it was issued.
	#[must_use]
	pub fn with_reason(reason: impl Into<Arc<str>>) -> Self {
		Self {
			reason: Some(reason.into()),
		}
	}

	/// The reason this cancellation was issued, if one was recorded.
	#[must_use]
	pub fn reason(&self) -> Option<&str> {
		self.reason.as_deref()
	}
}

impl Default for Cancelled {
	fn default() -> Self {
		Self::new()
	}
}

/// The sending half of a task's cancellation channel, kept by the scheduler.
#[derive(Debug)]
pub(crate) struct CancelHandle(watch::Sender<Option<Cancelled>>);

impl CancelHandle {
	/// Delivers cancellation to the owning task.
	///
	/// A completed task has dropped its receiver already, which makes this a no-op.
	pub(crate) fn fire(&self, cause: Cancelled) {
		_ = self.0.send(Some(cause));
	}
}

/// The receiving half of a task's cancellation channel, observed by the
/// safe-call wrapper at the task's next suspension point.
#[derive(Debug)]
pub(crate) struct CancelSignal(watch::Receiver<Option<Cancelled>>);

impl CancelSignal {
	pub(crate) fn new() -> (Self, CancelHandle) {
		let (tx, rx) = watch::channel(None);
		(Self(rx), CancelHandle(tx))
	}

	/// Blocks until cancellation is delivered and returns its cause.
	pub(crate) async fn fired(&mut self) -> Cancelled {
		loop {
			if let Some(cause) = self.0.borrow_and_update().as_ref() {
				return cause.clone();
			}

			if self.0.changed().await.is_err() {
				// assume closed channel = cancelled
				return Cancelled::new();
			}
		}
	}
}
