/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`Dag`], the registry of task templates and the entry
//! point of a run

pub mod result;
pub mod run_args;
pub mod siblings;

mod scheduler;

pub use self::{
	result::DagResult,
	run_args::RunArgs,
	siblings::{SiblingState, Siblings},
};

use std::{
	collections::{HashMap, HashSet},
	fmt::{self, Debug},
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
};

use crate::{
	error::{RegisterError, RunError},
	handler::ExceptionHandler,
	task::{Task, TaskCallback, TaskTemplate},
};

/// Registry ids are process-unique so that handles of different dags never mix.
static NEXT_DAG_ID: AtomicU64 = AtomicU64::new(0);

/// The registered form of one task.
pub(crate) struct TemplateData {
	pub(crate) name: Arc<str>,
	pub(crate) callback: TaskCallback,
	/// slots of the templates that must complete before this one launches
	pub(crate) dependencies: HashSet<usize>,
	pub(crate) exception_handler: ExceptionHandler,
}

/// A static collection of named task templates and the dependencies between
/// them.
///
/// Register tasks with [`Dag::register`], then execute the whole graph with
/// [`Dag::run`]: every task runs at most once, in an order respecting its
/// dependencies, with maximum concurrency the dependencies allow.
pub struct Dag {
	pub(crate) id: u64,
	pub(crate) templates: Vec<TemplateData>,
	pub(crate) by_name: HashMap<Arc<str>, usize>,
	/// parameter names not (yet) backed by a template, mapped to the templates
	/// that want them; drained if a template of that name appears later
	kwarg_users: HashMap<Arc<str>, Vec<usize>>,
	default_exception_handler: ExceptionHandler,
}

impl Dag {
	/// Creates a dag whose default exception handler propagates errors and
	/// cancels everything (see [`ExceptionHandler::propagate`]).
	#[must_use]
	pub fn new() -> Self {
		Self::with_default_exception_handler(ExceptionHandler::propagate())
	}

	/// Creates a dag with the given default exception handler for new
	/// templates.
	#[must_use]
	pub fn with_default_exception_handler(handler: impl Into<ExceptionHandler>) -> Self {
		Self {
			id: NEXT_DAG_ID.fetch_add(1, Ordering::Relaxed),
			templates: Vec::new(),
			by_name: HashMap::new(),
			kwarg_users: HashMap::new(),
			default_exception_handler: handler.into(),
		}
	}

	/// Replaces the default exception handler.
	///
	/// Only templates registered from now on are affected: a template snapshots
	/// its handler at registration.
	pub fn set_default_exception_handler(&mut self, handler: impl Into<ExceptionHandler>) {
		self.default_exception_handler = handler.into();
	}

	/// Registers a task and wires its dependencies.
	///
	/// Each parameter name matching an already registered template becomes a
	/// dependency on that template. Every other name is expected as a caller
	/// keyword — unless a template of that name is registered later, which
	/// rewrites the parameter into a dependency. A template can therefore
	/// depend on templates registered both before and after it, and the final
	/// graph does not depend on registration order.
	///
	/// # Errors
	/// [`RegisterError::DuplicateName`] if a template with this name already
	/// exists.
	pub fn register(&mut self, task: Task) -> Result<TaskTemplate, RegisterError> {
		if self.by_name.contains_key(&task.name) {
			return Err(RegisterError::DuplicateName(task.name));
		}

		let slot = self.templates.len();

		// split parameters into dependencies on existing templates and free keywords
		let mut dependencies = HashSet::new();
		let mut keywords = Vec::new();
		let mut seen = HashSet::new();
		for param in &task.params {
			if !seen.insert(Arc::clone(param)) {
				continue;
			}

			match self.by_name.get(param) {
				Some(&dependency) => {
					dependencies.insert(dependency);
				}
				None => keywords.push(Arc::clone(param)),
			}
		}

		self.templates.push(TemplateData {
			name: Arc::clone(&task.name),
			callback: task.callback,
			dependencies,
			exception_handler: task
				.exception_handler
				.unwrap_or_else(|| self.default_exception_handler.clone()),
		});
		self.by_name.insert(Arc::clone(&task.name), slot);

		for keyword in keywords {
			self.kwarg_users.entry(keyword).or_default().push(slot);
		}

		// templates that used this name as a keyword now depend on the new template instead
		if let Some(users) = self.kwarg_users.remove(&task.name) {
			for user in users {
				self.templates[user].dependencies.insert(slot);
			}
		}

		Ok(self.handle(slot))
	}

	/// The handle of the template registered under `name`, if any.
	#[must_use]
	pub fn template(&self, name: &str) -> Option<TaskTemplate> {
		self.by_name.get(name).map(|&slot| self.handle(slot))
	}

	/// The number of registered templates.
	#[must_use]
	pub fn len(&self) -> usize {
		self.templates.len()
	}

	/// Checks if no template has been registered yet.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.templates.is_empty()
	}

	/// Runs every registered task at most once, forwarding `args` to each of
	/// them, and returns the mapping from templates to their outcomes.
	///
	/// Dropping the returned future drops every in-flight task with it, which
	/// is how external cancellation (e.g. a timeout around the run) is
	/// delivered.
	///
	/// # Errors
	/// * [`RunError::ArgumentCollision`] if a keyword of `args` has the name of a registered template
	/// * [`RunError::Cycle`] if the dependency graph contains a cycle
	/// * [`RunError::IllegalReturn`] if a task returns a post-error result as its value
	/// * [`RunError::Propagated`] with the first error a task's exception handler decided to re-raise
	#[tracing::instrument(skip_all, fields(tasks = self.templates.len()))]
	pub async fn run(&self, args: RunArgs) -> Result<DagResult, RunError> {
		scheduler::run(self, args).await
	}

	pub(crate) fn handle(&self, slot: usize) -> TaskTemplate {
		TaskTemplate {
			dag_id: self.id,
			slot,
			name: Arc::clone(&self.templates[slot].name),
		}
	}
}

impl Default for Dag {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for Dag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dag")
			.field(
				"templates",
				&self.templates.iter().map(|t| &t.name).collect::<Vec<_>>(),
			)
			.finish_non_exhaustive()
	}
}
