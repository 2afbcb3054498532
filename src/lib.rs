/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! A static task-graph scheduler for asynchronous workloads.
//!
//! Declare a fixed set of named async tasks with [`Dag::register`], each
//! optionally consuming the results of other tasks by naming them as
//! parameters. A single [`Dag::run`] then executes every task at most once, in
//! a dependency-respecting order and with maximum concurrency the
//! dependencies allow, and returns a [`DagResult`] mapping every launched
//! template to its outcome.
//!
//! What happens when a task fails is decided per template by an
//! [`ExceptionHandler`] resolving to a [`PostErrorResult`]: record a
//! substitute outcome and carry on ([`ContinueResult`]), or record the error
//! and re-raise it from the run ([`PropagateError`]) — in both cases
//! optionally cancelling or discarding other tasks via a [`CancelPolicy`].
//! A running task can also observe and cancel its siblings through the
//! ambient [`Siblings`] handle.
//!
//! # Example
//!
//! ```
//! use dagrun::{Dag, RunArgs, Task, TaskValue};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dag = Dag::new();
//!
//! dag.register(Task::new("a", &["x"], |input| async move {
//!     let x = *input.require::<i64>("x")?;
//!     Ok(TaskValue::new(x))
//! }))?;
//!
//! let b = dag.register(Task::new("b", &["a", "x"], |input| async move {
//!     let a = *input.require::<i64>("a")?;
//!     Ok(TaskValue::new(a + 1))
//! }))?;
//!
//! let result = dag.run(RunArgs::new().kwarg("x", 2_i64)).await?;
//! assert_eq!(result.get(&b)?.downcast_ref::<i64>(), Some(&3));
//! # Ok(())
//! # }
//! ```

pub mod cancellation;
pub mod dag;
pub mod error;
pub mod handler;
pub mod task;
pub mod value;

pub use self::{
	cancellation::Cancelled,
	dag::{Dag, DagResult, RunArgs, SiblingState, Siblings},
	error::{
		BoxError, CycleError, DiscardedTask, InputError, LookupError, RegisterError, RunError,
	},
	handler::{
		Abort, CancelPolicy, ContinueResult, ExceptionHandler, HandlerMap, PostErrorResult,
		PropagateError,
	},
	task::{Task, TaskInput, TaskTemplate},
	value::{Outcome, TaskError, TaskValue},
};
