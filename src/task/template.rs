/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`TaskTemplate`] handle

use std::{
	fmt::{self, Display},
	hash::{Hash, Hasher},
	sync::Arc,
};

/// A handle identifying one registered task template.
///
/// Returned by [`Dag::register`](`crate::dag::Dag::register`) and used to look
/// tasks up in a [`DagResult`](`crate::dag::DagResult`) or to query and cancel
/// siblings mid-run via [`Siblings`](`crate::dag::Siblings`).
///
/// Identity is per [`Dag`](`crate::dag::Dag`): handles of different dags never
/// compare equal, even if the template names match.
#[derive(Clone, Debug)]
pub struct TaskTemplate {
	pub(crate) dag_id: u64,
	pub(crate) slot: usize,
	pub(crate) name: Arc<str>,
}

impl TaskTemplate {
	/// The name the template was registered under.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl PartialEq for TaskTemplate {
	fn eq(&self, other: &Self) -> bool {
		self.dag_id == other.dag_id && self.slot == other.slot
	}
}

impl Eq for TaskTemplate {}

impl Hash for TaskTemplate {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.dag_id.hash(state);
		self.slot.hash(state);
	}
}

impl Display for TaskTemplate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}
