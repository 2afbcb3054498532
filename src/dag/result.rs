/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`DagResult`], the outcome mapping of a finished run

use std::collections::{HashMap, HashSet};

use crate::{
	error::{DiscardedTask, LookupError},
	task::TaskTemplate,
	value::Outcome,
};

/// A read-only mapping from launched templates to their outcomes.
///
/// Only templates that were actually launched appear in the mapping, whether
/// they completed normally, failed, or were cancelled mid-flight. Templates a
/// cancel policy discarded before launch are exposed separately via
/// [`DagResult::discarded`], and looking them up reports the distinction
/// (see [`LookupError`]).
///
/// Iteration yields templates in launch order.
#[derive(Debug)]
pub struct DagResult {
	dag_id: u64,
	entries: Vec<(TaskTemplate, Outcome)>,
	by_slot: HashMap<usize, usize>,
	discarded: HashSet<TaskTemplate>,
}

impl DagResult {
	pub(crate) fn new(
		dag_id: u64,
		entries: Vec<(TaskTemplate, Outcome)>,
		discarded: HashSet<TaskTemplate>,
	) -> Self {
		let by_slot = entries
			.iter()
			.enumerate()
			.map(|(i, (template, _))| (template.slot, i))
			.collect();

		Self {
			dag_id,
			entries,
			by_slot,
			discarded,
		}
	}

	/// The outcome of `template`.
	///
	/// # Errors
	/// * [`LookupError::Discarded`] if the template was discarded and never launched
	/// * [`LookupError::NotFound`] if the template is not part of this run
	pub fn get(&self, template: &TaskTemplate) -> Result<&Outcome, LookupError> {
		if template.dag_id == self.dag_id {
			if let Some(&i) = self.by_slot.get(&template.slot) {
				let (_, outcome) = &self.entries[i];
				return Ok(outcome);
			}

			if self.discarded.contains(template) {
				return Err(DiscardedTask(template.name.clone()).into());
			}
		}

		Err(LookupError::NotFound(template.name.clone()))
	}

	/// Checks if `template` was launched in this run.
	#[must_use]
	pub fn contains(&self, template: &TaskTemplate) -> bool {
		template.dag_id == self.dag_id && self.by_slot.contains_key(&template.slot)
	}

	/// The launched templates, in launch order.
	pub fn keys(&self) -> impl Iterator<Item = &TaskTemplate> {
		self.entries.iter().map(|(template, _)| template)
	}

	/// The launched templates and their outcomes, in launch order.
	pub fn iter(&self) -> impl Iterator<Item = (&TaskTemplate, &Outcome)> {
		self.entries.iter().map(|(template, outcome)| (template, outcome))
	}

	/// The number of launched templates.
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Checks if no template was launched at all.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// The outcomes re-keyed by template name.
	#[must_use]
	pub fn by_name(&self) -> HashMap<&str, &Outcome> {
		self.entries
			.iter()
			.map(|(template, outcome)| (template.name(), outcome))
			.collect()
	}

	/// The templates that were discarded and never launched in this run.
	#[must_use]
	pub fn discarded(&self) -> &HashSet<TaskTemplate> {
		&self.discarded
	}
}

impl<'a> IntoIterator for &'a DagResult {
	type Item = (&'a TaskTemplate, &'a Outcome);
	type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

	fn into_iter(self) -> Self::IntoIter {
		Box::new(self.iter())
	}
}
