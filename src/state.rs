//! The working set threaded through every operation.
//!
//! Each operation borrows the current [`AppState`] and returns a new one;
//! nothing is shared or mutated in place. The candidate pool is derived data
//! and is rebuilt whenever selection, labels, or the mapping change.

use std::fmt::Write as _;

use itertools::Itertools;
use log::{debug, info};

use crate::{
    collection::KeptCollection,
    data::ID_FIELD,
    error::StateError,
    filter::{FilterSpec, filter_pool},
    mapping::FieldMapping,
    normalize::Group,
    sampler::{RandomSource, RollResult, roll},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub(crate) groups: Vec<Group>,
    pub(crate) selected: Vec<String>,
    pub(crate) mapping: FieldMapping,
    pub(crate) kept: KeptCollection,
    pub(crate) filters: Vec<FilterSpec>,
    pub(crate) pool: Vec<RollResult>,
}

impl AppState {
    /// Fresh state for newly loaded groups: nothing selected, default mapping.
    pub fn from_groups(groups: Vec<Group>) -> Self {
        info!("Loaded {} group(s)", groups.len());
        Self {
            groups,
            ..Self::default()
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.iter().any(|s| s == name)
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn kept(&self) -> &KeptCollection {
        &self.kept
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    /// Mapped records of every selected group, in group then row order.
    pub fn pool(&self) -> &[RollResult] {
        &self.pool
    }

    pub fn select(&self, name: &str, selected: bool) -> Result<Self, StateError> {
        if self.group(name).is_none() {
            return Err(StateError::UnknownGroup(name.to_string()));
        }
        let mut next = self.clone();
        next.selected.retain(|s| s != name);
        if selected {
            next.selected.push(name.to_string());
        }
        Ok(next.rebuild_pool())
    }

    /// Selects every group, or clears the selection when all are selected.
    pub fn toggle_all(&self) -> Self {
        let mut next = self.clone();
        if self.selected.len() == self.groups.len() {
            next.selected.clear();
        } else {
            next.selected = self.groups.iter().map(|g| g.name.clone()).collect();
        }
        next.rebuild_pool()
    }

    /// Sets a display label; an empty label restores the derived name.
    pub fn rename_group(&self, name: &str, label: &str) -> Result<Self, StateError> {
        let mut next = self.clone();
        let group = next
            .groups
            .iter_mut()
            .find(|group| group.name == name)
            .ok_or_else(|| StateError::UnknownGroup(name.to_string()))?;
        group.label = (!label.is_empty()).then(|| label.to_string());
        Ok(next.rebuild_pool())
    }

    /// Renames `source`. Without an explicit order the field keeps its
    /// current rule order, else its position in the source field list.
    pub fn set_mapping(&self, source: &str, target: &str, order: Option<usize>) -> Self {
        let order = order
            .or_else(|| self.mapping.rule(source).map(|rule| rule.order))
            .or_else(|| self.source_fields().iter().position(|f| f == source))
            .unwrap_or(self.mapping.rules.len());
        let mut next = self.clone();
        next.mapping = self.mapping.set_mapping(source, target, order);
        next.rebuild_pool()
    }

    pub fn set_hidden(&self, field: &str, hidden: bool) -> Self {
        let mut next = self.clone();
        next.mapping = self.mapping.set_hidden(field, hidden);
        next
    }

    pub fn set_filters(&self, filters: Vec<FilterSpec>) -> Self {
        let mut next = self.clone();
        next.filters = filters;
        next
    }

    pub fn keep(&self, result: RollResult) -> Self {
        let mut next = self.clone();
        next.kept = self.kept.keep(result);
        next
    }

    pub fn remove_kept(&self, id: &str) -> Result<Self, StateError> {
        if self.kept.find(id).is_none() {
            return Err(StateError::UnknownItem(id.to_string()));
        }
        let mut next = self.clone();
        next.kept = self.kept.remove(id);
        Ok(next)
    }

    /// Original field names of the selected groups, first appearance order,
    /// identifier excluded. Declared fields come first, then keys that only
    /// some records carry.
    pub fn source_fields(&self) -> Vec<String> {
        let declared = self
            .selected_groups()
            .flat_map(|group| group.fields.iter().map(|field| field.name.as_str()));
        let present = self
            .selected_groups()
            .flat_map(|group| group.records.iter().flat_map(|record| record.keys()));
        declared
            .chain(present)
            .filter(|name| *name != ID_FIELD)
            .unique()
            .map(str::to_string)
            .collect()
    }

    /// Mapped field names usable in filters: every key of the pool in first
    /// appearance order, identifier excluded.
    pub fn filterable_fields(&self) -> Vec<String> {
        self.pool
            .iter()
            .flat_map(|candidate| candidate.record.keys())
            .filter(|key| *key != ID_FIELD)
            .unique()
            .map(str::to_string)
            .collect()
    }

    /// Display field order for the selected groups.
    pub fn ordered_fields(&self) -> Vec<String> {
        self.mapping.ordered_fields(&self.source_fields())
    }

    /// Pool entries passing `specs`, optionally restricted to some group
    /// display names.
    pub fn candidates(&self, specs: &[FilterSpec], only_groups: &[String]) -> Vec<RollResult> {
        let scoped = if only_groups.is_empty() {
            self.pool.clone()
        } else {
            self.pool
                .iter()
                .filter(|c| only_groups.contains(&c.group))
                .cloned()
                .collect()
        };
        let matched = filter_pool(&scoped, specs);
        debug!(
            "{} of {} candidate(s) pass {} filter(s)",
            matched.len(),
            scoped.len(),
            specs.len()
        );
        matched
    }

    pub fn roll<S: RandomSource + ?Sized>(
        &self,
        specs: &[FilterSpec],
        only_groups: &[String],
        count: usize,
        rng: &mut S,
    ) -> Vec<RollResult> {
        let candidates = self.candidates(specs, only_groups);
        roll(&candidates, count, rng)
    }

    /// `key: value` lines for one result, hidden fields left out.
    pub fn render_text(&self, result: &RollResult) -> String {
        let mut text = String::new();
        for (key, value) in result.record.iter() {
            if self.mapping.is_hidden(key) {
                continue;
            }
            let _ = writeln!(text, "{key}: {}", value.as_display());
        }
        text
    }

    fn selected_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|group| self.is_selected(&group.name))
    }

    pub(crate) fn rebuild_pool(mut self) -> Self {
        let mapping = &self.mapping;
        let pool = self
            .selected_groups()
            .flat_map(|group| {
                let display = group.display_name();
                group.records.iter().map(move |record| {
                    RollResult::new(mapping.reorder(mapping.apply(record)), display.clone())
                })
            })
            .collect::<Vec<_>>();
        debug!("Candidate pool rebuilt with {} record(s)", pool.len());
        self.pool = pool;
        self
    }
}
