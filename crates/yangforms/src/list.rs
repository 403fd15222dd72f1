// Copyright (C) 2025-present The NetGauze Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! List entries and the active entry template.
//!
//! Entries are stored as plain JSON objects. One entry at a time is edited
//! through the template, a form subtree instantiated from the list's
//! children. Switching the active entry always commits the template into the
//! previously active entry first, so edits are never lost.

use crate::{
    filter::{member, ListFilter},
    scalar_to_string, FormError, FormId, FormTree, NodeState,
};
use serde_json::{Map, Value};
use sfc_yangutils::NodeKind;
use std::collections::BTreeMap;
use tracing::debug;

/// Prefix of UI only members that are never sent to the server
pub const TRANSIENT_PREFIX: &str = "$$";

pub type ListEntry = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub(crate) entries: Vec<ListEntry>,
    pub(crate) filters: Vec<ListFilter>,
    /// Indexes of the entries passing every filter, `None` while unfiltered
    pub(crate) filtered: Option<Vec<usize>>,
    pub(crate) template: Option<FormId>,
    pub(crate) active: Option<usize>,
    pub(crate) ref_key: Vec<String>,
    pub(crate) double_key_indexes: Vec<usize>,
}

impl ListState {
    pub(crate) fn new(ref_key: Vec<String>) -> Self {
        Self {
            ref_key,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn filters(&self) -> &[ListFilter] {
        &self.filters
    }

    pub const fn template(&self) -> Option<FormId> {
        self.template
    }

    pub const fn active(&self) -> Option<usize> {
        self.active
    }

    /// Labels of the key leaves
    pub fn ref_key(&self) -> &[String] {
        &self.ref_key
    }

    pub fn double_key_indexes(&self) -> &[usize] {
        &self.double_key_indexes
    }

    /// Indexes of the entries currently displayed
    pub fn display_indexes(&self) -> Vec<usize> {
        match &self.filtered {
            Some(filtered) => filtered.clone(),
            None => (0..self.entries.len()).collect(),
        }
    }
}

/// Drop transient members, recursively
fn strip_transient(value: &Value) -> Value {
    match value {
        Value::Object(members) => Value::Object(
            members
                .iter()
                .filter(|(key, _)| !key.starts_with(TRANSIENT_PREFIX))
                .map(|(key, value)| (key.clone(), strip_transient(value)))
                .collect(),
        ),
        Value::Array(values) => Value::Array(values.iter().map(strip_transient).collect()),
        other => other.clone(),
    }
}

impl FormTree {
    pub fn list_state(&self, id: FormId) -> Option<&ListState> {
        match &self.node(id).state {
            NodeState::List(list) => Some(list),
            _ => None,
        }
    }

    fn list_mut(&mut self, id: FormId) -> Result<&mut ListState, FormError> {
        let found = self.node(id).kind();
        match &mut self.node_mut(id).state {
            NodeState::List(list) => Ok(list),
            _ => Err(FormError::UnexpectedKind {
                node: id,
                expected: NodeKind::List,
                found,
            }),
        }
    }

    /// Entry template of the list, created on first use
    fn ensure_template(&mut self, id: FormId) -> Result<FormId, FormError> {
        if let Some(template) = self.list_mut(id)?.template {
            return Ok(template);
        }
        let template = self.instantiate_entry(id);
        self.list_mut(id)?.template = Some(template);
        Ok(template)
    }

    /// Write the template back into the active entry, keeping the transient
    /// members of the entry
    fn commit_active(&mut self, id: FormId) -> Result<(), FormError> {
        let list = self.list_mut(id)?;
        let (Some(active), Some(template)) = (list.active, list.template) else {
            return Ok(());
        };
        let mut built = Map::new();
        self.build_request(template, &mut built);
        let list = self.list_mut(id)?;
        if let Some(entry) = list.entries.get_mut(active) {
            for (key, value) in entry.iter() {
                if key.starts_with(TRANSIENT_PREFIX) {
                    built.insert(key.clone(), value.clone());
                }
            }
            *entry = built;
        }
        Ok(())
    }

    /// Load entry `index` into the template without committing anything
    fn hydrate_template(&mut self, id: FormId, index: Option<usize>) -> Result<(), FormError> {
        let template = self.ensure_template(id)?;
        self.clear(template);
        let entry = match index {
            Some(index) => self.list_mut(id)?.entries.get(index).cloned(),
            None => None,
        };
        if let Some(entry) = entry {
            self.fill_members(template, &entry);
        }
        self.list_mut(id)?.active = index;
        Ok(())
    }

    /// Append a blank entry and make it the active one
    pub fn add_list_elem(&mut self, id: FormId) -> Result<usize, FormError> {
        self.ensure_template(id)?;
        let list = self.list_mut(id)?;
        list.entries.push(Map::new());
        let index = list.entries.len() - 1;
        self.change_act_element_data(id, index)?;
        self.refresh_filtered(id)?;
        Ok(index)
    }

    /// Commit the active entry, then load entry `index` into the template
    pub fn change_act_element_data(&mut self, id: FormId, index: usize) -> Result<(), FormError> {
        let len = self.list_mut(id)?.entries.len();
        if index >= len {
            return Err(FormError::IndexOutOfRange { index, len });
        }
        self.commit_active(id)?;
        self.hydrate_template(id, Some(index))
    }

    /// Remove entry `index`, the new last entry becomes the active one
    pub fn remove_list_elem(&mut self, id: FormId, index: usize) -> Result<ListEntry, FormError> {
        let list = self.list_mut(id)?;
        let len = list.entries.len();
        if index >= len {
            return Err(FormError::IndexOutOfRange { index, len });
        }
        if list.active != Some(index) {
            self.commit_active(id)?;
        }
        let list = self.list_mut(id)?;
        let removed = list.entries.remove(index);
        let last = list.entries.len().checked_sub(1);
        list.active = None;
        self.hydrate_template(id, last)?;
        self.refresh_filtered(id)?;
        Ok(removed)
    }

    /// Move entry `from` to position `to`, the active entry stays active
    pub fn move_list_elem(&mut self, id: FormId, from: usize, to: usize) -> Result<(), FormError> {
        self.commit_active(id)?;
        let list = self.list_mut(id)?;
        let len = list.entries.len();
        for index in [from, to] {
            if index >= len {
                return Err(FormError::IndexOutOfRange { index, len });
            }
        }
        let entry = list.entries.remove(from);
        list.entries.insert(to, entry);
        list.active = list.active.map(|active| match active {
            x if x == from => to,
            x if from < x && x <= to => x - 1,
            x if to <= x && x < from => x + 1,
            x => x,
        });
        self.refresh_filtered(id)
    }

    /// Replace the entries with the elements of a response array, each
    /// element is normalized through the template
    pub(crate) fn fill_list(&mut self, id: FormId, elements: &[Value]) -> Result<(), FormError> {
        let template = self.ensure_template(id)?;
        let mut entries = vec![];
        for element in elements {
            let Value::Object(members) = element else {
                debug!(form = %id, "skipping non object list entry");
                continue;
            };
            self.clear(template);
            self.fill_members(template, members);
            let mut entry = Map::new();
            self.build_request(template, &mut entry);
            entries.push(entry);
        }
        let first = (!entries.is_empty()).then_some(0);
        let list = self.list_mut(id)?;
        list.entries = entries;
        list.active = None;
        self.hydrate_template(id, first)?;
        self.refresh_filtered(id)
    }

    pub(crate) fn clear_list(&mut self, id: FormId) {
        let template = match self.list_mut(id) {
            Ok(list) => {
                list.entries.clear();
                if list.filtered.is_some() {
                    list.filtered = Some(vec![]);
                }
                list.active = None;
                list.double_key_indexes.clear();
                list.template
            }
            Err(_) => return,
        };
        if let Some(template) = template {
            self.clear(template);
        }
    }

    /// Commit, then serialize every entry when at least one is non-empty
    pub(crate) fn build_list_request(&mut self, id: FormId, acc: &mut Map<String, Value>) -> bool {
        if self.commit_active(id).is_err() {
            return false;
        }
        let Some(list) = self.list_state(id) else {
            return false;
        };
        let entries = list
            .entries
            .iter()
            .map(|x| strip_transient(&Value::Object(x.clone())))
            .collect::<Vec<_>>();
        let any_filled = entries
            .iter()
            .any(|x| x.as_object().is_some_and(|x| !x.is_empty()));
        if !any_filled {
            return false;
        }
        acc.insert(self.property_name(id), Value::Array(entries));
        true
    }

    /// Report every displayed entry whose key values are shared with another
    /// displayed entry. Entries with all key values empty are ignored.
    pub fn check_list_elem_keys(&mut self, id: FormId) -> Result<Vec<usize>, FormError> {
        self.commit_active(id)?;
        let list = self.list_mut(id)?;
        let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
        if !list.ref_key.is_empty() {
            for index in list.display_indexes() {
                let Some(entry) = list.entries.get(index) else {
                    continue;
                };
                let key = list
                    .ref_key
                    .iter()
                    .map(|label| {
                        member(entry, label)
                            .and_then(scalar_to_string)
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>();
                if key.iter().all(String::is_empty) {
                    continue;
                }
                groups.entry(key).or_default().push(index);
            }
        }
        let mut doubles = groups
            .into_values()
            .filter(|x| x.len() > 1)
            .flatten()
            .collect::<Vec<_>>();
        doubles.sort_unstable();
        list.double_key_indexes = doubles.clone();
        Ok(doubles)
    }

    pub fn add_filter(&mut self, id: FormId, filter: ListFilter) -> Result<(), FormError> {
        self.list_mut(id)?.filters.push(filter);
        Ok(())
    }

    pub fn clear_filters(&mut self, id: FormId) -> Result<(), FormError> {
        let list = self.list_mut(id)?;
        list.filters.clear();
        list.filtered = None;
        Ok(())
    }

    /// Recompute the filtered view, all filters must match
    pub fn apply_filters(&mut self, id: FormId) -> Result<Vec<usize>, FormError> {
        self.commit_active(id)?;
        let list = self.list_mut(id)?;
        let filtered = list
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| list.filters.iter().all(|x| x.matches(entry)))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        list.filtered = Some(filtered.clone());
        Ok(filtered)
    }

    fn refresh_filtered(&mut self, id: FormId) -> Result<(), FormError> {
        if self.list_mut(id)?.filtered.is_some() {
            self.apply_filters(id)?;
        }
        Ok(())
    }

    /// Displayed entries with their index
    pub fn filtered_entries(&self, id: FormId) -> Vec<(usize, &ListEntry)> {
        let Some(list) = self.list_state(id) else {
            return vec![];
        };
        list.display_indexes()
            .into_iter()
            .filter_map(|index| list.entries.get(index).map(|x| (index, x)))
            .collect()
    }
}
