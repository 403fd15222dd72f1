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

use crate::{FormId, FormTree, NodeState};
use tracing::debug;

impl FormTree {
    /// Check the value(s) of a leaf or leaf-list against its type
    /// restrictions. Messages are stored on the node, empty values pass.
    pub fn check_value_type(&mut self, id: FormId) -> bool {
        let node = self.node_mut(id);
        let errors = match &node.state {
            NodeState::Leaf(leaf) => match (&leaf.restrictions, leaf.value.is_empty()) {
                (Some(restrictions), false) => restrictions.check(&leaf.value).err().unwrap_or_default(),
                _ => vec![],
            },
            NodeState::LeafList(leaf_list) => match &leaf_list.restrictions {
                Some(restrictions) => leaf_list
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, value)| !value.is_empty())
                    .flat_map(|(index, value)| {
                        restrictions
                            .check(value)
                            .err()
                            .unwrap_or_default()
                            .into_iter()
                            .map(move |x| format!("entry {index}: {x}"))
                    })
                    .collect(),
                None => vec![],
            },
            _ => return true,
        };
        let valid = errors.is_empty();
        node.errors = errors;
        valid
    }

    /// Validate the subtree of `id`. Every node is checked even after a
    /// failure so each one holds its own messages.
    pub fn validate(&mut self, id: FormId) -> bool {
        let valid = match &self.node(id).state {
            NodeState::Leaf(_) | NodeState::LeafList(_) => self.check_value_type(id),
            NodeState::Choice { selected } => match *selected {
                Some(selected) => self.validate(selected),
                None => true,
            },
            NodeState::List(_) => self.validate_list(id),
            NodeState::Inner | NodeState::Entry => {
                let children = self.children(id).to_vec();
                children
                    .into_iter()
                    .fold(true, |acc, child| self.validate(child) && acc)
            }
        };
        debug!(form = %id, valid, "validated form node");
        valid
    }

    /// Validate every entry through the template and check key uniqueness
    fn validate_list(&mut self, id: FormId) -> bool {
        let Ok(doubles) = self.check_list_elem_keys(id) else {
            return false;
        };
        let mut errors = vec![];
        if !doubles.is_empty() {
            let indexes = doubles
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(format!("duplicate key values in entries {indexes}"));
        }
        let (len, active) = match self.list_state(id) {
            Some(list) => (list.entries().len(), list.active()),
            None => return false,
        };
        for index in 0..len {
            if self.change_act_element_data(id, index).is_err() {
                continue;
            }
            if let Some(template) = self.list_state(id).and_then(|x| x.template()) {
                if !self.validate(template) {
                    errors.push(format!("entry {index} is invalid"));
                }
            }
        }
        // leave the template on the previously active entry with its messages
        if let Some(active) = active {
            if self.change_act_element_data(id, active).is_ok() {
                if let Some(template) = self.list_state(id).and_then(|x| x.template()) {
                    self.validate(template);
                }
            }
        }
        let valid = errors.is_empty();
        self.node_mut(id).errors = errors;
        valid
    }
}
