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

//! Form trees built on top of a linked schema.
//!
//! A [`FormTree`] holds the runtime state (leaf values, list entries, the
//! selected case of a choice) of one or more instantiated schema subtrees and
//! implements the per kind behavior:
//!
//! - `build_request`: serialize the state into a nested JSON request object
//! - `fill`: hydrate the state from a server response
//! - `clear`: reset the state
//! - `is_filled`: whether any meaningful value is present
//!
//! Property names follow the RFC 7951 convention, a member is qualified with
//! its module name when it starts a tree or when its module differs from its
//! parent's.

pub mod encode;
pub mod filter;
pub mod list;
pub mod validate;

use crate::{encode::encode_leaf_value, list::ListState};
use serde_json::{Map, Value};
use sfc_yangutils::{
    path::split_qualified, restriction::TypeRestrictions, LinkedSchema, NodeId, NodeKind,
};
use std::{fmt, sync::Arc};
use tracing::{debug, trace};

/// Type assumed for leaves without a `type` statement
const DEFAULT_TYPE: &str = "string";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("index {index} out of range, {len} entries present")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("form node {node} is a {found}, expected a {expected}")]
    UnexpectedKind {
        node: FormId,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("form node {node} is not a case of choice {choice}")]
    NotACase { choice: FormId, node: FormId },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(usize);

impl FormId {
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct LeafState {
    pub(crate) value: String,
    pub(crate) restrictions: Option<TypeRestrictions>,
}

#[derive(Debug, Clone)]
pub struct LeafListState {
    pub(crate) entries: Vec<String>,
    pub(crate) restrictions: Option<TypeRestrictions>,
}

/// Runtime state of a form node
#[derive(Debug, Clone)]
pub enum NodeState {
    Leaf(LeafState),
    LeafList(LeafListState),
    /// `container`, `case`, `rpc`, `input` and `output`
    Inner,
    Choice {
        selected: Option<FormId>,
    },
    List(Box<ListState>),
    /// Edit template of a list entry
    Entry,
}

#[derive(Debug, Clone)]
pub struct FormNode {
    schema_node: NodeId,
    label: String,
    module: String,
    kind: NodeKind,
    parent: Option<FormId>,
    children: Vec<FormId>,
    state: NodeState,
    errors: Vec<String>,
}

impl FormNode {
    pub const fn schema_node(&self) -> NodeId {
        self.schema_node
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    pub const fn parent(&self) -> Option<FormId> {
        self.parent
    }

    pub fn children(&self) -> &[FormId] {
        &self.children
    }

    pub const fn state(&self) -> &NodeState {
        &self.state
    }

    /// Validation messages of the last check of this node
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// `true` for nodes that put their children straight into the caller's
    /// object instead of wrapping them
    fn delegates(&self) -> bool {
        matches!(self.state, NodeState::Entry)
            || matches!(self.kind, NodeKind::Rpc | NodeKind::Case | NodeKind::Choice)
    }
}

/// Runtime state over instantiated schema subtrees
#[derive(Debug, Clone)]
pub struct FormTree {
    schema: Arc<LinkedSchema>,
    nodes: Vec<FormNode>,
}

impl FormTree {
    pub fn new(schema: Arc<LinkedSchema>) -> Self {
        Self {
            schema,
            nodes: vec![],
        }
    }

    pub fn schema(&self) -> &LinkedSchema {
        &self.schema
    }

    pub fn node(&self, id: FormId) -> &FormNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: FormId) -> &mut FormNode {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: FormId) -> &[FormId] {
        &self.nodes[id.0].children
    }

    pub fn errors(&self, id: FormId) -> &[String] {
        &self.nodes[id.0].errors
    }

    /// Child with the given label, the module is ignored
    pub fn find_child(&self, id: FormId, label: &str) -> Option<FormId> {
        self.children(id)
            .iter()
            .copied()
            .find(|x| self.nodes[x.0].label == label)
    }

    /// Follow a `/` separated path of labels starting below `id`
    pub fn find(&self, id: FormId, path: &str) -> Option<FormId> {
        path.split('/')
            .filter(|x| !x.is_empty())
            .try_fold(id, |current, label| {
                let (_, label) = split_qualified(label);
                self.find_child(current, label)
            })
    }

    /// Create the form for the UI visible subtree rooted at `schema_node`
    pub fn instantiate(&mut self, schema_node: NodeId) -> FormId {
        self.instantiate_under(None, schema_node)
    }

    fn push_node(&mut self, parent: Option<FormId>, schema_node: NodeId, state: NodeState) -> FormId {
        let node = &self.schema.arena()[schema_node];
        let id = FormId(self.nodes.len());
        self.nodes.push(FormNode {
            schema_node,
            label: node.label().to_string(),
            module: node.module().to_string(),
            kind: node.kind(),
            parent,
            children: vec![],
            state,
            errors: vec![],
        });
        id
    }

    fn instantiate_under(&mut self, parent: Option<FormId>, schema_node: NodeId) -> FormId {
        let schema = Arc::clone(&self.schema);
        let arena = schema.arena();
        let kind = arena[schema_node].kind();
        let restrictions = || {
            arena
                .children_of_kind(schema_node, NodeKind::Type)
                .next()
                .map(|x| TypeRestrictions::compile(&schema, x))
        };
        let state = match kind {
            NodeKind::Leaf => NodeState::Leaf(LeafState {
                value: String::new(),
                restrictions: restrictions(),
            }),
            NodeKind::LeafList => NodeState::LeafList(LeafListState {
                entries: vec![],
                restrictions: restrictions(),
            }),
            NodeKind::Choice => NodeState::Choice { selected: None },
            NodeKind::List => {
                let ref_key = arena
                    .children_of_kind(schema_node, NodeKind::Key)
                    .flat_map(|x| {
                        arena[x]
                            .label()
                            .split_whitespace()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                    })
                    .collect();
                NodeState::List(Box::new(ListState::new(ref_key)))
            }
            _ => NodeState::Inner,
        };
        let id = self.push_node(parent, schema_node, state);
        if kind != NodeKind::List {
            self.instantiate_children(id, schema_node);
        }
        trace!(form = %id, kind = %kind, label = arena[schema_node].label(), "instantiated form node");
        id
    }

    /// Instantiate the UI visible schema children of `schema_node` under `id`
    pub(crate) fn instantiate_children(&mut self, id: FormId, schema_node: NodeId) {
        let schema = Arc::clone(&self.schema);
        for child in schema.arena().children(schema_node) {
            if schema.arena()[*child].kind().is_ui_visible() {
                let child = self.instantiate_under(Some(id), *child);
                self.nodes[id.0].children.push(child);
            }
        }
    }

    /// Create the edit template of list `list`
    pub(crate) fn instantiate_entry(&mut self, list: FormId) -> FormId {
        let schema_node = self.nodes[list.0].schema_node;
        let entry = self.push_node(Some(list), schema_node, NodeState::Entry);
        self.instantiate_children(entry, schema_node);
        entry
    }

    /// Module the property name of `id` is compared against
    fn parent_module(&self, id: FormId) -> Option<&str> {
        self.nodes[id.0]
            .parent
            .map(|x| self.nodes[x.0].module.as_str())
    }

    /// Member name of `id` in a request object
    pub fn property_name(&self, id: FormId) -> String {
        let node = &self.nodes[id.0];
        match self.parent_module(id) {
            Some(module) if module == node.module => node.label.clone(),
            _ => format!("{}:{}", node.module, node.label),
        }
    }

    /// Bare and `module:label` keys match, a different module doesn't
    fn matches_key(&self, id: FormId, key: &str) -> bool {
        let node = &self.nodes[id.0];
        match split_qualified(key) {
            (Some(module), label) => module == node.module && label == node.label,
            (None, label) => label == node.label,
        }
    }

    /// Serialize the state of `id` into `acc`, returns `true` when anything
    /// was added
    pub fn build_request(&mut self, id: FormId, acc: &mut Map<String, Value>) -> bool {
        let node = &self.nodes[id.0];
        match &node.state {
            NodeState::Leaf(leaf) => {
                if leaf.value.is_empty() {
                    return false;
                }
                let value = encode_leaf_value(&leaf.value, type_name(&leaf.restrictions));
                acc.insert(self.property_name(id), value);
                true
            }
            NodeState::LeafList(leaf_list) => {
                let ty = type_name(&leaf_list.restrictions);
                let entries = leaf_list
                    .entries
                    .iter()
                    .filter(|x| !x.is_empty())
                    .map(|x| encode_leaf_value(x, ty))
                    .collect::<Vec<_>>();
                if entries.is_empty() {
                    return false;
                }
                acc.insert(self.property_name(id), Value::Array(entries));
                true
            }
            NodeState::Choice { selected } => match *selected {
                Some(selected) => self.build_request(selected, acc),
                None => false,
            },
            NodeState::List(_) => self.build_list_request(id, acc),
            NodeState::Inner | NodeState::Entry if node.delegates() => {
                self.build_children(id, acc)
            }
            NodeState::Inner | NodeState::Entry => {
                let mut inner = Map::new();
                if !self.build_children(id, &mut inner) {
                    return false;
                }
                acc.insert(self.property_name(id), Value::Object(inner));
                true
            }
        }
    }

    fn build_children(&mut self, id: FormId, acc: &mut Map<String, Value>) -> bool {
        let children = self.nodes[id.0].children.clone();
        let mut added = false;
        for child in children {
            added |= self.build_request(child, acc);
        }
        added
    }

    /// Request object holding only `id`
    pub fn request(&mut self, id: FormId) -> Value {
        let mut acc = Map::new();
        self.build_request(id, &mut acc);
        Value::Object(acc)
    }

    /// Hydrate `id` from the member `key` of a response object, returns
    /// `false` when the member isn't for this node.
    pub fn fill(&mut self, id: FormId, key: &str, value: &Value) -> bool {
        if self.nodes[id.0].delegates() {
            return self.fill_delegated(id, key, value);
        }
        if !self.matches_key(id, key) {
            return false;
        }
        match &mut self.nodes[id.0].state {
            NodeState::Leaf(leaf) => match scalar_to_string(value) {
                Some(value) => {
                    leaf.value = value;
                    true
                }
                None => {
                    debug!(form = %id, key, "non scalar value for a leaf");
                    false
                }
            },
            NodeState::LeafList(leaf_list) => match value {
                Value::Array(entries) => {
                    leaf_list.entries = entries.iter().filter_map(scalar_to_string).collect();
                    true
                }
                _ => false,
            },
            NodeState::List(_) => match value {
                Value::Array(entries) => match self.fill_list(id, entries) {
                    Ok(()) => true,
                    Err(err) => {
                        debug!(form = %id, error = %err, "failed to fill list");
                        false
                    }
                },
                _ => false,
            },
            NodeState::Inner => match value {
                Value::Object(members) => {
                    self.fill_members(id, members);
                    true
                }
                _ => false,
            },
            NodeState::Choice { .. } | NodeState::Entry => false,
        }
    }

    fn fill_delegated(&mut self, id: FormId, key: &str, value: &Value) -> bool {
        if let NodeState::Choice { selected } = self.nodes[id.0].state {
            if let Some(selected) = selected {
                if self.fill(selected, key, value) {
                    return true;
                }
            }
            let children = self.nodes[id.0].children.clone();
            for child in children {
                if Some(child) != selected && self.fill(child, key, value) {
                    self.nodes[id.0].state = NodeState::Choice {
                        selected: Some(child),
                    };
                    return true;
                }
            }
            return false;
        }
        let children = self.nodes[id.0].children.clone();
        let mut filled = false;
        for child in children {
            filled |= self.fill(child, key, value);
        }
        filled
    }

    /// Hydrate the children of `id` from the members of an object
    pub(crate) fn fill_members(&mut self, id: FormId, members: &Map<String, Value>) -> bool {
        let children = self.nodes[id.0].children.clone();
        let mut filled = false;
        for (key, value) in members {
            let mut matched = false;
            for child in &children {
                matched |= self.fill(*child, key, value);
            }
            if !matched {
                trace!(form = %id, key = key.as_str(), "no form node for response member");
            }
            filled |= matched;
        }
        filled
    }

    /// Hydrate `id` from a whole response object, e.g. the body returned by
    /// a RESTCONF GET
    pub fn fill_from_response(&mut self, id: FormId, response: &Value) -> bool {
        match response {
            Value::Object(members) => members
                .iter()
                .fold(false, |acc, (key, value)| self.fill(id, key, value) | acc),
            _ => false,
        }
    }

    pub fn clear(&mut self, id: FormId) {
        let node = &mut self.nodes[id.0];
        node.errors.clear();
        match &mut node.state {
            NodeState::Leaf(leaf) => leaf.value.clear(),
            NodeState::LeafList(leaf_list) => leaf_list.entries.clear(),
            NodeState::Choice { selected } => *selected = None,
            NodeState::List(_) => {
                self.clear_list(id);
                return;
            }
            NodeState::Inner | NodeState::Entry => {}
        }
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.clear(child);
        }
    }

    pub fn is_filled(&self, id: FormId) -> bool {
        let node = &self.nodes[id.0];
        match &node.state {
            NodeState::Leaf(leaf) => !leaf.value.is_empty(),
            NodeState::LeafList(leaf_list) => leaf_list.entries.iter().any(|x| !x.is_empty()),
            NodeState::Choice { selected } => selected.is_some_and(|x| self.is_filled(x)),
            NodeState::List(list) => {
                list.entries.iter().any(|x| !x.is_empty())
                    || list.template.is_some_and(|x| self.is_filled(x))
            }
            NodeState::Inner | NodeState::Entry => {
                node.children.iter().any(|x| self.is_filled(*x))
            }
        }
    }

    /// Value of a leaf
    pub fn value(&self, id: FormId) -> Option<&str> {
        match &self.nodes[id.0].state {
            NodeState::Leaf(leaf) => Some(&leaf.value),
            _ => None,
        }
    }

    pub fn set_value(&mut self, id: FormId, value: impl Into<String>) -> Result<(), FormError> {
        match &mut self.nodes[id.0].state {
            NodeState::Leaf(leaf) => {
                leaf.value = value.into();
                Ok(())
            }
            _ => Err(self.unexpected_kind(id, NodeKind::Leaf)),
        }
    }

    pub fn leaf_list_entries(&self, id: FormId) -> Option<&[String]> {
        match &self.nodes[id.0].state {
            NodeState::LeafList(leaf_list) => Some(&leaf_list.entries),
            _ => None,
        }
    }

    pub fn add_leaf_list_entry(
        &mut self,
        id: FormId,
        value: impl Into<String>,
    ) -> Result<usize, FormError> {
        match &mut self.nodes[id.0].state {
            NodeState::LeafList(leaf_list) => {
                leaf_list.entries.push(value.into());
                Ok(leaf_list.entries.len() - 1)
            }
            _ => Err(self.unexpected_kind(id, NodeKind::LeafList)),
        }
    }

    pub fn remove_leaf_list_entry(&mut self, id: FormId, index: usize) -> Result<String, FormError> {
        match &mut self.nodes[id.0].state {
            NodeState::LeafList(leaf_list) if index < leaf_list.entries.len() => {
                Ok(leaf_list.entries.remove(index))
            }
            NodeState::LeafList(leaf_list) => Err(FormError::IndexOutOfRange {
                index,
                len: leaf_list.entries.len(),
            }),
            _ => Err(self.unexpected_kind(id, NodeKind::LeafList)),
        }
    }

    pub fn selected_case(&self, choice: FormId) -> Option<FormId> {
        match self.nodes[choice.0].state {
            NodeState::Choice { selected } => selected,
            _ => None,
        }
    }

    /// Select `case` of `choice`, the previously selected case is cleared
    pub fn select_case(&mut self, choice: FormId, case: FormId) -> Result<(), FormError> {
        let previous = match self.nodes[choice.0].state {
            NodeState::Choice { selected } => selected,
            _ => return Err(self.unexpected_kind(choice, NodeKind::Choice)),
        };
        if !self.nodes[choice.0].children.contains(&case) {
            return Err(FormError::NotACase { choice, node: case });
        }
        if let Some(previous) = previous.filter(|x| *x != case) {
            self.clear(previous);
        }
        self.nodes[choice.0].state = NodeState::Choice {
            selected: Some(case),
        };
        Ok(())
    }

    pub(crate) fn unexpected_kind(&self, id: FormId, expected: NodeKind) -> FormError {
        FormError::UnexpectedKind {
            node: id,
            expected,
            found: self.nodes[id.0].kind,
        }
    }
}

fn type_name(restrictions: &Option<TypeRestrictions>) -> &str {
    restrictions
        .as_ref()
        .map_or(DEFAULT_TYPE, TypeRestrictions::type_name)
}

/// String form of a JSON scalar, `None` for objects and arrays
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        // presence of an `empty` leaf, kept as `true`
        Value::Array(values) if matches!(values.as_slice(), [Value::Null]) => Some(true.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
