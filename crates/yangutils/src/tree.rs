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

//! Arena backed schema node tree.
//!
//! All [`SchemaNode`]s of a tree live in a single [`SchemaArena`] and refer
//! to each other only through [`NodeId`]s. Children are owned by the arena,
//! the parent link is a plain id used for upward searches.

use std::{fmt, ops::Index};
use tracing::warn;

/// Handle to a node stored in a [`SchemaArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// YANG statements modeled by the engine, named after their YIN tags
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
    Choice,
    Case,
    Rpc,
    Input,
    Output,
    Key,
    Description,
    Typedef,
    Grouping,
    Uses,
    Import,
    Augment,
    Pattern,
    Range,
    Length,
    Enum,
    Bit,
    Position,
    Type,
    Identity,
    Base,
}

/// What a node is used for once the schema is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum NodeRole {
    /// Rendered as part of a form and present in request payloads
    UiDisplay,
    Identity,
    /// Target of a `uses` or `type` reference
    LinkTarget,
    Link,
    Alteration,
    Restriction,
    Meta,
}

impl NodeKind {
    pub const fn role(&self) -> NodeRole {
        match self {
            Self::Container
            | Self::List
            | Self::Leaf
            | Self::LeafList
            | Self::Choice
            | Self::Case
            | Self::Rpc
            | Self::Input
            | Self::Output => NodeRole::UiDisplay,
            Self::Identity => NodeRole::Identity,
            Self::Typedef | Self::Grouping => NodeRole::LinkTarget,
            Self::Uses => NodeRole::Link,
            Self::Augment => NodeRole::Alteration,
            Self::Type
            | Self::Pattern
            | Self::Range
            | Self::Length
            | Self::Enum
            | Self::Bit
            | Self::Position
            | Self::Base
            | Self::Key => NodeRole::Restriction,
            Self::Description | Self::Import => NodeRole::Meta,
        }
    }

    pub const fn is_ui_visible(&self) -> bool {
        matches!(self.role(), NodeRole::UiDisplay)
    }

    /// Module level statements that can start a tree
    pub const fn is_root_candidate(&self) -> bool {
        matches!(
            self.role(),
            NodeRole::UiDisplay | NodeRole::Identity | NodeRole::LinkTarget
        )
    }

    /// Terminal statements carry their whole meaning in the argument, the
    /// parser doesn't descend into their sub-statements.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Key
                | Self::Description
                | Self::Pattern
                | Self::Range
                | Self::Length
                | Self::Position
                | Self::Base
                | Self::Import
        )
    }
}

/// Prefix and revision captured from an `import` statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportInfo {
    pub prefix: String,
    pub revision_date: Option<String>,
}

/// Module metadata every node is tagged with
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodeOrigin {
    pub module: String,
    pub namespace: String,
    pub revision: Option<String>,
}

impl NodeOrigin {
    pub fn new(module: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            namespace: namespace.into(),
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    id: NodeId,
    label: String,
    kind: NodeKind,
    origin: NodeOrigin,
    import: Option<ImportInfo>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl SchemaNode {
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Statement argument: the schema name for data nodes, the target path
    /// for `augment`, the type name for `type` and so on.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn module(&self) -> &str {
        &self.origin.module
    }

    pub fn namespace(&self) -> &str {
        &self.origin.namespace
    }

    pub fn revision(&self) -> Option<&str> {
        self.origin.revision.as_deref()
    }

    pub const fn origin(&self) -> &NodeOrigin {
        &self.origin
    }

    pub const fn import(&self) -> Option<&ImportInfo> {
        self.import.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Target path of an `augment` statement, as written in the schema
    pub fn augment_target(&self) -> Option<&str> {
        (self.kind == NodeKind::Augment).then_some(self.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate {kind} `{label}` under {}", parent_name(.parent))]
pub struct DuplicateChild {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub label: String,
}

fn parent_name(parent: &Option<NodeId>) -> String {
    parent
        .map(|p| p.to_string())
        .unwrap_or_else(|| "module".to_string())
}

/// Owned copy of a subtree that isn't attached to any arena.
///
/// Used to move subtrees between arenas (grouping splicing, augmentation,
/// stamping the final forest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedNode {
    pub label: String,
    pub kind: NodeKind,
    pub origin: NodeOrigin,
    pub import: Option<ImportInfo>,
    pub children: Vec<DetachedNode>,
}

impl DetachedNode {
    pub fn new(kind: NodeKind, label: impl Into<String>, origin: NodeOrigin) -> Self {
        Self {
            label: label.into(),
            kind,
            origin,
            import: None,
            children: vec![],
        }
    }

    /// Recursively set the owning module of the whole subtree
    pub fn stamp_module(&mut self, module: &str) {
        self.origin.module = module.to_string();
        for child in &mut self.children {
            child.stamp_module(module);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
}

impl SchemaArena {
    pub const fn new() -> Self {
        Self { nodes: vec![] }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn find_child(&self, parent: NodeId, kind: NodeKind, label: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.node(*child).kind == kind && self.node(*child).label == label)
    }

    pub fn children_of_kind(
        &self,
        parent: NodeId,
        kind: NodeKind,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.children(parent)
            .iter()
            .copied()
            .filter(move |child| self.node(*child).kind == kind)
    }

    /// Append a new node under `parent`, a `None` parent creates a detached
    /// top-level node.
    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        kind: NodeKind,
        label: impl Into<String>,
        origin: NodeOrigin,
        import: Option<ImportInfo>,
    ) -> Result<NodeId, DuplicateChild> {
        self.insert_node(parent, None, kind, label, origin, import)
    }

    /// Insert a new node under `parent` at `position` (appended when `None`).
    ///
    /// Children are unique by `(label, kind)`, a duplicate is dropped and
    /// reported with a warning.
    pub fn insert_node(
        &mut self,
        parent: Option<NodeId>,
        position: Option<usize>,
        kind: NodeKind,
        label: impl Into<String>,
        origin: NodeOrigin,
        import: Option<ImportInfo>,
    ) -> Result<NodeId, DuplicateChild> {
        let label = label.into();
        if let Some(parent) = parent {
            if self.find_child(parent, kind, &label).is_some() {
                warn!(
                    module = origin.module.as_str(),
                    parent = %parent,
                    kind = %kind,
                    label = label.as_str(),
                    "dropping duplicate schema node"
                );
                return Err(DuplicateChild {
                    parent: Some(parent),
                    kind,
                    label,
                });
            }
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(SchemaNode {
            id,
            label,
            kind,
            origin,
            import,
            children: vec![],
            parent,
        });
        if let Some(parent) = parent {
            let siblings = &mut self.nodes[parent.0].children;
            let position = position.unwrap_or(siblings.len()).min(siblings.len());
            siblings.insert(position, id);
        }
        Ok(id)
    }

    /// Unlink `child` from `parent`, returning its former position.
    ///
    /// The node stays in the arena but is no longer reachable from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Option<usize> {
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings.iter().position(|x| *x == child)?;
        siblings.remove(position);
        self.nodes[child.0].parent = None;
        Some(position)
    }

    /// Deep copy of the subtree rooted at `id`
    pub fn detached(&self, id: NodeId) -> DetachedNode {
        let node = self.node(id);
        DetachedNode {
            label: node.label.clone(),
            kind: node.kind,
            origin: node.origin.clone(),
            import: node.import.clone(),
            children: node
                .children
                .iter()
                .map(|child| self.detached(*child))
                .collect(),
        }
    }

    /// Add a copy of `subtree` under `parent` at `position`.
    ///
    /// Only the subtree root reports a duplicate as an error, duplicates
    /// further down are dropped (with a warning) while the rest is kept.
    pub fn attach(
        &mut self,
        parent: Option<NodeId>,
        position: Option<usize>,
        subtree: &DetachedNode,
    ) -> Result<NodeId, DuplicateChild> {
        let id = self.insert_node(
            parent,
            position,
            subtree.kind,
            subtree.label.clone(),
            subtree.origin.clone(),
            subtree.import.clone(),
        )?;
        for child in &subtree.children {
            let _ = self.attach(Some(id), None, child);
        }
        Ok(id)
    }

    /// Pre-order traversal of the subtree rooted at `id`, `id` included
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut acc = vec![];
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            acc.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        acc
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaNode> {
        self.nodes.iter()
    }
}

impl Index<NodeId> for SchemaArena {
    type Output = SchemaNode;

    fn index(&self, index: NodeId) -> &Self::Output {
        self.node(index)
    }
}
