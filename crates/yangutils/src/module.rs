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

use crate::{
    path::{translate, PathElement},
    tree::{DuplicateChild, ImportInfo, NodeId, NodeKind, NodeOrigin, SchemaArena},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A module imported by another module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Import {
    pub module: String,
    pub prefix: String,
    pub revision_date: Option<String>,
}

/// A single parsed YANG module (before linking)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    name: String,
    revision: Option<String>,
    namespace: String,
    prefix: String,
    arena: SchemaArena,
    statements: IndexMap<NodeKind, Vec<NodeId>>,
    top_level: Vec<NodeId>,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        prefix: impl Into<String>,
        revision: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            revision,
            namespace: namespace.into(),
            prefix: prefix.into(),
            arena: SchemaArena::new(),
            statements: IndexMap::new(),
            top_level: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub const fn arena(&self) -> &SchemaArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut SchemaArena {
        &mut self.arena
    }

    /// Origin every node parsed from this module is tagged with
    pub fn origin(&self) -> NodeOrigin {
        NodeOrigin::new(&self.name, &self.namespace).with_revision(self.revision.clone())
    }

    /// Add a statement, `None` as parent registers a top-level statement.
    pub fn add_statement(
        &mut self,
        parent: Option<NodeId>,
        kind: NodeKind,
        label: impl Into<String>,
        import: Option<ImportInfo>,
    ) -> Result<NodeId, DuplicateChild> {
        let label = label.into();
        if parent.is_none() {
            let duplicate = self
                .statements(kind)
                .iter()
                .any(|x| self.arena[*x].label() == label);
            if duplicate {
                warn!(
                    module = self.name.as_str(),
                    kind = %kind,
                    label = label.as_str(),
                    "dropping duplicate top-level statement"
                );
                return Err(DuplicateChild {
                    parent: None,
                    kind,
                    label,
                });
            }
        }
        let origin = self.origin();
        let id = self.arena.add_node(parent, kind, label, origin, import)?;
        if parent.is_none() {
            self.statements.entry(kind).or_default().push(id);
            self.top_level.push(id);
        }
        Ok(id)
    }

    /// Top-level statements in document order
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    /// Top-level statements of a given kind
    pub fn statements(&self, kind: NodeKind) -> &[NodeId] {
        self.statements.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn imports(&self) -> Vec<Import> {
        self.statements(NodeKind::Import)
            .iter()
            .filter_map(|id| {
                let node = &self.arena[*id];
                node.import().map(|info| Import {
                    module: node.label().to_string(),
                    prefix: info.prefix.clone(),
                    revision_date: info.revision_date.clone(),
                })
            })
            .collect()
    }

    pub fn import_by_prefix(&self, prefix: &str) -> Option<Import> {
        self.imports().into_iter().find(|x| x.prefix == prefix)
    }

    /// Module name a prefix refers to in this module's context
    pub fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        if prefix == self.prefix {
            return Some(self.name.clone());
        }
        self.import_by_prefix(prefix).map(|x| x.module)
    }

    /// Top-level statements that may start a tree: data nodes, identities
    /// and link targets
    pub fn roots(&self) -> Vec<NodeId> {
        self.top_level
            .iter()
            .copied()
            .filter(|x| self.arena[*x].kind().is_root_candidate())
            .collect()
    }

    pub fn augments(&self) -> &[NodeId] {
        self.statements(NodeKind::Augment)
    }

    /// Target of an `augment` translated with this module's import table
    pub fn augment_target_path(&self, id: NodeId) -> Option<Vec<PathElement>> {
        let target = self.arena.get(id)?.augment_target()?;
        Some(translate(
            target,
            |prefix| self.resolve_prefix(prefix),
            Some(&self.name),
        ))
    }

    /// Look up a `grouping`, `typedef` or `identity` by name. Top-level
    /// definitions win over nested ones.
    pub fn find_definition(&self, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.statements(kind)
            .iter()
            .copied()
            .find(|x| self.arena[*x].label() == name)
            .or_else(|| {
                self.arena
                    .iter()
                    .find(|x| x.kind() == kind && x.label() == name)
                    .map(|x| x.id())
            })
    }
}
