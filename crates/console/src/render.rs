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

//! Plain text views of a linked schema and its APIs.

use sfc_yangutils::{api::Api, LinkedSchema, NodeId, NodeKind};
use std::fmt;

/// Indented tree of the UI visible nodes, optionally limited to the roots of
/// one module
pub struct SchemaTreeView<'a> {
    schema: &'a LinkedSchema,
    module: Option<&'a str>,
}

impl<'a> SchemaTreeView<'a> {
    pub const fn new(schema: &'a LinkedSchema, module: Option<&'a str>) -> Self {
        Self { schema, module }
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let arena = self.schema.arena();
        let node = &arena[id];
        let parent_module = node.parent().map(|x| arena[x].module());
        write!(f, "{:indent$}{} ", "", node.kind(), indent = depth * 2)?;
        if parent_module != Some(node.module()) {
            write!(f, "{}:", node.module())?;
        }
        write!(f, "{}", node.label())?;
        match node.kind() {
            NodeKind::List => {
                let keys = arena
                    .children_of_kind(id, NodeKind::Key)
                    .map(|x| arena[x].label())
                    .collect::<Vec<_>>();
                if !keys.is_empty() {
                    write!(f, " [{}]", keys.join(" "))?;
                }
            }
            NodeKind::Leaf | NodeKind::LeafList => {
                if let Some(ty) = arena.children_of_kind(id, NodeKind::Type).next() {
                    write!(f, ": {}", arena[ty].label())?;
                }
            }
            _ => {}
        }
        writeln!(f)?;
        for child in arena.children(id) {
            if arena[*child].kind().is_ui_visible() {
                self.write_node(f, *child, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for SchemaTreeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.schema.arena();
        for root in self.schema.roots() {
            if self.module.is_some_and(|x| x != arena[*root].module()) {
                continue;
            }
            self.write_node(f, *root, 0)?;
        }
        Ok(())
    }
}

/// One line per sub-API with its operations and resolved schema node
pub struct ApiView<'a> {
    apis: &'a [Api],
    schema: &'a LinkedSchema,
}

impl<'a> ApiView<'a> {
    pub const fn new(apis: &'a [Api], schema: &'a LinkedSchema) -> Self {
        Self { apis, schema }
    }
}

impl fmt::Display for ApiView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for api in self.apis {
            match &api.revision {
                Some(revision) => writeln!(f, "{}@{revision}", api.module)?,
                None => writeln!(f, "{}", api.module)?,
            }
            for sub in &api.sub_apis {
                let storage = sub.storage().map(|x| x.to_string()).unwrap_or_default();
                write!(
                    f,
                    "  {:<12}{:<24}{}",
                    storage,
                    sub.operations().join(","),
                    sub.relative_path()
                )?;
                match sub.node() {
                    Some(node) => {
                        let node = &self.schema.arena()[node];
                        writeln!(f, " -> {} {}:{}", node.kind(), node.module(), node.label())?
                    }
                    None => writeln!(f, " -> unresolved")?,
                }
            }
        }
        Ok(())
    }
}
