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

//! Parser for the YIN (XML) representation of YANG modules.

use crate::{
    module::Module,
    tree::{ImportInfo, NodeId, NodeKind},
};
use roxmltree::{Document, Node};
use std::str::FromStr;
use tracing::{debug, trace};

pub const YIN_NAMESPACE: &str = "urn:ietf:params:xml:ns:yang:yin:1";

/// Module header statements, consumed while reading the module itself
const HEADER_TAGS: &[&str] = &[
    "namespace",
    "prefix",
    "revision",
    "yang-version",
    "organization",
    "contact",
    "reference",
];

#[derive(Debug, thiserror::Error)]
pub enum YinError {
    #[error("malformed YIN document: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("expected a `module` root element, found `{0}`")]
    NotAModule(String),

    #[error("module statement without a name")]
    MissingModuleName,
}

fn yin_child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|x| x.tag_name() == (YIN_NAMESPACE, tag).into())
}

fn yin_child_attribute(node: &Node<'_, '_>, tag: &str, attribute: &str) -> Option<String> {
    yin_child(node, tag)
        .and_then(|x| x.attribute(attribute))
        .map(ToString::to_string)
}

/// Statement argument used as the node label
fn label_of(node: &Node<'_, '_>, kind: NodeKind) -> Option<String> {
    let attribute = match kind {
        NodeKind::Key
        | NodeKind::Pattern
        | NodeKind::Range
        | NodeKind::Length
        | NodeKind::Position => "value",
        NodeKind::Augment => "target-node",
        NodeKind::Import => "module",
        // argument-less statements are labeled with their keyword
        NodeKind::Input | NodeKind::Output => return Some(kind.to_string()),
        NodeKind::Description => {
            return yin_child(node, "text")
                .and_then(|x| x.text())
                .map(|x| x.trim().to_string());
        }
        _ => "name",
    };
    node.attribute(attribute).map(ToString::to_string)
}

/// Parse a YIN document into a [`Module`]
pub fn parse_module(document: &str) -> Result<Module, YinError> {
    let doc = Document::parse(document)?;
    let root = doc.root_element();
    if root.tag_name() != (YIN_NAMESPACE, "module").into() {
        return Err(YinError::NotAModule(root.tag_name().name().to_string()));
    }
    let name = root.attribute("name").ok_or(YinError::MissingModuleName)?;
    let namespace = yin_child_attribute(&root, "namespace", "uri").unwrap_or_default();
    let prefix = yin_child_attribute(&root, "prefix", "value").unwrap_or_default();
    // revisions are listed newest first
    let revision = yin_child_attribute(&root, "revision", "date");

    let mut module = Module::new(name, namespace, prefix, revision);
    parse_children(&mut module, None, &root);
    debug!(
        module = module.name(),
        statements = module.arena().len(),
        "parsed YIN module"
    );
    Ok(module)
}

fn parse_children(module: &mut Module, parent: Option<NodeId>, node: &Node<'_, '_>) {
    for child in node.children().filter(Node::is_element) {
        let tag = child.tag_name();
        if tag.namespace() != Some(YIN_NAMESPACE) {
            trace!(
                module = module.name(),
                tag = tag.name(),
                "skipping extension statement"
            );
            continue;
        }
        if parent.is_none() && HEADER_TAGS.contains(&tag.name()) {
            continue;
        }
        let Ok(kind) = NodeKind::from_str(tag.name()) else {
            trace!(
                module = module.name(),
                tag = tag.name(),
                "skipping unsupported statement"
            );
            continue;
        };
        let Some(label) = label_of(&child, kind) else {
            debug!(
                module = module.name(),
                kind = %kind,
                "skipping statement without an argument"
            );
            continue;
        };
        let import = (kind == NodeKind::Import).then(|| ImportInfo {
            prefix: yin_child_attribute(&child, "prefix", "value").unwrap_or_default(),
            revision_date: yin_child_attribute(&child, "revision-date", "date"),
        });
        // duplicates are logged by the module and skipped with their subtree
        let Ok(id) = module.add_statement(parent, kind, label, import) else {
            continue;
        };
        if !kind.is_terminal() {
            parse_children(module, Some(id), &child);
        }
    }
}
