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

//! Schema path translation and lookup.
//!
//! Paths are slash delimited sequences of `module:name` (or bare `name`)
//! steps. List steps in REST path templates are followed by one or more
//! `{key}` placeholders which are attached to the list step instead of
//! being treated as steps on their own.

use crate::tree::{NodeId, NodeKind, SchemaArena, SchemaNode};
use std::fmt;
use tracing::debug;

pub const PARENT_STEP: &str = "..";

/// One step of a schema path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    module: Option<String>,
    name: String,
    identifier_names: Vec<String>,
}

impl PathElement {
    pub fn new(module: Option<String>, name: impl Into<String>) -> Self {
        Self {
            module,
            name: name.into(),
            identifier_names: vec![],
        }
    }

    /// Build from a `module:name` pair, a bare `name` has no module
    pub fn from_qualified(value: &str) -> Self {
        match split_qualified(value) {
            (Some(module), name) => Self::new(Some(module.to_string()), name),
            (None, name) => Self::new(None, name),
        }
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the first list key placeholder attached to this step
    pub fn identifier_name(&self) -> Option<&str> {
        self.identifier_names.first().map(String::as_str)
    }

    pub fn identifier_names(&self) -> &[String] {
        &self.identifier_names
    }

    pub fn is_parent_step(&self) -> bool {
        self.name == PARENT_STEP
    }

    pub fn matches(&self, node: &SchemaNode) -> bool {
        node.label() == self.name && self.module.as_deref().map_or(true, |m| m == node.module())
    }

    fn push_identifier(&mut self, identifier: &str) {
        self.identifier_names.push(identifier.to_string());
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{module}:")?;
        }
        write!(f, "{}", self.name)?;
        for identifier in &self.identifier_names {
            write!(f, "/{{{identifier}}}")?;
        }
        Ok(())
    }
}

/// Format a full path the way it's written in REST templates
pub fn path_to_string(path: &[PathElement]) -> String {
    let mut acc = String::new();
    for elem in path {
        acc.push('/');
        acc.push_str(&elem.to_string());
    }
    acc
}

/// Split `prefix:name` into its parts
pub fn split_qualified(value: &str) -> (Option<&str>, &str) {
    match value.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, value),
    }
}

fn identifier_segment(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|x| x.strip_suffix('}'))
}

/// Translate a slash delimited path into [`PathElement`]s.
///
/// `prefix_converter` maps a prefix to a module name, an unknown prefix is
/// kept verbatim as the module name. Unqualified steps always take
/// `default_module`, a module named by an earlier step is not carried over.
pub fn translate<F>(path: &str, prefix_converter: F, default_module: Option<&str>) -> Vec<PathElement>
where
    F: Fn(&str) -> Option<String>,
{
    let mut acc: Vec<PathElement> = vec![];
    for segment in path.split('/').map(str::trim).filter(|x| !x.is_empty()) {
        if let Some(identifier) = identifier_segment(segment) {
            match acc.last_mut() {
                Some(last) => last.push_identifier(identifier),
                None => debug!(path, identifier, "list identifier without a list step"),
            }
            continue;
        }
        if segment == PARENT_STEP {
            acc.push(PathElement::new(None, PARENT_STEP));
            continue;
        }
        let elem = match split_qualified(segment) {
            (Some(prefix), name) => {
                let module = prefix_converter(prefix).unwrap_or_else(|| prefix.to_string());
                PathElement::new(Some(module), name)
            }
            (None, name) => PathElement::new(default_module.map(ToString::to_string), name),
        };
        acc.push(elem);
    }
    acc
}

/// Collect the candidates matching `elem` among `candidates`.
///
/// Only data nodes are candidates, a list's `key` statement shares its
/// label with the key leaf. Data paths omit `choice` and `case` nodes, so
/// when nothing matches directly the search descends through them.
fn find_matches(arena: &SchemaArena, candidates: &[NodeId], elem: &PathElement) -> Vec<NodeId> {
    let direct = candidates
        .iter()
        .copied()
        .filter(|x| arena[*x].kind().is_ui_visible() && elem.matches(&arena[*x]))
        .collect::<Vec<_>>();
    if !direct.is_empty() {
        return direct;
    }
    candidates
        .iter()
        .copied()
        .filter(|x| matches!(arena[*x].kind(), NodeKind::Choice | NodeKind::Case))
        .flat_map(|x| find_matches(arena, arena.children(x), elem))
        .collect()
}

fn step(
    arena: &SchemaArena,
    current: Option<NodeId>,
    roots: &[NodeId],
    elem: &PathElement,
) -> Option<NodeId> {
    if elem.is_parent_step() {
        return current.and_then(|x| arena.parent(x));
    }
    let candidates = match current {
        Some(node) => arena.children(node),
        None => roots,
    };
    let matches = find_matches(arena, candidates, elem);
    match matches.as_slice() {
        [found] => Some(*found),
        [] => {
            debug!(step = %elem, "no schema node matches path step");
            None
        }
        _ => {
            debug!(step = %elem, count = matches.len(), "ambiguous path step");
            None
        }
    }
}

/// Follow `path` starting from the children of `start`
pub fn search(arena: &SchemaArena, start: NodeId, path: &[PathElement]) -> Option<NodeId> {
    let mut current = start;
    for elem in path {
        current = step(arena, Some(current), &[], elem)?;
    }
    Some(current)
}

/// Follow `path` where the first step is matched against `roots`
pub fn search_roots(arena: &SchemaArena, roots: &[NodeId], path: &[PathElement]) -> Option<NodeId> {
    let (first, rest) = path.split_first()?;
    let start = step(arena, None, roots, first)?;
    search(arena, start, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeOrigin;

    fn converter(prefix: &str) -> Option<String> {
        match prefix {
            "sf" => Some("service-function".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_translate_with_identifiers() {
        let path = translate("/module:list/{key}/module:leaf", converter, None);
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].module(), Some("module"));
        assert_eq!(path[0].name(), "list");
        assert_eq!(path[0].identifier_name(), Some("key"));
        assert_eq!(path[1].name(), "leaf");
        assert_eq!(path[1].identifier_name(), None);
    }

    #[test]
    fn test_translate_prefix_and_default_module() {
        let path = translate("/sf:service-functions/service-function", converter, Some("base"));
        assert_eq!(
            path,
            vec![
                PathElement::new(Some("service-function".to_string()), "service-functions"),
                // the module of the previous step is not carried over
                PathElement::new(Some("base".to_string()), "service-function"),
            ]
        );
        let unknown = translate("/x:a", converter, None);
        assert_eq!(unknown[0].module(), Some("x"));
    }

    #[test]
    fn test_translate_composite_keys_and_parent() {
        let path = translate("a/{k1}/{k2}/../b", |_| None, None);
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].identifier_names(), &["k1".to_string(), "k2".to_string()]);
        assert!(path[1].is_parent_step());
        assert_eq!(path_to_string(&path), "/a/{k1}/{k2}/../b");
    }

    #[test]
    fn test_from_qualified() {
        let elem = PathElement::from_qualified("service-function:service-functions");
        assert_eq!(elem.module(), Some("service-function"));
        assert_eq!(elem.name(), "service-functions");
        assert_eq!(PathElement::from_qualified("name").module(), None);
    }

    fn sample_arena() -> (SchemaArena, NodeId, NodeId, NodeId) {
        let origin = NodeOrigin::new("m", "urn:m");
        let mut arena = SchemaArena::new();
        let root = arena
            .add_node(None, NodeKind::Container, "top", origin.clone(), None)
            .unwrap();
        let choice = arena
            .add_node(Some(root), NodeKind::Choice, "transport", origin.clone(), None)
            .unwrap();
        let case = arena
            .add_node(Some(choice), NodeKind::Case, "vxlan", origin.clone(), None)
            .unwrap();
        let leaf = arena
            .add_node(Some(case), NodeKind::Leaf, "vni", origin.clone(), None)
            .unwrap();
        (arena, root, case, leaf)
    }

    #[test]
    fn test_search_with_parent_step_and_choice() {
        let (arena, root, case, leaf) = sample_arena();
        // schema path names choice and case explicitly
        let schema_path = translate("/m:top/transport/vxlan/vni", |_| None, None);
        assert_eq!(search_roots(&arena, &[root], &schema_path), Some(leaf));
        // data path skips them
        let data_path = translate("/m:top/m:vni", |_| None, None);
        assert_eq!(search_roots(&arena, &[root], &data_path), Some(leaf));

        let up = vec![PathElement::new(None, PARENT_STEP)];
        assert_eq!(search(&arena, leaf, &up), Some(case));
    }

    #[test]
    fn test_search_key_leaf() {
        let origin = NodeOrigin::new("service-function", "urn:sf");
        let mut arena = SchemaArena::new();
        let root = arena
            .add_node(None, NodeKind::Container, "service-functions", origin.clone(), None)
            .unwrap();
        let list = arena
            .add_node(Some(root), NodeKind::List, "service-function", origin.clone(), None)
            .unwrap();
        arena
            .add_node(Some(list), NodeKind::Key, "name", origin.clone(), None)
            .unwrap();
        let leaf = arena
            .add_node(Some(list), NodeKind::Leaf, "name", origin.clone(), None)
            .unwrap();
        let path = translate(
            "/sf:service-functions/sf:service-function/sf:name",
            converter,
            None,
        );
        assert_eq!(search_roots(&arena, &[root], &path), Some(leaf));
    }

    #[test]
    fn test_search_not_found() {
        let (arena, root, _, _) = sample_arena();
        let path = translate("/m:top/other", |_| None, None);
        assert_eq!(search_roots(&arena, &[root], &path), None);
        let wrong_module = translate("/x:top", |_| None, None);
        assert_eq!(search_roots(&arena, &[root], &wrong_module), None);
        assert_eq!(search_roots(&arena, &[root], &[]), None);
    }
}
