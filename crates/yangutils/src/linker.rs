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

//! Links a set of parsed modules into a single schema forest.
//!
//! Linking inlines `uses` and non built-in `type` references and then
//! applies every `augment` onto the resulting forest. The input modules are
//! never modified.

use crate::{
    module::{Import, Module},
    path::{search_roots, split_qualified, translate, PathElement},
    restriction::is_builtin_type,
    tree::{DetachedNode, NodeId, NodeKind, NodeRole, SchemaArena},
};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Upper bound of definitions spliced under a single parent
const MAX_EXPANSIONS_PER_PARENT: usize = 256;

/// Upper bound of nesting while resolving, guards against groupings that
/// (indirectly) use themselves
const MAX_RESOLVE_DEPTH: usize = 64;

/// Module metadata kept after linking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub revision: Option<String>,
    pub namespace: String,
    pub prefix: String,
    pub imports: Vec<Import>,
}

impl ModuleInfo {
    fn from_module(module: &Module) -> Self {
        Self {
            name: module.name().to_string(),
            revision: module.revision().map(ToString::to_string),
            namespace: module.namespace().to_string(),
            prefix: module.prefix().to_string(),
            imports: module.imports(),
        }
    }

    pub fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        if prefix == self.prefix {
            return Some(self.name.clone());
        }
        self.imports
            .iter()
            .find(|x| x.prefix == prefix)
            .map(|x| x.module.clone())
    }
}

/// The linked schema forest
#[derive(Debug, Clone, Default)]
pub struct LinkedSchema {
    arena: SchemaArena,
    roots: Vec<NodeId>,
    identities: Vec<NodeId>,
    modules: Vec<ModuleInfo>,
}

impl LinkedSchema {
    pub const fn arena(&self) -> &SchemaArena {
        &self.arena
    }

    /// UI visible top-level nodes of every module
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn identities(&self) -> &[NodeId] {
        &self.identities
    }

    pub fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules.iter().find(|x| x.name == name)
    }

    pub fn root(&self, module: &str, name: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|x| self.arena[*x].module() == module && self.arena[*x].label() == name)
    }

    /// Find a node by a path whose prefixes are module names
    pub fn find(&self, path: &str, default_module: Option<&str>) -> Option<NodeId> {
        let path = translate(path, |_| None, default_module);
        search_roots(&self.arena, &self.roots, &path)
    }

    /// Identities whose `base` chain reaches the identity `base`, which is
    /// resolved with the prefixes of `module`
    pub fn derived_identities(&self, module: &str, base: &str) -> Vec<NodeId> {
        let (module, name) = match split_qualified(base) {
            (Some(prefix), name) => {
                let Some(resolved) = self.module(module).and_then(|x| x.resolve_prefix(prefix))
                else {
                    return vec![];
                };
                (resolved, name)
            }
            (None, name) => (module.to_string(), name),
        };
        self.derived_from((module, name.to_string()))
    }

    /// Identities derived from the identity a linked `base` node refers to
    pub fn derived_from_base(&self, base: NodeId) -> Vec<NodeId> {
        self.derived_from(self.base_target(base))
    }

    /// Linked `base` labels are qualified with the defining module's name
    fn base_target(&self, base: NodeId) -> (String, String) {
        let node = &self.arena[base];
        match split_qualified(node.label()) {
            (Some(module), name) => (module.to_string(), name.to_string()),
            (None, name) => (node.module().to_string(), name.to_string()),
        }
    }

    fn derived_from(&self, target: (String, String)) -> Vec<NodeId> {
        let mut acc = vec![];
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([target]);
        while let Some(current) = queue.pop_front() {
            for identity in &self.identities {
                let node = &self.arena[*identity];
                let derived = self
                    .arena
                    .children_of_kind(*identity, NodeKind::Base)
                    .any(|x| self.base_target(x) == current);
                let key = (node.module().to_string(), node.label().to_string());
                if derived && seen.insert(key.clone()) {
                    acc.push(*identity);
                    queue.push_back(key);
                }
            }
        }
        acc
    }
}

/// Module that defines `name` when referenced from `context_module`
fn definition_module<'a>(
    modules: &'a [Module],
    context_module: &str,
    reference: &str,
) -> Option<(&'a Module, String)> {
    let context = modules.iter().find(|x| x.name() == context_module)?;
    let (module_name, name) = match split_qualified(reference) {
        (Some(prefix), name) => (context.resolve_prefix(prefix)?, name),
        (None, name) => (context.name().to_string(), name),
    };
    let module = modules.iter().find(|x| x.name() == module_name)?;
    Some((module, name.to_string()))
}

/// Rewrite `base` labels to `<module>:<name>`, resolving prefixes in the
/// module each statement was defined in
fn qualify_bases(sources: &[Module], node: &mut DetachedNode) {
    if node.kind == NodeKind::Base {
        let context = sources.iter().find(|x| x.name() == node.origin.module);
        let resolved = match split_qualified(&node.label) {
            (Some(prefix), name) => context
                .and_then(|x| x.resolve_prefix(prefix))
                .map(|module| format!("{module}:{name}")),
            (None, name) => Some(format!("{}:{name}", node.origin.module)),
        };
        match resolved {
            Some(label) => node.label = label,
            None => warn!(
                module = node.origin.module.as_str(),
                base = node.label.as_str(),
                "unresolved identity base prefix"
            ),
        }
    }
    for child in &mut node.children {
        qualify_bases(sources, child);
    }
}

/// Replace `type` node `id` by the `type` of the typedef it refers to.
///
/// Range and length restrictions of the reference replace the typedef's
/// own, patterns are added to the typedef's.
fn resolve_typedef(
    sources: &[Module],
    arena: &SchemaArena,
    id: NodeId,
) -> Option<DetachedNode> {
    let node = &arena[id];
    let (module, name) = definition_module(sources, node.module(), node.label())?;
    let typedef = module.find_definition(NodeKind::Typedef, &name)?;
    let base_type = module
        .arena()
        .children_of_kind(typedef, NodeKind::Type)
        .next()?;
    let mut replacement = module.arena().detached(base_type);
    for child in node.children() {
        let restriction = arena.detached(*child);
        match restriction.kind {
            NodeKind::Range | NodeKind::Length => {
                replacement.children.retain(|x| x.kind != restriction.kind);
                replacement.children.push(restriction);
            }
            NodeKind::Pattern => replacement.children.push(restriction),
            _ => {}
        }
    }
    Some(replacement)
}

fn resolve_grouping(sources: &[Module], arena: &SchemaArena, id: NodeId) -> Option<Vec<DetachedNode>> {
    let node = &arena[id];
    let (module, name) = definition_module(sources, node.module(), node.label())?;
    let grouping = module.find_definition(NodeKind::Grouping, &name)?;
    Some(
        module
            .arena()
            .children(grouping)
            .iter()
            .map(|x| module.arena().detached(*x))
            .collect(),
    )
}

/// Inline `uses` and `type` references below `parent`
fn resolve_children(sources: &[Module], arena: &mut SchemaArena, parent: NodeId, depth: usize) {
    if depth > MAX_RESOLVE_DEPTH {
        warn!(
            module = arena[parent].module(),
            node = arena[parent].label(),
            "maximum resolve depth exceeded, leaving subtree unresolved"
        );
        return;
    }
    let mut index = 0;
    let mut expansions = 0;
    while let Some(child) = arena.children(parent).get(index).copied() {
        let kind = arena[child].kind();
        let replacement = match kind {
            NodeKind::Uses => match resolve_grouping(sources, arena, child) {
                Some(nodes) => Some(nodes),
                None => {
                    warn!(
                        module = arena[child].module(),
                        grouping = arena[child].label(),
                        "unresolved grouping reference"
                    );
                    None
                }
            },
            NodeKind::Type if !is_builtin_type(split_qualified(arena[child].label()).1) => {
                match resolve_typedef(sources, arena, child) {
                    Some(node) => Some(vec![node]),
                    None => {
                        warn!(
                            module = arena[child].module(),
                            type_name = arena[child].label(),
                            "unresolved typedef reference"
                        );
                        None
                    }
                }
            }
            _ => None,
        };
        match replacement {
            Some(nodes) if expansions < MAX_EXPANSIONS_PER_PARENT => {
                expansions += 1;
                let position = arena.remove_child(parent, child).unwrap_or(index);
                for (offset, node) in nodes.iter().enumerate() {
                    let _ = arena.attach(Some(parent), Some(position + offset), node);
                }
                // spliced nodes may hold references themselves, retry this index
            }
            Some(_) => {
                warn!(
                    module = arena[parent].module(),
                    node = arena[parent].label(),
                    "too many expansions under a single node"
                );
                index += 1;
            }
            None => {
                if !kind.is_terminal() && !matches!(kind, NodeKind::Uses) {
                    resolve_children(sources, arena, child, depth + 1);
                }
                index += 1;
            }
        }
    }
}

/// An augment ready to be applied onto the linked forest
#[derive(Debug, Clone)]
struct PendingAugment {
    module: String,
    raw_target: String,
    target: Vec<PathElement>,
    body: DetachedNode,
}

/// Apply augments in the given order, returns how many found their target
fn apply_augments(schema: &mut LinkedSchema, pending: &[PendingAugment]) -> usize {
    let mut applied = 0;
    for augment in pending {
        let Some(target) = search_roots(&schema.arena, &schema.roots, &augment.target) else {
            warn!(
                module = augment.module.as_str(),
                target = augment.raw_target.as_str(),
                "augment target not found, dropping augment"
            );
            continue;
        };
        for child in &augment.body.children {
            let _ = schema.arena.attach(Some(target), None, child);
        }
        applied += 1;
    }
    applied
}

/// Link `modules` into a single schema forest
pub fn link(modules: &[Module]) -> LinkedSchema {
    let mut schema = LinkedSchema {
        modules: modules.iter().map(ModuleInfo::from_module).collect(),
        ..Default::default()
    };
    let mut pending = vec![];

    for module in modules {
        let mut working = module.clone();
        let resolvable = working
            .top_level()
            .iter()
            .copied()
            .filter(|x| {
                let kind = working.arena()[*x].kind();
                kind.role() == NodeRole::UiDisplay || kind == NodeKind::Augment
            })
            .collect::<Vec<_>>();
        for id in resolvable {
            resolve_children(modules, working.arena_mut(), id, 0);
        }

        for id in working.roots() {
            let kind = working.arena()[id].kind();
            if kind.role() == NodeRole::LinkTarget {
                continue;
            }
            let mut copy = working.arena().detached(id);
            qualify_bases(modules, &mut copy);
            copy.stamp_module(working.name());
            let Ok(root) = schema.arena.attach(None, None, &copy) else {
                continue;
            };
            if kind == NodeKind::Identity {
                schema.identities.push(root);
            } else {
                schema.roots.push(root);
            }
        }

        for id in working.augments() {
            let Some(target) = working.augment_target_path(*id) else {
                continue;
            };
            let mut body = working.arena().detached(*id);
            qualify_bases(modules, &mut body);
            body.stamp_module(working.name());
            pending.push(PendingAugment {
                module: working.name().to_string(),
                raw_target: body.label.clone(),
                target,
                body,
            });
        }
    }

    // chained augments target nodes added by shorter augments
    pending.sort_by_key(|x| x.target.len());
    let applied = apply_augments(&mut schema, &pending);
    info!(
        modules = modules.len(),
        roots = schema.roots.len(),
        augments = pending.len(),
        applied,
        "linked schema"
    );
    debug!(nodes = schema.arena.len(), "linked schema arena size");
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{restriction::TypeRestrictions, tree::ImportInfo, yin::parse_module};

    fn module(name: &str, prefix: &str) -> Module {
        Module::new(name, format!("urn:{name}"), prefix, None)
    }

    fn labels(arena: &SchemaArena, parent: NodeId) -> Vec<String> {
        arena
            .children(parent)
            .iter()
            .map(|x| format!("{}:{}", arena[*x].kind(), arena[*x].label()))
            .collect()
    }

    #[test]
    fn test_uses_splices_grouping() {
        let mut base = module("base", "b");
        let grouping = base.add_statement(None, NodeKind::Grouping, "endpoint", None).unwrap();
        base.add_statement(Some(grouping), NodeKind::Leaf, "ip", None).unwrap();
        base.add_statement(Some(grouping), NodeKind::Leaf, "port", None).unwrap();
        let root = base.add_statement(None, NodeKind::Container, "server", None).unwrap();
        base.add_statement(Some(root), NodeKind::Leaf, "name", None).unwrap();
        base.add_statement(Some(root), NodeKind::Uses, "b:endpoint", None).unwrap();
        base.add_statement(Some(root), NodeKind::Leaf, "enabled", None).unwrap();
        let pristine = base.clone();

        let schema = link(&[base.clone()]);
        // the input is untouched
        assert_eq!(base, pristine);
        let server = schema.root("base", "server").unwrap();
        assert_eq!(
            labels(schema.arena(), server),
            vec!["leaf:name", "leaf:ip", "leaf:port", "leaf:enabled"]
        );
        // groupings aren't part of the forest
        assert_eq!(schema.roots().len(), 1);
    }

    #[test]
    fn test_uses_across_modules_and_nested() {
        let mut types = module("types", "t");
        let inner = types.add_statement(None, NodeKind::Grouping, "inner", None).unwrap();
        types.add_statement(Some(inner), NodeKind::Leaf, "deep", None).unwrap();
        let outer = types.add_statement(None, NodeKind::Grouping, "outer", None).unwrap();
        let c = types.add_statement(Some(outer), NodeKind::Container, "wrap", None).unwrap();
        // unqualified, resolved in the grouping's own module
        types.add_statement(Some(c), NodeKind::Uses, "inner", None).unwrap();

        let mut main = module("main", "m");
        main.add_statement(
            None,
            NodeKind::Import,
            "types",
            Some(ImportInfo {
                prefix: "tp".to_string(),
                revision_date: None,
            }),
        )
        .unwrap();
        let root = main.add_statement(None, NodeKind::Container, "top", None).unwrap();
        main.add_statement(Some(root), NodeKind::Uses, "tp:outer", None).unwrap();

        let schema = link(&[types, main]);
        let deep = schema.find("/main:top/main:wrap/main:deep", None).unwrap();
        // stamped with the owning module
        assert_eq!(schema.arena()[deep].module(), "main");
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_unresolved_and_recursive_grouping() {
        let mut m = module("m", "m");
        let g = m.add_statement(None, NodeKind::Grouping, "loop", None).unwrap();
        m.add_statement(Some(g), NodeKind::Uses, "loop", None).unwrap();
        let root = m.add_statement(None, NodeKind::Container, "top", None).unwrap();
        m.add_statement(Some(root), NodeKind::Uses, "missing", None).unwrap();
        m.add_statement(Some(root), NodeKind::Uses, "loop", None).unwrap();
        m.add_statement(Some(root), NodeKind::Leaf, "after", None).unwrap();

        let schema = link(&[m]);
        let top = schema.root("m", "top").unwrap();
        let children = labels(schema.arena(), top);
        assert_eq!(children.first().map(String::as_str), Some("uses:missing"));
        assert_eq!(children.last().map(String::as_str), Some("leaf:after"));
        assert!(logs_contain("unresolved grouping reference"));
        assert!(logs_contain("too many expansions under a single node"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_duplicate_grouping_leaf_keeps_first() {
        let mut m = module("m", "m");
        let first = m.add_statement(None, NodeKind::Grouping, "first", None).unwrap();
        let leaf = m.add_statement(Some(first), NodeKind::Leaf, "x", None).unwrap();
        m.add_statement(Some(leaf), NodeKind::Type, "string", None).unwrap();
        let second = m.add_statement(None, NodeKind::Grouping, "second", None).unwrap();
        let leaf = m.add_statement(Some(second), NodeKind::Leaf, "x", None).unwrap();
        m.add_statement(Some(leaf), NodeKind::Type, "uint8", None).unwrap();
        let root = m.add_statement(None, NodeKind::Container, "top", None).unwrap();
        m.add_statement(Some(root), NodeKind::Uses, "first", None).unwrap();
        m.add_statement(Some(root), NodeKind::Uses, "second", None).unwrap();

        let schema = link(&[m]);
        let arena = schema.arena();
        let top = schema.root("m", "top").unwrap();
        assert_eq!(labels(arena, top), vec!["leaf:x"]);
        let x = arena.find_child(top, NodeKind::Leaf, "x").unwrap();
        let ty = arena.children_of_kind(x, NodeKind::Type).next().unwrap();
        assert_eq!(arena[ty].label(), "string");
        assert!(logs_contain("dropping duplicate schema node"));
    }

    #[test]
    fn test_typedef_resolution_carries_restrictions() {
        let mut m = module("m", "m");
        let td = m.add_statement(None, NodeKind::Typedef, "port-number", None).unwrap();
        let ty = m.add_statement(Some(td), NodeKind::Type, "uint16", None).unwrap();
        m.add_statement(Some(ty), NodeKind::Range, "0..65535", None).unwrap();
        let td2 = m.add_statement(None, NodeKind::Typedef, "service-port", None).unwrap();
        m.add_statement(Some(td2), NodeKind::Type, "port-number", None).unwrap();

        let root = m.add_statement(None, NodeKind::Container, "top", None).unwrap();
        let leaf = m.add_statement(Some(root), NodeKind::Leaf, "port", None).unwrap();
        let leaf_type = m.add_statement(Some(leaf), NodeKind::Type, "m:service-port", None).unwrap();
        m.add_statement(Some(leaf_type), NodeKind::Range, "1024..2048", None).unwrap();

        let schema = link(&[m]);
        let port = schema.find("/m:top/m:port", None).unwrap();
        let arena = schema.arena();
        let resolved = arena.children_of_kind(port, NodeKind::Type).next().unwrap();
        assert_eq!(arena[resolved].label(), "uint16");
        assert_eq!(labels(arena, resolved), vec!["range:1024..2048"]);
    }

    fn augment_fixture() -> (LinkedSchema, Vec<PendingAugment>) {
        let mut base = module("base", "b");
        base.add_statement(None, NodeKind::Container, "top", None).unwrap();
        let mut ext = module("ext", "e");
        ext.add_statement(
            None,
            NodeKind::Import,
            "base",
            Some(ImportInfo {
                prefix: "b".to_string(),
                revision_date: None,
            }),
        )
        .unwrap();
        let second = ext
            .add_statement(None, NodeKind::Augment, "/b:top/e:extension", None)
            .unwrap();
        ext.add_statement(Some(second), NodeKind::Leaf, "nested", None).unwrap();
        let first = ext.add_statement(None, NodeKind::Augment, "/b:top", None).unwrap();
        ext.add_statement(Some(first), NodeKind::Container, "extension", None).unwrap();

        let schema = link(&[base.clone(), ext.clone()]);
        let mut pending = vec![];
        for id in ext.augments() {
            pending.push(PendingAugment {
                module: "ext".to_string(),
                raw_target: ext.arena()[*id].label().to_string(),
                target: ext.augment_target_path(*id).unwrap(),
                body: {
                    let mut body = ext.arena().detached(*id);
                    body.stamp_module("ext");
                    body
                },
            });
        }
        (schema, pending)
    }

    #[test]
    fn test_chained_augments_sorted() {
        let (schema, _) = augment_fixture();
        // declared longest first, still applied
        let nested = schema.find("/base:top/ext:extension/ext:nested", None);
        assert!(nested.is_some());
        assert_eq!(schema.arena()[nested.unwrap()].module(), "ext");
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_chained_augments_reverse_order_fails() {
        let (linked, mut pending) = augment_fixture();
        let mut schema = LinkedSchema {
            modules: linked.modules.clone(),
            ..Default::default()
        };
        let mut base = module("base", "b");
        base.add_statement(None, NodeKind::Container, "top", None).unwrap();
        let top = schema
            .arena
            .attach(None, None, &base.arena().detached(base.roots()[0]))
            .unwrap();
        schema.roots.push(top);

        pending.sort_by_key(|x| std::cmp::Reverse(x.target.len()));
        assert_eq!(apply_augments(&mut schema, &pending), 1);
        assert!(logs_contain("augment target not found"));
        assert!(schema.find("/base:top/ext:extension", None).is_some());
        assert!(schema.find("/base:top/ext:extension/ext:nested", None).is_none());
    }

    #[test]
    fn test_derived_identities() {
        let doc = r#"<module name="sft" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
  <namespace uri="urn:sft"/>
  <prefix value="sft"/>
  <identity name="service-function-type-identity"/>
  <identity name="firewall"><base name="service-function-type-identity"/></identity>
  <identity name="stateful-firewall"><base name="sft:firewall"/></identity>
  <identity name="dpi"><base name="sft:service-function-type-identity"/></identity>
  <identity name="unrelated"/>
</module>"#;
        let schema = link(&[parse_module(doc).unwrap()]);
        let derived = schema
            .derived_identities("sft", "service-function-type-identity")
            .into_iter()
            .map(|x| schema.arena()[x].label().to_string())
            .collect::<Vec<_>>();
        assert_eq!(derived, vec!["firewall", "dpi", "stateful-firewall"]);
        assert!(schema.derived_identities("sft", "x:missing").is_empty());
    }
    #[test]
    fn test_identityref_base_from_imported_grouping() {
        let sft = r#"<module name="service-function-type" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
  <namespace uri="urn:sft"/>
  <prefix value="sfc-sft"/>
  <identity name="sf-type"/>
  <identity name="firewall"><base name="sf-type"/></identity>
  <grouping name="typed">
    <leaf name="type">
      <type name="identityref"><base name="sfc-sft:sf-type"/></type>
    </leaf>
  </grouping>
</module>"#;
        let sf = r#"<module name="service-function" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
  <namespace uri="urn:sf"/>
  <prefix value="sfc-sf"/>
  <import module="service-function-type"><prefix value="t"/></import>
  <container name="service-function">
    <uses name="t:typed"/>
  </container>
</module>"#;
        let schema = link(&[parse_module(sft).unwrap(), parse_module(sf).unwrap()]);
        let arena = schema.arena();
        let container = schema.root("service-function", "service-function").unwrap();
        let leaf = arena.find_child(container, NodeKind::Leaf, "type").unwrap();
        assert_eq!(arena[leaf].module(), "service-function");
        let ty = arena.children_of_kind(leaf, NodeKind::Type).next().unwrap();
        let base = arena.children_of_kind(ty, NodeKind::Base).next().unwrap();
        assert_eq!(arena[base].label(), "service-function-type:sf-type");

        let restrictions = TypeRestrictions::compile(&schema, ty);
        assert!(restrictions.check("firewall").is_ok());
        assert!(restrictions.check("t:firewall").is_ok());
        assert!(restrictions.check("not-an-identity").is_err());
    }
}
