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

use serde_json::{json, Value};
use sfc_yangforms::{FormId, FormTree};
use sfc_yangutils::{
    link,
    loader::{SchemaLoader, StaticSchemaSource},
    parse_module, LinkedSchema, NodeKind,
};
use std::sync::Arc;

const SFC_COMMON: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<module name="sfc-common" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
  <namespace uri="urn:cisco:params:xml:ns:yang:sfc-common"/>
  <prefix value="sfc-common"/>
  <revision date="2015-10-17"/>
  <typedef name="sfc-name">
    <type name="string">
      <length value="1..64"/>
    </type>
  </typedef>
  <grouping name="description-group">
    <leaf name="description">
      <type name="string"/>
    </leaf>
  </grouping>
</module>"#;

const SFC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<module name="service-function-chain" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
  <namespace uri="urn:cisco:params:xml:ns:yang:sfc-sfc"/>
  <prefix value="sfc-sfc"/>
  <import module="sfc-common">
    <prefix value="sfc-common"/>
    <revision-date date="2015-10-17"/>
  </import>
  <revision date="2014-07-01"/>
  <container name="service-function-chains">
    <list name="service-function-chain">
      <key value="name"/>
      <leaf name="name">
        <type name="sfc-common:sfc-name"/>
      </leaf>
      <leaf name="symmetric">
        <type name="boolean"/>
      </leaf>
      <uses name="sfc-common:description-group"/>
      <list name="sfc-service-function">
        <key value="name"/>
        <leaf name="name">
          <type name="string"/>
        </leaf>
        <leaf name="type">
          <type name="string"/>
        </leaf>
        <leaf name="order">
          <type name="uint8"/>
        </leaf>
      </list>
    </list>
  </container>
  <rpc name="instantiate-service-function-chain">
    <input>
      <leaf name="name">
        <type name="sfc-common:sfc-name"/>
      </leaf>
    </input>
    <output>
      <leaf name="name">
        <type name="string"/>
      </leaf>
    </output>
  </rpc>
</module>"#;

const SFC_EXT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<module name="sfc-ext" xmlns="urn:ietf:params:xml:ns:yang:yin:1">
  <namespace uri="urn:example:sfc-ext"/>
  <prefix value="ext"/>
  <import module="service-function-chain">
    <prefix value="sfc"/>
  </import>
  <augment target-node="/sfc:service-function-chains/sfc:service-function-chain">
    <leaf name="tenant">
      <type name="string"/>
    </leaf>
  </augment>
</module>"#;

fn schema() -> Arc<LinkedSchema> {
    let modules = [SFC_COMMON, SFC, SFC_EXT]
        .into_iter()
        .map(|x| parse_module(x).unwrap())
        .collect::<Vec<_>>();
    Arc::new(link(&modules))
}

fn chains(schema: Arc<LinkedSchema>) -> (FormTree, FormId) {
    let root = schema
        .root("service-function-chain", "service-function-chains")
        .unwrap();
    let mut tree = FormTree::new(schema);
    let root = tree.instantiate(root);
    (tree, root)
}

fn server_data() -> Value {
    json!({
        "service-function-chain:service-function-chains": {
            "service-function-chain": [
                {
                    "name": "sfc-web",
                    "symmetric": true,
                    "description": "web traffic",
                    "sfc-ext:tenant": "blue",
                    "sfc-service-function": [
                        {"name": "firewall", "type": "service-function-type:firewall", "order": 0},
                        {"name": "dpi", "type": "service-function-type:dpi", "order": 1},
                    ],
                },
                {
                    "name": "sfc-mail",
                    "sfc-service-function": [
                        {"name": "napt44", "type": "service-function-type:napt44", "order": 0},
                    ],
                },
            ]
        }
    })
}

#[test]
fn test_linked_schema_shape() {
    let schema = schema();
    let chain = schema
        .find(
            "/service-function-chain:service-function-chains/service-function-chain",
            None,
        )
        .unwrap();
    let arena = schema.arena();
    let labels = arena
        .children(chain)
        .iter()
        .filter(|x| arena[**x].kind().is_ui_visible())
        .map(|x| format!("{}:{}", arena[*x].module(), arena[*x].label()))
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec![
            "service-function-chain:name",
            "service-function-chain:symmetric",
            "service-function-chain:description",
            "service-function-chain:sfc-service-function",
            "sfc-ext:tenant",
        ]
    );
    assert!(arena.children_of_kind(chain, NodeKind::Uses).next().is_none());
    // groupings and typedefs are not roots
    assert_eq!(schema.roots().len(), 2);
}

#[test]
fn test_fill_then_build_round_trip() {
    let (mut tree, root) = chains(schema());
    let mut response = server_data();
    response["service-function-chain:service-function-chains"]["unknown"] = json!("dropped");
    assert!(tree.fill_from_response(root, &response));
    assert!(tree.is_filled(root));
    assert_eq!(tree.request(root), server_data());
    // building twice is stable
    assert_eq!(tree.request(root), server_data());
}

#[test]
fn test_clear_after_fill() {
    let (mut tree, root) = chains(schema());
    tree.fill_from_response(root, &server_data());
    tree.clear(root);
    assert!(!tree.is_filled(root));
    assert_eq!(tree.request(root), json!({}));
    tree.clear(root);
    assert!(!tree.is_filled(root));
    assert_eq!(tree.request(root), json!({}));
}

#[test]
fn test_edit_nested_entries() {
    let (mut tree, root) = chains(schema());
    tree.fill_from_response(root, &server_data());
    let chains = tree.find(root, "service-function-chain").unwrap();
    let template = tree.list_state(chains).unwrap().template().unwrap();
    assert_eq!(tree.value(tree.find(template, "name").unwrap()), Some("sfc-web"));

    // edit the nested list of the second chain
    tree.change_act_element_data(chains, 1).unwrap();
    let functions = tree.find(template, "sfc-service-function").unwrap();
    let function = tree.list_state(functions).unwrap().template().unwrap();
    assert_eq!(tree.value(tree.find(function, "name").unwrap()), Some("napt44"));
    tree.add_list_elem(functions).unwrap();
    tree.set_value(tree.find(function, "name").unwrap(), "ids").unwrap();
    tree.set_value(tree.find(function, "order").unwrap(), "1").unwrap();
    tree.set_value(tree.find(template, "tenant").unwrap(), "red").unwrap();

    tree.change_act_element_data(chains, 0).unwrap();
    assert_eq!(tree.value(tree.find(template, "tenant").unwrap()), Some("blue"));

    let request = tree.request(root);
    assert_eq!(
        request["service-function-chain:service-function-chains"]["service-function-chain"][1],
        json!({
            "name": "sfc-mail",
            "sfc-ext:tenant": "red",
            "sfc-service-function": [
                {"name": "napt44", "type": "service-function-type:napt44", "order": 0},
                {"name": "ids", "order": 1},
            ],
        })
    );
}

#[test]
fn test_validate_typedef_restrictions() {
    let (mut tree, root) = chains(schema());
    tree.fill_from_response(root, &server_data());
    assert!(tree.validate(root));

    let chains = tree.find(root, "service-function-chain").unwrap();
    let template = tree.list_state(chains).unwrap().template().unwrap();
    // length 1..64 comes from the sfc-name typedef
    tree.set_value(tree.find(template, "name").unwrap(), "x".repeat(65)).unwrap();
    tree.set_value(tree.find(template, "symmetric").unwrap(), "maybe").unwrap();
    assert!(!tree.validate(root));
    assert_eq!(tree.errors(tree.find(template, "name").unwrap()).len(), 1);
    assert_eq!(tree.errors(tree.find(template, "symmetric").unwrap()).len(), 1);

    tree.set_value(tree.find(template, "name").unwrap(), "sfc-mail").unwrap();
    tree.set_value(tree.find(template, "symmetric").unwrap(), "false").unwrap();
    assert!(!tree.validate(root));
    assert_eq!(tree.list_state(chains).unwrap().double_key_indexes(), &[0, 1]);
}

#[test]
fn test_rpc_input() {
    let schema = schema();
    let rpc = schema
        .root("service-function-chain", "instantiate-service-function-chain")
        .unwrap();
    let mut tree = FormTree::new(schema);
    let rpc = tree.instantiate(rpc);
    tree.set_value(tree.find(rpc, "input/name").unwrap(), "sfc-web").unwrap();
    assert_eq!(tree.request(rpc), json!({"input": {"name": "sfc-web"}}));
}

#[tokio::test]
async fn test_load_link_and_fill() {
    let source = StaticSchemaSource::new()
        .with_document("sfc-common", SFC_COMMON)
        .with_document("service-function-chain", SFC)
        .with_document("sfc-ext", SFC_EXT);
    let report = SchemaLoader::new(source)
        .load(["sfc-ext"])
        .await;
    assert!(report.is_complete());
    let names = report
        .modules
        .iter()
        .map(|x| x.name().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names[0], "sfc-ext");
    assert_eq!(names.len(), 3);

    let (mut tree, root) = chains(Arc::new(link(&report.modules)));
    tree.fill_from_response(root, &server_data());
    assert_eq!(tree.request(root), server_data());
}
