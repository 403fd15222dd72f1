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

//! Correlates discovered REST sub-resources with schema nodes.

use crate::{
    linker::LinkedSchema,
    path::{path_to_string, search_roots, translate, PathElement},
    tree::NodeId,
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum ApiDiscoveryError {
    #[error("invalid API discovery document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Storage {
    Config,
    Operational,
    Operations,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscoveryDocument {
    #[serde(default)]
    apis: Vec<ApiDocument>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiDocument {
    module: String,
    #[serde(default)]
    revision: Option<String>,
    #[serde(default, rename = "basePath")]
    base_path: Option<String>,
    #[serde(default, alias = "subApis")]
    apis: Vec<SubApiDocument>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubApiDocument {
    path: String,
    #[serde(default)]
    operations: Vec<OperationDocument>,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationDocument {
    method: String,
}

pub type CustomCallback = Arc<dyn Fn(NodeId) + Send + Sync>;

/// UI action bound to the schema node of a sub-API
#[derive(Clone)]
pub struct CustomFunctionality {
    label: String,
    node: NodeId,
    callback: CustomCallback,
}

impl fmt::Debug for CustomFunctionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFunctionality")
            .field("label", &self.label)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl CustomFunctionality {
    /// Both the node and the callback are required, a missing one is logged
    /// and no functionality is created.
    pub fn new(
        label: impl Into<String>,
        node: Option<NodeId>,
        callback: Option<CustomCallback>,
    ) -> Option<Self> {
        let label = label.into();
        match (node, callback) {
            (Some(node), Some(callback)) => Some(Self {
                label,
                node,
                callback,
            }),
            (node, callback) => {
                error!(
                    label = label.as_str(),
                    has_node = node.is_some(),
                    has_callback = callback.is_some(),
                    "custom functionality requires both a node and a callback"
                );
                None
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn node(&self) -> NodeId {
        self.node
    }

    pub fn run(&self) {
        (self.callback)(self.node)
    }
}

/// A REST sub-resource of an [`Api`]
#[derive(Debug, Clone)]
pub struct SubApi {
    path_template: String,
    storage: Option<Storage>,
    relative_path: String,
    operations: Vec<String>,
    path: Vec<PathElement>,
    node: Option<NodeId>,
    custom_functionality: Vec<CustomFunctionality>,
}

impl SubApi {
    /// Split the storage segment off `path_template` and translate the rest,
    /// unqualified steps belong to `module`.
    pub fn new(path_template: impl Into<String>, operations: Vec<String>, module: &str) -> Self {
        let path_template = path_template.into();
        let segments = path_template.split('/').collect::<Vec<_>>();
        let storage_index = segments
            .iter()
            .position(|x| x.parse::<Storage>().is_ok());
        let storage = storage_index.and_then(|x| segments[x].parse::<Storage>().ok());
        let relative_path = match storage_index {
            Some(index) => segments[index + 1..].join("/"),
            None => path_template.clone(),
        };
        // discovery paths are already qualified by module name
        let path = translate(&relative_path, |x| Some(x.to_string()), Some(module));
        Self {
            path_template,
            storage,
            relative_path,
            operations,
            path,
            node: None,
            custom_functionality: vec![],
        }
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    pub const fn storage(&self) -> Option<Storage> {
        self.storage
    }

    /// Template without the prefix up to and including the storage segment
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    pub fn supports(&self, method: &str) -> bool {
        self.operations.iter().any(|x| x.eq_ignore_ascii_case(method))
    }

    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn custom_functionality(&self) -> &[CustomFunctionality] {
        &self.custom_functionality
    }

    /// Fill the `{key}` placeholders of the template, `None` when a key has
    /// no value
    pub fn request_path<F>(&self, key_value: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut acc = vec![];
        for segment in self.path_template.split('/') {
            match segment.strip_prefix('{').and_then(|x| x.strip_suffix('}')) {
                Some(key) => acc.push(key_value(key)?),
                None => acc.push(segment.to_string()),
            }
        }
        Some(acc.join("/"))
    }
}

/// A discovered module API with its sub-resources
#[derive(Debug, Clone)]
pub struct Api {
    pub module: String,
    pub revision: Option<String>,
    pub base_path: Option<String>,
    pub sub_apis: Vec<SubApi>,
}

/// Parse an API discovery document
pub fn parse_api_discovery(document: &str) -> Result<Vec<Api>, ApiDiscoveryError> {
    let document: DiscoveryDocument = serde_json::from_str(document)?;
    let apis = document
        .apis
        .into_iter()
        .map(|api| {
            let sub_apis = api
                .apis
                .into_iter()
                .map(|sub| {
                    let operations = sub.operations.into_iter().map(|x| x.method).collect();
                    SubApi::new(sub.path, operations, &api.module)
                })
                .collect();
            Api {
                module: api.module,
                revision: api.revision,
                base_path: api.base_path,
                sub_apis,
            }
        })
        .collect::<Vec<_>>();
    debug!(apis = apis.len(), "parsed API discovery document");
    Ok(apis)
}

/// Resolve the schema node of every sub-API, returns how many were resolved
pub fn link_apis_to_nodes(apis: &mut [Api], schema: &LinkedSchema) -> usize {
    let mut linked = 0;
    for api in apis.iter_mut() {
        for sub in &mut api.sub_apis {
            sub.node = search_roots(schema.arena(), schema.roots(), &sub.path);
            match sub.node {
                Some(_) => linked += 1,
                None => debug!(
                    module = api.module.as_str(),
                    path = %path_to_string(&sub.path),
                    "no schema node for sub-API"
                ),
            }
        }
    }
    info!(linked, "linked sub-APIs to schema nodes");
    linked
}

/// Attach a custom functionality to the sub-APIs of `module` whose relative
/// path equals `path`, returns how many received it
pub fn add_custom_functionality(
    apis: &mut [Api],
    module: &str,
    path: &str,
    label: &str,
    callback: CustomCallback,
) -> usize {
    let path = path.trim_matches('/');
    let mut added = 0;
    for api in apis.iter_mut().filter(|x| x.module == module) {
        for sub in api
            .sub_apis
            .iter_mut()
            .filter(|x| x.relative_path.trim_matches('/') == path)
        {
            if let Some(functionality) =
                CustomFunctionality::new(label, sub.node, Some(Arc::clone(&callback)))
            {
                sub.custom_functionality.push(functionality);
                added += 1;
            }
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{linker::link, module::Module, tree::NodeKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DISCOVERY: &str = r#"{
  "apis": [
    {
      "module": "service-function",
      "revision": "2014-07-01",
      "basePath": "http://localhost:8181/restconf",
      "apis": [
        {
          "path": "/restconf/config/service-function:service-functions/",
          "operations": [{"method": "GET", "nickname": "GET-service-functions"}, {"method": "PUT"}]
        },
        {
          "path": "/restconf/config/service-function:service-functions/service-function/{name}/",
          "operations": [{"method": "GET"}, {"method": "DELETE"}]
        },
        {
          "path": "/restconf/operational/service-function:unknown/",
          "operations": []
        }
      ]
    }
  ]
}"#;

    fn schema() -> LinkedSchema {
        let mut module = Module::new("service-function", "urn:sf", "sfc-sf", None);
        let root = module
            .add_statement(None, NodeKind::Container, "service-functions", None)
            .unwrap();
        let list = module
            .add_statement(Some(root), NodeKind::List, "service-function", None)
            .unwrap();
        module.add_statement(Some(list), NodeKind::Key, "name", None).unwrap();
        link(&[module])
    }

    #[test]
    fn test_parse_discovery() {
        let apis = parse_api_discovery(DISCOVERY).unwrap();
        assert_eq!(apis.len(), 1);
        let api = &apis[0];
        assert_eq!(api.revision.as_deref(), Some("2014-07-01"));
        assert_eq!(api.sub_apis.len(), 3);
        let sub = &api.sub_apis[1];
        assert_eq!(sub.storage(), Some(Storage::Config));
        assert!(sub.supports("delete"));
        assert!(!sub.supports("PUT"));
        assert_eq!(sub.path().len(), 2);
        assert_eq!(sub.path()[1].module(), Some("service-function"));
        assert_eq!(sub.path()[1].identifier_name(), Some("name"));
        assert_eq!(api.sub_apis[2].storage(), Some(Storage::Operational));
        assert!(parse_api_discovery("{\"apis\": 1}").is_err());
    }

    #[test]
    fn test_link_apis_to_nodes() {
        let schema = schema();
        let mut apis = parse_api_discovery(DISCOVERY).unwrap();
        assert_eq!(link_apis_to_nodes(&mut apis, &schema), 2);
        let list = apis[0].sub_apis[1].node().unwrap();
        assert_eq!(schema.arena()[list].kind(), NodeKind::List);
        assert!(apis[0].sub_apis[2].node().is_none());
    }

    #[test]
    fn test_request_path() {
        let apis = parse_api_discovery(DISCOVERY).unwrap();
        let sub = &apis[0].sub_apis[1];
        assert_eq!(
            sub.request_path(|key| (key == "name").then(|| "firewall-1".to_string())),
            Some("/restconf/config/service-function:service-functions/service-function/firewall-1/".to_string())
        );
        assert_eq!(sub.request_path(|_| None), None);
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_custom_functionality() {
        let schema = schema();
        let mut apis = parse_api_discovery(DISCOVERY).unwrap();
        link_apis_to_nodes(&mut apis, &schema);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback: CustomCallback = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let added = add_custom_functionality(
            &mut apis,
            "service-function",
            "/service-function:service-functions/service-function/{name}/",
            "show-monitoring",
            Arc::clone(&callback),
        );
        assert_eq!(added, 1);
        let functionality = &apis[0].sub_apis[1].custom_functionality()[0];
        assert_eq!(functionality.label(), "show-monitoring");
        functionality.run();
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        // unresolved sub-API has no node
        let added = add_custom_functionality(
            &mut apis,
            "service-function",
            "service-function:unknown",
            "broken",
            callback,
        );
        assert_eq!(added, 0);
        assert!(logs_contain("custom functionality requires both a node and a callback"));
        assert!(CustomFunctionality::new("x", None, None).is_none());
    }
}
