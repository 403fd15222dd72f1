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

mod config;
mod render;

use crate::{
    config::{ConsoleConfig, SchemaSourceConfig, SchemasConfig},
    render::{ApiView, SchemaTreeView},
};
use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use sfc_yangforms::{FormId, FormTree};
use sfc_yangutils::{
    api::{link_apis_to_nodes, parse_api_discovery},
    link,
    loader::{
        DirectorySchemaSource, HttpSchemaSource, LoadReport, SchemaLoader, SchemaSource,
    },
    path::split_qualified,
    LinkedSchema,
};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Console config file (yaml)
    #[arg(short = 'c', long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the linked schema forest
    Tree {
        /// Only show the roots of this module
        #[arg(short = 'm', long)]
        module: Option<String>,
    },
    /// List the discovered REST APIs with the schema nodes they resolve to
    Apis,
    /// Fill a form from a JSON document, validate it and print the request
    /// body built from it
    Request {
        /// Root node written as `<module>:<name>`
        #[arg(short = 'r', long)]
        root: String,

        /// JSON document, e.g. a saved RESTCONF response
        #[arg(short = 'd', long)]
        data: PathBuf,
    },
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(Level::from_str(level).context("invalid logging level")?)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    Ok(())
}

async fn load_from<S>(source: S, config: &SchemasConfig) -> LoadReport
where
    S: SchemaSource + Send + Sync + 'static,
{
    SchemaLoader::new(source)
        .with_timeout(config.timeout)
        .with_follow_imports(config.follow_imports)
        .load(config.modules.iter().cloned())
        .await
}

async fn load_schema(config: &SchemasConfig) -> anyhow::Result<LinkedSchema> {
    let report = match &config.source {
        SchemaSourceConfig::Directory(dir) => {
            load_from(DirectorySchemaSource::new(dir.clone()), config).await
        }
        SchemaSourceConfig::Http(base_url) => {
            load_from(HttpSchemaSource::new(base_url.clone()), config).await
        }
    };
    for failure in &report.failures {
        warn!(module = failure.module(), error = %failure, "failed to load schema module");
    }
    if !report.timed_out.is_empty() {
        warn!(modules = ?report.timed_out, "schema loading timed out");
    }
    if report.modules.is_empty() {
        bail!("no schema module could be loaded");
    }
    info!(modules = report.modules.len(), "loaded schema modules");
    Ok(link(&report.modules))
}

/// Log the validation messages of every node below `id`
fn report_errors(tree: &FormTree, id: FormId, path: &str) {
    let path = format!("{path}/{}", tree.node(id).label());
    for error in tree.errors(id) {
        warn!(node = path.as_str(), error = error.as_str(), "validation failed");
    }
    let template = tree.list_state(id).and_then(|x| x.template());
    for child in tree.children(id).iter().copied().chain(template) {
        report_errors(tree, child, &path);
    }
}

async fn build_request(schema: LinkedSchema, root: &str, data: &Path) -> anyhow::Result<Value> {
    let (Some(module), name) = split_qualified(root) else {
        bail!("root `{root}` must be written as <module>:<name>");
    };
    let node = schema
        .root(module, name)
        .ok_or_else(|| anyhow!("no schema root `{root}`"))?;
    let document = tokio::fs::read_to_string(data)
        .await
        .with_context(|| format!("reading {}", data.display()))?;
    let document: Value = serde_json::from_str(&document)?;

    let mut tree = FormTree::new(Arc::new(schema));
    let id = tree.instantiate(node);
    if !tree.fill_from_response(id, &document) {
        warn!(root, "no member of the data document belongs to the root");
    }
    if !tree.validate(id) {
        report_errors(&tree, id, "");
    }
    Ok(tree.request(id))
}

async fn run(command: Command, config: ConsoleConfig) -> anyhow::Result<()> {
    let schema = load_schema(&config.schemas).await?;
    match command {
        Command::Tree { module } => {
            print!("{}", SchemaTreeView::new(&schema, module.as_deref()));
        }
        Command::Apis => {
            let path = config
                .apis
                .as_ref()
                .ok_or_else(|| anyhow!("no API discovery document configured"))?;
            let document = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let mut apis = parse_api_discovery(&document)?;
            link_apis_to_nodes(&mut apis, &schema);
            print!("{}", ApiView::new(&apis, &schema));
        }
        Command::Request { root, data } => {
            let request = build_request(schema, &root, &data).await?;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config: ConsoleConfig = ConsoleConfig::figment(&args.config)
        .extract()
        .context("parsing config file failed")?;
    init_tracing(&config.logging.level)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args.command, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sfc_yangutils::parse_module;
    use std::io::Write;

    const SCHEMA: &str = r#"<module name="service-function"
        xmlns="urn:ietf:params:xml:ns:yang:yin:1">
  <namespace uri="urn:cisco:params:xml:ns:yang:sfc-sf"/>
  <prefix value="sfc-sf"/>
  <container name="service-functions">
    <list name="service-function">
      <key value="name"/>
      <leaf name="name"><type name="string"/></leaf>
      <leaf name="port"><type name="uint16"/></leaf>
    </list>
  </container>
</module>"#;

    fn schema() -> LinkedSchema {
        link(&[parse_module(SCHEMA).unwrap()])
    }

    #[tokio::test]
    async fn test_build_request_from_file() {
        let mut data = tempfile::NamedTempFile::new().unwrap();
        write!(
            data,
            r#"{{"service-function:service-functions": {{"service-function": [
                {{"name": "firewall-1", "port": "6633", "$$hashKey": "x"}}
            ]}}}}"#
        )
        .unwrap();
        let request = build_request(schema(), "service-function:service-functions", data.path())
            .await
            .unwrap();
        assert_eq!(
            request,
            json!({"service-function:service-functions": {"service-function": [
                {"name": "firewall-1", "port": 6633}
            ]}})
        );
    }

    #[tokio::test]
    async fn test_build_request_rejects_bad_root() {
        let data = tempfile::NamedTempFile::new().unwrap();
        assert!(build_request(schema(), "service-functions", data.path())
            .await
            .is_err());
        assert!(build_request(schema(), "service-function:missing", data.path())
            .await
            .is_err());
    }
}
