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

//! Concurrent loading of YIN schemas.
//!
//! - [`SchemaSource`]: where module documents come from
//! - [`SchemaLoader`]: fetches and parses a batch of modules, joined by a
//!   [`RequestJoin`]

use crate::{
    join::{JoinOutcome, RequestJoin, DEFAULT_JOIN_TIMEOUT},
    module::Module,
    yin::{parse_module, YinError},
};
use std::{
    collections::{HashMap, HashSet},
    future::Future,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema for module `{0}` not found")]
    NotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch module `{module}`: {source}")]
    Fetch {
        module: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to parse module `{module}`: {source}")]
    Parse {
        module: String,
        #[source]
        source: YinError,
    },
}

impl LoadError {
    pub fn module(&self) -> &str {
        match self {
            Self::Fetch { module, .. } | Self::Parse { module, .. } => module,
        }
    }
}

/// Source of YIN documents
pub trait SchemaSource {
    fn fetch(&self, module: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Reads `<dir>/<module>.yin`
#[derive(Debug, Clone)]
pub struct DirectorySchemaSource {
    dir: PathBuf,
}

impl DirectorySchemaSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SchemaSource for DirectorySchemaSource {
    async fn fetch(&self, module: &str) -> Result<String, FetchError> {
        let path = self.dir.join(format!("{module}.yin"));
        match tokio::fs::read_to_string(&path).await {
            Ok(document) => Ok(document),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(module.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// GETs `<base_url>/<module>.yin`
#[derive(Debug, Clone)]
pub struct HttpSchemaSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSchemaSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl SchemaSource for HttpSchemaSource {
    async fn fetch(&self, module: &str) -> Result<String, FetchError> {
        let url = format!("{}/{module}.yin", self.base_url);
        debug!(url = url.as_str(), "fetching schema");
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(module.to_string()));
        }
        Ok(response.error_for_status()?.text().await?)
    }
}

/// In-memory documents keyed by module name
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSource {
    documents: HashMap<String, String>,
}

impl StaticSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, module: impl Into<String>, document: impl Into<String>) -> Self {
        self.documents.insert(module.into(), document.into());
        self
    }
}

impl SchemaSource for StaticSchemaSource {
    async fn fetch(&self, module: &str) -> Result<String, FetchError> {
        self.documents
            .get(module)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(module.to_string()))
    }
}

/// Outcome of [`SchemaLoader::load`]
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Loaded modules, requested modules first in request order
    pub modules: Vec<Module>,
    pub failures: Vec<LoadError>,
    /// Modules that were still loading when the join timed out
    pub timed_out: Vec<String>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.timed_out.is_empty()
    }
}

#[derive(Debug)]
pub struct SchemaLoader<S> {
    source: Arc<S>,
    timeout: Duration,
    follow_imports: bool,
}

impl<S> Clone for SchemaLoader<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            timeout: self.timeout,
            follow_imports: self.follow_imports,
        }
    }
}

impl<S> SchemaLoader<S>
where
    S: SchemaSource + Send + Sync + 'static,
{
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            timeout: DEFAULT_JOIN_TIMEOUT,
            follow_imports: true,
        }
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn with_follow_imports(mut self, follow_imports: bool) -> Self {
        self.follow_imports = follow_imports;
        self
    }

    /// Fetch and parse `names` concurrently. With `follow_imports` set,
    /// imported modules are loaded in further waves until every import is
    /// known. The timeout bounds all waves together.
    pub async fn load<I, N>(&self, names: I) -> LoadReport
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut requested = vec![];
        let mut seen = HashSet::new();
        for name in names {
            let name = name.into();
            if seen.insert(name.clone()) {
                requested.push(name);
            }
        }
        let mut report = LoadReport::default();
        let deadline = Instant::now() + self.timeout;
        let mut wave = requested.clone();
        while !wave.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                report.timed_out.extend(wave);
                break;
            }
            let (modules, failures, timed_out) = self.load_wave(&wave, remaining).await;
            let mut next = vec![];
            if self.follow_imports {
                for import in modules.iter().flat_map(Module::imports) {
                    if seen.insert(import.module.clone()) {
                        next.push(import.module);
                    }
                }
            }
            report.modules.extend(modules);
            report.failures.extend(failures);
            let stop = !timed_out.is_empty();
            report.timed_out.extend(timed_out);
            if stop {
                break;
            }
            wave = next;
        }
        // requested modules first, in request order, imports after
        let order = |name: &str| {
            requested
                .iter()
                .position(|x| x == name)
                .unwrap_or(requested.len())
        };
        report.modules.sort_by_key(|x| order(x.name()));
        info!(
            loaded = report.modules.len(),
            failed = report.failures.len(),
            timed_out = report.timed_out.len(),
            "schema loading finished"
        );
        report
    }

    async fn load_wave(
        &self,
        names: &[String],
        timeout: Duration,
    ) -> (Vec<Module>, Vec<LoadError>, Vec<String>) {
        let join = RequestJoin::new(timeout);
        let (tx, mut rx) = mpsc::unbounded_channel();
        for name in names {
            let handle = join.spawn_request(name.as_str());
            let source = Arc::clone(&self.source);
            let tx = tx.clone();
            let name = name.clone();
            tokio::spawn(async move {
                let result = match source.fetch(&name).await {
                    Ok(document) => parse_module(&document).map_err(|source| LoadError::Parse {
                        module: name.clone(),
                        source,
                    }),
                    Err(source) => Err(LoadError::Fetch {
                        module: name.clone(),
                        source,
                    }),
                };
                let _ = tx.send(result);
                // released even when the receiver is gone
                drop(handle);
            });
        }
        drop(tx);

        let outcome = join.wait_for(|x| x).await;
        let mut modules = vec![];
        let mut failures = vec![];
        while let Ok(result) = rx.try_recv() {
            match result {
                Ok(module) => {
                    debug!(module = module.name(), "schema loaded");
                    modules.push(module);
                }
                Err(err) => {
                    warn!(module = err.module(), error = %err, "failed to load schema");
                    failures.push(err);
                }
            }
        }
        let timed_out = match outcome {
            JoinOutcome::Completed => vec![],
            JoinOutcome::TimedOut { pending } => pending,
        };
        (modules, failures, timed_out)
    }
}
