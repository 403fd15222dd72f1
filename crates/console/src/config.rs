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

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde_with::serde_as;
use sfc_yangutils::join::DEFAULT_JOIN_TIMEOUT;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub(crate) const fn default_follow_imports() -> bool {
    true
}

pub(crate) const fn default_load_timeout() -> Duration {
    DEFAULT_JOIN_TIMEOUT
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub schemas: SchemasConfig,

    /// API discovery document (JSON)
    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub apis: Option<PathBuf>,
}

impl ConsoleConfig {
    /// The YAML file, overridden by `SFC_` prefixed environment variables
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SFC_"))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where YIN documents are fetched from
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSourceConfig {
    /// Directory holding `<module>.yin` files
    Directory(PathBuf),
    /// Base URL serving `<module>.yin` documents
    Http(String),
}

#[serde_as]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SchemasConfig {
    pub source: SchemaSourceConfig,

    #[serde(default)]
    pub modules: Vec<String>,

    #[serde(default = "default_follow_imports")]
    pub follow_imports: bool,

    /// Upper bound for loading all modules
    #[serde(default = "default_load_timeout")]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub timeout: Duration,
}
