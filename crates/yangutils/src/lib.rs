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

//! Schema side of the SFC console: YIN parsing, module linking, path
//! resolution, restriction predicates, concurrent schema loading and REST
//! API correlation.
//!
//! The usual flow is
//! [`loader::SchemaLoader::load`] → [`linker::link`] → form trees built on
//! top of the resulting [`linker::LinkedSchema`].

pub mod api;
pub mod join;
pub mod linker;
pub mod loader;
pub mod module;
pub mod path;
pub mod restriction;
pub mod tree;
pub mod yin;

pub use linker::{link, LinkedSchema, ModuleInfo};
pub use module::{Import, Module};
pub use path::PathElement;
pub use tree::{NodeId, NodeKind, NodeRole, SchemaArena, SchemaNode};
pub use yin::parse_module;
