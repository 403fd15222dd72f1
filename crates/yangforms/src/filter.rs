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

//! Filter predicates over list entries.

use crate::{scalar_to_string, FormError};
use regex::Regex;
use serde_json::{Map, Value};
use sfc_yangutils::{path::split_qualified, restriction::parse_number};
use std::{cmp::Ordering, fmt};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::EnumString, strum_macros::Display,
)]
pub enum FilterOp {
    #[strum(to_string = "=", serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = "contains")]
    Contains,
    #[strum(serialize = "regex")]
    Regex,
}

/// Condition on the value found at `path` inside a list entry
#[derive(Debug, Clone)]
pub struct ListFilter {
    path: Vec<String>,
    op: FilterOp,
    value: String,
    regex: Option<Regex>,
}

impl ListFilter {
    /// `path` is a `/` separated sequence of member labels relative to the
    /// entry, module prefixes are optional
    pub fn new(path: &str, op: FilterOp, value: impl Into<String>) -> Result<Self, FormError> {
        let value = value.into();
        let path = path
            .split('/')
            .filter(|x| !x.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        if path.is_empty() {
            return Err(FormError::InvalidFilter("empty filter path".to_string()));
        }
        let regex = match op {
            FilterOp::Regex => Some(
                Regex::new(&value).map_err(|err| FormError::InvalidFilter(err.to_string()))?,
            ),
            _ => None,
        };
        Ok(Self {
            path,
            op,
            value,
            regex,
        })
    }

    pub const fn op(&self) -> FilterOp {
        self.op
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Entries without a value at the filter path never match
    pub fn matches(&self, entry: &Map<String, Value>) -> bool {
        let Some(actual) = lookup(entry, &self.path).and_then(scalar_to_string) else {
            return false;
        };
        match self.op {
            FilterOp::Equals => compare(&actual, &self.value) == Ordering::Equal,
            FilterOp::NotEquals => compare(&actual, &self.value) != Ordering::Equal,
            FilterOp::Greater => compare(&actual, &self.value) == Ordering::Greater,
            FilterOp::GreaterOrEqual => compare(&actual, &self.value) != Ordering::Less,
            FilterOp::Less => compare(&actual, &self.value) == Ordering::Less,
            FilterOp::LessOrEqual => compare(&actual, &self.value) != Ordering::Greater,
            FilterOp::Contains => actual.contains(&self.value),
            FilterOp::Regex => self.regex.as_ref().is_some_and(|x| x.is_match(&actual)),
        }
    }
}

impl fmt::Display for ListFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path.join("/"), self.op, self.value)
    }
}

/// Member of `object` whose bare name is `label`
pub(crate) fn member<'a>(object: &'a Map<String, Value>, label: &str) -> Option<&'a Value> {
    object.get(label).or_else(|| {
        object
            .iter()
            .find(|(key, _)| split_qualified(key).1 == label)
            .map(|(_, value)| value)
    })
}

fn lookup<'a>(entry: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let value = member(entry, split_qualified(first).1)?;
    match (rest.is_empty(), value) {
        (true, value) => Some(value),
        (false, Value::Object(inner)) => lookup(inner, rest),
        (false, _) => None,
    }
}

/// Numeric comparison when both sides are numbers, string comparison
/// otherwise
fn compare(actual: &str, expected: &str) -> Ordering {
    match (parse_number(actual), parse_number(expected)) {
        (Some(actual), Some(expected)) => actual.partial_cmp(&expected).unwrap_or(Ordering::Equal),
        _ => actual.cmp(expected),
    }
}
