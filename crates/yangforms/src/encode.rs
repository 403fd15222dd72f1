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

//! JSON encoding of leaf values.
//!
//! Integer types up to 32 bits are JSON numbers and `boolean` is a JSON
//! boolean. Everything else, 64 bit integers and `decimal64` included, is a
//! JSON string (RFC 7951 section 6.1).

use serde_json::Value;
use sfc_yangutils::restriction::{parse_number, Number};

const JSON_NUMBER_TYPES: &[&str] = &[
    "int8", "int16", "int32", "uint8", "uint16", "uint32",
];

/// Encode `value` of a leaf of built-in type `type_name`, values that don't
/// fit the type are kept as strings
pub fn encode_leaf_value(value: &str, type_name: &str) -> Value {
    if JSON_NUMBER_TYPES.contains(&type_name) {
        if let Some(Number::Integer(number)) = parse_number(value) {
            if let Ok(number) = i64::try_from(number) {
                return Value::from(number);
            }
        }
    } else if type_name == "boolean" {
        match value {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
    } else if type_name == "empty" {
        return Value::Array(vec![Value::Null]);
    }
    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("42", "uint8", json!(42))]
    #[case("0x10", "int32", json!(16))]
    #[case("-7", "int16", json!(-7))]
    #[case("abc", "int32", json!("abc"))]
    #[case("18446744073709551615", "uint64", json!("18446744073709551615"))]
    #[case("1.5", "decimal64", json!("1.5"))]
    #[case("true", "boolean", json!(true))]
    #[case("yes", "boolean", json!("yes"))]
    #[case("firewall", "enumeration", json!("firewall"))]
    #[case("true", "empty", json!([null]))]
    fn test_encode_leaf_value(#[case] value: &str, #[case] type_name: &str, #[case] expected: Value) {
        assert_eq!(encode_leaf_value(value, type_name), expected);
    }
}
