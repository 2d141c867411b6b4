// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
#[case(Value::from("text"), Some("text"))]
#[case(Value::Bool(true), Some("true"))]
#[case(Value::Bool(false), Some(""))]
#[case(Value::Int(-4), Some("-4"))]
#[case(Value::Uint32(1000), Some("1000"))]
#[case(Value::Null, None)]
#[case(Value::Float(1.5), None)]
#[case(Value::List(Vec::new()), None)]
#[case(Value::new_struct(), None)]
fn test_as_scalar(#[case] value: Value, #[case] expected: Option<&str>) {
    assert_eq!(value.as_scalar().as_deref(), expected);
}

#[rstest]
fn test_with_field_builds_struct() {
    let value = Value::Null
        .with_field("Name", "dev")
        .with_field("Uid", 1000u32);

    assert_eq!(value.kind(), "struct");
    assert_eq!(value.field("Name"), Some(&Value::from("dev")));
    assert_eq!(value.field("Uid"), Some(&Value::Uint32(1000)));
    assert_eq!(value.field("Missing"), None);
}

#[rstest]
#[case("true", Value::Bool(true))]
#[case("false", Value::Bool(false))]
#[case("42", Value::Int(42))]
#[case("bookworm", Value::from("bookworm"))]
fn test_parse_param(#[case] raw: &str, #[case] expected: Value) {
    assert_eq!(Value::parse_param(raw), expected);
}

#[rstest]
fn test_from_yaml_mapping() {
    let yaml = r#"
Update: true
Release: 12
Name: bookworm
Packages: [git, curl]
Nested:
  Depth: 2
"#;
    let value: Value = serde_yaml::from_str(yaml).expect("Should parse environment");

    assert_eq!(value.field("Update"), Some(&Value::Bool(true)));
    assert_eq!(value.field("Release"), Some(&Value::Int(12)));
    assert_eq!(
        value.field("Packages"),
        Some(&Value::from(vec!["git", "curl"]))
    );
    let nested = value.field("Nested").expect("nested struct");
    assert_eq!(nested.field("Depth"), Some(&Value::Int(2)));
}

#[rstest]
fn test_yaml_mapping_keeps_field_order() {
    let value: Value = serde_yaml::from_str("b: 1\na: 2\n").unwrap();
    let Value::Struct(fields) = value else {
        panic!("expected struct");
    };
    let keys: Vec<_> = fields.keys().cloned().collect();
    assert_eq!(keys, vec!["b", "a"]);
}
