// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn context() -> Value {
    let environment = Value::new_struct()
        .with_field("Update", true)
        .with_field("Upgrade", false)
        .with_field("Release", "bookworm")
        .with_field("Jobs", 0i64)
        .with_field("Packages", vec!["git", "curl"]);
    Value::new_struct().with_field("Environment", environment)
}

#[rstest]
#[case("true", true)]
#[case("false", false)]
#[case("0", false)]
#[case("1", true)]
#[case("yes", true)]
#[case("\"false\"", false)]
#[case("\"0\"", false)]
#[case("\"\"", false)]
#[case("\"two words\"", true)]
fn test_truthiness(context: Value, #[case] expr: &str, #[case] expected: bool) {
    assert_eq!(evaluate(expr, &context).unwrap(), expected, "{expr}");
}

#[rstest]
#[case("true || true && false", true)]
#[case("(true || true) && false", false)]
#[case(
    "((true||false)&&(false||true)) != ((true||false)&&(false||false))",
    true
)]
#[case("false && true || true", true)]
#[case("false && (true || true)", false)]
#[case("!false && false", false)]
#[case("!(false && false)", true)]
#[case("!true == false", true)]
#[case("!!yes", true)]
#[case("a == a && b != c", true)]
#[case("false == 0", true)]
fn test_precedence(context: Value, #[case] expr: &str, #[case] expected: bool) {
    assert_eq!(evaluate(expr, &context).unwrap(), expected, "{expr}");
}

#[rstest]
#[case("\"a\" in [b, c, a]", true)]
#[case("\"a\" in [b, c]", false)]
#[case("d in [\"d\"]", true)]
#[case("!(x in [a, b])", true)]
#[case("a in [a] && b in [c]", false)]
#[case(".Environment.Release in [bullseye, bookworm]", true)]
fn test_membership(context: Value, #[case] expr: &str, #[case] expected: bool) {
    assert_eq!(evaluate(expr, &context).unwrap(), expected, "{expr}");
}

#[rstest]
#[case(".Environment.Update", true)]
#[case(".Environment.Upgrade", false)]
#[case("!.Environment.Upgrade", true)]
#[case(".Environment.Jobs", false)]
#[case(".Environment.Release == bookworm", true)]
#[case(".Environment.Release != \"bookworm\"", false)]
#[case(".Environment.Packages[0] == git", true)]
#[case(".Environment.Update == true", true)]
fn test_variables(context: Value, #[case] expr: &str, #[case] expected: bool) {
    assert_eq!(evaluate(expr, &context).unwrap(), expected, "{expr}");
}

#[rstest]
#[case("a\\ b == \"a b\"", true)]
#[case("\"say \\\"hi\\\"\" == say\\ \\\"hi\\\"", true)]
#[case("\\in == \"in\"", true)]
fn test_escapes(context: Value, #[case] expr: &str, #[case] expected: bool) {
    assert_eq!(evaluate(expr, &context).unwrap(), expected, "{expr}");
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
#[case::empty_list("\"a\" in []")]
#[case::unclosed_list("a in [a, b")]
#[case::stray_list_end("a in a]")]
#[case::missing_separator("a in [a b]")]
#[case::trailing_separator("a in [a,]")]
#[case::in_without_list("a in b")]
#[case::stray_list("[a]")]
#[case::empty_group("()")]
#[case::unclosed_group("(true")]
#[case::stray_group_end("true)")]
#[case::dangling_operator("true &&")]
#[case::leading_operator("|| true")]
#[case::adjacent_values("true false")]
#[case::less_than("1 < 2")]
#[case::greater_equal("2 >= 1")]
#[case::single_equals("a = a")]
#[case::single_ampersand("a & a")]
#[case::unterminated_quote("\"abc")]
#[case::dangling_escape("abc\\")]
#[case::unknown_variable(".Environment.NoSuchField")]
fn test_malformed(context: Value, #[case] expr: &str) {
    let err = evaluate(expr, &context).expect_err("should fail");
    assert!(err.is_invalid_argument(), "{expr}: {err:?}");
}

#[rstest]
fn test_error_reports_position(context: Value) {
    let err = evaluate("true && (false || )", &context).unwrap_err();
    assert_eq!(err.position(), Some(18));

    let err = evaluate("a in [a b]", &context).unwrap_err();
    assert_eq!(err.position(), Some(8));

    let err = evaluate("1 < 2", &context).unwrap_err();
    assert_eq!(err.position(), Some(2));
}

#[rstest]
fn test_lex_resolves_variables_immediately(context: Value) {
    let elems = lex(".Environment.Release == x", &context).unwrap();
    assert_eq!(elems[0], CondElem::value("bookworm", 0));
    assert_eq!(elems[1].kind, ElemKind::Operator);
    assert_eq!(elems[2], CondElem::value("x", 24));
}
