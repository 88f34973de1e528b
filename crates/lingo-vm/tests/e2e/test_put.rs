use super::helpers::*;
use lingo_core::value::Value;

#[test]
fn test_put_void() {
    check_output("on main\nput void\nend\n", &["<Void>"]);
}

#[test]
fn test_put_integer_and_float_forms() {
    check_output("on main\nput 42\nput 1.25\nput -0.5\nend\n", &["42", "1.2500", "-0.5000"]);
}

#[test]
fn test_put_string_is_unquoted() {
    check_output("on main\nput \"plain\"\nend\n", &["plain"]);
}

#[test]
fn test_put_symbol() {
    check_output("on main\nput #ready\nend\n", &["#ready"]);
}

#[test]
fn test_put_nested_containers() {
    check_output(
        "on main\nput [[1], [#k: \"v\"]]\nend\n",
        &["[[1], [#k: \"v\"]]"],
    );
}

#[test]
fn test_put_each_statement_is_one_line() {
    let lines = run_lingo("on main\nput 1\nput 2\nput 3\nend\n");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_main_return_value() {
    let (value, _vm) = run_lingo_result("on main\nreturn 41 + 1\nend\n");
    assert_eq!(value, Value::Int(42));
}

#[test]
fn test_put_comparison_result() {
    check_output("on main\nput 2 > 1\nend\n", &["1"]);
}
