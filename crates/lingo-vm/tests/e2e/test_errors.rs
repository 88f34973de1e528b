use super::helpers::*;

#[test]
fn test_integer_division_by_zero() {
    let err = run_lingo_err("on main\nput 1 / 0\nend\n");
    assert!(err.contains("division by zero"), "got: {err}");
}

#[test]
fn test_integer_mod_by_zero() {
    let err = run_lingo_err("on main\nput 1 mod 0\nend\n");
    assert!(err.contains("division by zero"), "got: {err}");
}

#[test]
fn test_float_division_by_zero_is_not_an_error() {
    // IEEE semantics once a float is involved.
    let lines = run_lingo("on main\nx = 1.0 / 0\nput x > 100\nend\n");
    assert_eq!(lines, vec!["1"]);
}

#[test]
fn test_unknown_handler() {
    let err = run_lingo_err("on main\nput missing(1)\nend\n");
    assert!(err.contains("unknown handler 'missing'"), "got: {err}");
}

#[test]
fn test_unknown_method() {
    let err = run_lingo_err("on main\nx = []\nx.launch(1)\nend\n");
    assert!(err.contains("no method 'launch'"), "got: {err}");
}

#[test]
fn test_prop_list_key_not_found() {
    let err = run_lingo_err("on main\nd = [:]\nput d[#absent]\nend\n");
    assert!(err.contains("key not found"), "got: {err}");
}

#[test]
fn test_list_index_out_of_range() {
    let err = run_lingo_err("on main\nx = [1]\nput x[5]\nend\n");
    assert!(err.contains("out of range"), "got: {err}");
}

#[test]
fn test_arithmetic_type_error() {
    let err = run_lingo_err("on main\nput 1 + \"a\"\nend\n");
    assert!(err.contains("cannot add"), "got: {err}");
}

#[test]
fn test_equality_with_unparseable_string() {
    let err = run_lingo_err("on main\nput 5 = \"zebra\"\nend\n");
    assert!(err.contains("non-numeric string"), "got: {err}");
}

#[test]
fn test_ordering_type_error() {
    let err = run_lingo_err("on main\nput 1 < \"a\"\nend\n");
    assert!(err.contains("cannot order"), "got: {err}");
}

#[test]
fn test_condition_must_be_integer_or_void() {
    let err = run_lingo_err("on main\nif \"x\" then put 1\nend\n");
    assert!(err.contains("expected integer or void"), "got: {err}");
}

#[test]
fn test_and_on_float_errors() {
    let err = run_lingo_err("on main\nput 1.5 and 1\nend\n");
    assert!(err.contains("expected integer or void"), "got: {err}");
}

#[test]
fn test_unbounded_recursion_overflows() {
    let err = run_lingo_err("on loop\nreturn loop()\nend\non main\nput loop()\nend\n");
    assert!(err.contains("overflow"), "got: {err}");
}

#[test]
fn test_error_reports_handler_and_line() {
    let err = run_lingo_err("on main\nx = 1\nput x / 0\nend\n");
    assert!(err.contains("in main"), "got: {err}");
    assert!(err.contains("line 3"), "got: {err}");
}

#[test]
fn test_error_in_callee_reports_callee() {
    let err = run_lingo_err("on bad\nreturn 1 / 0\nend\non main\nput bad()\nend\n");
    assert!(err.contains("in bad"), "got: {err}");
}

#[test]
fn test_negate_type_error() {
    let err = run_lingo_err("on main\nx = \"s\"\nput -x\nend\n");
    assert!(err.contains("cannot negate"), "got: {err}");
}

#[test]
fn test_range_on_scalar_errors() {
    let err = run_lingo_err("on main\nx = 5\nput x[1..2]\nend\n");
    assert!(err.contains("range"), "got: {err}");
}

#[test]
fn test_member_without_movie_errors() {
    let err = run_lingo_err("on main\nput member(1)\nend\n");
    assert!(err.contains("no movie"), "got: {err}");
}
