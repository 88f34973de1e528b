use super::helpers::*;

#[test]
fn test_concat() {
    check_output("on main\nput \"a\" & \"b\"\nend\n", &["ab"]);
}

#[test]
fn test_concat_with_space() {
    check_output("on main\nput \"a\" && \"b\"\nend\n", &["a b"]);
}

#[test]
fn test_concat_stringifies_numbers() {
    check_output("on main\nput 1 & 2\nput \"v=\" & 10\nend\n", &["12", "v=10"]);
}

#[test]
fn test_concat_float_uses_print_form() {
    check_output("on main\nput \"v\" & 1.5\nend\n", &["v1.5000"]);
}

#[test]
fn test_symbol_equality() {
    check_output("on main\nput #foo = #foo\nend\n", &["1"]);
    check_output("on main\nput #foo = #bar\nend\n", &["0"]);
}

#[test]
fn test_symbol_vs_string_compares_content() {
    check_output("on main\nput \"foo\" = #foo\nput #foo = \"foo\"\nend\n", &["1", "1"]);
}

#[test]
fn test_string_equality_by_content() {
    check_output("on main\nput \"abc\" = \"abc\"\nput \"abc\" = \"abd\"\nend\n", &["1", "0"]);
}

#[test]
fn test_number_vs_numeric_string() {
    check_output(
        "on main\nput 5 = \"5\"\nput 5 = \"6\"\nput 2.5 = \"2.5\"\nend\n",
        &["1", "0", "1"],
    );
}

#[test]
fn test_string_ordering() {
    check_output(
        "on main\nput \"apple\" < \"banana\"\nput \"b\" < \"a\"\nend\n",
        &["1", "0"],
    );
}

#[test]
fn test_string_index() {
    check_output("on main\ns = \"hello\"\nput s[1]\nput s[5]\nend\n", &["h", "o"]);
}

#[test]
fn test_string_range() {
    check_output("on main\ns = \"hello\"\nput s[2..4]\nend\n", &["ell"]);
}

#[test]
fn test_string_length_method() {
    check_output("on main\ns = \"hello\"\nput s.length()\nput s.count()\nend\n", &["5", "5"]);
}

#[test]
fn test_put_after_on_variable() {
    check_output(
        "on main\ns = \"a\"\nput \"b\" after s\nput s\nend\n",
        &["ab"],
    );
}

#[test]
fn test_put_before_on_variable() {
    check_output(
        "on main\ns = \"a\"\nput \"b\" before s\nput s\nend\n",
        &["ba"],
    );
}

#[test]
fn test_put_after_repeatedly() {
    let src = "on main\ns = \"\"\nrepeat with i = 1 to 3\nput i after s\nend repeat\nput s\nend\n";
    check_output(src, &["123"]);
}

#[test]
fn test_put_after_on_indexed_slot() {
    let src = "on main\nx = [\"a\", \"b\"]\nput \"!\" after x[2]\nput x[2]\nend\n";
    check_output(src, &["b!"]);
}

#[test]
fn test_put_before_on_dot_target() {
    let src = "on main\nd = [#msg: \"world\"]\nput \"hello \" before d.msg\nput d.msg\nend\n";
    check_output(src, &["hello world"]);
}

#[test]
fn test_string_intrinsic() {
    check_output("on main\nput string(5)\nput string(#sym)\nend\n", &["5", "#sym"]);
}

#[test]
fn test_quote_and_whitespace_constants() {
    check_output("on main\nput quote & \"x\" & quote\nend\n", &["\"x\""]);
    check_output("on main\nput \"a\" & tab & \"b\"\nend\n", &["a\tb"]);
    check_output("on main\nput \"a\" & space & \"b\"\nend\n", &["a b"]);
}

#[test]
fn test_empty_constant() {
    check_output("on main\ns = empty\nput s.length()\nend\n", &["0"]);
}

#[test]
fn test_string_constants_are_fresh_cells() {
    // Mutating a string loaded from the constant pool must not leak
    // into later loads of the same constant.
    let src = "on main\ns = \"a\"\nput \"x\" after s\nt = \"a\"\nput t\nend\n";
    check_output(src, &["a"]);
}

#[test]
fn test_line_continuation_in_source() {
    check_output("on main\nput 1 + \\\n2\nend\n", &["3"]);
}

#[test]
fn test_comment_lines_ignored() {
    check_output(
        "on main\n-- a comment\nput 1 -- trailing comment\nend\n",
        &["1"],
    );
}
