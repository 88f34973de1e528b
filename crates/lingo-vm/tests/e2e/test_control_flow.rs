use super::helpers::*;

#[test]
fn test_one_line_if_else_yes() {
    check_output(
        "on main\nx = 1\nif x = 1 then put \"yes\" else put \"no\"\nend\n",
        &["yes"],
    );
}

#[test]
fn test_one_line_if_else_no() {
    check_output(
        "on main\nx = 2\nif x = 1 then put \"yes\" else put \"no\"\nend\n",
        &["no"],
    );
}

#[test]
fn test_one_line_if_without_else() {
    check_output("on main\nif 0 then put \"hidden\"\nput \"after\"\nend\n", &["after"]);
}

#[test]
fn test_block_if() {
    check_output(
        "on main\nx = 3\nif x > 2 then\nput \"big\"\nend if\nend\n",
        &["big"],
    );
}

#[test]
fn test_block_if_else_if_chain() {
    let src = "on main\nx = 2\nif x = 1 then\nput \"one\"\nelse if x = 2 then\nput \"two\"\nelse\nput \"many\"\nend if\nend\n";
    check_output(src, &["two"]);
}

#[test]
fn test_block_if_falls_to_else() {
    let src = "on main\nx = 9\nif x = 1 then\nput \"one\"\nelse if x = 2 then\nput \"two\"\nelse\nput \"many\"\nend if\nend\n";
    check_output(src, &["many"]);
}

#[test]
fn test_void_condition_is_false() {
    check_output("on main\nif void then put \"a\" else put \"b\"\nend\n", &["b"]);
}

#[test]
fn test_repeat_while() {
    check_output(
        "on main\nx = 0\nrepeat while x < 5\nx = x + 1\nend repeat\nput x\nend\n",
        &["5"],
    );
}

#[test]
fn test_repeat_while_never_entered() {
    check_output(
        "on main\nx = 0\nrepeat while 0\nx = 99\nend repeat\nput x\nend\n",
        &["0"],
    );
}

#[test]
fn test_repeat_to() {
    check_output(
        "on main\ns = 0\nrepeat with i = 1 to 5\ns = s + i\nend repeat\nput s\nend\n",
        &["15"],
    );
}

#[test]
fn test_repeat_down_to() {
    check_output(
        "on main\nrepeat with i = 3 down to 1\nput i\nend repeat\nend\n",
        &["3", "2", "1"],
    );
}

#[test]
fn test_repeat_to_empty_range() {
    check_output(
        "on main\nrepeat with i = 5 to 1\nput i\nend repeat\nput \"done\"\nend\n",
        &["done"],
    );
}

#[test]
fn test_repeat_in_list() {
    check_output(
        "on main\nrepeat with x in [10, 20, 30]\nput x\nend repeat\nend\n",
        &["10", "20", "30"],
    );
}

#[test]
fn test_repeat_in_empty_list() {
    check_output(
        "on main\nrepeat with x in []\nput x\nend repeat\nput \"done\"\nend\n",
        &["done"],
    );
}

#[test]
fn test_exit_repeat() {
    let src = "on main\nx = 0\nrepeat while 1\nx = x + 1\nif x = 3 then exit repeat\nend repeat\nput x\nend\n";
    check_output(src, &["3"]);
}

#[test]
fn test_next_repeat() {
    let src = "on main\nrepeat with i = 1 to 5\nif i mod 2 = 0 then next repeat\nput i\nend repeat\nend\n";
    check_output(src, &["1", "3", "5"]);
}

#[test]
fn test_next_repeat_in_while() {
    let src = "on main\nx = 0\ns = 0\nrepeat while x < 5\nx = x + 1\nif x = 2 then next repeat\ns = s + x\nend repeat\nput s\nend\n";
    check_output(src, &["13"]);
}

#[test]
fn test_nested_loops_with_exit() {
    let src = "on main\nrepeat with i = 1 to 2\nrepeat with j = 1 to 9\nif j = 2 then exit repeat\nput i * 10 + j\nend repeat\nend repeat\nend\n";
    check_output(src, &["11", "21"]);
}

#[test]
fn test_case_first_clause() {
    let src = "on main\nx = 1\ncase x of\n1: put \"one\"\n2: put \"two\"\nend case\nend\n";
    check_output(src, &["one"]);
}

#[test]
fn test_case_multi_label_clause() {
    let src = "on main\nx = 3\ncase x of\n1: put \"one\"\n2, 3: put \"few\"\nend case\nend\n";
    check_output(src, &["few"]);
}

#[test]
fn test_case_otherwise() {
    let src = "on main\nx = 9\ncase x of\n1: put \"one\"\notherwise\nput \"many\"\nend case\nend\n";
    check_output(src, &["many"]);
}

#[test]
fn test_case_no_match_falls_through() {
    let src = "on main\nx = 9\ncase x of\n1: put \"one\"\nend case\nput \"after\"\nend\n";
    check_output(src, &["after"]);
}

#[test]
fn test_case_on_strings() {
    let src = "on main\nw = \"b\"\ncase w of\n\"a\": put 1\n\"b\": put 2\nend case\nend\n";
    check_output(src, &["2"]);
}

#[test]
fn test_case_on_symbols() {
    let src = "on main\ns = #go\ncase s of\n#stop: put \"stopping\"\n#go: put \"going\"\nend case\nend\n";
    check_output(src, &["going"]);
}

#[test]
fn test_case_clause_block_body() {
    let src = "on main\nx = 1\ncase x of\n1:\nput \"a\"\nput \"b\"\n2: put \"c\"\nend case\nend\n";
    check_output(src, &["a", "b"]);
}

#[test]
fn test_the_queries_reach_host() {
    check_output(
        "on main\nput the frame\nput the platform\nput the milliseconds\nend\n",
        &["12", "test", "1000"],
    );
}
