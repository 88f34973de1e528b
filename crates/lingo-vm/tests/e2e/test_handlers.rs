use super::helpers::*;

#[test]
fn test_recursive_factorial() {
    let src = "on fact n\nif n <= 1 then return 1\nreturn n * fact(n - 1)\nend\non main\nput fact(5)\nend\n";
    check_output(src, &["120"]);
}

#[test]
fn test_call_with_two_args() {
    let src = "on add2 a, b\nreturn a + b\nend\non main\nput add2(3, 4)\nend\n";
    check_output(src, &["7"]);
}

#[test]
fn test_return_without_value_is_void() {
    let src = "on nothing\nreturn\nend\non main\nput nothing()\nend\n";
    check_output(src, &["<Void>"]);
}

#[test]
fn test_empty_handler_returns_void() {
    let src = "on nothing\nend\non main\nput nothing()\nend\n";
    check_output(src, &["<Void>"]);
}

#[test]
fn test_missing_arguments_read_void() {
    let src = "on show a, b\nput a\nput b\nend\non main\nshow 1\nend\n";
    check_output(src, &["1", "<Void>"]);
}

#[test]
fn test_extra_arguments_dropped() {
    let src = "on first a\nreturn a\nend\non main\nput first(1, 2, 3)\nend\n";
    check_output(src, &["1"]);
}

#[test]
fn test_handler_invocation_statement() {
    let src = "on greet who\nput \"hi \" & who\nend\non main\ngreet \"ada\"\nend\n";
    check_output(src, &["hi ada"]);
}

#[test]
fn test_handler_invocation_statement_multiple_args() {
    let src = "on sum3 a, b, c\nput a + b + c\nend\non main\nsum3 1, 2, 3\nend\n";
    check_output(src, &["6"]);
}

#[test]
fn test_handler_invocation_no_args() {
    let src = "on beep\nput \"beep\"\nend\non main\nbeep\nend\n";
    check_output(src, &["beep"]);
}

#[test]
fn test_mutual_recursion() {
    let src = "on iseven n\nif n = 0 then return 1\nreturn isodd(n - 1)\nend\non isodd n\nif n = 0 then return 0\nreturn iseven(n - 1)\nend\non main\nput iseven(10)\nput iseven(7)\nend\n";
    check_output(src, &["1", "0"]);
}

#[test]
fn test_method_call_dispatches_to_script_handler() {
    let src = "on main me\nme.shout(\"hey\")\nend\non shout me, text\nput text & \"!\"\nend\n";
    check_output(src, &["hey!"]);
}

#[test]
fn test_handler_names_case_insensitive_in_source() {
    // The lexer lowercases words, so declarations and call sites
    // match regardless of case.
    let src = "on DoThing\nput 1\nend\non main\ndothing()\nDOTHING()\nend\n";
    check_output(src, &["1", "1"]);
}

#[test]
fn test_assign_then_return_equals_plain_return() {
    let a = "on f y\nx = y\nreturn x\nend\non main\nput f(9)\nend\n";
    let b = "on f y\nreturn y\nend\non main\nput f(9)\nend\n";
    assert_eq!(run_lingo(a), run_lingo(b));
}

#[test]
fn test_call_result_feeds_expressions() {
    let src = "on double n\nreturn n * 2\nend\non main\nput double(double(3)) + 1\nend\n";
    check_output(src, &["13"]);
}

#[test]
fn test_return_exits_early() {
    let src = "on main\nput 1\nreturn\nput 2\nend\n";
    check_output(src, &["1"]);
}

#[test]
fn test_handler_returning_list() {
    let src = "on build\nreturn [1, 2]\nend\non main\nx = build()\nx.add(3)\nput x\nend\n";
    check_output(src, &["[1, 2, 3]"]);
}

#[test]
fn test_deep_but_bounded_recursion() {
    let src = "on down n\nif n = 0 then return 0\nreturn down(n - 1)\nend\non main\nput down(200)\nend\n";
    check_output(src, &["0"]);
}
