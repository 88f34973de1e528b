use super::helpers::*;

#[test]
fn test_put_addition() {
    check_output("on main\nput 1 + 2\nend\n", &["3"]);
}

#[test]
fn test_precedence() {
    check_output("on main\nput 2 + 3 * 4\nend\n", &["14"]);
}

#[test]
fn test_parentheses() {
    check_output("on main\nput (2 + 3) * 4\nend\n", &["20"]);
}

#[test]
fn test_int_division_truncates() {
    check_output("on main\nput 7 / 2\nend\n", &["3"]);
}

#[test]
fn test_mixed_division_promotes() {
    check_output("on main\nput 7 / 2.0\nend\n", &["3.5000"]);
}

#[test]
fn test_promotion_to_float() {
    check_output("on main\nput 1 + 0.5\nend\n", &["1.5000"]);
}

#[test]
fn test_mod() {
    check_output("on main\nput 7 mod 3\nput 10 mod 2\nend\n", &["1", "0"]);
}

#[test]
fn test_unary_minus() {
    check_output("on main\nput -5\nput -(2 + 3)\nend\n", &["-5", "-5"]);
}

#[test]
fn test_unary_minus_on_variable() {
    check_output("on main\nx = 4\nput -x\nend\n", &["-4"]);
}

#[test]
fn test_and_or() {
    check_output(
        "on main\nput 1 and 1\nput 1 and 0\nput 0 or 1\nput 0 or 0\nend\n",
        &["1", "1", "0", "0"],
    );
}

#[test]
fn test_and_binds_tighter_than_plus() {
    // `and` sits at the multiplicative level, so it binds before `+`.
    check_output("on main\nput 1 and 1 + 1\nend\n", &["2"]);
}

#[test]
fn test_void_is_false_in_and() {
    check_output("on main\nput void and 1\nend\n", &["0"]);
}

#[test]
fn test_not() {
    check_output("on main\nput not 0\nput not 1\nput not 5\nend\n", &["1", "0", "0"]);
}

#[test]
fn test_not_on_non_integer_answers_false() {
    check_output("on main\nput not \"text\"\nput not void\nend\n", &["0", "0"]);
}

#[test]
fn test_comparisons() {
    check_output(
        "on main\nput 1 < 2\nput 2 <= 2\nput 3 > 4\nput 4 >= 4\nput 1 <> 2\nend\n",
        &["1", "1", "0", "1", "1"],
    );
}

#[test]
fn test_comparison_is_lowest_precedence() {
    check_output("on main\nput 1 + 2 = 3\nend\n", &["1"]);
}

#[test]
fn test_math_intrinsics() {
    check_output(
        "on main\nput abs(-5)\nput sqrt(9)\nput cos(0)\nend\n",
        &["5", "3.0000", "1.0000"],
    );
}

#[test]
fn test_float_intrinsic() {
    check_output("on main\nput float(3)\nput float(\"2.5\")\nend\n", &["3.0000", "2.5000"]);
}

#[test]
fn test_pi_constant() {
    check_output("on main\nput pi\nend\n", &["3.1416"]);
}

#[test]
fn test_true_false_fold_to_ints() {
    check_output("on main\nput true\nput false\nend\n", &["1", "0"]);
}

#[test]
fn test_float_mod() {
    check_output("on main\nput 7.5 mod 2\nend\n", &["1.5000"]);
}
