use super::helpers::*;

#[test]
fn test_list_literal_prints() {
    check_output("on main\nput [1, 2, 3]\nend\n", &["[1, 2, 3]"]);
}

#[test]
fn test_empty_list_prints() {
    check_output("on main\nput []\nend\n", &["[]"]);
}

#[test]
fn test_list_strings_print_quoted() {
    check_output("on main\nput [1, \"a\"]\nend\n", &["[1, \"a\"]"]);
}

#[test]
fn test_list_index_read_write() {
    check_output(
        "on main\nx = [10, 20]\nput x[1]\nx[2] = 99\nput x[2]\nend\n",
        &["10", "99"],
    );
}

#[test]
fn test_list_add_and_count() {
    let src = "on main\nx = []\nx.add(5)\nx.add(7)\nput x.count()\nput x\nend\n";
    check_output(src, &["2", "[5, 7]"]);
}

#[test]
fn test_list_getat_setat() {
    let src = "on main\nx = [1, 2, 3]\nput x.getat(2)\nx.setat(2, 9)\nput x\nend\n";
    check_output(src, &["2", "[1, 9, 3]"]);
}

#[test]
fn test_list_deleteat() {
    check_output(
        "on main\nx = [1, 2, 3]\nx.deleteat(2)\nput x\nend\n",
        &["[1, 3]"],
    );
}

#[test]
fn test_list_getpos() {
    let src = "on main\nx = [#a, #b]\nput x.getpos(#b)\nput x.getpos(#z)\nend\n";
    check_output(src, &["2", "0"]);
}

#[test]
fn test_list_sort() {
    check_output(
        "on main\nx = [3, 1, 2]\nx.sort()\nput x\nend\n",
        &["[1, 2, 3]"],
    );
}

#[test]
fn test_list_range() {
    check_output(
        "on main\nx = [1, 2, 3, 4]\nput x[2..3]\nend\n",
        &["[2, 3]"],
    );
}

#[test]
fn test_nested_lists() {
    check_output(
        "on main\nx = [[1, 2], [3]]\nput x[1][2]\nput x\nend\n",
        &["2", "[[1, 2], [3]]"],
    );
}

#[test]
fn test_lists_are_references() {
    let src = "on main\na = [1]\nb = a\nb.add(2)\nput a\nend\n";
    check_output(src, &["[1, 2]"]);
}

#[test]
fn test_prop_list_literal() {
    check_output("on main\nput [#a: 1, #b: 2]\nend\n", &["[#a: 1, #b: 2]"]);
}

#[test]
fn test_empty_prop_list() {
    check_output("on main\nput [:]\nend\n", &["[:]"]);
}

#[test]
fn test_prop_list_dot_access() {
    let src = "on main\nd = [#name: \"ada\"]\nput d.name\nd.name = \"grace\"\nput d.name\nend\n";
    check_output(src, &["ada", "grace"]);
}

#[test]
fn test_prop_list_index_by_symbol() {
    let src = "on main\nd = [#k: 5]\nput d[#k]\nd[#k] = 6\nput d[#k]\nend\n";
    check_output(src, &["5", "6"]);
}

#[test]
fn test_prop_list_preserves_insertion_order() {
    let src = "on main\nd = [:]\nd.setat(#z, 1)\nd.setat(#a, 2)\nd.setat(#m, 3)\nput d\nend\n";
    check_output(src, &["[#z: 1, #a: 2, #m: 3]"]);
}

#[test]
fn test_prop_list_overwrite_keeps_position() {
    let src = "on main\nd = [#a: 1, #b: 2]\nd.a = 9\nput d\nend\n";
    check_output(src, &["[#a: 9, #b: 2]"]);
}

#[test]
fn test_prop_list_positional_access() {
    let src = "on main\nd = [#a: 10, #b: 20]\nput d[2]\nput d.getat(1)\nend\n";
    check_output(src, &["20", "10"]);
}

#[test]
fn test_prop_list_sort_by_key_name() {
    let src = "on main\nd = [#z: 1, #a: 2]\nd.sort()\nput d\nend\n";
    check_output(src, &["[#a: 2, #z: 1]"]);
}

#[test]
fn test_dot_key_index_chain() {
    // o.k[i] goes through the keyed index op.
    let src = "on main\no = [#items: [5, 6, 7]]\nput o.items[2]\nend\n";
    check_output(src, &["6"]);
}

#[test]
fn test_dot_key_range_chain() {
    let src = "on main\no = [#items: [5, 6, 7]]\nput o.items[1..2]\nend\n";
    check_output(src, &["[5, 6]"]);
}

#[test]
fn test_point_constructor_and_fields() {
    let src = "on main\np = point(3, 4)\nput p\nput p.loch\nput p[2]\nend\n";
    check_output(src, &["point(3, 4)", "3", "4"]);
}

#[test]
fn test_rect_constructor_and_fields() {
    let src = "on main\nr = rect(1, 2, 3, 4)\nput r\nput r.left\nput r.bottom\nend\n";
    check_output(src, &["rect(1, 2, 3, 4)", "1", "4"]);
}

#[test]
fn test_point_field_assignment() {
    let src = "on main\np = point(1, 2)\np.loch = 9\nput p\nend\n";
    check_output(src, &["point(9, 2)"]);
}

#[test]
fn test_point_equality_is_componentwise() {
    let src = "on main\nput point(1, 2) = point(1, 2)\nput point(1, 2) = point(1, 3)\nend\n";
    check_output(src, &["1", "0"]);
}

#[test]
fn test_repeat_in_over_built_list() {
    let src = "on main\nx = []\nrepeat with i = 1 to 3\nx.add(i * i)\nend repeat\nrepeat with v in x\nput v\nend repeat\nend\n";
    check_output(src, &["1", "4", "9"]);
}

#[test]
fn test_many_allocations_survive_collection() {
    // Enough garbage to trip the collector; the live list must keep
    // its contents.
    let src = "on main\nkeep = [1, 2, 3]\nrepeat with i = 1 to 2000\nt = \"junk\" & i\nend repeat\nput keep\nend\n";
    check_output(src, &["[1, 2, 3]"]);
}
