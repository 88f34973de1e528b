use super::helpers::*;
use lingo_compiler::compile;
use lingo_vm::Vm;

#[test]
fn test_property_assignment_and_read() {
    check_output("property p\non main\np = 5\nput p\nend\n", &["5"]);
}

#[test]
fn test_property_survives_across_calls() {
    // Two calls to main on the same receiver: the property keeps its
    // value from the first call.
    let src = "property p\non main\nif p = void then\np = 5\nend if\nput p\np = p + 1\nend\n";
    let script = compile(src.as_bytes(), true).unwrap();
    let mut vm = Vm::new();
    let sid = vm.load_script(&script);
    let recv = vm.new_instance(sid);
    let mut host = CaptureHost::new();
    vm.call_handler(&mut host, recv, "main", &[]).unwrap();
    vm.call_handler(&mut host, recv, "main", &[]).unwrap();
    assert_eq!(host.lines, vec!["5", "6"]);
}

#[test]
fn test_property_visible_from_called_handler() {
    // A zero-argument call passes the caller's receiver along, so
    // the callee sees the same property slots.
    let src = "property p\non main\np = 7\nshow()\nend\non show\nput p\nend\n";
    check_output(src, &["7"]);
}

#[test]
fn test_fresh_instances_have_void_properties() {
    let src = "property p\non main\nput p\nend\n";
    check_output(src, &["<Void>"]);
}

#[test]
fn test_script_level_global() {
    let src = "global g\non main\ng = 10\nother()\nend\non other\nglobal g\nput g\nend\n";
    check_output(src, &["10"]);
}

#[test]
fn test_handler_level_global() {
    let src = "on main\nglobal counter\ncounter = 3\nbump()\nput counter\nend\non bump\nglobal counter\ncounter = counter + 1\nend\n";
    check_output(src, &["4"]);
}

#[test]
fn test_unset_global_reads_void() {
    check_output("global g\non main\nput g\nend\n", &["<Void>"]);
}

#[test]
fn test_global_survives_between_entry_calls() {
    let src = "global tally\non main\nif tally = void then\ntally = 0\nend if\ntally = tally + 1\nput tally\nend\n";
    let script = compile(src.as_bytes(), true).unwrap();
    let mut vm = Vm::new();
    let sid = vm.load_script(&script);
    let recv = vm.new_instance(sid);
    let mut host = CaptureHost::new();
    vm.call_handler(&mut host, recv, "main", &[]).unwrap();
    vm.call_handler(&mut host, recv, "main", &[]).unwrap();
    assert_eq!(host.lines, vec!["1", "2"]);
}

#[test]
fn test_locals_reset_each_call() {
    let src = "on main\nx = void\nif x = void then\nx = 1\nelse\nx = x + 1\nend if\nput x\nend\n";
    let script = compile(src.as_bytes(), true).unwrap();
    let mut vm = Vm::new();
    let sid = vm.load_script(&script);
    let recv = vm.new_instance(sid);
    let mut host = CaptureHost::new();
    vm.call_handler(&mut host, recv, "main", &[]).unwrap();
    vm.call_handler(&mut host, recv, "main", &[]).unwrap();
    assert_eq!(host.lines, vec!["1", "1"]);
}

#[test]
fn test_property_beats_local_param() {
    // A parameter sharing a property's name is shadowed: the name
    // resolves to the property slot on the receiver.
    let src = "property x\non main me\nx = 3\nme.shadow(9)\nput x\nend\non shadow me, x\nput x\nend\n";
    check_output(src, &["3", "3"]);
}

#[test]
fn test_reserved_words_as_variables() {
    let src = "on main\npoint = 2\nstring = 3\nput point + string\nend\n";
    check_output(src, &["5"]);
}

#[test]
fn test_set_global_from_embedder() {
    let src = "global g\non main\nput g\nend\n";
    let script = compile(src.as_bytes(), true).unwrap();
    let mut vm = Vm::new();
    let sid = vm.load_script(&script);
    let recv = vm.new_instance(sid);
    vm.set_global("g", lingo_core::value::Value::Int(42));
    let mut host = CaptureHost::new();
    vm.call_handler(&mut host, recv, "main", &[]).unwrap();
    assert_eq!(host.lines, vec!["42"]);
}
