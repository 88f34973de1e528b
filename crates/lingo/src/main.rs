use lingo_compiler::disasm::disassemble;
use lingo_compiler::compile;
use lingo_vm::{StdHost, Vm};
use std::io::{Read, Write};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut input: Option<String> = None;
    let mut output: Option<String> = None;
    let mut line_numbers = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--no-line-numbers" => line_numbers = false,
            arg if arg.starts_with("--") => {
                eprintln!("lingoc: unrecognized option '{arg}'");
                std::process::exit(2);
            }
            arg => {
                if input.is_none() {
                    input = Some(arg.to_string());
                } else if output.is_none() {
                    output = Some(arg.to_string());
                } else {
                    eprintln!("lingoc: too many arguments");
                    std::process::exit(2);
                }
            }
        }
        i += 1;
    }

    let input = match input {
        Some(input) => input,
        None => {
            eprintln!("usage: lingoc <input> [output] [--no-line-numbers]");
            std::process::exit(2);
        }
    };

    let source = if input == "-" {
        let mut buf = Vec::new();
        if let Err(e) = std::io::stdin().read_to_end(&mut buf) {
            eprintln!("lingoc: cannot read stdin: {e}");
            std::process::exit(2);
        }
        buf
    } else {
        match std::fs::read(&input) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("lingoc: cannot open {input}: {e}");
                std::process::exit(2);
            }
        }
    };

    let script = match compile(&source, line_numbers) {
        Ok(script) => script,
        Err(e) => {
            let pos = e.pos();
            eprintln!("error {}:{}: {}", pos.line, pos.column, e.message());
            std::process::exit(1);
        }
    };

    if let Some(ref output) = output {
        let mut listing = String::new();
        for handler in &script.handlers {
            listing.push_str(&disassemble(&handler.chunk, &handler.name));
            listing.push('\n');
        }
        let result = if output == "-" {
            std::io::stdout().write_all(listing.as_bytes())
        } else {
            std::fs::write(output, listing.as_bytes())
        };
        if let Err(e) = result {
            eprintln!("lingoc: cannot write {output}: {e}");
            std::process::exit(2);
        }
    }

    // When the script defines a `main` handler, run it.
    if script.handler("main").is_some() {
        let mut vm = Vm::new();
        let sid = vm.load_script(&script);
        let receiver = vm.new_instance(sid);
        let mut host = StdHost::new();
        if let Err(e) = vm.call_handler(&mut host, receiver, "main", &[]) {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
