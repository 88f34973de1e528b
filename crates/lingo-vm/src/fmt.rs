//! Value stringification, shared by `PUT`, concatenation, and the
//! `string` intrinsic.

use lingo_core::heap::Heap;
use lingo_core::intern::SymbolTable;
use lingo_core::value::Value;

/// Nesting cap for self-referential containers.
const MAX_DEPTH: usize = 16;

/// The string form of a value. Top-level strings render raw; strings
/// inside containers render quoted.
pub fn format_value(v: Value, heap: &Heap, symbols: &SymbolTable) -> String {
    format_at(v, heap, symbols, false, 0)
}

fn format_at(v: Value, heap: &Heap, symbols: &SymbolTable, quoted: bool, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return "...".to_string();
    }
    match v {
        Value::Void => "<Void>".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{f:.4}"),
        Value::Str(idx) => {
            let text = String::from_utf8_lossy(heap.string(idx).as_bytes()).into_owned();
            if quoted {
                format!("\"{text}\"")
            } else {
                text
            }
        }
        Value::Symbol(id) => format!("#{}", symbols.name(id)),
        Value::List(idx) => {
            let items: Vec<String> = heap
                .list(idx)
                .items
                .iter()
                .map(|&item| format_at(item, heap, symbols, true, depth + 1))
                .collect();
            format!("[{}]", items.join(", "))
        }
        Value::PropList(idx) => {
            let plist = heap.prop_list(idx);
            if plist.is_empty() {
                return "[:]".to_string();
            }
            let pairs: Vec<String> = plist
                .entries
                .iter()
                .map(|(&k, &val)| {
                    format!(
                        "#{}: {}",
                        symbols.name(k),
                        format_at(val, heap, symbols, true, depth + 1)
                    )
                })
                .collect();
            format!("[{}]", pairs.join(", "))
        }
        Value::Point(idx) => {
            let p = heap.point(idx);
            format!(
                "point({}, {})",
                format_at(p.h, heap, symbols, false, depth + 1),
                format_at(p.v, heap, symbols, false, depth + 1)
            )
        }
        Value::Quad(idx) => {
            let q = heap.quad(idx);
            format!(
                "rect({}, {}, {}, {})",
                format_at(q.left, heap, symbols, false, depth + 1),
                format_at(q.top, heap, symbols, false, depth + 1),
                format_at(q.right, heap, symbols, false, depth + 1),
                format_at(q.bottom, heap, symbols, false, depth + 1)
            )
        }
    }
}
