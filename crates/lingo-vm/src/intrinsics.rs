//! Host-independent intrinsics: the container protocol backing the
//! `OIDX*` opcodes and method dispatch, plus the named handlers
//! (`abs`, `cos`, `string`, `point`, …) reachable through `CALL`.

use crate::fmt::format_value;
use crate::host::{Host, HostValue};
use lingo_core::heap::Heap;
use lingo_core::intern::{SymbolId, SymbolTable};
use lingo_core::object::{LinearList, Point, Quad};
use lingo_core::value::Value;

/// `obj[key]` read. Allocates only for string character access.
pub fn index_get(
    obj: Value,
    key: Value,
    heap: &mut Heap,
    symbols: &SymbolTable,
) -> Result<Value, String> {
    match obj {
        Value::List(idx) => {
            let list = heap.list(idx);
            let i = int_index(key, list.len())?;
            Ok(list.items[i])
        }
        Value::PropList(idx) => {
            let plist = heap.prop_list(idx);
            match key {
                Value::Symbol(sym) => plist
                    .get(sym)
                    .ok_or_else(|| format!("key not found: #{}", symbols.name(sym))),
                Value::Str(s) => {
                    let bytes = heap.string(s).as_bytes();
                    let found = symbols.find(bytes).and_then(|sym| plist.get(sym));
                    found.ok_or_else(|| {
                        format!(
                            "key not found: \"{}\"",
                            String::from_utf8_lossy(heap.string(s).as_bytes())
                        )
                    })
                }
                Value::Int(_) => {
                    let i = int_index(key, plist.len())?;
                    Ok(*plist.entries.get_index(i).unwrap().1)
                }
                other => Err(format!(
                    "cannot index property list with {}",
                    other.type_name()
                )),
            }
        }
        Value::Str(idx) => {
            let bytes = heap.string(idx).as_bytes();
            let i = int_index(key, bytes.len())?;
            let ch = vec![bytes[i]];
            Ok(Value::Str(heap.alloc_string(ch)))
        }
        Value::Point(idx) => {
            let p = *heap.point(idx);
            match key {
                Value::Int(1) => Ok(p.h),
                Value::Int(2) => Ok(p.v),
                Value::Symbol(sym) => match symbols.get_bytes(sym) {
                    b"loch" => Ok(p.h),
                    b"locv" => Ok(p.v),
                    _ => Err(format!("point has no property #{}", symbols.name(sym))),
                },
                _ => Err("point index must be 1 or 2".to_string()),
            }
        }
        Value::Quad(idx) => {
            let q = *heap.quad(idx);
            match key {
                Value::Int(1) => Ok(q.left),
                Value::Int(2) => Ok(q.top),
                Value::Int(3) => Ok(q.right),
                Value::Int(4) => Ok(q.bottom),
                Value::Symbol(sym) => match symbols.get_bytes(sym) {
                    b"left" => Ok(q.left),
                    b"top" => Ok(q.top),
                    b"right" => Ok(q.right),
                    b"bottom" => Ok(q.bottom),
                    _ => Err(format!("rect has no property #{}", symbols.name(sym))),
                },
                _ => Err("rect index must be 1 to 4".to_string()),
            }
        }
        other => Err(format!("cannot index {}", other.type_name())),
    }
}

/// `obj[key] = value`.
pub fn index_set(
    obj: Value,
    key: Value,
    value: Value,
    heap: &mut Heap,
    symbols: &mut SymbolTable,
) -> Result<(), String> {
    match obj {
        Value::List(idx) => {
            let i = match key {
                Value::Int(i) if i >= 1 => i as usize,
                other => {
                    return Err(format!(
                        "list index must be a positive integer, got {}",
                        other.type_name()
                    ))
                }
            };
            let list = heap.list_mut(idx);
            // Writing past the end grows the list, void-filled.
            while list.len() < i {
                list.items.push(Value::Void);
            }
            list.items[i - 1] = value;
            Ok(())
        }
        Value::PropList(idx) => {
            let sym = match key {
                Value::Symbol(sym) => sym,
                Value::Str(s) => {
                    let bytes = heap.string(s).as_bytes().to_vec();
                    symbols.intern(&bytes)
                }
                Value::Int(_) => {
                    let i = int_index(key, heap.prop_list(idx).len())?;
                    let sym = *heap.prop_list(idx).entries.get_index(i).unwrap().0;
                    heap.prop_list_mut(idx).set(sym, value);
                    return Ok(());
                }
                other => {
                    return Err(format!(
                        "property list key must be a symbol, got {}",
                        other.type_name()
                    ))
                }
            };
            heap.prop_list_mut(idx).set(sym, value);
            Ok(())
        }
        Value::Point(idx) => {
            let p = heap.point_mut(idx);
            match key {
                Value::Int(1) => p.h = value,
                Value::Int(2) => p.v = value,
                Value::Symbol(sym) if symbols.get_bytes(sym) == b"loch" => p.h = value,
                Value::Symbol(sym) if symbols.get_bytes(sym) == b"locv" => p.v = value,
                _ => return Err("point index must be 1 or 2".to_string()),
            }
            Ok(())
        }
        Value::Quad(idx) => {
            let q = heap.quad_mut(idx);
            match key {
                Value::Int(1) => q.left = value,
                Value::Int(2) => q.top = value,
                Value::Int(3) => q.right = value,
                Value::Int(4) => q.bottom = value,
                Value::Symbol(sym) if symbols.get_bytes(sym) == b"left" => q.left = value,
                Value::Symbol(sym) if symbols.get_bytes(sym) == b"top" => q.top = value,
                Value::Symbol(sym) if symbols.get_bytes(sym) == b"right" => q.right = value,
                Value::Symbol(sym) if symbols.get_bytes(sym) == b"bottom" => q.bottom = value,
                _ => return Err("rect index must be 1 to 4".to_string()),
            }
            Ok(())
        }
        other => Err(format!("cannot index {}", other.type_name())),
    }
}

/// `obj[a..b]` read: sublist or substring, 1-based inclusive.
pub fn range_get(obj: Value, a: Value, b: Value, heap: &mut Heap) -> Result<Value, String> {
    let (from, to) = match (a, b) {
        (Value::Int(x), Value::Int(y)) => (x, y),
        _ => return Err("range bounds must be integers".to_string()),
    };
    match obj {
        Value::List(idx) => {
            let list = heap.list(idx);
            let (lo, hi) = check_range(from, to, list.len())?;
            let slice = list.items[lo..hi].to_vec();
            Ok(Value::List(heap.alloc_list(LinearList { items: slice })))
        }
        Value::Str(idx) => {
            let bytes = heap.string(idx).as_bytes();
            let (lo, hi) = check_range(from, to, bytes.len())?;
            let sub = bytes[lo..hi].to_vec();
            Ok(Value::Str(heap.alloc_string(sub)))
        }
        other => Err(format!("cannot take a range of {}", other.type_name())),
    }
}

fn int_index(key: Value, len: usize) -> Result<usize, String> {
    match key {
        Value::Int(i) if i >= 1 && (i as usize) <= len => Ok(i as usize - 1),
        Value::Int(i) => Err(format!("index {i} out of range 1..{len}")),
        other => Err(format!("index must be an integer, got {}", other.type_name())),
    }
}

fn check_range(from: i32, to: i32, len: usize) -> Result<(usize, usize), String> {
    if from < 1 || to < from || (to as usize) > len {
        return Err(format!("range {from}..{to} out of range 1..{len}"));
    }
    Ok((from as usize - 1, to as usize))
}

/// Method dispatch for receivers without an attached script.
pub fn method_call(
    recv: Value,
    name: &str,
    args: &[Value],
    heap: &mut Heap,
    symbols: &mut SymbolTable,
) -> Result<Value, String> {
    match recv {
        Value::List(idx) => match name {
            "add" | "append" => {
                let value = arg(args, 0, name)?;
                heap.list_mut(idx).items.push(value);
                Ok(Value::Void)
            }
            "count" | "length" => Ok(Value::Int(heap.list(idx).len() as i32)),
            "getat" => {
                let key = arg(args, 0, name)?;
                index_get(recv, key, heap, symbols)
            }
            "setat" => {
                let key = arg(args, 0, name)?;
                let value = arg(args, 1, name)?;
                index_set(recv, key, value, heap, symbols)?;
                Ok(Value::Void)
            }
            "deleteat" => {
                let key = arg(args, 0, name)?;
                let i = int_index(key, heap.list(idx).len())?;
                heap.list_mut(idx).items.remove(i);
                Ok(Value::Void)
            }
            "getpos" => {
                let needle = arg(args, 0, name)?;
                let items = heap.list(idx).items.clone();
                for (i, item) in items.iter().enumerate() {
                    if crate::compare::eq(*item, needle, heap, symbols).unwrap_or(false) {
                        return Ok(Value::Int(i as i32 + 1));
                    }
                }
                Ok(Value::Int(0))
            }
            "sort" => {
                let mut items = heap.list(idx).items.clone();
                items.sort_by(|&a, &b| crate::compare::sort_order(a, b, heap));
                heap.list_mut(idx).items = items;
                Ok(Value::Void)
            }
            _ => Err(format!("no method '{name}' for list")),
        },
        Value::PropList(idx) => match name {
            "count" | "length" => Ok(Value::Int(heap.prop_list(idx).len() as i32)),
            "getat" => {
                let key = arg(args, 0, name)?;
                index_get(recv, key, heap, symbols)
            }
            "setat" => {
                let key = arg(args, 0, name)?;
                let value = arg(args, 1, name)?;
                index_set(recv, key, value, heap, symbols)?;
                Ok(Value::Void)
            }
            "deleteat" => {
                let key = arg(args, 0, name)?;
                let sym = match key {
                    Value::Symbol(sym) => sym,
                    Value::Str(s) => {
                        let bytes = heap.string(s).as_bytes().to_vec();
                        symbols.intern(&bytes)
                    }
                    other => {
                        return Err(format!(
                            "property list key must be a symbol, got {}",
                            other.type_name()
                        ))
                    }
                };
                heap.prop_list_mut(idx).entries.shift_remove(&sym);
                Ok(Value::Void)
            }
            "sort" => {
                let mut entries: Vec<(SymbolId, Value)> = heap
                    .prop_list(idx)
                    .entries
                    .iter()
                    .map(|(&k, &v)| (k, v))
                    .collect();
                entries.sort_by(|a, b| symbols.get_bytes(a.0).cmp(symbols.get_bytes(b.0)));
                let plist = heap.prop_list_mut(idx);
                plist.entries.clear();
                for (k, v) in entries {
                    plist.entries.insert(k, v);
                }
                Ok(Value::Void)
            }
            _ => Err(format!("no method '{name}' for property list")),
        },
        Value::Str(idx) => match name {
            "count" | "length" => Ok(Value::Int(heap.string(idx).len() as i32)),
            "getat" => {
                let key = arg(args, 0, name)?;
                index_get(recv, key, heap, symbols)
            }
            _ => Err(format!("no method '{name}' for string")),
        },
        other => Err(format!("no method '{name}' for {}", other.type_name())),
    }
}

fn arg(args: &[Value], i: usize, name: &str) -> Result<Value, String> {
    args.get(i)
        .copied()
        .ok_or_else(|| format!("'{name}' is missing argument {}", i + 1))
}

/// Named intrinsics reachable through `CALL` when no script handler
/// matches. Returns `None` when the name is not an intrinsic.
pub fn call_named(
    name: &str,
    args: &[Value],
    heap: &mut Heap,
    symbols: &mut SymbolTable,
    host: &mut dyn Host,
) -> Option<Result<Value, String>> {
    let result = match name {
        "abs" => number_arg(args, "abs").map(|v| match v {
            Value::Int(i) => Value::Int(i.wrapping_abs()),
            Value::Float(f) => Value::Float(f.abs()),
            _ => unreachable!(),
        }),
        "atan" => float_fn(args, "atan", f64::atan),
        "cos" => float_fn(args, "cos", f64::cos),
        "exp" => float_fn(args, "exp", f64::exp),
        "log" => float_fn(args, "log", f64::ln),
        "sin" => float_fn(args, "sin", f64::sin),
        "sqrt" => float_fn(args, "sqrt", f64::sqrt),
        "string" => match arg(args, 0, "string") {
            Ok(v) => {
                let text = format_value(v, heap, symbols);
                Ok(Value::Str(heap.alloc_string(text.into_bytes())))
            }
            Err(e) => Err(e),
        },
        "float" => match arg(args, 0, "float") {
            Ok(Value::Int(i)) => Ok(Value::Float(i as f64)),
            Ok(Value::Float(f)) => Ok(Value::Float(f)),
            Ok(Value::Str(idx)) => {
                let text = String::from_utf8_lossy(heap.string(idx).as_bytes()).into_owned();
                match text.trim().parse::<f64>() {
                    Ok(f) => Ok(Value::Float(f)),
                    Err(_) => Err(format!("cannot convert \"{text}\" to float")),
                }
            }
            Ok(other) => Err(format!("cannot convert {} to float", other.type_name())),
            Err(e) => Err(e),
        },
        "point" => match (number_at(args, 0, "point"), number_at(args, 1, "point")) {
            (Ok(h), Ok(v)) => Ok(Value::Point(heap.alloc_point(Point { h, v }))),
            (Err(e), _) | (_, Err(e)) => Err(e),
        },
        "rect" => {
            let vals: Result<Vec<Value>, String> =
                (0..4).map(|i| number_at(args, i, "rect")).collect();
            match vals {
                Ok(v) => Ok(Value::Quad(heap.alloc_quad(Quad {
                    left: v[0],
                    top: v[1],
                    right: v[2],
                    bottom: v[3],
                }))),
                Err(e) => Err(e),
            }
        }
        "member" | "sprite" => {
            match args
                .iter()
                .map(|&v| to_host_value(v, heap, symbols))
                .collect::<Result<Vec<HostValue>, String>>()
            {
                Ok(hargs) => {
                    let res = if name == "member" {
                        host.member(&hargs)
                    } else {
                        host.sprite(&hargs)
                    };
                    res.map(|hv| from_host_value(hv, heap))
                }
                Err(e) => Err(e),
            }
        }
        _ => return None,
    };
    Some(result)
}

/// Convert a scalar value for the host boundary.
pub fn to_host_value(v: Value, heap: &Heap, symbols: &SymbolTable) -> Result<HostValue, String> {
    match v {
        Value::Void => Ok(HostValue::Void),
        Value::Int(i) => Ok(HostValue::Int(i)),
        Value::Float(f) => Ok(HostValue::Float(f)),
        Value::Str(idx) => Ok(HostValue::Str(
            String::from_utf8_lossy(heap.string(idx).as_bytes()).into_owned(),
        )),
        Value::Symbol(id) => Ok(HostValue::Str(symbols.name(id))),
        other => Err(format!("cannot pass {} to the host", other.type_name())),
    }
}

/// Bring a host answer back as a value.
pub fn from_host_value(hv: HostValue, heap: &mut Heap) -> Value {
    match hv {
        HostValue::Void => Value::Void,
        HostValue::Int(i) => Value::Int(i),
        HostValue::Float(f) => Value::Float(f),
        HostValue::Str(s) => Value::Str(heap.alloc_string(s.into_bytes())),
    }
}

fn number_arg(args: &[Value], name: &str) -> Result<Value, String> {
    match arg(args, 0, name)? {
        v @ (Value::Int(_) | Value::Float(_)) => Ok(v),
        other => Err(format!("'{name}' expects a number, got {}", other.type_name())),
    }
}

fn number_at(args: &[Value], i: usize, name: &str) -> Result<Value, String> {
    match arg(args, i, name)? {
        v @ (Value::Int(_) | Value::Float(_)) => Ok(v),
        other => Err(format!("'{name}' expects numbers, got {}", other.type_name())),
    }
}

fn float_fn(args: &[Value], name: &str, f: fn(f64) -> f64) -> Result<Value, String> {
    let v = number_arg(args, name)?;
    Ok(Value::Float(f(v.as_number().unwrap())))
}
