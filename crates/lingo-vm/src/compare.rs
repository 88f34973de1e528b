//! Equality and ordering over the dynamic type lattice.
//!
//! Equality canonicalises operand order by type tag, then applies the
//! documented rules: numbers compare numerically, a number against a
//! numeric-looking string parses the string first (a non-parseable
//! string is a runtime error), strings and symbols compare by byte
//! content, symbols compare by identity. Ordering is defined on
//! numeric pairs and on strings lexicographically.

use lingo_core::heap::Heap;
use lingo_core::intern::SymbolTable;
use lingo_core::value::Value;
use std::cmp::Ordering;

pub fn eq(a: Value, b: Value, heap: &Heap, symbols: &SymbolTable) -> Result<bool, String> {
    let (a, b) = if b.tag_order() < a.tag_order() {
        (b, a)
    } else {
        (a, b)
    };

    match (a, b) {
        (Value::Void, Value::Void) => Ok(true),
        (Value::Void, _) => Ok(false),

        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Int(x), Value::Float(y)) => Ok(x as f64 == y),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),

        (Value::Int(x), Value::Str(s)) => {
            let parsed = parse_numeric(heap.string(s).as_bytes())?;
            Ok(match parsed {
                Parsed::Int(y) => x == y,
                Parsed::Float(y) => x as f64 == y,
            })
        }
        (Value::Float(x), Value::Str(s)) => {
            let parsed = parse_numeric(heap.string(s).as_bytes())?;
            Ok(match parsed {
                Parsed::Int(y) => x == y as f64,
                Parsed::Float(y) => x == y,
            })
        }

        (Value::Str(x), Value::Str(y)) => {
            Ok(heap.string(x).as_bytes() == heap.string(y).as_bytes())
        }
        (Value::Str(x), Value::Symbol(y)) => {
            Ok(heap.string(x).as_bytes() == symbols.get_bytes(y))
        }
        (Value::Symbol(x), Value::Symbol(y)) => Ok(x == y),

        // Points and quads are value-like; compare component-wise.
        (Value::Point(x), Value::Point(y)) => {
            let (px, py) = (*heap.point(x), *heap.point(y));
            Ok(eq(px.h, py.h, heap, symbols)? && eq(px.v, py.v, heap, symbols)?)
        }
        (Value::Quad(x), Value::Quad(y)) => {
            let (qx, qy) = (*heap.quad(x), *heap.quad(y));
            Ok(eq(qx.left, qy.left, heap, symbols)?
                && eq(qx.top, qy.top, heap, symbols)?
                && eq(qx.right, qy.right, heap, symbols)?
                && eq(qx.bottom, qy.bottom, heap, symbols)?)
        }

        // Containers compare by identity.
        (Value::List(x), Value::List(y)) => Ok(x == y),
        (Value::PropList(x), Value::PropList(y)) => Ok(x == y),

        _ => Ok(false),
    }
}

enum Parsed {
    Int(i32),
    Float(f64),
}

/// Parse a string operand as a number: float when it contains a dot,
/// integer otherwise. Failure is a runtime error, not false.
fn parse_numeric(bytes: &[u8]) -> Result<Parsed, String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| "cannot compare number with non-numeric string".to_string())?;
    let trimmed = text.trim();
    if trimmed.contains('.') {
        trimmed
            .parse::<f64>()
            .map(Parsed::Float)
            .map_err(|_| format!("cannot compare number with non-numeric string \"{text}\""))
    } else {
        trimmed
            .parse::<i32>()
            .map(Parsed::Int)
            .map_err(|_| format!("cannot compare number with non-numeric string \"{text}\""))
    }
}

/// Ordering relation. `None` when the operands are comparable in type
/// but not ordered (a NaN float).
pub fn order(a: Value, b: Value, heap: &Heap) -> Result<Option<Ordering>, String> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Some(x.cmp(&y))),
        (Value::Int(_), Value::Float(_))
        | (Value::Float(_), Value::Int(_))
        | (Value::Float(_), Value::Float(_)) => {
            let fa = a.as_number().unwrap();
            let fb = b.as_number().unwrap();
            Ok(fa.partial_cmp(&fb))
        }
        (Value::Str(x), Value::Str(y)) => {
            Ok(Some(heap.string(x).as_bytes().cmp(heap.string(y).as_bytes())))
        }
        _ => Err(format!(
            "cannot order {} and {}",
            a.type_name(),
            b.type_name()
        )),
    }
}

pub fn lt(a: Value, b: Value, heap: &Heap) -> Result<bool, String> {
    Ok(matches!(order(a, b, heap)?, Some(Ordering::Less)))
}

pub fn gt(a: Value, b: Value, heap: &Heap) -> Result<bool, String> {
    Ok(matches!(order(a, b, heap)?, Some(Ordering::Greater)))
}

pub fn lte(a: Value, b: Value, heap: &Heap) -> Result<bool, String> {
    Ok(matches!(
        order(a, b, heap)?,
        Some(Ordering::Less) | Some(Ordering::Equal)
    ))
}

pub fn gte(a: Value, b: Value, heap: &Heap) -> Result<bool, String> {
    Ok(matches!(
        order(a, b, heap)?,
        Some(Ordering::Greater) | Some(Ordering::Equal)
    ))
}

/// Total order used by the `sort` intrinsic: type tag first, then the
/// in-type ordering, with unordered pairs treated as equal.
pub fn sort_order(a: Value, b: Value, heap: &Heap) -> Ordering {
    let by_tag = a.tag_order().cmp(&b.tag_order());
    if by_tag != Ordering::Equal {
        // Ints and floats interleave numerically.
        if a.is_number() && b.is_number() {
            return a
                .as_number()
                .unwrap()
                .partial_cmp(&b.as_number().unwrap())
                .unwrap_or(Ordering::Equal);
        }
        return by_tag;
    }
    order(a, b, heap)
        .ok()
        .flatten()
        .unwrap_or(Ordering::Equal)
}
