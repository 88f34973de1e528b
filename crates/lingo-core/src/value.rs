/// The runtime value variant.
///
/// Scalars (void, int, float) are stored inline; strings, lists,
/// property lists, points and quads live on the heap and are carried
/// by typed index. Symbols are interned per-VM and carried by id.
///
/// The int/void pair doubles as the boolean domain: int 0 is false,
/// any other int is true, void is false in conditionals.
use crate::heap::HeapIdx;
use crate::intern::SymbolId;
use crate::object::{LinearList, PropList, StrCell};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Void,
    Int(i32),
    Float(f64),
    Str(HeapIdx<StrCell>),
    Symbol(SymbolId),
    List(HeapIdx<LinearList>),
    PropList(HeapIdx<PropList>),
    Point(HeapIdx<crate::object::Point>),
    Quad(HeapIdx<crate::object::Quad>),
}

impl Value {
    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric view with int → float widening.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// The conditional-branch rule. Only int and void participate;
    /// any other type is `None` and the VM reports a type error.
    #[inline]
    pub fn as_condition(&self) -> Option<bool> {
        match self {
            Value::Int(i) => Some(*i != 0),
            Value::Void => Some(false),
            _ => None,
        }
    }

    /// Boolean results are always int 0 or 1.
    #[inline]
    pub fn from_bool(b: bool) -> Value {
        Value::Int(b as i32)
    }

    /// Tag name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::PropList(_) => "property list",
            Value::Point(_) => "point",
            Value::Quad(_) => "rect",
        }
    }

    /// Ordering of type tags, used to canonicalise operand order in
    /// the equality lattice.
    pub fn tag_order(&self) -> u8 {
        match self {
            Value::Void => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Symbol(_) => 4,
            Value::List(_) => 5,
            Value::PropList(_) => 6,
            Value::Point(_) => 7,
            Value::Quad(_) => 8,
        }
    }
}
