//! The syntax tree shared by the parser and the emitter.
//!
//! One closed sum per syntactic category. Identifiers carry their
//! resolved scope; the parser never hands an unresolved name past this
//! boundary.

use crate::token::Pos;

/// Where a resolved identifier lives. Property beats global beats
/// local.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Property,
    Global,
    Local,
}

/// The closed set of `the X` environment queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TheId {
    MoviePath = 0,
    Frame,
    DirSeparator,
    Milliseconds,
    RandomSeed,
    Platform,
}

impl TheId {
    pub const COUNT: u8 = 6;

    pub fn from_name(name: &str) -> Option<TheId> {
        match name {
            "moviepath" => Some(TheId::MoviePath),
            "frame" => Some(TheId::Frame),
            "dirseparator" => Some(TheId::DirSeparator),
            "milliseconds" => Some(TheId::Milliseconds),
            "randomseed" => Some(TheId::RandomSeed),
            "platform" => Some(TheId::Platform),
            _ => None,
        }
    }

    pub fn from_u8(v: u8) -> Option<TheId> {
        match v {
            0 => Some(TheId::MoviePath),
            1 => Some(TheId::Frame),
            2 => Some(TheId::DirSeparator),
            3 => Some(TheId::Milliseconds),
            4 => Some(TheId::RandomSeed),
            5 => Some(TheId::Platform),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TheId::MoviePath => "moviepath",
            TheId::Frame => "frame",
            TheId::DirSeparator => "dirseparator",
            TheId::Milliseconds => "milliseconds",
            TheId::RandomSeed => "randomseed",
            TheId::Platform => "platform",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    NotEq,
    Concat,
    ConcatSpace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i32),
    Float(f64),
    Str(String),
    Symbol(String),
    Void,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub pos: Pos,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Ident { name: String, scope: Scope },
    The(TheId),
    List(Vec<Expr>),
    PropList(Vec<(Expr, Expr)>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Dot {
        expr: Box<Expr>,
        key: String,
    },
    Index {
        expr: Box<Expr>,
        from: Box<Expr>,
        /// Present for a range read `expr[from..to]`.
        to: Option<Box<Expr>>,
    },
    /// `name(args)`: handler call dispatched by name.
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `recv.name(args)`: method call on a receiver value.
    MethodCall {
        recv: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(pos: Pos, kind: ExprKind) -> Self {
        Expr { pos, kind }
    }

    /// True for the expression shapes that may appear on the left of
    /// an assignment.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Ident { .. } | ExprKind::Dot { .. } | ExprKind::Index { to: None, .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub pos: Pos,
    pub kind: StmtKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    /// One or more literal labels sharing the clause body.
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Return(Option<Expr>),
    Assign {
        lvalue: Expr,
        rvalue: Expr,
    },
    Expr(Expr),
    If {
        branches: Vec<IfBranch>,
        else_body: Option<Vec<Stmt>>,
    },
    RepeatWhile {
        condition: Expr,
        body: Vec<Stmt>,
    },
    RepeatTo {
        var: Expr,
        init: Expr,
        stop: Expr,
        down: bool,
        body: Vec<Stmt>,
    },
    RepeatIn {
        var: Expr,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    ExitRepeat,
    NextRepeat,
    Put(Expr),
    PutOn {
        expr: Expr,
        target: Expr,
        before: bool,
    },
    Case {
        expr: Expr,
        clauses: Vec<CaseClause>,
        otherwise: Option<Vec<Stmt>>,
    },
}

/// One `on name ... end` declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct HandlerDecl {
    pub pos: Pos,
    pub name: String,
    pub params: Vec<String>,
    /// Locals collected during parse (declared by first assignment).
    pub locals: Vec<String>,
    pub body: Vec<Stmt>,
}

/// The script root: property names plus handler declarations, in
/// source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptRoot {
    pub properties: Vec<String>,
    pub globals: Vec<String>,
    pub handlers: Vec<HandlerDecl>,
}
