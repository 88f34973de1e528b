//! Token list → script root, with scope resolution.
//!
//! The parser owns three name spaces while it works: the script's
//! property set, the global set (script-level plus per-handler
//! `global` declarations), and the handler's parameter/local set.
//! Identifiers are resolved here, property first, then global, then
//! local; an unresolved name in a non-call position is an error, and
//! an assignment to an unresolved bare name declares a local.

use crate::ast::*;
use crate::token::{Keyword, Pos, Punct, SpannedToken, Token, WordId};
use std::collections::HashSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub pos: Pos,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.pos.line, self.pos.column, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse a full token list into a script root.
pub fn parse(tokens: &[SpannedToken]) -> Result<ScriptRoot, ParseError> {
    let mut parser = Parser::new(tokens);
    parser.parse_script()
}

struct HandlerCtx {
    params: Vec<String>,
    locals: Vec<String>,
    globals: HashSet<String>,
}

struct Parser<'a> {
    tokens: &'a [SpannedToken],
    index: usize,
    properties: Vec<String>,
    script_globals: Vec<String>,
    handler: Option<HandlerCtx>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [SpannedToken]) -> Self {
        Parser {
            tokens,
            index: 0,
            properties: Vec::new(),
            script_globals: Vec::new(),
            handler: None,
        }
    }

    // ---- Token helpers ----

    fn eof(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn last_pos(&self) -> Pos {
        self.tokens
            .last()
            .map(|t| t.pos)
            .unwrap_or(Pos { line: 1, column: 1 })
    }

    fn error(&self, pos: Pos, message: impl Into<String>) -> ParseError {
        ParseError {
            pos,
            message: message.into(),
        }
    }

    fn eof_error(&self) -> ParseError {
        self.error(self.last_pos(), "unexpected end of input")
    }

    fn peek(&self) -> Result<&'a SpannedToken, ParseError> {
        self.tokens.get(self.index).ok_or_else(|| self.eof_error())
    }

    fn peek_at(&self, offset: usize) -> Option<&'a SpannedToken> {
        self.tokens.get(self.index + offset)
    }

    fn pop(&mut self) -> Result<&'a SpannedToken, ParseError> {
        let tok = self.tokens.get(self.index).ok_or_else(|| self.eof_error())?;
        self.index += 1;
        Ok(tok)
    }

    fn check_punct(&self, p: Punct) -> bool {
        matches!(self.peek(), Ok(st) if st.token.is_punct(p))
    }

    fn check_word(&self, id: WordId) -> bool {
        matches!(self.peek(), Ok(st) if st.token.is_word(id))
    }

    fn check_keyword(&self, k: Keyword) -> bool {
        matches!(self.peek(), Ok(st) if st.token.is_keyword(k))
    }

    fn check_line_end(&self) -> bool {
        matches!(self.peek(), Ok(st) if st.token.is_line_end())
    }

    fn accept_punct(&mut self, p: Punct) -> bool {
        if self.check_punct(p) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Result<(), ParseError> {
        let st = self.peek()?;
        if st.token.is_punct(p) {
            self.index += 1;
            Ok(())
        } else {
            Err(self.error(st.pos, format!("expected '{}', got {}", p, st.token.kind_str())))
        }
    }

    fn expect_word(&mut self, id: WordId, what: &str) -> Result<(), ParseError> {
        let st = self.peek()?;
        if st.token.is_word(id) {
            self.index += 1;
            Ok(())
        } else {
            Err(self.error(st.pos, format!("expected '{}', got {}", what, st.token.kind_str())))
        }
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<(), ParseError> {
        let st = self.peek()?;
        if st.token.is_keyword(k) {
            self.index += 1;
            Ok(())
        } else {
            Err(self.error(st.pos, format!("expected '{}', got {}", k, st.token.kind_str())))
        }
    }

    fn expect_line_end(&mut self) -> Result<(), ParseError> {
        let st = self.peek()?;
        if st.token.is_line_end() {
            self.index += 1;
            Ok(())
        } else {
            Err(self.error(st.pos, format!("expected end of line, got {}", st.token.kind_str())))
        }
    }

    /// Any word token is a valid name; keywords are not.
    fn expect_name(&mut self) -> Result<(String, Pos), ParseError> {
        let st = self.peek()?;
        match &st.token {
            Token::Word { text, .. } => {
                self.index += 1;
                Ok((text.clone(), st.pos))
            }
            other => Err(self.error(st.pos, format!("expected name, got {}", other.kind_str()))),
        }
    }

    // ---- Scope resolution ----

    fn resolve(&self, name: &str) -> Option<Scope> {
        if self.properties.iter().any(|p| p == name) {
            return Some(Scope::Property);
        }
        let ctx = self.handler.as_ref();
        if self.script_globals.iter().any(|g| g == name)
            || ctx.map(|c| c.globals.contains(name)).unwrap_or(false)
        {
            return Some(Scope::Global);
        }
        if let Some(ctx) = ctx {
            if ctx.params.iter().any(|p| p == name) || ctx.locals.iter().any(|l| l == name) {
                return Some(Scope::Local);
            }
        }
        None
    }

    /// Resolve a name, declaring a fresh local when it is unknown.
    fn resolve_or_declare(&mut self, name: &str) -> Scope {
        if let Some(scope) = self.resolve(name) {
            return scope;
        }
        let ctx = self.handler.as_mut().expect("declaration outside handler");
        ctx.locals.push(name.to_string());
        Scope::Local
    }

    // ---- Script level ----

    fn parse_script(&mut self) -> Result<ScriptRoot, ParseError> {
        let mut root = ScriptRoot::default();
        let mut handler_names: HashSet<String> = HashSet::new();

        while !self.eof() {
            let st = self.peek()?;
            match &st.token {
                Token::LineEnd => {
                    self.index += 1;
                }
                Token::Word { id: WordId::Global, .. } => {
                    self.index += 1;
                    self.parse_script_decl_names(true)?;
                }
                Token::Word { id: WordId::Property, .. } => {
                    self.index += 1;
                    self.parse_script_decl_names(false)?;
                }
                Token::Keyword(Keyword::On) => {
                    let handler = self.parse_handler()?;
                    if !handler_names.insert(handler.name.clone()) {
                        return Err(self.error(
                            handler.pos,
                            format!("handler '{}' is already defined", handler.name),
                        ));
                    }
                    root.handlers.push(handler);
                }
                other => {
                    return Err(self.error(st.pos, format!("unexpected {}", other.kind_str())));
                }
            }
        }

        root.properties = self.properties.clone();
        root.globals = self.script_globals.clone();
        Ok(root)
    }

    fn parse_script_decl_names(&mut self, global: bool) -> Result<(), ParseError> {
        loop {
            let (name, pos) = self.expect_name()?;
            let dup = self.properties.iter().any(|p| *p == name)
                || self.script_globals.iter().any(|g| *g == name);
            if dup {
                return Err(self.error(pos, format!("'{name}' is already declared")));
            }
            if global {
                self.script_globals.push(name);
            } else {
                self.properties.push(name);
            }
            if !self.accept_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_line_end()
    }

    // ---- Handlers ----

    fn parse_handler(&mut self) -> Result<HandlerDecl, ParseError> {
        let on_pos = self.pop()?.pos; // `on`
        let (name, _) = self.expect_name()?;

        let mut params: Vec<String> = Vec::new();
        if !self.check_line_end() {
            let paren = self.accept_punct(Punct::LParen);
            loop {
                let (param, pos) = self.expect_name()?;
                if params.iter().any(|p| *p == param) {
                    return Err(self.error(pos, format!("duplicate parameter '{param}'")));
                }
                params.push(param);

                if self.accept_punct(Punct::Comma) {
                    continue;
                }
                if paren {
                    self.expect_punct(Punct::RParen)?;
                }
                break;
            }
        }
        self.expect_line_end()?;

        self.handler = Some(HandlerCtx {
            params: params.clone(),
            locals: Vec::new(),
            globals: HashSet::new(),
        });

        let body = self.parse_stmt_list(|p| p.check_word(WordId::End))?;
        self.expect_word(WordId::End, "end")?;
        self.expect_line_end()?;

        let ctx = self.handler.take().unwrap();
        Ok(HandlerDecl {
            pos: on_pos,
            name,
            params,
            locals: ctx.locals,
            body,
        })
    }

    /// Parse statements separated by line ends, stopping (without
    /// consuming) when `stop` matches.
    fn parse_stmt_list(
        &mut self,
        stop: fn(&Parser) -> bool,
    ) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        loop {
            while self.check_line_end() {
                self.index += 1;
            }
            if stop(self) {
                break;
            }
            let stmt = self.parse_statement()?;
            stmts.push(stmt);
            if stop(self) {
                break;
            }
            self.expect_line_end()?;
        }
        Ok(stmts)
    }

    // ---- Statements ----

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let st = self.peek()?;
        let pos = st.pos;
        match &st.token {
            Token::Word { id: WordId::Return, .. } => {
                self.index += 1;
                let expr = if self.check_line_end() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Ok(Stmt { pos, kind: StmtKind::Return(expr) })
            }
            Token::Word { id: WordId::Put, .. } => {
                self.index += 1;
                let expr = self.parse_expr()?;
                if self.check_word(WordId::After) {
                    self.index += 1;
                    let target = self.parse_expr()?;
                    self.check_put_target(&target)?;
                    Ok(Stmt { pos, kind: StmtKind::PutOn { expr, target, before: false } })
                } else if self.check_word(WordId::Before) {
                    self.index += 1;
                    let target = self.parse_expr()?;
                    self.check_put_target(&target)?;
                    Ok(Stmt { pos, kind: StmtKind::PutOn { expr, target, before: true } })
                } else {
                    Ok(Stmt { pos, kind: StmtKind::Put(expr) })
                }
            }
            Token::Word { id: WordId::If, .. } => self.parse_if(),
            Token::Word { id: WordId::Repeat, .. } => self.parse_repeat(),
            Token::Word { id: WordId::Case, .. } => self.parse_case(),
            Token::Word { id: WordId::Exit, .. } => {
                self.index += 1;
                self.expect_word(WordId::Repeat, "repeat")?;
                Ok(Stmt { pos, kind: StmtKind::ExitRepeat })
            }
            Token::Word { id: WordId::Next, .. } => {
                self.index += 1;
                self.expect_word(WordId::Repeat, "repeat")?;
                Ok(Stmt { pos, kind: StmtKind::NextRepeat })
            }
            Token::Word { id: WordId::Global, .. } => {
                self.index += 1;
                loop {
                    let (name, _) = self.expect_name()?;
                    self.handler
                        .as_mut()
                        .expect("global declaration outside handler")
                        .globals
                        .insert(name);
                    if !self.accept_punct(Punct::Comma) {
                        break;
                    }
                }
                // Declaration-only line. An empty branch list emits
                // no code.
                Ok(Stmt {
                    pos,
                    kind: StmtKind::If { branches: Vec::new(), else_body: None },
                })
            }
            Token::Word { text, id } if *id != WordId::The && !is_constant_word(text) => {
                let name = text.clone();
                // Assignment shorthand: `name = expr` declares the
                // local when the name is unknown.
                if let Some(next) = self.peek_at(1) {
                    if next.token.is_punct(Punct::Equal) {
                        self.index += 2;
                        let scope = self.resolve_or_declare(&name);
                        let rvalue = self.parse_expr()?;
                        let lvalue = Expr::new(pos, ExprKind::Ident { name, scope });
                        return Ok(Stmt { pos, kind: StmtKind::Assign { lvalue, rvalue } });
                    }
                    // Handler-invocation statement: bareword followed
                    // by line-end, word, string, number or `#`.
                    if in_call_lookahead(&next.token) {
                        self.index += 1;
                        let args = self.parse_call_stmt_args()?;
                        let call = Expr::new(pos, ExprKind::Call { name, args });
                        return Ok(Stmt { pos, kind: StmtKind::Expr(call) });
                    }
                }
                self.parse_expr_or_assign_stmt()
            }
            _ => self.parse_expr_or_assign_stmt(),
        }
    }

    fn check_put_target(&self, target: &Expr) -> Result<(), ParseError> {
        if target.is_lvalue() {
            Ok(())
        } else {
            Err(self.error(target.pos, "put target must be assignable"))
        }
    }

    /// Arguments of a handler-invocation statement. The first
    /// separator comma may be omitted; later separators are required.
    fn parse_call_stmt_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check_line_end() {
            return Ok(args);
        }
        args.push(self.parse_expr()?);

        if self.accept_punct(Punct::Comma) {
            args.push(self.parse_expr()?);
        } else if !self.check_line_end() {
            args.push(self.parse_expr()?);
        }

        while self.accept_punct(Punct::Comma) {
            args.push(self.parse_expr()?);
        }
        Ok(args)
    }

    /// Expression statement, or assignment when a top-level `=`
    /// follows an lvalue. `=` is comparison everywhere else.
    fn parse_expr_or_assign_stmt(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.peek()?.pos;
        let left = self.parse_binary(LEVEL_CONCAT)?;

        if self.accept_punct(Punct::Equal) {
            let right = self.parse_expr()?;
            if left.is_lvalue() {
                return Ok(Stmt { pos, kind: StmtKind::Assign { lvalue: left, rvalue: right } });
            }
            let cmp = Expr::new(
                pos,
                ExprKind::Binary { op: BinOp::Eq, left: Box::new(left), right: Box::new(right) },
            );
            return Ok(Stmt { pos, kind: StmtKind::Expr(cmp) });
        }

        // Not an assignment: finish the comparison level.
        let expr = self.parse_comparison_tail(left)?;
        Ok(Stmt { pos, kind: StmtKind::Expr(expr) })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pop()?.pos; // `if`
        let condition = self.parse_expr()?;
        self.expect_keyword(Keyword::Then)?;

        if !self.check_line_end() {
            // One-line form: `if c then stmt [else stmt]`.
            let body = vec![self.parse_statement()?];
            let else_body = if self.check_keyword(Keyword::Else) {
                self.index += 1;
                Some(vec![self.parse_statement()?])
            } else {
                None
            };
            return Ok(Stmt {
                pos,
                kind: StmtKind::If {
                    branches: vec![IfBranch { condition, body }],
                    else_body,
                },
            });
        }

        // Block form with interleaved `else if` branches.
        self.expect_line_end()?;
        let stop: fn(&Parser) -> bool =
            |p| p.check_word(WordId::End) || p.check_keyword(Keyword::Else);
        let mut branches = vec![IfBranch {
            condition,
            body: self.parse_stmt_list(stop)?,
        }];
        let mut else_body = None;

        loop {
            if self.check_keyword(Keyword::Else) {
                self.index += 1;
                if self.check_word(WordId::If) {
                    self.index += 1;
                    let condition = self.parse_expr()?;
                    self.expect_keyword(Keyword::Then)?;
                    self.expect_line_end()?;
                    branches.push(IfBranch {
                        condition,
                        body: self.parse_stmt_list(stop)?,
                    });
                    continue;
                }
                self.expect_line_end()?;
                else_body = Some(self.parse_stmt_list(|p| p.check_word(WordId::End))?);
            }
            break;
        }

        self.expect_word(WordId::End, "end")?;
        self.expect_word(WordId::If, "if")?;
        Ok(Stmt { pos, kind: StmtKind::If { branches, else_body } })
    }

    fn parse_repeat(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pop()?.pos; // `repeat`

        if self.check_word(WordId::While) {
            self.index += 1;
            let condition = self.parse_expr()?;
            self.expect_line_end()?;
            let body = self.parse_stmt_list(|p| p.check_word(WordId::End))?;
            self.expect_word(WordId::End, "end")?;
            self.expect_word(WordId::Repeat, "repeat")?;
            return Ok(Stmt { pos, kind: StmtKind::RepeatWhile { condition, body } });
        }

        self.expect_word(WordId::With, "with")?;
        let (var_name, var_pos) = self.expect_name()?;
        let scope = self.resolve_or_declare(&var_name);
        let var = Expr::new(var_pos, ExprKind::Ident { name: var_name, scope });

        if self.check_word(WordId::In) {
            self.index += 1;
            let iterable = self.parse_expr()?;
            self.expect_line_end()?;
            let body = self.parse_stmt_list(|p| p.check_word(WordId::End))?;
            self.expect_word(WordId::End, "end")?;
            self.expect_word(WordId::Repeat, "repeat")?;
            return Ok(Stmt { pos, kind: StmtKind::RepeatIn { var, iterable, body } });
        }

        self.expect_punct(Punct::Equal)?;
        let init = self.parse_expr()?;
        let down = if self.check_word(WordId::Down) {
            self.index += 1;
            true
        } else {
            false
        };
        self.expect_word(WordId::To, "to")?;
        let stop = self.parse_expr()?;
        self.expect_line_end()?;
        let body = self.parse_stmt_list(|p| p.check_word(WordId::End))?;
        self.expect_word(WordId::End, "end")?;
        self.expect_word(WordId::Repeat, "repeat")?;
        Ok(Stmt { pos, kind: StmtKind::RepeatTo { var, init, stop, down, body } })
    }

    fn parse_case(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pop()?.pos; // `case`
        let expr = self.parse_expr()?;
        self.expect_word(WordId::Of, "of")?;
        self.expect_line_end()?;

        let mut clauses = Vec::new();
        let mut otherwise = None;

        loop {
            while self.check_line_end() {
                self.index += 1;
            }
            if self.check_word(WordId::End) {
                break;
            }
            if self.check_word(WordId::Otherwise) {
                self.index += 1;
                self.accept_punct(Punct::Colon);
                let mut body = Vec::new();
                if !self.check_line_end() {
                    body.push(self.parse_statement()?);
                }
                body.extend(self.parse_stmt_list(|p| p.check_word(WordId::End))?);
                otherwise = Some(body);
                break;
            }

            // Clause: comma-separated literal labels, then a colon.
            let mut labels = vec![self.parse_case_label()?];
            while self.accept_punct(Punct::Comma) {
                labels.push(self.parse_case_label()?);
            }
            self.expect_punct(Punct::Colon)?;

            let mut body = Vec::new();
            if !self.check_line_end() {
                body.push(self.parse_statement()?);
            }
            let stop: fn(&Parser) -> bool = |p| {
                p.check_word(WordId::End) || p.check_word(WordId::Otherwise) || p.at_case_label()
            };
            body.extend(self.parse_stmt_list(stop)?);
            clauses.push(CaseClause { labels, body });
        }

        self.expect_word(WordId::End, "end")?;
        self.expect_word(WordId::Case, "case")?;
        Ok(Stmt { pos, kind: StmtKind::Case { expr, clauses, otherwise } })
    }

    /// True when the upcoming tokens begin a case-clause label line.
    fn at_case_label(&self) -> bool {
        match self.peek() {
            Ok(st) => match &st.token {
                Token::Int(_) | Token::Float(_) | Token::Str(_) | Token::SymbolLit(_) => true,
                Token::Punct(Punct::Minus) => matches!(
                    self.peek_at(1).map(|t| &t.token),
                    Some(Token::Int(_)) | Some(Token::Float(_))
                ),
                _ => false,
            },
            Err(_) => false,
        }
    }

    /// A case label is a literal, optionally negated.
    fn parse_case_label(&mut self) -> Result<Expr, ParseError> {
        let st = self.peek()?;
        let pos = st.pos;
        match &st.token {
            Token::Int(v) => {
                self.index += 1;
                Ok(Expr::new(pos, ExprKind::Literal(Literal::Int(*v))))
            }
            Token::Float(v) => {
                self.index += 1;
                Ok(Expr::new(pos, ExprKind::Literal(Literal::Float(*v))))
            }
            Token::Str(s) => {
                self.index += 1;
                Ok(Expr::new(pos, ExprKind::Literal(Literal::Str(s.clone()))))
            }
            Token::SymbolLit(s) => {
                self.index += 1;
                Ok(Expr::new(pos, ExprKind::Literal(Literal::Symbol(s.clone()))))
            }
            Token::Punct(Punct::Minus) => {
                self.index += 1;
                let st = self.pop()?;
                match &st.token {
                    Token::Int(v) => Ok(Expr::new(pos, ExprKind::Literal(Literal::Int(-v)))),
                    Token::Float(v) => Ok(Expr::new(pos, ExprKind::Literal(Literal::Float(-v)))),
                    other => Err(self.error(
                        st.pos,
                        format!("expected number after '-', got {}", other.kind_str()),
                    )),
                }
            }
            other => Err(self.error(
                pos,
                format!("case label must be a literal, got {}", other.kind_str()),
            )),
        }
    }

    // ---- Expressions ----

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(LEVEL_COMPARISON)
    }

    fn parse_binary(&mut self, level: u8) -> Result<Expr, ParseError> {
        if level > LEVEL_FACTOR {
            return self.parse_unary();
        }
        let mut left = self.parse_binary(level + 1)?;
        while let Some(op) = self.binop_at_level(level) {
            let pos = self.pop()?.pos;
            let right = self.parse_binary(level + 1)?;
            left = Expr::new(
                pos,
                ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
            );
        }
        Ok(left)
    }

    /// Continue comparison-level parsing over an already-parsed left
    /// operand. Used by statement parsing after the assignment check.
    fn parse_comparison_tail(&mut self, mut left: Expr) -> Result<Expr, ParseError> {
        while let Some(op) = self.binop_at_level(LEVEL_COMPARISON) {
            let pos = self.pop()?.pos;
            let right = self.parse_binary(LEVEL_COMPARISON + 1)?;
            left = Expr::new(
                pos,
                ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
            );
        }
        Ok(left)
    }

    fn binop_at_level(&self, level: u8) -> Option<BinOp> {
        let tok = match self.peek() {
            Ok(st) => &st.token,
            Err(_) => return None,
        };
        let (op, op_level) = match tok {
            Token::Punct(Punct::Equal) => (BinOp::Eq, LEVEL_COMPARISON),
            Token::Punct(Punct::NotEqual) => (BinOp::NotEq, LEVEL_COMPARISON),
            Token::Punct(Punct::Lt) => (BinOp::Lt, LEVEL_COMPARISON),
            Token::Punct(Punct::Gt) => (BinOp::Gt, LEVEL_COMPARISON),
            Token::Punct(Punct::Le) => (BinOp::Le, LEVEL_COMPARISON),
            Token::Punct(Punct::Ge) => (BinOp::Ge, LEVEL_COMPARISON),
            Token::Punct(Punct::Ampersand) => (BinOp::Concat, LEVEL_CONCAT),
            Token::Punct(Punct::DoubleAmpersand) => (BinOp::ConcatSpace, LEVEL_CONCAT),
            Token::Punct(Punct::Plus) => (BinOp::Add, LEVEL_TERM),
            Token::Punct(Punct::Minus) => (BinOp::Sub, LEVEL_TERM),
            Token::Punct(Punct::Star) => (BinOp::Mul, LEVEL_FACTOR),
            Token::Punct(Punct::Slash) => (BinOp::Div, LEVEL_FACTOR),
            Token::Keyword(Keyword::Mod) => (BinOp::Mod, LEVEL_FACTOR),
            Token::Keyword(Keyword::And) => (BinOp::And, LEVEL_FACTOR),
            Token::Keyword(Keyword::Or) => (BinOp::Or, LEVEL_FACTOR),
            _ => return None,
        };
        if op_level == level {
            Some(op)
        } else {
            None
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let st = self.peek()?;
        let pos = st.pos;
        match &st.token {
            Token::Punct(Punct::Minus) => {
                self.index += 1;
                let operand = self.parse_unary()?;
                // Fold negation of numeric literals.
                match operand.kind {
                    ExprKind::Literal(Literal::Int(v)) => {
                        Ok(Expr::new(pos, ExprKind::Literal(Literal::Int(-v))))
                    }
                    ExprKind::Literal(Literal::Float(v)) => {
                        Ok(Expr::new(pos, ExprKind::Literal(Literal::Float(-v))))
                    }
                    _ => Ok(Expr::new(
                        pos,
                        ExprKind::Unary { op: UnOp::Neg, expr: Box::new(operand) },
                    )),
                }
            }
            Token::Keyword(Keyword::Not) => {
                self.index += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::new(pos, ExprKind::Unary { op: UnOp::Not, expr: Box::new(operand) }))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check_punct(Punct::Period) {
                let pos = self.pop()?.pos;
                let (key, _) = self.expect_name()?;
                if self.check_punct(Punct::LParen) {
                    self.index += 1;
                    let args = self.parse_call_args()?;
                    expr = Expr::new(
                        pos,
                        ExprKind::MethodCall { recv: Box::new(expr), name: key, args },
                    );
                } else {
                    expr = Expr::new(pos, ExprKind::Dot { expr: Box::new(expr), key });
                }
            } else if self.check_punct(Punct::LBracket) {
                let pos = self.pop()?.pos;
                let from = self.parse_expr()?;
                let to = if self.accept_punct(Punct::Range) {
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                self.expect_punct(Punct::RBracket)?;
                expr = Expr::new(
                    pos,
                    ExprKind::Index { expr: Box::new(expr), from: Box::new(from), to },
                );
            } else if self.check_punct(Punct::LParen) {
                let pos = self.peek()?.pos;
                return Err(self.error(pos, "only a handler name or dot index can be called"));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.accept_punct(Punct::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.accept_punct(Punct::Comma) {
                continue;
            }
            self.expect_punct(Punct::RParen)?;
            break;
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let st = self.peek()?;
        let pos = st.pos;
        match &st.token {
            Token::Int(v) => {
                self.index += 1;
                Ok(Expr::new(pos, ExprKind::Literal(Literal::Int(*v))))
            }
            Token::Float(v) => {
                self.index += 1;
                Ok(Expr::new(pos, ExprKind::Literal(Literal::Float(*v))))
            }
            Token::Str(s) => {
                self.index += 1;
                Ok(Expr::new(pos, ExprKind::Literal(Literal::Str(s.clone()))))
            }
            Token::SymbolLit(s) => {
                self.index += 1;
                Ok(Expr::new(pos, ExprKind::Literal(Literal::Symbol(s.clone()))))
            }
            Token::Punct(Punct::LParen) => {
                self.index += 1;
                let expr = self.parse_expr()?;
                self.expect_punct(Punct::RParen)?;
                Ok(expr)
            }
            Token::Punct(Punct::LBracket) => self.parse_list_literal(),
            Token::Word { id: WordId::The, .. } => {
                self.index += 1;
                let (name, name_pos) = self.expect_name()?;
                match TheId::from_name(&name) {
                    Some(id) => Ok(Expr::new(pos, ExprKind::The(id))),
                    None => Err(self.error(name_pos, format!("unknown 'the' identifier '{name}'"))),
                }
            }
            Token::Word { text, .. } => {
                let name = text.clone();
                self.index += 1;

                if let Some(lit) = constant_word(&name) {
                    return Ok(Expr::new(pos, ExprKind::Literal(lit)));
                }

                // A name directly followed by `(` is a handler call,
                // resolved dynamically at run time.
                if self.check_punct(Punct::LParen) {
                    self.index += 1;
                    let args = self.parse_call_args()?;
                    return Ok(Expr::new(pos, ExprKind::Call { name, args }));
                }

                match self.resolve(&name) {
                    Some(scope) => Ok(Expr::new(pos, ExprKind::Ident { name, scope })),
                    None => Err(self.error(pos, format!("use of undeclared variable '{name}'"))),
                }
            }
            other => Err(self.error(pos, format!("unexpected {}", other.kind_str()))),
        }
    }

    /// `[...]`: linear list, property list, or the empty forms `[]`
    /// and `[:]`.
    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pop()?.pos; // `[`

        if self.accept_punct(Punct::Colon) {
            self.expect_punct(Punct::RBracket)?;
            return Ok(Expr::new(pos, ExprKind::PropList(Vec::new())));
        }
        if self.accept_punct(Punct::RBracket) {
            return Ok(Expr::new(pos, ExprKind::List(Vec::new())));
        }

        let first = self.parse_expr()?;
        if self.accept_punct(Punct::Colon) {
            let value = self.parse_expr()?;
            let mut pairs = vec![(first, value)];
            while self.accept_punct(Punct::Comma) {
                let key = self.parse_expr()?;
                self.expect_punct(Punct::Colon)?;
                let value = self.parse_expr()?;
                pairs.push((key, value));
            }
            self.expect_punct(Punct::RBracket)?;
            return Ok(Expr::new(pos, ExprKind::PropList(pairs)));
        }

        let mut items = vec![first];
        while self.accept_punct(Punct::Comma) {
            items.push(self.parse_expr()?);
        }
        self.expect_punct(Punct::RBracket)?;
        Ok(Expr::new(pos, ExprKind::List(items)))
    }
}

const LEVEL_COMPARISON: u8 = 1;
const LEVEL_CONCAT: u8 = 2;
const LEVEL_TERM: u8 = 3;
const LEVEL_FACTOR: u8 = 4;

/// The handler-invocation statement lookahead set.
fn in_call_lookahead(tok: &Token) -> bool {
    matches!(
        tok,
        Token::LineEnd
            | Token::Word { .. }
            | Token::Str(_)
            | Token::Int(_)
            | Token::Float(_)
            | Token::SymbolLit(_)
            | Token::Punct(Punct::Pound)
    )
}

fn is_constant_word(text: &str) -> bool {
    constant_word(text).is_some()
}

/// Word literals folded to constants at parse time.
fn constant_word(text: &str) -> Option<Literal> {
    match text {
        "true" => Some(Literal::Int(1)),
        "false" => Some(Literal::Int(0)),
        "pi" => Some(Literal::Float(std::f64::consts::PI)),
        "void" => Some(Literal::Void),
        "quote" => Some(Literal::Str("\"".into())),
        "empty" => Some(Literal::Str(String::new())),
        "return" => Some(Literal::Str("\r".into())),
        "enter" => Some(Literal::Str("\x03".into())),
        "space" => Some(Literal::Str(" ".into())),
        "tab" => Some(Literal::Str("\t".into())),
        "backspace" => Some(Literal::Str("\x08".into())),
        _ => None,
    }
}
