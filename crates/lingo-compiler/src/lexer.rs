//! Byte-stream tokenizer.
//!
//! Produces the whole token list in one pass, ending in exactly one
//! line-end token. Newline handling is the dialect's: a newline emits
//! a line-end token unless the list is empty, the previous token is
//! already a line-end, or the previous token is the `\` continuation
//! symbol (which is removed instead).

use crate::token::{keyword_from_str, word_id_from_str, Pos, Punct, SpannedToken, Token};
use std::fmt;

/// Longest accepted word, matching the historical scan buffer.
const MAX_WORD: usize = 63;

#[derive(Clone, Debug, PartialEq)]
pub struct LexError {
    pub pos: Pos,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.pos.line, self.pos.column, self.message)
    }
}

impl std::error::Error for LexError {}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<SpannedToken>,
}

/// Tokenize a full source buffer.
pub fn lex(source: &[u8]) -> Result<Vec<SpannedToken>, LexError> {
    let mut lexer = Lexer {
        source,
        pos: 0,
        line: 1,
        column: 1,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn here(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, pos: Pos, message: impl Into<String>) -> LexError {
        LexError {
            pos,
            message: message.into(),
        }
    }

    fn push(&mut self, token: Token, pos: Pos) {
        self.tokens.push(SpannedToken { token, pos });
    }

    fn run(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.peek() {
            match ch {
                b'\n' => {
                    self.advance();
                    self.note_line_end();
                }
                b' ' | b'\t' | b'\r' | b'\x0b' | b'\x0c' => {
                    self.advance();
                }
                b'"' => self.scan_string()?,
                b'#' => self.scan_pound()?,
                b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.scan_word()?,
                b'0'..=b'9' => self.scan_number()?,
                _ => self.scan_punct()?,
            }
        }

        // The stream always ends in exactly one line-end.
        if !self.tokens.is_empty() && !self.tokens.last().unwrap().token.is_line_end() {
            let pos = self.here();
            self.push(Token::LineEnd, pos);
        }
        Ok(())
    }

    /// Apply the line-end suppression rules at a physical newline.
    fn note_line_end(&mut self) {
        match self.tokens.last() {
            None => {}
            Some(last) if last.token.is_line_end() => {}
            Some(last) if last.token.is_punct(Punct::LineCont) => {
                self.tokens.pop();
            }
            Some(_) => {
                let pos = self.here();
                self.push(Token::LineEnd, pos);
            }
        }
    }

    fn scan_string(&mut self) -> Result<(), LexError> {
        let start = self.here();
        self.advance(); // opening quote
        let mut buf = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(ch) => buf.push(ch),
                None => return Err(self.error(start, "unterminated string literal")),
            }
        }
        let text = String::from_utf8_lossy(&buf).into_owned();
        self.push(Token::Str(text), start);
        Ok(())
    }

    /// `#` begins a symbol literal when a word follows; otherwise it is
    /// the pound punctuation symbol.
    fn scan_pound(&mut self) -> Result<(), LexError> {
        let start = self.here();
        self.advance(); // '#'
        match self.peek() {
            Some(b'A'..=b'Z') | Some(b'a'..=b'z') | Some(b'_') => {
                let word = self.scan_word_text(start)?;
                self.push(Token::SymbolLit(word), start);
            }
            _ => {
                self.push(Token::Punct(Punct::Pound), start);
            }
        }
        Ok(())
    }

    fn scan_word_text(&mut self, start: Pos) -> Result<String, LexError> {
        let mut buf = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                if buf.len() >= MAX_WORD {
                    return Err(self.error(start, "identifier too long"));
                }
                buf.push(ch.to_ascii_lowercase() as char);
                self.advance();
            } else {
                break;
            }
        }
        Ok(buf)
    }

    fn scan_word(&mut self) -> Result<(), LexError> {
        let start = self.here();
        let word = self.scan_word_text(start)?;
        if let Some(kw) = keyword_from_str(&word) {
            self.push(Token::Keyword(kw), start);
        } else {
            let id = word_id_from_str(&word);
            self.push(Token::Word { text: word, id }, start);
        }
        Ok(())
    }

    fn scan_number(&mut self) -> Result<(), LexError> {
        let start = self.here();
        let mut buf = String::new();
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                buf.push(ch as char);
                self.advance();
            } else if ch == b'.' {
                // A `..` terminates the number; the range symbol follows.
                if self.peek_at(1) == Some(b'.') {
                    break;
                }
                is_float = true;
                buf.push('.');
                self.advance();
            } else {
                break;
            }
        }

        if is_float {
            match buf.parse::<f64>() {
                Ok(v) => self.push(Token::Float(v), start),
                Err(_) => {
                    return Err(self.error(start, format!("could not parse number literal {buf}")))
                }
            }
        } else {
            match buf.parse::<i32>() {
                Ok(v) => self.push(Token::Int(v), start),
                Err(_) => {
                    return Err(self.error(start, format!("could not parse number literal {buf}")))
                }
            }
        }
        Ok(())
    }

    /// Greedy maximal-munch over the punctuation table. Two-byte
    /// symbols are checked first; `--` swallows the rest of the line.
    fn scan_punct(&mut self) -> Result<(), LexError> {
        let start = self.here();
        let a = self.peek().unwrap();
        let b = self.peek_at(1);

        let two = match (a, b) {
            (b'<', Some(b'=')) => Some(Punct::Le),
            (b'>', Some(b'=')) => Some(Punct::Ge),
            (b'<', Some(b'>')) => Some(Punct::NotEqual),
            (b'&', Some(b'&')) => Some(Punct::DoubleAmpersand),
            (b'.', Some(b'.')) => Some(Punct::Range),
            (b'-', Some(b'-')) => None, // comment, handled below
            _ => None,
        };

        if a == b'-' && b == Some(b'-') {
            // Comment: discard to end of line. The newline itself is
            // handled by the main loop.
            while let Some(ch) = self.peek() {
                if ch == b'\n' {
                    break;
                }
                self.advance();
            }
            return Ok(());
        }

        if let Some(p) = two {
            self.advance();
            self.advance();
            self.push(Token::Punct(p), start);
            return Ok(());
        }

        let one = match a {
            b',' => Punct::Comma,
            b'.' => Punct::Period,
            b'-' => Punct::Minus,
            b'+' => Punct::Plus,
            b'/' => Punct::Slash,
            b'*' => Punct::Star,
            b'&' => Punct::Ampersand,
            b'(' => Punct::LParen,
            b')' => Punct::RParen,
            b'[' => Punct::LBracket,
            b']' => Punct::RBracket,
            b'{' => Punct::LBrace,
            b'}' => Punct::RBrace,
            b':' => Punct::Colon,
            b'=' => Punct::Equal,
            b'<' => Punct::Lt,
            b'>' => Punct::Gt,
            b'\\' => Punct::LineCont,
            _ => {
                return Err(self.error(start, format!("invalid symbol {}", a as char)));
            }
        };
        self.advance();
        self.push(Token::Punct(one), start);
        Ok(())
    }
}
