//! Part 21 (STEP physical file format) lexer.
//!
//! Tokenizes STEP files according to ISO 10303-21. Handles:
//! - Keywords (e.g., `CARTESIAN_POINT`, `DATA`, `ENDSEC`, `ISO-10303-21`)
//! - Entity references (e.g., `#123`)
//! - Strings with `''` escapes
//! - Reals, including exporter forms such as `0.` and `1.E-07`
//! - Integers
//! - Enumerations (e.g., `.T.`, `.UNSPECIFIED.`)
//! - Punctuation (parentheses, comma, semicolon, equals, asterisk, dollar)

use crate::error::StepError;

/// A token in a STEP file.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keyword or identifier, upper-cased.
    Keyword(String),
    /// Entity reference (`#123` becomes `EntityRef(123)`).
    EntityRef(u64),
    /// String literal (contents without quotes).
    String(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration (`.T.` becomes `Enum("T")`).
    Enum(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `=`
    Equals,
    /// `*` (derived value marker).
    Asterisk,
    /// `$` (unset value marker).
    Dollar,
}

/// Position in the source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub col: usize,
}

/// A token with the position where it starts.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    /// The token.
    pub token: Token,
    /// Start position, used for parser diagnostics.
    pub pos: Position,
}

/// Lexer for Part 21 STEP files.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input.
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, StepError> {
        // Entity-dense files average roughly one token per four bytes.
        let mut tokens = Vec::with_capacity(self.input.len() / 4);
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    /// Get the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<SpannedToken>, StepError> {
        self.skip_whitespace_and_comments()?;

        let Some(ch) = self.peek_char() else {
            return Ok(None);
        };

        let pos = self.position();
        let token = match ch {
            b'(' => self.punct(Token::LParen),
            b')' => self.punct(Token::RParen),
            b',' => self.punct(Token::Comma),
            b';' => self.punct(Token::Semicolon),
            b'=' => self.punct(Token::Equals),
            b'*' => self.punct(Token::Asterisk),
            b'$' => self.punct(Token::Dollar),
            b'#' => self.read_entity_ref()?,
            b'\'' => self.read_string()?,
            b'.' => self.read_enum()?,
            b'-' | b'+' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit() || c == b'.') => {
                self.read_number()?
            }
            b'0'..=b'9' => self.read_number()?,
            b'A'..=b'Z' | b'a'..=b'z' | b'_' | b'!' => self.read_keyword(),
            _ => {
                return Err(StepError::lexer(
                    pos.line,
                    pos.col,
                    format!("unexpected character: '{}'", ch as char),
                ));
            }
        };

        Ok(Some(SpannedToken { token, pos }))
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
        }
    }

    fn punct(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn peek_char(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool, out: &mut Vec<u8>) {
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            out.push(ch);
            self.advance();
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), StepError> {
        loop {
            while self.peek_char().is_some_and(|c| c.is_ascii_whitespace()) {
                self.advance();
            }

            if self.peek_char() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                let start = self.position();
                self.advance();
                self.advance();
                loop {
                    match (self.peek_char(), self.peek_at(1)) {
                        (Some(b'*'), Some(b'/')) => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        (Some(_), _) => {
                            self.advance();
                        }
                        (None, _) => {
                            return Err(StepError::lexer(
                                start.line,
                                start.col,
                                "unterminated comment",
                            ));
                        }
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    fn read_entity_ref(&mut self) -> Result<Token, StepError> {
        let start = self.position();
        self.advance(); // '#'

        let mut digits = Vec::new();
        self.take_while(|c| c.is_ascii_digit(), &mut digits);
        if digits.is_empty() {
            return Err(StepError::lexer(start.line, start.col, "expected digits after '#'"));
        }

        let s = String::from_utf8_lossy(&digits);
        s.parse()
            .map(Token::EntityRef)
            .map_err(|_| StepError::lexer(start.line, start.col, format!("invalid entity ID: {s}")))
    }

    fn read_string(&mut self) -> Result<Token, StepError> {
        let start = self.position();
        self.advance(); // opening quote

        let mut content = Vec::new();
        loop {
            match self.advance() {
                None => {
                    return Err(StepError::lexer(start.line, start.col, "unterminated string"));
                }
                Some(b'\'') if self.peek_char() == Some(b'\'') => {
                    content.push(b'\'');
                    self.advance();
                }
                Some(b'\'') => break,
                Some(ch) => content.push(ch),
            }
        }

        Ok(Token::String(String::from_utf8_lossy(&content).into_owned()))
    }

    fn read_enum(&mut self) -> Result<Token, StepError> {
        let start = self.position();
        self.advance(); // opening '.'

        let mut name = Vec::new();
        self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_', &mut name);

        if self.advance() != Some(b'.') {
            return Err(StepError::lexer(start.line, start.col, "unterminated enumeration"));
        }
        if name.is_empty() {
            return Err(StepError::lexer(start.line, start.col, "empty enumeration"));
        }

        Ok(Token::Enum(
            String::from_utf8_lossy(&name).to_ascii_uppercase(),
        ))
    }

    fn read_number(&mut self) -> Result<Token, StepError> {
        let start = self.position();
        let mut num = Vec::new();
        let mut is_real = false;

        if let Some(ch @ (b'-' | b'+')) = self.peek_char() {
            num.push(ch);
            self.advance();
        }

        self.take_while(|c| c.is_ascii_digit(), &mut num);

        // A '.' directly after the integer part always belongs to the number:
        // enumerations never follow a digit, and exporters write `0.` or `1.E-07`.
        if self.peek_char() == Some(b'.') {
            is_real = true;
            num.push(b'.');
            self.advance();
            self.take_while(|c| c.is_ascii_digit(), &mut num);
        }

        if let Some(ch @ (b'E' | b'e')) = self.peek_char() {
            is_real = true;
            num.push(ch);
            self.advance();
            if let Some(sign @ (b'-' | b'+')) = self.peek_char() {
                num.push(sign);
                self.advance();
            }
            self.take_while(|c| c.is_ascii_digit(), &mut num);
        }

        let mut s = String::from_utf8_lossy(&num).into_owned();
        if is_real {
            // Rust's float parser rejects "1.E5"; "1.0E5" is equivalent.
            if let Some(dot) = s.find('.') {
                if !s[dot + 1..].starts_with(|c: char| c.is_ascii_digit()) {
                    s.insert(dot + 1, '0');
                }
            }
            s.parse().map(Token::Real).map_err(|_| {
                StepError::lexer(start.line, start.col, format!("invalid real number: {s}"))
            })
        } else {
            s.parse().map(Token::Integer).map_err(|_| {
                StepError::lexer(start.line, start.col, format!("invalid integer: {s}"))
            })
        }
    }

    fn read_keyword(&mut self) -> Token {
        let mut name = Vec::new();
        // User-defined entity names start with '!'
        if self.peek_char() == Some(b'!') {
            name.push(b'!');
            self.advance();
        }
        // Hyphens appear in ISO-10303-21 and END-ISO-10303-21.
        self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-', &mut name);
        Token::Keyword(String::from_utf8_lossy(&name).to_ascii_uppercase())
    }
}
