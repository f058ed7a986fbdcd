//! Tokenizer for the embedding subset

use std::fmt;

use value_model::{EngineError, EngineResult};

/// Line and column of a token start, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number.
    pub line: u32,
    /// Column number.
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Reserved words of the subset.
///
/// `of` and `undefined` are not reserved; the parser recognizes them
/// contextually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// var keyword
    Var,
    /// if keyword
    If,
    /// else keyword
    Else,
    /// while keyword
    While,
    /// for keyword
    For,
    /// throw keyword
    Throw,
    /// true keyword
    True,
    /// false keyword
    False,
    /// null keyword
    Null,
}

impl Keyword {
    fn text(self) -> &'static str {
        match self {
            Keyword::Var => "var",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::Throw => "throw",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
        }
    }
}

/// Operators and delimiters of the subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// Opening parenthesis
    LParen,
    /// Closing parenthesis
    RParen,
    /// Opening brace
    LBrace,
    /// Closing brace
    RBrace,
    /// Opening bracket
    LBracket,
    /// Closing bracket
    RBracket,
    /// Semicolon
    Semicolon,
    /// Comma
    Comma,
    /// Dot
    Dot,
    /// Assignment
    Assign,
    /// Plus
    Plus,
    /// Minus
    Minus,
    /// Multiply
    Star,
    /// Divide
    Slash,
    /// Modulo
    Percent,
    /// Equality
    EqEq,
    /// Strict equality
    EqEqEq,
    /// Inequality
    NotEq,
    /// Strict inequality
    NotEqEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
    /// Logical NOT
    Not,
}

impl Punctuator {
    fn text(self) -> &'static str {
        match self {
            Punctuator::LParen => "(",
            Punctuator::RParen => ")",
            Punctuator::LBrace => "{",
            Punctuator::RBrace => "}",
            Punctuator::LBracket => "[",
            Punctuator::RBracket => "]",
            Punctuator::Semicolon => ";",
            Punctuator::Comma => ",",
            Punctuator::Dot => ".",
            Punctuator::Assign => "=",
            Punctuator::Plus => "+",
            Punctuator::Minus => "-",
            Punctuator::Star => "*",
            Punctuator::Slash => "/",
            Punctuator::Percent => "%",
            Punctuator::EqEq => "==",
            Punctuator::EqEqEq => "===",
            Punctuator::NotEq => "!=",
            Punctuator::NotEqEq => "!==",
            Punctuator::Lt => "<",
            Punctuator::LtEq => "<=",
            Punctuator::Gt => ">",
            Punctuator::GtEq => ">=",
            Punctuator::Not => "!",
        }
    }
}

/// Token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier (variable name, etc.)
    Identifier(String),
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Keyword
    Keyword(Keyword),
    /// Punctuator/operator
    Punctuator(Punctuator),
    /// End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier '{name}'"),
            Token::Number(value) => write!(f, "number {value}"),
            Token::String(_) => write!(f, "string literal"),
            Token::Keyword(keyword) => write!(f, "'{}'", keyword.text()),
            Token::Punctuator(punctuator) => write!(f, "'{}'", punctuator.text()),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

struct Lookahead {
    token: Token,
    position: Position,
    newline_before: bool,
}

/// Tokenizer over subset source code.
///
/// One token of lookahead; [`Lexer::peek_token`] scans and caches,
/// [`Lexer::next_token`] consumes. A newline-before flag per token
/// drives the parser's statement termination rules.
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    lookahead: Option<Lookahead>,
}

impl Lexer {
    /// Creates a lexer over the given source text.
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            lookahead: None,
        }
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> EngineResult<Token> {
        if let Some(cached) = self.lookahead.take() {
            return Ok(cached.token);
        }
        Ok(self.scan()?.token)
    }

    /// Returns the next token without consuming it.
    pub fn peek_token(&mut self) -> EngineResult<&Token> {
        if self.lookahead.is_none() {
            let scanned = self.scan()?;
            self.lookahead = Some(scanned);
        }
        match &self.lookahead {
            Some(cached) => Ok(&cached.token),
            None => Err(EngineError::internal("lexer lookahead missing after scan")),
        }
    }

    /// Start position of the token `peek_token` would return.
    pub fn token_position(&mut self) -> EngineResult<Position> {
        self.peek_token()?;
        match &self.lookahead {
            Some(cached) => Ok(cached.position),
            None => Err(EngineError::internal("lexer lookahead missing after scan")),
        }
    }

    /// Whether a line terminator precedes the token `peek_token` would
    /// return. Used for automatic statement termination.
    pub fn newline_before_token(&mut self) -> EngineResult<bool> {
        self.peek_token()?;
        match &self.lookahead {
            Some(cached) => Ok(cached.newline_before),
            None => Err(EngineError::internal("lexer lookahead missing after scan")),
        }
    }

    fn scan(&mut self) -> EngineResult<Lookahead> {
        let line_before = self.line;
        self.skip_whitespace_and_comments()?;
        let newline_before = self.line > line_before;
        let position = self.current_position();

        if self.is_at_end() {
            return Ok(Lookahead { token: Token::Eof, position, newline_before });
        }

        let ch = self.advance();
        let token = match ch {
            '(' => Token::Punctuator(Punctuator::LParen),
            ')' => Token::Punctuator(Punctuator::RParen),
            '{' => Token::Punctuator(Punctuator::LBrace),
            '}' => Token::Punctuator(Punctuator::RBrace),
            '[' => Token::Punctuator(Punctuator::LBracket),
            ']' => Token::Punctuator(Punctuator::RBracket),
            ';' => Token::Punctuator(Punctuator::Semicolon),
            ',' => Token::Punctuator(Punctuator::Comma),
            '+' => Token::Punctuator(Punctuator::Plus),
            '-' => Token::Punctuator(Punctuator::Minus),
            '*' => Token::Punctuator(Punctuator::Star),
            '/' => Token::Punctuator(Punctuator::Slash),
            '%' => Token::Punctuator(Punctuator::Percent),

            '.' => {
                if !self.is_at_end() && self.peek().is_ascii_digit() {
                    self.scan_number(ch, position)?
                } else {
                    Token::Punctuator(Punctuator::Dot)
                }
            }

            '=' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        Token::Punctuator(Punctuator::EqEqEq)
                    } else {
                        Token::Punctuator(Punctuator::EqEq)
                    }
                } else {
                    Token::Punctuator(Punctuator::Assign)
                }
            }

            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        Token::Punctuator(Punctuator::NotEqEq)
                    } else {
                        Token::Punctuator(Punctuator::NotEq)
                    }
                } else {
                    Token::Punctuator(Punctuator::Not)
                }
            }

            '<' => {
                if self.match_char('=') {
                    Token::Punctuator(Punctuator::LtEq)
                } else {
                    Token::Punctuator(Punctuator::Lt)
                }
            }

            '>' => {
                if self.match_char('=') {
                    Token::Punctuator(Punctuator::GtEq)
                } else {
                    Token::Punctuator(Punctuator::Gt)
                }
            }

            '\'' | '"' => self.scan_string(ch, position)?,

            _ if ch.is_ascii_digit() => self.scan_number(ch, position)?,
            _ if is_identifier_start(ch) => self.scan_identifier(ch),

            _ => {
                return Err(syntax_error(
                    format!("Unexpected character '{ch}'"),
                    position,
                ));
            }
        };

        Ok(Lookahead { token, position, newline_before })
    }

    fn scan_number(&mut self, first: char, position: Position) -> EngineResult<Token> {
        let mut text = String::new();
        text.push(first);

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            text.push(self.advance());
        }
        if first != '.' && !self.is_at_end() && self.peek() == '.' {
            text.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                text.push(self.advance());
            }
        }
        if !self.is_at_end() && matches!(self.peek(), 'e' | 'E') {
            text.push(self.advance());
            if !self.is_at_end() && matches!(self.peek(), '+' | '-') {
                text.push(self.advance());
            }
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                text.push(self.advance());
            }
        }

        match text.parse::<f64>() {
            Ok(value) => Ok(Token::Number(value)),
            Err(_) => Err(syntax_error(format!("Invalid number literal '{text}'"), position)),
        }
    }

    fn scan_string(&mut self, quote: char, position: Position) -> EngineResult<Token> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != quote {
            if self.peek() == '\n' || self.peek() == '\r' {
                return Err(syntax_error("Unterminated string literal", position));
            }
            if self.peek() == '\\' {
                self.advance();
                if self.is_at_end() {
                    return Err(syntax_error("Unterminated string literal", position));
                }
                let escaped = self.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    _ => value.push(escaped),
                }
            } else {
                value.push(self.advance());
            }
        }

        if self.is_at_end() {
            return Err(syntax_error("Unterminated string literal", position));
        }
        self.advance();
        Ok(Token::String(value))
    }

    fn scan_identifier(&mut self, first: char) -> Token {
        let mut text = String::new();
        text.push(first);
        while !self.is_at_end() && is_identifier_part(self.peek()) {
            text.push(self.advance());
        }

        match text.as_str() {
            "var" => Token::Keyword(Keyword::Var),
            "if" => Token::Keyword(Keyword::If),
            "else" => Token::Keyword(Keyword::Else),
            "while" => Token::Keyword(Keyword::While),
            "for" => Token::Keyword(Keyword::For),
            "throw" => Token::Keyword(Keyword::Throw),
            "true" => Token::Keyword(Keyword::True),
            "false" => Token::Keyword(Keyword::False),
            "null" => Token::Keyword(Keyword::Null),
            _ => Token::Identifier(text),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> EngineResult<()> {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\t' | '\u{000B}' | '\u{000C}' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                '\r' => {
                    self.advance();
                    if !self.is_at_end() && self.peek() == '\n' {
                        self.advance();
                    }
                    self.line += 1;
                    self.column = 1;
                }
                '/' => {
                    if self.peek_next() == Some('/') {
                        while !self.is_at_end() && self.peek() != '\n' && self.peek() != '\r' {
                            self.advance();
                        }
                    } else if self.peek_next() == Some('*') {
                        let start = self.current_position();
                        self.advance();
                        self.advance();
                        let mut closed = false;
                        while !self.is_at_end() {
                            if self.peek() == '*' && self.peek_next() == Some('/') {
                                self.advance();
                                self.advance();
                                closed = true;
                                break;
                            }
                            if self.advance() == '\n' {
                                self.line += 1;
                                self.column = 1;
                            }
                        }
                        if !closed {
                            return Err(syntax_error("Unterminated comment", start));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.position]
        }
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.position];
        self.position += 1;
        self.column += 1;
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.position] != expected {
            false
        } else {
            self.position += 1;
            self.column += 1;
            true
        }
    }

    fn current_position(&self) -> Position {
        Position { line: self.line, column: self.column }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

fn is_identifier_part(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphanumeric()
}

fn syntax_error(message: impl Into<String>, position: Position) -> EngineError {
    EngineError::syntax_error(format!("{} at {}", message.into(), position))
}
