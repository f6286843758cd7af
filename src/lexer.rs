//! Lexer for Prolog source code.
//!
//! Tokenizes Prolog programs into a stream of tokens, handling atoms, variables,
//! integers, strings, operators, and comments.

use crate::token::{Span, Token};

/// Lexer error with location information.
#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    pub span: Span,
}

impl LexerError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            span: Span::new(line, column),
        }
    }
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Lexer error at {}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for LexerError {}

/// Lexer for Prolog source code.
pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
    current_pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
            current_pos: 0,
        }
    }

    /// Get current span for error reporting.
    pub fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    /// Peek at the next character without consuming it.
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Peek at the character after the next one.
    fn peek_next(&self) -> Option<char> {
        let mut iter = self.input[self.current_pos..].char_indices().peekable();
        iter.next();
        iter.peek().map(|&(_, c)| c)
    }

    /// Consume and return the next character.
    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(c)
        } else {
            None
        }
    }

    /// Skip whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            // Skip whitespace
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            // Check for comments
            if let Some('%') = self.peek() {
                // Line comment: skip to end of line
                while let Some(c) = self.advance() {
                    if c == '\n' {
                        break;
                    }
                }
            } else if let Some('/') = self.peek() {
                if self.peek_next() == Some('*') {
                    // Block comment: /* ... */
                    self.advance(); // consume '/'
                    self.advance(); // consume '*'
                    let mut depth = 1;
                    while depth > 0 {
                        match self.advance() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                depth -= 1;
                            }
                            Some('/') if self.peek() == Some('*') => {
                                self.advance();
                                depth += 1;
                            }
                            Some(_) => {}
                            None => break, // Unterminated comment
                        }
                    }
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    /// Read an identifier (atom or variable).
    fn read_identifier(&mut self, first: char) -> String {
        let mut ident = String::new();
        ident.push(first);
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    /// Read the rest of a quoted literal, with the opening delimiter
    /// already consumed. Doubling the delimiter escapes it.
    fn read_quoted(&mut self, delimiter: char) -> Result<String, LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let mut text = String::new();

        loop {
            match self.advance() {
                Some(c) if c == delimiter => {
                    if self.peek() == Some(delimiter) {
                        self.advance();
                        text.push(delimiter);
                    } else {
                        break;
                    }
                }
                Some('\\') => {
                    // Escape sequence
                    match self.advance() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('\\') => text.push('\\'),
                        Some(c) if c == delimiter => text.push(delimiter),
                        Some(c) => text.push(c),
                        None => {
                            return Err(LexerError::new(
                                "Unterminated quoted literal",
                                start_line,
                                start_col,
                            ))
                        }
                    }
                }
                Some(c) => text.push(c),
                None => {
                    return Err(LexerError::new(
                        "Unterminated quoted literal",
                        start_line,
                        start_col,
                    ))
                }
            }
        }
        Ok(text)
    }

    /// Read an integer.
    fn read_integer(&mut self, first: char) -> i64 {
        let mut num = String::new();
        num.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num.parse().unwrap_or(0)
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments();

        let start_line = self.line;
        let start_col = self.column;

        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            // Single character tokens
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            '[' => Ok(Token::LBracket),
            ']' => Ok(Token::RBracket),
            ',' => Ok(Token::Comma),
            ';' => Ok(Token::Semicolon),
            '|' => Ok(Token::Pipe),
            '!' => Ok(Token::Cut),
            '+' => Ok(Token::Plus),
            '*' => Ok(Token::Star),
            '/' => Ok(Token::Slash),

            // Dot - end of clause (floats are not supported)
            '.' => Ok(Token::Dot),

            // Minus or arrow
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    Ok(Token::Arrow)
                } else {
                    Ok(Token::Minus)
                }
            }

            // Operators starting with :
            ':' => {
                if self.peek() == Some('-') {
                    self.advance();
                    Ok(Token::Neck)
                } else {
                    Err(LexerError::new(
                        "Expected '-' after ':'",
                        start_line,
                        start_col,
                    ))
                }
            }

            // Operators starting with ?
            '?' => {
                if self.peek() == Some('-') {
                    self.advance();
                    Ok(Token::Query)
                } else {
                    Err(LexerError::new(
                        "Expected '-' after '?'",
                        start_line,
                        start_col,
                    ))
                }
            }

            // Operators starting with =
            '=' => match self.peek() {
                Some(':') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Ok(Token::ArithEq)
                    } else {
                        Err(LexerError::new("Expected '=' after '=:'", start_line, start_col))
                    }
                }
                Some('\\') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Ok(Token::ArithNe)
                    } else {
                        Err(LexerError::new(
                            "Expected '=' after '=\\'",
                            start_line,
                            start_col,
                        ))
                    }
                }
                Some('.') => {
                    self.advance();
                    if self.peek() == Some('.') {
                        self.advance();
                        Ok(Token::Univ)
                    } else {
                        Err(LexerError::new(
                            "Expected '.' after '=.'",
                            start_line,
                            start_col,
                        ))
                    }
                }
                Some('=') => {
                    self.advance();
                    Ok(Token::Identical)
                }
                Some('<') => {
                    self.advance();
                    Ok(Token::Le)
                }
                _ => Ok(Token::Unify),
            },

            // Operators starting with \
            '\\' => match self.peek() {
                Some('=') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Ok(Token::NotIdentical)
                    } else {
                        Ok(Token::NotUnify)
                    }
                }
                Some('+') => {
                    self.advance();
                    Ok(Token::NegOp)
                }
                _ => Err(LexerError::new(
                    "Unexpected character '\\'",
                    start_line,
                    start_col,
                )),
            },

            // Less than
            '<' => Ok(Token::Lt),

            // Greater than or greater-equal
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Ge)
                } else {
                    Ok(Token::Gt)
                }
            }

            // Quoted atom
            '\'' => {
                let atom = self.read_quoted('\'')?;
                Ok(Token::Atom(atom))
            }

            // String literal
            '"' => {
                let text = self.read_quoted('"')?;
                Ok(Token::Str(text))
            }

            // Underscore - anonymous variable or named variable starting with _
            '_' => {
                if let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        let ident = self.read_identifier('_');
                        Ok(Token::Variable(ident))
                    } else {
                        Ok(Token::Anonymous)
                    }
                } else {
                    Ok(Token::Anonymous)
                }
            }

            // Integer
            c if c.is_ascii_digit() => {
                let n = self.read_integer(c);
                Ok(Token::Integer(n))
            }

            // Lowercase letter - atom or keyword
            c if c.is_ascii_lowercase() => {
                let ident = self.read_identifier(c);
                match ident.as_str() {
                    "is" => Ok(Token::Is),
                    "mod" => Ok(Token::Mod),
                    _ => Ok(Token::Atom(ident)),
                }
            }

            // Uppercase letter - variable
            c if c.is_ascii_uppercase() => {
                let ident = self.read_identifier(c);
                Ok(Token::Variable(ident))
            }

            _ => Err(LexerError::new(
                format!("Unexpected character '{}'", c),
                start_line,
                start_col,
            )),
        }
    }

    /// Tokenize the entire input.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}
