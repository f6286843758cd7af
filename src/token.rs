//! Token definitions for the Prolog lexer.
//!
//! Defines all token types used in Prolog syntax including atoms, variables,
//! integers, strings, operators, and punctuation.

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Token types for Prolog.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Atom: lowercase identifier or quoted string
    Atom(String),
    /// Variable: uppercase identifier or underscore
    Variable(String),
    /// Anonymous variable: _
    Anonymous,
    /// Integer literal
    Integer(i64),
    /// Double-quoted string literal
    Str(String),

    // Operators
    /// :- (clause neck)
    Neck,
    /// ?- (query)
    Query,
    /// , (conjunction)
    Comma,
    /// ; (disjunction)
    Semicolon,
    /// -> (if-then)
    Arrow,
    /// \+ (negation as failure)
    NegOp,
    /// . (end of clause)
    Dot,
    /// | (list tail separator)
    Pipe,
    /// ! (cut)
    Cut,

    // Brackets
    /// (
    LParen,
    /// )
    RParen,
    /// [
    LBracket,
    /// ]
    RBracket,

    // Arithmetic operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// mod
    Mod,
    /// is
    Is,

    // Comparison and term operators
    /// =
    Unify,
    /// \=
    NotUnify,
    /// ==
    Identical,
    /// \==
    NotIdentical,
    /// =.. (univ)
    Univ,
    /// <
    Lt,
    /// >
    Gt,
    /// =<
    Le,
    /// >=
    Ge,
    /// =:=
    ArithEq,
    /// =\=
    ArithNe,

    // Special
    /// End of file
    Eof,
}

impl Token {
    /// Returns true if this token can start a term.
    pub fn can_start_term(&self) -> bool {
        matches!(
            self,
            Token::Atom(_)
                | Token::Variable(_)
                | Token::Anonymous
                | Token::Integer(_)
                | Token::Str(_)
                | Token::LParen
                | Token::LBracket
                | Token::Minus
                | Token::NegOp
                | Token::Cut
        )
    }
}
