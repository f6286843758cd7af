//! Parser for Prolog source code.
//!
//! An operator-precedence parser producing plain terms: control constructs
//! (`','`, `';'`, `'->'`, `'\+'`, `!`) come out as ordinary compounds and
//! atoms for the resolution engine to interpret. Variable names are scoped
//! per clause; a query keeps its name-to-variable map so the caller can
//! report bindings.

use crate::db::Clause;
use crate::lexer::Lexer;
use crate::term::{Term, Var};
use crate::token::{Span, Token};

/// Parse error with location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            span: Span::new(line, column),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at {}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// A parsed source file: clauses to store, queries to run.
#[derive(Debug, Default)]
pub struct Program {
    pub clauses: Vec<Clause>,
    pub queries: Vec<Query>,
}

/// A `?-` goal together with its named variables, in reading order.
#[derive(Debug, Clone)]
pub struct Query {
    pub goal: Term,
    pub vars: Vec<(String, Var)>,
}

/// Parser for Prolog programs.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    span: Span,
    /// Variables of the clause being parsed, in first-occurrence order.
    scope: Vec<(String, Var)>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let span = lexer.span();
        let current = lexer.next_token().map_err(|e| ParseError {
            message: e.message,
            span: e.span,
        })?;
        Ok(Self {
            lexer,
            current,
            span,
            scope: Vec::new(),
        })
    }

    /// Advance to the next token.
    fn advance(&mut self) -> Result<Token, ParseError> {
        let old = std::mem::replace(&mut self.current, Token::Eof);
        self.span = self.lexer.span();
        self.current = self.lexer.next_token().map_err(|e| ParseError {
            message: e.message,
            span: e.span,
        })?;
        Ok(old)
    }

    /// Check if current token matches.
    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(&self.current) == std::mem::discriminant(token)
    }

    /// Expect a specific token, error if not found.
    fn expect(&mut self, expected: &Token) -> Result<Token, ParseError> {
        if self.check(expected) {
            self.advance()
        } else {
            Err(ParseError::new(
                format!("Expected {:?}, found {:?}", expected, self.current),
                self.span.line,
                self.span.column,
            ))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.span.line, self.span.column)
    }

    /// Look up or mint the variable for a name, within the current clause.
    fn variable(&mut self, name: String) -> Term {
        if let Some((_, var)) = self.scope.iter().find(|(n, _)| *n == name) {
            return Term::Var(var.clone());
        }
        let var = Var::named(&name);
        self.scope.push((name, var.clone()));
        Term::Var(var)
    }

    /// Parse a complete program.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        while self.current != Token::Eof {
            self.scope.clear();
            if self.current == Token::Query {
                // Query: ?- goal.
                self.advance()?;
                let goal = self.parse_expr(1200)?;
                self.expect(&Token::Dot)?;
                let vars = self
                    .scope
                    .iter()
                    .filter(|(name, _)| !name.starts_with('_'))
                    .cloned()
                    .collect();
                program.queries.push(Query { goal, vars });
            } else {
                program.clauses.push(self.parse_clause()?);
            }
        }

        Ok(program)
    }

    /// Parse a single clause (fact or rule).
    fn parse_clause(&mut self) -> Result<Clause, ParseError> {
        let head = self.parse_expr(999)?;
        if head.indicator().is_none() {
            return Err(self.error(format!("Clause head must be callable: {}", head)));
        }

        if self.current == Token::Neck {
            // Rule: head :- body.
            self.advance()?;
            let body_term = self.parse_expr(1200)?;
            self.expect(&Token::Dot)?;
            let mut body = Vec::new();
            flatten_conjunction(body_term, &mut body);
            Ok(Clause::rule(head, body))
        } else {
            // Fact: head.
            self.expect(&Token::Dot)?;
            Ok(Clause::fact(head))
        }
    }

    /// The infix operator at the current token: (name, precedence,
    /// precedence allowed on the right operand).
    fn infix(&self) -> Option<(&'static str, u32, u32)> {
        match &self.current {
            Token::Semicolon => Some((";", 1100, 1100)),
            Token::Arrow => Some(("->", 1050, 1050)),
            Token::Comma => Some((",", 1000, 1000)),
            Token::Unify => Some(("=", 700, 699)),
            Token::NotUnify => Some(("\\=", 700, 699)),
            Token::Identical => Some(("==", 700, 699)),
            Token::NotIdentical => Some(("\\==", 700, 699)),
            Token::Univ => Some(("=..", 700, 699)),
            Token::Is => Some(("is", 700, 699)),
            Token::Lt => Some(("<", 700, 699)),
            Token::Gt => Some((">", 700, 699)),
            Token::Le => Some(("=<", 700, 699)),
            Token::Ge => Some((">=", 700, 699)),
            Token::ArithEq => Some(("=:=", 700, 699)),
            Token::ArithNe => Some(("=\\=", 700, 699)),
            Token::Plus => Some(("+", 500, 499)),
            Token::Minus => Some(("-", 500, 499)),
            Token::Star => Some(("*", 400, 399)),
            Token::Slash => Some(("/", 400, 399)),
            Token::Mod => Some(("mod", 400, 399)),
            _ => None,
        }
    }

    /// Parse a term, consuming operators up to `max_prec`.
    fn parse_expr(&mut self, max_prec: u32) -> Result<Term, ParseError> {
        let mut left = self.parse_prefix()?;
        while let Some((name, prec, right_prec)) = self.infix() {
            if prec > max_prec {
                break;
            }
            self.advance()?;
            let right = self.parse_expr(right_prec)?;
            left = Term::compound(name, vec![left, right]);
        }
        Ok(left)
    }

    /// Parse a prefix operator or a primary term.
    fn parse_prefix(&mut self) -> Result<Term, ParseError> {
        match &self.current {
            Token::Minus => {
                self.advance()?;
                if let Token::Integer(n) = self.current {
                    self.advance()?;
                    Ok(Term::Int(-n))
                } else {
                    let operand = self.parse_expr(200)?;
                    Ok(Term::compound("-", vec![operand]))
                }
            }
            Token::NegOp => {
                self.advance()?;
                let operand = self.parse_expr(900)?;
                Ok(Term::compound("\\+", vec![operand]))
            }
            _ => self.parse_primary(),
        }
    }

    /// Parse a primary term: atom, variable, integer, string, compound,
    /// list, cut, or parenthesized term.
    fn parse_primary(&mut self) -> Result<Term, ParseError> {
        match &self.current {
            Token::Integer(n) => {
                let n = *n;
                self.advance()?;
                Ok(Term::Int(n))
            }

            Token::Str(text) => {
                let text = text.clone();
                self.advance()?;
                Ok(Term::Str(text.into()))
            }

            Token::Atom(name) => {
                let name = name.clone();
                self.advance()?;

                // Check for compound term
                if self.current == Token::LParen {
                    self.advance()?;
                    let args = self.parse_args()?;
                    self.expect(&Token::RParen)?;
                    Ok(Term::compound(name, args))
                } else {
                    Ok(Term::atom(name))
                }
            }

            Token::Variable(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(self.variable(name))
            }

            Token::Anonymous => {
                self.advance()?;
                Ok(Term::Var(Var::fresh()))
            }

            Token::Cut => {
                self.advance()?;
                Ok(Term::atom("!"))
            }

            Token::LBracket => {
                self.advance()?;
                self.parse_list()
            }

            Token::LParen => {
                self.advance()?;
                let term = self.parse_expr(1200)?;
                self.expect(&Token::RParen)?;
                Ok(term)
            }

            _ => Err(self.error(format!("Expected term, found {:?}", self.current))),
        }
    }

    /// Parse comma-separated argument terms. Arguments sit below the
    /// precedence of `','`, so a bare comma separates rather than conjoins.
    fn parse_args(&mut self) -> Result<Vec<Term>, ParseError> {
        let mut args = Vec::new();
        args.push(self.parse_expr(999)?);

        while self.current == Token::Comma {
            self.advance()?;
            args.push(self.parse_expr(999)?);
        }

        Ok(args)
    }

    /// Parse a list: [], [a], [a,b], [H|T], [a,b|T]
    fn parse_list(&mut self) -> Result<Term, ParseError> {
        // Empty list
        if self.current == Token::RBracket {
            self.advance()?;
            return Ok(Term::Nil);
        }

        // Non-empty list
        let mut elements = Vec::new();
        elements.push(self.parse_expr(999)?);

        while self.current == Token::Comma {
            self.advance()?;
            elements.push(self.parse_expr(999)?);
        }

        // Check for tail
        let tail = if self.current == Token::Pipe {
            self.advance()?;
            self.parse_expr(999)?
        } else {
            Term::Nil
        };

        self.expect(&Token::RBracket)?;

        Ok(Term::list_with_tail(elements, tail))
    }
}

/// Split a right-nested `','` chain into body goals.
fn flatten_conjunction(term: Term, out: &mut Vec<Term>) {
    if let Term::Compound(functor, args) = &term {
        if functor.as_ref() == "," && args.len() == 2 {
            flatten_conjunction(args[0].clone(), out);
            flatten_conjunction(args[1].clone(), out);
            return;
        }
    }
    out.push(term);
}

/// Parse a Prolog program from source.
pub fn parse(input: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(input)?;
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fact() {
        let program = parse("parent(tom, bob).").unwrap();
        assert_eq!(program.clauses.len(), 1);
        assert!(program.clauses[0].is_fact());
    }

    #[test]
    fn test_parse_rule() {
        let program = parse("grandparent(X, Z) :- parent(X, Y), parent(Y, Z).").unwrap();
        assert_eq!(program.clauses.len(), 1);
        assert!(!program.clauses[0].is_fact());
        assert_eq!(program.clauses[0].body.len(), 2);
    }

    #[test]
    fn test_parse_query_with_vars() {
        let program = parse("?- parent(tom, X), parent(X, Y).").unwrap();
        assert_eq!(program.queries.len(), 1);
        let names: Vec<&str> = program.queries[0]
            .vars
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, ["X", "Y"]);
    }

    #[test]
    fn test_vars_shared_within_a_clause() {
        let program = parse("same(X, X).").unwrap();
        let args = program.clauses[0].head.args();
        assert_eq!(args[0], args[1]);
    }

    #[test]
    fn test_vars_distinct_across_clauses() {
        let program = parse("p(X). q(X).").unwrap();
        assert_ne!(
            program.clauses[0].head.args()[0],
            program.clauses[1].head.args()[0]
        );
    }

    #[test]
    fn test_anonymous_vars_are_distinct() {
        let program = parse("pair(_, _).").unwrap();
        let args = program.clauses[0].head.args();
        assert_ne!(args[0], args[1]);
    }

    #[test]
    fn test_operator_precedence() {
        let program = parse("?- X = 1 + 2 * 3.").unwrap();
        assert_eq!(
            program.queries[0].goal.to_string(),
            "=(X, +(1, *(2, 3)))"
        );
    }

    #[test]
    fn test_parse_arithmetic_goal() {
        let program = parse("double(X, Y) :- Y is X * 2.").unwrap();
        let body = &program.clauses[0].body;
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].indicator().unwrap().to_string(), "is/2");
    }

    #[test]
    fn test_parse_subtraction() {
        let program = parse("?- X is 3 - 2.").unwrap();
        assert_eq!(program.queries[0].goal.to_string(), "is(X, -(3, 2))");
    }

    #[test]
    fn test_parse_negative_literal() {
        let program = parse("temp(-42).").unwrap();
        assert_eq!(program.clauses[0].head.args()[0], Term::Int(-42));
    }

    #[test]
    fn test_parse_comparison() {
        let program = parse("positive(X) :- X > 0.").unwrap();
        assert_eq!(
            program.clauses[0].body[0].indicator().unwrap().to_string(),
            ">/2"
        );
    }

    #[test]
    fn test_parse_if_then_else_shape() {
        let program = parse("t(X) :- (a -> b ; c).").unwrap();
        assert_eq!(program.clauses[0].body[0].to_string(), ";(->(a, b), c)");
    }

    #[test]
    fn test_parse_negation() {
        let program = parse("t :- \\+ a.").unwrap();
        assert_eq!(program.clauses[0].body[0].to_string(), "\\+(a)");
    }

    #[test]
    fn test_parse_cut() {
        let program = parse("first(X) :- find(X), !.").unwrap();
        assert_eq!(program.clauses[0].body.len(), 2);
        assert_eq!(program.clauses[0].body[1], Term::atom("!"));
    }

    #[test]
    fn test_parse_list() {
        let program = parse("test([1, 2, 3]).").unwrap();
        assert!(matches!(
            program.clauses[0].head.args()[0],
            Term::Cons(_, _)
        ));
    }

    #[test]
    fn test_parse_list_with_tail() {
        let program = parse("head([H|_], H).").unwrap();
        assert_eq!(program.clauses.len(), 1);
    }

    #[test]
    fn test_parse_empty_list() {
        let program = parse("empty([]).").unwrap();
        assert_eq!(program.clauses[0].head.args()[0], Term::Nil);
    }

    #[test]
    fn test_parse_nested_compound() {
        let program = parse("test(foo(bar(1))).").unwrap();
        assert_eq!(program.clauses.len(), 1);
    }

    #[test]
    fn test_parse_multiple_clauses() {
        let program = parse(
            "
            parent(tom, bob).
            parent(bob, pat).
            parent(bob, ann).
        ",
        )
        .unwrap();
        assert_eq!(program.clauses.len(), 3);
    }

    #[test]
    fn test_head_must_be_callable() {
        assert!(parse("42.").is_err());
        assert!(parse("[].").is_err());
    }

    #[test]
    fn test_parse_string_literal() {
        let program = parse("greeting(\"hello\").").unwrap();
        assert_eq!(
            program.clauses[0].head.args()[0],
            Term::Str("hello".into())
        );
    }

    #[test]
    fn test_conjunction_flattens_body_only() {
        let program = parse("t :- a, (b ; c), d.").unwrap();
        let body = &program.clauses[0].body;
        assert_eq!(body.len(), 3);
        assert_eq!(body[1].to_string(), ";(b, c)");
    }
}
