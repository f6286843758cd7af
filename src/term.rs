//! Term algebra for the logic engine.
//!
//! Defines the core data structures representing logic programs:
//! terms, variables, and predicate indicators.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Supply for variable identities. Every `Var` ever minted gets a distinct
/// id, so renaming a clause for one activation can never capture variables
/// from another.
static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(0);

/// A logic variable. Identity is the numeric id; the display name is kept
/// only for printing and never takes part in equality or hashing.
#[derive(Debug, Clone)]
pub struct Var {
    id: u64,
    name: Option<Rc<str>>,
}

impl Var {
    /// Mint a fresh, anonymous variable.
    pub fn fresh() -> Self {
        Self {
            id: NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed),
            name: None,
        }
    }

    /// Mint a fresh variable carrying a display name.
    pub fn named(name: impl AsRef<str>) -> Self {
        Self {
            id: NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed),
            name: Some(Rc::from(name.as_ref())),
        }
    }

    /// Numeric identity. Monotone: later-minted variables have larger ids.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Display name, if the variable has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Var {}

impl std::hash::Hash for Var {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "_G{}", self.id),
        }
    }
}

/// A logic term.
///
/// The engine only ever inspects a term's shape after dereferencing it
/// through a substitution (`Subst::walk`); pattern matching on this enum
/// replaces any kind of dynamic dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Variable
    Var(Var),
    /// Atom (symbol), equal by name
    Atom(Rc<str>),
    /// Integer literal
    Int(i64),
    /// String literal
    Str(Rc<str>),
    /// Compound term: functor(arg1, arg2, ...)
    Compound(Rc<str>, Rc<Vec<Term>>),
    /// List cell: [H|T]
    Cons(Rc<Term>, Rc<Term>),
    /// Empty list: []
    Nil,
}

impl Term {
    /// Create an atom term.
    pub fn atom(name: impl AsRef<str>) -> Self {
        Term::Atom(Rc::from(name.as_ref()))
    }

    /// Create a compound term.
    pub fn compound(functor: impl AsRef<str>, args: Vec<Term>) -> Self {
        Term::Compound(Rc::from(functor.as_ref()), Rc::new(args))
    }

    /// Create a list cell.
    pub fn cons(head: Term, tail: Term) -> Self {
        Term::Cons(Rc::new(head), Rc::new(tail))
    }

    /// Create a proper list from a sequence of terms.
    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        let items: Vec<Term> = items.into_iter().collect();
        let mut result = Term::Nil;
        for item in items.into_iter().rev() {
            result = Term::cons(item, result);
        }
        result
    }

    /// Create a list with an explicit tail: [h1, h2 | tail]
    pub fn list_with_tail(heads: Vec<Term>, tail: Term) -> Self {
        let mut result = tail;
        for item in heads.into_iter().rev() {
            result = Term::cons(item, result);
        }
        result
    }

    /// Returns true if this term is a variable.
    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// Get the predicate indicator (functor/arity) of a callable term.
    pub fn indicator(&self) -> Option<Indicator> {
        match self {
            Term::Atom(name) => Some(Indicator::new(name.clone(), 0)),
            Term::Compound(functor, args) => Some(Indicator::new(functor.clone(), args.len())),
            _ => None,
        }
    }

    /// Arguments of a callable term; atoms have none.
    pub fn args(&self) -> &[Term] {
        match self {
            Term::Compound(_, args) => args,
            _ => &[],
        }
    }
}

/// Promotion of host primitives into the term algebra.
impl From<i64> for Term {
    fn from(n: i64) -> Self {
        Term::Int(n)
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term::Str(Rc::from(s))
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Term::Str(Rc::from(s.as_str()))
    }
}

impl From<Var> for Term {
    fn from(v: Var) -> Self {
        Term::Var(v)
    }
}

impl<T: Into<Term>> From<Vec<T>> for Term {
    fn from(items: Vec<T>) -> Self {
        Term::list(items.into_iter().map(Into::into))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{}", v),
            Term::Atom(name) => write!(f, "{}", name),
            Term::Int(n) => write!(f, "{}", n),
            Term::Str(s) => write!(f, "\"{}\"", s),
            Term::Compound(functor, args) => {
                write!(f, "{}(", functor)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Term::Cons(_, _) => {
                // Walk the spine iteratively so long lists don't recurse.
                write!(f, "[")?;
                let mut term = self;
                let mut first = true;
                loop {
                    match term {
                        Term::Cons(head, tail) => {
                            if !first {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", head)?;
                            first = false;
                            term = tail;
                        }
                        Term::Nil => break,
                        other => {
                            write!(f, "|{}", other)?;
                            break;
                        }
                    }
                }
                write!(f, "]")
            }
            Term::Nil => write!(f, "[]"),
        }
    }
}

/// Predicate identifier (name/arity).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Indicator {
    pub name: Rc<str>,
    pub arity: usize,
}

impl Indicator {
    pub fn new(name: impl Into<Rc<str>>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_identity_not_name() {
        let x1 = Var::named("X");
        let x2 = Var::named("X");
        assert_ne!(x1, x2);
        assert_eq!(x1, x1.clone());
    }

    #[test]
    fn test_atom_equality_by_name() {
        assert_eq!(Term::atom("foo"), Term::atom("foo"));
        assert_ne!(Term::atom("foo"), Term::atom("bar"));
    }

    #[test]
    fn test_compound_equality() {
        let a = Term::compound("f", vec![Term::Int(1), Term::atom("x")]);
        let b = Term::compound("f", vec![Term::Int(1), Term::atom("x")]);
        let c = Term::compound("f", vec![Term::Int(2), Term::atom("x")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_promote_sequence() {
        let list: Term = vec![1i64, 2, 3].into();
        assert_eq!(
            list,
            Term::cons(
                Term::Int(1),
                Term::cons(Term::Int(2), Term::cons(Term::Int(3), Term::Nil))
            )
        );
    }

    #[test]
    fn test_indicator() {
        let t = Term::compound("parent", vec![Term::atom("tom"), Term::atom("bob")]);
        let ind = t.indicator().unwrap();
        assert_eq!(ind.to_string(), "parent/2");
        assert_eq!(Term::atom("go").indicator().unwrap().arity, 0);
        assert!(Term::Int(3).indicator().is_none());
    }

    #[test]
    fn test_display_list() {
        let t = Term::list(vec![Term::Int(1), Term::Int(2)]);
        assert_eq!(t.to_string(), "[1, 2]");
        let partial = Term::list_with_tail(vec![Term::Int(1)], Term::Var(Var::named("T")));
        assert_eq!(partial.to_string(), "[1|T]");
        assert_eq!(Term::Nil.to_string(), "[]");
    }
}
