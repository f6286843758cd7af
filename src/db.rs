//! Clause database and builtin registry.
//!
//! The database maps predicate indicators to clause lists (kept in
//! insertion order) and to host builtins. Queries run over an `Rc`
//! snapshot, so additions made while a query is in flight are invisible to
//! it and the clause order a search sees never shifts underneath it.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::error::RuntimeError;
use crate::machine::{Cont, Emit, Solutions, Step};
use crate::parser::{self, ParseError, Query};
use crate::solve;
use crate::subst::Subst;
use crate::term::{Indicator, Term};

/// Shared handle to a database snapshot, threaded through every goal.
pub type Ctx = Rc<Database>;

/// A host-implemented predicate. Receives the call's arguments (still
/// uninstantiated; dereference through the substitution), and the same
/// three continuations a goal gets.
pub type Builtin = Rc<dyn Fn(&Ctx, &[Term], &Subst, Emit, Cont, Cont) -> Step>;

/// A stored Horn clause. Body goals are conjoined left to right; facts
/// have an empty body.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub head: Term,
    pub body: Vec<Term>,
}

impl Clause {
    pub fn fact(head: Term) -> Self {
        Self {
            head,
            body: Vec::new(),
        }
    }

    pub fn rule(head: Term, body: Vec<Term>) -> Self {
        Self { head, body }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            write!(f, " :- ")?;
            for (i, goal) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", goal)?;
            }
        }
        write!(f, ".")
    }
}

/// Error loading program text into the database.
#[derive(Debug)]
pub enum ConsultError {
    Parse(ParseError),
    Clause(RuntimeError),
}

impl fmt::Display for ConsultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultError::Parse(e) => write!(f, "{}", e),
            ConsultError::Clause(e) => write!(f, "bad clause: {}", e),
        }
    }
}

impl std::error::Error for ConsultError {}

impl From<ParseError> for ConsultError {
    fn from(e: ParseError) -> Self {
        ConsultError::Parse(e)
    }
}

impl From<RuntimeError> for ConsultError {
    fn from(e: RuntimeError) -> Self {
        ConsultError::Clause(e)
    }
}

/// An append-only store of clauses and builtins.
#[derive(Clone, Default)]
pub struct Database {
    clauses: IndexMap<Indicator, Vec<Rc<Clause>>>,
    builtins: IndexMap<Indicator, Builtin>,
}

impl Database {
    /// An empty database with no builtins at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty database plus the standard builtins and library predicates.
    pub fn with_builtins() -> Self {
        let mut db = Database::new();
        crate::builtins::install(&mut db);
        db
    }

    /// Add a clause. The head must be callable (an atom or a compound
    /// term). Clauses for the same predicate keep their insertion order.
    pub fn tell(&mut self, clause: Clause) -> Result<(), RuntimeError> {
        let ind = clause
            .head
            .indicator()
            .ok_or_else(|| RuntimeError::TypeMismatch {
                expected: "callable",
                found: clause.head.clone(),
            })?;
        debug!("tell {}", ind);
        self.clauses.entry(ind).or_default().push(Rc::new(clause));
        Ok(())
    }

    /// Clauses stored under an indicator, in insertion order.
    pub fn lookup(&self, ind: &Indicator) -> Option<&[Rc<Clause>]> {
        self.clauses.get(ind).map(Vec::as_slice)
    }

    /// The builtin registered under an indicator, if any.
    pub fn builtin(&self, ind: &Indicator) -> Option<&Builtin> {
        self.builtins.get(ind)
    }

    /// Register a host builtin under `name/arity`. Builtins shadow user
    /// clauses with the same indicator.
    pub fn register(&mut self, name: &str, arity: usize, builtin: Builtin) {
        debug!("register builtin {}/{}", name, arity);
        self.builtins.insert(Indicator::new(name, arity), builtin);
    }

    /// Load clauses from program text. Any `?-` queries in the text are
    /// returned for the caller to run.
    pub fn consult(&mut self, src: &str) -> Result<Vec<Query>, ConsultError> {
        let program = parser::parse(src)?;
        for clause in program.clauses {
            self.tell(clause)?;
        }
        Ok(program.queries)
    }

    /// Run a query over a snapshot of this database, starting from an
    /// empty substitution.
    pub fn ask(self: &Rc<Self>, goal: Term) -> Solutions {
        debug!("ask {}", goal);
        Solutions::new(self.clone(), solve::call(goal), Subst::new())
    }
}
