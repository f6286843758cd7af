//! hornlog: an embeddable Prolog-style logic engine.
//!
//! Resolution runs in continuation-passing style over persistent
//! substitutions, driven by a trampoline, so deep derivations use constant
//! host stack and backtracking never undoes anything.
//!
//! # Features
//!
//! - Facts and rules (Horn clauses)
//! - Unification of first-order terms, with optional occurs check
//! - Backtracking via choice points, cut, negation as failure, soft cut
//! - Atoms, variables, 64-bit integers, strings, compound terms, lists
//! - Arithmetic evaluation and comparisons
//! - `findall/3`, `throw/1`/`catch/3`, metacall, a small clause library
//! - Host builtins registered as Rust closures
//!
//! # Example
//!
//! ```prolog
//! parent(tom, bob).
//! parent(bob, pat).
//! ancestor(X, Y) :- parent(X, Y).
//! ancestor(X, Z) :- parent(X, Y), ancestor(Y, Z).
//! ?- ancestor(tom, pat).
//! ```

pub mod builtins;
pub mod db;
pub mod error;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod solve;
pub mod subst;
pub mod term;
pub mod token;
pub mod unify;

pub use db::{Builtin, Clause, ConsultError, Ctx, Database};
pub use error::RuntimeError;
pub use lexer::{Lexer, LexerError};
pub use machine::{Cont, Emit, Solutions, Step};
pub use parser::{parse, ParseError, Parser, Program, Query};
pub use solve::{call, Goal};
pub use subst::Subst;
pub use term::{Indicator, Term, Var};
pub use token::{Span, Token};
pub use unify::{unify, unify_occurs};
