//! Trampoline driver for the resolution engine.
//!
//! Goals never call their continuations to completion; every transfer of
//! control is reified as a `Step` and handed back to the work loop here.
//! Deep derivations therefore cost one bounce per inference step instead of
//! one host stack frame, and a query with a hundred thousand activations
//! runs in constant stack space.
//!
//! The continuation types live here too. They are wrappers around shared
//! closures rather than bare `Rc<dyn Fn>`s: pending continuations form a
//! linked chain, one link per choice point, and dropping such a chain
//! recursively would unwind one host frame per link. The wrappers instead
//! hand their closure to a thread-local worklist on drop, and the worklist
//! is drained iteratively, so abandoning a deep search tears down in
//! constant stack just like running it does.

use std::cell::RefCell;
use std::rc::Rc;

use crate::db::Database;
use crate::error::RuntimeError;
use crate::solve::Goal;
use crate::subst::Subst;

/// One unit of work handed back to the driver.
pub enum Step {
    /// More search to do; bounce into the continuation.
    Continue(Cont),
    /// A solution, plus the continuation that resumes the search after it.
    Solution(Subst, Cont),
    /// The search space is exhausted.
    Exhausted,
    /// A runtime fault, unwinding past every pending choice point.
    Fault(RuntimeError),
}

/// A suspended piece of the search, ready to run.
#[derive(Clone)]
pub struct Cont(Option<Rc<dyn Fn() -> Step>>);

impl Cont {
    pub fn new(f: impl Fn() -> Step + 'static) -> Cont {
        Cont(Some(Rc::new(f)))
    }

    /// Run the suspended work. Only the trampoline loop calls this;
    /// everywhere else a continuation is returned inside a `Step`.
    pub fn run(&self) -> Step {
        match &self.0 {
            Some(thunk) => thunk(),
            // Unreachable while the continuation is alive; the closure is
            // only taken out during teardown.
            None => Step::Exhausted,
        }
    }
}

impl Drop for Cont {
    fn drop(&mut self) {
        if let Some(thunk) = self.0.take() {
            defer_drop(Deferred::Cont(thunk));
        }
    }
}

/// Solution callback: receives the solution substitution and the
/// continuation that searches for the next one. Wrapped like `Cont` and
/// for the same reason: under non-tail recursion the emit chain is as deep
/// as the derivation.
#[derive(Clone)]
pub struct Emit(Option<Rc<dyn Fn(&Subst, Cont) -> Step>>);

impl Emit {
    pub fn new(f: impl Fn(&Subst, Cont) -> Step + 'static) -> Emit {
        Emit(Some(Rc::new(f)))
    }

    /// Deliver a solution together with the continuation that resumes the
    /// search behind it.
    pub fn run(&self, subst: &Subst, retry: Cont) -> Step {
        match &self.0 {
            Some(callback) => callback(subst, retry),
            None => Step::Exhausted,
        }
    }
}

impl Drop for Emit {
    fn drop(&mut self) {
        if let Some(callback) = self.0.take() {
            defer_drop(Deferred::Emit(callback));
        }
    }
}

enum Deferred {
    Cont(Rc<dyn Fn() -> Step>),
    Emit(Rc<dyn Fn(&Subst, Cont) -> Step>),
}

struct Graveyard {
    draining: bool,
    queue: Vec<Deferred>,
}

thread_local! {
    static GRAVEYARD: RefCell<Graveyard> = RefCell::new(Graveyard {
        draining: false,
        queue: Vec::new(),
    });
}

/// Release a continuation closure without recursing. The first caller on
/// the stack drains the worklist; closures dropped while draining only
/// enqueue the continuations they captured, so each chain link costs a
/// bounded number of host frames no matter how long the chain is.
fn defer_drop(deferred: Deferred) {
    let drain_here = GRAVEYARD.with(|g| {
        let mut g = g.borrow_mut();
        g.queue.push(deferred);
        !std::mem::replace(&mut g.draining, true)
    });
    if !drain_here {
        return;
    }
    loop {
        // Pop outside the borrow: dropping the closure re-enters this
        // function for anything it captured.
        let next = GRAVEYARD.with(|g| g.borrow_mut().queue.pop());
        match next {
            Some(deferred) => drop(deferred),
            None => break,
        }
    }
    GRAVEYARD.with(|g| g.borrow_mut().draining = false);
}

/// The continuation that reports an exhausted search.
pub fn exhausted() -> Cont {
    Cont::new(|| Step::Exhausted)
}

/// A stream of solutions to a goal, produced on demand.
///
/// Each call to `next` spins the trampoline until the search either emits a
/// solution, faults, or runs out of alternatives. Dropping the stream
/// abandons the remaining search.
pub struct Solutions {
    pending: Option<Cont>,
}

impl Solutions {
    /// Start a search for `goal` against a snapshot of `db`, beginning from
    /// `subst`.
    pub fn new(db: Rc<Database>, goal: Goal, subst: Subst) -> Self {
        let emit = Emit::new(|s: &Subst, retry: Cont| Step::Solution(s.clone(), retry));
        let halt = exhausted();
        let first = Cont::new(move || {
            goal.solve(&db, &subst, emit.clone(), halt.clone(), halt.clone())
        });
        Solutions {
            pending: Some(first),
        }
    }
}

impl Iterator for Solutions {
    type Item = Result<Subst, RuntimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut cont = self.pending.take()?;
        loop {
            match cont.run() {
                Step::Continue(next) => cont = next,
                Step::Solution(subst, retry) => {
                    self.pending = Some(retry);
                    return Some(Ok(subst));
                }
                Step::Exhausted => return None,
                Step::Fault(err) => return Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Term, Var};

    fn db_from(src: &str) -> Rc<Database> {
        let mut db = Database::new();
        db.consult(src).unwrap();
        Rc::new(db)
    }

    fn answers(db: &Rc<Database>, goal: Term, var: &Var) -> Vec<String> {
        db.ask(goal)
            .map(|r| r.unwrap().resolve(&Term::Var(var.clone())).to_string())
            .collect()
    }

    fn countdown_db() -> Rc<Database> {
        let mut db = Database::with_builtins();
        db.consult(
            "
            countdown(0).
            countdown(N) :- N > 0, M is N - 1, countdown(M).
        ",
        )
        .unwrap();
        Rc::new(db)
    }

    #[test]
    fn test_facts_in_clause_order() {
        let db = db_from("p(a). p(b). p(c).");
        let x = Var::named("X");
        let goal = Term::compound("p", vec![Term::Var(x.clone())]);
        assert_eq!(answers(&db, goal, &x), ["a", "b", "c"]);
    }

    #[test]
    fn test_conjunction_backtracks() {
        let db = db_from(
            "
            parent(tom, bob).
            parent(bob, pat).
            parent(bob, ann).
            grandparent(X, Z) :- parent(X, Y), parent(Y, Z).
        ",
        );
        let z = Var::named("Z");
        let goal = Term::compound("grandparent", vec![Term::atom("tom"), Term::Var(z.clone())]);
        assert_eq!(answers(&db, goal, &z), ["pat", "ann"]);
    }

    #[test]
    fn test_recursive_rule() {
        let db = db_from(
            "
            parent(tom, bob).
            parent(bob, pat).
            ancestor(X, Y) :- parent(X, Y).
            ancestor(X, Z) :- parent(X, Y), ancestor(Y, Z).
        ",
        );
        let y = Var::named("Y");
        let goal = Term::compound("ancestor", vec![Term::atom("tom"), Term::Var(y.clone())]);
        assert_eq!(answers(&db, goal, &y), ["bob", "pat"]);
    }

    #[test]
    fn test_no_solution() {
        let db = db_from("p(a).");
        let goal = Term::compound("p", vec![Term::atom("b")]);
        assert_eq!(db.ask(goal).count(), 0);
    }

    #[test]
    fn test_unknown_predicate_fails() {
        let db = db_from("p(a).");
        let goal = Term::compound("q", vec![Term::atom("a")]);
        assert_eq!(db.ask(goal).count(), 0);
    }

    #[test]
    fn test_ask_runs_over_a_snapshot() {
        let mut db = db_from("p(a).");
        let x = Var::named("X");
        let goal = Term::compound("p", vec![Term::Var(x.clone())]);

        let mut running = db.ask(goal.clone());
        Rc::make_mut(&mut db)
            .tell(crate::db::Clause::fact(Term::compound(
                "p",
                vec![Term::atom("b")],
            )))
            .unwrap();

        // The in-flight query still sees the old clause list.
        let seen: Vec<String> = running
            .by_ref()
            .map(|r| r.unwrap().resolve(&Term::Var(x.clone())).to_string())
            .collect();
        assert_eq!(seen, ["a"]);

        // A fresh query sees the addition.
        assert_eq!(answers(&db, goal, &x), ["a", "b"]);
    }

    #[test]
    fn test_deep_recursion_constant_stack() {
        let db = countdown_db();
        let goal = Term::compound("countdown", vec![Term::Int(100_000)]);
        // Drive the search to exhaustion so the continuation chain is
        // consumed one bounce at a time.
        let solutions: Vec<_> = db.ask(goal).collect();
        assert_eq!(solutions.len(), 1);
        assert!(solutions[0].is_ok());
    }

    #[test]
    fn test_abandoning_a_deep_search_is_safe() {
        let db = countdown_db();
        let goal = Term::compound("countdown", vec![Term::Int(300_000)]);
        // Pull one solution, then drop the stream while it still holds a
        // retry chain with one link per activation. Teardown must not
        // recurse through the chain.
        let mut solutions = db.ask(goal);
        assert!(solutions.next().unwrap().is_ok());
        drop(solutions);
    }
}
