//! Continuation-passing resolution engine.
//!
//! A `Goal` is a suspended search. Solving one takes three continuations:
//! an emit callback invoked once per solution (with a retry continuation
//! that resumes the search behind it), a failure continuation, and a prune
//! continuation marking where `cut` lands. Goals never invoke a
//! continuation deeply; `Goal::solve` always returns a `Step` so the
//! trampoline in `machine` owns the host stack.
//!
//! The combinators here form a small algebra: `then`/`seq` for
//! conjunction, `choice`/`amb` for disjunction, `cut` to discard pending
//! alternatives up to the nearest `prunable` barrier, and `neg` /
//! `if_then_else` built from those. `call` interprets a term as a goal and
//! dispatches on its shape.

use std::rc::Rc;

use log::{debug, trace};

use crate::db::{Clause, Ctx};
use crate::error::RuntimeError;
use crate::machine::{Cont, Emit, Step};
use crate::subst::{rename_clause, Subst};
use crate::term::{Indicator, Term};
use crate::unify;

/// A suspended search over a database snapshot.
#[derive(Clone)]
pub struct Goal(Rc<dyn Fn(&Ctx, &Subst, Emit, Cont, Cont) -> Step>);

impl Goal {
    pub fn new(f: impl Fn(&Ctx, &Subst, Emit, Cont, Cont) -> Step + 'static) -> Goal {
        Goal(Rc::new(f))
    }

    /// Schedule this goal. The work itself happens on the next trampoline
    /// bounce, so arbitrarily deep goal chains never nest host frames.
    pub fn solve(&self, ctx: &Ctx, subst: &Subst, emit: Emit, no: Cont, prune: Cont) -> Step {
        let inner = self.0.clone();
        let ctx = ctx.clone();
        let subst = subst.clone();
        Step::Continue(Cont::new(move || {
            inner(&ctx, &subst, emit.clone(), no.clone(), prune.clone())
        }))
    }
}

/// Succeed exactly once, binding nothing.
pub fn unit() -> Goal {
    Goal::new(|_, subst, emit, no, _| emit.run(subst, no))
}

/// Fail immediately.
pub fn fail() -> Goal {
    Goal::new(|_, _, _, no, _| Step::Continue(no))
}

/// Succeed once; on retry, jump to the prune continuation, discarding every
/// alternative created since the nearest barrier.
pub fn cut() -> Goal {
    Goal::new(|_, subst, emit, _, prune| emit.run(subst, prune))
}

/// Conjunction: solve `g1`, and for each of its solutions solve `g2`.
pub fn then(g1: Goal, g2: Goal) -> Goal {
    Goal::new(move |ctx, subst, emit, no, prune| {
        let g2 = g2.clone();
        let ctx2 = ctx.clone();
        let outer = emit.clone();
        let prune2 = prune.clone();
        let mid = Emit::new(move |s1: &Subst, retry: Cont| {
            g2.solve(&ctx2, s1, outer.clone(), retry, prune2.clone())
        });
        g1.solve(ctx, subst, mid, no, prune)
    })
}

/// Conjunction of a whole sequence. Empty sequences succeed once.
pub fn seq(goals: impl IntoIterator<Item = Goal>) -> Goal {
    let mut goals = goals.into_iter();
    match goals.next() {
        Some(first) => goals.fold(first, then),
        None => unit(),
    }
}

/// Disjunction: solve `g1`; once it is exhausted, solve `g2` from the same
/// substitution.
pub fn choice(g1: Goal, g2: Goal) -> Goal {
    Goal::new(move |ctx, subst, emit, no, prune| {
        let g2 = g2.clone();
        let ctx2 = ctx.clone();
        let subst2 = subst.clone();
        let emit2 = emit.clone();
        let no2 = no.clone();
        let prune2 = prune.clone();
        let retry = Cont::new(move || {
            g2.solve(&ctx2, &subst2, emit2.clone(), no2.clone(), prune2.clone())
        });
        g1.solve(ctx, subst, emit, retry, prune)
    })
}

/// Disjunction of a whole sequence. Empty sequences fail.
pub fn amb(goals: impl IntoIterator<Item = Goal>) -> Goal {
    let mut goals = goals.into_iter();
    match goals.next() {
        Some(first) => goals.fold(first, choice),
        None => fail(),
    }
}

/// Install a cut barrier: a `cut` inside `goal` discards alternatives only
/// up to this point.
pub fn prunable(goal: Goal) -> Goal {
    Goal::new(move |ctx, subst, emit, no, _prune| {
        goal.solve(ctx, subst, emit, no.clone(), no)
    })
}

/// Negation as failure: succeeds (binding nothing) exactly when `goal` has
/// no solution.
pub fn neg(goal: Goal) -> Goal {
    prunable(choice(seq([goal, cut(), fail()]), unit()))
}

/// Soft cut: commit to the first solution of `cond` and run `then_g` under
/// it; if `cond` never succeeds, run `else_g` instead.
pub fn if_then_else(cond: Goal, then_g: Goal, else_g: Goal) -> Goal {
    prunable(choice(seq([cond, cut(), then_g]), else_g))
}

/// Unify two terms as a goal.
pub fn unify_goal(t1: Term, t2: Term) -> Goal {
    Goal::new(move |_, subst, emit, no, _| match unify::unify(&t1, &t2, subst) {
        Some(bound) => emit.run(&bound, no),
        None => Step::Continue(no),
    })
}

/// A goal that faults, unwinding the whole search.
pub fn raise(err: RuntimeError) -> Goal {
    Goal::new(move |_, _, _, _, _| Step::Fault(err.clone()))
}

/// Interpret a term as a goal.
///
/// The term is dereferenced at solve time, so a variable bound to a goal by
/// an earlier conjunct is callable. Control constructs are ordinary terms:
/// `','/2`, `';'/2`, `'->'/2`, `'\+'/1`, the atoms `true`, `fail`, `false`
/// and `!`. Anything else is dispatched to the builtin registry first, then
/// to the clause database.
pub fn call(term: Term) -> Goal {
    Goal::new(move |ctx, subst, emit, no, prune| {
        let goal = subst.walk(&term);
        trace!("call {}", goal);
        match &goal {
            Term::Var(_) => Step::Fault(RuntimeError::Instantiation),

            Term::Atom(name) => match name.as_ref() {
                "true" => emit.run(subst, no),
                "fail" | "false" => Step::Continue(no),
                "!" => emit.run(subst, prune),
                _ => dispatch(
                    ctx,
                    Indicator::new(name.clone(), 0),
                    &goal,
                    subst,
                    emit,
                    no,
                    prune,
                ),
            },

            Term::Compound(functor, args) => match (functor.as_ref(), args.len()) {
                (",", 2) => then(call(args[0].clone()), call(args[1].clone()))
                    .solve(ctx, subst, emit, no, prune),
                (";", 2) => {
                    // An if-then-else hides behind a disjunction whose left
                    // arm is '->'/2.
                    let lhs = subst.walk(&args[0]);
                    if let Term::Compound(inner, cond_args) = &lhs {
                        if inner.as_ref() == "->" && cond_args.len() == 2 {
                            return if_then_else(
                                call(cond_args[0].clone()),
                                call(cond_args[1].clone()),
                                call(args[1].clone()),
                            )
                            .solve(ctx, subst, emit, no, prune);
                        }
                    }
                    choice(call(args[0].clone()), call(args[1].clone()))
                        .solve(ctx, subst, emit, no, prune)
                }
                ("->", 2) => if_then_else(call(args[0].clone()), call(args[1].clone()), fail())
                    .solve(ctx, subst, emit, no, prune),
                ("\\+", 1) => neg(call(args[0].clone())).solve(ctx, subst, emit, no, prune),
                _ => dispatch(
                    ctx,
                    Indicator::new(functor.clone(), args.len()),
                    &goal,
                    subst,
                    emit,
                    no,
                    prune,
                ),
            },

            other => Step::Fault(RuntimeError::TypeMismatch {
                expected: "callable",
                found: other.clone(),
            }),
        }
    })
}

fn dispatch(
    ctx: &Ctx,
    ind: Indicator,
    goal: &Term,
    subst: &Subst,
    emit: Emit,
    no: Cont,
    prune: Cont,
) -> Step {
    if let Some(builtin) = ctx.builtin(&ind) {
        let builtin = builtin.clone();
        return builtin(ctx, goal.args(), subst, emit, no, prune);
    }
    match ctx.lookup(&ind) {
        Some(clauses) => {
            let clauses = Rc::new(clauses.to_vec());
            solve_clauses(ctx.clone(), clauses, 0, goal.clone(), subst.clone(), emit, no)
        }
        None => {
            debug!("no clauses for {}", ind);
            Step::Continue(no)
        }
    }
}

/// Try the clauses for a predicate one at a time. Each activation gets a
/// fresh renaming; the body runs with the caller's failure continuation as
/// its cut barrier, so a cut commits the whole call.
fn solve_clauses(
    ctx: Ctx,
    clauses: Rc<Vec<Rc<Clause>>>,
    index: usize,
    goal: Term,
    subst: Subst,
    emit: Emit,
    no: Cont,
) -> Step {
    if index >= clauses.len() {
        return Step::Continue(no);
    }

    let rest = {
        let ctx = ctx.clone();
        let clauses = clauses.clone();
        let goal = goal.clone();
        let subst = subst.clone();
        let emit = emit.clone();
        let no = no.clone();
        Cont::new(move || {
            solve_clauses(
                ctx.clone(),
                clauses.clone(),
                index + 1,
                goal.clone(),
                subst.clone(),
                emit.clone(),
                no.clone(),
            )
        })
    };

    let clause = &clauses[index];
    let (head, body) = rename_clause(&clause.head, &clause.body);
    match unify::unify(&goal, &head, &subst) {
        Some(bound) => {
            trace!("clause {} matched {}", index, goal);
            let body_goal = seq(body.into_iter().map(call));
            body_goal.solve(&ctx, &bound, emit, rest, no)
        }
        None => Step::Continue(rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::machine::Solutions;
    use crate::term::Var;

    fn run(goal: Goal) -> Vec<Subst> {
        let db = Rc::new(Database::new());
        Solutions::new(db, goal, Subst::new())
            .map(|r| r.unwrap())
            .collect()
    }

    fn bindings_of(goal: Goal, var: &Var) -> Vec<Term> {
        run(goal)
            .iter()
            .map(|s| s.resolve(&Term::Var(var.clone())))
            .collect()
    }

    fn bind(var: &Var, value: i64) -> Goal {
        unify_goal(Term::Var(var.clone()), Term::Int(value))
    }

    #[test]
    fn test_unit_succeeds_once() {
        assert_eq!(run(unit()).len(), 1);
    }

    #[test]
    fn test_fail_yields_nothing() {
        assert_eq!(run(fail()).len(), 0);
    }

    #[test]
    fn test_choice_yields_in_order() {
        let x = Var::named("X");
        let g = amb([bind(&x, 1), bind(&x, 2), bind(&x, 3)]);
        assert_eq!(
            bindings_of(g, &x),
            [Term::Int(1), Term::Int(2), Term::Int(3)]
        );
    }

    #[test]
    fn test_cut_discards_pending_alternatives() {
        let x = Var::named("X");
        let g = seq([amb([bind(&x, 1), bind(&x, 2)]), cut()]);
        assert_eq!(bindings_of(g, &x), [Term::Int(1)]);
    }

    #[test]
    fn test_prunable_bounds_the_cut() {
        let x = Var::named("X");
        // The cut sits behind its own barrier, so the outer disjunction
        // keeps both alternatives.
        let g = seq([amb([bind(&x, 1), bind(&x, 2)]), prunable(cut())]);
        assert_eq!(bindings_of(g, &x), [Term::Int(1), Term::Int(2)]);
    }

    #[test]
    fn test_neg_inverts() {
        assert_eq!(run(neg(fail())).len(), 1);
        assert_eq!(run(neg(unit())).len(), 0);
    }

    #[test]
    fn test_neg_leaks_no_bindings() {
        let x = Var::named("X");
        let sols = run(neg(seq([bind(&x, 1), fail()])));
        assert_eq!(sols.len(), 1);
        assert!(sols[0].lookup(&x).is_none());
    }

    #[test]
    fn test_if_then_else_takes_then_branch() {
        let x = Var::named("X");
        let g = if_then_else(unit(), bind(&x, 1), bind(&x, 2));
        assert_eq!(bindings_of(g, &x), [Term::Int(1)]);
    }

    #[test]
    fn test_if_then_else_takes_else_branch() {
        let x = Var::named("X");
        let g = if_then_else(fail(), bind(&x, 1), bind(&x, 2));
        assert_eq!(bindings_of(g, &x), [Term::Int(2)]);
    }

    #[test]
    fn test_if_then_else_commits_to_first_condition_solution() {
        let c = Var::named("C");
        let x = Var::named("X");
        let g = if_then_else(
            amb([bind(&c, 1), bind(&c, 2)]),
            bind(&x, 10),
            bind(&x, 20),
        );
        let sols = run(g);
        assert_eq!(sols.len(), 1);
        assert_eq!(sols[0].resolve(&Term::Var(c)), Term::Int(1));
        assert_eq!(sols[0].resolve(&Term::Var(x)), Term::Int(10));
    }

    #[test]
    fn test_raise_surfaces_as_fault() {
        let db = Rc::new(Database::new());
        let mut results = Solutions::new(db, raise(RuntimeError::Instantiation), Subst::new());
        let first = results.next().unwrap();
        assert_eq!(first.unwrap_err(), RuntimeError::Instantiation);
        assert!(results.next().is_none());
    }

    #[test]
    fn test_calling_a_variable_faults() {
        let db = Rc::new(Database::new());
        let goal = call(Term::Var(Var::named("G")));
        let results: Vec<_> = Solutions::new(db, goal, Subst::new()).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].clone().unwrap_err(),
            RuntimeError::Instantiation
        );
    }

    #[test]
    fn test_calling_a_non_callable_faults() {
        let db = Rc::new(Database::new());
        let results: Vec<_> = Solutions::new(db, call(Term::Int(3)), Subst::new()).collect();
        assert!(matches!(
            results[0],
            Err(RuntimeError::TypeMismatch { expected: "callable", .. })
        ));
    }
}
