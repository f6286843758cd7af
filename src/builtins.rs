//! Builtin predicates and the bundled library.
//!
//! Host builtins cover the operations that cannot be expressed as clauses:
//! unification, arithmetic, type tests, term construction, metacall,
//! `findall/3`, exceptions and output. Everything that can be a clause is
//! one; `install` loads the library source below into the database like
//! any user program.

use std::cell::RefCell;
use std::rc::Rc;

use crate::db::{Ctx, Database};
use crate::error::RuntimeError;
use crate::machine::{Cont, Emit, Solutions, Step};
use crate::solve;
use crate::subst::Subst;
use crate::term::Term;
use crate::unify::unify;

/// Library predicates, consulted into every `Database::with_builtins()`.
const LIBRARY: &str = "
append([], Ys, Ys).
append([X|Xs], Ys, [X|Zs]) :- append(Xs, Ys, Zs).

member(X, [X|_]).
member(X, [_|Ys]) :- member(X, Ys).

select(X, [X|Xs], Xs).
select(X, [Y|Ys], [Y|Zs]) :- select(X, Ys, Zs).

reverse(Xs, Ys) :- rev_acc(Xs, [], Ys).
rev_acc([], Acc, Acc).
rev_acc([X|Xs], Acc, Ys) :- rev_acc(Xs, [X|Acc], Ys).

length([], 0).
length([_|Xs], N) :- length(Xs, M), N is M + 1.

between(Low, High, Low) :- Low =< High.
between(Low, High, X) :- Low < High, Next is Low + 1, between(Next, High, X).

once(G) :- call(G), !.

ignore(G) :- call(G), !.
ignore(_).

not(G) :- \\+ call(G).

maplist(_, []).
maplist(G, [X|Xs]) :- call(G, X), maplist(G, Xs).

maplist(_, [], []).
maplist(G, [X|Xs], [Y|Ys]) :- call(G, X, Y), maplist(G, Xs, Ys).

repeat.
repeat :- repeat.
";

/// Register every builtin and load the library.
pub fn install(db: &mut Database) {
    db.register("=", 2, Rc::new(bi_unify));
    db.register("\\=", 2, Rc::new(bi_not_unify));
    db.register("==", 2, Rc::new(bi_identical));
    db.register("\\==", 2, Rc::new(bi_not_identical));
    db.register("is", 2, Rc::new(bi_is));
    db.register("=..", 2, Rc::new(bi_univ));
    db.register("findall", 3, Rc::new(bi_findall));
    db.register("throw", 1, Rc::new(bi_throw));
    db.register("catch", 3, Rc::new(bi_catch));
    db.register("write", 1, Rc::new(bi_write));
    db.register("writeln", 1, Rc::new(bi_writeln));
    db.register("nl", 0, Rc::new(bi_nl));
    db.register("is_list", 1, Rc::new(bi_is_list));

    for arity in 1..=8 {
        db.register("call", arity, Rc::new(bi_call));
    }

    let comparisons: [(&str, fn(i64, i64) -> bool); 6] = [
        ("<", |a, b| a < b),
        (">", |a, b| a > b),
        ("=<", |a, b| a <= b),
        (">=", |a, b| a >= b),
        ("=:=", |a, b| a == b),
        ("=\\=", |a, b| a != b),
    ];
    for (name, test) in comparisons {
        db.register(
            name,
            2,
            Rc::new(move |_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont| {
                let pair = eval(&args[0], s).and_then(|a| Ok((a, eval(&args[1], s)?)));
                match pair {
                    Ok((a, b)) if test(a, b) => emit.run(s, no),
                    Ok(_) => Step::Continue(no),
                    Err(e) => Step::Fault(e),
                }
            }),
        );
    }

    let type_tests: [(&str, fn(&Term) -> bool); 6] = [
        ("var", |t| matches!(t, Term::Var(_))),
        ("nonvar", |t| !matches!(t, Term::Var(_))),
        ("atom", |t| matches!(t, Term::Atom(_) | Term::Nil)),
        ("number", |t| matches!(t, Term::Int(_))),
        ("atomic", |t| {
            matches!(t, Term::Atom(_) | Term::Int(_) | Term::Str(_) | Term::Nil)
        }),
        ("compound", |t| {
            matches!(t, Term::Compound(_, _) | Term::Cons(_, _))
        }),
    ];
    for (name, test) in type_tests {
        db.register(
            name,
            1,
            Rc::new(move |_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont| {
                if test(&s.walk(&args[0])) {
                    emit.run(s, no)
                } else {
                    Step::Continue(no)
                }
            }),
        );
    }

    db.consult(LIBRARY).expect("bundled library parses");
}

/// Evaluate an arithmetic expression to an integer.
///
/// Supported evaluables: integer literals, `+`/`-`/`*`/`/`/`mod` on two
/// operands and unary `-`. Division truncates toward zero; `mod` is
/// floored, so the result takes the sign of the divisor. Results outside
/// the i64 range fault instead of wrapping.
pub fn eval(term: &Term, s: &Subst) -> Result<i64, RuntimeError> {
    match s.walk(term) {
        Term::Int(n) => Ok(n),
        Term::Var(_) => Err(RuntimeError::Instantiation),
        Term::Compound(op, args) if args.len() == 2 => {
            let a = eval(&args[0], s)?;
            let b = eval(&args[1], s)?;
            match op.as_ref() {
                "+" => a.checked_add(b).ok_or(RuntimeError::Overflow),
                "-" => a.checked_sub(b).ok_or(RuntimeError::Overflow),
                "*" => a.checked_mul(b).ok_or(RuntimeError::Overflow),
                "/" => {
                    if b == 0 {
                        Err(RuntimeError::DivisionByZero)
                    } else {
                        a.checked_div(b).ok_or(RuntimeError::Overflow)
                    }
                }
                "mod" => {
                    if b == 0 {
                        Err(RuntimeError::DivisionByZero)
                    } else {
                        // checked_rem is None only for i64::MIN mod -1.
                        let r = a.checked_rem(b).ok_or(RuntimeError::Overflow)?;
                        Ok(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
                    }
                }
                _ => Err(RuntimeError::TypeMismatch {
                    expected: "evaluable",
                    found: Term::Compound(op.clone(), args.clone()),
                }),
            }
        }
        Term::Compound(op, args) if args.len() == 1 && op.as_ref() == "-" => {
            eval(&args[0], s)?.checked_neg().ok_or(RuntimeError::Overflow)
        }
        other => Err(RuntimeError::TypeMismatch {
            expected: "evaluable",
            found: other,
        }),
    }
}

fn emit_if(result: Option<Subst>, emit: Emit, no: Cont) -> Step {
    match result {
        Some(bound) => emit.run(&bound, no),
        None => Step::Continue(no),
    }
}

fn bi_unify(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    emit_if(unify(&args[0], &args[1], s), emit, no)
}

fn bi_not_unify(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    if unify(&args[0], &args[1], s).is_none() {
        emit.run(s, no)
    } else {
        Step::Continue(no)
    }
}

fn bi_identical(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    if s.resolve(&args[0]) == s.resolve(&args[1]) {
        emit.run(s, no)
    } else {
        Step::Continue(no)
    }
}

fn bi_not_identical(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    if s.resolve(&args[0]) != s.resolve(&args[1]) {
        emit.run(s, no)
    } else {
        Step::Continue(no)
    }
}

fn bi_is(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    match eval(&args[1], s) {
        Ok(n) => emit_if(unify(&args[0], &Term::Int(n), s), emit, no),
        Err(e) => Step::Fault(e),
    }
}

fn bi_is_list(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    let mut current = s.walk(&args[0]);
    loop {
        match current {
            Term::Nil => return emit.run(s, no),
            Term::Cons(_, tail) => current = s.walk(&tail),
            _ => return Step::Continue(no),
        }
    }
}

/// Collect the items of a proper list, faulting on partial or improper
/// lists.
fn list_items(term: &Term, s: &Subst) -> Result<Vec<Term>, RuntimeError> {
    let mut items = Vec::new();
    let mut current = s.walk(term);
    loop {
        match current {
            Term::Nil => return Ok(items),
            Term::Cons(head, tail) => {
                items.push(head.as_ref().clone());
                current = s.walk(&tail);
            }
            Term::Var(_) => return Err(RuntimeError::Instantiation),
            other => {
                return Err(RuntimeError::TypeMismatch {
                    expected: "list",
                    found: other,
                })
            }
        }
    }
}

fn bi_univ(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    let lhs = s.walk(&args[0]);
    match &lhs {
        Term::Var(_) => {
            let items = match list_items(&args[1], s) {
                Ok(items) => items,
                Err(e) => return Step::Fault(e),
            };
            let built = match items.split_first().map(|(h, rest)| (s.walk(h), rest)) {
                None => {
                    return Step::Fault(RuntimeError::TypeMismatch {
                        expected: "non-empty list",
                        found: s.resolve(&args[1]),
                    })
                }
                Some((only, [])) => only,
                Some((Term::Atom(name), rest)) => {
                    if name.as_ref() == "." && rest.len() == 2 {
                        Term::cons(rest[0].clone(), rest[1].clone())
                    } else {
                        Term::Compound(name, Rc::new(rest.to_vec()))
                    }
                }
                Some((other, _)) => {
                    return Step::Fault(RuntimeError::TypeMismatch {
                        expected: "atom",
                        found: other,
                    })
                }
            };
            emit_if(unify(&lhs, &built, s), emit, no)
        }
        Term::Compound(functor, cargs) => {
            let mut items = vec![Term::Atom(functor.clone())];
            items.extend(cargs.iter().cloned());
            emit_if(unify(&args[1], &Term::list(items), s), emit, no)
        }
        Term::Cons(head, tail) => {
            let items = vec![
                Term::atom("."),
                head.as_ref().clone(),
                tail.as_ref().clone(),
            ];
            emit_if(unify(&args[1], &Term::list(items), s), emit, no)
        }
        atomic => emit_if(
            unify(&args[1], &Term::list(vec![atomic.clone()]), s),
            emit,
            no,
        ),
    }
}

/// `call/1` through `call/8`: add the extra arguments to the callable and
/// solve it. A cut inside the called goal is local to the call.
fn bi_call(ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    let target = s.walk(&args[0]);
    let extra = &args[1..];
    let goal = if extra.is_empty() {
        target
    } else {
        match target {
            Term::Atom(name) => Term::Compound(name, Rc::new(extra.to_vec())),
            Term::Compound(functor, base) => {
                let mut all = base.as_ref().clone();
                all.extend_from_slice(extra);
                Term::Compound(functor, Rc::new(all))
            }
            Term::Var(_) => return Step::Fault(RuntimeError::Instantiation),
            other => {
                return Step::Fault(RuntimeError::TypeMismatch {
                    expected: "callable",
                    found: other,
                })
            }
        }
    };
    solve::call(goal).solve(ctx, s, emit, no.clone(), no)
}

/// `findall/3`: run the goal to exhaustion in an isolated search, collect
/// the instantiated template per solution, and unify the bag.
fn bi_findall(ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    let template = args[0].clone();
    let mut items = Vec::new();
    let nested = Solutions::new(ctx.clone(), solve::call(args[1].clone()), s.clone());
    for result in nested {
        match result {
            Ok(solution) => items.push(solution.resolve(&template)),
            Err(e) => return Step::Fault(e),
        }
    }
    emit_if(unify(&args[2], &Term::list(items), s), emit, no)
}

fn bi_throw(_ctx: &Ctx, args: &[Term], s: &Subst, _emit: Emit, _no: Cont, _p: Cont) -> Step {
    let ball = s.resolve(&args[0]);
    if ball.is_var() {
        return Step::Fault(RuntimeError::Instantiation);
    }
    Step::Fault(RuntimeError::Ball(ball))
}

/// `catch/3`: drive the goal in a nested search. Faults raised while
/// producing a solution of the goal (including on backtracking into it)
/// are matched against the catcher; faults from the surrounding
/// conjunction pass through untouched.
fn bi_catch(ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    let nested = Rc::new(RefCell::new(Solutions::new(
        ctx.clone(),
        solve::call(args[0].clone()),
        s.clone(),
    )));
    catch_next(
        ctx.clone(),
        nested,
        args[1].clone(),
        args[2].clone(),
        s.clone(),
        emit,
        no,
    )
}

fn catch_next(
    ctx: Ctx,
    nested: Rc<RefCell<Solutions>>,
    catcher: Term,
    recovery: Term,
    s0: Subst,
    emit: Emit,
    no: Cont,
) -> Step {
    let produced = nested.borrow_mut().next();
    match produced {
        Some(Ok(solution)) => {
            let retry = {
                let ctx = ctx.clone();
                let nested = nested.clone();
                let catcher = catcher.clone();
                let recovery = recovery.clone();
                let s0 = s0.clone();
                let emit = emit.clone();
                let no = no.clone();
                Cont::new(move || {
                    catch_next(
                        ctx.clone(),
                        nested.clone(),
                        catcher.clone(),
                        recovery.clone(),
                        s0.clone(),
                        emit.clone(),
                        no.clone(),
                    )
                })
            };
            emit.run(&solution, retry)
        }
        None => Step::Continue(no),
        Some(Err(err)) => {
            // Bindings made by the goal are discarded; the catcher is
            // matched against the substitution from before the call.
            match unify(&err.to_ball(), &catcher, &s0) {
                Some(bound) => solve::call(recovery).solve(&ctx, &bound, emit, no.clone(), no),
                None => Step::Fault(err),
            }
        }
    }
}

fn bi_write(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    print!("{}", s.resolve(&args[0]));
    emit.run(s, no)
}

fn bi_writeln(_ctx: &Ctx, args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    println!("{}", s.resolve(&args[0]));
    emit.run(s, no)
}

fn bi_nl(_ctx: &Ctx, _args: &[Term], s: &Subst, emit: Emit, no: Cont, _p: Cont) -> Step {
    println!();
    emit.run(s, no)
}
