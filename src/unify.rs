//! Unification of terms under a substitution.
//!
//! `unify` computes the most general extension of a substitution making two
//! terms identical, or fails. Failure is all-or-nothing: the caller keeps
//! its original substitution untouched, which the persistent representation
//! guarantees without any rollback machinery.

use crate::subst::Subst;
use crate::term::{Term, Var};

/// Unify two terms, without occurs check (the default, as in standard
/// Prolog). A variable unifies with any term, including one containing the
/// variable itself; the resulting cyclic binding is representable and it is
/// the caller's business not to fully resolve it.
pub fn unify(t1: &Term, t2: &Term, subst: &Subst) -> Option<Subst> {
    unify_in(t1, t2, subst, false)
}

/// Unify two terms with occurs check: binding a variable to a term that
/// contains it fails instead.
pub fn unify_occurs(t1: &Term, t2: &Term, subst: &Subst) -> Option<Subst> {
    unify_in(t1, t2, subst, true)
}

fn unify_in(t1: &Term, t2: &Term, subst: &Subst, occurs_check: bool) -> Option<Subst> {
    let t1 = subst.walk(t1);
    let t2 = subst.walk(t2);

    match (&t1, &t2) {
        (Term::Var(v1), Term::Var(v2)) => {
            if v1 == v2 {
                Some(subst.clone())
            } else if v1.id() < v2.id() {
                // Bind the younger variable to the older one so that
                // variable chains always point backwards and stay short.
                Some(subst.extend(v2.clone(), t1.clone()))
            } else {
                Some(subst.extend(v1.clone(), t2.clone()))
            }
        }

        (Term::Var(v), _) => bind(v, &t2, subst, occurs_check),
        (_, Term::Var(v)) => bind(v, &t1, subst, occurs_check),

        (Term::Atom(a), Term::Atom(b)) => (a == b).then(|| subst.clone()),
        (Term::Int(a), Term::Int(b)) => (a == b).then(|| subst.clone()),
        (Term::Str(a), Term::Str(b)) => (a == b).then(|| subst.clone()),
        (Term::Nil, Term::Nil) => Some(subst.clone()),

        (Term::Compound(f, args1), Term::Compound(g, args2)) => {
            if f != g || args1.len() != args2.len() {
                return None;
            }
            let mut subst = subst.clone();
            for (a, b) in args1.iter().zip(args2.iter()) {
                subst = unify_in(a, b, &subst, occurs_check)?;
            }
            Some(subst)
        }

        (Term::Cons(h1, t1), Term::Cons(h2, t2)) => {
            let subst = unify_in(h1, h2, subst, occurs_check)?;
            unify_in(t1, t2, &subst, occurs_check)
        }

        _ => None,
    }
}

fn bind(var: &Var, term: &Term, subst: &Subst, occurs_check: bool) -> Option<Subst> {
    if occurs_check && occurs(var, term, subst) {
        None
    } else {
        Some(subst.extend(var.clone(), term.clone()))
    }
}

/// Does `var` occur anywhere inside `term`, under `subst`?
pub fn occurs(var: &Var, term: &Term, subst: &Subst) -> bool {
    match subst.walk(term) {
        Term::Var(v) => &v == var,
        Term::Compound(_, args) => args.iter().any(|a| occurs(var, a, subst)),
        Term::Cons(head, tail) => occurs(var, &head, subst) || occurs(var, &tail, subst),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(args: Vec<Term>) -> Term {
        Term::compound("f", args)
    }

    #[test]
    fn test_reflexivity_no_spurious_bindings() {
        let s = Subst::new();
        for t in [
            Term::atom("a"),
            Term::Int(3),
            Term::Str("s".into()),
            Term::Nil,
            Term::Var(Var::named("X")),
            f(vec![Term::Int(1), Term::atom("b")]),
            Term::list(vec![Term::Int(1), Term::Int(2)]),
        ] {
            let out = unify(&t, &t, &s).expect("reflexive unification must succeed");
            assert_eq!(out.len(), s.len(), "no bindings added for {}", t);
        }
    }

    #[test]
    fn test_compound_binds_arguments() {
        let a = Var::named("A");
        let b = Var::named("B");
        let s = unify(
            &f(vec![Term::Var(a.clone()), Term::Var(b.clone())]),
            &f(vec![Term::Int(1), Term::Int(2)]),
            &Subst::new(),
        )
        .unwrap();
        assert_eq!(s.walk(&Term::Var(a)), Term::Int(1));
        assert_eq!(s.walk(&Term::Var(b)), Term::Int(2));
    }

    #[test]
    fn test_functor_mismatch_is_absolute() {
        let a = Var::named("A");
        let s = unify(
            &Term::compound("f", vec![Term::Var(a.clone())]),
            &Term::compound("g", vec![Term::Var(a)]),
            &Subst::new(),
        );
        assert!(s.is_none());
    }

    #[test]
    fn test_arity_mismatch_fails() {
        let s = unify(
            &f(vec![Term::Int(1)]),
            &f(vec![Term::Int(1), Term::Int(2)]),
            &Subst::new(),
        );
        assert!(s.is_none());
    }

    #[test]
    fn test_symmetry() {
        let x = Var::named("X");
        let pairs = [
            (Term::Var(x.clone()), Term::Int(1)),
            (f(vec![Term::Var(x.clone())]), f(vec![Term::atom("a")])),
            (Term::atom("a"), Term::atom("b")),
            (Term::Int(1), Term::Int(2)),
        ];
        for (t1, t2) in pairs {
            let s = Subst::new();
            let fwd = unify(&t1, &t2, &s);
            let bwd = unify(&t2, &t1, &s);
            assert_eq!(fwd.is_some(), bwd.is_some());
            if let (Some(fwd), Some(bwd)) = (fwd, bwd) {
                assert_eq!(fwd.resolve(&t1), bwd.resolve(&t1));
                assert_eq!(fwd.resolve(&t2), bwd.resolve(&t2));
            }
        }
    }

    #[test]
    fn test_var_aliasing() {
        let x = Var::named("X");
        let y = Var::named("Y");
        let s = unify(&Term::Var(x.clone()), &Term::Var(y.clone()), &Subst::new()).unwrap();
        let s = unify(&Term::Var(x.clone()), &Term::Int(5), &s).unwrap();
        assert_eq!(s.walk(&Term::Var(y)), Term::Int(5));
        assert_eq!(s.walk(&Term::Var(x)), Term::Int(5));
    }

    #[test]
    fn test_failure_leaves_original_untouched() {
        let x = Var::named("X");
        let s0 = Subst::new();
        let out = unify(
            &f(vec![Term::Var(x.clone()), Term::atom("a")]),
            &f(vec![Term::Int(1), Term::atom("b")]),
            &s0,
        );
        assert!(out.is_none());
        assert!(s0.lookup(&x).is_none());
    }

    #[test]
    fn test_occurs_check_is_opt_in() {
        let x = Var::named("X");
        let cyclic = f(vec![Term::Var(x.clone())]);
        // Default mode binds unconditionally.
        assert!(unify(&Term::Var(x.clone()), &cyclic, &Subst::new()).is_some());
        // The checked variant refuses.
        assert!(unify_occurs(&Term::Var(x), &cyclic, &Subst::new()).is_none());
    }

    #[test]
    fn test_cons_threads_bindings() {
        let h = Var::named("H");
        let t = Var::named("T");
        let s = unify(
            &Term::cons(Term::Var(h.clone()), Term::Var(t.clone())),
            &Term::list(vec![Term::Int(1), Term::Int(2)]),
            &Subst::new(),
        )
        .unwrap();
        assert_eq!(s.walk(&Term::Var(h)), Term::Int(1));
        assert_eq!(s.resolve(&Term::Var(t)).to_string(), "[2]");
    }
}
