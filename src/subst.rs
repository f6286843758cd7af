//! Persistent substitutions and fresh-variable plumbing.
//!
//! A `Subst` maps variable identities to terms. It is persistent: `extend`
//! returns a new handle and leaves the old one untouched, so every choice
//! point can hold on to its substitution for free and backtracking never
//! needs an undo log.

use std::collections::HashMap;

use crate::term::{Term, Var};

/// An immutable mapping from variables to bound terms.
#[derive(Debug, Clone, Default)]
pub struct Subst {
    bindings: im::HashMap<Var, Term>,
}

impl Subst {
    /// Create an empty substitution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Get the binding for a variable, or None if unbound.
    pub fn lookup(&self, var: &Var) -> Option<&Term> {
        self.bindings.get(var)
    }

    /// Extend with a new binding. The receiver is unchanged; the returned
    /// substitution shares structure with it.
    pub fn extend(&self, var: Var, term: Term) -> Subst {
        Subst {
            bindings: self.bindings.update(var, term),
        }
    }

    /// Dereference a term one level deep: follow variable bindings until
    /// reaching an unbound variable or a non-variable term.
    ///
    /// Every inspection of a term's shape must go through here first;
    /// comparing terms without walking them is never meaningful during
    /// resolution. Variable-to-variable chains always point toward older
    /// variables (see `unify`), so this loop terminates.
    pub fn walk(&self, term: &Term) -> Term {
        let mut current = term;
        while let Term::Var(v) = current {
            match self.bindings.get(v) {
                Some(bound) => current = bound,
                None => break,
            }
        }
        current.clone()
    }

    /// Fully instantiate a term under this substitution, descending into
    /// compound terms and list cells. Unbound variables remain as they are.
    ///
    /// List spines are rebuilt iteratively so resolving a long list does not
    /// recurse per element.
    pub fn resolve(&self, term: &Term) -> Term {
        match self.walk(term) {
            Term::Compound(functor, args) => {
                let resolved = args.iter().map(|a| self.resolve(a)).collect();
                Term::Compound(functor, std::rc::Rc::new(resolved))
            }
            cell @ Term::Cons(_, _) => {
                let mut items = Vec::new();
                let mut current = cell;
                loop {
                    match current {
                        Term::Cons(head, tail) => {
                            items.push(self.resolve(&head));
                            current = self.walk(&tail);
                        }
                        Term::Nil => return Term::list_with_tail(items, Term::Nil),
                        other => {
                            let tail = self.resolve_shallow(other);
                            return Term::list_with_tail(items, tail);
                        }
                    }
                }
            }
            other => other,
        }
    }

    fn resolve_shallow(&self, term: Term) -> Term {
        match term {
            Term::Compound(_, _) => self.resolve(&term),
            other => other,
        }
    }
}

/// Rename a clause for one activation: every variable occurrence is replaced
/// by a freshly minted variable, consistently within this single renaming
/// (same source variable, same fresh variable).
pub fn rename_clause(head: &Term, body: &[Term]) -> (Term, Vec<Term>) {
    let mut memo = HashMap::new();
    let fresh_head = rename_term(head, &mut memo);
    let fresh_body = body.iter().map(|g| rename_term(g, &mut memo)).collect();
    (fresh_head, fresh_body)
}

fn rename_term(term: &Term, memo: &mut HashMap<Var, Var>) -> Term {
    match term {
        Term::Var(v) => {
            let fresh = memo.entry(v.clone()).or_insert_with(|| match v.name() {
                Some(name) => Var::named(name),
                None => Var::fresh(),
            });
            Term::Var(fresh.clone())
        }
        Term::Compound(functor, args) => {
            let fresh_args = args.iter().map(|a| rename_term(a, memo)).collect();
            Term::Compound(functor.clone(), std::rc::Rc::new(fresh_args))
        }
        Term::Cons(head, tail) => {
            Term::cons(rename_term(head, memo), rename_term(tail, memo))
        }
        ground => ground.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_is_persistent() {
        let x = Var::named("X");
        let empty = Subst::new();
        let bound = empty.extend(x.clone(), Term::Int(1));
        assert!(empty.lookup(&x).is_none());
        assert_eq!(bound.lookup(&x), Some(&Term::Int(1)));
    }

    #[test]
    fn test_walk_follows_chains() {
        let x = Var::named("X");
        let y = Var::named("Y");
        let s = Subst::new()
            .extend(y.clone(), Term::Var(x.clone()))
            .extend(x.clone(), Term::Int(42));
        assert_eq!(s.walk(&Term::Var(y)), Term::Int(42));
    }

    #[test]
    fn test_walk_stops_at_unbound() {
        let x = Var::named("X");
        let y = Var::named("Y");
        let s = Subst::new().extend(y.clone(), Term::Var(x.clone()));
        assert_eq!(s.walk(&Term::Var(y)), Term::Var(x));
    }

    #[test]
    fn test_resolve_descends() {
        let x = Var::named("X");
        let s = Subst::new().extend(x.clone(), Term::Int(7));
        let t = Term::compound("f", vec![Term::Var(x), Term::atom("a")]);
        assert_eq!(
            s.resolve(&t),
            Term::compound("f", vec![Term::Int(7), Term::atom("a")])
        );
    }

    #[test]
    fn test_resolve_list_spine() {
        let x = Var::named("X");
        let t = Term::list(vec![Term::Int(1), Term::Var(x.clone()), Term::Int(3)]);
        let s = Subst::new().extend(x, Term::Int(2));
        assert_eq!(s.resolve(&t).to_string(), "[1, 2, 3]");
    }

    #[test]
    fn test_rename_is_consistent() {
        let x = Var::named("X");
        let head = Term::compound("p", vec![Term::Var(x.clone()), Term::Var(x.clone())]);
        let body = vec![Term::compound("q", vec![Term::Var(x.clone())])];
        let (fresh_head, fresh_body) = rename_clause(&head, &body);

        let (a, b) = match &fresh_head {
            Term::Compound(_, args) => (args[0].clone(), args[1].clone()),
            _ => panic!("expected compound"),
        };
        // Same source variable maps to the same fresh variable...
        assert_eq!(a, b);
        assert_eq!(fresh_body[0].args()[0], a);
        // ...but never to the original.
        assert_ne!(a, Term::Var(x));
    }

    #[test]
    fn test_rename_distinct_vars_stay_distinct() {
        let x = Var::named("X");
        let y = Var::named("Y");
        let head = Term::compound("p", vec![Term::Var(x), Term::Var(y)]);
        let (fresh_head, _) = rename_clause(&head, &[]);
        let args = fresh_head.args();
        assert_ne!(args[0], args[1]);
    }
}
