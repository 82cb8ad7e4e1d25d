//! # Built-ins Module
//!
//! The fixed catalogue of predicates the resolver understands natively
//! rather than by looking up installed clauses (§4.2): `distinct/2`,
//! `member/2`, and the aggregates `findall/3`, `setof/3`, `bagof/3`.
//! `or/2` and `not/1` are also built in, but the resolver recognizes both
//! directly by term shape before ever consulting this module — they have
//! no [`Builtin`] variant of their own. Only the pieces that don't need a
//! recursive sub-proof live here — `member/2` and `distinct/2` are pure
//! functions of their arguments and the current bindings. The aggregates
//! need to drive the resolver over a sub-goal, so [`crate::resolver`] owns
//! their control flow and calls back into the pure helpers here (the
//! ground checks, the list walk, the dedup/sort) to do the actual work.

use crate::error::EngineError;
use crate::term::{unify, Bindings, Symbol, Term, WellKnown};

/// Which built-in, if any, a `(functor, arity)` pair names. Anything not
/// listed here is an ordinary user predicate, resolved against installed
/// clauses. Does not cover `or/2` or `not/1` — the resolver intercepts
/// those two shapes itself, ahead of this classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Distinct,
    Member,
    Findall,
    Setof,
    Bagof,
}

/// Classifies `(functor, arity)` as a built-in, or returns `None` if it
/// names an ordinary predicate.
pub fn classify(well_known: &WellKnown, functor: Symbol, arity: usize) -> Option<Builtin> {
    match (functor, arity) {
        (f, 2) if f == well_known.distinct => Some(Builtin::Distinct),
        (f, 2) if f == well_known.member => Some(Builtin::Member),
        (f, 3) if f == well_known.findall => Some(Builtin::Findall),
        (f, 3) if f == well_known.setof => Some(Builtin::Setof),
        (f, 3) if f == well_known.bagof => Some(Builtin::Bagof),
        _ => None,
    }
}

/// Evaluates `distinct(a, b)` under `bindings`. Both arguments must be
/// fully ground once walked through `bindings` — distinct is a
/// non-relational test, not a constraint to be delayed, matching the
/// naive "evaluate left to right" contract spec §4.2 assumes of a
/// stateified rule body. Returns `Ok(true)` if the two terms differ.
pub fn distinct(a: &Term, b: &Term, bindings: &Bindings, symbols: &crate::term::Symbols) -> Result<bool, EngineError> {
    let ra = bindings.resolve(a);
    let rb = bindings.resolve(b);
    if !ra.is_ground() || !rb.is_ground() {
        return Err(EngineError::UnboundInDistinct {
            goal: format!("{}, {}", ra.display(symbols), rb.display(symbols)),
        });
    }
    Ok(ra != rb)
}

/// Enumerates every binding extension that unifies `element` with one item
/// of `list`, in list order — `member/2`'s one-solution-per-element
/// backtracking behavior. `list` must be a proper (possibly partial, i.e.
/// containing unbound tails) GDL list spine; a non-list term yields no
/// alternatives.
pub fn member_alternatives(
    element: &Term,
    list: &Term,
    well_known: &WellKnown,
    bindings: &Bindings,
) -> Vec<Bindings> {
    let mut alternatives = Vec::new();
    let mut cur = bindings.walk(list);
    loop {
        match cur {
            Term::Compound(s, ref args) if s == well_known.cons && args.len() == 2 => {
                if let Some(extended) = unify(element, &args[0], bindings) {
                    alternatives.push(extended);
                }
                cur = bindings.walk(&args[1]);
            }
            _ => break,
        }
    }
    alternatives
}

/// Checks that `goal`, once walked through `bindings`, is fully ground —
/// the precondition negation-as-failure needs to be sound. Callers supply
/// the already-resolved goal text for the error message.
pub fn require_ground(goal: &Term, bindings: &Bindings) -> bool {
    bindings.resolve(goal).is_ground()
}

/// Sorts and deduplicates `terms` into the canonical order `setof/3`
/// reports its answer set in. `Term` derives `Ord` structurally
/// (functor, then arguments) purely so this has a well-defined,
/// reproducible order — the relation has no meaning beyond that.
pub fn sort_dedup(mut terms: Vec<Term>) -> Vec<Term> {
    terms.sort();
    terms.dedup();
    terms
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::{Symbols, VarId};

    fn fixture() -> (Symbols, WellKnown) {
        let symbols = Symbols::new();
        let wk = WellKnown::new(&symbols);
        (symbols, wk)
    }

    #[test]
    fn distinct_succeeds_for_different_ground_terms() {
        let (symbols, _wk) = fixture();
        let a = Term::atom(&symbols, "x");
        let b = Term::atom(&symbols, "y");
        assert_eq!(distinct(&a, &b, &Bindings::new(), &symbols), Ok(true));
    }

    #[test]
    fn distinct_fails_for_equal_ground_terms() {
        let (symbols, _wk) = fixture();
        let a = Term::atom(&symbols, "x");
        assert_eq!(distinct(&a, &a, &Bindings::new(), &symbols), Ok(false));
    }

    #[test]
    fn distinct_errors_on_unbound_argument() {
        let (symbols, _wk) = fixture();
        let a = Term::Var(VarId(0));
        let b = Term::atom(&symbols, "y");
        assert!(distinct(&a, &b, &Bindings::new(), &symbols).is_err());
    }

    #[test]
    fn member_yields_one_alternative_per_matching_element() {
        let (symbols, wk) = fixture();
        let list = Term::list(
            &wk,
            vec![
                Term::atom(&symbols, "a"),
                Term::atom(&symbols, "b"),
                Term::atom(&symbols, "a"),
            ],
        );
        let x = Term::Var(VarId(0));
        let alts = member_alternatives(&x, &list, &wk, &Bindings::new());
        assert_eq!(alts.len(), 3);
        assert_eq!(alts[0].resolve(&x), Term::atom(&symbols, "a"));
        assert_eq!(alts[1].resolve(&x), Term::atom(&symbols, "b"));
    }

    #[test]
    fn member_on_non_list_yields_nothing() {
        let (symbols, wk) = fixture();
        let not_a_list = Term::atom(&symbols, "atom");
        let x = Term::Var(VarId(0));
        assert!(member_alternatives(&x, &not_a_list, &wk, &Bindings::new()).is_empty());
    }

    #[test]
    fn sort_dedup_removes_duplicates_deterministically() {
        let (symbols, _wk) = fixture();
        let terms = vec![
            Term::atom(&symbols, "b"),
            Term::atom(&symbols, "a"),
            Term::atom(&symbols, "b"),
        ];
        assert_eq!(sort_dedup(terms).len(), 2);
    }
}
