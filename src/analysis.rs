//! # Dependency Analyser Module
//!
//! Computes the state-dependent predicate set (SDP): every `(functor,
//! arity)` whose truth can vary across positions of the same game, as
//! opposed to a predicate like `role/1` whose extension is fixed for the
//! game's lifetime (§4.3). The rewriter (`crate::rewrite`) consults this
//! set to decide which clauses need to be threaded through the truth
//! state and which can stay ordinary static clauses.

use std::collections::HashSet;

use log::{debug, trace};

use crate::term::{Clause, Symbol, Term, WellKnown};

/// A `(functor, arity)` pair naming a predicate, independent of any
/// particular clause's argument bindings.
pub type Predicate = (Symbol, usize);

/// Computes the SDP for a rule-set by fixpoint iteration, seeded with
/// `true/1` and `does/2` (§9: both historical seed variants are included
/// unconditionally) and growing to cover every predicate defined, directly
/// or transitively, in terms of a predicate already in the set.
///
/// A clause's head predicate joins the SDP if any literal in its body
/// names a predicate already in the SDP, or compound-transitively embeds
/// one as an argument at any depth — §4.3 is explicit that nesting counts,
/// not just the `,`/2, `or`/2, and `not`/1 connectives the rewriter walks.
/// The loop repeats until a pass adds nothing.
pub fn state_dependent_predicates(clauses: &[Clause], well_known: &WellKnown) -> HashSet<Predicate> {
    let mut sdp: HashSet<Predicate> = HashSet::new();
    sdp.insert((well_known.true_, 1));
    sdp.insert((well_known.does, 2));

    loop {
        let mut added = false;
        for clause in clauses {
            let Some(head_pred) = clause.head.functor() else {
                continue;
            };
            if sdp.contains(&head_pred) {
                continue;
            }
            let depends_on_sdp = clause
                .body
                .iter()
                .any(|literal| literal_touches_sdp(literal, &sdp, well_known));
            if depends_on_sdp {
                trace!(
                    "analysis: {:?} joins SDP via a body literal",
                    head_pred
                );
                sdp.insert(head_pred);
                added = true;
            }
        }
        if !added {
            break;
        }
        debug!("analysis: fixpoint pass added predicates, SDP now has {} members", sdp.len());
    }

    sdp
}

/// Does `term`, or anything reachable from it by descending through
/// compound arguments, name a predicate already in `sdp`? Per §4.3 this
/// is not limited to the `,`/`or`/`not` connectives the rewriter also
/// walks — "terms embedded inside compounds count, because GDL permits
/// nesting" — so a dependency buried inside an arbitrary compound's
/// argument (not just a conjunction/disjunction/negation) still makes the
/// enclosing clause's head state-dependent. Variables and integers carry
/// no functor and so never contribute (§4.3, last paragraph).
fn literal_touches_sdp(term: &Term, sdp: &HashSet<Predicate>, well_known: &WellKnown) -> bool {
    match term {
        Term::Compound(s, args) => {
            sdp.contains(&(*s, args.len())) || args.iter().any(|a| literal_touches_sdp(a, sdp, well_known))
        }
        Term::Atom(s) => sdp.contains(&(*s, 0)),
        Term::Var(_) | Term::Int(_) => false,
    }
}
