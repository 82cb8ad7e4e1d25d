//! # Rule Rewriter ("Stateifier") Module
//!
//! Transforms a clause written against the declarative `true/1`/`does/2`
//! vocabulary into one the resolver can evaluate against an explicit truth
//! state and move vector, without having to special-case those two
//! predicates at every resolution step (§4.4).
//!
//! The transformation is purely syntactic and is applied once, when a game
//! is installed (`crate::database`), not per query:
//!
//! - A body literal `does(R, A)` becomes `member(does(R, A), $moves)` — the
//!   resolver dispatches `member/2` against whatever move vector is in
//!   scope for the current resolution ([`crate::builtins::member_alternatives`]).
//! - Any other body literal naming a predicate in the state-dependent
//!   predicate set (including `true/1` itself) is wrapped as
//!   `state($game, $truth, Literal)` — a marker the resolver recognizes
//!   and answers out of the ambient truth state rather than the clause
//!   database.
//! - A clause whose *head* names an SDP predicate has its head wrapped as
//!   `state_dynamic($game, $truth, $moves, Head)`, so installed dynamic
//!   clauses can be told apart from static ones sharing the same
//!   `(functor, arity)` by construction, not by a runtime flag.
//! - The rewrite recurses through `,`/2, `or/2`, and `not/1` — the same
//!   three connectives `crate::analysis` looks inside — so a dependency
//!   nested under a disjunction or negation is still reached. It does not
//!   recurse into the arguments of an arbitrary compound; those are data,
//!   not sub-goals.
//!
//! `$game`, `$truth`, and `$moves` are plain atoms ([`crate::term::WellKnown`]
//! `game_marker`/`truth_marker`/`moves_marker`) — the resolver never
//! unifies against their identity, it always substitutes its own ambient
//! game id, truth state, and move vector when it sees one. They exist so
//! the rewritten term shape matches spec's description of a three- or
//! four-argument wrapper literally, which is useful for tests and error
//! messages, without forcing `Term` to carry a `HashSet`/`Vec` variant just
//! to pass this context through.

use std::collections::HashSet;

use crate::analysis::Predicate;
use crate::term::{Clause, Term, WellKnown};

/// Rewrites one clause per the rules above. `sdp` is the full
/// state-dependent predicate set for the game this clause belongs to,
/// already computed by [`crate::analysis::state_dependent_predicates`].
pub fn stateify_clause(clause: &Clause, sdp: &HashSet<Predicate>, well_known: &WellKnown) -> Clause {
    let body = clause
        .body
        .iter()
        .map(|literal| stateify_literal(literal, sdp, well_known))
        .collect();

    let head = match clause.head.functor() {
        Some(pred) if sdp.contains(&pred) => Term::Compound(
            well_known.state_dynamic,
            vec![
                marker(well_known.game_marker),
                marker(well_known.truth_marker),
                marker(well_known.moves_marker),
                clause.head.clone(),
            ],
        ),
        _ => clause.head.clone(),
    };

    Clause { head, body }
}

fn marker(symbol: crate::term::Symbol) -> Term {
    Term::Atom(symbol)
}

fn stateify_literal(term: &Term, sdp: &HashSet<Predicate>, well_known: &WellKnown) -> Term {
    match term {
        Term::Compound(s, args) if *s == well_known.conj && args.len() == 2 => Term::Compound(
            well_known.conj,
            vec![
                stateify_literal(&args[0], sdp, well_known),
                stateify_literal(&args[1], sdp, well_known),
            ],
        ),
        Term::Compound(s, args) if *s == well_known.or && args.len() == 2 => Term::Compound(
            well_known.or,
            vec![
                stateify_literal(&args[0], sdp, well_known),
                stateify_literal(&args[1], sdp, well_known),
            ],
        ),
        Term::Compound(s, args) if *s == well_known.not && args.len() == 1 => {
            Term::Compound(well_known.not, vec![stateify_literal(&args[0], sdp, well_known)])
        }
        Term::Compound(s, _) if *s == well_known.does => Term::Compound(
            well_known.member,
            vec![term.clone(), marker(well_known.moves_marker)],
        ),
        other => match other.functor() {
            Some(pred) if sdp.contains(&pred) => Term::Compound(
                well_known.state,
                vec![marker(well_known.game_marker), marker(well_known.truth_marker), other.clone()],
            ),
            _ => other.clone(),
        },
    }
}
