//! # State-Transition Engine Module
//!
//! Builds the handful of primitives that turn a rule database and a
//! resolver into an actual game: the initial truth state, the successor of
//! a truth state under a joint move, the canonical role order, and the
//! cache-aware replay of a full truth history from a move history (§4.7).

use std::collections::HashSet;

use log::debug;

use crate::database::GameRecord;
use crate::error::EngineError;
use crate::model::{MoveVector, TruthHistory, TruthHistoryEntry, TruthState};
use crate::resolver;
use crate::term::Term;

/// The role terms in the order `role/1` facts are resolved in — the order
/// every [`MoveVector`] in this game is implicitly indexed by (§4.7,
/// "canonical role order"). Determined by solving `role(R)` once; the
/// database's installation order and the resolver's left-to-right clause
/// order make this deterministic across calls for the same game record.
pub fn canonical_roles(record: &std::sync::Arc<GameRecord>) -> Vec<Term> {
    let empty_truth = TruthState::new();
    let empty_moves = MoveVector::new();
    let role = record.well_known.role;
    let var = Term::Var(crate::term::VarId(u32::MAX));
    let goal = Term::Compound(role, vec![var.clone()]);
    resolver::solve(record.clone(), &empty_truth, &empty_moves, goal)
        .filter_map(Result::ok)
        .map(|bindings| bindings.resolve(&var))
        .collect()
}

/// The truth state that holds at the start of the game: every ground
/// answer to `init(F)`, with `F` as the fact (§4.7).
pub fn initial_state(record: &std::sync::Arc<GameRecord>) -> TruthState {
    let empty_truth = TruthState::new();
    let empty_moves = MoveVector::new();
    let init = record.well_known.init;
    let var = Term::Var(crate::term::VarId(u32::MAX));
    let goal = Term::Compound(init, vec![var.clone()]);
    resolver::solve(record.clone(), &empty_truth, &empty_moves, goal)
        .filter_map(Result::ok)
        .map(|bindings| bindings.resolve(&var))
        .collect()
}

/// True iff `truth` is a terminal position: `terminal` has at least one
/// proof against it.
pub fn is_terminal(record: &std::sync::Arc<GameRecord>, truth: &TruthState) -> bool {
    let empty_moves = MoveVector::new();
    let terminal = record.well_known.terminal;
    let goal = Term::Atom(terminal);
    resolver::solve(record.clone(), truth, &empty_moves, goal)
        .next()
        .is_some_and(Result::is_ok)
}

/// Every legal move for `role` at `truth`, via `legal(role, A)`.
pub fn legal_moves(
    record: &std::sync::Arc<GameRecord>,
    truth: &TruthState,
    role: &Term,
) -> Result<Vec<Term>, EngineError> {
    let empty_moves = MoveVector::new();
    let legal = record.well_known.legal;
    let action = Term::Var(crate::term::VarId(u32::MAX - 1));
    let goal = Term::Compound(legal, vec![role.clone(), action.clone()]);
    let mut actions = Vec::new();
    for result in resolver::solve(record.clone(), truth, &empty_moves, goal) {
        actions.push(result?.resolve(&action));
    }
    Ok(actions)
}

/// Checks that `moves` has exactly one move per role, in canonical role
/// order, and that each is legal at `truth`. Returns the verified joint
/// move unchanged on success.
pub fn verify_moves(
    record: &std::sync::Arc<GameRecord>,
    truth: &TruthState,
    roles: &[Term],
    moves: &MoveVector,
) -> Result<(), EngineError> {
    if moves.len() != roles.len() {
        return Err(EngineError::RoleMismatch {
            expected: roles.iter().map(|r| format!("{}", r.display(&record.symbols))).collect(),
            got: moves.iter().map(|mv| format!("{}", mv.display(&record.symbols))).collect(),
        });
    }
    for (role, mv) in roles.iter().zip(moves.iter()) {
        let legal = legal_moves(record, truth, role)?;
        let action = extract_action(record, mv);
        if !legal.contains(&action) {
            return Err(EngineError::IllegalMove {
                role: format!("{}", role.display(&record.symbols)),
                action: format!("{}", action.display(&record.symbols)),
            });
        }
    }
    Ok(())
}

fn extract_action(record: &std::sync::Arc<GameRecord>, mv: &Term) -> Term {
    match mv {
        Term::Compound(s, args) if *s == record.well_known.does && args.len() == 2 => args[1].clone(),
        other => other.clone(),
    }
}

/// Computes the successor truth state after `moves` is played at `truth`,
/// verifying legality first (§4.7: "a transition must reject an illegal
/// move rather than silently compute a bogus successor").
pub fn successor(
    record: &std::sync::Arc<GameRecord>,
    truth: &TruthState,
    roles: &[Term],
    moves: &MoveVector,
) -> Result<TruthState, EngineError> {
    verify_moves(record, truth, roles, moves)?;
    let next = record.well_known.next;
    let var = Term::Var(crate::term::VarId(u32::MAX - 2));
    let goal = Term::Compound(next, vec![var.clone()]);
    let mut successor_state = HashSet::new();
    for result in resolver::solve(record.clone(), truth, moves, goal) {
        successor_state.insert(result?.resolve(&var));
    }
    Ok(successor_state)
}

/// `goal(role, utility)` answers for `role` at a terminal `truth`. Callers
/// are expected to have already checked [`is_terminal`]; a non-terminal
/// position may simply have no `goal/2` proof, which this reports as an
/// empty vector rather than an error.
pub fn goal_values(
    record: &std::sync::Arc<GameRecord>,
    truth: &TruthState,
    role: &Term,
) -> Result<Vec<Term>, EngineError> {
    let empty_moves = MoveVector::new();
    let goal_pred = record.well_known.goal;
    let utility = Term::Var(crate::term::VarId(u32::MAX - 3));
    let goal = Term::Compound(goal_pred, vec![role.clone(), utility.clone()]);
    let mut values = Vec::new();
    for result in resolver::solve(record.clone(), truth, &empty_moves, goal) {
        values.push(result?.resolve(&utility));
    }
    Ok(values)
}

/// Recomputes a [`TruthHistory`] from a move history, reusing as much of
/// `previous` as still applies (§4.7's cache-reuse requirement: "never
/// silently trust a cache on move mismatch"). `previous` is newest-first,
/// same as the type it returns; internally this walks both from the
/// oldest end, since that's where a shared prefix necessarily starts.
pub fn truth_history(
    record: &std::sync::Arc<GameRecord>,
    roles: &[Term],
    moves: &crate::model::MoveHistory,
    previous: &TruthHistory,
) -> Result<TruthHistory, EngineError> {
    let mut previous_oldest_first = previous.to_vec();
    previous_oldest_first.reverse();

    // `prefix_reusable` tracks whether position 0..index has matched the
    // cache so far. Per §4.7 an entry is only reusable if it's the i-th
    // entry in both histories, its move agrees, *and* the (i-1)-th entry
    // was itself reusable — a later position's move happening to coincide
    // with the cache is not enough once an earlier position diverged,
    // since the cached state there was derived from a different prior
    // state than the one this recomputation actually reached.
    let mut prefix_reusable = previous_oldest_first
        .first()
        .is_some_and(|entry| entry.moves.is_none());

    let mut rebuilt = vec![TruthHistoryEntry {
        moves: None,
        state: if prefix_reusable {
            previous_oldest_first[0].state.clone()
        } else {
            initial_state(record)
        },
    }];

    for (index, move_vector) in moves.iter().enumerate() {
        let cached = previous_oldest_first.get(index + 1);
        let reusable = prefix_reusable
            && cached.is_some_and(|entry| entry.moves.as_ref() == Some(move_vector));
        prefix_reusable = reusable;
        let state = if reusable {
            debug!("truth_history: reusing cached state at position {index}");
            cached.unwrap().state.clone()
        } else {
            debug!("truth_history: recomputing state at position {index}");
            let prior_state = &rebuilt[index].state;
            successor(record, prior_state, roles, move_vector)?
        };
        rebuilt.push(TruthHistoryEntry {
            moves: Some(move_vector.clone()),
            state,
        });
    }

    rebuilt.reverse();
    Ok(rebuilt)
}
