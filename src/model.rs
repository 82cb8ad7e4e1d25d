//! # Data Models Module
//!
//! Centralized definitions for the value types threaded through the rest of
//! the crate. Kept separate from the types that need behavior (`Term`,
//! `Clause`, ...) so that a reader can see the engine's vocabulary in one
//! place.

use std::collections::HashSet;

use crate::term::Term;

/* PRIMARY TYPES */

/// Uniquely identifies an installed game. Re-installing a game under an
/// existing id overwrites its record atomically; see [`crate::database`].
pub type GameId = String;

/// A ground term asserted as true in some position. Truth states are sets
/// of these (§3: "the representation must deduplicate").
pub type Fact = Term;

/// The set of facts true at some position in the game. Two truth states are
/// equal iff they hold the same facts, irrespective of insertion order.
pub type TruthState = HashSet<Fact>;

/// A single role's chosen action for one turn: `does(Role, Action)`.
pub type Move = Term;

/// A joint move, one per role, ordered according to the game's canonical
/// role order (the order in which `role/1` facts were discovered; see
/// [`crate::transition::canonical_roles`]).
pub type MoveVector = Vec<Move>;

/// A finite sequence of move vectors, oldest first.
pub type MoveHistory = Vec<MoveVector>;

/// One entry of a [`TruthHistory`]: the move vector that produced this
/// truth state, or `None` for the sentinel initial entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthHistoryEntry {
    pub moves: Option<MoveVector>,
    pub state: TruthState,
}

/// A playthrough's trajectory, stored newest-first so the most recent truth
/// state is always `history[0]` (§4.7).
pub type TruthHistory = Vec<TruthHistoryEntry>;
