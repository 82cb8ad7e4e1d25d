//! # Rule Database Module
//!
//! Holds the per-game installed rule-sets the resolver queries against.
//! Games are installed atomically: a `GameRecord` is built in full off to
//! the side (clauses split into facts/rules, dependency-analysed,
//! stateified) and only then published into the table under its id,
//! replacing any previous record in one swap. Readers never observe a
//! half-installed game (§4.5).
//!
//! The publish step is the same copy-on-write swap `gamesman-nova` itself
//! doesn't need (its game catalogue is static, compiled in) but its
//! `solver::db` module gestures at for persistent records — here it's load
//! bearing, since `create_game` can be called again for an id that is
//! already live and being queried.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::info;

use crate::analysis::{state_dependent_predicates, Predicate};
use crate::error::EngineError;
use crate::model::GameId;
use crate::rewrite::stateify_clause;
use crate::term::{Clause, Symbols, WellKnown};

/// Everything the resolver and transition engine need to evaluate queries
/// against one installed game. Immutable once built — a re-install
/// produces a new `GameRecord` rather than mutating this one, so an
/// in-flight query holding an `Arc` clone never sees a torn state.
pub struct GameRecord {
    pub game_id: GameId,
    pub symbols: Symbols,
    pub well_known: WellKnown,
    pub sdp: std::collections::HashSet<Predicate>,
    /// Stateified clauses whose original head predicate is in the SDP,
    /// indexed by that *original* `(functor, arity)` — not by the
    /// `state_dynamic` wrapper they all now share, which would collapse
    /// every dynamic predicate into one bucket.
    pub dynamic_clauses: HashMap<Predicate, Vec<Clause>>,
    /// Clauses whose head predicate is not in the SDP, indexed the same
    /// way. Bodies are still rewritten (a static clause can still consult
    /// `does/2` or an SDP predicate; `legal/2`'s defining clauses do
    /// exactly that).
    pub static_clauses: HashMap<Predicate, Vec<Clause>>,
}

impl GameRecord {
    /// Builds a fully analysed and rewritten record from raw installed
    /// clauses. Does not publish it into any [`Database`] — that's a
    /// separate step so installation failures never touch the live table.
    pub fn build(
        game_id: GameId,
        clauses: Vec<Clause>,
        symbols: Symbols,
        well_known: WellKnown,
    ) -> GameRecord {
        let sdp = state_dependent_predicates(&clauses, &well_known);
        let mut dynamic_clauses: HashMap<Predicate, Vec<Clause>> = HashMap::new();
        let mut static_clauses: HashMap<Predicate, Vec<Clause>> = HashMap::new();

        for clause in &clauses {
            let Some(pred) = clause.head.functor() else {
                continue;
            };
            let rewritten = stateify_clause(clause, &sdp, &well_known);
            if sdp.contains(&pred) {
                dynamic_clauses.entry(pred).or_default().push(rewritten);
            } else {
                static_clauses.entry(pred).or_default().push(rewritten);
            }
        }

        GameRecord {
            game_id,
            symbols,
            well_known,
            sdp,
            dynamic_clauses,
            static_clauses,
        }
    }

    /// All clauses — dynamic and static — whose original head predicate is
    /// `pred`, in installation order. Installation order matters: the
    /// resolver tries alternatives in this order (§4.6, "Prolog's
    /// left-to-right, depth-first order").
    pub fn clauses_for(&self, pred: Predicate) -> &[Clause] {
        self.dynamic_clauses
            .get(&pred)
            .or_else(|| self.static_clauses.get(&pred))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The live table of installed games, keyed by id. Shared by `Arc` between
/// every [`crate::engine::Engine`] clone and every in-flight query.
#[derive(Default)]
pub struct Database {
    games: RwLock<HashMap<GameId, Arc<GameRecord>>>,
}

impl Database {
    pub fn new() -> Self {
        Database::default()
    }

    /// Publishes `record`, replacing whatever was previously installed
    /// under `record.game_id`. Queries already holding an `Arc` to the
    /// previous record keep running against it to completion.
    pub fn install(&self, record: GameRecord) -> Result<Arc<GameRecord>, EngineError> {
        let game_id = record.game_id.clone();
        let record = Arc::new(record);
        self.games
            .write()
            .map_err(|_| EngineError::Internal("game database lock poisoned".into()))?
            .insert(game_id.clone(), record.clone());
        info!("installed game `{game_id}`");
        Ok(record)
    }

    pub fn get(&self, game_id: &str) -> Result<Option<Arc<GameRecord>>, EngineError> {
        Ok(self
            .games
            .read()
            .map_err(|_| EngineError::Internal("game database lock poisoned".into()))?
            .get(game_id)
            .cloned())
    }

    pub fn known_game_ids(&self) -> Result<Vec<GameId>, EngineError> {
        Ok(self
            .games
            .read()
            .map_err(|_| EngineError::Internal("game database lock poisoned".into()))?
            .keys()
            .cloned()
            .collect())
    }
}
