//! # Engine Module
//!
//! The public surface (§6): a value holding its own symbol table and game
//! database, with one method per named external operation. Nothing here
//! does the interesting work — it resolves a `game_id` to a [`GameRecord`],
//! calls into `analysis`/`rewrite`/`resolver`/`transition`, and converts
//! internal failures into the typed [`EngineError`] taxonomy callers match
//! on.
//!
//! Per §9's re-architecture note, the engine is a value rather than a
//! process-wide global: construct one per test, per game server, or share
//! one `Arc<Engine>` across threads — `Database` already supports
//! concurrent snapshot reads (§5).

use std::sync::Arc;
use anyhow::Context;

use crate::database::{Database, GameRecord};
use crate::error::EngineError;
use crate::model::{GameId, MoveHistory, MoveVector, TruthHistory, TruthState};
use crate::resolver::{self, Resolver};
use crate::term::{Bindings, Clause, Symbols, Term, WellKnown};
use crate::transition;

/// A GGP game state engine: a symbol table shared by every installed game,
/// plus the live table of game records (§3, "Game record"). Cheap to
/// construct; cloning an `Engine` shares the same underlying database and
/// symbol table (both are internally `Arc`-backed).
#[derive(Clone)]
pub struct Engine {
    symbols: Symbols,
    well_known: WellKnown,
    database: Arc<Database>,
}

impl Engine {
    pub fn new() -> Self {
        let symbols = Symbols::new();
        let well_known = WellKnown::new(&symbols);
        Engine {
            symbols,
            well_known,
            database: Arc::new(Database::new()),
        }
    }

    /// The symbol table this engine interns atoms into. Callers building
    /// `Term`s to hand to `create_game`/`game_state` use this to intern
    /// their own atoms consistently with the engine's.
    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// `create_game` (§6): analyses and stateifies `rules`, then publishes
    /// them under `game_id`, atomically replacing any prior rule-set
    /// installed under that id (§4.5).
    pub fn create_game(&self, game_id: impl Into<GameId>, rules: Vec<Clause>) -> Result<(), EngineError> {
        let game_id = game_id.into();
        validate_rule_set(&rules, &self.symbols).map_err(|err| EngineError::MalformedClause {
            clause: err.to_string(),
            reason: "rule-set failed installation validation".into(),
        })?;
        let record = GameRecord::build(game_id, rules, self.symbols.clone(), self.well_known.clone());
        self.database.install(record)?;
        Ok(())
    }

    fn record(&self, game_id: &str) -> Result<Arc<GameRecord>, EngineError> {
        match self.database.get(game_id)? {
            Some(record) => Ok(record),
            None => Err(EngineError::unknown_game(game_id, &self.database.known_game_ids()?)),
        }
    }

    /// `game_state` (§6): a lazy answer stream for `query` against
    /// `truth`/`moves` in `game_id`'s installed rule-set. `moves` may be
    /// empty — most queries (`legal`, `terminal`, `goal`) never consult it.
    pub fn game_state<'a>(
        &self,
        game_id: &str,
        truth: &'a TruthState,
        moves: &'a MoveVector,
        query: Term,
    ) -> Result<Resolver<'a>, EngineError> {
        let record = self.record(game_id)?;
        Ok(resolver::solve(record, truth, moves, query))
    }

    /// `truth_history` (§6): the trajectory reached by replaying `moves`
    /// from the initial state, reusing `cached` wherever its prefix still
    /// agrees (§4.7). Returned newest-first.
    pub fn truth_history(
        &self,
        game_id: &str,
        moves: &MoveHistory,
        cached: Option<&TruthHistory>,
    ) -> Result<TruthHistory, EngineError> {
        let record = self.record(game_id)?;
        let roles = transition::canonical_roles(&record);
        let empty = TruthHistory::new();
        transition::truth_history(&record, &roles, moves, cached.unwrap_or(&empty))
    }

    /// `game_truth_state` (§6): the truth state after replaying `moves`
    /// (or the initial state, if `moves` is empty — §8, Invariant 6).
    pub fn game_truth_state(&self, game_id: &str, moves: &MoveHistory) -> Result<TruthState, EngineError> {
        let record = self.record(game_id)?;
        if moves.is_empty() {
            return Ok(transition::initial_state(&record));
        }
        let roles = transition::canonical_roles(&record);
        let history = transition::truth_history(&record, &roles, moves, &TruthHistory::new())?;
        Ok(final_truth_state(&history))
    }

    /// `prepare_moves` (§6): reorders an unordered list of `does(Role,
    /// Action)` moves into the game's canonical role order (§4.7, "Move
    /// preparation"). Fails with [`EngineError::RoleMismatch`] if the
    /// moves' role multiset disagrees with the game's role set.
    pub fn prepare_moves(&self, game_id: &str, moves: &[Term]) -> Result<MoveVector, EngineError> {
        let record = self.record(game_id)?;
        let roles = transition::canonical_roles(&record);
        let mut remaining = moves.to_vec();
        let mut prepared = Vec::with_capacity(roles.len());

        for role in &roles {
            let position = remaining
                .iter()
                .position(|mv| move_role(&record, mv).as_ref() == Some(role));
            match position {
                Some(index) => prepared.push(remaining.remove(index)),
                None => return Err(role_mismatch(&record, &roles, moves)),
            }
        }
        if !remaining.is_empty() {
            return Err(role_mismatch(&record, &roles, moves));
        }
        Ok(prepared)
    }

    /// `legal_prepared_moves` (§6): verifies every move in `moves` is legal
    /// for its role at `truth` (§4.7), without computing a successor.
    pub fn legal_prepared_moves(
        &self,
        game_id: &str,
        truth: &TruthState,
        moves: &MoveVector,
    ) -> Result<(), EngineError> {
        let record = self.record(game_id)?;
        let roles = transition::canonical_roles(&record);
        transition::verify_moves(&record, truth, &roles, moves)
    }

    /// `move_history_game_state` (§6): resolves `query` against the truth
    /// state and final move vector reached by replaying `moves` from the
    /// initial state — the common "where does this playthrough currently
    /// stand" query a search agent issues every turn.
    pub fn move_history_game_state(
        &self,
        game_id: &str,
        moves: &MoveHistory,
        query: Term,
    ) -> Result<Vec<Result<Bindings, EngineError>>, EngineError> {
        let record = self.record(game_id)?;
        let roles = transition::canonical_roles(&record);
        let history = transition::truth_history(&record, &roles, moves, &TruthHistory::new())?;
        let truth = final_truth_state(&history);
        let last_moves = moves.last().cloned().unwrap_or_default();
        Ok(resolver::solve(record, &truth, &last_moves, query).collect())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

/// `final_truth_state` (§6): the newest entry of a [`TruthHistory`] —
/// `history[0]`, since truth histories are stored newest-first (§4.7).
/// The initial (empty) history has no entries; callers only ever pass a
/// history this engine itself produced, which always has at least the
/// sentinel `start` entry, so this never needs to be fallible in practice,
/// but a never-installed/empty history still reports the empty truth state
/// rather than panicking.
pub fn final_truth_state(history: &TruthHistory) -> TruthState {
    history.first().map(|entry| entry.state.clone()).unwrap_or_default()
}

fn move_role(record: &GameRecord, mv: &Term) -> Option<Term> {
    match mv {
        Term::Compound(s, args) if *s == record.well_known.does && args.len() == 2 => Some(args[0].clone()),
        _ => None,
    }
}

fn role_mismatch(record: &GameRecord, roles: &[Term], moves: &[Term]) -> EngineError {
    EngineError::RoleMismatch {
        expected: roles.iter().map(|r| format!("{}", r.display(&record.symbols))).collect(),
        got: moves.iter().map(|m| format!("{}", m.display(&record.symbols))).collect(),
    }
}

/// Structural checks run once at installation time, aggregated the way
/// `gamesman-nova`'s own multi-step setup routines are (`.context(...)` at
/// each stage). Every clause head must be able to name a predicate —
/// `state_dependent_predicates`/`stateify_clause` both assume `head.functor()`
/// is `Some`, so a variable or integer head is rejected here rather than
/// panicking deep in the rewriter.
fn validate_rule_set(clauses: &[Clause], symbols: &Symbols) -> anyhow::Result<()> {
    for (index, clause) in clauses.iter().enumerate() {
        validate_clause(clause, symbols)
            .with_context(|| format!("clause #{index} (`{}`)", clause.head.display(symbols)))?;
    }
    Ok(())
}

fn validate_clause(clause: &Clause, symbols: &Symbols) -> anyhow::Result<()> {
    if clause.head.functor().is_none() {
        anyhow::bail!(
            "head `{}` is not an atom or compound; a clause cannot be headed by a bare variable or integer",
            clause.head.display(symbols)
        );
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::VarId;

    fn count_to_two() -> (Engine, Term, Term) {
        let engine = Engine::new();
        let symbols = engine.symbols().clone();
        let wk = crate::term::WellKnown::new(&symbols);
        let counter = Term::atom(&symbols, "counter");
        let count = symbols.intern("count");
        let countto2 = Term::atom(&symbols, "countto2");

        let role_clause = Clause::fact(Term::Compound(wk.role, vec![counter.clone()]));
        let init_clause =
            Clause::fact(Term::Compound(wk.init, vec![Term::Compound(count, vec![Term::Int(1)])]));
        let x = Term::Var(VarId(0));
        let legal_clause = Clause {
            head: Term::Compound(wk.legal, vec![counter.clone(), countto2.clone()]),
            body: vec![Term::Compound(wk.true_, vec![Term::Compound(count, vec![Term::Int(1)])])],
        };
        let next_clause = Clause {
            head: Term::Compound(wk.next, vec![Term::Compound(count, vec![Term::Int(2)])]),
            body: vec![
                Term::Compound(wk.true_, vec![Term::Compound(count, vec![Term::Int(1)])]),
                Term::Compound(wk.does, vec![counter.clone(), countto2.clone()]),
            ],
        };
        let terminal_clause = Clause {
            head: Term::Atom(wk.terminal),
            body: vec![Term::Compound(wk.true_, vec![Term::Compound(count, vec![Term::Int(2)])])],
        };
        let goal_win = Clause {
            head: Term::Compound(wk.goal, vec![counter.clone(), Term::Int(100)]),
            body: vec![Term::Compound(wk.true_, vec![Term::Compound(count, vec![Term::Int(2)])])],
        };
        let goal_lose = Clause {
            head: Term::Compound(wk.goal, vec![counter.clone(), Term::Int(0)]),
            body: vec![
                Term::Compound(wk.true_, vec![Term::Compound(count, vec![x.clone()])]),
                Term::Compound(wk.distinct, vec![x, Term::Int(2)]),
            ],
        };

        engine
            .create_game(
                "count-to-2",
                vec![
                    role_clause,
                    init_clause,
                    legal_clause,
                    next_clause,
                    terminal_clause,
                    goal_win,
                    goal_lose,
                ],
            )
            .unwrap();
        (engine, counter, countto2)
    }

    #[test]
    fn unknown_game_is_reported_with_a_suggestion() {
        let engine = Engine::new();
        engine.create_game("tic-tac-toe", vec![]).unwrap();
        let err = engine.game_truth_state("tic-tac-tOe", &MoveHistory::new()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownGame { .. }));
        assert_eq!(err.suggestion(), Some("tic-tac-toe"));
    }

    #[test]
    fn initial_truth_state_matches_init_facts() {
        let (engine, _counter, _countto2) = count_to_two();
        let symbols = engine.symbols().clone();
        let count = symbols.intern("count");
        let state = engine.game_truth_state("count-to-2", &MoveHistory::new()).unwrap();
        assert!(state.contains(&Term::Compound(count, vec![Term::Int(1)])));
    }

    #[test]
    fn prepare_moves_reorders_into_canonical_role_order() {
        let (engine, counter, countto2) = count_to_two();
        let mv = Term::Compound(engine.well_known.does, vec![counter, countto2]);
        let prepared = engine.prepare_moves("count-to-2", std::slice::from_ref(&mv)).unwrap();
        assert_eq!(prepared, vec![mv]);
    }

    #[test]
    fn prepare_moves_rejects_a_role_not_in_the_game() {
        let (engine, _counter, countto2) = count_to_two();
        let symbols = engine.symbols().clone();
        let stranger = Term::atom(&symbols, "nobody");
        let mv = Term::Compound(engine.well_known.does, vec![stranger, countto2]);
        let err = engine.prepare_moves("count-to-2", &[mv]).unwrap_err();
        assert!(matches!(err, EngineError::RoleMismatch { .. }));
    }

    #[test]
    fn full_playthrough_reaches_a_terminal_winning_state() {
        let (engine, counter, countto2) = count_to_two();
        let mv = Term::Compound(engine.well_known.does, vec![counter.clone(), countto2]);
        let truth = engine.game_truth_state("count-to-2", &MoveHistory::new()).unwrap();
        engine.legal_prepared_moves("count-to-2", &truth, &vec![mv.clone()]).unwrap();

        let history = engine
            .truth_history("count-to-2", &vec![vec![mv]], None)
            .unwrap();
        let final_state = final_truth_state(&history);

        let symbols = engine.symbols().clone();
        let wk = crate::term::WellKnown::new(&symbols);
        let utility = Term::Var(VarId(50));
        let goal_query = Term::Compound(wk.goal, vec![counter, utility.clone()]);
        let moves = MoveVector::new();
        let mut answers = engine.game_state("count-to-2", &final_state, &moves, goal_query).unwrap();
        let binding = answers.next().unwrap().unwrap();
        assert_eq!(binding.resolve(&utility), Term::Int(100));
    }

    #[test]
    fn malformed_clause_with_a_variable_head_is_rejected() {
        let engine = Engine::new();
        let bad = Clause::fact(Term::Var(VarId(0)));
        let err = engine.create_game("bad-game", vec![bad]).unwrap_err();
        assert!(matches!(err, EngineError::MalformedClause { .. }));
    }
}
