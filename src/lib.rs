//! # GGP Engine
//!
//! A Game State Engine for General Game Playing: a stateified logical
//! evaluator for Game Description Language (GDL) rule-sets.
//!
//! Given an already-parsed rule-set (clauses as [`term::Term`] trees — this
//! crate does not parse GDL/KIF surface syntax), the engine:
//!
//! - analyses which predicates depend on the current position (`analysis`);
//! - rewrites those predicates' clauses to carry an explicit truth state and
//!   move vector (`rewrite`);
//! - answers logical queries against a caller-supplied state via SLD
//!   resolution with negation-as-failure (`resolver`);
//! - derives successor truth states from a previous state and a joint move,
//!   and replays move histories with cache reuse (`transition`).
//!
//! [`engine::Engine`] is the entry point; construct one, install a rule-set
//! with [`engine::Engine::create_game`], and query it with the rest of its
//! methods.
//!
//! Strategic search (minimax, MCTS), the game-master transport, and GDL/KIF
//! parsing are out of scope — a search agent or test harness builds on top
//! of this engine's query surface.

pub mod analysis;
pub mod builtins;
pub mod database;
pub mod engine;
pub mod error;
pub mod model;
pub mod resolver;
pub mod rewrite;
pub mod term;
pub mod transition;

pub use engine::Engine;
pub use error::EngineError;
pub use term::{Clause, Symbol, Symbols, Term, VarId};
