//! # Error Module
//!
//! The typed failure taxonomy callers of [`crate::engine::Engine`] match on.
//! Hand-written rather than derived, the way `gamesman-nova`'s own
//! `errors.rs` is: a flat enum, a `Display` impl that renders a sentence a
//! human can act on, and `std::error::Error` so it composes under `anyhow`
//! at the call sites that aggregate several fallible steps.

use std::fmt;

/// Every way an [`crate::engine::Engine`] operation can fail, named the way
/// a caller would want to match on it rather than by the internal stage
/// that detected the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A clause handed to [`crate::engine::Engine::create_game`] could not
    /// be parsed into a well-formed [`crate::term::Term`] tree, or violated
    /// a structural invariant the rewriter depends on (e.g. a variable
    /// head).
    MalformedClause { clause: String, reason: String },

    /// No game is installed under `game_id`. `known_games` lists the ids
    /// that are, so a caller can be told the closest match.
    UnknownGame {
        game_id: String,
        known_games: Vec<String>,
    },

    /// A move supplied to [`crate::engine::Engine::move_history_game_state`]
    /// or [`crate::engine::Engine::game_state`] is not among the role's
    /// legal moves at that position.
    IllegalMove { role: String, action: String },

    /// The move vector supplied does not have one move per role in the
    /// game's canonical role order.
    RoleMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    /// `not(G)` was evaluated while `G` still contained an unbound
    /// variable. Negation-as-failure is only sound over a ground goal.
    UnboundInNegation { goal: String },

    /// `distinct(A, B)` was evaluated while `A` or `B` still contained an
    /// unbound variable.
    UnboundInDistinct { goal: String },

    /// An internal invariant was violated — currently, only a poisoned
    /// [`crate::database::Database`] lock (some earlier caller panicked
    /// while holding it). Not one of spec §7's six named taxonomy members;
    /// added because a caller across that lock still gets a `Result`
    /// rather than a panic, matching `gamesman-nova`'s own resource
    /// manager (`database::volatile::resource::manager`), which never
    /// panics on lock poisoning either.
    Internal(String),
}

impl EngineError {
    /// Builds an [`EngineError::UnknownGame`], suggesting the closest known
    /// id by Jaro-Winkler similarity — the same heuristic `gamesman-nova`'s
    /// `utils::most_similar` uses for its own "did you mean" suggestions.
    pub fn unknown_game(game_id: impl Into<String>, known: &[String]) -> EngineError {
        let game_id = game_id.into();
        let mut known_games: Vec<String> = known.to_vec();
        known_games.sort_by(|a, b| {
            let sa = strsim::jaro_winkler(&game_id, a);
            let sb = strsim::jaro_winkler(&game_id, b);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
        EngineError::UnknownGame {
            game_id,
            known_games,
        }
    }

    /// The closest known game id, if any were registered at all.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            EngineError::UnknownGame { known_games, .. } => {
                known_games.first().map(String::as_str)
            }
            _ => None,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MalformedClause { clause, reason } => {
                write!(f, "malformed clause `{clause}`: {reason}")
            }
            EngineError::UnknownGame { game_id, .. } => match self.suggestion() {
                Some(suggestion) => write!(
                    f,
                    "no game installed under id `{game_id}` (did you mean `{suggestion}`?)"
                ),
                None => write!(f, "no game installed under id `{game_id}`"),
            },
            EngineError::IllegalMove { role, action } => {
                write!(f, "`{action}` is not a legal move for role `{role}`")
            }
            EngineError::RoleMismatch { expected, got } => write!(
                f,
                "move vector has roles {got:?}, expected {expected:?} in that order"
            ),
            EngineError::UnboundInNegation { goal } => {
                write!(f, "`not({goal})` evaluated with an unbound variable in `{goal}`")
            }
            EngineError::UnboundInDistinct { goal } => write!(
                f,
                "`distinct({goal})` evaluated with an unbound variable in its arguments"
            ),
            EngineError::Internal(message) => write!(f, "internal engine error: {message}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_game_suggests_closest_match() {
        let known = vec!["tic-tac-toe".to_string(), "connect-four".to_string()];
        let err = EngineError::unknown_game("tic-tac-tOe", &known);
        assert_eq!(err.suggestion(), Some("tic-tac-toe"));
    }

    #[test]
    fn unknown_game_with_no_games_installed_has_no_suggestion() {
        let err = EngineError::unknown_game("anything", &[]);
        assert_eq!(err.suggestion(), None);
    }

    #[test]
    fn display_renders_a_readable_sentence() {
        let err = EngineError::IllegalMove {
            role: "white".into(),
            action: "castle".into(),
        };
        assert_eq!(
            err.to_string(),
            "`castle` is not a legal move for role `white`"
        );
    }
}
