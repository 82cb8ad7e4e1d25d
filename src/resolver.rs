//! # Resolver Module
//!
//! SLD resolution over an installed, stateified rule-set (§4.6). A
//! [`Resolver`] is a genuine lazy `Iterator<Item = Result<Bindings,
//! EngineError>>`: each call to `next()` does exactly the work needed to
//! produce (or rule out) one more answer, backed by an explicit
//! choice-point stack rather than native recursion or a pre-materialized
//! `Vec` of every solution. Dropping the iterator mid-traversal — e.g. a
//! caller that only wants the first answer — cancels the search; nothing
//! keeps running in the background, since there is no background, just a
//! `Vec<Frame>` the caller stops popping from.
//!
//! The same dispatch handles a goal whether it arrives already wrapped by
//! [`crate::rewrite`] (`state(..)`/`state_dynamic(..)`, from a clause body
//! installed for this game) or raw (a caller's top-level query, or the
//! inner goal of a `findall/3` that the rewriter left untouched because
//! `findall/3` itself is not a state-dependent predicate): a raw goal whose
//! `(functor, arity)` is in the game's SDP is resolved exactly as if it had
//! arrived pre-wrapped in `state(...)`.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::builtins::{self, Builtin};
use crate::database::GameRecord;
use crate::error::EngineError;
use crate::model::{MoveVector, TruthState};
use crate::term::{unify, Bindings, Term, VarId};

/// One pending branch of the search: the goals still to prove (next goal
/// to attempt at the end of the `Vec`) and the bindings accumulated to
/// reach this branch.
struct Frame {
    goals: Vec<Term>,
    bindings: Bindings,
}

/// A single in-progress SLD derivation against one game's installed
/// clauses, one truth state, and one move vector. Construct with
/// [`solve`]; iterate for answers.
pub struct Resolver<'a> {
    record: Arc<GameRecord>,
    truth: &'a TruthState,
    moves: &'a MoveVector,
    stack: Vec<Frame>,
    next_var: u32,
}

/// Begins resolving `goal` against `record`'s clauses, with `truth` and
/// `moves` as the ambient context `state(...)`/`member(does(_,_), ...)`
/// literals resolve against.
pub fn solve<'a>(
    record: Arc<GameRecord>,
    truth: &'a TruthState,
    moves: &'a MoveVector,
    goal: Term,
) -> Resolver<'a> {
    Resolver {
        record,
        truth,
        moves,
        stack: vec![Frame {
            goals: vec![goal],
            bindings: Bindings::new(),
        }],
        next_var: 0,
    }
}

impl<'a> Iterator for Resolver<'a> {
    type Item = Result<Bindings, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Frame { mut goals, bindings }) = self.stack.pop() {
            match goals.pop() {
                None => return Some(Ok(bindings)),
                Some(goal) => match self.expand(&goal, &goals, bindings) {
                    Ok(mut alternatives) => {
                        alternatives.reverse();
                        self.stack.extend(alternatives);
                    }
                    Err(error) => return Some(Err(error)),
                },
            }
        }
        trace!("resolver: choice points exhausted");
        None
    }
}

impl<'a> Resolver<'a> {
    fn fresh_var(&mut self) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        id
    }

    /// Copies `clause` with every variable replaced by a fresh one unique
    /// to this use of the clause ("standardizing apart" — two frames that
    /// both descend from the same installed clause must never alias a
    /// variable).
    fn standardize(&mut self, clause: &crate::term::Clause) -> crate::term::Clause {
        fn collect(term: &Term, remap: &mut HashMap<VarId, VarId>, next_var: &mut u32) {
            match term {
                Term::Var(id) => {
                    remap.entry(*id).or_insert_with(|| {
                        let fresh = VarId(*next_var);
                        *next_var += 1;
                        fresh
                    });
                }
                Term::Compound(_, args) => {
                    for arg in args {
                        collect(arg, remap, next_var);
                    }
                }
                _ => {}
            }
        }

        let mut remap = HashMap::new();
        let mut next_var = self.next_var;
        collect(&clause.head, &mut remap, &mut next_var);
        for literal in &clause.body {
            collect(literal, &mut remap, &mut next_var);
        }
        self.next_var = next_var;

        let head = substitute_renamed(&clause.head, &remap);
        let body = clause.body.iter().map(|t| substitute_renamed(t, &remap)).collect();
        crate::term::Clause { head, body }
    }

    /// Substitutes `$moves` — the marker [`crate::rewrite`] leaves in a
    /// `member(does(R, A), $moves)` literal — with the actual move vector
    /// as a GDL list. Any other term is returned resolved but otherwise
    /// untouched.
    fn materialize(&self, term: &Term, bindings: &Bindings) -> Term {
        let walked = bindings.walk(term);
        match &walked {
            Term::Atom(s) if *s == self.record.well_known.moves_marker => {
                Term::list(&self.record.well_known, self.moves.iter().cloned())
            }
            other => other.clone(),
        }
    }

    fn expand(&mut self, goal: &Term, rest: &[Term], bindings: Bindings) -> Result<Vec<Frame>, EngineError> {
        let wk = self.record.well_known.clone();
        let symbols = self.record.symbols.clone();
        let resolved = bindings.walk(goal);

        if let Term::Compound(s, args) = &resolved {
            if *s == wk.conj && args.len() == 2 {
                let mut goals = rest.to_vec();
                goals.push(args[1].clone());
                goals.push(args[0].clone());
                return Ok(vec![Frame { goals, bindings }]);
            }
            if *s == wk.or && args.len() == 2 {
                let mut left = rest.to_vec();
                left.push(args[0].clone());
                let mut right = rest.to_vec();
                right.push(args[1].clone());
                return Ok(vec![
                    Frame { goals: left, bindings: bindings.clone() },
                    Frame { goals: right, bindings },
                ]);
            }
            if *s == wk.not && args.len() == 1 {
                let inner = bindings.resolve(&args[0]);
                if !inner.is_ground() {
                    return Err(EngineError::UnboundInNegation {
                        goal: inner.display(&symbols).to_string(),
                    });
                }
                let solutions = self.solve_all(inner)?;
                return if solutions.is_empty() {
                    Ok(vec![Frame { goals: rest.to_vec(), bindings }])
                } else {
                    Ok(vec![])
                };
            }
            if let Some(Builtin::Distinct) = builtins::classify(&wk, *s, args.len()) {
                return if builtins::distinct(&args[0], &args[1], &bindings, &symbols)? {
                    Ok(vec![Frame { goals: rest.to_vec(), bindings }])
                } else {
                    Ok(vec![])
                };
            }
            if let Some(Builtin::Member) = builtins::classify(&wk, *s, args.len()) {
                let list = self.materialize(&args[1], &bindings);
                let alternatives = builtins::member_alternatives(&args[0], &list, &wk, &bindings);
                return Ok(alternatives
                    .into_iter()
                    .map(|b| Frame { goals: rest.to_vec(), bindings: b })
                    .collect());
            }
            match builtins::classify(&wk, *s, args.len()) {
                Some(kind @ Builtin::Findall) | Some(kind @ Builtin::Setof) | Some(kind @ Builtin::Bagof) => {
                    return self.expand_aggregate(kind, args, rest, &bindings);
                }
                _ => {}
            }
            if *s == wk.state && args.len() == 3 {
                return self.expand_state(&args[2], rest, bindings);
            }
        }

        match resolved.functor() {
            Some(pred) if self.record.sdp.contains(&pred) => self.expand_state(&resolved, rest, bindings),
            Some(_) => self.expand_clauses(&resolved, rest, bindings),
            None => Err(EngineError::MalformedClause {
                clause: format!("{}", resolved.display(&symbols)),
                reason: "cannot resolve a variable or integer as a goal".into(),
            }),
        }
    }

    fn expand_state(&mut self, literal: &Term, rest: &[Term], bindings: Bindings) -> Result<Vec<Frame>, EngineError> {
        let wk = self.record.well_known.clone();
        if let Term::Compound(s, args) = literal {
            if *s == wk.true_ && args.len() == 1 {
                let mut alternatives = Vec::new();
                for fact in self.truth.iter() {
                    if let Some(extended) = unify(&args[0], fact, &bindings) {
                        alternatives.push(Frame { goals: rest.to_vec(), bindings: extended });
                    }
                }
                return Ok(alternatives);
            }
            // A `does/2` literal that reaches here raw (e.g. nested inside a
            // `findall`/`not` goal argument rather than a clause body, so
            // `crate::rewrite`'s `member(does(R,A), $moves)` rewrite never
            // saw it) is resolved the same way §4.6 specifies for the
            // `state(...)` wrapper directly: enumerate from the move vector.
            if *s == wk.does && args.len() == 2 {
                let list = Term::list(&wk, self.moves.iter().cloned());
                let alternatives = builtins::member_alternatives(literal, &list, &wk, &bindings);
                return Ok(alternatives
                    .into_iter()
                    .map(|b| Frame { goals: rest.to_vec(), bindings: b })
                    .collect());
            }
        }
        self.expand_clauses(literal, rest, bindings)
    }

    fn expand_clauses(&mut self, goal: &Term, rest: &[Term], bindings: Bindings) -> Result<Vec<Frame>, EngineError> {
        let Some(pred) = goal.functor() else {
            return Ok(vec![]);
        };
        let wk = self.record.well_known.clone();
        let clauses = self.record.clauses_for(pred).to_vec();
        let mut alternatives = Vec::new();
        for clause in &clauses {
            let standardized = self.standardize(clause);
            let actual_head = match &standardized.head {
                Term::Compound(s, args) if *s == wk.state_dynamic && args.len() == 4 => args[3].clone(),
                other => other.clone(),
            };
            if let Some(extended) = unify(&actual_head, goal, &bindings) {
                let mut goals = rest.to_vec();
                for literal in standardized.body.iter().rev() {
                    goals.push(literal.clone());
                }
                alternatives.push(Frame { goals, bindings: extended });
            }
        }
        Ok(alternatives)
    }

    fn expand_aggregate(
        &mut self,
        kind: Builtin,
        args: &[Term],
        rest: &[Term],
        bindings: &Bindings,
    ) -> Result<Vec<Frame>, EngineError> {
        let template = bindings.resolve(&args[0]);
        let goal_term = bindings.resolve(&args[1]);
        let solutions = self.solve_all(goal_term)?;
        let mut results: Vec<Term> = solutions.iter().map(|b| b.resolve(&template)).collect();

        match kind {
            Builtin::Findall => {}
            Builtin::Setof => {
                if results.is_empty() {
                    return Ok(vec![]);
                }
                results = builtins::sort_dedup(results);
            }
            Builtin::Bagof => {
                if results.is_empty() {
                    return Ok(vec![]);
                }
            }
            _ => unreachable!("expand_aggregate called with a non-aggregate builtin"),
        }

        let list_term = Term::list(&self.record.well_known, results);
        match unify(&args[2], &list_term, bindings) {
            Some(extended) => Ok(vec![Frame { goals: rest.to_vec(), bindings: extended }]),
            None => Ok(vec![]),
        }
    }

    /// Runs `goal` to exhaustion in a fresh sub-derivation (used by
    /// `not/1` and the aggregates), continuing this resolver's variable
    /// counter so the sub-derivation's fresh variables never collide with
    /// ones already live in the caller.
    fn solve_all(&mut self, goal: Term) -> Result<Vec<Bindings>, EngineError> {
        let mut sub = Resolver {
            record: self.record.clone(),
            truth: self.truth,
            moves: self.moves,
            stack: vec![Frame { goals: vec![goal], bindings: Bindings::new() }],
            next_var: self.next_var,
        };
        let mut solutions = Vec::new();
        for result in &mut sub {
            solutions.push(result?);
        }
        self.next_var = sub.next_var;
        Ok(solutions)
    }
}

/// Plain substitution (no fresh-variable allocation) used once the id
/// remapping for a clause instance has been fully collected.
fn substitute_renamed(term: &Term, remap: &HashMap<VarId, VarId>) -> Term {
    match term {
        Term::Var(id) => Term::Var(*remap.get(id).unwrap_or(id)),
        Term::Compound(functor, args) => {
            Term::Compound(*functor, args.iter().map(|a| substitute_renamed(a, remap)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::GameRecord;
    use crate::model::{MoveVector, TruthState};
    use crate::term::{Clause, Symbols, VarId, WellKnown};

    fn fixture() -> (Symbols, WellKnown) {
        let symbols = Symbols::new();
        let wk = WellKnown::new(&symbols);
        (symbols, wk)
    }

    #[test]
    fn resolves_a_simple_fact() {
        let (symbols, wk) = fixture();
        let white = Term::atom(&symbols, "white");
        let role_clause = Clause::fact(Term::Compound(wk.role, vec![white.clone()]));
        let record = Arc::new(GameRecord::build("g".into(), vec![role_clause], symbols.clone(), wk.clone()));
        let truth = TruthState::new();
        let moves = MoveVector::new();
        let x = Term::Var(VarId(100));
        let goal = Term::Compound(wk.role, vec![x.clone()]);
        let mut results = solve(record, &truth, &moves, goal);
        let first = results.next().unwrap().unwrap();
        assert_eq!(first.resolve(&x), white);
        assert!(results.next().is_none());
    }

    #[test]
    fn true_literal_queries_ambient_truth_state() {
        let (symbols, wk) = fixture();
        let cell = symbols.intern("cell");
        let x = Term::Var(crate::term::VarId(0));
        // cell(X) :- true(cell(X)).
        let clause = Clause {
            head: Term::Compound(cell, vec![x.clone()]),
            body: vec![Term::Compound(wk.true_, vec![Term::Compound(cell, vec![x.clone()])])],
        };
        let record = Arc::new(GameRecord::build("g".into(), vec![clause], symbols.clone(), wk.clone()));
        let mut truth = TruthState::new();
        truth.insert(Term::Compound(cell, vec![Term::Int(1)]));
        let moves = MoveVector::new();
        let query_var = Term::Var(VarId(200));
        let goal = Term::Compound(cell, vec![query_var.clone()]);
        let mut results = solve(record, &truth, &moves, goal);
        let first = results.next().unwrap().unwrap();
        assert_eq!(first.resolve(&query_var), Term::Int(1));
    }

    #[test]
    fn does_literal_matches_against_the_move_vector() {
        let (symbols, wk) = fixture();
        let white = Term::atom(&symbols, "white");
        let action = Term::atom(&symbols, "advance");
        let x = Term::Var(crate::term::VarId(0));
        // chosen(A) :- does(white, A).
        let clause = Clause {
            head: Term::Compound(symbols.intern("chosen"), vec![x.clone()]),
            body: vec![Term::Compound(wk.does, vec![white.clone(), x])],
        };
        let record = Arc::new(GameRecord::build("g".into(), vec![clause], symbols.clone(), wk.clone()));
        let truth = TruthState::new();
        let moves: MoveVector = vec![Term::Compound(wk.does, vec![white, action.clone()])];
        let query_var = Term::Var(VarId(300));
        let goal = Term::Compound(symbols.intern("chosen"), vec![query_var.clone()]);
        let mut results = solve(record, &truth, &moves, goal);
        let first = results.next().unwrap().unwrap();
        assert_eq!(first.resolve(&query_var), action);
    }

    #[test]
    fn not_fails_when_the_ground_goal_holds() {
        let (symbols, wk) = fixture();
        let done = Term::atom(&symbols, "done");
        let mut truth = TruthState::new();
        truth.insert(done.clone());
        let inner = Term::Compound(wk.true_, vec![done.clone()]);
        let goal = Term::Compound(wk.not, vec![inner]);
        let record = Arc::new(GameRecord::build("g".into(), vec![], symbols, wk));
        let moves = MoveVector::new();
        let mut results = solve(record, &truth, &moves, goal);
        assert!(results.next().is_none());
    }

    #[test]
    fn not_succeeds_when_the_ground_goal_fails() {
        let (symbols, wk) = fixture();
        let done = Term::atom(&symbols, "done");
        let truth = TruthState::new();
        let inner = Term::Compound(wk.true_, vec![done]);
        let goal = Term::Compound(wk.not, vec![inner]);
        let record = Arc::new(GameRecord::build("g".into(), vec![], symbols, wk));
        let moves = MoveVector::new();
        let mut results = solve(record, &truth, &moves, goal);
        assert!(results.next().unwrap().is_ok());
    }

    #[test]
    fn not_over_unbound_goal_is_an_error() {
        let (symbols, wk) = fixture();
        let x = Term::Var(VarId(0));
        let inner = Term::Compound(wk.true_, vec![x]);
        let goal = Term::Compound(wk.not, vec![inner]);
        let record = Arc::new(GameRecord::build("g".into(), vec![], symbols, wk));
        let truth = TruthState::new();
        let moves = MoveVector::new();
        let mut results = solve(record, &truth, &moves, goal);
        assert!(matches!(results.next(), Some(Err(EngineError::UnboundInNegation { .. }))));
    }

    #[test]
    fn or_tries_the_left_branch_before_the_right() {
        let (symbols, wk) = fixture();
        let a = symbols.intern("a");
        let b = symbols.intern("b");
        let clause_a = Clause::fact(Term::Atom(a));
        let clause_b = Clause::fact(Term::Atom(b));
        let record = Arc::new(GameRecord::build(
            "g".into(),
            vec![clause_a, clause_b],
            symbols,
            wk.clone(),
        ));
        let truth = TruthState::new();
        let moves = MoveVector::new();
        let goal = Term::Compound(wk.or, vec![Term::Atom(a), Term::Atom(b)]);
        let mut results = solve(record, &truth, &moves, goal);
        assert!(results.next().unwrap().is_ok());
        assert!(results.next().unwrap().is_ok());
        assert!(results.next().is_none());
    }

    #[test]
    fn findall_collects_every_solution_without_deduplicating() {
        let (symbols, wk) = fixture();
        let piece = symbols.intern("piece");
        let a = Term::atom(&symbols, "a");
        let b = Term::atom(&symbols, "b");
        let clauses = vec![
            Clause::fact(Term::Compound(piece, vec![a.clone()])),
            Clause::fact(Term::Compound(piece, vec![b.clone()])),
            Clause::fact(Term::Compound(piece, vec![a.clone()])),
        ];
        let record = Arc::new(GameRecord::build("g".into(), clauses, symbols.clone(), wk.clone()));
        let truth = TruthState::new();
        let moves = MoveVector::new();
        let x = Term::Var(VarId(1));
        let out = Term::Var(VarId(2));
        let goal_term = Term::Compound(piece, vec![x.clone()]);
        let findall_goal = Term::Compound(wk.findall, vec![x, goal_term, out.clone()]);
        let mut results = solve(record, &truth, &moves, findall_goal);
        let bindings = results.next().unwrap().unwrap();
        let list = bindings.resolve(&out);
        assert_eq!(list.list_items(&wk).unwrap().len(), 3);
    }

    #[test]
    fn distinct_prunes_equal_bindings() {
        let (symbols, wk) = fixture();
        let a = Term::atom(&symbols, "a");
        let record = Arc::new(GameRecord::build("g".into(), vec![], symbols, wk.clone()));
        let truth = TruthState::new();
        let moves = MoveVector::new();
        let goal = Term::Compound(wk.distinct, vec![a.clone(), a]);
        let mut results = solve(record, &truth, &moves, goal);
        assert!(results.next().is_none());
    }

    #[test]
    fn raw_does_literal_nested_inside_findall_resolves_against_the_move_vector() {
        // findall's goal argument is never walked by `crate::rewrite` (only
        // a clause body's top-level connectives are), so a `does(R, A)`
        // inside it reaches the resolver unrewritten. §4.6 requires the
        // `state(...)` dispatch to answer it from the move vector directly,
        // the same as the `member(does(R,A), $moves)` rewrite would.
        let (symbols, wk) = fixture();
        let white = Term::atom(&symbols, "white");
        let advance = Term::atom(&symbols, "advance");
        let record = Arc::new(GameRecord::build("g".into(), vec![], symbols, wk.clone()));
        let truth = TruthState::new();
        let moves: MoveVector = vec![Term::Compound(wk.does, vec![white.clone(), advance.clone()])];
        let action = Term::Var(VarId(0));
        let does_goal = Term::Compound(wk.does, vec![white, action.clone()]);
        let findall_goal = Term::Compound(wk.findall, vec![action, does_goal, Term::Var(VarId(1))]);
        let out = Term::Var(VarId(1));
        let mut results = solve(record, &truth, &moves, findall_goal);
        let bindings = results.next().unwrap().unwrap();
        let list = bindings.resolve(&out);
        assert_eq!(list.list_items(&wk).unwrap(), vec![advance]);
    }
}
