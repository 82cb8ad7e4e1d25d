//! # Term Model & Unifier Module
//!
//! Represents the logic terms that GDL rule-sets are built from (variables,
//! atoms, integers, compounds) and Robinson-style unification over them,
//! occurs-check off (§4.1: "GDL rule-sets do not need it; performance
//! dominates").
//!
//! Atoms are interned rather than stored as owned strings, the same
//! trade-off `lojban-NeSy`'s `reasoning`/`parser` crates make for lojban
//! gismu and cmavo with [`lasso`] — a symbolic engine resolves the same
//! handful of predicate names over and over, so comparing and hashing a
//! `Symbol` is a lot cheaper than comparing and hashing a `String` on every
//! unification step.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lasso::{Spur, ThreadedRodeo};

/* SYMBOL INTERNING */

/// An interned predicate/atom name. Cheap to copy, compare, and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Spur);

/// Shared interner for atom names, handed out by [`crate::engine::Engine`]
/// and cloned (cheaply — it's an `Arc` internally) into every game record
/// and resolver. `ThreadedRodeo` rather than `Rodeo` because queries
/// against different games are allowed to run on separate threads (§5).
#[derive(Clone)]
pub struct Symbols(Arc<ThreadedRodeo>);

impl Symbols {
    pub fn new() -> Self {
        Symbols(Arc::new(ThreadedRodeo::new()))
    }

    /// Interns `name`, returning its (possibly newly assigned) `Symbol`.
    pub fn intern(&self, name: &str) -> Symbol {
        Symbol(self.0.get_or_intern(name))
    }

    /// Resolves a previously interned `Symbol` back to its name.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.0.resolve(&symbol.0)
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::new()
    }
}

/// The small fixed catalogue of symbols the engine references by identity
/// rather than by re-interning a string literal at every call site. Built
/// once per [`crate::engine::Engine`] alongside its [`Symbols`] table.
#[derive(Clone)]
pub struct WellKnown {
    pub true_: Symbol,
    pub does: Symbol,
    pub role: Symbol,
    pub init: Symbol,
    pub next: Symbol,
    pub legal: Symbol,
    pub terminal: Symbol,
    pub goal: Symbol,
    pub base: Symbol,
    pub not: Symbol,
    pub or: Symbol,
    pub distinct: Symbol,
    pub member: Symbol,
    pub findall: Symbol,
    pub setof: Symbol,
    pub bagof: Symbol,
    pub conj: Symbol,
    pub cons: Symbol,
    pub nil: Symbol,
    pub state: Symbol,
    pub state_dynamic: Symbol,
    pub game_marker: Symbol,
    pub truth_marker: Symbol,
    pub moves_marker: Symbol,
}

impl WellKnown {
    pub fn new(symbols: &Symbols) -> Self {
        WellKnown {
            true_: symbols.intern("true"),
            does: symbols.intern("does"),
            role: symbols.intern("role"),
            init: symbols.intern("init"),
            next: symbols.intern("next"),
            legal: symbols.intern("legal"),
            terminal: symbols.intern("terminal"),
            goal: symbols.intern("goal"),
            base: symbols.intern("base"),
            not: symbols.intern("not"),
            or: symbols.intern("or"),
            distinct: symbols.intern("distinct"),
            member: symbols.intern("member"),
            findall: symbols.intern("findall"),
            setof: symbols.intern("setof"),
            bagof: symbols.intern("bagof"),
            conj: symbols.intern(","),
            cons: symbols.intern("."),
            nil: symbols.intern("[]"),
            state: symbols.intern("state"),
            state_dynamic: symbols.intern("state_dynamic"),
            game_marker: symbols.intern("$game"),
            truth_marker: symbols.intern("$truth"),
            moves_marker: symbols.intern("$moves"),
        }
    }
}

/* VARIABLES */

/// Identifies an unbound variable within a single resolution's binding
/// frame. Fresh ids are handed out by [`crate::resolver::Resolver`] whenever
/// a clause is standardized apart for use; two `VarId`s are the same
/// variable iff they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/* TERMS */

/// A logic term: an unbound variable, an interned atom, an integer, or a
/// compound (functor applied to an ordered argument list). Lists are
/// compounds over the `.`/2 functor terminated by the `[]` atom, exactly as
/// in Prolog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Var(VarId),
    Atom(Symbol),
    Int(i64),
    Compound(Symbol, Vec<Term>),
}

impl Term {
    pub fn atom(symbols: &Symbols, name: &str) -> Term {
        Term::Atom(symbols.intern(name))
    }

    pub fn compound(functor: Symbol, args: Vec<Term>) -> Term {
        Term::Compound(functor, args)
    }

    /// The `(functor, arity)` identifying this term as a predicate/functor
    /// application, or `None` for variables and integers — which cannot
    /// head a clause or be dispatched on by functor.
    pub fn functor(&self) -> Option<(Symbol, usize)> {
        match self {
            Term::Atom(s) => Some((*s, 0)),
            Term::Compound(s, args) => Some((*s, args.len())),
            Term::Var(_) | Term::Int(_) => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// Builds a GDL-style list `[items...]` terminated by `[]`.
    pub fn list(well_known: &WellKnown, items: impl IntoIterator<Item = Term>) -> Term {
        let mut out = Term::Atom(well_known.nil);
        for item in items.into_iter().collect::<Vec<_>>().into_iter().rev() {
            out = Term::Compound(well_known.cons, vec![item, out]);
        }
        out
    }

    /// Decomposes a GDL-style list into its elements, failing (returning
    /// `None`) if `self` is not a proper, fully-ground list spine (a
    /// well-formed move set or `findall` result always is).
    pub fn list_items(&self, well_known: &WellKnown) -> Option<Vec<Term>> {
        let mut items = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Term::Atom(s) if *s == well_known.nil => return Some(items),
                Term::Compound(s, args) if *s == well_known.cons && args.len() == 2 => {
                    items.push(args[0].clone());
                    cur = &args[1];
                }
                _ => return None,
            }
        }
    }

    /// True iff this term contains no unbound variables.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Var(_) => false,
            Term::Atom(_) | Term::Int(_) => true,
            Term::Compound(_, args) => args.iter().all(Term::is_ground),
        }
    }

    pub fn display<'a>(&'a self, symbols: &'a Symbols) -> TermDisplay<'a> {
        TermDisplay { term: self, symbols }
    }
}

pub struct TermDisplay<'a> {
    term: &'a Term,
    symbols: &'a Symbols,
}

impl<'a> fmt::Display for TermDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn go(term: &Term, symbols: &Symbols, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match term {
                Term::Var(id) => write!(f, "_G{}", id.0),
                Term::Atom(s) => write!(f, "{}", symbols.resolve(*s)),
                Term::Int(i) => write!(f, "{}", i),
                Term::Compound(s, args) => {
                    write!(f, "{}(", symbols.resolve(*s))?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        go(arg, symbols, f)?;
                    }
                    write!(f, ")")
                }
            }
        }
        go(self.term, self.symbols, f)
    }
}

/* CLAUSES */

/// A single rule `head :- body` (the body empty for a fact). Bodies are
/// stored flattened into their top-level conjuncts rather than as a nested
/// `,`/2 tree — the analyser and rewriter both want to walk "the literals
/// of this clause", and a `Vec` makes that direct instead of re-deriving
/// it from the tree shape on every pass. `or/2`/`not/1` sub-structure
/// still nests normally inside a single conjunct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub head: Term,
    pub body: Vec<Term>,
}

impl Clause {
    pub fn fact(head: Term) -> Clause {
        Clause {
            head,
            body: Vec::new(),
        }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

/* BINDINGS */

/// A substitution mapping variables to terms, extended monotonically during
/// unification and consulted via [`Bindings::walk`] to chase variable-to-
/// variable chains (§4.1: "union-find-style chasing is permitted").
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<VarId, Term>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    /// Follows `term` through zero or more variable bindings until it
    /// reaches an unbound variable or a non-variable term. Does not
    /// recurse into compound arguments — this is the "shallow" walk used
    /// during unification, as opposed to [`Bindings::resolve`].
    pub fn walk(&self, term: &Term) -> Term {
        let mut current = term.clone();
        while let Term::Var(id) = current {
            match self.map.get(&id) {
                Some(next) => current = next.clone(),
                None => return Term::Var(id),
            }
        }
        current
    }

    /// Fully substitutes `term`, recursing into compound arguments, so that
    /// the result is ground whenever `term` is ground modulo these
    /// bindings. Used to materialize answers and facts for insertion into a
    /// [`crate::model::TruthState`].
    pub fn resolve(&self, term: &Term) -> Term {
        match self.walk(term) {
            Term::Compound(functor, args) => {
                Term::Compound(functor, args.iter().map(|a| self.resolve(a)).collect())
            }
            other => other,
        }
    }

    fn bind(&mut self, var: VarId, term: Term) {
        self.map.insert(var, term);
    }
}

/// Attempts to unify `left` and `right` under `bindings`, returning the
/// extended bindings on success. Never panics or errors on a type mismatch
/// — mismatches are ordinary unification failure (§4.1).
pub fn unify(left: &Term, right: &Term, bindings: &Bindings) -> Option<Bindings> {
    let mut extended = bindings.clone();
    if unify_into(left, right, &mut extended) {
        Some(extended)
    } else {
        None
    }
}

fn unify_into(left: &Term, right: &Term, bindings: &mut Bindings) -> bool {
    let left = bindings.walk(left);
    let right = bindings.walk(right);
    match (left, right) {
        (Term::Var(a), Term::Var(b)) => {
            if a != b {
                // Alias the higher id to the lower one so chains shorten
                // towards a stable representative, the "union-find-style
                // chasing" the module doc promises.
                let (keep, drop) = if a.0 < b.0 { (a, b) } else { (b, a) };
                bindings.bind(drop, Term::Var(keep));
            }
            true
        }
        (Term::Var(v), other) | (other, Term::Var(v)) => {
            bindings.bind(v, other);
            true
        }
        (Term::Atom(a), Term::Atom(b)) => a == b,
        (Term::Int(a), Term::Int(b)) => a == b,
        (Term::Compound(f1, a1), Term::Compound(f2, a2)) => {
            f1 == f2
                && a1.len() == a2.len()
                && a1.iter().zip(a2.iter()).all(|(x, y)| unify_into(x, y, bindings))
        }
        _ => false,
    }
}
