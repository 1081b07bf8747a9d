//! Program container: interpretations, facts, rules and builtin functions.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{Atom, Clause, Literal, Symbol, Value, sym};

/// Partial-order test supplied by the front-end for a lattice predicate.
pub type LeqFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Least upper bound supplied by the front-end for a lattice predicate.
/// Must be commutative, associative, idempotent and monotone; the solver
/// trusts the front-end's checks here.
pub type LubFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// A builtin function usable in functional body atoms. Returning `None`
/// makes the atom fail for those arguments rather than raising an error.
pub type BuiltinFn = Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>;

/// How a predicate symbol is interpreted.
#[derive(Clone)]
pub enum Interpretation {
    /// A finite relation of the given arity.
    Relation { arity: usize },
    /// A keyed lattice map: the first `arity - 1` positions key the map,
    /// the last position carries the lattice element.
    Lattice {
        arity: usize,
        bottom: Value,
        leq: LeqFn,
        lub: LubFn,
    },
}

impl Interpretation {
    pub fn relation(arity: usize) -> Self {
        Interpretation::Relation { arity }
    }

    pub fn lattice(
        arity: usize,
        bottom: Value,
        leq: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static,
        lub: impl Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Interpretation::Lattice {
            arity,
            bottom,
            leq: Arc::new(leq),
            lub: Arc::new(lub),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Interpretation::Relation { arity } | Interpretation::Lattice { arity, .. } => *arity,
        }
    }

    pub fn is_lattice(&self) -> bool {
        matches!(self, Interpretation::Lattice { .. })
    }
}

impl fmt::Debug for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpretation::Relation { arity } => write!(f, "Relation({arity})"),
            Interpretation::Lattice { arity, bottom, .. } => {
                write!(f, "Lattice({arity}, bottom = {bottom:?})")
            }
        }
    }
}

/// A complete program as produced by the front-end: the sole input of the
/// solver. Immutable once handed over.
#[derive(Clone, Default)]
pub struct Program {
    /// Declared predicates and their interpretations.
    pub interpretations: FxHashMap<Symbol, Interpretation>,
    /// Clauses with empty body and ground head.
    pub facts: Vec<Clause>,
    /// Clauses with non-empty body.
    pub clauses: Vec<Clause>,
    /// Builtin functions referenced by functional body atoms.
    pub functions: FxHashMap<Symbol, BuiltinFn>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a predicate.
    pub fn declare(&mut self, name: &str, interp: Interpretation) {
        self.interpretations.insert(sym(name), interp);
    }

    /// Add a ground fact.
    pub fn fact(&mut self, head: Atom) {
        self.facts.push(Clause::fact(head));
    }

    /// Add a rule.
    pub fn rule(&mut self, head: Atom, body: Vec<Literal>) {
        self.clauses.push(Clause::rule(head, body));
    }

    /// Register a builtin function for functional body atoms.
    pub fn function(
        &mut self,
        name: &str,
        f: impl Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
    ) {
        self.functions.insert(sym(name), Arc::new(f));
    }

    pub fn interpretation(&self, pred: &Symbol) -> Option<&Interpretation> {
        self.interpretations.get(pred)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&str> = self.functions.keys().map(|s| s.as_ref().as_str()).collect();
        functions.sort_unstable();
        f.debug_struct("Program")
            .field("interpretations", &self.interpretations)
            .field("facts", &self.facts)
            .field("clauses", &self.clauses)
            .field("functions", &functions)
            .finish()
    }
}
