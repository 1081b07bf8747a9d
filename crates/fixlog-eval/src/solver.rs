//! The semi-naive fixed-point driver.
//!
//! A [`Solver`] owns every mutable piece of one solve: the fact and lattice
//! stores, the worklist, and the statistics. Strata run in ascending order;
//! within a stratum, a FIFO worklist of `(clause, seed environment)` pairs
//! drives re-evaluation until quiescence. Every novel fact (or lattice
//! change) wakes the clauses whose bodies mention its predicate, pre-binding
//! the variables of the body atom the fresh tuple matched — the semi-naive
//! refinement that avoids re-deriving settled facts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use fixlog_ir::{Atom, Program, Symbol, Term, Tuple, Value, sym};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{Result, SolveError};
use crate::eval::{Bindings, Stores, ground, match_term, resolve};
use crate::plan::{PlannedClause, PlannedFact, plan};
use crate::stratify::{Stratification, stratify};

/// External cancellation flag, polled at stratum boundaries. Clone it, hand
/// one half to the solver and keep the other.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters for one solve.
#[derive(Debug, Clone, Default)]
pub struct SolveStats {
    /// Novel facts (and lattice changes) per predicate, seed facts included.
    pub facts_derived: FxHashMap<Symbol, usize>,
    /// Worklist items evaluated.
    pub rules_fired: usize,
    /// Wall-clock time of the solve.
    pub elapsed: Duration,
}

impl SolveStats {
    pub fn total_facts(&self) -> usize {
        self.facts_derived.values().sum()
    }
}

/// The minimal model of a program: every relation's tuples and every lattice
/// map's entries, in derivation order, plus solve statistics.
#[derive(Debug, Default)]
pub struct Model {
    relations: FxHashMap<Symbol, Vec<Tuple>>,
    lattices: FxHashMap<Symbol, Vec<(Tuple, Value)>>,
    pub stats: SolveStats,
}

impl Model {
    /// Tuples of a relational predicate, in derivation order. Empty for
    /// unknown names.
    pub fn relation(&self, name: &str) -> &[Tuple] {
        self.relations.get(&sym(name)).map_or(&[], Vec::as_slice)
    }

    /// Entries of a lattice predicate, keyed tuples paired with their final
    /// elements.
    pub fn lattice(&self, name: &str) -> &[(Tuple, Value)] {
        self.lattices.get(&sym(name)).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, name: &str, tuple: &[Value]) -> bool {
        self.relation(name).iter().any(|t| t == tuple)
    }

    /// The final element stored under `key`, if the key was ever joined.
    pub fn lattice_value(&self, name: &str, key: &[Value]) -> Option<&Value> {
        self.lattice(name)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Run every static check and return all diagnostics, in source order.
pub fn check(program: &Program) -> Vec<SolveError> {
    let mut errors = plan(program).errors;
    if let Err(err) = stratify(program) {
        errors.push(err);
    }
    errors
}

/// Solve a program to its minimal model.
pub fn solve(program: &Program) -> Result<Model> {
    Solver::new(program)?.run()
}

/// Solve with an external cancellation token.
pub fn solve_with_cancel(program: &Program, cancel: CancelToken) -> Result<Model> {
    Solver::new(program)?.with_cancel(cancel).run()
}

/// One solver invocation. Owns all mutable state; independent instances may
/// run in parallel over a shared `Program`.
pub struct Solver<'p> {
    program: &'p Program,
    planned: Vec<PlannedClause>,
    facts: Vec<PlannedFact>,
    strata: Stratification,
    /// Body predicate -> occurrences `(clause index, body literal index)`
    /// that a novel fact of that predicate can wake.
    deps: FxHashMap<Symbol, Vec<(usize, usize)>>,
    stores: Stores,
    stats: SolveStats,
    cancel: CancelToken,
}

impl<'p> Solver<'p> {
    /// Validate, plan and stratify a program. Fails on the first diagnostic;
    /// use [`check`] to see them all.
    pub fn new(program: &'p Program) -> Result<Self> {
        let output = plan(program);
        if let Some(err) = output.errors.into_iter().next() {
            return Err(err);
        }
        let strata = stratify(program)?;

        let mut planned = output.clauses;
        for clause in &mut planned {
            clause.stratum = strata.strata.get(&clause.head.pred).copied().unwrap_or(0);
        }
        let mut facts = output.facts;
        for fact in &mut facts {
            fact.stratum = strata.strata.get(&fact.pred).copied().unwrap_or(0);
        }

        let mut deps: FxHashMap<Symbol, Vec<(usize, usize)>> = FxHashMap::default();
        for (ci, clause) in planned.iter().enumerate() {
            for (li, lit) in clause.body.iter().enumerate() {
                if let fixlog_ir::Literal::Positive(atom) = lit {
                    deps.entry(atom.pred).or_default().push((ci, li));
                }
            }
        }

        Ok(Solver {
            program,
            planned,
            facts,
            strata,
            deps,
            stores: Stores::for_program(program),
            stats: SolveStats::default(),
            cancel: CancelToken::new(),
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run to quiescence and return the model.
    pub fn run(mut self) -> Result<Model> {
        let start = Instant::now();
        for stratum in 0..self.strata.num_strata {
            if self.cancel.is_cancelled() {
                debug!(stratum, "solve cancelled");
                self.stats.elapsed = start.elapsed();
                return Err(SolveError::Cancelled {
                    partial: Box::new(self.into_model()),
                });
            }
            self.run_stratum(stratum)?;
        }
        self.stats.elapsed = start.elapsed();
        Ok(self.into_model())
    }

    fn run_stratum(&mut self, stratum: usize) -> Result<()> {
        let mut worklist: VecDeque<(usize, Bindings)> = VecDeque::new();

        // Seed the stratum's facts. Their dependents are covered by the
        // initial round below, so no per-fact wakeup is needed yet.
        let seeds: Vec<(Symbol, Tuple)> = self
            .facts
            .iter()
            .filter(|f| f.stratum == stratum)
            .map(|f| (f.pred, f.tuple.clone()))
            .collect();
        for (pred, tuple) in seeds {
            self.satisfy(pred, tuple, stratum, &mut worklist)?;
        }
        worklist.clear();

        // Initial round: every clause of this stratum once, unconstrained.
        for (ci, clause) in self.planned.iter().enumerate() {
            if clause.stratum == stratum {
                worklist.push_back((ci, Bindings::default()));
            }
        }
        debug!(stratum, clauses = worklist.len(), facts = %self.stats.total_facts(), "stratum seeded");

        while let Some((ci, seed)) = worklist.pop_front() {
            self.stats.rules_fired += 1;
            let envs = resolve(
                &self.planned[ci],
                &self.stores,
                &self.program.functions,
                seed,
            )?;
            if envs.is_empty() {
                continue;
            }
            let head = self.planned[ci].head.clone();
            for env in envs {
                let mut tuple = Vec::with_capacity(head.terms.len());
                for term in &head.terms {
                    tuple.push(ground(term, &env, head.span)?);
                }
                self.satisfy(head.pred, tuple, stratum, &mut worklist)?;
            }
        }
        debug!(stratum, facts = %self.stats.total_facts(), "stratum quiescent");
        Ok(())
    }

    /// Insert or join a ground head tuple; on novelty, count it and wake the
    /// dependent clauses of this stratum.
    fn satisfy(
        &mut self,
        pred: Symbol,
        tuple: Tuple,
        stratum: usize,
        worklist: &mut VecDeque<(usize, Bindings)>,
    ) -> Result<()> {
        let novel = if let Some(lat) = self.stores.lattices.get_mut(&pred) {
            let mut key = tuple;
            let Some(value) = key.pop() else {
                return Ok(());
            };
            if lat.join(key.clone(), value) {
                // dependents see the joined element, not the contribution
                let mut fresh = key;
                fresh.push(lat.get(&fresh).clone());
                Some(fresh)
            } else {
                None
            }
        } else if let Some(rel) = self.stores.relations.get_mut(&pred) {
            rel.insert(tuple.clone()).then_some(tuple)
        } else {
            None
        };

        if let Some(fresh) = novel {
            *self.stats.facts_derived.entry(pred).or_insert(0) += 1;
            trace!(pred = %pred, tuple = ?fresh, "novel fact");
            self.enqueue_dependents(pred, &fresh, stratum, worklist);
        }
        Ok(())
    }

    fn enqueue_dependents(
        &self,
        pred: Symbol,
        tuple: &[Value],
        stratum: usize,
        worklist: &mut VecDeque<(usize, Bindings)>,
    ) {
        let Some(occurrences) = self.deps.get(&pred) else {
            return;
        };
        let is_lattice = self.stores.lattices.contains_key(&pred);
        for &(ci, li) in occurrences {
            if self.planned[ci].stratum != stratum {
                continue;
            }
            let fixlog_ir::Literal::Positive(atom) = &self.planned[ci].body[li] else {
                continue;
            };
            if let Some(seed) = seed_env(atom, tuple, is_lattice) {
                worklist.push_back((ci, seed));
            }
        }
    }

    fn into_model(self) -> Model {
        let mut relations = FxHashMap::default();
        for (pred, rel) in self.stores.relations {
            relations.insert(pred, rel.into_tuples());
        }
        let mut lattices = FxHashMap::default();
        for (pred, lat) in self.stores.lattices {
            lattices.insert(pred, lat.into_entries());
        }
        Model {
            relations,
            lattices,
            stats: self.stats,
        }
    }
}

/// Pre-bind a body atom's variables against the fresh tuple that woke it.
/// For a lattice atom only the key positions are matched structurally; a
/// ground value position goes through the lattice order at resolve time.
fn seed_env(atom: &Atom, tuple: &[Value], is_lattice: bool) -> Option<Bindings> {
    if atom.terms.len() != tuple.len() {
        return None;
    }
    let n = atom.terms.len();
    let key_len = if is_lattice { n - 1 } else { n };
    let mut env = Bindings::default();
    for (term, value) in atom.terms[..key_len].iter().zip(tuple) {
        if !match_term(term, value, &mut env) {
            return None;
        }
    }
    if is_lattice
        && let Term::Var(v) = &atom.terms[n - 1]
        && !env.contains_key(v)
    {
        env.insert(*v, tuple[n - 1].clone());
    }
    Some(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixlog_ir::{Interpretation, Literal};

    #[test]
    fn test_seed_env_matches_constants() {
        let atom = Atom::new("edge", vec![Term::val(1), Term::var("y")]);
        let seed = seed_env(&atom, &[Value::I32(1), Value::I32(2)], false).unwrap();
        assert_eq!(seed[&sym("y")], Value::I32(2));
        assert!(seed_env(&atom, &[Value::I32(9), Value::I32(2)], false).is_none());
    }

    #[test]
    fn test_seed_env_lattice_skips_ground_value() {
        let atom = Atom::new(
            "sign",
            vec![Term::var("x"), Term::val(Value::ctor("Pos", vec![]))],
        );
        // value position differs from the atom's constant: still a seed, the
        // lattice order decides at resolve time
        let seed = seed_env(
            &atom,
            &[Value::I32(1), Value::ctor("Top", vec![])],
            true,
        )
        .unwrap();
        assert_eq!(seed[&sym("x")], Value::I32(1));
    }

    #[test]
    fn test_solver_rejects_invalid_program() {
        let mut program = Program::new();
        program.declare("p", Interpretation::relation(1));
        program.rule(
            Atom::new("p", vec![Term::var("x")]),
            vec![Literal::pos("missing", vec![Term::var("x")])],
        );
        assert!(matches!(
            Solver::new(&program),
            Err(SolveError::UnknownPredicate { .. })
        ));
    }

    #[test]
    fn test_check_collects_multiple_diagnostics() {
        let mut program = Program::new();
        program.declare("p", Interpretation::relation(1));
        program.declare("q", Interpretation::relation(1));
        program.rule(
            Atom::new("p", vec![Term::var("x")]),
            vec![Literal::pos("missing", vec![Term::var("x")])],
        );
        program.rule(
            Atom::new("p", vec![Term::var("x")]),
            vec![Literal::neg("q", vec![Term::var("x")])],
        );
        program.rule(
            Atom::new("q", vec![Term::var("x")]),
            vec![Literal::neg("p", vec![Term::var("x")])],
        );

        let errors = check(&program);
        assert!(errors.len() >= 2);
        assert!(errors
            .iter()
            .any(|e| matches!(e, SolveError::UnknownPredicate { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SolveError::Unstratifiable { .. })));
    }
}
