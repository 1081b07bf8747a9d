//! Dependency graph and stratification.
//!
//! Builds the head-to-body dependency graph over predicate symbols, condenses
//! it into strongly connected components, rejects programs with a negative
//! edge inside a component, and assigns each predicate a stratum: negation
//! and lattice aggregation cross strictly downward, positive dependencies
//! stay within or below.
//!
//! A lattice body atom is a negative edge only when the rule head is
//! relational: collapsing a lattice into a relation needs the lattice map
//! complete. Lattice-into-lattice recursion stays positive — the join
//! discipline keeps it monotone and the ascending chain condition bounds it.

use fixlog_ir::{Literal, Program, Symbol};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::SolveError;

type Edges = FxHashMap<Symbol, Vec<(Symbol, bool)>>;

/// Result of stratification.
#[derive(Debug, Clone, Default)]
pub(crate) struct Stratification {
    /// Predicate -> stratum number (0 = bottom stratum).
    pub strata: FxHashMap<Symbol, usize>,
    /// Total number of strata.
    pub num_strata: usize,
}

/// Stratify a program. Fails with `Unstratifiable` if any strongly connected
/// component contains a negated or lattice-aggregating dependency.
pub(crate) fn stratify(program: &Program) -> Result<Stratification, SolveError> {
    // Deterministic node order: every mentioned predicate, sorted by name.
    let mut nodes: Vec<Symbol> = program.interpretations.keys().copied().collect();
    for clause in program.facts.iter().chain(&program.clauses) {
        nodes.push(clause.head.pred);
        for lit in &clause.body {
            if let Literal::Positive(a) | Literal::Negative(a) = lit {
                nodes.push(a.pred);
            }
        }
    }
    nodes.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
    nodes.dedup();

    let is_lattice =
        |p: &Symbol| program.interpretation(p).is_some_and(|i| i.is_lattice());

    let mut edges: Edges = FxHashMap::default();
    for clause in &program.clauses {
        let head = clause.head.pred;
        let head_is_lattice = is_lattice(&head);
        for lit in &clause.body {
            let (pred, negative) = match lit {
                Literal::Positive(a) => (a.pred, is_lattice(&a.pred) && !head_is_lattice),
                Literal::Negative(a) => (a.pred, true),
                Literal::Compare(_) | Literal::Func(_) => continue,
            };
            edges.entry(head).or_default().push((pred, negative));
        }
    }

    let sccs = tarjan(&nodes, &edges);

    let mut scc_of: FxHashMap<Symbol, usize> = FxHashMap::default();
    for (i, scc) in sccs.iter().enumerate() {
        for &p in scc {
            scc_of.insert(p, i);
        }
    }

    // A negative edge inside a component means negation (or aggregation)
    // through recursion.
    for scc in &sccs {
        for &p in scc {
            let Some(out) = edges.get(&p) else { continue };
            for &(q, negative) in out {
                if negative && scc_of[&q] == scc_of[&p] {
                    return Err(SolveError::Unstratifiable {
                        pred: p,
                        cycle: scc.clone(),
                    });
                }
            }
        }
    }

    // Tarjan emits components dependencies-first, so every out-edge of a
    // component points at an already-numbered one.
    let mut scc_stratum = vec![0usize; sccs.len()];
    for (i, scc) in sccs.iter().enumerate() {
        let mut stratum = 0;
        for &p in scc {
            let Some(out) = edges.get(&p) else { continue };
            for &(q, negative) in out {
                let j = scc_of[&q];
                if j != i {
                    stratum = stratum.max(scc_stratum[j] + negative as usize);
                }
            }
        }
        scc_stratum[i] = stratum;
    }

    let mut strata = FxHashMap::default();
    let mut num_strata = 0;
    for (i, scc) in sccs.iter().enumerate() {
        for &p in scc {
            strata.insert(p, scc_stratum[i]);
        }
        num_strata = num_strata.max(scc_stratum[i] + 1);
    }
    Ok(Stratification { strata, num_strata })
}

/// Tarjan's strongly-connected-components algorithm; components come out in
/// reverse topological order of the condensation.
fn tarjan(nodes: &[Symbol], edges: &Edges) -> Vec<Vec<Symbol>> {
    struct State<'a> {
        edges: &'a Edges,
        index: FxHashMap<Symbol, usize>,
        low: FxHashMap<Symbol, usize>,
        on_stack: FxHashSet<Symbol>,
        stack: Vec<Symbol>,
        next_index: usize,
        sccs: Vec<Vec<Symbol>>,
    }

    fn connect(state: &mut State, v: Symbol) {
        state.index.insert(v, state.next_index);
        state.low.insert(v, state.next_index);
        state.next_index += 1;
        state.stack.push(v);
        state.on_stack.insert(v);

        let targets: Vec<Symbol> = state
            .edges
            .get(&v)
            .map(|out| out.iter().map(|&(q, _)| q).collect())
            .unwrap_or_default();
        for q in targets {
            if !state.index.contains_key(&q) {
                connect(state, q);
                let low_q = state.low[&q];
                if low_q < state.low[&v] {
                    state.low.insert(v, low_q);
                }
            } else if state.on_stack.contains(&q) {
                let index_q = state.index[&q];
                if index_q < state.low[&v] {
                    state.low.insert(v, index_q);
                }
            }
        }

        if state.low[&v] == state.index[&v] {
            let mut scc = Vec::new();
            while let Some(w) = state.stack.pop() {
                state.on_stack.remove(&w);
                scc.push(w);
                if w == v {
                    break;
                }
            }
            scc.reverse();
            state.sccs.push(scc);
        }
    }

    let mut state = State {
        edges,
        index: FxHashMap::default(),
        low: FxHashMap::default(),
        on_stack: FxHashSet::default(),
        stack: Vec::new(),
        next_index: 0,
        sccs: Vec::new(),
    };
    for &v in nodes {
        if !state.index.contains_key(&v) {
            connect(&mut state, v);
        }
    }
    state.sccs
}
