//! Predicate evaluation: grounding, structural matching, environment
//! extension per body literal, and the clause resolver.

use fixlog_ir::{Atom, BuiltinFn, CompareOp, Constraint, FuncAtom, Interpretation, Literal,
                Program, Span, Symbol, Term, Tuple, Value};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Result, SolveError};
use crate::lattice::LatticeMap;
use crate::plan::PlannedClause;
use crate::relation::Relation;

/// Variable bindings during rule evaluation. Extension is by clone: an
/// environment handed to a later atom never mutates the one a sibling
/// branch still holds.
pub type Bindings = FxHashMap<Symbol, Value>;

/// The mutable store side of a solve: one relation or lattice map per
/// declared predicate.
pub(crate) struct Stores {
    pub(crate) relations: FxHashMap<Symbol, Relation>,
    pub(crate) lattices: FxHashMap<Symbol, LatticeMap>,
}

impl Stores {
    pub(crate) fn for_program(program: &Program) -> Stores {
        let mut relations = FxHashMap::default();
        let mut lattices = FxHashMap::default();
        for (&pred, interp) in &program.interpretations {
            match interp {
                Interpretation::Relation { arity } => {
                    relations.insert(pred, Relation::new(*arity));
                }
                Interpretation::Lattice {
                    arity,
                    bottom,
                    leq,
                    lub,
                } => {
                    lattices.insert(
                        pred,
                        LatticeMap::new(arity - 1, bottom.clone(), leq.clone(), lub.clone()),
                    );
                }
            }
        }
        Stores {
            relations,
            lattices,
        }
    }
}

/// Ground a term under an environment: constants stand for themselves,
/// variables are looked up, constructor terms ground recursively.
pub(crate) fn ground(term: &Term, env: &Bindings, span: Span) -> Result<Value> {
    match term {
        Term::Const(v) => Ok(v.clone()),
        Term::Var(v) => env
            .get(v)
            .cloned()
            .ok_or(SolveError::UnboundVariable { var: *v, span }),
        Term::Ctor(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(ground(arg, env, span)?);
            }
            Ok(Value::Ctor(*name, values))
        }
    }
}

/// Unify a term against a ground value, extending `env` in place. On failure
/// the environment may hold partial bindings; callers work on a clone.
pub(crate) fn match_term(term: &Term, value: &Value, env: &mut Bindings) -> bool {
    match term {
        Term::Const(v) => v == value,
        Term::Var(x) => match env.get(x) {
            Some(bound) => bound == value,
            None => {
                env.insert(*x, value.clone());
                true
            }
        },
        Term::Ctor(name, args) => match value {
            Value::Ctor(vname, vargs) if vname == name && vargs.len() == args.len() => args
                .iter()
                .zip(vargs)
                .all(|(term, value)| match_term(term, value, env)),
            _ => false,
        },
    }
}

/// Unify an atom's terms against a tuple, returning the extended environment.
pub(crate) fn match_terms(terms: &[Term], tuple: &[Value], env: &Bindings) -> Option<Bindings> {
    if terms.len() != tuple.len() {
        return None;
    }
    let mut env = env.clone();
    for (term, value) in terms.iter().zip(tuple) {
        if !match_term(term, value, &mut env) {
            return None;
        }
    }
    Some(env)
}

/// Evaluate one body literal under a partial environment, producing every
/// extension that satisfies it. An empty result models failure.
pub(crate) fn extend(
    lit: &Literal,
    stores: &Stores,
    functions: &FxHashMap<Symbol, BuiltinFn>,
    env: &Bindings,
) -> Result<Vec<Bindings>> {
    match lit {
        Literal::Positive(atom) => match stores.lattices.get(&atom.pred) {
            Some(lat) => extend_lattice(atom, lat, env),
            None => extend_relational(atom, stores, env),
        },
        Literal::Negative(atom) => extend_negated(atom, stores, env),
        Literal::Compare(c) => extend_compare(c, env),
        Literal::Func(fa) => extend_func(fa, functions, env),
    }
}

/// Positive relational atom: enumerate tuples matching the bound prefix and
/// unify the remaining positions.
fn extend_relational(atom: &Atom, stores: &Stores, env: &Bindings) -> Result<Vec<Bindings>> {
    let Some(rel) = stores.relations.get(&atom.pred) else {
        return Ok(Vec::new());
    };

    // Longest leading run of constants and already-bound variables.
    let mut prefix: Tuple = Vec::new();
    for term in &atom.terms {
        match term {
            Term::Const(v) => prefix.push(v.clone()),
            Term::Var(x) if env.contains_key(x) => prefix.push(env[x].clone()),
            _ => break,
        }
    }

    let mut out = Vec::new();
    for tuple in rel.lookup(&prefix) {
        if let Some(next) = match_terms(&atom.terms, tuple, env) {
            out.push(next);
        }
    }
    Ok(out)
}

/// Negation as failure. The atom must be ground here; the planner guarantees
/// it for well-moded programs, and `p` is complete because it lives in a
/// lower stratum.
fn extend_negated(atom: &Atom, stores: &Stores, env: &Bindings) -> Result<Vec<Bindings>> {
    let mut tuple = Vec::with_capacity(atom.terms.len());
    for term in &atom.terms {
        match ground(term, env, atom.span) {
            Ok(v) => tuple.push(v),
            Err(SolveError::UnboundVariable { var, .. }) => {
                return Err(SolveError::UngroundNegation {
                    pred: atom.pred,
                    var,
                    span: atom.span,
                });
            }
            Err(e) => return Err(e),
        }
    }
    let present = stores
        .relations
        .get(&atom.pred)
        .is_some_and(|rel| rel.contains(&tuple));
    Ok(if present { Vec::new() } else { vec![env.clone()] })
}

/// Lattice atom in a body: ground the key, read the stored element. A free
/// value position binds to it; a ground value position is an upper
/// approximation, satisfied iff the stored element is below it.
fn extend_lattice(atom: &Atom, lat: &LatticeMap, env: &Bindings) -> Result<Vec<Bindings>> {
    let n = atom.terms.len();
    let mut key = Vec::with_capacity(n - 1);
    for term in &atom.terms[..n - 1] {
        key.push(ground(term, env, atom.span)?);
    }
    let stored = lat.get(&key);
    let value_term = &atom.terms[n - 1];
    match ground(value_term, env, atom.span) {
        Ok(v) => Ok(if lat.leq(stored, &v) {
            vec![env.clone()]
        } else {
            Vec::new()
        }),
        Err(_) => {
            let mut next = env.clone();
            Ok(if match_term(value_term, stored, &mut next) {
                vec![next]
            } else {
                Vec::new()
            })
        }
    }
}

/// Comparison constraint. `=` against exactly one unbound side binds it by
/// structural match; everything else requires both sides ground.
fn extend_compare(c: &Constraint, env: &Bindings) -> Result<Vec<Bindings>> {
    match (ground(&c.left, env, c.span), ground(&c.right, env, c.span)) {
        (Ok(left), Ok(right)) => {
            let holds = match c.op {
                CompareOp::Eq => left == right,
                CompareOp::Ne => left != right,
                op => left
                    .partial_cmp_val(&right)
                    .is_some_and(|ord| op.holds(ord)),
            };
            Ok(if holds { vec![env.clone()] } else { Vec::new() })
        }
        (Err(_), Ok(right)) if c.op == CompareOp::Eq => {
            let mut next = env.clone();
            Ok(if match_term(&c.left, &right, &mut next) {
                vec![next]
            } else {
                Vec::new()
            })
        }
        (Ok(left), Err(_)) if c.op == CompareOp::Eq => {
            let mut next = env.clone();
            Ok(if match_term(&c.right, &left, &mut next) {
                vec![next]
            } else {
                Vec::new()
            })
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

/// Functional atom `r = f(args…)`: arguments must be ground; the computed
/// value binds a free result or is compared against a ground one. A builtin
/// declining its arguments fails the atom silently.
fn extend_func(
    fa: &FuncAtom,
    functions: &FxHashMap<Symbol, BuiltinFn>,
    env: &Bindings,
) -> Result<Vec<Bindings>> {
    let mut args = Vec::with_capacity(fa.args.len());
    for arg in &fa.args {
        args.push(ground(arg, env, fa.span)?);
    }
    let Some(f) = functions.get(&fa.func) else {
        return Ok(Vec::new());
    };
    match f(&args) {
        None => Ok(Vec::new()),
        Some(value) => match ground(&fa.result, env, fa.span) {
            Ok(expected) => Ok(if expected == value {
                vec![env.clone()]
            } else {
                Vec::new()
            }),
            Err(_) => {
                let mut next = env.clone();
                Ok(if match_term(&fa.result, &value, &mut next) {
                    vec![next]
                } else {
                    Vec::new()
                })
            }
        },
    }
}

/// Resolve a clause: left fold of `extend` over the well-moded body starting
/// from the seed environment. The frontier is deduplicated by value equality
/// at every step to avoid redundant head derivations.
pub(crate) fn resolve(
    clause: &PlannedClause,
    stores: &Stores,
    functions: &FxHashMap<Symbol, BuiltinFn>,
    seed: Bindings,
) -> Result<Vec<Bindings>> {
    let mut frontier = vec![seed];
    for lit in &clause.body {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        let mut seen = FxHashSet::default();
        for env in &frontier {
            for ext in extend(lit, stores, functions, env)? {
                if seen.insert(env_key(&ext)) {
                    next.push(ext);
                }
            }
        }
        frontier = next;
    }
    Ok(frontier)
}

fn env_key(env: &Bindings) -> Vec<(Symbol, Value)> {
    let mut kv: Vec<(Symbol, Value)> = env.iter().map(|(k, v)| (*k, v.clone())).collect();
    kv.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
    kv
}
