//! Clause planning: static validation and well-moded body ordering.
//!
//! Runs once per program, before stratification. Produces the reordered
//! clause bodies the resolver folds over, pre-grounds facts, and collects
//! every static diagnostic: unknown or misused symbols, arity mismatches,
//! non-ground facts, unsafe negation, and variables that no positive atom
//! can bind.

use fixlog_ir::{Atom, Clause, CompareOp, Literal, Program, Span, Symbol, Term, Tuple};
use rustc_hash::FxHashSet;

use crate::error::SolveError;
use crate::eval::{Bindings, ground};

/// A clause with its body in well-moded evaluation order.
#[derive(Debug, Clone)]
pub(crate) struct PlannedClause {
    pub head: Atom,
    pub body: Vec<Literal>,
    pub stratum: usize,
}

/// A fact with its head pre-ground to a tuple.
#[derive(Debug, Clone)]
pub(crate) struct PlannedFact {
    pub pred: Symbol,
    pub tuple: Tuple,
    pub stratum: usize,
}

pub(crate) struct PlanOutput {
    pub clauses: Vec<PlannedClause>,
    pub facts: Vec<PlannedFact>,
    pub errors: Vec<SolveError>,
}

pub(crate) fn plan(program: &Program) -> PlanOutput {
    let mut out = PlanOutput {
        clauses: Vec::new(),
        facts: Vec::new(),
        errors: Vec::new(),
    };

    // Declarations themselves: a predicate needs at least one position.
    let mut declared: Vec<(&Symbol, usize)> = program
        .interpretations
        .iter()
        .map(|(pred, interp)| (pred, interp.arity()))
        .collect();
    declared.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
    for (pred, arity) in declared {
        if arity == 0 {
            out.errors.push(SolveError::ArityMismatch {
                pred: *pred,
                expected: 1,
                found: 0,
                span: Span::NONE,
            });
        }
    }

    for fact in &program.facts {
        plan_fact(program, fact, &mut out);
    }
    for clause in &program.clauses {
        match plan_clause(program, clause) {
            Ok(planned) => out.clauses.push(planned),
            Err(mut errors) => out.errors.append(&mut errors),
        }
    }
    out
}

/// Head symbols must be declared predicates; builtin function names are not
/// derivable.
fn check_head_pred(program: &Program, head: &Atom) -> Option<SolveError> {
    if program.functions.contains_key(&head.pred) {
        return Some(SolveError::NonRelationalHead {
            pred: head.pred,
            span: head.span,
        });
    }
    match program.interpretation(&head.pred) {
        None => Some(SolveError::UnknownPredicate {
            pred: head.pred,
            span: head.span,
        }),
        Some(interp) if interp.arity() != head.arity() => Some(SolveError::ArityMismatch {
            pred: head.pred,
            expected: interp.arity(),
            found: head.arity(),
            span: head.span,
        }),
        Some(_) => None,
    }
}

fn plan_fact(program: &Program, fact: &Clause, out: &mut PlanOutput) {
    let head = &fact.head;
    if let Some(err) = check_head_pred(program, head) {
        out.errors.push(err);
        return;
    }
    let env = Bindings::default();
    let mut tuple = Vec::with_capacity(head.terms.len());
    for term in &head.terms {
        match ground(term, &env, head.span) {
            Ok(value) => tuple.push(value),
            Err(err) => {
                out.errors.push(err);
                return;
            }
        }
    }
    out.facts.push(PlannedFact {
        pred: head.pred,
        tuple,
        stratum: 0,
    });
}

fn plan_clause(program: &Program, clause: &Clause) -> Result<PlannedClause, Vec<SolveError>> {
    let mut errors = Vec::new();

    if let Some(err) = check_head_pred(program, &clause.head) {
        errors.push(err);
    }

    for lit in &clause.body {
        match lit {
            Literal::Positive(atom) | Literal::Negative(atom) => {
                match program.interpretation(&atom.pred) {
                    None => errors.push(SolveError::UnknownPredicate {
                        pred: atom.pred,
                        span: atom.span,
                    }),
                    Some(interp) if interp.arity() != atom.arity() => {
                        errors.push(SolveError::ArityMismatch {
                            pred: atom.pred,
                            expected: interp.arity(),
                            found: atom.arity(),
                            span: atom.span,
                        });
                    }
                    Some(interp) => {
                        if interp.is_lattice() && matches!(lit, Literal::Negative(_)) {
                            errors.push(SolveError::LatticeContract {
                                pred: atom.pred,
                                message: "negation over a lattice predicate".into(),
                                span: atom.span,
                            });
                        }
                    }
                }
            }
            Literal::Func(fa) => {
                if !program.functions.contains_key(&fa.func) {
                    errors.push(SolveError::UnknownPredicate {
                        pred: fa.func,
                        span: fa.span,
                    });
                }
            }
            Literal::Compare(_) => {}
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let body = order_body(program, &clause.body);
    check_bindings(&clause.head, &body, program, &mut errors);

    if errors.is_empty() {
        Ok(PlannedClause {
            head: clause.head.clone(),
            body,
            stratum: 0,
        })
    } else {
        Err(errors)
    }
}

/// Well-moded order: positive relational atoms first, then lattice reads,
/// then negated atoms, then comparisons and functional atoms. Declaration
/// order breaks ties within each group, for reproducibility.
fn order_body(program: &Program, body: &[Literal]) -> Vec<Literal> {
    let is_lattice =
        |pred: &Symbol| program.interpretation(pred).is_some_and(|i| i.is_lattice());

    let mut positives = Vec::new();
    let mut lattice_reads = Vec::new();
    let mut negations = Vec::new();
    let mut functional = Vec::new();
    for lit in body {
        match lit {
            Literal::Positive(atom) if is_lattice(&atom.pred) => lattice_reads.push(lit.clone()),
            Literal::Positive(_) => positives.push(lit.clone()),
            Literal::Negative(_) => negations.push(lit.clone()),
            Literal::Compare(_) | Literal::Func(_) => functional.push(lit.clone()),
        }
    }

    let mut ordered = positives;
    ordered.append(&mut lattice_reads);
    ordered.append(&mut negations);
    ordered.append(&mut functional);
    ordered
}

/// Walk the ordered body tracking which variables are bound, flagging every
/// use that needs a ground value first. Finally the head must be fully
/// bindable, so derived facts are ground.
fn check_bindings(
    head: &Atom,
    body: &[Literal],
    program: &Program,
    errors: &mut Vec<SolveError>,
) {
    let is_lattice =
        |pred: &Symbol| program.interpretation(pred).is_some_and(|i| i.is_lattice());
    let mut bound: FxHashSet<Symbol> = FxHashSet::default();

    let free_vars = |term: &Term, bound: &FxHashSet<Symbol>| -> Vec<Symbol> {
        let mut vars = Vec::new();
        term.collect_vars(&mut vars);
        let mut seen = FxHashSet::default();
        vars.retain(|v| !bound.contains(v) && seen.insert(*v));
        vars
    };

    for lit in body {
        match lit {
            Literal::Positive(atom) if is_lattice(&atom.pred) => {
                let n = atom.terms.len();
                for term in &atom.terms[..n - 1] {
                    for var in free_vars(term, &bound) {
                        errors.push(SolveError::UnboundVariable {
                            var,
                            span: atom.span,
                        });
                    }
                }
                // the value position binds against the stored element
                let mut vars = Vec::new();
                atom.terms[n - 1].collect_vars(&mut vars);
                bound.extend(vars);
            }
            Literal::Positive(atom) => {
                let mut vars = Vec::new();
                for term in &atom.terms {
                    term.collect_vars(&mut vars);
                }
                bound.extend(vars);
            }
            Literal::Negative(atom) => {
                for term in &atom.terms {
                    for var in free_vars(term, &bound) {
                        errors.push(SolveError::UngroundNegation {
                            pred: atom.pred,
                            var,
                            span: atom.span,
                        });
                    }
                }
            }
            Literal::Compare(c) => {
                let left_free = free_vars(&c.left, &bound);
                let right_free = free_vars(&c.right, &bound);
                match (left_free.is_empty(), right_free.is_empty()) {
                    (true, true) => {}
                    (false, true) if c.op == CompareOp::Eq => bound.extend(left_free),
                    (true, false) if c.op == CompareOp::Eq => bound.extend(right_free),
                    _ => {
                        let var = left_free
                            .into_iter()
                            .chain(right_free)
                            .next()
                            .unwrap_or_else(|| fixlog_ir::sym("_"));
                        errors.push(SolveError::UnboundVariable { var, span: c.span });
                    }
                }
            }
            Literal::Func(fa) => {
                for arg in &fa.args {
                    for var in free_vars(arg, &bound) {
                        errors.push(SolveError::UnboundVariable { var, span: fa.span });
                    }
                }
                let mut vars = Vec::new();
                fa.result.collect_vars(&mut vars);
                bound.extend(vars);
            }
        }
    }

    for term in &head.terms {
        for var in free_vars(term, &bound) {
            errors.push(SolveError::UnboundVariable {
                var,
                span: head.span,
            });
        }
    }
}
