//! End-to-end solver scenarios: closure and recursion shapes, stratified
//! negation, lattice fixpoints, diagnostics and cancellation.

use std::collections::BTreeSet;

use fixlog_eval::{CancelToken, Model, SolveError, check, solve, solve_with_cancel};
use fixlog_ir::{Atom, CompareOp, Interpretation, Literal, Program, Term, Value};

fn var(name: &str) -> Term {
    Term::var(name)
}

/// Extract a 1-column i32 relation from the model.
fn rel1(model: &Model, name: &str) -> BTreeSet<i32> {
    model
        .relation(name)
        .iter()
        .map(|t| match t.as_slice() {
            [Value::I32(a)] => *a,
            other => panic!("expected 1-col i32, got {other:?}"),
        })
        .collect()
}

/// Extract a 2-column i32 relation from the model.
fn rel2(model: &Model, name: &str) -> BTreeSet<(i32, i32)> {
    model
        .relation(name)
        .iter()
        .map(|t| match t.as_slice() {
            [Value::I32(a), Value::I32(b)] => (*a, *b),
            other => panic!("expected 2-col i32, got {other:?}"),
        })
        .collect()
}

// ─── Sign lattice fixture ───────────────────────────────────────────

fn sign(name: &str) -> Value {
    Value::ctor(name, vec![])
}

fn sign_leq(a: &Value, b: &Value) -> bool {
    a == b || *a == sign("Bot") || *b == sign("Top")
}

fn sign_lub(a: &Value, b: &Value) -> Value {
    if sign_leq(a, b) {
        b.clone()
    } else if sign_leq(b, a) {
        a.clone()
    } else {
        sign("Top")
    }
}

fn declare_sign(program: &mut Program) {
    program.declare(
        "sign",
        Interpretation::lattice(2, sign("Bot"), sign_leq, sign_lub),
    );
    program.function("lub", |args| match args {
        [a, b] => Some(sign_lub(a, b)),
        _ => None,
    });
}

// ─── Closure and recursion ──────────────────────────────────────────

#[test]
fn transitive_closure() {
    let mut program = Program::new();
    program.declare("edge", Interpretation::relation(2));
    program.declare("path", Interpretation::relation(2));
    for (a, b) in [(1, 2), (2, 3), (3, 4)] {
        program.fact(Atom::new("edge", vec![Term::val(a), Term::val(b)]));
    }
    program.rule(
        Atom::new("path", vec![var("x"), var("y")]),
        vec![Literal::pos("edge", vec![var("x"), var("y")])],
    );
    program.rule(
        Atom::new("path", vec![var("x"), var("z")]),
        vec![
            Literal::pos("path", vec![var("x"), var("y")]),
            Literal::pos("edge", vec![var("y"), var("z")]),
        ],
    );

    let model = solve(&program).unwrap();
    let expected: BTreeSet<(i32, i32)> = [(1, 2), (2, 3), (3, 4), (1, 3), (2, 4), (1, 4)]
        .into_iter()
        .collect();
    assert_eq!(rel2(&model, "path"), expected);
    assert_eq!(model.stats.facts_derived[&fixlog_ir::sym("path")], 6);
}

#[test]
fn mutual_positive_recursion() {
    // a(c) :- b(c).  b(c) :- a(c).  a(1).
    let mut program = Program::new();
    program.declare("a", Interpretation::relation(1));
    program.declare("b", Interpretation::relation(1));
    program.fact(Atom::new("a", vec![Term::val(1)]));
    program.rule(
        Atom::new("a", vec![var("c")]),
        vec![Literal::pos("b", vec![var("c")])],
    );
    program.rule(
        Atom::new("b", vec![var("c")]),
        vec![Literal::pos("a", vec![var("c")])],
    );

    let model = solve(&program).unwrap();
    assert_eq!(rel1(&model, "a"), BTreeSet::from([1]));
    assert_eq!(rel1(&model, "b"), BTreeSet::from([1]));
}

#[test]
fn long_positive_cycle_accepts_and_stays_empty() {
    // foo1 … foo10 in a single positive cycle, no facts
    let mut program = Program::new();
    for i in 1..=10 {
        program.declare(&format!("foo{i}"), Interpretation::relation(1));
    }
    for i in 1..=10 {
        let next = if i == 10 { 1 } else { i + 1 };
        program.rule(
            Atom::new(&format!("foo{i}"), vec![var("x")]),
            vec![Literal::pos(&format!("foo{next}"), vec![var("x")])],
        );
    }

    let model = solve(&program).unwrap();
    for i in 1..=10 {
        assert!(model.relation(&format!("foo{i}")).is_empty());
    }
}

#[test]
fn constructor_patterns_in_body() {
    // q(x) :- p(Pair(x, y)).
    let mut program = Program::new();
    program.declare("p", Interpretation::relation(1));
    program.declare("q", Interpretation::relation(1));
    program.fact(Atom::new(
        "p",
        vec![Term::val(Value::ctor(
            "Pair",
            vec![Value::I32(1), Value::I32(2)],
        ))],
    ));
    program.rule(
        Atom::new("q", vec![var("x")]),
        vec![Literal::pos(
            "p",
            vec![Term::ctor("Pair", vec![var("x"), var("y")])],
        )],
    );

    let model = solve(&program).unwrap();
    assert_eq!(rel1(&model, "q"), BTreeSet::from([1]));
}

// ─── Stratified negation ────────────────────────────────────────────

#[test]
fn stratified_negation() {
    // q(x) :- s(x), !p(x).   p = {1, 2}, s = {1, 2, 3}  =>  q = {3}
    let mut program = Program::new();
    program.declare("p", Interpretation::relation(1));
    program.declare("s", Interpretation::relation(1));
    program.declare("q", Interpretation::relation(1));
    for v in [1, 2] {
        program.fact(Atom::new("p", vec![Term::val(v)]));
    }
    for v in [1, 2, 3] {
        program.fact(Atom::new("s", vec![Term::val(v)]));
    }
    program.rule(
        Atom::new("q", vec![var("x")]),
        vec![
            Literal::pos("s", vec![var("x")]),
            Literal::neg("p", vec![var("x")]),
        ],
    );

    let model = solve(&program).unwrap();
    assert_eq!(rel1(&model, "q"), BTreeSet::from([3]));
}

#[test]
fn unstratifiable_program_rejected() {
    // a(x) :- !b(x).  b(x) :- !a(x).  — with a binder so only the cycle is at fault
    let mut program = Program::new();
    program.declare("u", Interpretation::relation(1));
    program.declare("a", Interpretation::relation(1));
    program.declare("b", Interpretation::relation(1));
    program.fact(Atom::new("u", vec![Term::val(1)]));
    program.rule(
        Atom::new("a", vec![var("x")]),
        vec![
            Literal::pos("u", vec![var("x")]),
            Literal::neg("b", vec![var("x")]),
        ],
    );
    program.rule(
        Atom::new("b", vec![var("x")]),
        vec![
            Literal::pos("u", vec![var("x")]),
            Literal::neg("a", vec![var("x")]),
        ],
    );

    match solve(&program) {
        Err(SolveError::Unstratifiable { cycle, .. }) => {
            let names: BTreeSet<&str> = cycle.iter().map(|s| s.as_ref().as_str()).collect();
            assert_eq!(names, BTreeSet::from(["a", "b"]));
        }
        other => panic!("expected Unstratifiable, got {other:?}"),
    }
}

// ─── Lattice semantics ──────────────────────────────────────────────

#[test]
fn sign_lattice_fixpoint() {
    // sign(x, Pos) :- constant(x, n), n > 0.        (and Zero/Neg variants)
    // sign(x, w) :- phi(x, y, z), sign(y, a), sign(z, b), w = lub(a, b).
    let mut program = Program::new();
    program.declare("constant", Interpretation::relation(2));
    program.declare("phi", Interpretation::relation(3));
    declare_sign(&mut program);

    for (op, result) in [
        (CompareOp::Gt, "Pos"),
        (CompareOp::Eq, "Zero"),
        (CompareOp::Lt, "Neg"),
    ] {
        program.rule(
            Atom::new("sign", vec![var("x"), Term::val(sign(result))]),
            vec![
                Literal::pos("constant", vec![var("x"), var("n")]),
                Literal::compare(var("n"), op, Term::val(0)),
            ],
        );
    }
    program.rule(
        Atom::new("sign", vec![var("x"), var("w")]),
        vec![
            Literal::pos("phi", vec![var("x"), var("y"), var("z")]),
            Literal::pos("sign", vec![var("y"), var("a")]),
            Literal::pos("sign", vec![var("z"), var("b")]),
            Literal::func(var("w"), "lub", vec![var("a"), var("b")]),
        ],
    );

    program.fact(Atom::new(
        "constant",
        vec![Term::val("a"), Term::val(1)],
    ));
    program.fact(Atom::new(
        "constant",
        vec![Term::val("b"), Term::val(-1)],
    ));
    program.fact(Atom::new(
        "constant",
        vec![Term::val("z"), Term::val(0)],
    ));
    program.fact(Atom::new(
        "phi",
        vec![Term::val("c"), Term::val("a"), Term::val("b")],
    ));
    program.fact(Atom::new(
        "phi",
        vec![Term::val("d"), Term::val("a"), Term::val("a")],
    ));

    let model = solve(&program).unwrap();
    let at = |key: &str| model.lattice_value("sign", &[Value::str(key)]).unwrap();
    assert_eq!(at("a"), &sign("Pos"));
    assert_eq!(at("b"), &sign("Neg"));
    assert_eq!(at("z"), &sign("Zero"));
    assert_eq!(at("c"), &sign("Top")); // lub(Pos, Neg)
    assert_eq!(at("d"), &sign("Pos")); // lub(Pos, Pos)
}

#[test]
fn conflicting_joins_reach_top() {
    // sign(x, Pos) :- u(x).   sign(x, Neg) :- u(x).   =>  Top
    let mut program = Program::new();
    program.declare("u", Interpretation::relation(1));
    declare_sign(&mut program);
    program.fact(Atom::new("u", vec![Term::val("v")]));
    program.rule(
        Atom::new("sign", vec![var("x"), Term::val(sign("Pos"))]),
        vec![Literal::pos("u", vec![var("x")])],
    );
    program.rule(
        Atom::new("sign", vec![var("x"), Term::val(sign("Neg"))]),
        vec![Literal::pos("u", vec![var("x")])],
    );

    let model = solve(&program).unwrap();
    assert_eq!(
        model.lattice_value("sign", &[Value::str("v")]).unwrap(),
        &sign("Top")
    );
}

#[test]
fn ground_lattice_value_is_upper_approximation() {
    // at_most_pos(x) :- u(x), sign(x, Pos).
    let mut program = Program::new();
    program.declare("u", Interpretation::relation(1));
    program.declare("at_most_pos", Interpretation::relation(1));
    declare_sign(&mut program);
    for name in ["a", "b"] {
        program.fact(Atom::new("u", vec![Term::val(name)]));
    }
    program.rule(
        Atom::new("sign", vec![var("x"), Term::val(sign("Pos"))]),
        vec![
            Literal::pos("u", vec![var("x")]),
            Literal::compare(var("x"), CompareOp::Eq, Term::val("a")),
        ],
    );
    program.rule(
        Atom::new("sign", vec![var("x"), Term::val(sign("Top"))]),
        vec![
            Literal::pos("u", vec![var("x")]),
            Literal::compare(var("x"), CompareOp::Eq, Term::val("b")),
        ],
    );
    program.rule(
        Atom::new("at_most_pos", vec![var("x")]),
        vec![
            Literal::pos("u", vec![var("x")]),
            Literal::pos("sign", vec![var("x"), Term::val(sign("Pos"))]),
        ],
    );

    let model = solve(&program).unwrap();
    let names: BTreeSet<String> = model
        .relation("at_most_pos")
        .iter()
        .map(|t| t[0].to_string())
        .collect();
    // a sits at Pos (<= Pos); b was pushed to Top (not <= Pos)
    assert_eq!(names, BTreeSet::from(["a".to_string()]));
}

#[test]
fn lattice_aggregation_waits_for_lower_stratum() {
    // settled(x) :- u(x), sign(x, s).  — relational head over a lattice read
    let mut program = Program::new();
    program.declare("u", Interpretation::relation(1));
    program.declare("settled", Interpretation::relation(1));
    declare_sign(&mut program);
    program.fact(Atom::new("u", vec![Term::val("a")]));
    program.rule(
        Atom::new("sign", vec![var("x"), Term::val(sign("Pos"))]),
        vec![Literal::pos("u", vec![var("x")])],
    );
    program.rule(
        Atom::new("settled", vec![var("x")]),
        vec![
            Literal::pos("u", vec![var("x")]),
            Literal::pos("sign", vec![var("x"), var("s")]),
        ],
    );

    let model = solve(&program).unwrap();
    assert_eq!(model.relation("settled").len(), 1);
}

// ─── Functional atoms ───────────────────────────────────────────────

#[test]
fn builtin_binds_result_variable() {
    // doubled(x, y) :- n(x), y = double(x).
    let mut program = Program::new();
    program.declare("n", Interpretation::relation(1));
    program.declare("doubled", Interpretation::relation(2));
    program.function("double", |args| {
        Some(Value::I32(i32::try_from(args[0].as_i64()? * 2).ok()?))
    });
    for v in [2, 5] {
        program.fact(Atom::new("n", vec![Term::val(v)]));
    }
    program.rule(
        Atom::new("doubled", vec![var("x"), var("y")]),
        vec![
            Literal::pos("n", vec![var("x")]),
            Literal::func(var("y"), "double", vec![var("x")]),
        ],
    );

    let model = solve(&program).unwrap();
    assert_eq!(rel2(&model, "doubled"), BTreeSet::from([(2, 4), (5, 10)]));
}

#[test]
fn declining_builtin_fails_the_atom() {
    // half(x, y) :- n(x), y = half_of(x).   — half_of declines odd numbers
    let mut program = Program::new();
    program.declare("n", Interpretation::relation(1));
    program.declare("half", Interpretation::relation(2));
    program.function("half_of", |args| {
        let v = args[0].as_i64()?;
        (v % 2 == 0).then(|| Value::I32((v / 2) as i32))
    });
    for v in [3, 4] {
        program.fact(Atom::new("n", vec![Term::val(v)]));
    }
    program.rule(
        Atom::new("half", vec![var("x"), var("y")]),
        vec![
            Literal::pos("n", vec![var("x")]),
            Literal::func(var("y"), "half_of", vec![var("x")]),
        ],
    );

    let model = solve(&program).unwrap();
    assert_eq!(rel2(&model, "half"), BTreeSet::from([(4, 2)]));
}

// ─── Diagnostics ────────────────────────────────────────────────────

#[test]
fn check_reports_every_static_diagnostic() {
    let mut program = Program::new();
    program.declare("p", Interpretation::relation(2));
    // unknown body predicate
    program.rule(
        Atom::new("p", vec![var("x"), var("y")]),
        vec![Literal::pos("ghost", vec![var("x"), var("y")])],
    );
    // arity mismatch
    program.rule(
        Atom::new("p", vec![var("x"), var("y")]),
        vec![Literal::pos("p", vec![var("x"), var("y"), var("x")])],
    );
    // non-ground fact
    program.fact(Atom::new("p", vec![var("x"), Term::val(1)]));

    let errors = check(&program);
    assert_eq!(errors.len(), 3);
    assert!(errors
        .iter()
        .any(|e| matches!(e, SolveError::UnknownPredicate { .. })));
    assert!(errors
        .iter()
        .any(|e| matches!(e, SolveError::ArityMismatch { .. })));
    assert!(errors
        .iter()
        .any(|e| matches!(e, SolveError::UnboundVariable { .. })));
}

#[test]
fn solve_is_transactional_on_static_errors() {
    let mut program = Program::new();
    program.declare("p", Interpretation::relation(1));
    program.fact(Atom::new("p", vec![Term::val(1)]));
    program.rule(
        Atom::new("p", vec![var("x")]),
        vec![Literal::pos("ghost", vec![var("x")])],
    );

    // no partial model comes back, only the first error
    assert!(matches!(
        solve(&program),
        Err(SolveError::UnknownPredicate { .. })
    ));
}

#[test]
fn cancellation_returns_partial_model() {
    let mut program = Program::new();
    program.declare("p", Interpretation::relation(1));
    program.fact(Atom::new("p", vec![Term::val(1)]));

    let token = CancelToken::new();
    token.cancel();
    match solve_with_cancel(&program, token) {
        Err(SolveError::Cancelled { partial }) => {
            // cancelled at the first stratum boundary: nothing derived yet
            assert!(partial.relation("p").is_empty());
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
}

// ─── Determinism and statistics ─────────────────────────────────────

fn closure_program() -> Program {
    let mut program = Program::new();
    program.declare("edge", Interpretation::relation(2));
    program.declare("path", Interpretation::relation(2));
    for (a, b) in [(4, 1), (1, 2), (2, 3), (1, 3), (3, 4)] {
        program.fact(Atom::new("edge", vec![Term::val(a), Term::val(b)]));
    }
    program.rule(
        Atom::new("path", vec![var("x"), var("y")]),
        vec![Literal::pos("edge", vec![var("x"), var("y")])],
    );
    program.rule(
        Atom::new("path", vec![var("x"), var("z")]),
        vec![
            Literal::pos("path", vec![var("x"), var("y")]),
            Literal::pos("edge", vec![var("y"), var("z")]),
        ],
    );
    program
}

#[test]
fn identical_programs_yield_identical_runs() {
    let first = solve(&closure_program()).unwrap();
    let second = solve(&closure_program()).unwrap();

    // same tuples in the same derivation order
    assert_eq!(first.relation("path"), second.relation("path"));
    assert_eq!(first.relation("edge"), second.relation("edge"));
    assert_eq!(first.stats.rules_fired, second.stats.rules_fired);
    assert_eq!(first.stats.facts_derived, second.stats.facts_derived);
}

#[test]
fn statistics_count_novel_facts_and_firings() {
    let model = solve(&closure_program()).unwrap();
    // complete digraph on {1,2,3,4}
    assert_eq!(model.relation("path").len(), 16);
    assert_eq!(model.stats.total_facts(), 16 + 5);
    assert!(model.stats.rules_fired >= 2);
}

#[test]
fn empty_program_solves_to_empty_model() {
    let model = solve(&Program::new()).unwrap();
    assert!(model.relation("anything").is_empty());
    assert_eq!(model.stats.total_facts(), 0);
}
