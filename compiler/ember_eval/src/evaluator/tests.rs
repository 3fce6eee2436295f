use std::sync::Arc;

use ember_ir::Symbol;
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::{EvalError, EvalErrorKind, Fault};
use crate::resource::HandleRegistry;
use crate::source::ExprSource;
use crate::toplevel::Toplevel;
use crate::value::Arity;

fn int(n: i64) -> ExprSource {
    ExprSource::int(n)
}

fn var(name: &str) -> ExprSource {
    ExprSource::var(name)
}

fn call(name: &str, args: Vec<ExprSource>) -> ExprSource {
    ExprSource::call_var(name, args)
}

fn run_with(evaluator: &Evaluator, toplevel: &Toplevel, source: &ExprSource) -> Result<Outcome, Fault> {
    let expr = toplevel.compile(source).unwrap();
    evaluator.evaluate(&expr, &toplevel.environment())
}

fn run(source: &ExprSource) -> Outcome {
    run_with(&Evaluator::new(), &Toplevel::standard(), source).unwrap()
}

#[test]
fn escaping_continuation_abandons_pending_work() {
    // (+ 1 (call/cc (lambda (k) (+ 100 (k 5)))))
    let expr = call(
        "+",
        vec![
            int(1),
            call(
                "call/cc",
                vec![ExprSource::lambda(&["k"], call("+", vec![int(100), call("k", vec![int(5)])]))],
            ),
        ],
    );
    assert_eq!(run(&expr), Outcome::Value(Value::Int(6)));
}

#[test]
fn composable_continuation_returns_to_invoker() {
    // (+ 1 (call-with-prompt
    //        (lambda () (+ 10 (call-with-composable-continuation (lambda (k) (k (k 1))))))))
    let body = call(
        "+",
        vec![
            int(10),
            call(
                "call-with-composable-continuation",
                vec![ExprSource::lambda(&["k"], call("k", vec![call("k", vec![int(1)])]))],
            ),
        ],
    );
    let expr = call(
        "+",
        vec![int(1), call("call-with-prompt", vec![ExprSource::lambda(&[], body)])],
    );
    assert_eq!(run(&expr), Outcome::Value(Value::Int(32)));
}

#[test]
fn prompt_delimits_escape() {
    // (+ 1 (call-with-prompt (lambda () (+ 10 (call/cc (lambda (k) (k 2)))))))
    let body = call(
        "+",
        vec![
            int(10),
            call("call/cc", vec![ExprSource::lambda(&["k"], call("k", vec![int(2)]))]),
        ],
    );
    let expr = call(
        "+",
        vec![int(1), call("call-with-prompt", vec![ExprSource::lambda(&[], body)])],
    );
    assert_eq!(run(&expr), Outcome::Value(Value::Int(13)));
}

#[test]
fn saved_continuation_can_be_reentered_from_a_new_run() {
    let mut toplevel = Toplevel::standard();
    toplevel.define(Symbol::intern("saved"), Value::Bool(false));
    let evaluator = Evaluator::new();

    // (+ 1 (call/cc (lambda (c) (set! saved c) 1)))
    let expr = call(
        "+",
        vec![
            int(1),
            call(
                "call/cc",
                vec![ExprSource::lambda(
                    &["c"],
                    ExprSource::begin(vec![ExprSource::set("saved", var("c")), int(1)]),
                )],
            ),
        ],
    );
    let first = run_with(&evaluator, &toplevel, &expr).unwrap();
    assert_eq!(first, Outcome::Value(Value::Int(2)));

    let saved = toplevel.lookup(Symbol::intern("saved")).unwrap();
    for n in [10, 20] {
        let again = evaluator.call(&saved, vec![Value::Int(n)]).unwrap();
        assert_eq!(again, Outcome::Value(Value::Int(n + 1)));
    }
}

#[test]
fn apply_spreads_final_list() {
    // (apply + 1 2 (list 3 4))
    let expr = call(
        "apply",
        vec![var("+"), int(1), int(2), call("list", vec![int(3), int(4)])],
    );
    assert_eq!(run(&expr), Outcome::Value(Value::Int(10)));

    let improper = call("apply", vec![var("+"), int(1)]);
    match run(&improper) {
        Outcome::Raised(Value::Error(err)) => {
            assert!(matches!(err.kind, EvalErrorKind::WrongArgType { .. }));
        }
        other => panic!("expected type error, got {other:?}"),
    }
}

#[test]
fn step_budget_aborts_runaway_loop() {
    // (letrec ((spin (lambda () (spin)))) (spin))
    let expr = ExprSource::letrec(
        vec![("spin", ExprSource::lambda(&[], call("spin", vec![])))],
        call("spin", vec![]),
    );
    let evaluator = Evaluator::builder()
        .mode(EvalMode::Bounded { step_budget: 500 })
        .build();
    let fault = run_with(&evaluator, &Toplevel::standard(), &expr).err();
    assert!(matches!(
        fault,
        Some(Fault::StepBudgetExceeded { budget: 500 })
    ));
}

#[test]
fn bounded_mode_finishes_small_programs() {
    let evaluator = Evaluator::builder()
        .mode(EvalMode::Bounded { step_budget: 100 })
        .build();
    let outcome = run_with(&evaluator, &Toplevel::standard(), &call("+", vec![int(1), int(2)]));
    assert_eq!(outcome.unwrap(), Outcome::Value(Value::Int(3)));
}

#[test]
fn resume_delivers_values_and_throws() {
    let evaluator = Evaluator::new();
    let k = Continuation::root().prompt();
    assert_eq!(
        evaluator.resume(&k, Completion::Value(Value::Int(4))).unwrap(),
        Outcome::Value(Value::Int(4))
    );
    assert_eq!(
        evaluator.resume(&k, Completion::Throw(Value::symbol("late"))).unwrap(),
        Outcome::Raised(Value::symbol("late"))
    );
}

#[test]
fn resume_from_another_thread() {
    let evaluator = Arc::new(Evaluator::new());
    let k = Continuation::root();
    let worker = {
        let evaluator = Arc::clone(&evaluator);
        std::thread::spawn(move || evaluator.resume(&k, Completion::Value(Value::Int(9))))
    };
    assert_eq!(worker.join().unwrap().unwrap(), Outcome::Value(Value::Int(9)));
}

#[test]
fn evaluate_under_uses_the_given_root() {
    let toplevel = Toplevel::standard();
    let expr = toplevel
        .compile(&call("call/cc", vec![ExprSource::lambda(&["k"], call("k", vec![int(3)]))]))
        .unwrap();
    let root = Continuation::root().prompt();
    let outcome = Evaluator::new()
        .evaluate_under(&expr, &toplevel.environment(), &root)
        .unwrap();
    assert_eq!(outcome, Outcome::Value(Value::Int(3)));
}

#[test]
fn builder_installs_shared_registry() {
    let registry = Arc::new(HandleRegistry::new());
    let evaluator = Evaluator::builder().registry(registry.clone()).build();

    let mut toplevel = Toplevel::standard();
    let opener = Arc::clone(&registry);
    toplevel.define_native("open", Arity::exactly(0), move |_| Ok(opener.open(|| Ok::<(), EvalError>(()))));

    // (using ((r (open))) 'body)
    let expr = ExprSource::using(
        vec![("r", call("open", vec![]))],
        ExprSource::quote_symbol("body"),
    );
    let outcome = run_with(&evaluator, &toplevel, &expr).unwrap();
    assert_eq!(outcome, Outcome::Value(Value::symbol("body")));
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn native_procedures_can_be_called_directly() {
    let toplevel = Toplevel::standard();
    let plus = toplevel.lookup(Symbol::intern("+")).unwrap();
    let outcome = Evaluator::new()
        .call(&plus, vec![Value::Int(2), Value::Int(5)])
        .unwrap();
    assert_eq!(outcome, Outcome::Value(Value::Int(7)));
}
