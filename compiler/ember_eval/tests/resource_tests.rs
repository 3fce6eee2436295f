//! End-to-end tests for `using` and `using*` against a shared registry.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::sync::Arc;

use ember_eval::{
    Arity, EvalError, EvalErrorKind, Evaluator, ExprSource, HandleRegistry, Outcome, Toplevel,
    Value,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

/// A toplevel whose `open` procedure registers resources that log their
/// release by name.
struct Harness {
    registry: Arc<HandleRegistry>,
    released: Arc<Mutex<Vec<String>>>,
    evaluator: Evaluator,
    toplevel: Toplevel,
}

impl Harness {
    fn new() -> Self {
        let registry = Arc::new(HandleRegistry::new());
        let released = Arc::new(Mutex::new(Vec::new()));
        let evaluator = Evaluator::builder().registry(registry.clone()).build();
        let mut toplevel = Toplevel::standard();

        let (opener, log) = (Arc::clone(&registry), Arc::clone(&released));
        toplevel.define_native("open", Arity::exactly(1), move |args| {
            let name = args[0].to_string();
            let log = Arc::clone(&log);
            Ok(opener.open(move || {
                log.lock().push(name);
                Ok::<(), EvalError>(())
            }))
        });

        let opener = Arc::clone(&registry);
        toplevel.define_native("open-failing", Arity::exactly(1), move |args| {
            let name = args[0].to_string();
            Ok(opener.open(move || Err(EvalError::new(format!("{name} refused to close")))))
        });

        let log = Arc::clone(&released);
        toplevel.define_native("released", Arity::exactly(0), move |_| {
            Ok(Value::list(log.lock().iter().map(|name| Value::symbol(name))))
        });

        Harness {
            registry,
            released,
            evaluator,
            toplevel,
        }
    }

    fn run(&self, source: &ExprSource) -> Outcome {
        let expr = self.toplevel.compile(source).unwrap();
        self.evaluator
            .evaluate(&expr, &self.toplevel.environment())
            .unwrap()
    }

    fn released(&self) -> Vec<String> {
        self.released.lock().clone()
    }
}

fn var(name: &str) -> ExprSource {
    ExprSource::var(name)
}

fn quote(name: &str) -> ExprSource {
    ExprSource::quote_symbol(name)
}

fn call(name: &str, args: Vec<ExprSource>) -> ExprSource {
    ExprSource::call_var(name, args)
}

fn open(name: &str) -> ExprSource {
    call("open", vec![quote(name)])
}

fn raised_error(outcome: Outcome) -> EvalError {
    match outcome {
        Outcome::Raised(value) => value.as_error().cloned().unwrap(),
        other => panic!("expected a raised error object, got {other:?}"),
    }
}

#[test]
fn normal_exit_releases_every_resource() {
    let harness = Harness::new();
    // (using ((a (open 'a)) (b (open 'b))) 'done)
    let expr = ExprSource::using(vec![("a", open("a")), ("b", open("b"))], quote("done"));
    assert_eq!(harness.run(&expr), Outcome::Value(Value::symbol("done")));
    assert_eq!(harness.released(), vec!["a", "b"]);
    assert_eq!(harness.registry.live_count(), 0);
}

#[test]
fn error_in_body_releases_each_resource_once() {
    let harness = Harness::new();
    // (using ((a (open 'a)) (b (open 'b))) (raise 'boom))
    let expr = ExprSource::using(
        vec![("a", open("a")), ("b", open("b"))],
        call("raise", vec![quote("boom")]),
    );
    assert_eq!(harness.run(&expr), Outcome::Raised(Value::symbol("boom")));
    assert_eq!(harness.released(), vec!["a", "b"]);
    assert_eq!(harness.registry.live_count(), 0);
}

#[test]
fn failed_acquisition_releases_only_what_was_acquired() {
    let harness = Harness::new();
    // (using ((a (open 'a)) (b (raise 'nope)) (c (open 'c))) (open 'body))
    let expr = ExprSource::using(
        vec![
            ("a", open("a")),
            ("b", call("raise", vec![quote("nope")])),
            ("c", open("c")),
        ],
        open("body"),
    );
    assert_eq!(harness.run(&expr), Outcome::Raised(Value::symbol("nope")));
    assert_eq!(harness.released(), vec!["a"]);
    // Neither `c` nor the body's resource was ever opened.
    assert_eq!(harness.registry.live_count(), 0);
}

#[test]
fn sequential_form_releases_innermost_first() {
    let harness = Harness::new();
    // (using* ((a (open 'a)) (b (begin a (open 'b)))) 'done)
    let expr = ExprSource::using_star(
        vec![
            ("a", open("a")),
            ("b", ExprSource::begin(vec![var("a"), open("b")])),
        ],
        quote("done"),
    );
    assert_eq!(harness.run(&expr), Outcome::Value(Value::symbol("done")));
    assert_eq!(harness.released(), vec!["b", "a"]);
}

#[test]
fn handle_bound_twice_is_released_once() {
    let harness = Harness::new();
    // (let ((r (open 'r))) (using ((x r) (y r)) 'done))
    let expr = ExprSource::let_(
        vec![("r", open("r"))],
        ExprSource::using(vec![("x", var("r")), ("y", var("r"))], quote("done")),
    );
    assert_eq!(harness.run(&expr), Outcome::Value(Value::symbol("done")));
    assert_eq!(harness.released(), vec!["r"]);
}

#[test]
fn non_resource_values_are_ignored() {
    let harness = Harness::new();
    // (using ((n 1) (a (open 'a))) n)
    let expr = ExprSource::using(
        vec![("n", ExprSource::int(1)), ("a", open("a"))],
        var("n"),
    );
    assert_eq!(harness.run(&expr), Outcome::Value(Value::Int(1)));
    assert_eq!(harness.released(), vec!["a"]);
}

#[test]
fn release_failure_on_normal_exit_is_raised() {
    let harness = Harness::new();
    // (using ((a (open 'a)) (f (open-failing 'f)) (b (open 'b))) 'done)
    let expr = ExprSource::using(
        vec![
            ("a", open("a")),
            ("f", call("open-failing", vec![quote("f")])),
            ("b", open("b")),
        ],
        quote("done"),
    );
    let err = raised_error(harness.run(&expr));
    match &err.kind {
        EvalErrorKind::ReleaseFailed { reason, .. } => assert_eq!(reason, "f refused to close"),
        other => panic!("expected a release failure, got {other:?}"),
    }
    assert!(err.suppressed.is_empty());
    // The failure does not stop the remaining releases.
    assert_eq!(harness.released(), vec!["a", "b"]);
    assert_eq!(harness.registry.live_count(), 0);
}

#[test]
fn release_failure_while_unwinding_is_suppressed() {
    let harness = Harness::new();
    // (using ((f (open-failing 'f))) (error "body failed"))
    let expr = ExprSource::using(
        vec![("f", call("open-failing", vec![quote("f")]))],
        call("error", vec![ExprSource::constant(Value::string("body failed"))]),
    );
    let err = raised_error(harness.run(&expr));
    assert_eq!(
        err.kind,
        EvalErrorKind::User {
            message: "body failed".to_string()
        }
    );
    assert_eq!(err.suppressed.len(), 1);
    assert!(matches!(
        err.suppressed[0].kind,
        EvalErrorKind::ReleaseFailed { .. }
    ));
}

#[test]
fn handler_runs_after_resources_are_released() {
    let harness = Harness::new();
    // (catch (using ((a (open 'a))) (raise 'oops))
    //        (lambda (e) (list e (released))))
    let expr = ExprSource::catch(
        ExprSource::using(vec![("a", open("a"))], call("raise", vec![quote("oops")])),
        ExprSource::lambda(&["e"], call("list", vec![var("e"), call("released", vec![])])),
    );
    assert_eq!(
        harness.run(&expr),
        Outcome::Value(Value::list([
            Value::symbol("oops"),
            Value::list([Value::symbol("a")]),
        ]))
    );
}

#[test]
fn escaping_continuation_leaves_resources_open() {
    let harness = Harness::new();
    // Only return and throw release; a jump out needs `dynamic-wind`.
    // (call/cc (lambda (k) (using ((a (open 'a))) (k 'escaped) 'unreached)))
    let expr = call(
        "call/cc",
        vec![ExprSource::lambda(
            &["k"],
            ExprSource::using(
                vec![("a", open("a"))],
                ExprSource::begin(vec![call("k", vec![quote("escaped")]), quote("unreached")]),
            ),
        )],
    );
    assert_eq!(harness.run(&expr), Outcome::Value(Value::symbol("escaped")));
    assert_eq!(harness.released(), Vec::<String>::new());
    assert_eq!(harness.registry.live_count(), 1);
}
