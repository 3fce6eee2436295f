use super::*;
use pretty_assertions::assert_eq;

#[test]
fn factory_message_matches_kind() {
    let err = unbound_dynamic(Symbol::intern("depth"));
    assert_eq!(err.message, err.kind.to_string());
    assert_eq!(err.message, "unbound dynamic variable: depth");
}

#[test]
fn arity_message_with_and_without_name() {
    assert_eq!(
        arity_mismatch("car", 1, 2).message,
        "car expects 1 arguments, got 2"
    );
    assert_eq!(
        arity_mismatch("", "at least 1", 0).message,
        "expected at least 1 arguments, got 0"
    );
}

#[test]
fn user_error_displays_irritants() {
    let err = user_error("boom", vec![Value::Int(1), Value::symbol("x")]);
    assert_eq!(err.to_string(), "boom 1 x");
    assert!(matches!(err.kind, EvalErrorKind::User { .. }));
}

#[test]
fn suppressed_errors_accumulate() {
    let err = EvalError::new("primary")
        .with_suppressed([EvalError::new("a")])
        .with_suppressed([EvalError::new("b")]);
    let messages: Vec<_> = err.suppressed.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["a", "b"]);
}

#[test]
fn internal_errors_render() {
    let err = InternalError::SlotOutOfRange {
        depth: 1,
        slot: 3,
        len: 2,
    };
    assert_eq!(
        err.to_string(),
        "slot 3 out of range for frame of 2 cells at depth 1"
    );
    let fault = Fault::from(InternalError::AssociationMismatch(AssociationRole::AttachBase));
    assert_eq!(fault.to_string(), "association already pinned to a different attach base");
}

#[test]
fn compile_errors_render_symbols() {
    let err = CompileError::UnboundVariable(Symbol::intern("frob"));
    assert_eq!(err.to_string(), "unbound variable: frob");
}
