use super::*;
use pretty_assertions::assert_eq;

#[test]
fn list_display() {
    let v = Value::list([Value::symbol("matched"), Value::Int(2)]);
    assert_eq!(v.to_string(), "(matched 2)");
}

#[test]
fn dotted_display() {
    let v = Value::list_with_tail([Value::Int(1), Value::Int(2)], Value::Int(3));
    assert_eq!(v.to_string(), "(1 2 . 3)");
    assert_eq!(Value::cons(Value::Null, Value::Null).to_string(), "(())");
}

#[test]
fn immediates_display() {
    assert_eq!(Value::Bool(true).to_string(), "#t");
    assert_eq!(Value::Char('a').to_string(), "#\\a");
    assert_eq!(Value::string("hi").to_string(), "\"hi\"");
    assert_eq!(Value::vector(vec![Value::Int(1), Value::Null]).to_string(), "#(1 ())");
}

#[test]
fn only_false_is_false() {
    assert!(!Value::Bool(false).is_true());
    assert!(Value::Null.is_true());
    assert!(Value::Int(0).is_true());
    assert!(Value::Unspecified.is_true());
}

#[test]
fn eqv_is_identity_for_pairs() {
    let a = Value::cons(Value::Int(1), Value::Null);
    let b = Value::cons(Value::Int(1), Value::Null);
    assert!(a.eqv(&a.clone()));
    assert!(!a.eqv(&b));
    assert!(a.equal(&b));
}

#[test]
fn equal_compares_strings_by_content() {
    assert!(Value::string("abc").equal(&Value::string("abc")));
    assert!(!Value::string("abc").eqv(&Value::string("abc")));
}

#[test]
fn equal_on_long_lists() {
    let a = Value::list((0..100_000).map(Value::Int).collect::<Vec<_>>());
    let b = Value::list((0..100_000).map(Value::Int).collect::<Vec<_>>());
    assert!(a.equal(&b));
}

#[test]
fn list_to_vec_rejects_improper() {
    let proper = Value::list([Value::Int(1), Value::Int(2)]);
    assert_eq!(proper.list_to_vec(), Some(vec![Value::Int(1), Value::Int(2)]));
    let improper = Value::cons(Value::Int(1), Value::Int(2));
    assert_eq!(improper.list_to_vec(), None);
}

#[test]
fn native_procedure_calls_through() {
    let v = Value::native("twice", Arity::exactly(1), |args| match args {
        [Value::Int(n)] => Ok(Value::Int(n * 2)),
        _ => Err(EvalError::new("bad")),
    });
    let Value::Procedure(Procedure::Native(native)) = &v else {
        panic!("expected native procedure");
    };
    assert_eq!(native.call(&[Value::Int(21)]).ok(), Some(Value::Int(42)));
    assert_eq!(v.to_string(), "#<procedure twice>");
}

#[test]
fn arity_accepts() {
    assert!(Arity::exactly(2).accepts(2));
    assert!(!Arity::exactly(2).accepts(3));
    assert!(Arity::at_least(1).accepts(5));
    assert!(!Arity::at_least(1).accepts(0));
    assert_eq!(Arity::at_least(1).to_string(), "at least 1");
}
