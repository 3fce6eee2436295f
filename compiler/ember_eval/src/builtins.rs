//! Standard procedures installed in a fresh toplevel.
//!
//! `NativeProcedure::call` checks arguments against the declared arity
//! before a native runs, so natives index `args` directly. Control primitives are listed here too;
//! their behavior lives in `apply`.

use ember_ir::Symbol;

use crate::errors::{user_error, wrong_arg_type, EvalError};
use crate::value::{Arity, ControlPrimitive, Procedure, Value};

type Builtin = fn(&[Value]) -> Result<Value, EvalError>;

const NATIVES: &[(&str, Arity, Builtin)] = &[
    ("cons", Arity::exactly(2), builtin_cons),
    ("car", Arity::exactly(1), builtin_car),
    ("cdr", Arity::exactly(1), builtin_cdr),
    ("list", Arity::at_least(0), builtin_list),
    ("length", Arity::exactly(1), builtin_length),
    ("vector", Arity::at_least(0), builtin_vector),
    ("null?", Arity::exactly(1), builtin_is_null),
    ("pair?", Arity::exactly(1), builtin_is_pair),
    ("symbol?", Arity::exactly(1), builtin_is_symbol),
    ("procedure?", Arity::exactly(1), builtin_is_procedure),
    ("not", Arity::exactly(1), builtin_not),
    ("eq?", Arity::exactly(2), builtin_eqv),
    ("eqv?", Arity::exactly(2), builtin_eqv),
    ("equal?", Arity::exactly(2), builtin_equal),
    ("+", Arity::at_least(0), builtin_add),
    ("*", Arity::at_least(0), builtin_mul),
    ("-", Arity::at_least(1), builtin_sub),
    ("=", Arity::at_least(1), builtin_num_eq),
    ("<", Arity::at_least(1), builtin_lt),
    (">", Arity::at_least(1), builtin_gt),
    ("<=", Arity::at_least(1), builtin_le),
    (">=", Arity::at_least(1), builtin_ge),
    ("error", Arity::at_least(1), builtin_error),
    ("error-object?", Arity::exactly(1), builtin_is_error),
    ("error-object-message", Arity::exactly(1), builtin_error_message),
    ("error-object-irritants", Arity::exactly(1), builtin_error_irritants),
];

/// Every standard procedure with the name it is bound to.
pub fn standard_procedures() -> Vec<(Symbol, Value)> {
    let natives = NATIVES
        .iter()
        .map(|&(name, arity, func)| (Symbol::intern(name), Value::native(name, arity, func)));
    let control = ControlPrimitive::ALL
        .into_iter()
        .map(|primitive| (Symbol::intern(primitive.name()), Value::Procedure(Procedure::Control(primitive))));
    let mut procedures: Vec<_> = natives.chain(control).collect();
    procedures.push((
        Symbol::intern("call-with-current-continuation"),
        Value::Procedure(Procedure::Control(ControlPrimitive::CallCc)),
    ));
    procedures
}

fn builtin_cons(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::cons(args[0].clone(), args[1].clone()))
}

fn builtin_car(args: &[Value]) -> Result<Value, EvalError> {
    match args[0].as_pair() {
        Some(pair) => Ok(pair.car.clone()),
        None => Err(wrong_arg_type("car", "pair", &args[0])),
    }
}

fn builtin_cdr(args: &[Value]) -> Result<Value, EvalError> {
    match args[0].as_pair() {
        Some(pair) => Ok(pair.cdr.clone()),
        None => Err(wrong_arg_type("cdr", "pair", &args[0])),
    }
}

fn builtin_list(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::list(args.iter().cloned()))
}

fn builtin_length(args: &[Value]) -> Result<Value, EvalError> {
    let items = args[0]
        .list_to_vec()
        .ok_or_else(|| wrong_arg_type("length", "list", &args[0]))?;
    i64::try_from(items.len())
        .map(Value::Int)
        .map_err(|_| EvalError::new("length: list too long"))
}

fn builtin_vector(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::vector(args.to_vec()))
}

fn builtin_is_null(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(args[0], Value::Null)))
}

fn builtin_is_pair(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(args[0], Value::Pair(_))))
}

fn builtin_is_symbol(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(args[0], Value::Symbol(_))))
}

fn builtin_is_procedure(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(args[0], Value::Procedure(_))))
}

fn builtin_not(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!args[0].is_true()))
}

fn builtin_eqv(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args[0].eqv(&args[1])))
}

fn builtin_equal(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args[0].equal(&args[1])))
}

fn int_arg(name: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(wrong_arg_type(name, "integer", other)),
    }
}

fn overflow(name: &str, args: &[Value]) -> EvalError {
    EvalError::new(format!("{name}: integer overflow")).with_irritants(args.to_vec())
}

fn fold_ints(
    name: &str,
    args: &[Value],
    init: i64,
    op: fn(i64, i64) -> Option<i64>,
) -> Result<Value, EvalError> {
    let mut acc = init;
    for arg in args {
        acc = op(acc, int_arg(name, arg)?).ok_or_else(|| overflow(name, args))?;
    }
    Ok(Value::Int(acc))
}

fn builtin_add(args: &[Value]) -> Result<Value, EvalError> {
    fold_ints("+", args, 0, i64::checked_add)
}

fn builtin_mul(args: &[Value]) -> Result<Value, EvalError> {
    fold_ints("*", args, 1, i64::checked_mul)
}

fn builtin_sub(args: &[Value]) -> Result<Value, EvalError> {
    let first = int_arg("-", &args[0])?;
    match &args[1..] {
        [] => first
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| overflow("-", args)),
        rest => fold_ints("-", rest, first, i64::checked_sub),
    }
}

/// Chained comparison: `(< a b c)` is `a < b` and `b < c`.
fn compare(name: &str, args: &[Value], holds: fn(i64, i64) -> bool) -> Result<Value, EvalError> {
    let ints = args
        .iter()
        .map(|arg| int_arg(name, arg))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Bool(ints.windows(2).all(|w| holds(w[0], w[1]))))
}

fn builtin_num_eq(args: &[Value]) -> Result<Value, EvalError> {
    compare("=", args, |a, b| a == b)
}

fn builtin_lt(args: &[Value]) -> Result<Value, EvalError> {
    compare("<", args, |a, b| a < b)
}

fn builtin_gt(args: &[Value]) -> Result<Value, EvalError> {
    compare(">", args, |a, b| a > b)
}

fn builtin_le(args: &[Value]) -> Result<Value, EvalError> {
    compare("<=", args, |a, b| a <= b)
}

fn builtin_ge(args: &[Value]) -> Result<Value, EvalError> {
    compare(">=", args, |a, b| a >= b)
}

/// `(error message irritant ...)`: build the error object to throw.
fn builtin_error(args: &[Value]) -> Result<Value, EvalError> {
    let message = match &args[0] {
        Value::Str(s) => s.to_string(),
        other => other.to_string(),
    };
    Err(user_error(message, args[1..].to_vec()))
}

fn builtin_is_error(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(args[0], Value::Error(_))))
}

fn builtin_error_message(args: &[Value]) -> Result<Value, EvalError> {
    match args[0].as_error() {
        Some(err) => Ok(Value::string(&err.message)),
        None => Err(wrong_arg_type("error-object-message", "error", &args[0])),
    }
}

fn builtin_error_irritants(args: &[Value]) -> Result<Value, EvalError> {
    match args[0].as_error() {
        Some(err) => Ok(Value::list(err.irritants.iter().cloned())),
        None => Err(wrong_arg_type("error-object-irritants", "error", &args[0])),
    }
}
