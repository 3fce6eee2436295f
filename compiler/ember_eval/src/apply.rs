//! Procedure application.
//!
//! Closures become an `Eval` step of their body; natives run to completion
//! and return or throw; control primitives and continuations get the
//! caller's continuation and decide where the run goes next.

use std::sync::Arc;

use crate::continuation::{invoke, reify, ContFrame, Continuation, Winder};
use crate::errors::{arity_mismatch, not_callable, wrong_arg_type, InternalError};
use crate::trampoline::Step;
use crate::value::{Closure, ContinuationMode, ControlPrimitive, Procedure, Value};

/// Apply `procedure` to `args`, delivering the result to `k`.
pub(crate) fn apply(procedure: Value, args: Vec<Value>, k: Continuation) -> Result<Step, InternalError> {
    let procedure = match procedure {
        Value::Procedure(procedure) => procedure,
        other => {
            let err = not_callable(other.type_name()).with_irritants(vec![other]);
            return Ok(Step::throw(k, Value::error(err)));
        }
    };

    let step = match procedure {
        Procedure::Closure(closure) => apply_closure(&closure, args, k),
        Procedure::Native(native) => match native.call(&args) {
            Ok(value) => Step::ret(k, value),
            Err(err) => Step::throw(k, Value::error(err)),
        },
        Procedure::Control(primitive) => apply_control(primitive, args, k)?,
        Procedure::Continuation(continuation) => match <[Value; 1]>::try_from(args) {
            Ok([value]) => invoke(&continuation, value, k)?,
            Err(args) => {
                let err = arity_mismatch("continuation", 1, args.len());
                Step::throw(k, Value::error(err))
            }
        },
    };
    Ok(step)
}

fn apply_closure(closure: &Closure, mut args: Vec<Value>, k: Continuation) -> Step {
    let arity = closure.arity();
    if !arity.accepts(args.len()) {
        let name = closure.name().unwrap_or("anonymous");
        let err = arity_mismatch(name, arity, args.len());
        return Step::throw(k, Value::error(err));
    }
    if arity.rest {
        let rest = args.split_off(arity.required);
        args.push(Value::list(rest));
    }
    let env = closure.env.extend_values(args);
    Step::eval(closure.lambda.body.clone(), env, k)
}

fn apply_control(
    primitive: ControlPrimitive,
    args: Vec<Value>,
    k: Continuation,
) -> Result<Step, InternalError> {
    let step = match (primitive, args.as_slice()) {
        (ControlPrimitive::CallCc, [receiver]) => {
            let continuation = reify(&k, ContinuationMode::Escape)?;
            Step::apply(receiver.clone(), vec![continuation], k)
        }
        (ControlPrimitive::CallComposable, [receiver]) => {
            let continuation = reify(&k, ContinuationMode::Composable)?;
            Step::apply(receiver.clone(), vec![continuation], k)
        }
        (ControlPrimitive::CallWithPrompt, [thunk]) => {
            Step::apply(thunk.clone(), Vec::new(), k.prompt())
        }
        (ControlPrimitive::DynamicWind, [before, thunk, after]) => {
            let winder = Arc::new(Winder {
                before: before.clone(),
                after: after.clone(),
            });
            let k = k.push(ContFrame::WindEnter {
                winder,
                thunk: thunk.clone(),
            });
            Step::apply(before.clone(), Vec::new(), k)
        }
        (ControlPrimitive::Apply, [procedure, spread @ .., last]) => match last.list_to_vec() {
            Some(tail) => {
                let mut spread = spread.to_vec();
                spread.extend(tail);
                Step::apply(procedure.clone(), spread, k)
            }
            None => {
                let err = wrong_arg_type(primitive.name(), "list", last);
                Step::throw(k, Value::error(err))
            }
        },
        (ControlPrimitive::Raise, [value]) => Step::throw(k, value.clone()),
        (primitive, args) => {
            let err = arity_mismatch(primitive.name(), primitive.arity(), args.len());
            Step::throw(k, Value::error(err))
        }
    };
    Ok(step)
}
