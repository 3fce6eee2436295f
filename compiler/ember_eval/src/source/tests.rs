use ember_ir::{Symbol, SymbolSet};
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::CompileError;
use crate::expr::Expr;
use crate::scope::{ScopeDescriptor, VarRef};

fn set(names: &[&str]) -> SymbolSet {
    names.iter().map(|n| Symbol::intern(n)).collect()
}

fn scope(names: &[&str]) -> ScopeDescriptor {
    let symbols: Vec<_> = names.iter().map(|n| Symbol::intern(n)).collect();
    ScopeDescriptor::empty().extend_shadowing(&symbols).unwrap()
}

// === requirements ===

#[test]
fn variable_requires_itself() {
    assert_eq!(ExprSource::var("x").requirements(), set(&["x"]));
    assert!(ExprSource::int(1).requirements().is_empty());
}

#[test]
fn lambda_subtracts_params_and_rest() {
    let lambda = ExprSource::lambda_rest(
        &["a"],
        "more",
        ExprSource::call_var("f", vec![ExprSource::var("a"), ExprSource::var("more"), ExprSource::var("b")]),
    );
    assert_eq!(lambda.requirements(), set(&["f", "b"]));
}

#[test]
fn let_inits_see_outer_names() {
    // (let ((x x)) (+ x y))
    let expr = ExprSource::let_(
        vec![("x", ExprSource::var("x"))],
        ExprSource::call_var("+", vec![ExprSource::var("x"), ExprSource::var("y")]),
    );
    assert_eq!(expr.requirements(), set(&["x", "+", "y"]));
}

#[test]
fn let_star_binds_left_to_right() {
    // (let* ((a b) (c a)) (d c))
    let expr = ExprSource::let_star(
        vec![("a", ExprSource::var("b")), ("c", ExprSource::var("a"))],
        ExprSource::call_var("d", vec![ExprSource::var("c")]),
    );
    assert_eq!(expr.requirements(), set(&["b", "d"]));
}

#[test]
fn letrec_inits_see_their_own_names() {
    let expr = ExprSource::letrec(
        vec![("f", ExprSource::lambda(&[], ExprSource::call_var("f", vec![])))],
        ExprSource::call_var("f", vec![]),
    );
    assert!(expr.requirements().is_empty());
}

#[test]
fn dynamic_forms_require_nothing_lexical() {
    let expr = ExprSource::dynamic_let(
        vec![("p", ExprSource::var("v"))],
        ExprSource::begin(vec![
            ExprSource::dynamic("p"),
            ExprSource::dynamic_bound("q"),
            ExprSource::dynamic_set("p", ExprSource::var("w")),
        ]),
    );
    assert_eq!(expr.requirements(), set(&["v", "w"]));
}

#[test]
fn match_clause_binds_pattern_variables() {
    let expr = ExprSource::match_(
        ExprSource::var("subject"),
        vec![ClauseSource::new(
            PatternSource::list(vec![PatternSource::var("a"), PatternSource::Wildcard]),
            Some(ExprSource::var("a")),
            ExprSource::call_var("g", vec![ExprSource::var("a"), ExprSource::var("b")]),
        )],
        Some(ExprSource::var("fallback")),
    );
    assert_eq!(expr.requirements(), set(&["subject", "g", "b", "fallback"]));
}

// === compile ===

#[test]
fn unbound_variable_is_rejected() {
    let err = ExprSource::var("nope").compile(&ScopeDescriptor::empty()).err();
    assert_eq!(err, Some(CompileError::UnboundVariable(Symbol::intern("nope"))));
}

#[test]
fn lambda_capturing_unbound_name_is_rejected() {
    let lambda = ExprSource::lambda(&["x"], ExprSource::var("free"));
    let err = lambda.compile(&scope(&["other"])).err();
    assert_eq!(err, Some(CompileError::UnboundVariable(Symbol::intern("free"))));
}

#[test]
fn duplicate_let_binding_is_rejected() {
    let expr = ExprSource::let_(
        vec![("x", ExprSource::int(1)), ("x", ExprSource::int(2))],
        ExprSource::var("x"),
    );
    let err = expr.compile(&ScopeDescriptor::empty()).err();
    assert_eq!(err, Some(CompileError::DuplicateBinding(Symbol::intern("x"))));
}

#[test]
fn duplicate_pattern_variable_is_rejected() {
    let expr = ExprSource::match_(
        ExprSource::int(1),
        vec![ClauseSource::new(
            PatternSource::pair(PatternSource::var("a"), PatternSource::var("a")),
            None,
            ExprSource::int(0),
        )],
        None,
    );
    let err = expr.compile(&ScopeDescriptor::empty()).err();
    assert_eq!(
        err,
        Some(CompileError::DuplicatePatternVariable(Symbol::intern("a")))
    );
}

#[test]
fn variables_resolve_to_slots() {
    let expr = ExprSource::let_(vec![("y", ExprSource::int(1))], ExprSource::var("x"))
        .compile(&scope(&["w", "x"]))
        .unwrap();
    let Expr::Let(binding) = &*expr else {
        panic!("expected let");
    };
    match &*binding.body {
        Expr::Local(var) => assert_eq!(*var, VarRef { depth: 1, slot: 1 }),
        _ => panic!("expected local reference"),
    }
}

#[test]
fn lambda_captures_only_what_it_needs() {
    let lambda = ExprSource::lambda(&["a"], ExprSource::var("y"))
        .compile(&scope(&["x", "y", "z"]))
        .unwrap();
    let Expr::Lambda(lambda) = &*lambda else {
        panic!("expected lambda");
    };
    assert_eq!(lambda.capture_count(), 1);
    assert_eq!(&*lambda.captures, &[VarRef { depth: 0, slot: 1 }]);
    match &*lambda.body {
        // Captured frame sits under the parameter frame.
        Expr::Local(var) => assert_eq!(*var, VarRef { depth: 1, slot: 0 }),
        _ => panic!("expected local reference"),
    }
}

#[test]
fn let_bound_lambda_takes_binding_name() {
    let expr = ExprSource::let_(
        vec![("square", ExprSource::lambda(&["n"], ExprSource::var("n")))],
        ExprSource::var("square"),
    )
    .compile(&ScopeDescriptor::empty())
    .unwrap();
    let Expr::Let(binding) = &*expr else {
        panic!("expected let");
    };
    match &*binding.inits[0] {
        Expr::Lambda(lambda) => assert_eq!(lambda.name, Some(Symbol::intern("square"))),
        _ => panic!("expected lambda"),
    }
}

#[test]
fn let_star_nests_single_binding_frames() {
    let expr = ExprSource::let_star(
        vec![("a", ExprSource::int(1)), ("b", ExprSource::var("a"))],
        ExprSource::var("a"),
    )
    .compile(&ScopeDescriptor::empty())
    .unwrap();
    let Expr::Let(outer) = &*expr else {
        panic!("expected let");
    };
    assert_eq!(outer.inits.len(), 1);
    let Expr::Let(inner) = &*outer.body else {
        panic!("expected nested let");
    };
    match (&*inner.inits[0], &*inner.body) {
        (Expr::Local(init), Expr::Local(body)) => {
            assert_eq!(*init, VarRef { depth: 0, slot: 0 });
            assert_eq!(*body, VarRef { depth: 1, slot: 0 });
        }
        _ => panic!("expected local references"),
    }
}

#[test]
fn empty_begin_and_one_armed_if_are_unspecified() {
    let empty = ExprSource::begin(vec![])
        .compile(&ScopeDescriptor::empty())
        .unwrap();
    assert!(matches!(&*empty, Expr::Constant(Value::Unspecified)));

    let when = ExprSource::when(ExprSource::constant(false), ExprSource::int(1))
        .compile(&ScopeDescriptor::empty())
        .unwrap();
    let Expr::If(branch) = &*when else {
        panic!("expected if");
    };
    assert!(matches!(&*branch.otherwise, Expr::Constant(Value::Unspecified)));
}

#[test]
fn pattern_variables_take_slots_in_order() {
    let expr = ExprSource::match_(
        ExprSource::int(1),
        vec![ClauseSource::new(
            PatternSource::list(vec![PatternSource::var("p"), PatternSource::var("q")]),
            None,
            ExprSource::var("q"),
        )],
        None,
    )
    .compile(&ScopeDescriptor::empty())
    .unwrap();
    let Expr::Match(matcher) = &*expr else {
        panic!("expected match");
    };
    let clause = &matcher.clauses[0];
    assert_eq!(clause.slots, 2);
    match &*clause.body {
        Expr::Local(var) => assert_eq!(*var, VarRef { depth: 0, slot: 1 }),
        _ => panic!("expected local reference"),
    }
}
