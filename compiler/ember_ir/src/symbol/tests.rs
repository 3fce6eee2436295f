use super::*;

#[test]
fn interned_symbols_compare_by_name() {
    assert_eq!(Symbol::intern("x"), Symbol::intern("x"));
    assert_ne!(Symbol::intern("x"), Symbol::intern("y"));
    assert_eq!(Symbol::intern("using*").name(), "using*");
}

#[test]
fn generated_symbols_are_unique() {
    let a = Symbol::generate("tmp");
    let b = Symbol::generate("tmp");
    assert_ne!(a, b);
    assert_eq!(a, a);
    assert!(a.is_generated());
    assert_eq!(a.name(), "tmp");
}

#[test]
fn generated_never_equals_interned() {
    let g = Symbol::generate("x");
    assert_ne!(g, Symbol::intern("x"));
}

#[test]
fn generated_indices_increase() {
    let Symbol::Generated { index: first, .. } = Symbol::generate("k") else {
        panic!("expected generated symbol");
    };
    let Symbol::Generated { index: second, .. } = Symbol::generate("k") else {
        panic!("expected generated symbol");
    };
    assert!(second > first);
}

#[test]
fn display_decorates_generated() {
    assert_eq!(Symbol::intern("car").to_string(), "car");
    let shown = Symbol::generate("loop").to_string();
    assert!(shown.starts_with("#:loop"), "{shown}");
}
