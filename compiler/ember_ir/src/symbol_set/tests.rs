use super::*;
use pretty_assertions::assert_eq;

fn set(names: &[&str]) -> SymbolSet {
    names.iter().map(|n| Symbol::intern(n)).collect()
}

#[test]
fn from_iter_dedups() {
    let s = set(&["a", "b", "a"]);
    assert_eq!(s.len(), 2);
    assert!(s.contains(Symbol::intern("a")));
    assert!(!s.contains(Symbol::intern("c")));
}

#[test]
fn union_merges_sorted_runs() {
    let u = set(&["a", "b"]).union(&set(&["b", "c"]));
    assert_eq!(u, set(&["a", "b", "c"]));
    let slice = u.as_slice();
    assert!(slice.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn difference_removes_bound_names() {
    let free = set(&["x", "y", "z"]).difference(&set(&["y"]));
    assert_eq!(free, set(&["x", "z"]));
}

#[test]
fn insert_and_remove() {
    let mut s = SymbolSet::new();
    assert!(s.insert(Symbol::intern("k")));
    assert!(!s.insert(Symbol::intern("k")));
    assert!(s.remove(Symbol::intern("k")));
    assert!(s.is_empty());
}

#[test]
fn extend_with_grows_past_inline_capacity() {
    let mut s = set(&["a", "b", "c"]);
    s.extend_with(&set(&["d", "e", "f"]));
    assert_eq!(s.len(), 6);
    assert_eq!(s, set(&["f", "e", "d", "c", "b", "a"]));
}

#[test]
fn generated_symbols_are_distinct_members() {
    let g = Symbol::generate("x");
    let s = SymbolSet::singleton(g);
    assert!(s.contains(g));
    assert!(!s.contains(Symbol::intern("x")));
}
