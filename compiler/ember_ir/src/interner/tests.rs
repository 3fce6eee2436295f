use super::*;

#[test]
fn interning_is_idempotent() {
    let table = SymbolTable::new();

    let car = table.intern("car");
    let cdr = table.intern("cdr");

    assert_eq!(table.intern("car"), car);
    assert_ne!(car, cdr);
    assert_eq!(table.lookup(car), "car");
    assert_eq!(table.lookup(cdr), "cdr");
}

#[test]
fn empty_text_is_an_ordinary_name() {
    let table = SymbolTable::new();
    assert!(table.is_empty());
    let empty = table.intern("");
    assert_eq!(table.lookup(empty), "");
    assert_eq!(table.len(), 1);
}

#[test]
fn len_counts_distinct_names_across_shards() {
    let table = SymbolTable::new();
    for text in ["lambda", "lambda", "dynamic-let", "call/cc", "using*"] {
        table.intern(text);
    }
    assert_eq!(table.len(), 4);
}

#[test]
fn names_land_in_more_than_one_shard() {
    let table = SymbolTable::new();
    let shards: std::collections::BTreeSet<_> = (0..64)
        .map(|i| table.intern(&format!("sym{i}")).shard())
        .collect();
    assert!(shards.len() > 1);
}

#[test]
fn concurrent_interning_agrees() {
    let table = std::sync::Arc::new(SymbolTable::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let table = std::sync::Arc::clone(&table);
            std::thread::spawn(move || {
                (0..100)
                    .map(|i| table.intern(&format!("sym{i}")))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let results: Vec<Vec<Name>> = handles.into_iter().filter_map(|h| h.join().ok()).collect();
    assert_eq!(results.len(), 4);
    for other in &results[1..] {
        assert_eq!(&results[0], other);
    }
    assert_eq!(table.len(), 100);
}
