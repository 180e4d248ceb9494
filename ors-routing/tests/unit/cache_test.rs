use super::*;
use std::cell::Cell;

fn create_counting_cache(calls: Rc<Cell<usize>>) -> RoutingCache {
    let evaluator: Rc<IndexEvaluator> = Rc::new(move |from, to| {
        calls.set(calls.get() + 1);
        10 * from + to
    });
    RoutingCache::new(vec![evaluator.clone(), evaluator], 4)
}

#[test]
fn can_memoize_the_last_query_per_slot() {
    let calls = Rc::new(Cell::new(0));
    let cache = create_counting_cache(calls.clone());

    assert_eq!(cache.cost(1, 2, 0), 12);
    assert_eq!(cache.cost(1, 2, 0), 12);
    assert_eq!(cache.cost(1, 2, 0), 12);

    assert_eq!(calls.get(), 1);
}

#[test]
fn can_recompute_on_a_different_target() {
    let calls = Rc::new(Cell::new(0));
    let cache = create_counting_cache(calls.clone());

    assert_eq!(cache.cost(1, 2, 0), 12);
    assert_eq!(cache.cost(1, 3, 0), 13);
    assert_eq!(cache.cost(1, 2, 0), 12);

    assert_eq!(calls.get(), 3);
}

#[test]
fn can_key_the_cache_by_vehicle() {
    let calls = Rc::new(Cell::new(0));
    let cache = create_counting_cache(calls.clone());

    assert_eq!(cache.cost(1, 2, 0), 12);
    assert_eq!(cache.cost(1, 2, 1), 12);

    assert_eq!(calls.get(), 2);
}

#[test]
fn can_keep_slots_independent() {
    let calls = Rc::new(Cell::new(0));
    let cache = create_counting_cache(calls.clone());

    assert_eq!(cache.cost(0, 1, 0), 1);
    assert_eq!(cache.cost(2, 1, 0), 21);
    assert_eq!(cache.cost(0, 1, 0), 1);

    assert_eq!(calls.get(), 2);
}

#[test]
fn can_clear_the_cache() {
    let calls = Rc::new(Cell::new(0));
    let cache = create_counting_cache(calls.clone());
    cache.cost(1, 2, 0);

    cache.clear();
    cache.cost(1, 2, 0);

    assert_eq!(calls.get(), 2);
}
