use super::*;
use crate::state::Trail;

#[test]
fn can_insert_and_find() {
    let mut trail = Trail::new();
    let mut map = RevImmutableMultiMap::new(&mut trail, 4);

    map.insert(&mut trail, 11, "a");
    map.insert(&mut trail, 22, "b");

    assert_eq!(map.num_items(&trail), 2);
    assert!(map.contains_key(&trail, &11));
    assert!(!map.contains_key(&trail, &33));
    assert_eq!(map.find_with_default(&trail, &22, "-"), "b");
    assert_eq!(map.find_with_default(&trail, &33, "-"), "-");
}

#[test]
fn can_keep_several_values_per_key() {
    let mut trail = Trail::new();
    let mut map = RevImmutableMultiMap::new(&mut trail, 4);

    map.insert(&mut trail, 1, 10);
    map.insert(&mut trail, 1, 20);

    assert_eq!(map.num_items(&trail), 2);
    let found = map.find_with_default(&trail, &1, 0);
    assert!(found == 10 || found == 20);
}

#[test]
fn can_forget_insertions_on_backtrack() {
    let mut trail = Trail::new();
    let mut map = RevImmutableMultiMap::new(&mut trail, 4);
    map.insert(&mut trail, 1, 100);

    trail.push_frame();
    map.insert(&mut trail, 2, 200);
    assert!(map.contains_key(&trail, &2));

    trail.backtrack();
    assert_eq!(map.num_items(&trail), 1);
    assert!(map.contains_key(&trail, &1));
    assert!(!map.contains_key(&trail, &2));

    // Inserting again after the backtrack replaces the dead cells.
    map.insert(&mut trail, 3, 300);
    assert!(map.contains_key(&trail, &3));
    assert!(!map.contains_key(&trail, &2));
}

#[test]
fn can_double_the_bucket_array() {
    let mut trail = Trail::new();
    let mut map = RevImmutableMultiMap::new(&mut trail, 2);

    for key in 0..20 {
        map.insert(&mut trail, key, key * 10);
    }

    assert_eq!(map.num_items(&trail), 20);
    for key in 0..20 {
        assert_eq!(map.find_with_default(&trail, &key, -1), key * 10);
    }
}

#[test]
fn can_restore_across_a_doubling() {
    let mut trail = Trail::new();
    let mut map = RevImmutableMultiMap::new(&mut trail, 2);
    map.insert(&mut trail, 0, 0);
    map.insert(&mut trail, 1, 10);

    trail.push_frame();
    // These insertions force at least one doubling.
    for key in 2..12 {
        map.insert(&mut trail, key, key * 10);
    }
    assert_eq!(map.num_items(&trail), 12);

    trail.backtrack();
    assert_eq!(map.num_items(&trail), 2);
    assert_eq!(map.find_with_default(&trail, &0, -1), 0);
    assert_eq!(map.find_with_default(&trail, &1, -1), 10);
    assert!(!map.contains_key(&trail, &5));
}
