use super::*;

#[test]
fn can_insert_and_look_up_tuples() {
    let mut tuples = IntTupleSet::new(2);

    tuples.insert2(1, 2);
    tuples.insert2(3, 4);

    assert_eq!(tuples.arity(), 2);
    assert_eq!(tuples.num_tuples(), 2);
    assert!(tuples.contains(&[1, 2]));
    assert!(tuples.contains(&[3, 4]));
    assert!(!tuples.contains(&[2, 1]));
    assert!(!tuples.contains(&[1, 2, 3]));
}

#[test]
fn can_skip_duplicates() {
    let mut tuples = IntTupleSet::new(3);

    tuples.insert3(1, 2, 3);
    tuples.insert3(1, 2, 3);

    assert_eq!(tuples.num_tuples(), 1);
    assert_eq!(tuples.value(0, 0), 1);
    assert_eq!(tuples.value(0, 2), 3);
}

#[test]
fn can_insert_many_at_once() {
    let mut tuples = IntTupleSet::new(2);

    tuples.insert_all([[1i64, 2].as_slice(), [3, 4].as_slice(), [1, 2].as_slice()]);

    assert_eq!(tuples.num_tuples(), 2);
}

#[test]
fn can_share_payload_lazily() {
    let mut original = IntTupleSet::new(2);
    original.insert2(1, 2);

    let copy = original.clone();
    assert_eq!(original.num_shared_owners(), 2);
    assert_eq!(copy.num_shared_owners(), 2);

    // Mutating one handle clones the payload, the copy keeps its view.
    original.insert2(3, 4);
    assert_eq!(original.num_shared_owners(), 1);
    assert_eq!(copy.num_shared_owners(), 1);
    assert_eq!(original.num_tuples(), 2);
    assert_eq!(copy.num_tuples(), 1);
    assert!(!copy.contains(&[3, 4]));
}

#[test]
fn can_clear_without_touching_copies() {
    let mut original = IntTupleSet::new(2);
    original.insert2(1, 2);
    let copy = original.clone();

    original.clear();

    assert_eq!(original.num_tuples(), 0);
    assert_eq!(copy.num_tuples(), 1);
}
