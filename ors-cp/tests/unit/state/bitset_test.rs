use super::*;
use crate::state::Trail;

#[test]
fn can_use_small_bitset() {
    let mut trail = Trail::new();
    let bitset = SmallRevBitSet::new(&mut trail, 10);

    assert!(bitset.is_cardinality_zero(&trail));
    bitset.set_to_one(&mut trail, 3);
    assert!(bitset.is_cardinality_one(&trail));
    assert_eq!(bitset.get_first_one(&trail), Some(3));

    bitset.set_to_one(&mut trail, 7);
    assert_eq!(bitset.cardinality(&trail), 2);
    assert!(!bitset.is_cardinality_one(&trail));

    bitset.set_to_zero(&mut trail, 3);
    assert_eq!(bitset.get_first_one(&trail), Some(7));
}

#[test]
fn can_restore_small_bitset_on_backtrack() {
    let mut trail = Trail::new();
    let bitset = SmallRevBitSet::new(&mut trail, 4);
    bitset.set_to_one(&mut trail, 0);

    trail.push_frame();
    bitset.set_to_zero(&mut trail, 0);
    bitset.set_to_one(&mut trail, 2);
    assert_eq!(bitset.get_first_one(&trail), Some(2));

    trail.backtrack();
    assert_eq!(bitset.get_first_one(&trail), Some(0));
    assert_eq!(bitset.cardinality(&trail), 1);
}

#[test]
fn can_use_bits_across_words() {
    let mut trail = Trail::new();
    let bitset = RevBitSet::new(&mut trail, 130);

    bitset.set_to_one(&mut trail, 0);
    bitset.set_to_one(&mut trail, 63);
    bitset.set_to_one(&mut trail, 64);
    bitset.set_to_one(&mut trail, 129);

    assert_eq!(bitset.cardinality(&trail), 4);
    assert_eq!(bitset.get_first_bit(&trail, 0), Some(0));
    assert_eq!(bitset.get_first_bit(&trail, 1), Some(63));
    assert_eq!(bitset.get_first_bit(&trail, 64), Some(64));
    assert_eq!(bitset.get_first_bit(&trail, 65), Some(129));
    assert_eq!(bitset.get_first_bit(&trail, 130), None);
}

#[test]
fn can_restore_words_on_backtrack() {
    let mut trail = Trail::new();
    let bitset = RevBitSet::new(&mut trail, 100);
    bitset.set_to_one(&mut trail, 10);

    trail.push_frame();
    bitset.set_to_one(&mut trail, 80);
    bitset.set_to_zero(&mut trail, 10);
    assert!(bitset.is_set(&trail, 80));
    assert!(!bitset.is_set(&trail, 10));

    trail.backtrack();
    assert!(!bitset.is_set(&trail, 80));
    assert!(bitset.is_set(&trail, 10));
}

#[test]
fn can_clear_all_bits() {
    let mut trail = Trail::new();
    let bitset = RevBitSet::new(&mut trail, 100);
    bitset.set_to_one(&mut trail, 1);
    bitset.set_to_one(&mut trail, 99);

    trail.push_frame();
    bitset.clear_all(&mut trail);
    assert!(bitset.is_cardinality_zero(&trail));

    trail.backtrack();
    assert_eq!(bitset.cardinality(&trail), 2);
}

#[test]
fn can_detect_cardinality_one() {
    let mut trail = Trail::new();
    let bitset = RevBitSet::new(&mut trail, 100);

    assert!(!bitset.is_cardinality_one(&trail));
    bitset.set_to_one(&mut trail, 70);
    assert!(bitset.is_cardinality_one(&trail));
    bitset.set_to_one(&mut trail, 5);
    assert!(!bitset.is_cardinality_one(&trail));
}

#[test]
fn can_use_matrix_rows_independently() {
    let mut trail = Trail::new();
    let matrix = RevBitMatrix::new(&mut trail, 3, 70);

    matrix.set_to_one(&mut trail, 0, 69);
    matrix.set_to_one(&mut trail, 1, 0);
    matrix.set_to_one(&mut trail, 1, 5);

    assert!(matrix.is_set(&trail, 0, 69));
    assert!(!matrix.is_set(&trail, 2, 69));
    assert_eq!(matrix.cardinality(&trail, 0), 1);
    assert_eq!(matrix.cardinality(&trail, 1), 2);
    assert_eq!(matrix.cardinality(&trail, 2), 0);
    assert_eq!(matrix.get_first_bit(&trail, 1, 1), Some(5));
    assert_eq!(matrix.get_first_bit(&trail, 2, 0), None);

    trail.push_frame();
    matrix.set_to_zero(&mut trail, 1, 0);
    assert_eq!(matrix.cardinality(&trail, 1), 1);
    trail.backtrack();
    assert_eq!(matrix.cardinality(&trail, 1), 2);
}
