#[cfg(test)]
#[path = "../../tests/unit/state/bitset_test.rs"]
mod bitset_test;

use crate::state::{Rev, Trail};

const BITS_IN_WORD: usize = 64;

/// A small reversible bitset (up to 64 bits), useful to maintain supports.
#[derive(Clone, Copy, Debug)]
pub struct SmallRevBitSet {
    bits: Rev<u64>,
    size: usize,
}

impl SmallRevBitSet {
    /// Creates a bitset with all bits at zero.
    pub fn new(trail: &mut Trail, size: usize) -> Self {
        assert!(size <= BITS_IN_WORD, "small bitset is limited to 64 bits");
        Self { bits: Rev::<u64>::new(trail, 0), size }
    }

    /// Sets the `pos` bit.
    pub fn set_to_one(&self, trail: &mut Trail, pos: usize) {
        debug_assert!(pos < self.size);
        let bits = self.bits.value(trail);
        self.bits.set_value(trail, bits | (1 << pos));
    }

    /// Erases the `pos` bit.
    pub fn set_to_zero(&self, trail: &mut Trail, pos: usize) {
        debug_assert!(pos < self.size);
        let bits = self.bits.value(trail);
        self.bits.set_value(trail, bits & !(1 << pos));
    }

    /// Returns the number of bits set to one.
    pub fn cardinality(&self, trail: &Trail) -> usize {
        self.bits.value(trail).count_ones() as usize
    }

    /// Returns true when no bit is set.
    pub fn is_cardinality_zero(&self, trail: &Trail) -> bool {
        self.bits.value(trail) == 0
    }

    /// Returns true when exactly one bit is set.
    pub fn is_cardinality_one(&self, trail: &Trail) -> bool {
        let bits = self.bits.value(trail);
        bits != 0 && bits & (bits - 1) == 0
    }

    /// Returns the index of the first bit set, or None when the bitset is
    /// empty.
    pub fn get_first_one(&self, trail: &Trail) -> Option<usize> {
        let bits = self.bits.value(trail);
        (bits != 0).then(|| bits.trailing_zeros() as usize)
    }
}

/// A reversible bitset of arbitrary size. Every 64-bit word is saved at most
/// once per search frame through the stamps kept by the trail.
#[derive(Clone, Debug)]
pub struct RevBitSet {
    words: Vec<usize>,
    size: usize,
}

impl RevBitSet {
    /// Creates a bitset with all bits at zero.
    pub fn new(trail: &mut Trail, size: usize) -> Self {
        let words = (0..size.div_ceil(BITS_IN_WORD)).map(|_| trail.new_word(0)).collect();
        Self { words, size }
    }

    /// Returns the number of bits the bitset holds.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sets the `pos` bit.
    pub fn set_to_one(&self, trail: &mut Trail, pos: usize) {
        debug_assert!(pos < self.size);
        let slot = self.words[pos / BITS_IN_WORD];
        trail.set_word(slot, trail.word(slot) | (1 << (pos % BITS_IN_WORD)));
    }

    /// Erases the `pos` bit.
    pub fn set_to_zero(&self, trail: &mut Trail, pos: usize) {
        debug_assert!(pos < self.size);
        let slot = self.words[pos / BITS_IN_WORD];
        trail.set_word(slot, trail.word(slot) & !(1 << (pos % BITS_IN_WORD)));
    }

    /// Returns whether the `pos` bit is set.
    pub fn is_set(&self, trail: &Trail, pos: usize) -> bool {
        debug_assert!(pos < self.size);
        trail.word(self.words[pos / BITS_IN_WORD]) & (1 << (pos % BITS_IN_WORD)) != 0
    }

    /// Returns the number of bits set to one.
    pub fn cardinality(&self, trail: &Trail) -> usize {
        self.words.iter().map(|&slot| trail.word(slot).count_ones() as usize).sum()
    }

    /// Returns true when no bit is set.
    pub fn is_cardinality_zero(&self, trail: &Trail) -> bool {
        self.words.iter().all(|&slot| trail.word(slot) == 0)
    }

    /// Returns true when exactly one bit is set.
    pub fn is_cardinality_one(&self, trail: &Trail) -> bool {
        let mut seen_one = false;
        for &slot in &self.words {
            let word = trail.word(slot);
            if word != 0 {
                if seen_one || word & (word - 1) != 0 {
                    return false;
                }
                seen_one = true;
            }
        }
        seen_one
    }

    /// Returns the first bit set at a position greater or equal to `start`,
    /// or None when there is none.
    pub fn get_first_bit(&self, trail: &Trail, start: usize) -> Option<usize> {
        if start >= self.size {
            return None;
        }
        let mut word_index = start / BITS_IN_WORD;
        let mut word = trail.word(self.words[word_index]) & (u64::MAX << (start % BITS_IN_WORD));
        loop {
            if word != 0 {
                let pos = word_index * BITS_IN_WORD + word.trailing_zeros() as usize;
                return (pos < self.size).then_some(pos);
            }
            word_index += 1;
            if word_index == self.words.len() {
                return None;
            }
            word = trail.word(self.words[word_index]);
        }
    }

    /// Erases all bits.
    pub fn clear_all(&self, trail: &mut Trail) {
        for &slot in &self.words {
            if trail.word(slot) != 0 {
                trail.set_word(slot, 0);
            }
        }
    }
}

/// Matrix version of the [`RevBitSet`].
#[derive(Clone, Debug)]
pub struct RevBitMatrix {
    bitset: RevBitSet,
    rows: usize,
    columns: usize,
}

impl RevBitMatrix {
    /// Creates a matrix with all bits at zero.
    pub fn new(trail: &mut Trail, rows: usize, columns: usize) -> Self {
        Self { bitset: RevBitSet::new(trail, rows * columns), rows, columns }
    }

    fn offset(&self, row: usize, column: usize) -> usize {
        debug_assert!(row < self.rows && column < self.columns);
        row * self.columns + column
    }

    /// Sets the `column` bit in the `row` row.
    pub fn set_to_one(&self, trail: &mut Trail, row: usize, column: usize) {
        self.bitset.set_to_one(trail, self.offset(row, column));
    }

    /// Erases the `column` bit in the `row` row.
    pub fn set_to_zero(&self, trail: &mut Trail, row: usize, column: usize) {
        self.bitset.set_to_zero(trail, self.offset(row, column));
    }

    /// Returns whether the `column` bit in the `row` row is set.
    pub fn is_set(&self, trail: &Trail, row: usize, column: usize) -> bool {
        self.bitset.is_set(trail, self.offset(row, column))
    }

    /// Returns the number of bits set to one in the `row` row.
    pub fn cardinality(&self, trail: &Trail, row: usize) -> usize {
        let first = row * self.columns;
        let mut count = 0;
        let mut position = first;
        while let Some(pos) = self.bitset.get_first_bit(trail, position) {
            if pos >= first + self.columns {
                break;
            }
            count += 1;
            position = pos + 1;
        }
        count
    }

    /// Returns the first bit set in the `row` row at a column greater or
    /// equal to `start`, or None when there is none.
    pub fn get_first_bit(&self, trail: &Trail, row: usize, start: usize) -> Option<usize> {
        let first = row * self.columns;
        self.bitset
            .get_first_bit(trail, first + start)
            .filter(|&pos| pos < first + self.columns)
            .map(|pos| pos - first)
    }

    /// Erases all bits.
    pub fn clear_all(&self, trail: &mut Trail) {
        self.bitset.clear_all(trail);
    }
}
