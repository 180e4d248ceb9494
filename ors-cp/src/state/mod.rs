//! Reversible state: a trail of undo records plus the primitives built on it.
//!
//! All reversible memory lives in arenas owned by the [`Trail`] and is
//! addressed through small copyable handles. A mutation first records the
//! pre-image of the touched slot, then writes; on backtrack the records above
//! the restored frame are replayed in reverse order. Mutations performed at
//! the root (outside of any frame) are permanent and not recorded.

#[cfg(test)]
#[path = "../../tests/unit/state/trail_test.rs"]
mod trail_test;

mod bitset;
mod fifo;
mod multimap;

pub use self::bitset::{RevBitMatrix, RevBitSet, SmallRevBitSet};
pub use self::fifo::SimpleRevFifo;
pub use self::multimap::RevImmutableMultiMap;

use std::marker::PhantomData;

/// An undo record: the slot it belongs to and its pre-image.
#[derive(Clone, Copy, Debug)]
enum Undo {
    Int { slot: usize, old: i64 },
    Word { slot: usize, old: u64 },
    Flag { slot: usize, old: bool },
}

/// A trail of undo records together with the arenas holding all reversible
/// memory. Pushing a frame opens a new search node; backtracking restores
/// every slot to the value it had when the frame was pushed.
#[derive(Default)]
pub struct Trail {
    undo: Vec<Undo>,
    frames: Vec<usize>,
    ints: Vec<i64>,
    words: Vec<u64>,
    word_stamps: Vec<u64>,
    flags: Vec<bool>,
    stamp: u64,
}

impl Trail {
    /// Creates an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current search depth: the number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Opens a new frame.
    pub fn push_frame(&mut self) {
        self.frames.push(self.undo.len());
        self.stamp += 1;
    }

    /// Closes the innermost frame, restoring every slot mutated inside it.
    pub fn backtrack(&mut self) {
        let mark = self.frames.pop().expect("backtrack without an open frame");
        while self.undo.len() > mark {
            match self.undo.pop().expect("undo entry") {
                Undo::Int { slot, old } => self.ints[slot] = old,
                Undo::Word { slot, old } => self.words[slot] = old,
                Undo::Flag { slot, old } => self.flags[slot] = old,
            }
        }
    }

    /// Closes frames until the given depth is reached.
    pub fn backtrack_to(&mut self, depth: usize) {
        while self.depth() > depth {
            self.backtrack();
        }
    }

    pub(crate) fn new_int(&mut self, value: i64) -> usize {
        self.ints.push(value);
        self.ints.len() - 1
    }

    pub(crate) fn int(&self, slot: usize) -> i64 {
        self.ints[slot]
    }

    pub(crate) fn set_int(&mut self, slot: usize, value: i64) {
        if !self.frames.is_empty() {
            self.undo.push(Undo::Int { slot, old: self.ints[slot] });
        }
        self.ints[slot] = value;
    }

    pub(crate) fn new_flag(&mut self, value: bool) -> usize {
        self.flags.push(value);
        self.flags.len() - 1
    }

    pub(crate) fn flag(&self, slot: usize) -> bool {
        self.flags[slot]
    }

    pub(crate) fn set_flag(&mut self, slot: usize, value: bool) {
        if !self.frames.is_empty() {
            self.undo.push(Undo::Flag { slot, old: self.flags[slot] });
        }
        self.flags[slot] = value;
    }

    pub(crate) fn new_word(&mut self, value: u64) -> usize {
        self.words.push(value);
        self.word_stamps.push(0);
        self.words.len() - 1
    }

    pub(crate) fn word(&self, slot: usize) -> u64 {
        self.words[slot]
    }

    /// Words are saved at most once per frame: the stamp of the slot tells
    /// whether its pre-image was already recorded for the current frame.
    pub(crate) fn set_word(&mut self, slot: usize, value: u64) {
        if !self.frames.is_empty() && self.word_stamps[slot] != self.stamp {
            self.undo.push(Undo::Word { slot, old: self.words[slot] });
            self.word_stamps[slot] = self.stamp;
        }
        self.words[slot] = value;
    }
}

/// A reversible value of a primitive type: reads are direct, writes are
/// recorded on the trail.
#[derive(Clone, Copy, Debug)]
pub struct Rev<T> {
    slot: usize,
    marker: PhantomData<T>,
}

impl Rev<i64> {
    /// Allocates a reversible integer holding `value`.
    pub fn new(trail: &mut Trail, value: i64) -> Self {
        Self { slot: trail.new_int(value), marker: PhantomData }
    }

    /// Returns the current value.
    pub fn value(&self, trail: &Trail) -> i64 {
        trail.int(self.slot)
    }

    /// Sets the value, recording the previous one.
    pub fn set_value(&self, trail: &mut Trail, value: i64) {
        trail.set_int(self.slot, value);
    }

    /// Increments the value.
    pub fn incr(&self, trail: &mut Trail) {
        let value = self.value(trail);
        self.set_value(trail, value + 1);
    }

    /// Decrements the value.
    pub fn decr(&self, trail: &mut Trail) {
        let value = self.value(trail);
        self.set_value(trail, value - 1);
    }
}

impl Rev<u64> {
    /// Allocates a reversible word holding `value`.
    pub fn new(trail: &mut Trail, value: u64) -> Self {
        Self { slot: trail.new_word(value), marker: PhantomData }
    }

    /// Returns the current value.
    pub fn value(&self, trail: &Trail) -> u64 {
        trail.word(self.slot)
    }

    /// Sets the value; the pre-image is recorded at most once per frame.
    pub fn set_value(&self, trail: &mut Trail, value: u64) {
        trail.set_word(self.slot, value);
    }
}

impl Rev<bool> {
    /// Allocates a reversible boolean holding `value`.
    pub fn new(trail: &mut Trail, value: bool) -> Self {
        Self { slot: trail.new_flag(value), marker: PhantomData }
    }

    /// Returns the current value.
    pub fn value(&self, trail: &Trail) -> bool {
        trail.flag(self.slot)
    }

    /// Sets the value, recording the previous one.
    pub fn set_value(&self, trail: &mut Trail, value: bool) {
        trail.set_flag(self.slot, value);
    }
}

/// A reversible switch that can switch once from false to true.
#[derive(Clone, Copy, Debug)]
pub struct RevSwitch {
    value: Rev<bool>,
}

impl RevSwitch {
    /// Creates a switch in the false position.
    pub fn new(trail: &mut Trail) -> Self {
        Self { value: Rev::<bool>::new(trail, false) }
    }

    /// Returns true once the switch was flipped.
    pub fn switched(&self, trail: &Trail) -> bool {
        self.value.value(trail)
    }

    /// Flips the switch.
    pub fn switch(&self, trail: &mut Trail) {
        self.value.set_value(trail, true);
    }
}
