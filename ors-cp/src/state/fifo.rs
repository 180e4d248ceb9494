#[cfg(test)]
#[path = "../../tests/unit/state/fifo_test.rs"]
mod fifo_test;

use crate::state::{Rev, Trail};

const CHUNK_SIZE: usize = 16;

struct Chunk<T> {
    data: [Option<T>; CHUNK_SIZE],
    prev: i64,
}

/// A reversible FIFO structure: elements pushed inside a frame disappear
/// again when the frame is backtracked. Its main use is to store the lists of
/// demons attached to the variables of a solver.
///
/// Storage is chunked: sixteen slots are allocated at once and only the head
/// chunk handle and the write position are recorded on the trail. Chunks made
/// unreachable by a backtrack stay in the arena; the next push that needs a
/// fresh chunk allocates a new one.
///
/// The iterator yields elements from the most recently pushed one backwards;
/// that traversal order is relied upon and should not be changed.
pub struct SimpleRevFifo<T> {
    chunks: Vec<Chunk<T>>,
    head: Rev<i64>,
    pos: Rev<i64>,
}

impl<T: Copy> SimpleRevFifo<T> {
    /// Creates an empty FIFO.
    pub fn new(trail: &mut Trail) -> Self {
        Self { chunks: Vec::new(), head: Rev::<i64>::new(trail, -1), pos: Rev::<i64>::new(trail, 0) }
    }

    /// Pushes a value.
    pub fn push(&mut self, trail: &mut Trail, value: T) {
        if self.head.value(trail) < 0 || self.pos.value(trail) == 0 {
            self.chunks.push(Chunk { data: [None; CHUNK_SIZE], prev: self.head.value(trail) });
            self.head.set_value(trail, self.chunks.len() as i64 - 1);
            self.pos.set_value(trail, CHUNK_SIZE as i64 - 1);
        } else {
            self.pos.decr(trail);
        }
        let head = self.head.value(trail) as usize;
        let pos = self.pos.value(trail) as usize;
        self.chunks[head].data[pos] = Some(value);
    }

    /// Returns the last pushed value, if any.
    pub fn last(&self, trail: &Trail) -> Option<T> {
        let head = self.head.value(trail);
        if head < 0 {
            return None;
        }
        self.chunks[head as usize].data[self.pos.value(trail) as usize]
    }

    /// Returns true when the FIFO holds no element.
    pub fn is_empty(&self, trail: &Trail) -> bool {
        self.head.value(trail) < 0
    }

    /// Returns an iterator from the most recently pushed element backwards.
    pub fn iter<'a>(&'a self, trail: &'a Trail) -> impl Iterator<Item = T> + 'a {
        let mut chunk = self.head.value(trail);
        let mut pos = self.pos.value(trail) as usize;
        let mut first = true;
        std::iter::from_fn(move || {
            if chunk < 0 {
                return None;
            }
            if first {
                first = false;
            } else {
                pos += 1;
                if pos == CHUNK_SIZE {
                    chunk = self.chunks[chunk as usize].prev;
                    pos = 0;
                    if chunk < 0 {
                        return None;
                    }
                }
            }
            self.chunks[chunk as usize].data[pos]
        })
    }
}

impl<T: Copy + PartialEq> SimpleRevFifo<T> {
    /// Pushes the value only when it differs from the last pushed one.
    pub fn push_if_not_last(&mut self, trail: &mut Trail, value: T) {
        if self.last(trail) != Some(value) {
            self.push(trail, value);
        }
    }
}
