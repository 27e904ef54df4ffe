//! Lazily Allocated Block Tables.
//!
//! A block table is a fixed array of optional 4 KiB blocks indexed by word number. A block
//! is allocated the first time one of its words is written; reads of unallocated blocks see
//! the default value and never allocate.

use crate::common::constants::BLOCK_LENGTH_WORDS;

/// Sparse word storage made of fixed-size blocks.
#[derive(Clone, Debug)]
pub struct BlockTable<T> {
    blocks: Vec<Option<Box<[T]>>>,
}

impl<T: Clone + Default> BlockTable<T> {
    /// Creates a table with `length` unallocated blocks.
    pub fn new(length: usize) -> Self {
        Self {
            blocks: vec![None; length],
        }
    }

    /// Number of words the table can address.
    pub fn capacity_words(&self) -> usize {
        self.blocks.len() * BLOCK_LENGTH_WORDS
    }

    /// Returns `true` if `word` lies inside the table.
    pub fn contains(&self, word: usize) -> bool {
        word < self.capacity_words()
    }

    /// Reads a word slot.
    ///
    /// # Returns
    ///
    /// `None` if the word is beyond the table or its block has never been written.
    pub fn get(&self, word: usize) -> Option<&T> {
        let (block, offset) = split(word);
        self.blocks.get(block)?.as_deref().map(|b| &b[offset])
    }

    /// Returns a mutable word slot, allocating its block on first use.
    ///
    /// # Returns
    ///
    /// `None` if the word is beyond the table.
    pub fn get_or_allocate(&mut self, word: usize) -> Option<&mut T> {
        let (block, offset) = split(word);
        let slot = self.blocks.get_mut(block)?;
        let block = slot.get_or_insert_with(|| vec![T::default(); BLOCK_LENGTH_WORDS].into_boxed_slice());
        Some(&mut block[offset])
    }

    /// Returns `true` if the block containing `word` has been allocated.
    pub fn is_allocated(&self, word: usize) -> bool {
        let (block, _) = split(word);
        self.blocks.get(block).is_some_and(Option::is_some)
    }

    /// Number of allocated blocks.
    pub fn allocated_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    /// Drops every block.
    pub fn clear(&mut self) {
        self.blocks.iter_mut().for_each(|b| *b = None);
    }
}

const fn split(word: usize) -> (usize, usize) {
    (word / BLOCK_LENGTH_WORDS, word % BLOCK_LENGTH_WORDS)
}
