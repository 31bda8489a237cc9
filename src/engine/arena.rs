//! Fixed-capacity per-frame storage.
//!
//! Everything here is sized once from [`RenderConfig`](crate::config::RenderConfig)
//! and cleared at frame entry; nothing grows while a frame is drawn.

use std::fmt;
use std::ops::{Index, IndexMut};

use thiserror::Error;

/// Which per-frame pool ran out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pool {
    Scans,
    Bunches,
    SectorStack,
    SpanNodes,
    Masks,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pool::Scans => "scans",
            Pool::Bunches => "bunches",
            Pool::SectorStack => "sector stack",
            Pool::SpanNodes => "span nodes",
            Pool::Masks => "masks",
        })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{pool} pool full ({capacity} entries)")]
pub struct CapacityError {
    pub pool: Pool,
    pub capacity: usize,
}

/// `Vec` that refuses to grow past the capacity it was built with.
#[derive(Clone, Debug)]
pub struct BoundedVec<T> {
    items: Vec<T>,
    capacity: usize,
    pool: Pool,
}

impl<T> BoundedVec<T> {
    pub fn new(pool: Pool, capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            pool,
        }
    }

    /// Append `item`, returning its index.
    #[inline]
    pub fn try_push(&mut self, item: T) -> Result<usize, CapacityError> {
        if self.items.len() == self.capacity {
            return Err(CapacityError {
                pool: self.pool,
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Index<usize> for BoundedVec<T> {
    type Output = T;
    #[inline(always)]
    fn index(&self, idx: usize) -> &T {
        &self.items[idx]
    }
}

impl<T> IndexMut<usize> for BoundedVec<T> {
    #[inline(always)]
    fn index_mut(&mut self, idx: usize) -> &mut T {
        &mut self.items[idx]
    }
}

/// Dense bit set over small integer ids.
#[derive(Clone, Debug, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    pub fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    /// Clear every bit and make room for `len` ids.
    pub fn reset(&mut self, len: usize) {
        self.words.clear();
        self.words.resize(len.div_ceil(64), 0);
    }

    /// Set bit `i`; returns `true` if it was clear before.
    #[inline]
    pub fn insert(&mut self, i: usize) -> bool {
        let (w, b) = (i / 64, 1u64 << (i % 64));
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        let fresh = self.words[w] & b == 0;
        self.words[w] |= b;
        fresh
    }

    #[inline]
    pub fn contains(&self, i: usize) -> bool {
        self.words
            .get(i / 64)
            .is_some_and(|w| w & (1u64 << (i % 64)) != 0)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            (0..64).filter(move |b| w & (1u64 << b) != 0).map(move |b| wi * 64 + b)
        })
    }
}
