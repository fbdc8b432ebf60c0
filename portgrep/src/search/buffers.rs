use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use crate::config::BufferRetention;

/// A pool of byte buffers reused across Makefile reads.
///
/// Buffers come back cleared but keep their capacity, so after the first
/// few ports a search stops allocating per file. With
/// [`BufferRetention::Retain`] the pool holds on to everything it is given
/// until it is dropped at the end of the search; with
/// [`BufferRetention::Bounded`] it keeps at most `limit` idle buffers.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    retention: BufferRetention,
    limit: usize,
}

impl BufferPool {
    pub fn new(retention: BufferRetention, limit: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            retention,
            limit,
        }
    }

    /// Takes an empty buffer out of the pool, allocating if none is idle
    pub fn get(&self) -> PooledBuffer<'_> {
        let buf = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledBuffer { buf, pool: self }
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn put(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.retention == BufferRetention::Retain || idle.len() < self.limit {
            idle.push(buf);
        }
    }
}

/// A buffer on loan from a [`BufferPool`]; returned on drop
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    buf: Vec<u8>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}
