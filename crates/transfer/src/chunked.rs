use mex_protocol::ChunkRange;

use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Number of chunks a payload of `len` bytes splits into.
///
/// An empty payload counts as one (empty) chunk so that it is still sent
/// with a single request.
pub fn chunk_count(len: usize, limit: usize) -> usize {
    let limit = effective_limit(limit);
    if len == 0 { 1 } else { len.div_ceil(limit) }
}

fn effective_limit(limit: usize) -> usize {
    if limit == 0 { DEFAULT_CHUNK_SIZE } else { limit }
}

/// Splits `payload` into fixed-size chunks, eagerly.
pub fn split_payload(payload: &[u8], limit: usize) -> Result<Vec<Chunk<'_>>, TransferError> {
    Ok(ChunkSplitter::new(payload, limit)?.collect())
}

/// Walks a payload in fixed-size chunks without copying it.
///
/// Every chunk is `limit` bytes long except the last, which holds the
/// remainder. An empty payload yields exactly one empty chunk `1:1`.
#[derive(Debug, Clone)]
pub struct ChunkSplitter<'a> {
    payload: &'a [u8],
    limit: usize,
    total: u32,
    next: u32,
}

impl<'a> ChunkSplitter<'a> {
    /// Prepares to split `payload`.
    ///
    /// If `limit` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(payload: &'a [u8], limit: usize) -> Result<Self, TransferError> {
        let limit = effective_limit(limit);
        let count = chunk_count(payload.len(), limit);
        let total = u32::try_from(count).map_err(|_| TransferError::TooManyChunks(count))?;
        Ok(Self {
            payload,
            limit,
            total,
            next: 1,
        })
    }

    /// Total number of chunks, known before the first one is produced.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Effective chunk size limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Chunks not yet produced.
    pub fn remaining(&self) -> u32 {
        self.total + 1 - self.next
    }
}

impl<'a> Iterator for ChunkSplitter<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.total {
            return None;
        }
        let start = (self.next as usize - 1) * self.limit;
        let end = std::cmp::min(start + self.limit, self.payload.len());
        let range = ChunkRange::new(self.next, self.total).ok()?;
        self.next += 1;
        Some(Chunk {
            range,
            data: &self.payload[start..end],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkSplitter<'_> {}
