use mex_protocol::ChunkRange;

/// A contiguous slice of a payload, tagged with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub range: ChunkRange,
    pub data: &'a [u8],
}

impl Chunk<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A chunk after gzip compression, ready to be sent as a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedChunk {
    pub range: ChunkRange,
    /// Uncompressed length, kept for logging.
    pub raw_len: usize,
    pub body: Vec<u8>,
}

impl CompressedChunk {
    /// Compresses `chunk`.
    pub fn from_chunk(chunk: &Chunk<'_>) -> Result<Self, crate::TransferError> {
        Ok(Self {
            range: chunk.range,
            raw_len: chunk.len(),
            body: crate::compress(chunk.data)?,
        })
    }
}
