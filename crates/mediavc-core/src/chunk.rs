//! Deterministic chunking of large values.

/// 48 KiB chunks.
pub const CHUNK_SIZE_48KB: usize = 48 * 1024;
/// 128 KiB chunks.
pub const CHUNK_SIZE_128KB: usize = 128 * 1024;
/// 256 KiB chunks.
pub const CHUNK_SIZE_256KB: usize = 256 * 1024;
/// 512 KiB chunks.
pub const CHUNK_SIZE_512KB: usize = 512 * 1024;
/// 1 MiB chunks.
pub const CHUNK_SIZE_1MB: usize = 1024 * 1024;
/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = CHUNK_SIZE_256KB;

/// Splits a byte sequence into chunk boundaries.
pub trait Chunker: Send + Sync {
    /// End offsets of each chunk. Empty input yields no boundaries; the last
    /// offset always equals `bytes.len()`.
    fn chunk(&self, bytes: &[u8]) -> Vec<usize>;

    /// Nominal chunk size in bytes.
    fn chunk_size(&self) -> usize;
}

/// Cuts every `size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    size: usize,
}

impl FixedSizeChunker {
    /// Create a chunker. A zero size is bumped to one byte.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, bytes: &[u8]) -> Vec<usize> {
        let mut offsets: Vec<usize> = (1..=bytes.len() / self.size)
            .map(|i| i * self.size)
            .collect();
        if bytes.len() % self.size != 0 {
            offsets.push(bytes.len());
        }
        offsets
    }

    fn chunk_size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_cover_input() {
        let chunker = FixedSizeChunker::new(4);
        assert_eq!(chunker.chunk(&[0; 10]), vec![4, 8, 10]);
        assert_eq!(chunker.chunk(&[0; 8]), vec![4, 8]);
        assert_eq!(chunker.chunk(&[0; 3]), vec![3]);
        assert!(chunker.chunk(&[]).is_empty());
    }

    #[test]
    fn default_is_256k() {
        assert_eq!(FixedSizeChunker::default().chunk_size(), 256 * 1024);
    }
}
