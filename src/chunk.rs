//! Chunk classification of raw transport deliveries

use crate::types::wire::chunk;

/// Payload kind named by a chunk's magic tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Video,
    Audio,
    /// Tag this driver does not know; the chunk is skipped.
    Unknown(u32),
}

impl ChunkKind {
    pub fn from_magic(magic: u32) -> Self {
        match magic {
            chunk::VIDEO_MAGIC => ChunkKind::Video,
            chunk::AUDIO_MAGIC => ChunkKind::Audio,
            other => ChunkKind::Unknown(other),
        }
    }
}

/// One fixed-size chunk with its header stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub kind: ChunkKind,
    pub payload: &'a [u8],
}

/// Iterator over the chunks of a well-formed delivery.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    inner: std::slice::ChunksExact<'a, u8>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.inner.next()?;
        let (header, payload) = raw.split_at(chunk::HEADER_LEN);
        let magic = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        Some(Chunk { kind: ChunkKind::from_magic(magic), payload })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Chunks<'_> {}

/// Split a delivery into chunks.
///
/// Returns `None` when the length is not a whole number of chunks; such a
/// delivery cannot be aligned and must be dropped entirely.
pub fn split(data: &[u8]) -> Option<Chunks<'_>> {
    if data.len() % chunk::SIZE != 0 {
        return None;
    }
    Some(Chunks { inner: data.chunks_exact(chunk::SIZE) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_chunk;

    #[test]
    fn classifies_by_magic() {
        let mut delivery = make_chunk(chunk::VIDEO_MAGIC, &[1, 2, 3], 0);
        delivery.extend(make_chunk(chunk::AUDIO_MAGIC, &[4], 0));
        delivery.extend(make_chunk(0xdead_beef, &[], 0));

        let chunks: Vec<_> = split(&delivery).expect("aligned").collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].kind, ChunkKind::Video);
        assert_eq!(&chunks[0].payload[..3], &[1, 2, 3]);
        assert_eq!(chunks[0].payload.len(), chunk::PAYLOAD_LEN);
        assert_eq!(chunks[1].kind, ChunkKind::Audio);
        assert_eq!(chunks[2].kind, ChunkKind::Unknown(0xdead_beef));
    }

    #[test]
    fn misaligned_delivery_is_rejected() {
        assert!(split(&[0u8; chunk::SIZE + 1]).is_none());
        assert!(split(&[0u8; chunk::SIZE - 4]).is_none());
        assert_eq!(split(&[]).map(|c| c.len()), Some(0));
    }

    #[test]
    fn magic_is_big_endian() {
        assert_eq!(
            ChunkKind::from_magic(u32::from_be_bytes([0xaa, 0xaa, 0x00, 0x01])),
            ChunkKind::Audio
        );
        assert_eq!(ChunkKind::from_magic(0x0000_aaaa), ChunkKind::Unknown(0x0000_aaaa));
    }
}
