use bytes::Bytes;
use futures::Stream;
use std::io;

/// Generate deterministic test data using a seeded pseudo-random generator
/// Same seed produces same output (reproducible tests)
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    // Simple LCG (Linear Congruential Generator)
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// Split `data` into a stream of `piece`-sized items.
pub fn split_stream(data: Bytes, piece: usize) -> impl Stream<Item = io::Result<Bytes>> + Send {
    let mut items = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + piece).min(data.len());
        items.push(Ok(data.slice(offset..end)));
        offset = end;
    }
    futures::stream::iter(items)
}

/// Concatenate parts in order.
pub fn concat(parts: &[Bytes]) -> Vec<u8> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_bytes_deterministic() {
        let data1 = seeded_bytes(42, 1000);
        let data2 = seeded_bytes(42, 1000);
        assert_eq!(data1, data2);
    }

    #[test]
    fn test_seeded_bytes_different_seeds() {
        let data1 = seeded_bytes(42, 1000);
        let data2 = seeded_bytes(43, 1000);
        assert_ne!(data1, data2);
    }
}
