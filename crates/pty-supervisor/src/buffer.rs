use std::collections::VecDeque;

/// 10 MiB ring buffer of already-base64-encoded output chunks, oldest
/// chunks evicted on overflow (§4.G).
pub const MAX_BUFFER_BYTES: usize = 10 * 1024 * 1024;

#[derive(Default)]
pub struct RingBuffer {
    chunks: VecDeque<String>,
    total_bytes: usize,
}

impl RingBuffer {
    pub fn push(&mut self, chunk: String) {
        self.total_bytes += chunk.len();
        self.chunks.push_back(chunk);
        while self.total_bytes > MAX_BUFFER_BYTES {
            if let Some(evicted) = self.chunks.pop_front() {
                self.total_bytes -= evicted.len();
            } else {
                break;
            }
        }
    }

    pub fn replay(&self) -> Vec<String> {
        self.chunks.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_chunks_past_the_byte_cap() {
        let mut buffer = RingBuffer::default();
        let big_chunk = "a".repeat(MAX_BUFFER_BYTES / 2 + 1);
        buffer.push(big_chunk.clone());
        buffer.push(big_chunk.clone());
        buffer.push(big_chunk);
        assert_eq!(buffer.replay().len(), 1);
        assert!(buffer.total_bytes <= MAX_BUFFER_BYTES);
    }
}
