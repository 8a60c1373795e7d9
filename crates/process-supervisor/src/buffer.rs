use std::collections::VecDeque;

/// Per-stream 10 MiB FIFO-evicted buffer (§4.H).
pub const MAX_BUFFER_BYTES: usize = 10 * 1024 * 1024;

#[derive(Default)]
pub struct StreamBuffer {
    chunks: VecDeque<Vec<u8>>,
    total_bytes: usize,
}

impl StreamBuffer {
    pub fn push(&mut self, chunk: Vec<u8>) {
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

    pub fn replay(&self) -> Vec<Vec<u8>> {
        self.chunks.iter().cloned().collect()
    }
}
