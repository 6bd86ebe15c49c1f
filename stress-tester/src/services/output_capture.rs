//! Helper to handle child process stdout/stderr output
//!
//! Workers are started with piped output. Consumer tasks drain both pipes
//! for the lifetime of the process so a chatty worker never blocks on a full
//! pipe, keeping only a bounded tail for diagnostics.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Bytes kept per stream
pub const OUTPUT_TAIL_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;

/// Bounded tail of one output stream
#[derive(Debug)]
pub struct OutputBuffer {
    data: Mutex<Vec<u8>>,
    capacity: usize,
    closed: AtomicBool,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(Vec::new()),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    pub fn append(&self, chunk: &[u8]) {
        let mut data = self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        data.extend_from_slice(chunk);
        if data.len() > self.capacity {
            let excess = data.len() - self.capacity;
            data.drain(..excess);
        }
    }

    /// Buffered text, lossily decoded and trimmed
    pub fn contents(&self) -> String {
        let data = self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&data).trim().to_string()
    }

    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// True once the stream reached EOF
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(OUTPUT_TAIL_BYTES)
    }
}

/// Spawn a task that copies `reader` into `buffer` until EOF
pub fn spawn_output_consumer<R>(mut reader: R, buffer: Arc<OutputBuffer>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.append(&chunk[..n]),
            }
        }
        buffer.mark_closed();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_keeps_tail() {
        let buffer = OutputBuffer::new(8);
        buffer.append(b"0123456789");
        buffer.append(b"ab");

        assert_eq!(buffer.contents(), "456789ab");
    }

    #[test]
    fn test_contents_lossy_and_trimmed() {
        let buffer = OutputBuffer::default();
        buffer.append(b"  line\xff\n");

        assert_eq!(buffer.contents(), "line\u{fffd}");
    }

    #[tokio::test]
    async fn test_consumer_drains_until_eof() {
        let buffer = Arc::new(OutputBuffer::default());
        let reader: &'static [u8] = b"frame=1 fps=30\nframe=2 fps=30\n";

        spawn_output_consumer(reader, buffer.clone()).await.unwrap();

        assert!(buffer.is_closed());
        assert_eq!(buffer.contents(), "frame=1 fps=30\nframe=2 fps=30");
    }
}
