// Playback queue shared between the control side and the render thread
// Chunks, read cursor and session id sit behind one lock so they always change together.

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::format::PcmChunk;

/// Identifies the `play` call that currently owns the queue contents
pub type SessionId = u64;

#[derive(Default)]
struct QueueState {
    chunks: VecDeque<PcmChunk>,
    /// Bytes already consumed from the head chunk; always < head length
    cursor: usize,
    /// Unread bytes across all queued chunks
    queued_bytes: usize,
    session: SessionId,
}

impl QueueState {
    fn take_all(&mut self) -> VecDeque<PcmChunk> {
        self.cursor = 0;
        self.queued_bytes = 0;
        std::mem::take(&mut self.chunks)
    }

    fn append(&mut self, chunk: PcmChunk) {
        // A zero-length head would break the cursor invariant
        if chunk.is_empty() {
            return;
        }
        self.queued_bytes += chunk.len();
        self.chunks.push_back(chunk);
    }
}

/// FIFO of owned PCM chunks with a byte-level read cursor into the head chunk.
///
/// Meant for exactly two roles: one producer on the control side (`push`,
/// `clear`, `begin_session`) and one consumer on the render thread (`pull`).
#[derive(Default)]
pub struct PlaybackQueue {
    state: Mutex<QueueState>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk to the tail regardless of session
    pub fn push(&self, chunk: PcmChunk) {
        self.state.lock().append(chunk);
    }

    /// Append a chunk only if `session` still owns the queue.
    ///
    /// Returns `false` when a newer session has started, in which case the
    /// chunk is dropped and the caller should stop producing.
    pub fn push_for(&self, session: SessionId, chunk: PcmChunk) -> bool {
        let mut state = self.state.lock();
        if state.session != session {
            return false;
        }
        state.append(chunk);
        true
    }

    /// Drop every queued chunk and reset the cursor
    pub fn clear(&self) {
        let dropped = self.state.lock().take_all();
        // Release the memory outside the lock so the render thread is not held up
        drop(dropped);
    }

    /// Clear the queue and hand ownership to a new session in one step
    pub fn begin_session(&self) -> SessionId {
        let (session, dropped) = {
            let mut state = self.state.lock();
            let dropped = state.take_all();
            state.session += 1;
            (state.session, dropped)
        };
        drop(dropped);
        session
    }

    /// Id of the session that currently owns the queue
    pub fn current_session(&self) -> SessionId {
        self.state.lock().session
    }

    /// Remove exactly `n` bytes from the head of the queue.
    ///
    /// Any shortfall is filled with zero bytes, so the result is always `n` long.
    pub fn pull(&self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        self.pull_into(&mut out);
        out
    }

    /// Fill `dst` completely from the head of the queue, zero-filling on underrun.
    ///
    /// Returns how many bytes came from queued audio (the rest is silence).
    pub fn pull_into(&self, dst: &mut [u8]) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut filled = 0;

        while filled < dst.len() {
            let Some(head) = state.chunks.front() else {
                break;
            };

            let available = &head.as_bytes()[state.cursor..];
            let count = available.len().min(dst.len() - filled);
            dst[filled..filled + count].copy_from_slice(&available[..count]);
            filled += count;
            state.cursor += count;

            if state.cursor == head.len() {
                state.chunks.pop_front();
                state.cursor = 0;
            }
        }

        state.queued_bytes -= filled;
        drop(guard);

        dst[filled..].fill(0);
        filled
    }

    /// Unread bytes across all queued chunks
    pub fn queued_bytes(&self) -> usize {
        self.state.lock().queued_bytes
    }

    /// Number of chunks still (partially) queued
    pub fn len(&self) -> usize {
        self.state.lock().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn chunk(range: std::ops::Range<u8>) -> PcmChunk {
        PcmChunk::from_bytes(range.collect::<Vec<u8>>())
    }

    #[test]
    fn test_pull_crosses_chunk_boundary() {
        let queue = PlaybackQueue::new();
        queue.push(chunk(0..10));
        queue.push(chunk(10..20));

        let first = queue.pull(15);
        assert_eq!(first, (0..15).collect::<Vec<u8>>());

        let second = queue.pull(5);
        assert_eq!(second, (15..20).collect::<Vec<u8>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pull_consumes_several_chunks_at_once() {
        let queue = PlaybackQueue::new();
        queue.push(chunk(0..3));
        queue.push(chunk(3..6));
        queue.push(chunk(6..12));

        assert_eq!(queue.pull(8), (0..8).collect::<Vec<u8>>());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.queued_bytes(), 4);
    }

    #[test]
    fn test_underrun_is_zero_filled() {
        let queue = PlaybackQueue::new();
        assert_eq!(queue.pull(16), vec![0u8; 16]);

        queue.push(PcmChunk::from_bytes(vec![7u8; 4]));
        let out = queue.pull(10);
        assert_eq!(out.len(), 10);
        assert_eq!(&out[..4], &[7, 7, 7, 7]);
        assert!(out[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pull_into_reports_audio_bytes() {
        let queue = PlaybackQueue::new();
        queue.push(chunk(1..7));
        let mut dst = [0xFFu8; 8];
        assert_eq!(queue.pull_into(&mut dst), 6);
        assert_eq!(dst, [1, 2, 3, 4, 5, 6, 0, 0]);
    }

    #[test]
    fn test_clear_resets_cursor() {
        let queue = PlaybackQueue::new();
        queue.push(chunk(0..10));
        queue.pull(4);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.queued_bytes(), 0);

        queue.push(chunk(50..60));
        assert_eq!(queue.pull(10), (50..60).collect::<Vec<u8>>());
    }

    #[test]
    fn test_empty_chunks_are_ignored() {
        let queue = PlaybackQueue::new();
        queue.push(PcmChunk::from_bytes(Vec::new()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stale_session_cannot_push() {
        let queue = PlaybackQueue::new();
        let old = queue.begin_session();
        assert!(queue.push_for(old, chunk(0..4)));

        let new = queue.begin_session();
        assert_ne!(old, new);
        assert!(queue.is_empty());
        assert!(!queue.push_for(old, chunk(0..4)));
        assert!(queue.push_for(new, chunk(100..104)));
        assert_eq!(queue.pull(4), vec![100, 101, 102, 103]);
    }

    #[test]
    fn test_concurrent_pull_preserves_order() {
        let queue = Arc::new(PlaybackQueue::new());
        let total: usize = 64 * 100;

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..64u32 {
                    let bytes: Vec<u8> = (0..100u32).map(|j| ((i * 100 + j) % 251) as u8).collect();
                    queue.push(PcmChunk::from_bytes(bytes));
                }
            })
        };

        let mut received = Vec::with_capacity(total);
        while received.len() < total {
            let mut block = [0u8; 37];
            let got = queue.pull_into(&mut block);
            received.extend_from_slice(&block[..got]);
            if got == 0 {
                thread::yield_now();
            }
        }
        producer.join().unwrap();

        let expected: Vec<u8> = (0..total as u32).map(|k| (k % 251) as u8).collect();
        assert_eq!(received, expected);
    }
}
